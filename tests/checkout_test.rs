//! End-to-end tests for coupons, checkout, the transaction ledger and reversals.

mod common;

use std::sync::Arc;

use common::TestServer;
use serde_json::{json, Value};

/// An admin (first user) and a regular buyer.
async fn setup() -> (TestServer, String, String, Value) {
    let server = TestServer::start().await;
    let (admin_token, _) = server.register("admin_user").await;
    let (buyer_token, buyer) = server.register("buyer").await;
    (server, admin_token, buyer_token, buyer)
}

async fn create_coupon(server: &TestServer, admin_token: &str, body: Value) -> Value {
    let (status, coupon) = server.post("/api/coupons", Some(admin_token), body).await;
    assert_eq!(status, 201, "coupon creation failed: {}", coupon);
    coupon
}

#[tokio::test]
async fn coin_purchase_applies_percentage_discount() {
    let (server, admin_token, buyer_token, _) = setup().await;
    let coupon = create_coupon(
        &server,
        &admin_token,
        json!({"code": " save20 ", "discount_type": "percentage", "value": 20}),
    )
    .await;
    assert_eq!(coupon["code"], "SAVE20");

    let (status, receipt) = server
        .post(
            "/api/checkout",
            Some(&buyer_token),
            json!({"purchase": {"type": "coins", "coins": 100}, "coupon_code": "save20"}),
        )
        .await;
    assert_eq!(status, 201, "{}", receipt);
    assert_eq!(receipt["user"]["coins"], 100);
    assert_eq!(receipt["transaction"]["kind"], "coin_purchase");
    assert_eq!(receipt["transaction"]["amount_cents"], 800);
    assert_eq!(receipt["transaction"]["discount"], 200);
    assert_eq!(receipt["transaction"]["coupon_code"], "SAVE20");

    let (_, coupon) = server
        .get(
            &format!("/api/coupons/{}", coupon["id"].as_str().unwrap()),
            Some(&admin_token),
        )
        .await;
    assert_eq!(coupon["used_count"], 1);
    assert_eq!(coupon["is_active"], true);
}

#[tokio::test]
async fn fixed_discount_never_goes_below_zero() {
    let (server, admin_token, buyer_token, _) = setup().await;
    create_coupon(
        &server,
        &admin_token,
        json!({"code": "BIGFIX", "discount_type": "fixed", "value": 5000}),
    )
    .await;

    let (status, receipt) = server
        .post(
            "/api/checkout",
            Some(&buyer_token),
            json!({"purchase": {"type": "coins", "coins": 10}, "coupon_code": "BIGFIX"}),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(receipt["transaction"]["amount_cents"], 0);
    assert_eq!(receipt["transaction"]["discount"], 100);
    assert_eq!(receipt["user"]["coins"], 10);
}

#[tokio::test]
async fn usage_limit_deactivates_the_coupon() {
    let (server, admin_token, buyer_token, _) = setup().await;
    let coupon = create_coupon(
        &server,
        &admin_token,
        json!({"code": "BONUS", "discount_type": "bonus", "value": 25, "usage_limit": 1}),
    )
    .await;

    let (status, receipt) = server
        .post(
            "/api/checkout",
            Some(&buyer_token),
            json!({"purchase": {"type": "coins", "coins": 50}, "coupon_code": "BONUS"}),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(receipt["transaction"]["bonus_coins"], 25);
    assert_eq!(receipt["user"]["coins"], 75);

    let (status, body) = server
        .post(
            "/api/checkout",
            Some(&buyer_token),
            json!({"purchase": {"type": "coins", "coins": 50}, "coupon_code": "BONUS"}),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Coupon is not active");

    let (_, coupon) = server
        .get(
            &format!("/api/coupons/{}", coupon["id"].as_str().unwrap()),
            Some(&admin_token),
        )
        .await;
    assert_eq!(coupon["used_count"], 1);
    assert_eq!(coupon["is_active"], false);

    // The failed attempt changed nothing.
    let (_, me) = server.get("/api/auth/me", Some(&buyer_token)).await;
    assert_eq!(me["coins"], 75);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_checkouts_respect_the_usage_limit() {
    let (server, admin_token, _, _) = setup().await;
    let server = Arc::new(server);
    let coupon = create_coupon(
        &server,
        &admin_token,
        json!({"code": "RUSH", "discount_type": "percentage", "value": 10, "usage_limit": 3}),
    )
    .await;

    let mut buyers = Vec::new();
    for i in 0..8 {
        buyers.push(server.register(&format!("rusher{}", i)).await.0);
    }

    let handles: Vec<_> = buyers
        .into_iter()
        .map(|token| {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                server
                    .post(
                        "/api/checkout",
                        Some(&token),
                        json!({"purchase": {"type": "coins", "coins": 10}, "coupon_code": "RUSH"}),
                    )
                    .await
                    .0
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }
    assert_eq!(statuses.iter().filter(|s| **s == 201).count(), 3, "{:?}", statuses);
    assert!(statuses.iter().all(|s| *s == 201 || *s == 400), "{:?}", statuses);

    let (_, coupon) = server
        .get(
            &format!("/api/coupons/{}", coupon["id"].as_str().unwrap()),
            Some(&admin_token),
        )
        .await;
    assert_eq!(coupon["used_count"], 3);
    assert_eq!(coupon["is_active"], false);

    let (_, ledger) = server.get("/api/admin/transactions", Some(&admin_token)).await;
    assert_eq!(ledger.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn validate_quotes_without_redeeming() {
    let (server, admin_token, buyer_token, _) = setup().await;
    let coupon = create_coupon(
        &server,
        &admin_token,
        json!({"code": "HALF", "discount_type": "percentage", "value": 50, "usage_limit": 1}),
    )
    .await;

    for _ in 0..2 {
        let (status, quote) = server
            .post(
                "/api/coupons/validate",
                Some(&buyer_token),
                json!({"code": "half", "purchase": {"type": "coins", "coins": 10}}),
            )
            .await;
        assert_eq!(status, 200);
        assert_eq!(quote["base"], 100);
        assert_eq!(quote["discount"], 50);
        assert_eq!(quote["total"], 50);
        assert_eq!(quote["unit"], "cents");
    }

    let (_, coupon) = server
        .get(
            &format!("/api/coupons/{}", coupon["id"].as_str().unwrap()),
            Some(&admin_token),
        )
        .await;
    assert_eq!(coupon["used_count"], 0);

    let (status, _) = server
        .post(
            "/api/coupons/validate",
            Some(&buyer_token),
            json!({"code": "NOPE", "purchase": {"type": "coins", "coins": 10}}),
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn expired_coupons_are_rejected() {
    let (server, admin_token, buyer_token, _) = setup().await;
    create_coupon(
        &server,
        &admin_token,
        json!({
            "code": "OLD",
            "discount_type": "fixed",
            "value": 10,
            "expires_at": "2000-01-01T00:00:00Z"
        }),
    )
    .await;

    let (status, body) = server
        .post(
            "/api/checkout",
            Some(&buyer_token),
            json!({"purchase": {"type": "coins", "coins": 10}, "coupon_code": "OLD"}),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Coupon has expired");
}

#[tokio::test]
async fn duplicate_coupon_codes_conflict() {
    let (server, admin_token, buyer_token, _) = setup().await;
    create_coupon(
        &server,
        &admin_token,
        json!({"code": "ONCE", "discount_type": "fixed", "value": 10}),
    )
    .await;

    let (status, body) = server
        .post(
            "/api/coupons",
            Some(&admin_token),
            json!({"code": "once", "discount_type": "bonus", "value": 5}),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "code already exists");

    let (status, _) = server
        .post(
            "/api/coupons",
            Some(&admin_token),
            json!({"code": "PCT", "discount_type": "percentage", "value": 150}),
        )
        .await;
    assert_eq!(status, 400);

    assert_eq!(server.get("/api/coupons", Some(&buyer_token)).await.0, 403);
}

#[tokio::test]
async fn plan_purchase_spends_coins_and_reversal_restores_the_plan() {
    let (server, admin_token, buyer_token, buyer) = setup().await;

    let (status, body) = server
        .post(
            "/api/checkout",
            Some(&buyer_token),
            json!({"purchase": {"type": "plan", "plan": "pro"}}),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().starts_with("Insufficient coins"));

    let (status, coins) = server
        .post(
            "/api/checkout",
            Some(&buyer_token),
            json!({"purchase": {"type": "coins", "coins": 600}}),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(coins["transaction"]["amount_cents"], 6000);

    let (status, plan) = server
        .post(
            "/api/checkout",
            Some(&buyer_token),
            json!({"purchase": {"type": "plan", "plan": "pro"}}),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(plan["user"]["plan"], "pro");
    assert_eq!(plan["user"]["coins"], 100);
    assert_eq!(plan["transaction"]["coins"], -500);
    assert_eq!(plan["transaction"]["previous_plan"], "free");

    let (status, _) = server
        .post(
            "/api/checkout",
            Some(&buyer_token),
            json!({"purchase": {"type": "plan", "plan": "pro"}}),
        )
        .await;
    assert_eq!(status, 400);
    let (status, _) = server
        .post(
            "/api/checkout",
            Some(&buyer_token),
            json!({"purchase": {"type": "plan", "plan": "free"}}),
        )
        .await;
    assert_eq!(status, 400);

    let (_, history) = server.get("/api/transactions", Some(&buyer_token)).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["kind"], "plan_purchase");
    assert_eq!(history[1]["kind"], "coin_purchase");

    let plan_tx = format!(
        "/api/admin/transactions/{}",
        plan["transaction"]["id"].as_str().unwrap()
    );
    assert_eq!(server.delete(&plan_tx, Some(&buyer_token)).await.0, 403);

    let (status, user) = server.delete(&plan_tx, Some(&admin_token)).await;
    assert_eq!(status, 200);
    assert_eq!(user["plan"], "free");
    assert_eq!(user["coins"], 600);
    assert_eq!(server.delete(&plan_tx, Some(&admin_token)).await.0, 404);

    let (_, all) = server
        .get(
            &format!(
                "/api/admin/transactions?user_id={}",
                buyer["id"].as_str().unwrap()
            ),
            Some(&admin_token),
        )
        .await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reversal_clamps_the_balance_at_zero() {
    let (server, admin_token, buyer_token, buyer) = setup().await;

    let (_, purchase) = server
        .post(
            "/api/checkout",
            Some(&buyer_token),
            json!({"purchase": {"type": "coins", "coins": 100}}),
        )
        .await;

    let coins_path = format!("/api/admin/users/{}/coins", buyer["id"].as_str().unwrap());
    let (status, adjusted) = server
        .post(&coins_path, Some(&admin_token), json!({"delta": -60, "note": "refund"}))
        .await;
    assert_eq!(status, 201);
    assert_eq!(adjusted["user"]["coins"], 40);
    assert_eq!(adjusted["transaction"]["kind"], "admin_adjustment");
    assert_eq!(adjusted["transaction"]["note"], "refund");

    let (status, _) = server
        .post(&coins_path, Some(&admin_token), json!({"delta": -100}))
        .await;
    assert_eq!(status, 400);

    let tx_path = format!(
        "/api/admin/transactions/{}",
        purchase["transaction"]["id"].as_str().unwrap()
    );
    let (status, user) = server.delete(&tx_path, Some(&admin_token)).await;
    assert_eq!(status, 200);
    assert_eq!(user["coins"], 0);
}
