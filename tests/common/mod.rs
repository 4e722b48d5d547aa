//! Shared harness: a real server on an ephemeral port backed by a temp data dir.

#![allow(dead_code)]

use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tempfile::TempDir;

use linkstand::config::Config;
use linkstand::db;
use linkstand::media::LocalMediaStore;
use linkstand::routes;
use linkstand::state::AppState;

pub const PASSWORD: &str = "hunter2hunter2";

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    _tmp: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::for_data_dir(tmp.path());
        config.auth.bcrypt_cost = 4;
        config.cors.root_domain = Some("linkstand.test".to_string());

        let pool = db::create_pool(&config.db_path()).unwrap();
        db::run_migrations(&pool).unwrap();

        let media = LocalMediaStore::new(
            config.uploads_path(),
            &config.storage.public_url,
            config.storage.max_upload_bytes,
        );
        let state = AppState {
            db: pool,
            config: Arc::new(config),
            media: Arc::new(media),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, routes::app(state)).await.unwrap();
        });

        TestServer {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            _tmp: tmp,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Send a request and return the status code with the decoded body.
    /// Non-JSON bodies come back as a JSON string.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await.unwrap();
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap();
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (status, value)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (u16, Value) {
        self.send(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        self.send(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        self.send(Method::PUT, path, token, Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        self.send(Method::PATCH, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (u16, Value) {
        self.send(Method::DELETE, path, token, None).await
    }

    /// Register an account and return its token and user JSON.
    pub async fn register(&self, username: &str) -> (String, Value) {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, 201, "register {} failed: {}", username, body);

        let token = body["token"].as_str().unwrap().to_string();
        (token, body["user"].clone())
    }
}
