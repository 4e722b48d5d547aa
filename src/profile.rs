//! Editing rules for a user's profile and the public view built from it.

use std::collections::HashSet;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::models::{
    Banner, CustomPage, Layout, Link, MenuItem, Offer, Profile, Prompt, Theme, Tool, Update, User,
};
use crate::db::settings::FeatureFlags;
use crate::db::{catalog, new_id, offers, profiles, with_transaction};
use crate::error::{AppError, AppResult};
use crate::validate;

/// A partial profile edit. Every field that is present replaces the stored one;
/// an empty string clears an optional text field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub layout: Option<Layout>,
    pub theme: Option<Theme>,
    pub links: Option<Vec<Link>>,
    pub banners: Option<Vec<Banner>>,
    pub custom_pages: Option<Vec<CustomPage>>,
    pub custom_menu: Option<Vec<MenuItem>>,
    pub tool_ids: Option<Vec<String>>,
    pub prompt_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub slug: String,
    pub title: String,
}

/// What visitors see. Sections switched off by a feature flag are left out.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub layout: Layout,
    pub theme: Theme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banners: Option<Vec<Banner>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<PageSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_menu: Option<Vec<MenuItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates: Option<Vec<Update>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<Vec<Prompt>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offers: Option<Vec<Offer>>,
}

fn optional_text(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn normalize_link(mut link: Link) -> AppResult<Link> {
    link.title = validate::required(&link.title, "Link title")?;
    link.url = validate::web_url(&link.url, "Link URL")?;
    if link.id.trim().is_empty() {
        link.id = new_id();
    }
    Ok(link)
}

fn normalize_banner(mut banner: Banner) -> AppResult<Banner> {
    banner.image_url = validate::link_target(&banner.image_url, "Banner image")?;
    banner.link_url = banner
        .link_url
        .and_then(optional_text)
        .map(|u| validate::link_target(&u, "Banner link"))
        .transpose()?;
    if banner.id.trim().is_empty() {
        banner.id = new_id();
    }
    Ok(banner)
}

pub fn normalize_page(mut page: CustomPage) -> AppResult<CustomPage> {
    page.slug = validate::slug(&page.slug)?;
    page.title = validate::required(&page.title, "Page title")?;
    Ok(page)
}

fn normalize_menu_item(mut item: MenuItem) -> AppResult<MenuItem> {
    item.label = validate::required(&item.label, "Menu label")?;
    item.url = validate::link_target(&item.url, "Menu URL")?;
    Ok(item)
}

fn ensure_unique_slugs(pages: &[CustomPage]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for page in pages {
        if !seen.insert(page.slug.as_str()) {
            return Err(AppError::Conflict(format!(
                "Page slug '{}' is used more than once",
                page.slug
            )));
        }
    }
    Ok(())
}

impl ProfileUpdate {
    /// Validate the edit and write it onto `profile`. Nothing is changed on error.
    pub fn apply(self, conn: &Connection, profile: &mut Profile) -> AppResult<()> {
        let mut next = profile.clone();

        if let Some(name) = self.display_name {
            next.display_name = optional_text(name);
        }
        if let Some(bio) = self.bio {
            next.bio = optional_text(bio);
        }
        if let Some(avatar) = self.avatar_url {
            next.avatar_url = optional_text(avatar)
                .map(|u| validate::link_target(&u, "Avatar URL"))
                .transpose()?;
        }
        if let Some(layout) = self.layout {
            next.layout = layout;
        }
        if let Some(theme) = self.theme {
            next.theme = theme;
        }
        if let Some(links) = self.links {
            next.links = links
                .into_iter()
                .map(normalize_link)
                .collect::<AppResult<_>>()?;
        }
        if let Some(banners) = self.banners {
            next.banners = banners
                .into_iter()
                .map(normalize_banner)
                .collect::<AppResult<_>>()?;
        }
        if let Some(pages) = self.custom_pages {
            let pages: Vec<CustomPage> = pages
                .into_iter()
                .map(normalize_page)
                .collect::<AppResult<_>>()?;
            ensure_unique_slugs(&pages)?;
            next.custom_pages = pages;
        }
        if let Some(menu) = self.custom_menu {
            next.custom_menu = menu
                .into_iter()
                .map(normalize_menu_item)
                .collect::<AppResult<_>>()?;
        }
        if let Some(ids) = self.tool_ids {
            for id in &ids {
                if catalog::find_tool(conn, id)?.is_none() {
                    return Err(AppError::BadRequest(format!("Unknown tool: {}", id)));
                }
            }
            next.tool_ids = ids;
        }
        if let Some(ids) = self.prompt_ids {
            for id in &ids {
                if catalog::find_prompt(conn, id)?.is_none() {
                    return Err(AppError::BadRequest(format!("Unknown prompt: {}", id)));
                }
            }
            next.prompt_ids = ids;
        }

        *profile = next;
        Ok(())
    }
}

/// Load, change and save a profile under one write lock.
pub fn edit<R>(
    conn: &Connection,
    user_id: &str,
    f: impl FnOnce(&Connection, &mut Profile) -> AppResult<R>,
) -> AppResult<(Profile, R)> {
    with_transaction(conn, |conn| -> AppResult<(Profile, R)> {
        let mut profile = profiles::get(conn, user_id)?;
        let result = f(conn, &mut profile)?;
        let saved = profiles::save(conn, &profile)?;
        Ok((saved, result))
    })
}

/// Add a page, refusing a slug the profile already uses.
pub fn add_page(profile: &mut Profile, page: CustomPage) -> AppResult<CustomPage> {
    let page = normalize_page(page)?;
    if profile.custom_pages.iter().any(|p| p.slug == page.slug) {
        return Err(AppError::Conflict("slug already exists".into()));
    }
    profile.custom_pages.push(page.clone());
    Ok(page)
}

/// Replace the page at `slug`. The replacement may carry a new slug.
pub fn replace_page(profile: &mut Profile, slug: &str, page: CustomPage) -> AppResult<CustomPage> {
    let page = normalize_page(page)?;
    let index = profile
        .custom_pages
        .iter()
        .position(|p| p.slug == slug)
        .ok_or(AppError::NotFound)?;
    if page.slug != slug && profile.custom_pages.iter().any(|p| p.slug == page.slug) {
        return Err(AppError::Conflict("slug already exists".into()));
    }
    profile.custom_pages[index] = page.clone();
    Ok(page)
}

pub fn remove_page(profile: &mut Profile, slug: &str) -> AppResult<()> {
    let before = profile.custom_pages.len();
    profile.custom_pages.retain(|p| p.slug != slug);
    if profile.custom_pages.len() == before {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Post a status update. Updates are kept newest first.
pub fn post_update(profile: &mut Profile, body: &str) -> AppResult<Update> {
    let update = Update {
        id: new_id(),
        body: validate::required(body, "Update")?,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    profile.updates.insert(0, update.clone());
    Ok(update)
}

pub fn remove_update(profile: &mut Profile, id: &str) -> AppResult<()> {
    let before = profile.updates.len();
    profile.updates.retain(|u| u.id != id);
    if profile.updates.len() == before {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Build the public view of `owner`'s profile.
pub fn compose(
    conn: &Connection,
    owner: &User,
    profile: Profile,
    flags: &FeatureFlags,
) -> AppResult<PublicProfile> {
    let links = flags.links.then(|| {
        let mut links: Vec<Link> = profile.links.into_iter().filter(|l| l.visible).collect();
        links.sort_by_key(|l| l.position);
        links
    });

    let pages = flags.custom_pages.then(|| {
        profile
            .custom_pages
            .iter()
            .filter(|p| p.published)
            .map(|p| PageSummary {
                slug: p.slug.clone(),
                title: p.title.clone(),
            })
            .collect()
    });

    let tools = if flags.tools {
        Some(catalog::active_tools_by_ids(conn, &profile.tool_ids)?)
    } else {
        None
    };
    let prompts = if flags.prompts {
        Some(catalog::active_prompts_by_ids(conn, &profile.prompt_ids)?)
    } else {
        None
    };
    let offers = if flags.offers {
        Some(offers::list_for_user(conn, &owner.id, true)?)
    } else {
        None
    };

    Ok(PublicProfile {
        username: owner.username.clone(),
        display_name: profile.display_name,
        bio: profile.bio,
        avatar_url: profile.avatar_url,
        layout: profile.layout,
        theme: profile.theme,
        links,
        banners: flags.banners.then_some(profile.banners),
        pages,
        custom_menu: flags.custom_menu.then_some(profile.custom_menu),
        updates: flags.updates.then_some(profile.updates),
        tools,
        prompts,
        offers,
    })
}
