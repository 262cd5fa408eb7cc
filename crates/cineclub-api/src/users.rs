//! Accounts, profiles and the follower graph.

use std::path::Path;

use reqwest::multipart::Form;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use cineclub_core::Session;

use crate::client::{api_error, image_part, ApiClient};
use crate::error::ApiError;
use crate::movies::Movie;
use crate::page::Page;

// ── DTOs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_following: Option<bool>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub banner_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Wire names stay Portuguese; the struct reads like the rest of the crate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserStats {
    #[serde(rename = "assistidos", default)]
    pub watched: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(rename = "criticas", default)]
    pub comments: u64,
    #[serde(rename = "seguidores", default)]
    pub followers: u64,
    #[serde(rename = "seguindo", default)]
    pub following: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowEntry {
    pub id: i64,
    pub user_username: String,
    #[serde(default)]
    pub user_name: Option<String>,
    pub following_username: String,
    #[serde(default)]
    pub following_name: Option<String>,
}

/// Which profile image an upload replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Avatar,
    Banner,
}

impl ImageKind {
    pub fn as_form(self) -> &'static str {
        match self {
            ImageKind::Avatar => "avatar",
            ImageKind::Banner => "banner",
        }
    }
}

/// Profile shelves the backend can filter a user's movies by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shelf {
    Watched,
    Favorites,
    WatchLater,
}

impl Shelf {
    pub fn as_query(self) -> &'static str {
        match self {
            Shelf::Watched => "assistidos",
            Shelf::Favorites => "favoritos",
            Shelf::WatchLater => "assistir_depois",
        }
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

impl ApiClient {
    /// Log in with email + password. Both tokens are persisted before
    /// this returns; the username is learned from `/users/me/` on a
    /// best-effort basis (login itself already succeeded).
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let resp = self
            .request(
                Method::POST,
                &self.api_url("/users/login/"),
                Some(&json!({ "email": email, "password": password })),
            )
            .await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        let pair: TokenPair = resp.json().await?;
        self.session().set(Session {
            access: pair.access,
            refresh: pair.refresh,
            username: None,
        })?;

        match self.me().await {
            Ok(user) => self.session().set_username(user.username)?,
            Err(e) => warn!("could not fetch profile after login: {e}"),
        }
        Ok(())
    }

    /// Create an account. Does not log in; the caller goes through
    /// [`ApiClient::login`] afterwards.
    pub async fn register(&self, req: &RegisterRequest) -> Result<(), ApiError> {
        let resp = self
            .request(
                Method::POST,
                &self.api_url("/users/register/"),
                Some(&serde_json::to_value(req)?),
            )
            .await?;
        self.expect_ok(resp).await
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.session().clear()?;
        Ok(())
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        let resp = self
            .authed_request(Method::GET, &self.api_url("/users/me/"), None)
            .await?;
        self.expect_json(resp).await
    }

    pub async fn user(&self, username: &str) -> Result<User, ApiError> {
        let url = self.api_url(&format!("/users/{username}/"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    pub async fn update_profile(
        &self,
        username: &str,
        patch: &ProfilePatch,
    ) -> Result<User, ApiError> {
        let url = self.api_url(&format!("/users/{username}/"));
        let resp = self
            .authed_request(Method::PATCH, &url, Some(&serde_json::to_value(patch)?))
            .await?;
        self.expect_json(resp).await
    }

    /// Replace the avatar or banner with a local JPG or PNG file. The
    /// backend answers with the updated profile.
    pub async fn upload_image(
        &self,
        username: &str,
        kind: ImageKind,
        image: &Path,
    ) -> Result<User, ApiError> {
        let form = Form::new()
            .text("type", kind.as_form())
            .part("image", image_part(image)?);
        let url = self.api_url(&format!("/users/{username}/upload-image/"));
        let resp = self.authed_multipart(&url, form).await?;
        self.expect_json(resp).await
    }

    pub async fn follow(&self, username: &str) -> Result<(), ApiError> {
        let url = self.api_url(&format!("/users/{username}/follow/"));
        let resp = self.authed_request(Method::POST, &url, None).await?;
        self.expect_ok(resp).await
    }

    pub async fn unfollow(&self, username: &str) -> Result<(), ApiError> {
        let url = self.api_url(&format!("/users/{username}/follow/"));
        let resp = self.authed_request(Method::DELETE, &url, None).await?;
        self.expect_ok(resp).await
    }

    pub async fn followers(&self, username: &str) -> Result<Vec<FollowEntry>, ApiError> {
        let url = self.api_url(&format!("/users/{username}/followers/"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    pub async fn following(&self, username: &str) -> Result<Vec<FollowEntry>, ApiError> {
        let url = self.api_url(&format!("/users/{username}/following/"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    /// One shelf of a user's movies (watched / favorites / watch-later).
    pub async fn user_movies(&self, username: &str, shelf: Shelf) -> Result<Vec<Movie>, ApiError> {
        let url = self.api_url(&format!(
            "/users/{username}/movies/?filtro={}",
            shelf.as_query()
        ));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    pub async fn user_stats(&self, username: &str) -> Result<UserStats, ApiError> {
        let url = self.api_url(&format!("/movies/user_stats/{username}/"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    /// A user's forum comments across all movies.
    pub async fn user_comments(
        &self,
        username: &str,
        page: u32,
    ) -> Result<Page<crate::forum::ForumComment>, ApiError> {
        let url = self.api_url(&format!("/forum/?user={username}&page={page}"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }
}
