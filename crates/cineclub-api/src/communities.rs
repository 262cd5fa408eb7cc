//! Communities and their chat rooms.

use std::path::Path;

use chrono::{DateTime, Utc};
use reqwest::multipart::Form;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::client::{image_part, ApiClient};
use crate::error::ApiError;

// ── DTOs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    /// Owner's user id.
    pub owner: Uuid,
    /// Member user ids.
    #[serde(default)]
    pub members: Vec<Uuid>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub chat_type: String,
    pub community: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub username: String,
}

/// Chat messages carry markdown text; rendering is a view concern.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    pub username: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

// ── Operations ───────────────────────────────────────────────────────────────

impl ApiClient {
    pub async fn communities(&self) -> Result<Vec<Community>, ApiError> {
        let resp = self
            .authed_request(Method::GET, &self.api_url("/communities/"), None)
            .await?;
        self.expect_json(resp).await
    }

    pub async fn create_community(
        &self,
        name: &str,
        description: &str,
        is_public: bool,
    ) -> Result<Community, ApiError> {
        let body = json!({
            "name": name,
            "description": description,
            "is_public": is_public,
        });
        let resp = self
            .authed_request(Method::POST, &self.api_url("/communities/"), Some(&body))
            .await?;
        self.expect_json(resp).await
    }

    /// Owner-only on the server side; anyone else gets a 403 mapped
    /// through the usual taxonomy.
    pub async fn delete_community(&self, id: i64) -> Result<(), ApiError> {
        let url = self.api_url(&format!("/communities/{id}/delete/"));
        let resp = self.authed_request(Method::DELETE, &url, None).await?;
        self.expect_ok(resp).await
    }

    /// Replace the community icon with a local JPG or PNG file.
    pub async fn upload_icon(&self, id: i64, icon: &Path) -> Result<Community, ApiError> {
        let form = Form::new().part("icon", image_part(icon)?);
        let url = self.api_url(&format!("/communities/{id}/upload-icon/"));
        let resp = self.authed_multipart(&url, form).await?;
        self.expect_json(resp).await
    }

    pub async fn add_member(&self, id: i64, username: &str) -> Result<(), ApiError> {
        let url = self.api_url(&format!("/communities/{id}/add-member/"));
        let resp = self
            .authed_request(Method::POST, &url, Some(&json!({ "username": username })))
            .await?;
        self.expect_ok(resp).await
    }

    pub async fn members(&self, id: i64) -> Result<Vec<Member>, ApiError> {
        let url = self.api_url(&format!("/communities/{id}/members/"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    pub async fn chats(&self, community_id: i64) -> Result<Vec<Chat>, ApiError> {
        let url = self.api_url(&format!("/communities/{community_id}/chats/"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    pub async fn create_chat(&self, community_id: i64, name: &str) -> Result<Chat, ApiError> {
        let url = self.api_url(&format!("/communities/{community_id}/chats/"));
        let body = json!({ "name": name, "chat_type": "text" });
        let resp = self.authed_request(Method::POST, &url, Some(&body)).await?;
        self.expect_json(resp).await
    }

    /// The full message list, newest first. Polling replaces the list
    /// wholesale; there is no incremental diff.
    pub async fn messages(
        &self,
        community_id: i64,
        chat_id: i64,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let url = self.api_url(&format!(
            "/communities/{community_id}/chats/{chat_id}/messages/"
        ));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    pub async fn send_message(
        &self,
        community_id: i64,
        chat_id: i64,
        content: &str,
    ) -> Result<(), ApiError> {
        if content.trim().is_empty() {
            return Err(ApiError::rejected("content", "message cannot be empty"));
        }
        let url = self.api_url(&format!(
            "/communities/{community_id}/chats/{chat_id}/messages/"
        ));
        let resp = self
            .authed_request(Method::POST, &url, Some(&json!({ "content": content })))
            .await?;
        self.expect_ok(resp).await
    }
}
