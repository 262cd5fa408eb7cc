//! Threaded per-movie forum.
//!
//! Comments form a tree through `parent` references; replies to one
//! comment are fetched lazily and paginated independently of their
//! siblings. Composing a comment or reply requires the movie to be
//! marked watched; that gate lives here, in one place, so no request
//! is ever sent for an ineligible compose.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::client::{api_error, ApiClient};
use crate::error::ApiError;
use crate::movies::UserAction;
use crate::page::Page;
use crate::users::User;

// ── DTOs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumComment {
    pub id: i64,
    #[serde(rename = "filme")]
    pub movie: Uuid,
    #[serde(rename = "filme_titulo", default)]
    pub movie_title: Option<String>,
    pub user: User,
    #[serde(rename = "texto")]
    pub text: String,
    #[serde(default)]
    pub parent: Option<i64>,
    /// Direct replies only; the tree is never serialized to full depth.
    #[serde(default)]
    pub replies: Vec<ForumComment>,
    #[serde(default)]
    pub likes_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reported: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForumFilter {
    #[default]
    Recent,
    Oldest,
    TopRated,
}

impl ForumFilter {
    pub fn as_query(self) -> &'static str {
        match self {
            ForumFilter::Recent => "recentes",
            ForumFilter::Oldest => "antigos",
            ForumFilter::TopRated => "bem_avaliados",
        }
    }
}

#[derive(Debug, Deserialize)]
struct LikesCount {
    likes_count: u64,
}

// ── Operations ───────────────────────────────────────────────────────────────

impl ApiClient {
    /// One page of a movie's forum. With `parent` set this pages through
    /// the direct replies of that comment instead of the top level.
    pub async fn forum(
        &self,
        movie_id: Uuid,
        page: u32,
        filter: ForumFilter,
        parent: Option<i64>,
    ) -> Result<Page<ForumComment>, ApiError> {
        let mut url = self.api_url(&format!(
            "/movies/{movie_id}/forum/?page={page}&filtro={}",
            filter.as_query()
        ));
        if let Some(parent) = parent {
            url.push_str(&format!("&parent={parent}"));
        }
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    /// Post a comment (or, with `parent`, a reply). Rejected without a
    /// request when the movie is not marked watched or the text is
    /// blank.
    pub async fn post_comment(
        &self,
        movie_id: Uuid,
        text: &str,
        parent: Option<i64>,
        action: &UserAction,
    ) -> Result<ForumComment, ApiError> {
        if !action.watched {
            return Err(ApiError::rejected(
                "texto",
                "mark the movie as watched before commenting",
            ));
        }
        if text.trim().is_empty() {
            return Err(ApiError::rejected("texto", "comment text cannot be empty"));
        }
        let url = self.api_url(&format!("/movies/{movie_id}/forum/"));
        let body = json!({ "texto": text, "parent": parent });
        let resp = self.authed_request(Method::POST, &url, Some(&body)).await?;
        self.expect_json(resp).await
    }

    /// Toggle a like on a comment; the backend answers with the new
    /// count. Callers refetch the affected node's replies rather than
    /// bumping a local counter.
    pub async fn like_comment(&self, comment_id: i64) -> Result<u64, ApiError> {
        let url = self.api_url(&format!("/forum/{comment_id}/like/"));
        let resp = self.authed_request(Method::POST, &url, None).await?;
        let counted: LikesCount = self.expect_json(resp).await?;
        Ok(counted.likes_count)
    }

    /// Report a comment. The backend currently answers 501 with an
    /// informational detail; that is a toast for the user, not a
    /// failure.
    pub async fn report_comment(&self, comment_id: i64) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct Detail {
            detail: String,
        }

        let url = self.api_url(&format!("/forum/{comment_id}/report/"));
        let resp = self.authed_request(Method::POST, &url, None).await?;
        let status = resp.status();
        if status.is_success() || status.as_u16() == 501 {
            let detail: Detail = resp.json().await?;
            Ok(detail.detail)
        } else {
            Err(api_error(resp).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_names_match_the_wire() {
        assert_eq!(ForumFilter::Recent.as_query(), "recentes");
        assert_eq!(ForumFilter::Oldest.as_query(), "antigos");
        assert_eq!(ForumFilter::TopRated.as_query(), "bem_avaliados");
        assert_eq!(ForumFilter::default(), ForumFilter::Recent);
    }

    #[test]
    fn comment_tree_parses_nested_replies() {
        let body = r#"{
            "id": 10,
            "filme": "7b6a6f3e-24b7-4a3e-9f2e-1c7d1b1f0000",
            "filme_titulo": "O Filme",
            "user": {"id": "9f3e7b6a-24b7-4a3e-9f2e-1c7d1b1f1111", "username": "alice"},
            "texto": "top-level",
            "parent": null,
            "likes_count": 3,
            "created_at": "2026-05-01T10:00:00Z",
            "replies": [{
                "id": 11,
                "filme": "7b6a6f3e-24b7-4a3e-9f2e-1c7d1b1f0000",
                "user": {"id": "9f3e7b6a-24b7-4a3e-9f2e-1c7d1b1f2222", "username": "bob"},
                "texto": "reply",
                "parent": 10,
                "created_at": "2026-05-01T11:00:00Z",
                "replies": []
            }]
        }"#;
        let comment: ForumComment = serde_json::from_str(body).unwrap();
        assert_eq!(comment.replies.len(), 1);
        assert_eq!(comment.replies[0].parent, Some(10));
        assert_eq!(comment.likes_count, 3);
    }
}
