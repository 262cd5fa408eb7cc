//! Calendar events: owned by one user, joined by many.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::ApiError;

// ── DTOs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct EventUser {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub event_datetime: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub owner: EventUser,
    #[serde(default)]
    pub participants: Vec<EventUser>,
    #[serde(default)]
    pub is_participating: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub event_datetime: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Server-side event list filters; all optional and combinable.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Restrict to one month, `YYYY-MM`.
    pub month: Option<String>,
    /// Events a given user owns or participates in.
    pub user: Option<String>,
    /// Only events the current user participates in.
    pub participating: bool,
    /// Only events the current user owns.
    pub owned: bool,
}

impl EventQuery {
    fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(month) = &self.month {
            parts.push(format!("month={month}"));
        }
        if let Some(user) = &self.user {
            parts.push(format!("user={user}"));
        }
        if self.participating {
            parts.push("participating=true".into());
        }
        if self.owned {
            parts.push("owned=true".into());
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventStats {
    #[serde(default)]
    pub total_events: u64,
    #[serde(default)]
    pub owned_events: u64,
    #[serde(default)]
    pub upcoming_events: u64,
}

// ── Operations ───────────────────────────────────────────────────────────────

impl ApiClient {
    pub async fn events(&self, query: &EventQuery) -> Result<Vec<Event>, ApiError> {
        let url = self.api_url(&format!("/events/{}", query.to_query_string()));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    pub async fn create_event(&self, event: &NewEvent) -> Result<Event, ApiError> {
        let resp = self
            .authed_request(
                Method::POST,
                &self.api_url("/events/"),
                Some(&serde_json::to_value(event)?),
            )
            .await?;
        self.expect_json(resp).await
    }

    pub async fn join_event(&self, id: Uuid) -> Result<(), ApiError> {
        let url = self.api_url(&format!("/events/{id}/join/"));
        let resp = self.authed_request(Method::POST, &url, None).await?;
        self.expect_ok(resp).await
    }

    pub async fn leave_event(&self, id: Uuid) -> Result<(), ApiError> {
        let url = self.api_url(&format!("/events/{id}/leave/"));
        let resp = self.authed_request(Method::POST, &url, None).await?;
        self.expect_ok(resp).await
    }

    pub async fn event_stats(&self, username: &str) -> Result<EventStats, ApiError> {
        let url = self.api_url(&format!("/events/user_stats/?username={username}"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_combines_filters() {
        let query = EventQuery {
            month: Some("2026-08".into()),
            owned: true,
            ..Default::default()
        };
        assert_eq!(query.to_query_string(), "?month=2026-08&owned=true");
        assert_eq!(EventQuery::default().to_query_string(), "");
    }
}
