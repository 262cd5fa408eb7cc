//! The movie catalogue and per-user watch actions.

use chrono::NaiveDate;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::page::Page;

// ── DTOs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: Uuid,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "sinopse", default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(rename = "data_lancamento", default)]
    pub release_date: Option<NaiveDate>,
    /// Runtime in minutes.
    #[serde(rename = "duracao", default)]
    pub runtime: Option<i64>,
    #[serde(rename = "generos", default)]
    pub genres: Vec<String>,
    #[serde(rename = "avaliacao_media", default)]
    pub average_rating: f64,
    #[serde(rename = "total_avaliacoes", default)]
    pub total_ratings: i64,
    #[serde(rename = "diretor", default)]
    pub director: Option<String>,
    #[serde(rename = "elenco_principal", default)]
    pub main_cast: Vec<String>,
    #[serde(rename = "idioma_original", default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
}

/// Per-(user, movie) state. `like` is tri-state on the wire:
/// 1 = liked, 0 = disliked, null = no vote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserAction {
    #[serde(default)]
    pub like: Option<u8>,
    #[serde(rename = "favoritado", default)]
    pub favorited: bool,
    #[serde(rename = "assistir_mais_tarde", default)]
    pub watch_later: bool,
    #[serde(rename = "assistido", default)]
    pub watched: bool,
    #[serde(rename = "avaliacao", default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchToggle {
    Like,
    Dislike,
    Favorite,
    WatchLater,
    Watched,
}

impl WatchToggle {
    /// Request body that flips the current state. Toggling like when
    /// already liked sends `{"like": null}` (un-like), never `{"like": 1}`
    /// again; dislike is symmetric with 0.
    pub fn body(self, current: &UserAction) -> Value {
        match self {
            WatchToggle::Like => {
                let next = if current.like == Some(1) {
                    Value::Null
                } else {
                    Value::from(1)
                };
                json!({ "like": next })
            }
            WatchToggle::Dislike => {
                let next = if current.like == Some(0) {
                    Value::Null
                } else {
                    Value::from(0)
                };
                json!({ "like": next })
            }
            WatchToggle::Favorite => json!({ "favoritado": !current.favorited }),
            WatchToggle::WatchLater => json!({ "assistir_mais_tarde": !current.watch_later }),
            WatchToggle::Watched => json!({ "assistido": !current.watched }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentSummary {
    resumo: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingSummary {
    #[serde(rename = "nota_media")]
    pub average: f64,
    #[serde(rename = "total_votos")]
    pub total_votes: i64,
    #[serde(rename = "sua_nota")]
    pub your_rating: f64,
}

// ── Operations ───────────────────────────────────────────────────────────────

impl ApiClient {
    /// One catalogue page.
    pub async fn movies(&self, page: u32) -> Result<Page<Movie>, ApiError> {
        let url = self.api_url(&format!("/movies/?page={page}"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    pub async fn movie(&self, id: Uuid) -> Result<Movie, ApiError> {
        let url = self.api_url(&format!("/movies/{id}/"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    pub async fn user_action(&self, id: Uuid) -> Result<UserAction, ApiError> {
        let url = self.api_url(&format!("/movies/{id}/user_action/"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        self.expect_json(resp).await
    }

    /// Flip one watch action relative to `current` and return the
    /// backend's updated state (the response wins over any local guess).
    pub async fn toggle_action(
        &self,
        id: Uuid,
        toggle: WatchToggle,
        current: &UserAction,
    ) -> Result<UserAction, ApiError> {
        let url = self.api_url(&format!("/movies/{id}/update_action/"));
        let body = toggle.body(current);
        let resp = self.authed_request(Method::POST, &url, Some(&body)).await?;
        self.expect_json(resp).await
    }

    /// AI-generated digest of a movie's forum comments, markdown text.
    /// Slow (the backend calls out to its language model); when there
    /// are no comments yet the backend still answers with a short note.
    pub async fn summarize_comments(&self, id: Uuid) -> Result<String, ApiError> {
        let url = self.api_url(&format!("/movies/{id}/summarize-comments/"));
        let resp = self.authed_request(Method::GET, &url, None).await?;
        let summary: CommentSummary = self.expect_json(resp).await?;
        Ok(summary.resumo)
    }

    /// Submit a 0–10 rating. A rating is only acceptable once the movie
    /// is marked watched; anything else is rejected here without a
    /// request being sent.
    pub async fn rate(
        &self,
        id: Uuid,
        nota: f64,
        current: &UserAction,
    ) -> Result<RatingSummary, ApiError> {
        if !current.watched {
            return Err(ApiError::rejected(
                "nota",
                "mark the movie as watched before rating it",
            ));
        }
        if !(0.0..=10.0).contains(&nota) {
            return Err(ApiError::rejected("nota", "rating must be between 0 and 10"));
        }
        let url = self.api_url(&format!("/movies/{id}/rate/"));
        let resp = self
            .authed_request(Method::POST, &url, Some(&json!({ "nota": nota })))
            .await?;
        self.expect_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liking_an_already_liked_movie_unlikes() {
        let current = UserAction {
            like: Some(1),
            ..Default::default()
        };
        assert_eq!(WatchToggle::Like.body(&current), json!({ "like": null }));
    }

    #[test]
    fn liking_from_no_vote_or_dislike_sends_one() {
        let none = UserAction::default();
        let disliked = UserAction {
            like: Some(0),
            ..Default::default()
        };
        assert_eq!(WatchToggle::Like.body(&none), json!({ "like": 1 }));
        assert_eq!(WatchToggle::Like.body(&disliked), json!({ "like": 1 }));
    }

    #[test]
    fn disliking_an_already_disliked_movie_clears_the_vote() {
        let disliked = UserAction {
            like: Some(0),
            ..Default::default()
        };
        assert_eq!(WatchToggle::Dislike.body(&disliked), json!({ "like": null }));
    }

    #[test]
    fn boolean_flags_negate_current_state() {
        let mut current = UserAction::default();
        assert_eq!(
            WatchToggle::Favorite.body(&current),
            json!({ "favoritado": true })
        );
        current.favorited = true;
        assert_eq!(
            WatchToggle::Favorite.body(&current),
            json!({ "favoritado": false })
        );
        assert_eq!(
            WatchToggle::WatchLater.body(&current),
            json!({ "assistir_mais_tarde": true })
        );
        assert_eq!(
            WatchToggle::Watched.body(&current),
            json!({ "assistido": true })
        );
    }

    #[test]
    fn user_action_wire_names_round_trip() {
        let parsed: UserAction = serde_json::from_str(
            r#"{"like": 1, "favoritado": true, "assistir_mais_tarde": false,
                "assistido": true, "avaliacao": 8.5}"#,
        )
        .unwrap();
        assert_eq!(parsed.like, Some(1));
        assert!(parsed.favorited);
        assert!(parsed.watched);
        assert_eq!(parsed.rating, Some(8.5));
    }
}
