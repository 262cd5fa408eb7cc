//! The external AI answer service. A separate host from the REST
//! backend, unauthenticated, Portuguese field names on the wire.

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use crate::client::ApiClient;
use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct Answer {
    /// Markdown text.
    #[serde(rename = "resposta")]
    pub answer: String,
}

impl ApiClient {
    pub async fn ask(&self, question: &str) -> Result<Answer, ApiError> {
        if question.trim().is_empty() {
            return Err(ApiError::rejected("pergunta", "question cannot be empty"));
        }
        let url = format!("{}/responder", self.settings().responder_base_url);
        let resp = self
            .request(Method::POST, &url, Some(&json!({ "pergunta": question })))
            .await?;
        self.expect_json(resp).await
    }
}
