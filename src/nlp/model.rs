//! Sentiment classifier seam and its HTTP implementation.
//!
//! The HTTP model speaks the text-classification inference protocol:
//! `POST {"inputs": "..."}` answered by `[[{"label": "POSITIVE", "score": 0.98}, ...]]`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::SentimentSettings;
use crate::http_client::{build_client, USER_AGENT};

/// Errors from loading or calling the sentiment model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model unavailable: {0}")]
    Load(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("unexpected model output: {0}")]
    Parse(String),
}

/// Positive/negative probabilities for one input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentScores {
    pub positive: f64,
    pub negative: f64,
}

impl SentimentScores {
    /// `1 - |positive - negative|`: balanced sentiment scores high.
    pub fn divergence(&self) -> f64 {
        (1.0 - (self.positive - self.negative).abs()).clamp(0.0, 1.0)
    }
}

/// A binary sentiment classifier.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    async fn classify(&self, text: &str) -> Result<SentimentScores, ModelError>;
}

/// Produces the model on first use.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn SentimentModel>, ModelError>;
}

/// Loader for a model that already exists.
pub struct PreloadedModel(pub Arc<dyn SentimentModel>);

#[async_trait]
impl ModelLoader for PreloadedModel {
    async fn load(&self) -> Result<Arc<dyn SentimentModel>, ModelError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Error { error: String },
}

/// Sentiment model served over HTTP.
pub struct HttpSentimentModel {
    client: Client,
    api_url: String,
    api_token: Option<String>,
}

impl HttpSentimentModel {
    pub fn new(settings: &SentimentSettings) -> Result<Self, ModelError> {
        url::Url::parse(&settings.api_url)
            .map_err(|e| ModelError::Load(format!("invalid sentiment API URL: {}", e)))?;
        let client = build_client(USER_AGENT, settings.timeout)
            .map_err(|e| ModelError::Load(e.to_string()))?;

        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            api_token: settings.api_token.clone(),
        })
    }
}

#[async_trait]
impl SentimentModel for HttpSentimentModel {
    async fn classify(&self, text: &str) -> Result<SentimentScores, ModelError> {
        let mut request = self
            .client
            .post(&self.api_url)
            .json(&serde_json::json!({ "inputs": text }));
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ModelError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("HTTP {}: {}", status, body)));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ModelError::Connection(e.to_string()))?;
        parse_scores(&body)
    }
}

/// Builds an [`HttpSentimentModel`] from settings when first needed.
pub struct HttpModelLoader {
    settings: SentimentSettings,
}

impl HttpModelLoader {
    pub fn new(settings: SentimentSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ModelLoader for HttpModelLoader {
    async fn load(&self) -> Result<Arc<dyn SentimentModel>, ModelError> {
        let model = HttpSentimentModel::new(&self.settings)?;
        tracing::info!("Sentiment model ready at {}", self.settings.api_url);
        Ok(Arc::new(model))
    }
}

fn parse_scores(body: &str) -> Result<SentimentScores, ModelError> {
    let response: ClassifyResponse =
        serde_json::from_str(body).map_err(|e| ModelError::Parse(e.to_string()))?;

    let labels = match response {
        ClassifyResponse::Nested(mut outer) => {
            if outer.is_empty() {
                return Err(ModelError::Parse("empty response".into()));
            }
            outer.swap_remove(0)
        }
        ClassifyResponse::Flat(labels) => labels,
        ClassifyResponse::Error { error } => return Err(ModelError::Api(error)),
    };

    let find = |names: &[&str]| {
        labels
            .iter()
            .find(|l| names.iter().any(|n| l.label.eq_ignore_ascii_case(n)))
            .map(|l| l.score.clamp(0.0, 1.0))
    };
    let positive = find(&["POSITIVE", "LABEL_1"]);
    let negative = find(&["NEGATIVE", "LABEL_0"]);

    // Top-1 pipelines only return the winning label
    match (positive, negative) {
        (Some(positive), Some(negative)) => Ok(SentimentScores { positive, negative }),
        (Some(positive), None) => Ok(SentimentScores {
            positive,
            negative: 1.0 - positive,
        }),
        (None, Some(negative)) => Ok(SentimentScores {
            positive: 1.0 - negative,
            negative,
        }),
        (None, None) => Err(ModelError::Parse(format!("no sentiment labels in {}", body))),
    }
}
