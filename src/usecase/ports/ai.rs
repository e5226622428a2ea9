use anyhow::Result;
use async_trait::async_trait;

use crate::domain::entities::invoice::Invoice;
use crate::domain::entities::query::{QueryNote, SupportQuery};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AiError {
    #[error("Gemini service is not available. Please check your API key configuration.")]
    Unavailable,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Failed to {operation}: {message}")]
    Call {
        operation: &'static str,
        message: String,
    },
    #[error("request was cancelled")]
    Cancelled,
}

/// Which model a prompt is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Short summaries, suggestions and sentiment.
    Fast,
    /// Longer business analysis.
    Insights,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub tier: ModelTier,
    pub prompt: String,
}

/// Raw text generation against a hosted model.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// A usable credential is configured.
    fn is_configured(&self) -> bool;

    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryRequest {
    QueryNotes(Vec<QueryNote>),
    Invoice(Box<Invoice>),
    Business(Vec<Invoice>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentReport {
    pub sentiment: String,
    pub confidence: String,
    pub emotions: String,
    pub urgency: String,
    pub recommendation: String,
}

impl Default for SentimentReport {
    fn default() -> Self {
        Self {
            sentiment: "Neutral".to_string(),
            confidence: "Medium".to_string(),
            emotions: "None detected".to_string(),
            urgency: "Medium".to_string(),
            recommendation: "Follow standard procedures".to_string(),
        }
    }
}

#[async_trait]
pub trait AiAssistant: Send + Sync {
    fn is_available(&self) -> bool;

    async fn generate_summary(&self, request: SummaryRequest) -> Result<String, AiError>;

    async fn generate_response_suggestions(
        &self,
        query: &SupportQuery,
    ) -> Result<Vec<String>, AiError>;

    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentReport, AiError>;
}
