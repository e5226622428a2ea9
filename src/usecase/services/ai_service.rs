use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::domain::entities::invoice::{Invoice, InvoiceStatus};
use crate::domain::entities::query::{QueryNote, SupportQuery};
use crate::domain::entities::record::format_day;
use crate::usecase::ports::ai::{
    AiAssistant, AiError, CompletionBackend, CompletionRequest, ModelTier, SentimentReport,
    SummaryRequest,
};
use crate::usecase::services::rate_gate::RateGate;

pub const NO_NOTES_SUMMARY: &str = "No notes available to summarize.";
pub const DEFAULT_SUGGESTION: &str =
    "Thank you for your inquiry. We are reviewing your request and will respond within 24 hours.";
const MAX_SUGGESTIONS: usize = 3;
const TOP_N: usize = 5;

/// Prompts, rate limiting and response parsing on top of a completion
/// backend.
pub struct AssistantService<B> {
    backend: B,
    gate: Arc<RateGate>,
}

impl<B: CompletionBackend> AssistantService<B> {
    pub fn new(backend: B, gate: Arc<RateGate>) -> Self {
        Self { backend, gate }
    }

    async fn call(
        &self,
        operation: &'static str,
        tier: ModelTier,
        prompt: String,
    ) -> Result<String, AiError> {
        self.gate.wait().await;
        debug!(operation, ?tier, prompt_chars = prompt.len(), "calling completion backend");
        self.backend
            .complete(CompletionRequest { tier, prompt })
            .await
            .map_err(|err| {
                warn!(operation, error = %err, "completion failed");
                AiError::Call {
                    operation,
                    message: format!("{err:#}"),
                }
            })
    }

    fn ensure_available(&self) -> Result<(), AiError> {
        if self.backend.is_configured() {
            Ok(())
        } else {
            Err(AiError::Unavailable)
        }
    }
}

#[async_trait]
impl<B: CompletionBackend> AiAssistant for AssistantService<B> {
    fn is_available(&self) -> bool {
        self.backend.is_configured()
    }

    async fn generate_summary(&self, request: SummaryRequest) -> Result<String, AiError> {
        self.ensure_available()?;
        match request {
            SummaryRequest::QueryNotes(notes) => {
                if notes.is_empty() {
                    return Ok(NO_NOTES_SUMMARY.to_string());
                }
                self.call("generate summary", ModelTier::Fast, notes_prompt(&notes))
                    .await
            }
            SummaryRequest::Invoice(invoice) => {
                self.call(
                    "generate invoice summary",
                    ModelTier::Fast,
                    invoice_prompt(&invoice),
                )
                .await
            }
            SummaryRequest::Business(invoices) => {
                if invoices.is_empty() {
                    return Err(AiError::InvalidInput(
                        "Invoice data is required for business insights.".to_string(),
                    ));
                }
                self.call(
                    "generate business insights",
                    ModelTier::Insights,
                    business_prompt(&invoices),
                )
                .await
            }
        }
    }

    async fn generate_response_suggestions(
        &self,
        query: &SupportQuery,
    ) -> Result<Vec<String>, AiError> {
        self.ensure_available()?;
        let text = self
            .call(
                "generate response suggestions",
                ModelTier::Fast,
                suggestions_prompt(query),
            )
            .await?;
        Ok(parse_suggestions(&text))
    }

    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentReport, AiError> {
        self.ensure_available()?;
        if text.trim().is_empty() {
            return Err(AiError::InvalidInput(
                "Text is required for sentiment analysis.".to_string(),
            ));
        }
        let response = self
            .call("analyze sentiment", ModelTier::Fast, sentiment_prompt(text))
            .await?;
        Ok(parse_sentiment(&response))
    }
}

fn notes_prompt(notes: &[QueryNote]) -> String {
    let notes_text = notes
        .iter()
        .map(|note| {
            format!(
                "{} ({}): {}",
                note.author,
                format_day(note.created_at),
                note.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Please provide a concise summary of the following customer support query notes. \
Focus on key issues, resolutions, and current status:

{notes_text}

Provide a professional summary that highlights:
1. Main issues or concerns raised
2. Actions taken by support agents
3. Current status and next steps
4. Any urgent matters requiring attention

Keep the summary under 200 words and use bullet points where appropriate."
    )
}

fn invoice_prompt(invoice: &Invoice) -> String {
    let items_text = invoice
        .items
        .iter()
        .map(|item| {
            format!(
                "{} - Qty: {}, Rate: ${:.2}, Total: ${:.2}",
                item.description, item.quantity, item.rate, item.amount
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let notes = if invoice.notes.trim().is_empty() {
        "No additional notes"
    } else {
        invoice.notes.as_str()
    };

    format!(
        "Generate a professional invoice summary for the following invoice data:

Invoice Number: {}
Customer: {}
Total Amount: ${:.2}
Status: {}
Due Date: {}

Line Items:
{items_text}

Notes: {notes}

Provide a concise business summary that includes:
1. Overview of services/products provided
2. Total value and payment status
3. Key highlights or important notes
4. Professional tone suitable for business communications

Keep the summary under 150 words.",
        invoice.invoice_number,
        invoice.customer,
        invoice.amount,
        invoice.status,
        format_day(invoice.due_date),
    )
}

fn suggestions_prompt(query: &SupportQuery) -> String {
    let notes = if query.notes.is_empty() {
        "No previous notes".to_string()
    } else {
        query
            .notes
            .iter()
            .map(|note| format!("- {}", note.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Based on the following customer support query, suggest 3 professional response options:

Customer: {}
Subject: {}
Description: {}
Priority: {}
Current Status: {}

Previous Notes:
{notes}

Provide 3 different response approaches:
1. Immediate acknowledgment and next steps
2. Technical solution-focused response
3. Escalation or follow-up response

Each response should be professional, helpful, and appropriate for the query priority level.",
        query.customer, query.subject, query.description, query.priority, query.status,
    )
}

fn sentiment_prompt(text: &str) -> String {
    format!(
        "Analyze the sentiment of the following customer communication text and provide a structured response:

Text: \"{text}\"

Please provide your analysis in the following format:
Sentiment: [Positive/Negative/Neutral]
Confidence: [High/Medium/Low]
Key Emotions: [list main emotions detected]
Urgency Level: [High/Medium/Low]
Recommended Action: [brief recommendation for handling this communication]

Be concise and professional in your analysis."
    )
}

fn business_prompt(invoices: &[Invoice]) -> String {
    let total: f64 = invoices.iter().map(|invoice| invoice.amount).sum();
    let (paid_count, paid_total) = status_totals(invoices, InvoiceStatus::Paid);
    let (overdue_count, overdue_total) = status_totals(invoices, InvoiceStatus::Overdue);

    let mut prompt = String::new();
    let _ = writeln!(prompt, "Analyze the following invoice data and provide business insights:\n");
    let _ = writeln!(prompt, "Total Invoices: {}", invoices.len());
    let _ = writeln!(prompt, "Total Revenue: ${total:.2}");
    let _ = writeln!(prompt, "Paid Invoices: {paid_count} (${paid_total:.2})");
    let _ = writeln!(prompt, "Overdue Invoices: {overdue_count} (${overdue_total:.2})\n");
    let _ = writeln!(prompt, "Top Customers by Revenue:");
    for (name, amount) in top_customers(invoices).into_iter().take(TOP_N) {
        let _ = writeln!(prompt, "{name}: ${amount:.2}");
    }
    let _ = writeln!(prompt, "\nCommon Services:");
    for (service, count) in common_services(invoices).into_iter().take(TOP_N) {
        let _ = writeln!(prompt, "{service} ({count} times)");
    }
    prompt.push_str(
        "\nProvide insights on:
1. Revenue trends and performance
2. Customer payment behavior
3. Service demand patterns
4. Recommendations for improvement
5. Potential risks or opportunities

Keep the analysis professional and actionable for business decision-making.",
    );
    prompt
}

fn status_totals(invoices: &[Invoice], status: InvoiceStatus) -> (usize, f64) {
    invoices
        .iter()
        .filter(|invoice| invoice.status == status)
        .fold((0, 0.0), |(count, sum), invoice| (count + 1, sum + invoice.amount))
}

/// Revenue per customer, highest first; ties by name.
pub fn top_customers(invoices: &[Invoice]) -> Vec<(String, f64)> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for invoice in invoices {
        *totals.entry(invoice.customer.as_str()).or_default() += invoice.amount;
    }
    let mut ranked: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(name, total)| (name.to_string(), total))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Line-item descriptions by frequency, most common first; ties by name.
pub fn common_services(invoices: &[Invoice]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in invoices.iter().flat_map(|invoice| invoice.items.iter()) {
        *counts.entry(item.description.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(service, count)| (service.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Splits a numbered list (`1. ... 2. ...`) into at most three suggestions.
/// Falls back to a stock reply when nothing usable comes back.
pub fn parse_suggestions(text: &str) -> Vec<String> {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    let marker = MARKER.get_or_init(|| Regex::new(r"\d\.\s").expect("marker pattern is valid"));

    let suggestions: Vec<String> = marker
        .split(text)
        .map(str::trim)
        .filter(|segment| segment.chars().count() > 10)
        .take(MAX_SUGGESTIONS)
        .map(str::to_string)
        .collect();

    if suggestions.is_empty() {
        vec![DEFAULT_SUGGESTION.to_string()]
    } else {
        suggestions
    }
}

/// Reads `Key: value` lines; absent keys keep their defaults.
pub fn parse_sentiment(text: &str) -> SentimentReport {
    let mut report = SentimentReport::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_start_matches(['*', '-', ' ']).trim_end_matches('*');
        let value = value.trim().trim_start_matches('*').trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let slot = match key {
            "Sentiment" => &mut report.sentiment,
            "Confidence" => &mut report.confidence,
            "Key Emotions" => &mut report.emotions,
            "Urgency Level" => &mut report.urgency,
            "Recommended Action" => &mut report.recommendation,
            _ => continue,
        };
        *slot = value.to_string();
    }
    report
}
