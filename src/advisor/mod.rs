//! Savings advisor
//!
//! Turns the transaction history into a prompt, asks a text-generation
//! backend for schema-constrained JSON tips and parses the answer.
//! Every failure collapses into a single canned tip; callers never see an error.

use crate::error::SpendError;
use crate::models::{Impact, SavingsTip, Transaction};
use crate::summary::{aggregate_expenses, compute_summary};
use crate::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub mod panel;
pub use panel::{AdvisoryPanel, AdvisorySnapshot, AdvisoryStatus, TipSource};

/// Number of newest transactions quoted verbatim in the prompt
pub const RECENT_ACTIVITY_COUNT: usize = 5;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const FALLBACK_TITLE: &str = "Maintain Consistency";
pub const FALLBACK_CONTENT: &str =
    "You're doing great by tracking your spending. Keep it up to see long-term patterns.";

/// Capability for producing tip JSON from a prompt and a response schema
#[async_trait]
pub trait TipGenerator: Send + Sync {
    /// Return the raw JSON text produced for `prompt`, shaped by `schema`
    async fn generate_tips(&self, prompt: &str, schema: &Value) -> Result<String>;
}

/// Result of one advice request
#[derive(Debug, Clone, PartialEq)]
pub enum AdviceOutcome {
    Generated(Vec<SavingsTip>),
    Fallback(Vec<SavingsTip>),
}

impl AdviceOutcome {
    pub fn tips(&self) -> &[SavingsTip] {
        match self {
            AdviceOutcome::Generated(tips) | AdviceOutcome::Fallback(tips) => tips,
        }
    }

    pub fn into_tips(self) -> Vec<SavingsTip> {
        match self {
            AdviceOutcome::Generated(tips) | AdviceOutcome::Fallback(tips) => tips,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, AdviceOutcome::Fallback(_))
    }
}

/// Response contract declared to the generator
pub fn tip_response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": {
                    "type": "STRING",
                    "description": "Short title of the tip"
                },
                "content": {
                    "type": "STRING",
                    "description": "Detailed actionable advice"
                },
                "impact": {
                    "type": "STRING",
                    "enum": ["High", "Medium", "Low"],
                    "description": "Expected financial impact"
                }
            },
            "required": ["title", "content", "impact"]
        }
    })
}

/// The tip returned whenever generation fails
pub fn fallback_tips() -> Vec<SavingsTip> {
    vec![SavingsTip {
        title: FALLBACK_TITLE.to_string(),
        content: FALLBACK_CONTENT.to_string(),
        impact: Impact::Medium,
    }]
}

/// One-line description of the newest transactions
fn describe_recent_activity(transactions: &[Transaction], currency_symbol: &str) -> String {
    transactions
        .iter()
        .take(RECENT_ACTIVITY_COUNT)
        .map(|t| {
            format!(
                "{}: {} ({}{} - {})",
                t.kind, t.description, currency_symbol, t.amount, t.category
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Build the advisor prompt from the transaction history
pub fn build_prompt(transactions: &[Transaction], currency_symbol: &str) -> String {
    let income = compute_summary(transactions).total_income;
    let expenses = serde_json::to_string(&aggregate_expenses(transactions))
        .unwrap_or_else(|_| "{}".to_string());
    let recent = describe_recent_activity(transactions, currency_symbol);

    format!(
        r#"As a professional financial advisor, analyze this financial state:
Active Currency: {symbol}
Total Monthly Income: {symbol}{income}
Cumulative Expenses by Category: {expenses}

MOST RECENT ACTIVITY: {recent}

Provide 3 specific, actionable, and personalized savings tips.
Crucially, if the recent activity shows a high expense or a new trend, acknowledge it and suggest how to optimize it.
The goal is to help the user save more money this month."#,
        symbol = currency_symbol,
        income = income,
        expenses = expenses,
        recent = recent,
    )
}

/// Parse the generator's JSON array into tips
pub fn parse_tips(raw: &str) -> Result<Vec<SavingsTip>> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if cleaned.is_empty() {
        return Err(SpendError::Advisor("empty tip response".to_string()));
    }

    serde_json::from_str(cleaned).map_err(|e| {
        SpendError::Advisor(format!("Failed to parse tip response: {} | raw={}", e, raw))
    })
}

/// Orchestrates one tip request against a generator
pub struct SavingsAdvisor {
    generator: Arc<dyn TipGenerator>,
    timeout: Duration,
}

impl SavingsAdvisor {
    pub fn new(generator: Arc<dyn TipGenerator>) -> Self {
        Self {
            generator,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tips for the given history; the fallback tip on any failure.
    ///
    /// Callers are expected not to ask with an empty history.
    pub async fn request_tips(
        &self,
        transactions: &[Transaction],
        currency_symbol: &str,
    ) -> Vec<SavingsTip> {
        self.advise(transactions, currency_symbol).await.into_tips()
    }

    /// Same as `request_tips` but reports whether the fallback was used
    pub async fn advise(&self, transactions: &[Transaction], currency_symbol: &str) -> AdviceOutcome {
        match self.try_generate(transactions, currency_symbol).await {
            Ok(tips) => {
                info!(tip_count = tips.len(), "Savings tips generated");
                AdviceOutcome::Generated(tips)
            }
            Err(e) => {
                warn!(error = %e, "Error fetching savings tips, using fallback");
                AdviceOutcome::Fallback(fallback_tips())
            }
        }
    }

    async fn try_generate(
        &self,
        transactions: &[Transaction],
        currency_symbol: &str,
    ) -> Result<Vec<SavingsTip>> {
        let prompt = build_prompt(transactions, currency_symbol);
        let schema = tip_response_schema();

        debug!(
            transaction_count = transactions.len(),
            prompt_len = prompt.len(),
            "Requesting savings tips"
        );

        let raw = tokio::time::timeout(self.timeout, self.generator.generate_tips(&prompt, &schema))
            .await
            .map_err(|_| {
                SpendError::Advisor(format!(
                    "tip generation timed out after {}s",
                    self.timeout.as_secs_f32()
                ))
            })??;

        parse_tips(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, CurrencyCode, TransactionType};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Returns a fixed body or error
    struct StubGenerator(std::result::Result<String, String>);

    #[async_trait]
    impl TipGenerator for StubGenerator {
        async fn generate_tips(&self, _prompt: &str, _schema: &Value) -> Result<String> {
            self.0.clone().map_err(SpendError::Llm)
        }
    }

    /// Records what it was asked
    #[derive(Default)]
    struct RecordingGenerator {
        calls: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl TipGenerator for RecordingGenerator {
        async fn generate_tips(&self, prompt: &str, schema: &Value) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), schema.clone()));
            Ok("[]".to_string())
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl TipGenerator for SlowGenerator {
        async fn generate_tips(&self, _prompt: &str, _schema: &Value) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("[]".to_string())
        }
    }

    fn tx(kind: TransactionType, category: Category, amount: f64, description: &str) -> Transaction {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            category,
            amount,
            currency: CurrencyCode::Usd,
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            description: description.to_string(),
        }
    }

    fn history() -> Vec<Transaction> {
        vec![
            tx(TransactionType::Expense, Category::Entertainment, 120.0, "Concert"),
            tx(TransactionType::Income, Category::Salary, 3000.0, "June pay"),
            tx(TransactionType::Expense, Category::Food, 45.5, "Groceries"),
            tx(TransactionType::Expense, Category::Housing, 1100.0, "Rent"),
            tx(TransactionType::Expense, Category::Food, 20.0, "Lunch"),
            tx(TransactionType::Expense, Category::Utilities, 60.0, "Power bill"),
        ]
    }

    fn assert_fallback(tips: &[SavingsTip]) {
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].title, "Maintain Consistency");
        assert_eq!(tips[0].impact, Impact::Medium);
    }

    #[tokio::test]
    async fn test_well_formed_response_is_returned_verbatim() {
        let body = r#"[
            {"title": "Cut dining out", "content": "Cook twice a week.", "impact": "High"},
            {"title": "Review utilities", "content": "Compare providers.", "impact": "Low"}
        ]"#;
        let advisor = SavingsAdvisor::new(Arc::new(StubGenerator(Ok(body.to_string()))));

        let tips = advisor.request_tips(&history(), "$").await;

        assert_eq!(
            tips,
            vec![
                SavingsTip {
                    title: "Cut dining out".to_string(),
                    content: "Cook twice a week.".to_string(),
                    impact: Impact::High,
                },
                SavingsTip {
                    title: "Review utilities".to_string(),
                    content: "Compare providers.".to_string(),
                    impact: Impact::Low,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_array_is_a_valid_answer() {
        let advisor = SavingsAdvisor::new(Arc::new(StubGenerator(Ok("[]".to_string()))));
        let outcome = advisor.advise(&history(), "$").await;
        assert_eq!(outcome, AdviceOutcome::Generated(vec![]));
    }

    #[tokio::test]
    async fn test_service_error_falls_back() {
        let advisor = SavingsAdvisor::new(Arc::new(StubGenerator(Err("503 unavailable".to_string()))));
        let outcome = advisor.advise(&history(), "$").await;
        assert!(outcome.is_fallback());
        assert_fallback(outcome.tips());
    }

    #[tokio::test]
    async fn test_malformed_json_falls_back() {
        for body in ["not json", "{\"title\": \"x\"}", "[{\"title\": \"x\"}]", "   "] {
            let advisor = SavingsAdvisor::new(Arc::new(StubGenerator(Ok(body.to_string()))));
            assert_fallback(&advisor.request_tips(&history(), "$").await);
        }
    }

    #[tokio::test]
    async fn test_wrong_impact_case_falls_back() {
        let body = r#"[{"title": "t", "content": "c", "impact": "high"}]"#;
        let advisor = SavingsAdvisor::new(Arc::new(StubGenerator(Ok(body.to_string()))));
        assert_fallback(&advisor.request_tips(&history(), "$").await);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let advisor =
            SavingsAdvisor::new(Arc::new(SlowGenerator)).with_timeout(Duration::from_millis(20));
        assert_fallback(&advisor.request_tips(&history(), "$").await);
    }

    #[tokio::test]
    async fn test_request_carries_prompt_and_schema() {
        let generator = Arc::new(RecordingGenerator::default());
        let advisor = SavingsAdvisor::new(generator.clone());

        advisor.request_tips(&history(), "₦").await;

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (prompt, schema) = &calls[0];
        assert_eq!(schema, &tip_response_schema());
        assert!(prompt.contains("Active Currency: ₦"));
        assert!(prompt.contains("Total Monthly Income: ₦3000"));
    }

    #[test]
    fn test_prompt_lists_five_newest_transactions() {
        let prompt = build_prompt(&history(), "$");

        assert!(prompt.contains(
            "MOST RECENT ACTIVITY: EXPENSE: Concert ($120 - Entertainment); INCOME: June pay ($3000 - Salary); \
             EXPENSE: Groceries ($45.5 - Food); EXPENSE: Rent ($1100 - Housing); EXPENSE: Lunch ($20 - Food)"
        ));
        assert!(!prompt.contains("Power bill"));
    }

    #[test]
    fn test_prompt_includes_category_totals() {
        let prompt = build_prompt(&history(), "$");
        let line = prompt
            .lines()
            .find(|l| l.starts_with("Cumulative Expenses by Category: "))
            .unwrap();
        let json = line.trim_start_matches("Cumulative Expenses by Category: ");
        let totals: Value = serde_json::from_str(json).unwrap();

        assert_eq!(totals["Food"], 65.5);
        assert_eq!(totals["Housing"], 1100.0);
        assert!(totals.get("Salary").is_none());
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = tip_response_schema();
        assert_eq!(schema["items"]["required"], json!(["title", "content", "impact"]));
        assert_eq!(
            schema["items"]["properties"]["impact"]["enum"],
            json!(["High", "Medium", "Low"])
        );
    }

    #[test]
    fn test_parse_tips_strips_code_fence() {
        let raw = "```json\n[{\"title\":\"a\",\"content\":\"b\",\"impact\":\"Low\"}]\n```";
        let tips = parse_tips(raw).unwrap();
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].impact, Impact::Low);
    }
}
