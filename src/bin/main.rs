use smartspend::{
    advisor::SavingsAdvisor,
    config::AppConfig,
    gemini::GeminiClient,
    store::TransactionStore,
    summary::{compute_summary, expense_breakdown, sorted_by_date},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const RECENT_LIMIT: usize = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let with_tips = std::env::args().skip(1).any(|arg| arg == "--tips");

    let config = AppConfig::from_env()?;
    let store = TransactionStore::open(config.open_blob_store().await?).await?;
    let transactions = store.snapshot().await;

    info!(count = transactions.len(), "Loaded transactions");

    let summary = compute_summary(&transactions);
    let symbol = summary.currency_symbol.clone();

    println!("\n=== SMARTSPEND SUMMARY ===");
    println!("Total Income:  {}{:.2}", symbol, summary.total_income);
    println!("Total Expense: {}{:.2}", symbol, summary.total_expense);
    println!("Net Savings:   {}{:.2}", symbol, summary.net_savings);
    match summary.savings_rate() {
        Some(rate) => println!("Savings Rate:  {}%", rate),
        None => println!("Savings Rate:  n/a"),
    }

    let breakdown = expense_breakdown(&transactions);
    if !breakdown.is_empty() {
        println!("\nExpenses by Category:");
        for entry in &breakdown {
            println!("  {:<15} {}{:.2}", entry.category, symbol, entry.total);
        }
    }

    println!("\nRecent Transactions:");
    if transactions.is_empty() {
        println!("  No transactions found. Start by adding one!");
    }
    for tx in sorted_by_date(&transactions).iter().take(RECENT_LIMIT) {
        let sign = if tx.is_income() { '+' } else { '-' };
        println!(
            "  {}  {:<30} {:<15} {}{}{:.2}",
            tx.date,
            tx.description,
            tx.category,
            sign,
            tx.currency.symbol(),
            tx.amount
        );
    }

    if with_tips {
        if transactions.is_empty() {
            println!("\nAdd some transactions to get personalized savings tips.");
            return Ok(());
        }

        let gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())?;
        let advisor = SavingsAdvisor::new(Arc::new(gemini)).with_timeout(config.advisor_timeout);
        let outcome = advisor.advise(&transactions, &symbol).await;

        println!("\nSavings Tips{}:", if outcome.is_fallback() { " (offline)" } else { "" });
        for (i, tip) in outcome.tips().iter().enumerate() {
            println!("  {}. {} [{} impact]", i + 1, tip.title, tip.impact);
            println!("     {}", tip.content);
        }
    }

    Ok(())
}
