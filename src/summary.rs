//! Summary and category aggregation
//!
//! Pure functions over the transaction sequence. Totals are summed nominally
//! across currencies and labeled with the symbol of the newest transaction.

use crate::models::{Category, CategoryTotal, SummaryData, Transaction, DEFAULT_CURRENCY_SYMBOL};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Derive income/expense totals and the display currency symbol
pub fn compute_summary(transactions: &[Transaction]) -> SummaryData {
    let total_income: f64 = transactions
        .iter()
        .filter(|t| t.is_income())
        .fold(0.0, |acc, t| acc + t.amount);

    let total_expense: f64 = transactions
        .iter()
        .filter(|t| t.is_expense())
        .fold(0.0, |acc, t| acc + t.amount);

    // Index 0 is the most recently inserted transaction
    let currency_symbol = transactions
        .first()
        .map(|t| t.currency.symbol())
        .unwrap_or(DEFAULT_CURRENCY_SYMBOL);

    SummaryData {
        total_income,
        total_expense,
        net_savings: total_income - total_expense,
        currency_symbol: currency_symbol.to_string(),
    }
}

/// Total expense amount per category
pub fn aggregate_expenses(transactions: &[Transaction]) -> BTreeMap<Category, f64> {
    transactions
        .iter()
        .filter(|t| t.is_expense())
        .fold(BTreeMap::new(), |mut acc, t| {
            *acc.entry(t.category).or_insert(0.0) += t.amount;
            acc
        })
}

/// Expense totals sorted largest first, ready for charting
pub fn expense_breakdown(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut breakdown: Vec<CategoryTotal> = aggregate_expenses(transactions)
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category,
            total,
            color: category.color().to_string(),
        })
        .collect();

    breakdown.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    breakdown
}

/// Copy of the sequence ordered by calendar date, newest first
pub fn sorted_by_date(transactions: &[Transaction]) -> Vec<Transaction> {
    let mut sorted = transactions.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}
