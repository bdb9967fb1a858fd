//! Core data models for the tracker

use crate::error::SpendError;
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Housing,
    Transportation,
    Food,
    Utilities,
    Insurance,
    Healthcare,
    Savings,
    Personal,
    Entertainment,
    Salary,
    Bonus,
    Investment,
    Other,
}

pub const INCOME_CATEGORIES: &[Category] = &[
    Category::Salary,
    Category::Bonus,
    Category::Investment,
    Category::Other,
];

pub const EXPENSE_CATEGORIES: &[Category] = &[
    Category::Housing,
    Category::Transportation,
    Category::Food,
    Category::Utilities,
    Category::Insurance,
    Category::Healthcare,
    Category::Personal,
    Category::Entertainment,
    Category::Other,
];

/// Chart color for categories without one of their own
pub const DEFAULT_CATEGORY_COLOR: &str = "#94a3b8";

impl Category {
    /// Categories a transaction of the given type may use
    pub fn allowed_for(kind: TransactionType) -> &'static [Category] {
        match kind {
            TransactionType::Income => INCOME_CATEGORIES,
            TransactionType::Expense => EXPENSE_CATEGORIES,
        }
    }

    pub fn is_allowed_for(self, kind: TransactionType) -> bool {
        Self::allowed_for(kind).contains(&self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Housing => "Housing",
            Category::Transportation => "Transportation",
            Category::Food => "Food",
            Category::Utilities => "Utilities",
            Category::Insurance => "Insurance",
            Category::Healthcare => "Healthcare",
            Category::Savings => "Savings",
            Category::Personal => "Personal",
            Category::Entertainment => "Entertainment",
            Category::Salary => "Salary",
            Category::Bonus => "Bonus",
            Category::Investment => "Investment",
            Category::Other => "Other",
        }
    }

    /// Hex color used by the expense breakdown chart
    pub fn color(self) -> &'static str {
        match self {
            Category::Housing => "#6366f1",
            Category::Transportation => "#f59e0b",
            Category::Food => "#10b981",
            Category::Utilities => "#06b6d4",
            Category::Insurance => "#8b5cf6",
            Category::Healthcare => "#ef4444",
            Category::Personal => "#ec4899",
            Category::Entertainment => "#f97316",
            Category::Other => "#94a3b8",
            Category::Savings | Category::Salary | Category::Bonus | Category::Investment => {
                DEFAULT_CATEGORY_COLOR
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    Usd,
    Ngn,
    Eur,
    Gbp,
    Jpy,
}

pub const CURRENCIES: &[CurrencyCode] = &[
    CurrencyCode::Usd,
    CurrencyCode::Ngn,
    CurrencyCode::Eur,
    CurrencyCode::Gbp,
    CurrencyCode::Jpy,
];

/// Symbol used when no currency can be resolved
pub const DEFAULT_CURRENCY_SYMBOL: &str = "$";

impl CurrencyCode {
    pub fn code(self) -> &'static str {
        match self {
            CurrencyCode::Usd => "USD",
            CurrencyCode::Ngn => "NGN",
            CurrencyCode::Eur => "EUR",
            CurrencyCode::Gbp => "GBP",
            CurrencyCode::Jpy => "JPY",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CurrencyCode::Usd => "US Dollar",
            CurrencyCode::Ngn => "Nigerian Naira",
            CurrencyCode::Eur => "Euro",
            CurrencyCode::Gbp => "British Pound",
            CurrencyCode::Jpy => "Japanese Yen",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CurrencyCode::Usd => "$",
            CurrencyCode::Ngn => "₦",
            CurrencyCode::Eur => "€",
            CurrencyCode::Gbp => "£",
            CurrencyCode::Jpy => "¥",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Impact {
    High,
    Medium,
    Low,
}

//
// ================= Transaction =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: Category,
    pub amount: f64,
    pub currency: CurrencyCode,
    pub date: NaiveDate,
    pub description: String,
}

/// Creation request: every transaction field except the id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: Category,
    pub amount: f64,
    pub currency: CurrencyCode,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
}

impl Transaction {
    /// Validate a creation request and mint a fresh id
    pub fn create(new: NewTransaction) -> Result<Self> {
        if !new.amount.is_finite() || new.amount <= 0.0 {
            return Err(SpendError::InvalidTransaction(format!(
                "amount must be a positive number, got {}",
                new.amount
            )));
        }

        if !new.category.is_allowed_for(new.kind) {
            return Err(SpendError::InvalidTransaction(format!(
                "category {} is not valid for {} transactions",
                new.category, new.kind
            )));
        }

        let description = match new.description {
            Some(text) if !text.trim().is_empty() => text,
            _ => new.category.name().to_string(),
        };

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            kind: new.kind,
            category: new.category,
            amount: new.amount,
            currency: new.currency,
            date: new.date,
            description,
        })
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }
}

//
// ================= Derived Views =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryData {
    pub total_income: f64,
    pub total_expense: f64,
    pub net_savings: f64,
    pub currency_symbol: String,
}

impl SummaryData {
    /// Percent of income kept, rounded; None until some income exists
    pub fn savings_rate(&self) -> Option<i64> {
        if self.total_income > 0.0 {
            Some((self.net_savings / self.total_income * 100.0).round() as i64)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: f64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavingsTip {
    pub title: String,
    pub content: String,
    pub impact: Impact,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Impact::High => "High",
            Impact::Medium => "Medium",
            Impact::Low => "Low",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_tx(kind: TransactionType, category: Category, amount: f64) -> NewTransaction {
        NewTransaction {
            kind,
            category,
            amount,
            currency: CurrencyCode::Usd,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            description: None,
        }
    }

    #[test]
    fn test_create_rejects_non_positive_amounts() {
        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let result = Transaction::create(new_tx(TransactionType::Expense, Category::Food, amount));
            assert!(matches!(result, Err(SpendError::InvalidTransaction(_))));
        }
    }

    #[test]
    fn test_create_rejects_category_of_other_type() {
        let result = Transaction::create(new_tx(TransactionType::Income, Category::Food, 10.0));
        assert!(result.is_err());

        let result = Transaction::create(new_tx(TransactionType::Expense, Category::Salary, 10.0));
        assert!(result.is_err());

        let result = Transaction::create(new_tx(TransactionType::Expense, Category::Savings, 10.0));
        assert!(result.is_err());
    }

    #[test]
    fn test_other_is_valid_for_both_types() {
        assert!(Transaction::create(new_tx(TransactionType::Income, Category::Other, 1.0)).is_ok());
        assert!(Transaction::create(new_tx(TransactionType::Expense, Category::Other, 1.0)).is_ok());
    }

    #[test]
    fn test_description_defaults_to_category() {
        let tx = Transaction::create(new_tx(TransactionType::Expense, Category::Food, 12.5)).unwrap();
        assert_eq!(tx.description, "Food");

        let mut blank = new_tx(TransactionType::Income, Category::Salary, 100.0);
        blank.description = Some("   ".to_string());
        let tx = Transaction::create(blank).unwrap();
        assert_eq!(tx.description, "Salary");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Transaction::create(new_tx(TransactionType::Expense, Category::Food, 1.0)).unwrap();
        let b = Transaction::create(new_tx(TransactionType::Expense, Category::Food, 1.0)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_wire_format_matches_stored_layout() {
        let json = r#"{
            "id": "k3j9x1a",
            "type": "EXPENSE",
            "category": "Food",
            "amount": 50,
            "currency": "NGN",
            "date": "2024-05-02",
            "description": "Groceries"
        }"#;

        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.kind, TransactionType::Expense);
        assert_eq!(tx.currency, CurrencyCode::Ngn);
        assert_eq!(tx.amount, 50.0);

        let back = serde_json::to_value(&tx).unwrap();
        assert_eq!(back["type"], "EXPENSE");
        assert_eq!(back["date"], "2024-05-02");
    }

    #[test]
    fn test_creation_request_requires_date() {
        let missing = r#"{"type": "EXPENSE", "category": "Food", "amount": 5, "currency": "USD"}"#;
        assert!(serde_json::from_str::<NewTransaction>(missing).is_err());

        let dated = r#"{"type": "EXPENSE", "category": "Food", "amount": 5, "currency": "USD", "date": "2024-03-01"}"#;
        let new: NewTransaction = serde_json::from_str(dated).unwrap();
        let tx = Transaction::create(new).unwrap();
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_unknown_currency_code_is_rejected() {
        let json = r#"{"type": "EXPENSE", "category": "Food", "amount": 5, "currency": "XYZ", "date": "2024-03-01"}"#;
        assert!(serde_json::from_str::<NewTransaction>(json).is_err());
        assert_eq!(CurrencyCode::Gbp.symbol(), "£");
    }

    #[test]
    fn test_savings_rate() {
        let summary = SummaryData {
            total_income: 1000.0,
            total_expense: 250.0,
            net_savings: 750.0,
            currency_symbol: "$".to_string(),
        };
        assert_eq!(summary.savings_rate(), Some(75));

        let empty = SummaryData {
            total_income: 0.0,
            total_expense: 10.0,
            net_savings: -10.0,
            currency_symbol: "$".to_string(),
        };
        assert_eq!(empty.savings_rate(), None);
    }
}
