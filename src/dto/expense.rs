use crate::domain;
use crate::domain::view::ListView;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(test, derive(Serialize))]
pub struct ExpenseDto {
    pub id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub note: Option<String>,
    pub expense_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_deleted: Option<bool>,
}

impl From<ExpenseDto> for domain::expense::Expense {
    fn from(value: ExpenseDto) -> Self {
        domain::expense::Expense {
            id: value.id,
            user_id: value.user_id,
            title: value.title,
            category: value.category,
            kind: value.kind,
            amount: value.amount,
            currency: value.currency,
            note: value.note,
            expense_date: value.expense_date,
            created_at: value.created_at,
            is_deleted: value.is_deleted,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct UpsertExpenseDto {
    pub id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub currency: String,
    pub expense_date: DateTime<Utc>,
    pub note: Option<String>,
}

impl From<&domain::expense::UpsertExpense> for UpsertExpenseDto {
    fn from(value: &domain::expense::UpsertExpense) -> Self {
        UpsertExpenseDto {
            id: value.id,
            user_id: value.user_id,
            title: value.title.clone(),
            amount: value.amount,
            category: value.category.clone(),
            kind: value.kind.clone(),
            currency: value.currency.clone(),
            expense_date: value.expense_date,
            note: value.note.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub label: String,
    pub value: f64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ExpenseBreakdown {
    pub total: f64,
    /// Percent change against the previous month
    pub change: f64,
    pub categories: Vec<CategoryShare>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct IncomeVsExpense {
    pub total: f64,
    pub change: f64,
    pub months: Vec<String>,
    pub values: Vec<f64>,
}

/// Monthly statistics the backend attaches to an expense page as `additionalData`
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ExpenseStats {
    #[serde(rename = "expenseBreakdown", default)]
    pub expense_breakdown: Option<ExpenseBreakdown>,
    #[serde(rename = "incomeVsExpense", default)]
    pub income_vs_expense: Option<IncomeVsExpense>,
}

impl ExpenseStats {
    pub fn parse(raw: &str) -> Result<ExpenseStats, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Statistics of a numbered expense page. [None] when the page carries none or they don't
    /// parse.
    pub fn from_view(view: &ListView<domain::expense::Expense>) -> Option<ExpenseStats> {
        let ListView::Paged(page) = view else {
            return None;
        };
        let raw = page.additional_data.as_deref()?;

        match Self::parse(raw) {
            Ok(stats) => Some(stats),
            Err(err) => {
                tracing::warn!("Expense statistics did not parse: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::view::Page;
    use serde_json::json;

    #[test]
    fn type_field_maps_to_kind() {
        let dto: ExpenseDto = serde_json::from_value(json!({
            "id": 1, "user_id": 2, "title": "Salary", "category": "Work", "type": "income",
            "amount": 3000.0, "currency": "USD", "note": null,
            "expense_date": "2025-06-01T00:00:00Z", "created_at": null, "is_deleted": false
        }))
        .expect("expense should decode");

        let expense = domain::expense::Expense::from(dto);
        assert_eq!(Some("income".to_owned()), expense.kind);
    }

    #[test]
    fn reads_statistics_from_page() {
        let raw = json!({
            "expenseBreakdown": {
                "total": 420.5,
                "change": 12.0,
                "categories": [{"label": "Food", "value": 300.5}, {"label": "Rent", "value": 120.0}]
            },
            "incomeVsExpense": {
                "total": 1000.0, "change": -4.5, "months": ["May", "Jun"], "values": [900.0, 1000.0]
            }
        })
        .to_string();
        let view = ListView::Paged(Page {
            results: Vec::new(),
            page: 1,
            total_page: 1,
            additional_data: Some(raw),
        });

        let stats = ExpenseStats::from_view(&view).expect("stats should parse");

        let breakdown = stats.expense_breakdown.expect("breakdown present");
        assert_eq!(2, breakdown.categories.len());
        assert_eq!("Food", breakdown.categories[0].label);
        let income = stats.income_vs_expense.expect("income present");
        assert_eq!(vec!["May", "Jun"], income.months);
    }

    #[test]
    fn garbage_statistics_are_ignored() {
        let view = ListView::Paged(Page {
            results: Vec::new(),
            page: 1,
            total_page: 1,
            additional_data: Some("not json".to_owned()),
        });

        assert_eq!(None, ExpenseStats::from_view(&view));
    }
}
