use crate::domain;
use crate::domain::Error;
use crate::domain::expense::driven_ports::{ExpenseReader, ExpenseWriter};
use crate::domain::filters::{MonthFilter, PageQuery, non_blank};
use crate::domain::query_cache::{QueryCache, QueryKey};
use crate::domain::view::{ListView, ViewItem};
use chrono::{DateTime, Utc};
use tracing::{error, info};
use validator::Validate;

#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub category: Option<String>,
    /// Income or expense, sent as `type` on the wire
    pub kind: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub note: Option<String>,
    pub expense_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_deleted: Option<bool>,
}

impl Expense {
    fn optimistic(temp_id: i64, user_id: i64, upsert: &UpsertExpense) -> Expense {
        let mut expense = Expense {
            id: temp_id,
            user_id,
            title: None,
            category: None,
            kind: None,
            amount: None,
            currency: None,
            note: None,
            expense_date: None,
            created_at: Some(Utc::now()),
            is_deleted: Some(false),
        };
        expense.apply(upsert);
        expense
    }

    pub fn apply(&mut self, upsert: &UpsertExpense) {
        self.title = upsert.title.clone();
        self.category = upsert.category.clone();
        self.kind = upsert.kind.clone();
        self.amount = upsert.amount;
        self.currency = Some(upsert.currency.clone());
        self.note = upsert.note.clone();
        self.expense_date = Some(upsert.expense_date);
    }
}

impl ViewItem for Expense {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct UpsertExpense {
    pub id: i64,
    pub user_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(range(min = 0.0))]
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub kind: Option<String>,
    #[validate(length(min = 1))]
    pub currency: String,
    pub expense_date: DateTime<Utc>,
    pub note: Option<String>,
}

/// Filters of the expense screen. Every setter sends the list back to the first page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpenseQuery {
    pub paging: PageQuery,
    pub month: MonthFilter,
    pub category: Option<String>,
    pub kind: Option<String>,
}

impl ExpenseQuery {
    pub fn new(month: MonthFilter) -> Self {
        ExpenseQuery {
            paging: PageQuery::default(),
            month,
            category: None,
            kind: None,
        }
    }

    pub fn set_month(&mut self, month: MonthFilter) {
        self.month = month;
        self.paging.go_to_page(1);
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.category = category.and_then(non_blank);
        self.paging.go_to_page(1);
    }

    pub fn set_kind(&mut self, kind: Option<String>) {
        self.kind = kind.and_then(non_blank);
        self.paging.go_to_page(1);
    }

    /// Drops the category, type, and search filters
    pub fn clear_filters(&mut self) {
        self.category = None;
        self.kind = None;
        self.paging.search = None;
        self.paging.go_to_page(1);
    }

    /// How many of the optional filters are set, shown as a badge next to the filter button
    pub fn active_filter_count(&self) -> usize {
        [
            self.category.is_some(),
            self.kind.is_some(),
            self.paging.search.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::new("expense")
            .with(self.paging.page)
            .with(self.paging.page_size)
            .with(self.month.year)
            .with(self.month.month)
            .with(self.paging.sort)
            .with_opt(self.paging.search.as_deref())
            .with_opt(self.category.as_deref())
            .with_opt(self.kind.as_deref())
    }
}

pub mod driven_ports {
    use super::*;
    use crate::domain::DrivenPortError;

    pub trait ExpenseReader {
        async fn expense_page(
            &self,
            user_id: i64,
            query: &ExpenseQuery,
        ) -> Result<ListView<Expense>, DrivenPortError>;
        async fn expense_by_id(&self, id: i64, user_id: i64) -> Result<Expense, DrivenPortError>;
    }

    pub trait ExpenseWriter {
        async fn create_expense(&self, expense: &UpsertExpense) -> Result<Expense, DrivenPortError>;
        async fn update_expense(
            &self,
            id: i64,
            user_id: i64,
            expense: &UpsertExpense,
        ) -> Result<Expense, DrivenPortError>;
        async fn soft_delete_expense(&self, id: i64, user_id: i64)
        -> Result<String, DrivenPortError>;
        async fn hard_delete_expense(&self, id: i64, user_id: i64)
        -> Result<String, DrivenPortError>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait ExpensePort {
        async fn page(
            &self,
            user_id: i64,
            query: &ExpenseQuery,
            expense_read: &impl ExpenseReader,
        ) -> Result<ListView<Expense>, Error>;
        async fn expense(
            &self,
            id: i64,
            user_id: i64,
            expense_read: &impl ExpenseReader,
        ) -> Result<Expense, Error>;
        async fn create(
            &self,
            user_id: i64,
            query: &ExpenseQuery,
            expense: UpsertExpense,
            expense_read: &impl ExpenseReader,
            expense_write: &impl ExpenseWriter,
        ) -> Result<Expense, Error>;
        async fn edit(
            &self,
            id: i64,
            user_id: i64,
            query: &ExpenseQuery,
            expense: UpsertExpense,
            expense_read: &impl ExpenseReader,
            expense_write: &impl ExpenseWriter,
        ) -> Result<Expense, Error>;
        async fn remove(
            &self,
            id: i64,
            user_id: i64,
            query: &ExpenseQuery,
            expense_read: &impl ExpenseReader,
            expense_write: &impl ExpenseWriter,
        ) -> Result<String, Error>;
        async fn hard_delete(
            &self,
            id: i64,
            user_id: i64,
            query: &ExpenseQuery,
            expense_read: &impl ExpenseReader,
            expense_write: &impl ExpenseWriter,
        ) -> Result<String, Error>;
    }
}

#[derive(Default)]
pub struct ExpenseService {
    cache: QueryCache<Expense>,
}

impl ExpenseService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, query: &ExpenseQuery) -> Option<ListView<Expense>> {
        self.cache.get(&query.key())
    }

    async fn refetch(&self, user_id: i64, query: &ExpenseQuery, expense_read: &impl ExpenseReader) {
        self.cache
            .refetch(&query.key(), expense_read.expense_page(user_id, query))
            .await;
    }
}

impl driving_ports::ExpensePort for ExpenseService {
    async fn page(
        &self,
        user_id: i64,
        query: &ExpenseQuery,
        expense_read: &impl ExpenseReader,
    ) -> Result<ListView<Expense>, Error> {
        self.cache
            .fetch(&query.key(), expense_read.expense_page(user_id, query))
            .await
            .map_err(|err| err.into_error_trying_to("load expenses"))
    }

    async fn expense(
        &self,
        id: i64,
        user_id: i64,
        expense_read: &impl ExpenseReader,
    ) -> Result<Expense, Error> {
        expense_read
            .expense_by_id(id, user_id)
            .await
            .map_err(|err| err.into_error_trying_to("load an expense"))
    }

    async fn create(
        &self,
        user_id: i64,
        query: &ExpenseQuery,
        mut expense: UpsertExpense,
        expense_read: &impl ExpenseReader,
        expense_write: &impl ExpenseWriter,
    ) -> Result<Expense, Error> {
        expense.validate()?;
        expense.user_id = user_id;

        let key = query.key();
        let temp_id = domain::temporary_id();
        self.cache.cancel(&key);
        self.cache.optimistic(&key, |view| {
            view.insert(Expense::optimistic(temp_id, user_id, &expense))
        });

        info!("Creating expense for user {user_id}");
        let result = expense_write.create_expense(&expense).await;
        self.refetch(user_id, query, expense_read).await;

        result.map_err(|err| {
            error!("Expense create failure: {err}");
            err.into_error_trying_to("create an expense")
        })
    }

    async fn edit(
        &self,
        id: i64,
        user_id: i64,
        query: &ExpenseQuery,
        mut expense: UpsertExpense,
        expense_read: &impl ExpenseReader,
        expense_write: &impl ExpenseWriter,
    ) -> Result<Expense, Error> {
        expense.validate()?;
        expense.id = id;
        expense.user_id = user_id;

        let key = query.key();
        self.cache.cancel(&key);
        self.cache
            .optimistic(&key, |view| view.update(id, |cached| cached.apply(&expense)));

        info!("Updating expense {id}");
        let result = expense_write.update_expense(id, user_id, &expense).await;
        self.refetch(user_id, query, expense_read).await;

        result.map_err(|err| {
            error!("Expense update failure: {err}");
            err.into_error_trying_to("update an expense")
        })
    }

    async fn remove(
        &self,
        id: i64,
        user_id: i64,
        query: &ExpenseQuery,
        expense_read: &impl ExpenseReader,
        expense_write: &impl ExpenseWriter,
    ) -> Result<String, Error> {
        let key = query.key();
        self.cache.cancel(&key);
        self.cache.optimistic(&key, |view| view.remove(id));

        info!("Deleting expense {id}");
        let result = expense_write.soft_delete_expense(id, user_id).await;
        self.refetch(user_id, query, expense_read).await;

        result.map_err(|err| {
            error!("Expense delete failure: {err}");
            err.into_error_trying_to("delete an expense")
        })
    }

    async fn hard_delete(
        &self,
        id: i64,
        user_id: i64,
        query: &ExpenseQuery,
        expense_read: &impl ExpenseReader,
        expense_write: &impl ExpenseWriter,
    ) -> Result<String, Error> {
        let key = query.key();
        self.cache.cancel(&key);
        self.cache.optimistic(&key, |view| view.remove(id));

        info!("Permanently deleting expense {id}");
        let result = expense_write.hard_delete_expense(id, user_id).await;
        self.refetch(user_id, query, expense_read).await;

        result.map_err(|err| {
            error!("Expense hard delete failure: {err}");
            err.into_error_trying_to("permanently delete an expense")
        })
    }
}
