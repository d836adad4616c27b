use super::{ApiClient, page_params, with_body};
use crate::domain::DrivenPortError;
use crate::domain::expense::driven_ports::{ExpenseReader, ExpenseWriter};
use crate::domain::expense::{Expense, ExpenseQuery, UpsertExpense};
use crate::domain::view::ListView;
use crate::dto::expense::{ExpenseDto, UpsertExpenseDto};
use crate::dto::view::ListViewDto;
use crate::external_connections::{ApiRequest, HttpTransport};

impl<T: HttpTransport> ExpenseReader for ApiClient<T> {
    #[tracing::instrument(skip(self))]
    async fn expense_page(
        &self,
        user_id: i64,
        query: &ExpenseQuery,
    ) -> Result<ListView<Expense>, DrivenPortError> {
        let mut params = page_params(&query.paging, user_id, Some(&query.month));
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }
        if let Some(kind) = &query.kind {
            params.push(("type", kind.clone()));
        }

        let request = ApiRequest::get(self.endpoint("/expense/get-by-paging")?).with_query(params);
        let page: ListViewDto<ExpenseDto> = self.call(request).await?;

        Ok(page.into())
    }

    #[tracing::instrument(skip(self))]
    async fn expense_by_id(&self, id: i64, user_id: i64) -> Result<Expense, DrivenPortError> {
        let request = ApiRequest::get(self.endpoint(&format!("/expense/get-by-id/{id}/{user_id}"))?);
        let expense: ExpenseDto = self.call(request).await?;

        Ok(expense.into())
    }
}

impl<T: HttpTransport> ExpenseWriter for ApiClient<T> {
    #[tracing::instrument(skip(self, expense))]
    async fn create_expense(&self, expense: &UpsertExpense) -> Result<Expense, DrivenPortError> {
        let request = with_body(
            ApiRequest::post(self.endpoint("/expense/insert")?),
            &UpsertExpenseDto::from(expense),
        )?;
        let created: ExpenseDto = self.call(request).await?;

        Ok(created.into())
    }

    #[tracing::instrument(skip(self, expense))]
    async fn update_expense(
        &self,
        id: i64,
        user_id: i64,
        expense: &UpsertExpense,
    ) -> Result<Expense, DrivenPortError> {
        let request = with_body(
            ApiRequest::put(self.endpoint(&format!("/expense/update/{id}/{user_id}"))?),
            &UpsertExpenseDto::from(expense),
        )?;
        let updated: ExpenseDto = self.call(request).await?;

        Ok(updated.into())
    }

    #[tracing::instrument(skip(self))]
    async fn soft_delete_expense(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError> {
        let request =
            ApiRequest::patch(self.endpoint(&format!("/expense/soft-delete/{id}/{user_id}"))?);
        Ok(self.call(request).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn hard_delete_expense(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError> {
        let request =
            ApiRequest::delete(self.endpoint(&format!("/expense/hard-delete/{id}/{user_id}"))?);
        Ok(self.call(request).await?)
    }
}
