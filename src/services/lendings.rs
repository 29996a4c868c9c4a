//! Lending lifecycle service

use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        lending::{CreateLending, Lending, LendingDetails, LendingQuery, UpdateLending},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingsService {
    repository: Repository,
}

impl LendingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    async fn details(&self, lending: Lending) -> AppResult<LendingDetails> {
        let items = self.repository.lendings.lines(lending.id).await?;
        let lender = self.repository.users.get_short(lending.lender_id).await?;
        let borrower = match lending.borrower_id {
            Some(id) => self.repository.users.get_short(id).await?,
            None => None,
        };

        Ok(LendingDetails {
            status: lending.status(),
            is_overdue: lending.is_overdue(Utc::now()),
            lending,
            lender,
            borrower,
            items,
        })
    }

    /// Lend items. On-hand quantities drop by the lent amounts.
    pub async fn create(&self, claims: &UserClaims, request: CreateLending) -> AppResult<LendingDetails> {
        request.validate()?;
        request.check(claims.user_id, Utc::now())?;

        if let Some(borrower_id) = request.borrower_id {
            self.repository.users.get_by_id(borrower_id).await.map_err(|e| match e {
                AppError::NotFound(_) => AppError::Validation(format!("Borrower {} does not exist", borrower_id)),
                other => other,
            })?;
        }

        let lending = self.repository.lendings.create(claims.user_id, &request).await?;
        tracing::info!(
            lender_id = claims.user_id,
            lending_id = lending.id,
            lines = request.items.len(),
            "Lending created"
        );
        self.details(lending).await
    }

    /// Visible to the lender, the borrower and administrators
    pub async fn get(&self, claims: &UserClaims, id: i32) -> AppResult<LendingDetails> {
        let lending = self.repository.lendings.get_by_id(id).await?;
        if !lending.is_party(claims.user_id) && !claims.is_admin() {
            return Err(AppError::Authorization("You are not a party to this lending".to_string()));
        }
        self.details(lending).await
    }

    pub async fn list_lent(&self, claims: &UserClaims, query: &LendingQuery) -> AppResult<Vec<LendingDetails>> {
        let lendings = self
            .repository
            .lendings
            .list_for_lender(claims.user_id, query.open_only.unwrap_or(false))
            .await?;
        self.all_details(lendings).await
    }

    pub async fn list_borrowed(&self, claims: &UserClaims, query: &LendingQuery) -> AppResult<Vec<LendingDetails>> {
        let lendings = self
            .repository
            .lendings
            .list_for_borrower(claims.user_id, query.open_only.unwrap_or(false))
            .await?;
        self.all_details(lendings).await
    }

    async fn all_details(&self, lendings: Vec<Lending>) -> AppResult<Vec<LendingDetails>> {
        let mut result = Vec::with_capacity(lendings.len());
        for lending in lendings {
            result.push(self.details(lending).await?);
        }
        Ok(result)
    }

    async fn get_as_lender(&self, claims: &UserClaims, id: i32, allow_admin: bool) -> AppResult<Lending> {
        let lending = self.repository.lendings.get_by_id(id).await?;
        if lending.lender_id != claims.user_id && !(allow_admin && claims.is_admin()) {
            return Err(AppError::Authorization("Only the lender can do this".to_string()));
        }
        Ok(lending)
    }

    /// Mark returned and put the units back on hand. Ending twice is a conflict.
    pub async fn end(&self, claims: &UserClaims, id: i32) -> AppResult<LendingDetails> {
        self.get_as_lender(claims, id, true).await?;
        let ended = self.repository.lendings.end(id).await?;
        tracing::info!(user_id = claims.user_id, lending_id = id, "Lending ended");
        self.details(ended).await
    }

    pub async fn update(&self, claims: &UserClaims, id: i32, request: UpdateLending) -> AppResult<LendingDetails> {
        self.get_as_lender(claims, id, false).await?;
        if let Some(due) = request.due_date {
            if due <= Utc::now() {
                return Err(AppError::Validation("Due date must be in the future".to_string()));
            }
        }
        let updated = self.repository.lendings.update(id, &request).await?;
        self.details(updated).await
    }

    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        self.get_as_lender(claims, id, false).await?;
        self.repository.lendings.delete(id).await?;
        tracing::info!(user_id = claims.user_id, lending_id = id, "Lending deleted");
        Ok(())
    }
}
