//! Lendings repository for database operations

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::lending::{check_availability, CreateLending, DueLending, Lending, LendingLine, UpdateLending},
};

#[derive(Clone)]
pub struct LendingsRepository {
    pool: Pool<Postgres>,
}

/// Lock a lending row for the rest of the transaction
async fn lock_lending(conn: &mut PgConnection, id: i32) -> AppResult<Lending> {
    sqlx::query_as::<_, Lending>("SELECT * FROM lendings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lending with id {} not found", id)))
}

/// Put lent units back on hand
async fn restore_quantities(conn: &mut PgConnection, lending_id: i32) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE items i SET quantity = i.quantity + il.quantity, updated_at = NOW()
        FROM item_lendings il
        WHERE il.lending_id = $1 AND il.item_id = i.id
        "#,
    )
    .bind(lending_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl LendingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Lending> {
        sqlx::query_as::<_, Lending>("SELECT * FROM lendings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lending with id {} not found", id)))
    }

    /// Item lines of a lending
    pub async fn lines(&self, lending_id: i32) -> AppResult<Vec<LendingLine>> {
        let lines = sqlx::query_as::<_, LendingLine>(
            r#"
            SELECT il.item_id, i.name AS item_name, il.quantity
            FROM item_lendings il
            JOIN items i ON i.id = il.item_id
            WHERE il.lending_id = $1
            ORDER BY LOWER(i.name)
            "#,
        )
        .bind(lending_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    /// Lendings where the user is the lender, newest first
    pub async fn list_for_lender(&self, user_id: i32, open_only: bool) -> AppResult<Vec<Lending>> {
        let lendings = sqlx::query_as::<_, Lending>(
            r#"
            SELECT * FROM lendings
            WHERE lender_id = $1 AND (NOT $2 OR return_date IS NULL)
            ORDER BY start_date DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(open_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(lendings)
    }

    /// Lendings where the user is the registered borrower, newest first
    pub async fn list_for_borrower(&self, user_id: i32, open_only: bool) -> AppResult<Vec<Lending>> {
        let lendings = sqlx::query_as::<_, Lending>(
            r#"
            SELECT * FROM lendings
            WHERE borrower_id = $1 AND (NOT $2 OR return_date IS NULL)
            ORDER BY start_date DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(open_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(lendings)
    }

    /// Create a lending and take the lent units off hand, atomically.
    ///
    /// The lender's items are locked while availability is checked.
    pub async fn create(&self, lender_id: i32, lending: &CreateLending) -> AppResult<Lending> {
        let mut tx = self.pool.begin().await?;

        let item_ids: Vec<i32> = lending.items.iter().map(|l| l.item_id).collect();
        let rows: Vec<(i32, i32)> = sqlx::query_as(
            "SELECT id, quantity FROM items WHERE user_id = $1 AND id = ANY($2) ORDER BY id FOR UPDATE",
        )
        .bind(lender_id)
        .bind(&item_ids)
        .fetch_all(&mut *tx)
        .await?;
        let on_hand: HashMap<i32, i32> = rows.into_iter().collect();

        check_availability(&lending.items, &on_hand)?;

        let created = sqlx::query_as::<_, Lending>(
            r#"
            INSERT INTO lendings (lender_id, borrower_id, borrower_name, due_date, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(lender_id)
        .bind(lending.borrower_id)
        .bind(lending.borrower_name.as_deref().map(str::trim))
        .bind(lending.due_date)
        .bind(&lending.note)
        .fetch_one(&mut *tx)
        .await?;

        for line in &lending.items {
            sqlx::query("INSERT INTO item_lendings (lending_id, item_id, quantity) VALUES ($1, $2, $3)")
                .bind(created.id)
                .bind(line.item_id)
                .bind(line.quantity)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE items SET quantity = quantity - $2, updated_at = NOW() WHERE id = $1")
                .bind(line.item_id)
                .bind(line.quantity)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Mark a lending returned and put its units back on hand
    pub async fn end(&self, id: i32) -> AppResult<Lending> {
        let mut tx = self.pool.begin().await?;

        let lending = lock_lending(&mut tx, id).await?;
        lending.ensure_open()?;

        restore_quantities(&mut tx, id).await?;

        let ended = sqlx::query_as::<_, Lending>("UPDATE lendings SET return_date = NOW() WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ended)
    }

    /// Change due date or note of an open lending
    pub async fn update(&self, id: i32, update: &UpdateLending) -> AppResult<Lending> {
        let mut tx = self.pool.begin().await?;

        let lending = lock_lending(&mut tx, id).await?;
        lending.ensure_open()?;

        // A new due date means a new reminder may be due
        let updated = sqlx::query_as::<_, Lending>(
            r#"
            UPDATE lendings SET
                due_date = COALESCE($2, due_date),
                note = COALESCE($3, note),
                reminder_sent_at = CASE WHEN $2::timestamptz IS NULL THEN reminder_sent_at ELSE NULL END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.due_date)
        .bind(&update.note)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a lending. Units of an open lending go back on hand first.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let lending = lock_lending(&mut tx, id).await?;
        if lending.ensure_open().is_ok() {
            restore_quantities(&mut tx, id).await?;
        }

        sqlx::query("DELETE FROM item_lendings WHERE lending_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM lendings WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Open lendings due before `now + within_days` whose registered borrower
    /// has not been reminded yet
    pub async fn due_soon(&self, now: DateTime<Utc>, within_days: i64) -> AppResult<Vec<DueLending>> {
        let lendings = sqlx::query_as::<_, DueLending>(
            r#"
            SELECT l.id, l.due_date,
                   b.email AS borrower_email, b.username AS borrower_username,
                   u.username AS lender_username
            FROM lendings l
            JOIN users b ON b.id = l.borrower_id
            JOIN users u ON u.id = l.lender_id
            WHERE l.return_date IS NULL
              AND l.due_date IS NOT NULL
              AND l.due_date <= $1
              AND l.reminder_sent_at IS NULL
            ORDER BY l.due_date
            "#,
        )
        .bind(now + Duration::days(within_days))
        .fetch_all(&self.pool)
        .await?;
        Ok(lendings)
    }

    pub async fn mark_reminded(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE lendings SET reminder_sent_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
