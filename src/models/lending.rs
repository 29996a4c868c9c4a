//! Lending model and related types

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::user::UserShort;
use crate::error::{AppError, AppResult};

/// Lending row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Lending {
    pub id: i32,
    pub lender_id: i32,
    /// Registered borrower, if any
    pub borrower_id: Option<i32>,
    /// Free-text borrower for people without an account
    pub borrower_name: Option<String>,
    pub start_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    /// Set once the lending has been ended
    pub return_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
    #[serde(skip_serializing, default)]
    pub reminder_sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LendingStatus {
    Open,
    Returned,
}

impl Lending {
    pub fn status(&self) -> LendingStatus {
        if self.return_date.is_some() {
            LendingStatus::Returned
        } else {
            LendingStatus::Open
        }
    }

    /// Fail unless the lending is still open
    pub fn ensure_open(&self) -> AppResult<()> {
        match self.status() {
            LendingStatus::Open => Ok(()),
            LendingStatus::Returned => Err(AppError::Conflict(format!(
                "Lending {} has already been returned",
                self.id
            ))),
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status() == LendingStatus::Open && self.due_date.map(|d| d < now).unwrap_or(false)
    }

    pub fn is_party(&self, user_id: i32) -> bool {
        self.lender_id == user_id || self.borrower_id == Some(user_id)
    }
}

/// One item line of a lending
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LendingLine {
    pub item_id: i32,
    pub item_name: String,
    pub quantity: i32,
}

/// Lending with lines and parties, for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LendingDetails {
    #[serde(flatten)]
    pub lending: Lending,
    pub status: LendingStatus,
    pub is_overdue: bool,
    pub lender: Option<UserShort>,
    pub borrower: Option<UserShort>,
    pub items: Vec<LendingLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LendingItemInput {
    pub item_id: i32,
    pub quantity: i32,
}

/// Create lending request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLending {
    pub borrower_id: Option<i32>,
    #[validate(length(min = 1, max = 255))]
    pub borrower_name: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<LendingItemInput>,
}

impl CreateLending {
    /// Structural checks that need no database access
    pub fn check(&self, lender_id: i32, now: DateTime<Utc>) -> AppResult<()> {
        match (self.borrower_id, self.borrower_name.as_deref()) {
            (None, None) => {
                return Err(AppError::Validation(
                    "Either borrower_id or borrower_name is required".to_string(),
                ))
            }
            (Some(id), _) if id == lender_id => {
                return Err(AppError::Validation("You cannot lend to yourself".to_string()))
            }
            _ => {}
        }

        if let Some(due) = self.due_date {
            if due <= now {
                return Err(AppError::Validation("Due date must be in the future".to_string()));
            }
        }

        let mut seen = HashSet::new();
        for line in &self.items {
            if line.quantity <= 0 {
                return Err(AppError::Validation(format!(
                    "Quantity for item {} must be positive",
                    line.item_id
                )));
            }
            if !seen.insert(line.item_id) {
                return Err(AppError::Validation(format!(
                    "Item {} is listed more than once",
                    line.item_id
                )));
            }
        }
        Ok(())
    }
}

/// Check requested quantities against on-hand quantities of the lender's items.
///
/// `on_hand` maps item id to quantity for items owned by the lender; missing ids are not theirs.
pub fn check_availability(lines: &[LendingItemInput], on_hand: &HashMap<i32, i32>) -> AppResult<()> {
    for line in lines {
        let available = on_hand.get(&line.item_id).copied().ok_or_else(|| {
            AppError::Authorization(format!("Item {} does not belong to you", line.item_id))
        })?;
        if line.quantity > available {
            return Err(AppError::BusinessRule(format!(
                "Cannot lend {} of item {}: only {} available",
                line.quantity, line.item_id, available
            )));
        }
    }
    Ok(())
}

/// Update lending request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLending {
    pub due_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// Lending list filter
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LendingQuery {
    /// Only lendings not yet returned
    pub open_only: Option<bool>,
}

/// Open lending due soon, joined with the borrower's contact
#[derive(Debug, Clone, FromRow)]
pub struct DueLending {
    pub id: i32,
    pub due_date: DateTime<Utc>,
    pub borrower_email: String,
    pub borrower_username: String,
    pub lender_username: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn lending(return_date: Option<DateTime<Utc>>) -> Lending {
        Lending {
            id: 3,
            lender_id: 1,
            borrower_id: Some(2),
            borrower_name: None,
            start_date: Utc::now() - Duration::days(3),
            due_date: Some(Utc::now() - Duration::days(1)),
            return_date,
            note: None,
            reminder_sent_at: None,
        }
    }

    fn request(items: Vec<(i32, i32)>) -> CreateLending {
        CreateLending {
            borrower_id: Some(2),
            borrower_name: None,
            due_date: None,
            note: None,
            items: items
                .into_iter()
                .map(|(item_id, quantity)| LendingItemInput { item_id, quantity })
                .collect(),
        }
    }

    #[test]
    fn test_returned_lending_cannot_be_ended_again() {
        assert!(lending(None).ensure_open().is_ok());
        let err = lending(Some(Utc::now())).ensure_open().unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_overdue_only_while_open() {
        let now = Utc::now();
        assert!(lending(None).is_overdue(now));
        assert!(!lending(Some(now)).is_overdue(now));
    }

    #[test]
    fn test_parties() {
        let l = lending(None);
        assert!(l.is_party(1));
        assert!(l.is_party(2));
        assert!(!l.is_party(5));
    }

    #[test]
    fn test_items_are_required() {
        let err = request(vec![]).validate().unwrap_err();
        assert!(err.field_errors().contains_key("items"));
        assert!(request(vec![(10, 1)]).validate().is_ok());
    }

    #[test]
    fn test_check_requires_borrower() {
        let mut req = request(vec![(10, 1)]);
        req.borrower_id = None;
        assert!(req.check(1, Utc::now()).is_err());
        req.borrower_name = Some("Neighbour".to_string());
        assert!(req.check(1, Utc::now()).is_ok());
    }

    #[test]
    fn test_check_rejects_self_lending_and_bad_lines() {
        assert!(request(vec![(10, 1)]).check(2, Utc::now()).is_err());
        assert!(request(vec![(10, 0)]).check(1, Utc::now()).is_err());
        assert!(request(vec![(10, 1), (10, 2)]).check(1, Utc::now()).is_err());

        let mut past_due = request(vec![(10, 1)]);
        past_due.due_date = Some(Utc::now() - Duration::hours(1));
        assert!(past_due.check(1, Utc::now()).is_err());
    }

    #[test]
    fn test_availability() {
        let on_hand = HashMap::from([(10, 3), (11, 1)]);

        assert!(check_availability(&request(vec![(10, 3), (11, 1)]).items, &on_hand).is_ok());

        let err = check_availability(&request(vec![(10, 4)]).items, &on_hand).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        let err = check_availability(&request(vec![(12, 1)]).items, &on_hand).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }
}
