// Shared rules
pub mod pricing;
pub mod slug;

// Directory
pub mod categories;
pub mod factories;
pub mod locations;
pub mod workers;

// Content
pub mod blog;
pub mod faq;

// Accounts
pub mod accounts;

// Commerce
pub mod cart;
pub mod orders;
pub mod payments;
pub mod purchases;

// Back office
pub mod admin;
pub mod contact;

use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use crate::entities::soft_delete::{self, SoftDelete};
use crate::errors::ServiceError;

/// Soft deletes a row, treating an already deleted row as success.
pub(crate) async fn soft_delete_existing<E, C>(
    db: &C,
    kind: &str,
    id: Uuid,
) -> Result<bool, ServiceError>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    if soft_delete::soft_delete::<E, C>(db, id).await? {
        return Ok(true);
    }
    ensure_exists::<E, C>(db, kind, id).await?;
    Ok(false)
}

/// Restores a soft-deleted row, treating an active row as success.
pub(crate) async fn restore_existing<E, C>(
    db: &C,
    kind: &str,
    id: Uuid,
) -> Result<bool, ServiceError>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    if soft_delete::restore::<E, C>(db, id).await? {
        return Ok(true);
    }
    ensure_exists::<E, C>(db, kind, id).await?;
    Ok(false)
}

pub(crate) async fn ensure_exists<E, C>(db: &C, kind: &str, id: Uuid) -> Result<(), ServiceError>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    use sea_orm::{ColumnTrait, QueryFilter};

    E::find_with_deleted()
        .filter(E::id_column().eq(id))
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::not_found(kind, id))
}

/// Zero-based page index and page size from 1-based request values.
pub(crate) fn page_bounds(page: u64, per_page: u64) -> (u64, u64) {
    (page.max(1) - 1, per_page.max(1))
}

const LIKE_ESCAPE: char = '!';

/// `%term%` with the term's own wildcards matched literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring match on a table-qualified column.
pub(crate) fn contains_ci<E: EntityTrait>(column: E::Column, term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col((E::default(), column))))
        .like(LikeExpr::new(like_pattern(term)).escape(LIKE_ESCAPE))
}

/// The user a service call acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    /// Admin or staff
    pub is_staff: bool,
}

impl Actor {
    /// Staff manage everything; users manage what they created.
    pub fn can_manage(&self, owner: Option<Uuid>) -> bool {
        self.is_staff || owner == Some(self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" Cotton "), "%cotton%");
        assert_eq!(like_pattern("100%"), "%100!%%");
        assert_eq!(like_pattern("a_b!"), "%a!_b!!%");
    }

    #[test]
    fn actor_manages_own_records_unless_staff() {
        let owner = Uuid::new_v4();
        let user = Actor {
            user_id: owner,
            is_staff: false,
        };
        assert!(user.can_manage(Some(owner)));
        assert!(!user.can_manage(Some(Uuid::new_v4())));
        assert!(!user.can_manage(None));
        let staff = Actor {
            user_id: Uuid::new_v4(),
            is_staff: true,
        };
        assert!(staff.can_manage(None));
    }
}
