use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Select};
use serde::Serialize;
use uuid::Uuid;

/// Row summary used when listing trashed records.
#[derive(Debug, Clone, Serialize)]
pub struct TrashEntry {
    pub id: Uuid,
    pub label: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Entities carrying `is_deleted` / `deleted_at`.
///
/// `find_active` is the default scope used by every public read path.
pub trait SoftDelete: EntityTrait {
    fn id_column() -> Self::Column;
    fn is_deleted_column() -> Self::Column;
    fn deleted_at_column() -> Self::Column;
    fn trash_entry(model: &Self::Model) -> TrashEntry;

    fn find_active() -> Select<Self> {
        Self::find().filter(Self::is_deleted_column().eq(false))
    }

    fn find_with_deleted() -> Select<Self> {
        Self::find()
    }

    fn find_deleted_only() -> Select<Self> {
        Self::find().filter(Self::is_deleted_column().eq(true))
    }
}

/// Marks a row deleted. Returns `false` when it was already deleted or absent.
pub async fn soft_delete<E, C>(db: &C, id: Uuid) -> Result<bool, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    let result = E::update_many()
        .col_expr(E::is_deleted_column(), Expr::value(true))
        .col_expr(E::deleted_at_column(), Expr::value(Utc::now()))
        .filter(E::id_column().eq(id))
        .filter(E::is_deleted_column().eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Clears the deletion flags. Returns `false` when the row was not deleted.
pub async fn restore<E, C>(db: &C, id: Uuid) -> Result<bool, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    let result = E::update_many()
        .col_expr(E::is_deleted_column(), Expr::value(false))
        .col_expr(
            E::deleted_at_column(),
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .filter(E::id_column().eq(id))
        .filter(E::is_deleted_column().eq(true))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Removes the row permanently.
pub async fn hard_delete<E, C>(db: &C, id: Uuid) -> Result<bool, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    let result = E::delete_many()
        .filter(E::id_column().eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn list_deleted<E, C>(db: &C) -> Result<Vec<TrashEntry>, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    let rows = E::find_deleted_only().all(db).await?;
    Ok(rows.iter().map(E::trash_entry).collect())
}

/// Implements [`SoftDelete`] for an entity module with the standard column names.
macro_rules! impl_soft_delete {
    ($label:ident) => {
        impl $crate::entities::soft_delete::SoftDelete for Entity {
            fn id_column() -> Column {
                Column::Id
            }
            fn is_deleted_column() -> Column {
                Column::IsDeleted
            }
            fn deleted_at_column() -> Column {
                Column::DeletedAt
            }
            fn trash_entry(model: &Model) -> $crate::entities::soft_delete::TrashEntry {
                $crate::entities::soft_delete::TrashEntry {
                    id: model.id,
                    label: model.$label.clone(),
                    deleted_at: model.deleted_at,
                }
            }
        }
    };
}

pub(crate) use impl_soft_delete;
