use serde::Serialize;
use sqlx::{self, postgres::PgRow, FromRow};
use uuid::Uuid;

use crate::database::query_builder::QueryBuilder;
use crate::database::store::{DatabaseError, Store};
use crate::entity::{self, Entity};
use crate::filter::{FilterError, QueryOptions, QueryPlan};

/// One page of rows plus the total matching the same criteria.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: i64,
}

/// Generic reads and deletes for an allow-listed entity table.
pub struct Repository<T> {
    store: Store,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: Entity + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(store: Store) -> Self {
        Self {
            store,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Renders the allow-listed plan for `options`. Fails only on filter
    /// values that cannot be rendered, which callers report as a bad request.
    pub fn plan(&self, options: QueryOptions) -> Result<QueryPlan, FilterError> {
        entity::plan::<T>(options)
    }

    pub async fn select_page(&self, plan: QueryPlan) -> Result<Page<T>, DatabaseError> {
        tracing::debug!(table = T::TABLE, sql = %plan.select.query, "Selecting page");

        let builder = QueryBuilder::<T>::new(plan);
        let data = self.store.timed(builder.select_all(self.store.pool())).await?;
        let count = self.store.timed(builder.count(self.store.pool())).await?;
        Ok(Page { data, count })
    }

    pub async fn select_one(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        let sql = format!("SELECT * FROM \"{}\" WHERE \"id\" = $1", T::TABLE);
        self.store
            .timed(async {
                let row = sqlx::query_as::<_, T>(&sql)
                    .bind(id)
                    .fetch_optional(self.store.pool())
                    .await?;
                Ok(row)
            })
            .await
    }

    /// Deletes and returns the removed row.
    pub async fn delete_404(&self, id: Uuid) -> Result<T, DatabaseError> {
        let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1 RETURNING *", T::TABLE);
        self.store
            .timed(async {
                let row = sqlx::query_as::<_, T>(&sql)
                    .bind(id)
                    .fetch_optional(self.store.pool())
                    .await?;
                row.ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", T::TABLE, id)))
            })
            .await
    }
}
