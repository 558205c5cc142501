use futures::try_join;
use serde_json::Value;
use sqlx::{self, postgres::PgArguments, postgres::PgRow, FromRow, PgPool};

use crate::database::manager::DbError;
use crate::filter::{BuiltQuery, FilterError, ListParams, ListQuery};

/// Thin typed gateway over a whitelisted table: builds the paged query and
/// runs the page and count statements as concurrent fan-out.
pub struct Repository<T> {
    table: &'static str,
    columns: &'static [&'static str],
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub const fn new(table: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            table,
            columns,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Start a list query; handlers pin scope conditions on the result
    /// before applying client parameters.
    pub fn query(&self) -> Result<ListQuery<'static>, FilterError> {
        ListQuery::new(self.table, self.columns)
    }

    /// Fetch one page plus the total row count for the same conditions.
    pub async fn page(
        &self,
        pool: &PgPool,
        query: ListQuery<'static>,
        params: &ListParams,
    ) -> Result<(Vec<T>, i64), DbError> {
        let built = query
            .build(params)
            .map_err(|e| match e {
                FilterError::UnknownColumn(c) => DbError::InvalidColumn(c),
                other => DbError::QueryError(other.to_string()),
            })?;
        fetch_page::<T>(pool, built).await
    }
}

/// Run a built list query: the page SELECT and the COUNT are independent and
/// awaited together.
pub async fn fetch_page<T>(pool: &PgPool, built: BuiltQuery) -> Result<(Vec<T>, i64), DbError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut select = sqlx::query_as::<_, T>(&built.select_sql);
    let mut count = sqlx::query_scalar::<_, i64>(&built.count_sql);
    for p in built.params.iter() {
        select = bind_value_query_as(select, p);
        count = bind_value_scalar(count, p);
    }

    let rows_fut = async { select.fetch_all(pool).await.map_err(DbError::from) };
    let count_fut = async { count.fetch_one(pool).await.map_err(DbError::from) };
    let (rows, total) = try_join!(rows_fut, count_fut)?;
    Ok((rows, total))
}

fn bind_value_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Arrays are expanded into IN-lists before binding; objects bind as JSONB
        Value::Array(_) => q,
        Value::Object(_) => q.bind(v.clone()),
    }
}

fn bind_value_scalar<'q>(
    q: sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) => q,
        Value::Object(_) => q.bind(v.clone()),
    }
}
