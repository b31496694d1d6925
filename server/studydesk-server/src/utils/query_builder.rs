//! Query builder for filtered, paginated list endpoints
//!
//! Column names are pushed verbatim and must come from code, never from
//! request input. Values are always bound.

use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::{Postgres, QueryBuilder};

use crate::types::PaginationParams;

/// Paginated query builder
///
/// ```rust,ignore
/// let mut query = PaginatedQuery::new("SELECT * FROM submissions WHERE 1=1");
/// query
///     .filter_eq("study_id", params.study_id)
///     .order_by("created_at", "DESC")
///     .paginate(&params.pagination);
///
/// let rows: Vec<Submission> = query.build_query_as().fetch_all(&pool).await?;
/// ```
pub struct PaginatedQuery<'a> {
    query: QueryBuilder<'a, Postgres>,
}

impl<'a> PaginatedQuery<'a> {
    /// `base_query` must end inside a WHERE clause, e.g. `... WHERE 1=1`
    pub fn new(base_query: &str) -> Self {
        Self {
            query: QueryBuilder::new(base_query),
        }
    }

    /// Add an equality filter (only if value is Some)
    pub fn filter_eq<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'a + sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send,
    {
        if let Some(val) = value {
            self.query.push(format!(" AND {} = ", column));
            self.query.push_bind(val);
        }
        self
    }

    /// Add a lower bound filter (only if value is Some)
    pub fn filter_gte<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'a + sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send,
    {
        if let Some(val) = value {
            self.query.push(format!(" AND {} >= ", column));
            self.query.push_bind(val);
        }
        self
    }

    /// Add an upper bound filter (only if value is Some)
    pub fn filter_lte<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'a + sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send,
    {
        if let Some(val) = value {
            self.query.push(format!(" AND {} <= ", column));
            self.query.push_bind(val);
        }
        self
    }

    pub fn order_by(&mut self, column: &str, direction: &str) -> &mut Self {
        self.query.push(format!(" ORDER BY {} {}", column, direction));
        self
    }

    /// Add a secondary sort key after [`PaginatedQuery::order_by`]
    pub fn then_by(&mut self, column: &str, direction: &str) -> &mut Self {
        self.query.push(format!(", {} {}", column, direction));
        self
    }

    pub fn paginate(&mut self, params: &PaginationParams) -> &mut Self {
        self.query.push(" LIMIT ");
        self.query.push_bind(params.limit());
        self.query.push(" OFFSET ");
        self.query.push_bind(params.offset());
        self
    }

    /// Build the final query as a typed query
    pub fn build_query_as<T>(&mut self) -> QueryAs<'_, Postgres, T, PgArguments>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
    {
        self.query.build_query_as()
    }

    /// Build the final query returning a single scalar, e.g. `COUNT(*)`
    pub fn build_query_scalar<T>(&mut self) -> QueryScalar<'_, Postgres, T, PgArguments>
    where
        T: Send + Unpin,
        (T,): for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
    {
        self.query.build_query_scalar()
    }

    pub fn sql(&self) -> &str {
        self.query.sql()
    }
}
