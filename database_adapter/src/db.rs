use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

pub type PgPool = Pool<Postgres>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Unique constraint violated on ({})", .0.join(", "))]
    UniqueViolation(Vec<String>),
    #[error("Record {0} not found")]
    NotFound(String),
    #[error("Stored id {0} could not be parsed")]
    InvalidId(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// How a sort field is compared. Documents store decimals as strings, so
/// numeric and timestamp fields need a cast before ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Text,
    Numeric,
    Timestamp,
}

/// An ordering over one document field. `field` is `'static` so that only
/// columns named in code can ever reach a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: &'static str,
    pub kind: SortKind,
    pub direction: SortDirection,
}

/// Text value of a top-level document field, with the semantics of
/// Postgres' `data->>'field'` (null and missing both map to `None`).
#[must_use]
pub fn json_field_text(document: &serde_json::Value, field: &str) -> Option<String> {
    match document.get(field)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

#[async_trait]
pub trait Repository<T, Id>: Send + Sync
where
    T: Send + Sync + 'static,
    Id: Send + Sync + 'static,
{
    /// Insert a new item with the given ID
    /// # Errors
    /// - `DbError::UniqueViolation` if the item collides with the repository's unique key
    async fn insert(&self, id: Id, item: T) -> Result<(), DbError>;
    /// Replace an existing item with the given ID
    /// # Errors
    /// - `DbError::NotFound` if no item has this ID
    async fn update(&self, id: Id, item: T) -> Result<(), DbError>;
    /// Remove an item with the given ID
    /// # Errors
    /// - `DbError::NotFound` if no item has this ID
    async fn remove(&self, id: Id) -> Result<(), DbError>;
    /// Get an item by ID
    /// # Errors
    /// - Returns `DbError` if the operation fails
    async fn get(&self, id: &Id) -> Result<Option<T>, DbError>;
    /// Get the number of items in the repository
    /// # Errors
    /// - Returns `DbError` if the operation fails
    async fn len(&self) -> Result<usize, DbError>;
    /// Check if the repository is empty
    /// # Errors
    /// - Returns `DbError` if the operation fails
    async fn is_empty(&self) -> Result<bool, DbError> {
        Ok(self.len().await? == 0)
    }
    /// Check if an item with the given ID exists
    /// # Errors
    /// - Returns `DbError` if the operation fails
    async fn exists(&self, id: &Id) -> Result<bool, DbError> {
        Ok(self.get(id).await?.is_some())
    }
    /// Find the first item (in insertion order) matching every `(field, value)` pair
    /// # Errors
    /// - Returns `DbError` if the operation fails
    async fn find_by_fields(&self, filters: &[(&str, &str)]) -> Result<Option<(Id, T)>, DbError>;
    /// Find all items by a specific field and value, in insertion order unless `sort` is given
    /// # Errors
    /// - Returns `DbError` if the operation fails
    async fn find_all_by_field(
        &self,
        field: &str,
        value: &str,
        sort: Option<&SortOrder>,
    ) -> Result<Vec<(Id, T)>, DbError>;
    /// Remove all items by a specific field and value, returning how many were removed
    /// # Errors
    /// - Returns `DbError` if the operation fails
    async fn remove_all_by_field(&self, field: &str, value: &str) -> Result<u64, DbError>;
}

/// Open a connection pool to the given database.
/// # Errors
/// - Returns `DbError` if the connection fails
pub async fn connect(database_url: &str) -> Result<Pool<Postgres>, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    info!("Connected to Postgres");
    Ok(pool)
}

/// Open a connection pool using `DATABASE_URL` from the environment or `.env` file.
/// # Errors
/// - `DbError::Config` if `DATABASE_URL` is not set
pub async fn connect_from_env() -> Result<Pool<Postgres>, DbError> {
    dotenvy::dotenv().ok();
    let db_url = std::env::var("DATABASE_URL").map_err(|_| {
        DbError::Config("DATABASE_URL must be set in .env file or environment".to_string())
    })?;
    connect(&db_url).await
}

/// Generic Postgres repository, stores T as JSON
#[derive(Clone)]
pub struct PostgresRepo<T, Id> {
    pool: Pool<Postgres>,
    table: String,
    unique_key: Vec<&'static str>,
    _phantom: std::marker::PhantomData<(T, Id)>,
}

impl<T, Id> std::fmt::Debug for PostgresRepo<T, Id> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRepo")
            .field("table", &self.table)
            .field("unique_key", &self.unique_key)
            .finish_non_exhaustive()
    }
}

impl<T, Id> PostgresRepo<T, Id>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    Id: ToString + FromStr + Send + Sync,
{
    /// Create a repository backed by `table`, creating the table (and the
    /// unique index over `unique_key`, if any) when missing.
    /// # Errors
    /// - `DbError::Config` if the table or a key field is not a plain identifier
    /// - Returns `DbError` if the DDL fails
    pub async fn new(
        pool: Pool<Postgres>,
        table: &str,
        unique_key: &[&'static str],
    ) -> Result<Self, DbError> {
        if !is_identifier(table) {
            return Err(DbError::Config(format!("invalid table name {table:?}")));
        }
        if let Some(field) = unique_key.iter().find(|f| !is_identifier(f)) {
            return Err(DbError::Config(format!("invalid key field {field:?}")));
        }

        let query = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                seq  BIGSERIAL,
                id   TEXT PRIMARY KEY,
                data JSONB NOT NULL
            )"
        );
        sqlx::query(&query).execute(&pool).await?;

        if !unique_key.is_empty() {
            let columns = unique_key
                .iter()
                .map(|field| format!("(data->>'{field}')"))
                .collect::<Vec<_>>()
                .join(", ");
            let query =
                format!("CREATE UNIQUE INDEX IF NOT EXISTS {table}_unique_key ON {table} ({columns})");
            sqlx::query(&query).execute(&pool).await?;
        }
        debug!("Table {table} ready");

        Ok(Self {
            pool,
            table: table.to_string(),
            unique_key: unique_key.to_vec(),
            _phantom: std::marker::PhantomData,
        })
    }

    fn map_write_error(&self, error: sqlx::Error) -> DbError {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                if db.constraint().is_some_and(|c| c.ends_with("_pkey")) {
                    DbError::UniqueViolation(vec!["id".to_string()])
                } else {
                    DbError::UniqueViolation(
                        self.unique_key.iter().map(ToString::to_string).collect(),
                    )
                }
            }
            _ => DbError::from(error),
        }
    }

    fn decode_row(id_str: String, data: serde_json::Value) -> Result<(Id, T), DbError> {
        let id = id_str.parse().map_err(|_| DbError::InvalidId(id_str))?;
        Ok((id, serde_json::from_value(data)?))
    }

    fn order_by(sort: Option<&SortOrder>) -> Result<String, DbError> {
        let Some(sort) = sort else {
            return Ok("seq ASC".to_string());
        };
        if !is_identifier(sort.field) {
            return Err(DbError::Config(format!("invalid sort field {:?}", sort.field)));
        }
        let expression = match sort.kind {
            SortKind::Text => format!("data->>'{}'", sort.field),
            SortKind::Numeric => format!("(data->>'{}')::numeric", sort.field),
            SortKind::Timestamp => format!("(data->>'{}')::timestamptz", sort.field),
        };
        Ok(format!("{expression} {}, seq ASC", sort.direction.as_sql()))
    }
}

#[async_trait]
impl<T, Id> Repository<T, Id> for PostgresRepo<T, Id>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    Id: ToString + FromStr + Send + Sync + 'static,
{
    async fn insert(&self, id: Id, item: T) -> Result<(), DbError> {
        let data = serde_json::to_value(item)?;
        let query = format!("INSERT INTO {} (id, data) VALUES ($1, $2)", self.table);

        sqlx::query(&query)
            .bind(id.to_string())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_write_error(e))?;

        Ok(())
    }

    async fn update(&self, id: Id, item: T) -> Result<(), DbError> {
        let data = serde_json::to_value(item)?;
        let query = format!("UPDATE {} SET data = $2 WHERE id = $1", self.table);
        let id_str = id.to_string();

        let result = sqlx::query(&query)
            .bind(&id_str)
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_write_error(e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(id_str));
        }
        Ok(())
    }

    async fn remove(&self, id: Id) -> Result<(), DbError> {
        let query = format!("DELETE FROM {} WHERE id = $1", self.table);
        let id_str = id.to_string();

        let result = sqlx::query(&query)
            .bind(&id_str)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(id_str));
        }
        Ok(())
    }

    async fn get(&self, id: &Id) -> Result<Option<T>, DbError> {
        let query = format!("SELECT data FROM {} WHERE id = $1", self.table);

        let row: Option<serde_json::Value> = sqlx::query_scalar(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(serde_json::from_value).transpose()?)
    }

    async fn len(&self) -> Result<usize, DbError> {
        let query = format!("SELECT COUNT(*) FROM {}", self.table);

        let (count,): (i64,) = sqlx::query_as(&query).fetch_one(&self.pool).await?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn find_by_fields(&self, filters: &[(&str, &str)]) -> Result<Option<(Id, T)>, DbError> {
        let conditions = (0..filters.len())
            .map(|i| format!("data->>${} = ${}", 2 * i + 1, 2 * i + 2))
            .collect::<Vec<_>>();
        let where_clause = if conditions.is_empty() {
            "TRUE".to_string()
        } else {
            conditions.join(" AND ")
        };
        let query = format!(
            "SELECT id, data FROM {} WHERE {where_clause} ORDER BY seq ASC LIMIT 1",
            self.table
        );

        let mut statement = sqlx::query_as::<_, (String, serde_json::Value)>(&query);
        for (field, value) in filters {
            statement = statement.bind(*field).bind(*value);
        }
        let row = statement.fetch_optional(&self.pool).await?;

        row.map(|(id_str, data)| Self::decode_row(id_str, data))
            .transpose()
    }

    async fn find_all_by_field(
        &self,
        field: &str,
        value: &str,
        sort: Option<&SortOrder>,
    ) -> Result<Vec<(Id, T)>, DbError> {
        let query = format!(
            "SELECT id, data FROM {} WHERE data->>$1 = $2 ORDER BY {}",
            self.table,
            Self::order_by(sort)?
        );

        let rows: Vec<(String, serde_json::Value)> = sqlx::query_as(&query)
            .bind(field)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(id_str, data)| Self::decode_row(id_str, data))
            .collect()
    }

    async fn remove_all_by_field(&self, field: &str, value: &str) -> Result<u64, DbError> {
        let query = format!("DELETE FROM {} WHERE data->>$1 = $2", self.table);

        let result = sqlx::query(&query)
            .bind(field)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
