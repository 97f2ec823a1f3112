//! Postgres-backed batch repository.
//!
//! A `PostgresBatchRepository` lives inside exactly one database transaction, owned
//! by its unit of work. Nothing it writes is visible to other sessions until that
//! unit of work commits.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / other | N/A | `Storage` |
//!
//! Rows that cannot be rehydrated into a valid `Batch` map to `Corrupt`.
//!
//! ## Optimistic Concurrency
//!
//! `update()` bumps `batches.version` with `WHERE version = $loaded`. Zero affected
//! rows means another transaction committed first, and the update fails with
//! `Concurrency` instead of silently overwriting.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, instrument};

use allocation_inventory::{Batch, OrderLine};

use super::r#trait::{BatchFilter, BatchRepository, RepositoryError};

pub struct PostgresBatchRepository {
    tx: Transaction<'static, Postgres>,
    /// References whose version was already bumped in this transaction.
    touched: HashSet<String>,
}

impl std::fmt::Debug for PostgresBatchRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBatchRepository")
            .field("touched", &self.touched)
            .finish_non_exhaustive()
    }
}

impl PostgresBatchRepository {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx,
            touched: HashSet::new(),
        }
    }

    pub(crate) fn into_transaction(self) -> Transaction<'static, Postgres> {
        self.tx
    }

    async fn load(&mut self, filter: &BatchFilter) -> Result<Vec<Batch>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT reference, sku, purchased_quantity, eta, version
            FROM batches
            WHERE ($1::text IS NULL OR reference = $1)
              AND ($2::text IS NULL OR sku = $2)
            ORDER BY reference ASC
            "#,
        )
        .bind(filter.reference.as_deref())
        .bind(filter.sku.as_deref())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("load_batches", e))?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let headers = rows
            .iter()
            .map(BatchRow::from_pg_row)
            .collect::<Result<Vec<_>, _>>()?;
        let references: Vec<String> = headers.iter().map(|h| h.reference.clone()).collect();

        let line_rows = sqlx::query(
            r#"
            SELECT batch_reference, order_id, sku, qty
            FROM allocations
            WHERE batch_reference = ANY($1)
            "#,
        )
        .bind(&references)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("load_allocations", e))?;

        let mut lines: BTreeMap<String, Vec<OrderLine>> = BTreeMap::new();
        for row in &line_rows {
            let batch_reference: String = get(row, "batch_reference")?;
            let order_id: String = get(row, "order_id")?;
            let sku: String = get(row, "sku")?;
            let qty = to_u32(get::<i64>(row, "qty")?, "qty")?;
            let line = OrderLine::new(order_id, sku, qty)
                .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;
            lines.entry(batch_reference).or_default().push(line);
        }

        debug!(
            batches = headers.len(),
            lines = line_rows.len(),
            filter = %filter,
            "loaded batches"
        );

        headers
            .into_iter()
            .map(|h| {
                let allocations = lines.remove(&h.reference).unwrap_or_default();
                h.into_batch(allocations)
            })
            .collect()
    }

    async fn insert_allocations(&mut self, batch: &Batch) -> Result<(), RepositoryError> {
        for line in batch.allocations() {
            sqlx::query(
                r#"
                INSERT INTO allocations (batch_reference, order_id, sku, qty)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(batch.reference())
            .bind(line.order_id())
            .bind(line.sku())
            .bind(i64::from(line.qty()))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_allocation", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl BatchRepository for PostgresBatchRepository {
    #[instrument(skip(self, batch), fields(reference = %batch.reference()), err)]
    async fn save(&mut self, batch: Batch) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO batches (reference, sku, purchased_quantity, eta, version)
            VALUES ($1, $2, $3, $4, 0)
            "#,
        )
        .bind(batch.reference())
        .bind(batch.sku())
        .bind(i64::from(batch.purchased_quantity()))
        .bind(batch.eta())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Duplicate(batch.reference().to_string())
            } else {
                map_sqlx_error("insert_batch", e)
            }
        })?;

        self.insert_allocations(&batch).await?;
        self.touched.insert(batch.reference().to_string());
        Ok(())
    }

    #[instrument(
        skip(self, batch),
        fields(reference = %batch.reference(), version = batch.version()),
        err
    )]
    async fn update(&mut self, batch: &Batch) -> Result<(), RepositoryError> {
        let reference = batch.reference().to_string();

        if !self.touched.contains(&reference) {
            let version = i64::try_from(batch.version()).map_err(|_| {
                RepositoryError::Corrupt(format!("version out of range for {reference}"))
            })?;

            let result = sqlx::query(
                r#"
                UPDATE batches
                SET version = version + 1
                WHERE reference = $1 AND version = $2
                "#,
            )
            .bind(&reference)
            .bind(version)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("bump_version", e))?;

            if result.rows_affected() == 0 {
                let current: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM batches WHERE reference = $1")
                        .bind(&reference)
                        .fetch_optional(&mut *self.tx)
                        .await
                        .map_err(|e| map_sqlx_error("check_version", e))?;

                return Err(match current {
                    None => RepositoryError::NotFound(reference),
                    Some(found) => RepositoryError::Concurrency(format!(
                        "batch {reference}: expected version {}, found {found}",
                        batch.version()
                    )),
                });
            }

            self.touched.insert(reference.clone());
        }

        sqlx::query("DELETE FROM allocations WHERE batch_reference = $1")
            .bind(&reference)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("clear_allocations", e))?;

        self.insert_allocations(batch).await
    }

    #[instrument(skip(self), err)]
    async fn find_by_id(&mut self, reference: &str) -> Result<Option<Batch>, RepositoryError> {
        Ok(self
            .load(&BatchFilter::reference(reference))
            .await?
            .into_iter()
            .next())
    }

    #[instrument(skip(self), fields(filter = %filter), err)]
    async fn find_by(&mut self, filter: &BatchFilter) -> Result<Batch, RepositoryError> {
        let matches = self.load(filter).await?;
        filter.expect_one(matches)
    }

    #[instrument(skip(self), err)]
    async fn find_all(&mut self) -> Result<Vec<Batch>, RepositoryError> {
        self.load(&BatchFilter::default()).await
    }
}

struct BatchRow {
    reference: String,
    sku: String,
    purchased_quantity: i64,
    eta: Option<NaiveDate>,
    version: i64,
}

impl BatchRow {
    fn from_pg_row(row: &PgRow) -> Result<Self, RepositoryError> {
        Ok(Self {
            reference: get(row, "reference")?,
            sku: get(row, "sku")?,
            purchased_quantity: get(row, "purchased_quantity")?,
            eta: get(row, "eta")?,
            version: get(row, "version")?,
        })
    }

    fn into_batch(self, allocations: Vec<OrderLine>) -> Result<Batch, RepositoryError> {
        let purchased = to_u32(self.purchased_quantity, "purchased_quantity")?;
        let version = u64::try_from(self.version).map_err(|_| {
            RepositoryError::Corrupt(format!("negative version for {}", self.reference))
        })?;

        Batch::restore(self.reference, self.sku, purchased, self.eta, allocations, version)
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| RepositoryError::Corrupt(format!("failed to read {column}: {e}")))
}

fn to_u32(value: i64, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Corrupt(format!("{column} out of range: {value}")))
}

/// Check if an error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// Map SQLx errors to RepositoryError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Duplicate(msg),
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}
