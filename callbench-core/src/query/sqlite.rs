use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::store::{
    CountQuery, FieldValue, Filter, FindQuery, GroupQuery, InsertQuery, RecordStore, StoreError,
    validate_identifier,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        status TEXT NOT NULL,
        region TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS calls (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        status TEXT NOT NULL,
        direction TEXT NOT NULL,
        duration_sec INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        status TEXT NOT NULL,
        total REAL NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_accounts_status ON accounts (status)",
    "CREATE INDEX IF NOT EXISTS idx_calls_status ON calls (status)",
    "CREATE INDEX IF NOT EXISTS idx_calls_created_at ON calls (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_calls_account_id ON calls (account_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders (status)",
    "CREATE INDEX IF NOT EXISTS idx_orders_account_id ON orders (account_id)",
];

const CALL_STATUSES: &[&str] = &["completed", "missed", "abandoned", "voicemail"];
const ORDER_STATUSES: &[&str] = &["open", "paid", "shipped", "cancelled"];
const DIRECTIONS: &[&str] = &["inbound", "outbound"];
const REGIONS: &[&str] = &["emea", "amer", "apac"];

/// SQLite-backed [`RecordStore`]. Collections map to tables, fields to columns.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub const IN_MEMORY: &'static str = "sqlite::memory:";

    /// Opens (creating when absent) the database at `url`.
    ///
    /// A single pooled connection keeps in-memory databases alive for the store's lifetime.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect(Self::IN_MEMORY).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the call-center schema and fills it with deterministic rows.
    ///
    /// `calls` gets `rows` records, `orders` half as many and `accounts` a tenth (at least one).
    pub async fn seed_demo(&self, rows: u32, seed: u64) -> Result<(), StoreError> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }

        let mut rng = fastrand::Rng::with_seed(seed);
        let accounts = (rows / 10).max(1);
        let mut tx = self.pool.begin().await?;

        for i in 0..accounts {
            sqlx::query(
                "INSERT INTO accounts (name, status, region, created_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(format!("account-{i}"))
            .bind(if rng.u8(0..10) < 8 { "active" } else { "suspended" })
            .bind(pick(&mut rng, REGIONS))
            .bind(random_date(&mut rng))
            .execute(&mut *tx)
            .await?;
        }

        for _ in 0..rows {
            sqlx::query(
                "INSERT INTO calls (account_id, status, direction, duration_sec, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(i64::from(rng.u32(1..=accounts)))
            .bind(pick(&mut rng, CALL_STATUSES))
            .bind(pick(&mut rng, DIRECTIONS))
            .bind(i64::from(rng.u32(5..1800)))
            .bind(random_date(&mut rng))
            .execute(&mut *tx)
            .await?;
        }

        for _ in 0..rows / 2 {
            sqlx::query(
                "INSERT INTO orders (account_id, status, total, created_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(i64::from(rng.u32(1..=accounts)))
            .bind(pick(&mut rng, ORDER_STATUSES))
            .bind(f64::from(rng.u32(100..100_000)) / 100.0)
            .bind(random_date(&mut rng))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(rows, accounts, "seeded demo schema");
        Ok(())
    }
}

fn pick(rng: &mut fastrand::Rng, values: &[&'static str]) -> &'static str {
    values[rng.usize(..values.len())]
}

fn random_date(rng: &mut fastrand::Rng) -> String {
    format!(
        "2024-{:02}-{:02}T{:02}:{:02}:00Z",
        rng.u8(1..=12),
        rng.u8(1..=28),
        rng.u8(0..24),
        rng.u8(0..60)
    )
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &FieldValue) {
    match value {
        FieldValue::Bool(v) => qb.push_bind(*v),
        FieldValue::Int(v) => qb.push_bind(*v),
        FieldValue::Float(v) => qb.push_bind(*v),
        FieldValue::Text(v) => qb.push_bind(v.clone()),
    };
}

fn push_where(qb: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) -> Result<(), StoreError> {
    for (idx, cond) in filter.conditions.iter().enumerate() {
        qb.push(if idx == 0 { " WHERE " } else { " AND " });
        qb.push(validate_identifier(&cond.field)?);
        qb.push(format!(" {} ", cond.op));
        push_value(qb, &cond.value);
    }
    Ok(())
}

fn select_from<'a>(
    columns: &str,
    collection: &str,
    filter: &Filter,
) -> Result<QueryBuilder<'a, Sqlite>, StoreError> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {columns} FROM {}",
        validate_identifier(collection)?
    ));
    push_where(&mut qb, filter)?;
    Ok(qb)
}

/// `true` when no step of the plan scans a whole table without an index.
fn plan_uses_index(details: &[String]) -> bool {
    let full_scan = details
        .iter()
        .any(|d| d.starts_with("SCAN") && !d.contains("INDEX"));
    let indexed = details
        .iter()
        .any(|d| d.contains("INDEX") || d.contains("PRIMARY KEY"));
    indexed && !full_scan
}

impl RecordStore for SqliteStore {
    async fn count(&self, query: &CountQuery) -> Result<u64, StoreError> {
        let mut qb = select_from("COUNT(*)", &query.collection, &query.filter)?;
        let n: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn find(&self, query: &FindQuery) -> Result<u64, StoreError> {
        let mut qb = select_from("*", &query.collection, &query.filter)?;
        if let Some(sort) = &query.sort {
            qb.push(" ORDER BY ");
            qb.push(validate_identifier(&sort.field)?);
            qb.push(if sort.descending { " DESC" } else { " ASC" });
        }
        if query.limit.is_some() || query.skip.is_some() {
            // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
            let limit = query
                .limit
                .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
            qb.push(" LIMIT ");
            qb.push_bind(limit);
            if let Some(skip) = query.skip {
                qb.push(" OFFSET ");
                qb.push_bind(i64::try_from(skip).unwrap_or(i64::MAX));
            }
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.len() as u64)
    }

    async fn group_count(&self, query: &GroupQuery) -> Result<u64, StoreError> {
        let group_by = validate_identifier(&query.group_by)?;
        let mut qb = select_from(
            &format!("{group_by}, COUNT(*)"),
            &query.collection,
            &query.filter,
        )?;
        qb.push(" GROUP BY ");
        qb.push(group_by);

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.len() as u64)
    }

    async fn insert(&self, query: &InsertQuery) -> Result<(), StoreError> {
        if query.record.is_empty() {
            return Err(StoreError::EmptyRecord(query.collection.clone()));
        }

        let mut qb = QueryBuilder::<Sqlite>::new("INSERT INTO ");
        qb.push(validate_identifier(&query.collection)?);
        qb.push(" (");
        {
            let mut cols = qb.separated(", ");
            for field in query.record.keys() {
                cols.push(validate_identifier(field)?);
            }
        }
        qb.push(") VALUES (");
        for (idx, value) in query.record.values().enumerate() {
            if idx > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value);
        }
        qb.push(")");

        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn explain(&self, collection: &str, filter: &Filter) -> Result<Option<bool>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new("EXPLAIN QUERY PLAN ");
        qb.push(format!("SELECT * FROM {}", validate_identifier(collection)?));
        push_where(&mut qb, filter)?;

        let rows = qb.build().fetch_all(&self.pool).await?;
        let details = rows
            .iter()
            .map(|row| row.try_get::<String, _>("detail"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(plan_uses_index(&details)))
    }
}
