use super::allow_then_block;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use weir_dns_application::ports::RuleStore;
use weir_dns_domain::{domain_hierarchy, DomainError, FilterList, RuleMatch};

pub const DATABASE_FILE: &str = "rules.db";

/// Rows written per insert transaction.
const BATCH_SIZE: usize = 250;
const MAX_CONNECTIONS: u32 = 4;

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

struct ListTable {
    name: String,
    pending: Vec<String>,
}

/// Rules on disk in a per-session SQLite database, one table per list.
///
/// Slowest backend, smallest resident footprint.
#[derive(Default)]
pub struct SqliteStore {
    pool: Option<SqlitePool>,
    tables: FxHashMap<String, ListTable>,
}

impl SqliteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn pool(&self) -> Result<&SqlitePool, DomainError> {
        self.pool
            .as_ref()
            .ok_or_else(|| DomainError::StoreError("sqlite store used before init".into()))
    }

    async fn open(session_root: &Path) -> Result<SqlitePool, DomainError> {
        let options = SqliteConnectOptions::new()
            .filename(session_root.join(DATABASE_FILE))
            .create_if_missing(true)
            // the database is rebuilt from list files every session
            .journal_mode(SqliteJournalMode::Off)
            .synchronous(SqliteSynchronous::Off)
            .busy_timeout(Duration::from_secs(5));

        SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(db_error)
    }

    async fn flush(pool: &SqlitePool, table: &mut ListTable) -> Result<(), DomainError> {
        if table.pending.is_empty() {
            return Ok(());
        }

        let mut sql = format!("INSERT OR IGNORE INTO \"{}\" (rule) VALUES ", table.name);
        for idx in 0..table.pending.len() {
            if idx > 0 {
                sql.push_str(", ");
            }
            sql.push_str("(?)");
        }

        let mut tx = pool.begin().await.map_err(db_error)?;
        let mut query = sqlx::query(&sql);
        for rule in &table.pending {
            query = query.bind(rule.as_str());
        }
        query.execute(&mut *tx).await.map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;

        debug!(table = %table.name, rows = table.pending.len(), "Rule batch flushed");
        table.pending.clear();
        Ok(())
    }

    async fn lookup(
        pool: &SqlitePool,
        table: &str,
        hierarchy: &[&str],
    ) -> Result<Option<String>, sqlx::Error> {
        let placeholders = vec!["?"; hierarchy.len()].join(", ");
        let sql = format!(
            "SELECT rule FROM \"{table}\" WHERE rule IN ({placeholders}) ORDER BY length(rule) DESC LIMIT 1"
        );

        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for name in hierarchy {
            query = query.bind(*name);
        }
        query.fetch_optional(pool).await
    }
}

#[async_trait]
impl RuleStore for SqliteStore {
    async fn init(
        &mut self,
        session_root: &Path,
        lists: &[Arc<FilterList>],
    ) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(session_root).await?;
        let pool = Self::open(session_root).await?;

        self.tables.clear();
        let mut used = HashSet::new();
        for list in lists {
            if self.tables.contains_key(list.canonical_name()) {
                continue;
            }

            // distinct lists may share a short name
            let mut name = format!("list_{}", list.short_name);
            let mut suffix = 1;
            while !used.insert(name.clone()) {
                suffix += 1;
                name = format!("list_{}_{}", list.short_name, suffix);
            }

            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS \"{name}\" (rule TEXT PRIMARY KEY) WITHOUT ROWID"
            ))
            .execute(&pool)
            .await
            .map_err(db_error)?;

            self.tables.insert(
                list.canonical_name().to_string(),
                ListTable {
                    name,
                    pending: Vec::with_capacity(BATCH_SIZE),
                },
            );
        }

        self.pool = Some(pool);
        Ok(())
    }

    async fn clear(&mut self, list: &FilterList) -> Result<(), DomainError> {
        let pool = self.pool()?.clone();
        let Some(table) = self.tables.get_mut(list.canonical_name()) else {
            return Ok(());
        };
        table.pending.clear();
        sqlx::query(&format!("DELETE FROM \"{}\"", table.name))
            .execute(&pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn load(&mut self, list: &FilterList, rule: &str) -> Result<(), DomainError> {
        let pool = self.pool()?.clone();
        let Some(table) = self.tables.get_mut(list.canonical_name()) else {
            return Err(DomainError::StoreError(format!(
                "list '{}' was not initialised",
                list.canonical_name()
            )));
        };

        table.pending.push(rule.to_ascii_lowercase());
        if table.pending.len() >= BATCH_SIZE {
            Self::flush(&pool, table).await?;
        }
        Ok(())
    }

    async fn finalize(&mut self, _: &Path, _: &[Arc<FilterList>]) -> Result<(), DomainError> {
        let pool = self.pool()?.clone();
        for table in self.tables.values_mut() {
            Self::flush(&pool, table).await?;
        }
        Ok(())
    }

    async fn find_match(&self, lists: &[Arc<FilterList>], domain: &str) -> RuleMatch {
        let Some(pool) = self.pool.as_ref() else {
            return RuleMatch::none();
        };
        let hierarchy = domain_hierarchy(domain);
        if hierarchy.is_empty() {
            return RuleMatch::none();
        }

        for list in allow_then_block(lists) {
            let Some(table) = self.tables.get(list.canonical_name()) else {
                continue;
            };
            match Self::lookup(pool, &table.name, &hierarchy).await {
                Ok(Some(rule)) => return RuleMatch::from_list(list, rule),
                Ok(None) => {}
                Err(e) => {
                    warn!(list = list.canonical_name(), domain, error = %e, "Rule lookup failed");
                    return RuleMatch::none();
                }
            }
        }

        RuleMatch::none()
    }

    async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
        self.tables.clear();
    }

    fn kind(&self) -> &'static str {
        "sqlite"
    }
}
