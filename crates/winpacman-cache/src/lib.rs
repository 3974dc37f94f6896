//! Metadata Cache (spec §4.4, C5): the durable aggregated catalog.
//!
//! A single embedded SQLite store with an external-content FTS5 index,
//! pooled through `r2d2` the way
//! `pahkat_client_core::package_store::PrefixPackageStore` pools its
//! `SqliteConnectionManager` — generalized from "one package store per
//! prefix" to "one aggregated cache across six ecosystems", and enriched
//! with full-text search, which the teacher has no analog for.

mod fts;
mod row;
mod schema;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter};
use tracing::{debug, warn};
use winpacman_model::{Freshness, Manager, PackageRecord, SyncStatus};

pub use row::row_to_record;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("cache worker thread panicked: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// The durable aggregated catalog (spec §4.4).
#[derive(Clone)]
pub struct MetadataCache {
    pool: Arc<r2d2::Pool<SqliteConnectionManager>>,
}

impl MetadataCache {
    /// Open (creating if absent) the cache database at `db_path` and run
    /// any pending migrations. `WAL`-style concurrency is required
    /// (spec §5 "readers never block writers and vice versa"), so
    /// `journal_mode=WAL` is set on every pooled connection.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let pool = tokio::task::spawn_blocking(move || -> Result<r2d2::Pool<SqliteConnectionManager>> {
            let manager = SqliteConnectionManager::file(&db_path).with_init(|conn| {
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;",
                )
            });
            let pool = r2d2::Pool::builder().max_size(8).min_idle(Some(0)).build(manager)?;
            let conn = pool.get()?;
            schema::migrate(&conn)?;
            Ok(pool)
        })
        .await??;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// In-memory cache, for tests and short-lived processes. Each
    /// connection in the pool would otherwise see its own empty
    /// database, so the pool is pinned to a single connection.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = tokio::task::spawn_blocking(|| -> Result<r2d2::Pool<SqliteConnectionManager>> {
            let manager = SqliteConnectionManager::memory();
            let pool = r2d2::Pool::builder().max_size(1).build(manager)?;
            let conn = pool.get()?;
            schema::migrate(&conn)?;
            Ok(pool)
        })
        .await??;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Begin a refresh for one provider's catalog slice (spec §4.4
    /// `refresh`). See [`RefreshSession`] for the batch-commit protocol
    /// that gives cancellation its safety guarantees.
    pub fn begin_refresh(&self, provider: Manager) -> RefreshSession {
        RefreshSession {
            pool: Arc::clone(&self.pool),
            provider,
            started_at: Utc::now(),
            deleted_old_slice: false,
            committed: 0,
        }
    }

    /// Convenience wrapper for a refresh driven from a single in-memory
    /// batch (used by tests and by providers too small to need batching).
    pub async fn refresh(&self, provider: Manager, records: Vec<PackageRecord>, batch_size: usize) -> Result<u64> {
        let mut session = self.begin_refresh(provider);
        for chunk in records.chunks(batch_size.max(1)) {
            session.commit_batch(chunk.to_vec()).await?;
        }
        let committed = session.committed;
        session.finish(SyncStatus::Success, None).await?;
        Ok(committed)
    }

    /// Sanitize and run a full-text search (spec §4.4 `search`).
    pub async fn search(&self, query: &str, managers: Option<Vec<Manager>>, limit: u32) -> Result<Vec<PackageRecord>> {
        let Some(sanitized) = fts::sanitize(query) else {
            return Ok(Vec::new());
        };

        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || -> Result<Vec<PackageRecord>> {
            let conn = pool.get()?;

            let mut sql = String::from(
                "SELECT packages.* FROM packages_fts \
                 JOIN packages ON packages.id = packages_fts.rowid \
                 WHERE packages_fts MATCH ?",
            );
            let mut bound: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(sanitized)];

            if let Some(managers) = &managers {
                sql.push_str(&format!(" AND packages.manager IN ({})", placeholders(managers.len())));
                for manager in managers {
                    bound.push(Box::new(manager.as_str().to_string()));
                }
            }
            sql.push_str(" ORDER BY bm25(packages_fts) LIMIT ?");
            bound.push(Box::new(limit));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(bound.iter().map(|b| b.as_ref())), row_to_record)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
        .await?
    }

    /// Every cached package, optionally filtered by manager (spec §4.9
    /// `list_available`: "pulls from cache, not from the provider").
    pub async fn list(&self, managers: Option<Vec<Manager>>) -> Result<Vec<PackageRecord>> {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || -> Result<Vec<PackageRecord>> {
            let conn = pool.get()?;

            let mut sql = String::from("SELECT * FROM packages");
            let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(managers) = &managers {
                sql.push_str(&format!(" WHERE manager IN ({})", placeholders(managers.len())));
                for manager in managers {
                    bound.push(Box::new(manager.as_str().to_string()));
                }
            }

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(bound.iter().map(|b| b.as_ref())), row_to_record)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
        .await?
    }

    /// Installed records, optionally filtered by catalog manager and/or
    /// attributed `install_source` (spec §4.4 `get_installed`).
    pub async fn get_installed(&self, managers: Option<Vec<Manager>>, source: Option<Manager>) -> Result<Vec<PackageRecord>> {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || -> Result<Vec<PackageRecord>> {
            let conn = pool.get()?;

            let mut sql = String::from("SELECT * FROM packages WHERE is_installed = 1");
            let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(managers) = &managers {
                sql.push_str(&format!(" AND manager IN ({})", placeholders(managers.len())));
                for manager in managers {
                    bound.push(Box::new(manager.as_str().to_string()));
                }
            }
            if let Some(source) = source {
                sql.push_str(" AND install_source = ?");
                bound.push(Box::new(source.as_str().to_string()));
            }

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(bound.iter().map(|b| b.as_ref())), row_to_record)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
        .await?
    }

    /// Exact `(package_id, manager)` lookup, used by `get_details` (spec
    /// §4.9) before it falls back to the provider's own `fetch_one`.
    pub async fn get_by_id(&self, package_id: &str, manager: Manager) -> Result<Option<PackageRecord>> {
        let pool = Arc::clone(&self.pool);
        let package_id = package_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<PackageRecord>> {
            let conn = pool.get()?;
            let result = conn.query_row(
                "SELECT * FROM packages WHERE package_id = ?1 AND manager = ?2",
                params![package_id, manager.as_str()],
                row_to_record,
            );
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(other) => Err(other.into()),
            }
        })
        .await?
    }

    /// Attribute a package to a manager by (in order) exact
    /// case-sensitive `package_id`, case-insensitive `package_id`, then
    /// display name (spec §4.4 `find_manager`).
    pub async fn find_manager(&self, package_id: &str, name: &str) -> Result<Option<Manager>> {
        let pool = Arc::clone(&self.pool);
        let package_id = package_id.to_string();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<Manager>> {
            let conn = pool.get()?;

            if let Some(m) = lookup_manager(&conn, "SELECT manager FROM packages WHERE package_id = ?1 LIMIT 1", &package_id)? {
                return Ok(Some(m));
            }
            if let Some(m) = lookup_manager(
                &conn,
                "SELECT manager FROM packages WHERE package_id = ?1 COLLATE NOCASE LIMIT 1",
                &package_id,
            )? {
                return Ok(Some(m));
            }
            lookup_manager(&conn, "SELECT manager FROM packages WHERE name = ?1 COLLATE NOCASE LIMIT 1", &name)
        })
        .await?
    }

    /// Merge a freshly-scanned installed-inventory set into the cache
    /// (spec §4.4 `sync_installed`): clear every installed flag, then
    /// either update the matching `(package_id, manager)` row or insert
    /// a fresh one keyed off `install_source`.
    pub async fn sync_installed(&self, records: Vec<PackageRecord>) -> Result<()> {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            tx.execute(
                "UPDATE packages SET is_installed = 0, installed_version = NULL, install_date = NULL, \
                 install_source = NULL, install_location = NULL",
                [],
            )?;

            for mut record in records {
                record.is_installed = true;
                if record.installed_version.is_none() {
                    record.installed_version = Some(record.version.as_str().to_string());
                }
                record.refresh_search_tokens();
                let manager = record.install_source.unwrap_or(record.manager);

                let updated = tx.execute(
                    "UPDATE packages SET is_installed = 1, installed_version = ?1, install_date = ?2, \
                     install_source = ?3, install_location = ?4, last_seen_at = ?5 \
                     WHERE package_id = ?6 AND manager = ?7",
                    params![
                        record.installed_version,
                        record.install_date.map(|d| d.to_rfc3339()),
                        manager.as_str(),
                        record.install_location.as_ref().map(|p| p.to_string_lossy().into_owned()),
                        record.last_seen_at.to_rfc3339(),
                        record.package_id,
                        manager.as_str(),
                    ],
                )?;

                if updated == 0 {
                    tx.execute(
                        "INSERT INTO packages (package_id, manager, name, version, description, publisher, \
                         homepage, license, tags_json, search_tokens, last_seen_at, is_installed, \
                         installed_version, install_date, install_source, install_location) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?12, ?13, ?14, ?15)",
                        params![
                            record.package_id,
                            manager.as_str(),
                            record.name,
                            record.version.as_str(),
                            record.description,
                            record.publisher,
                            record.homepage,
                            record.license,
                            row::record_to_tags_json(&record),
                            record.search_tokens,
                            record.last_seen_at.to_rfc3339(),
                            record.installed_version,
                            record.install_date.map(|d| d.to_rfc3339()),
                            manager.as_str(),
                            record.install_location.as_ref().map(|p| p.to_string_lossy().into_owned()),
                        ],
                    )?;
                }
            }

            tx.commit()?;
            Ok(())
        })
        .await?
    }

    /// Freshness summary for one provider (spec §4.4 `freshness`).
    pub async fn freshness(&self, provider: Manager) -> Result<Freshness> {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || -> Result<Freshness> {
            let conn = pool.get()?;
            let row = conn.query_row(
                "SELECT last_sync_finished_at, package_count, last_sync_status FROM sync_metadata WHERE provider = ?1",
                params![provider.as_str()],
                |row| {
                    let finished_at: Option<String> = row.get(0)?;
                    let package_count: i64 = row.get(1)?;
                    let status: String = row.get(2)?;
                    Ok((finished_at, package_count, status))
                },
            );

            match row {
                Ok((finished_at, package_count, status)) => Ok(Freshness {
                    last_sync_at: finished_at.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
                    package_count: package_count.max(0) as u64,
                    status: status_from_str(&status),
                }),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(Freshness {
                    last_sync_at: None,
                    package_count: 0,
                    status: None,
                }),
                Err(other) => Err(other.into()),
            }
        })
        .await?
    }

    /// Every package's versions known to `package_versions` (used by
    /// WinGet install targeting — spec §4.3.1 "earlier versions are
    /// retained on an auxiliary `versions` store").
    pub async fn record_versions(&self, package_id: &str, manager: Manager, versions: Vec<String>) -> Result<()> {
        let pool = Arc::clone(&self.pool);
        let package_id = package_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM package_versions WHERE package_id = ?1 AND manager = ?2",
                params![package_id, manager.as_str()],
            )?;
            for version in versions {
                tx.execute(
                    "INSERT INTO package_versions (package_id, manager, version) VALUES (?1, ?2, ?3)",
                    params![package_id, manager.as_str(), version],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await?
    }
}

fn lookup_manager(conn: &rusqlite::Connection, sql: &str, key: &str) -> Result<Option<Manager>> {
    let result = conn.query_row(sql, params![key], |row| row.get::<_, String>(0));
    match result {
        Ok(manager) => Ok(std::str::FromStr::from_str(&manager).ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(other) => Err(other.into()),
    }
}

fn status_from_str(raw: &str) -> Option<SyncStatus> {
    match raw {
        "success" => Some(SyncStatus::Success),
        "partial" => Some(SyncStatus::Partial),
        "failed" => Some(SyncStatus::Failed),
        _ => None,
    }
}

fn status_to_str(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Success => "success",
        SyncStatus::Partial => "partial",
        SyncStatus::Failed => "failed",
    }
}

fn placeholders(count: usize) -> String {
    std::iter::repeat("?").take(count).collect::<Vec<_>>().join(", ")
}

/// A single provider refresh in progress (spec §4.4 `refresh`, §5
/// cancellation safety).
///
/// The first [`RefreshSession::commit_batch`] call deletes the
/// provider's prior slice and inserts the first batch in one
/// transaction; every later batch is its own short transaction. If the
/// provider fails before a single batch lands, the prior slice is left
/// untouched (spec §4.4 "a failed sync leaves the prior slice in
/// place"). If cancellation lands after N batches have committed, those
/// N batches' rows remain and `finish` records the sync as failed (spec
/// §8 scenario 5) — the two behaviors are reconciled by making "prior
/// slice preserved" describe total failure and "partial rows visible"
/// describe partial progress, rather than treating them as conflicting.
pub struct RefreshSession {
    pool: Arc<r2d2::Pool<SqliteConnectionManager>>,
    provider: Manager,
    started_at: DateTime<Utc>,
    deleted_old_slice: bool,
    committed: u64,
}

impl RefreshSession {
    pub fn committed_so_far(&self) -> u64 {
        self.committed
    }

    /// Commit one batch of records (spec: "bulk-inserts new rows in
    /// batches of 1,000-5,000"). Each call is its own transaction so a
    /// cancellation between calls leaves exactly the already-committed
    /// rows in place.
    pub async fn commit_batch(&mut self, mut records: Vec<PackageRecord>) -> Result<()> {
        let pool = Arc::clone(&self.pool);
        let provider = self.provider;
        let delete_old_slice = !self.deleted_old_slice;
        let batch_len = records.len() as u64;

        for record in &mut records {
            record.refresh_search_tokens();
        }

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            if delete_old_slice {
                tx.execute("DELETE FROM packages WHERE manager = ?1", params![provider.as_str()])?;
            }

            for record in &records {
                tx.execute(
                    "INSERT INTO packages (package_id, manager, name, version, description, publisher, \
                     homepage, license, tags_json, search_tokens, last_seen_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
                     ON CONFLICT(package_id, manager) DO UPDATE SET \
                     name = excluded.name, version = excluded.version, description = excluded.description, \
                     publisher = excluded.publisher, homepage = excluded.homepage, license = excluded.license, \
                     tags_json = excluded.tags_json, search_tokens = excluded.search_tokens, \
                     last_seen_at = excluded.last_seen_at",
                    params![
                        record.package_id,
                        provider.as_str(),
                        record.name,
                        record.version.as_str(),
                        record.description,
                        record.publisher,
                        record.homepage,
                        record.license,
                        row::record_to_tags_json(record),
                        record.search_tokens,
                        record.last_seen_at.to_rfc3339(),
                    ],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await??;

        self.deleted_old_slice = true;
        self.committed += batch_len;
        debug!(provider = %self.provider, committed = self.committed, "committed refresh batch");
        Ok(())
    }

    /// Finalize the sync, writing `sync_metadata` (spec §3 "Sync-metadata
    /// record"). Consumes `self` — a session is only ever finished once.
    pub async fn finish(self, status: SyncStatus, error_message: Option<String>) -> Result<()> {
        let pool = Arc::clone(&self.pool);
        let provider = self.provider;
        let started_at = self.started_at;
        let committed = self.committed;

        if status == SyncStatus::Failed && committed > 0 {
            warn!(provider = %provider, committed, "sync failed after partial progress; partial rows remain committed");
        }

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO sync_metadata (provider, last_sync_started_at, last_sync_finished_at, \
                 last_sync_status, package_count, error_message) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(provider) DO UPDATE SET \
                 last_sync_started_at = excluded.last_sync_started_at, \
                 last_sync_finished_at = excluded.last_sync_finished_at, \
                 last_sync_status = excluded.last_sync_status, \
                 package_count = excluded.package_count, \
                 error_message = excluded.error_message",
                params![
                    provider.as_str(),
                    started_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    status_to_str(status),
                    committed as i64,
                    error_message,
                ],
            )?;
            Ok(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use winpacman_model::Version;

    fn record(id: &str, manager: Manager) -> PackageRecord {
        PackageRecord::new(id, id, Version::new("1.0.0"), manager, Utc::now())
    }

    #[tokio::test]
    async fn refresh_then_search_finds_the_row() {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        cache
            .refresh(Manager::Winget, vec![record("Microsoft.VisualStudioCode", Manager::Winget)], 1000)
            .await
            .unwrap();

        let results = cache.search("Microsoft.VisualStudioCode", None, 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].package_id, "Microsoft.VisualStudioCode");
    }

    #[tokio::test]
    async fn search_is_case_and_whitespace_insensitive() {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        let mut r = record("vscode", Manager::Winget);
        r.name = "Visual Studio Code".to_string();
        r.refresh_search_tokens();
        cache.refresh(Manager::Winget, vec![r], 1000).await.unwrap();

        let a = cache.search("Visual Studio Code", None, 10).await.unwrap();
        let b = cache.search("visual  studio  code", None, 10).await.unwrap();
        let c = cache.search("VISUAL STUDIO CODE", None, 10).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(c.len(), 1);
    }

    #[tokio::test]
    async fn special_character_query_does_not_raise() {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        let results = cache.search("c++", None, 10).await.unwrap();
        assert!(results.is_empty());

        let results = cache.search(".", None, 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn refresh_replaces_the_providers_slice_atomically() {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        cache.refresh(Manager::Npm, vec![record("left-pad", Manager::Npm)], 1000).await.unwrap();
        cache.refresh(Manager::Npm, vec![record("chalk", Manager::Npm)], 1000).await.unwrap();

        let installed = cache.get_installed(Some(vec![Manager::Npm]), None).await.unwrap();
        assert!(installed.is_empty());

        let all = cache.search("left-pad", None, 10).await.unwrap();
        assert!(all.is_empty(), "old slice should have been replaced");
        let all = cache.search("chalk", None, 10).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn partial_refresh_failure_leaves_committed_batches_in_place() {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        let mut session = cache.begin_refresh(Manager::Chocolatey);
        session.commit_batch(vec![record("a", Manager::Chocolatey), record("b", Manager::Chocolatey)]).await.unwrap();
        session.finish(SyncStatus::Failed, Some("cancelled".into())).await.unwrap();

        let freshness = cache.freshness(Manager::Chocolatey).await.unwrap();
        assert_eq!(freshness.package_count, 2);
        assert_eq!(freshness.status, Some(SyncStatus::Failed));
    }

    #[tokio::test]
    async fn sync_installed_updates_matching_row_and_inserts_unmatched() {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        cache.refresh(Manager::Winget, vec![record("Charmbracelet.neo-cowsay", Manager::Winget)], 1000).await.unwrap();

        let mut installed = record("Charmbracelet.neo-cowsay", Manager::Winget);
        installed.install_source = Some(Manager::Winget);
        installed.installed_version = Some("1.0.0".into());

        let mut new_app = record("Totally New App", Manager::Unknown);
        new_app.install_source = Some(Manager::Unknown);
        new_app.installed_version = Some("2.0.0".into());

        cache.sync_installed(vec![installed, new_app]).await.unwrap();

        let all_installed = cache.get_installed(None, None).await.unwrap();
        assert_eq!(all_installed.len(), 2);
        assert!(all_installed.iter().all(|r| r.installed_state_is_consistent()));
    }

    #[tokio::test]
    async fn find_manager_falls_back_case_insensitive_then_by_name() {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        let mut r = record("Charmbracelet.neo-cowsay", Manager::Winget);
        r.name = "Neo Cowsay".to_string();
        r.refresh_search_tokens();
        cache.refresh(Manager::Winget, vec![r], 1000).await.unwrap();

        assert_eq!(
            cache.find_manager("Charmbracelet.neo-cowsay", "irrelevant").await.unwrap(),
            Some(Manager::Winget)
        );
        assert_eq!(
            cache.find_manager("charmbracelet.neo-cowsay", "irrelevant").await.unwrap(),
            Some(Manager::Winget)
        );
        assert_eq!(cache.find_manager("does-not-exist", "Neo Cowsay").await.unwrap(), Some(Manager::Winget));
        assert_eq!(cache.find_manager("does-not-exist", "also-nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_returns_every_row_filtered_by_manager() {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        cache.refresh(Manager::Winget, vec![record("vlc", Manager::Winget)], 1000).await.unwrap();
        cache.refresh(Manager::Npm, vec![record("left-pad", Manager::Npm)], 1000).await.unwrap();

        assert_eq!(cache.list(None).await.unwrap().len(), 2);
        let npm_only = cache.list(Some(vec![Manager::Npm])).await.unwrap();
        assert_eq!(npm_only.len(), 1);
        assert_eq!(npm_only[0].package_id, "left-pad");
    }

    #[tokio::test]
    async fn get_by_id_is_exact_and_manager_scoped() {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        cache.refresh(Manager::Winget, vec![record("vlc", Manager::Winget)], 1000).await.unwrap();

        assert!(cache.get_by_id("vlc", Manager::Winget).await.unwrap().is_some());
        assert!(cache.get_by_id("vlc", Manager::Npm).await.unwrap().is_none());
        assert!(cache.get_by_id("does-not-exist", Manager::Winget).await.unwrap().is_none());
    }
}
