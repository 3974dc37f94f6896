//! Schema migrations (spec §4.4 "Schema migration").
//!
//! Migrations are additive (`ADD COLUMN ... DEFAULT ...`) and applied in
//! order against `PRAGMA user_version`, the way
//! `pahkat_client_core::package_store::prefix`'s `PKG_STORE_INIT` batch
//! establishes a store's schema on first open — generalized here from a
//! single `execute_batch` at creation time to an ordered, re-runnable
//! migration list so an existing cache file can be upgraded in place.

use rusqlite::Connection;

/// Ordered migrations; index `i` brings the schema from version `i` to
/// `i + 1`. Never reorder or remove an entry once released — only ever
/// append.
const MIGRATIONS: &[&str] = &[
    // v0 -> v1: base schema.
    r#"
    CREATE TABLE packages (
        id INTEGER PRIMARY KEY,
        package_id TEXT NOT NULL,
        manager TEXT NOT NULL,
        name TEXT NOT NULL,
        version TEXT NOT NULL,
        description TEXT,
        publisher TEXT,
        homepage TEXT,
        license TEXT,
        tags_json TEXT NOT NULL DEFAULT '[]',
        search_tokens TEXT NOT NULL DEFAULT '',
        last_seen_at TEXT NOT NULL,
        is_installed INTEGER NOT NULL DEFAULT 0,
        installed_version TEXT,
        install_date TEXT,
        install_source TEXT,
        install_location TEXT,
        UNIQUE(package_id, manager)
    );

    CREATE INDEX idx_packages_manager_installed ON packages(manager, is_installed);
    CREATE INDEX idx_packages_install_source ON packages(install_source);
    CREATE INDEX idx_packages_package_id ON packages(package_id);

    CREATE VIRTUAL TABLE packages_fts USING fts5(
        package_id,
        name,
        description,
        tags,
        search_tokens,
        content='packages',
        content_rowid='id',
        tokenize='unicode61'
    );

    -- External-content FTS5 tables do not track their content table on
    -- their own; these triggers are the documented recipe for keeping
    -- packages_fts in sync with every insert/update/delete on packages.
    CREATE TRIGGER packages_ai AFTER INSERT ON packages BEGIN
        INSERT INTO packages_fts(rowid, package_id, name, description, tags, search_tokens)
        VALUES (new.id, new.package_id, new.name, new.description, new.tags_json, new.search_tokens);
    END;

    CREATE TRIGGER packages_ad AFTER DELETE ON packages BEGIN
        INSERT INTO packages_fts(packages_fts, rowid, package_id, name, description, tags, search_tokens)
        VALUES ('delete', old.id, old.package_id, old.name, old.description, old.tags_json, old.search_tokens);
    END;

    CREATE TRIGGER packages_au AFTER UPDATE ON packages BEGIN
        INSERT INTO packages_fts(packages_fts, rowid, package_id, name, description, tags, search_tokens)
        VALUES ('delete', old.id, old.package_id, old.name, old.description, old.tags_json, old.search_tokens);
        INSERT INTO packages_fts(rowid, package_id, name, description, tags, search_tokens)
        VALUES (new.id, new.package_id, new.name, new.description, new.tags_json, new.search_tokens);
    END;

    CREATE TABLE sync_metadata (
        provider TEXT PRIMARY KEY,
        last_sync_started_at TEXT NOT NULL,
        last_sync_finished_at TEXT,
        last_sync_status TEXT NOT NULL,
        package_count INTEGER NOT NULL DEFAULT 0,
        error_message TEXT
    );

    CREATE TABLE package_versions (
        package_id TEXT NOT NULL,
        manager TEXT NOT NULL,
        version TEXT NOT NULL
    );

    CREATE INDEX idx_package_versions_id_manager ON package_versions(package_id, manager);
    "#,
];

pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let current_version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let current_version = current_version.max(0) as usize;

    for (index, migration) in MIGRATIONS.iter().enumerate().skip(current_version) {
        conn.execute_batch(migration)?;
        conn.pragma_update(None, "user_version", (index + 1) as i64)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrating_twice_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT count(*) FROM packages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
