//! Read-only lookups against WinGet's own local index, `installed.db`
//! (spec §4.3.1 "fallback source ... consulted only to validate
//! installed attribution; it is not the catalog"; also used by the
//! manager resolver, spec §4.6, to cross-validate a `winget`
//! fingerprint).

use std::path::Path;

use rusqlite::Connection;

/// Whether `package_id` appears in WinGet's local installed index. A
/// missing or unreadable database is treated as "not found" rather than
/// an error — the caller (the resolver) downgrades to `unknown` either
/// way, per spec §4.6.
pub fn contains_package_id(db_path: &Path, package_id: &str) -> bool {
    let Ok(conn) = Connection::open_with_flags(db_path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY) else {
        return false;
    };
    query_ids_table(&conn, package_id).unwrap_or(false)
}

fn query_ids_table(conn: &Connection, package_id: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM ids WHERE id = ?1 LIMIT 1")?;
    let mut rows = stmt.query([package_id])?;
    Ok(rows.next()?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_db(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE ids (rowid INTEGER PRIMARY KEY, id TEXT NOT NULL UNIQUE);
             INSERT INTO ids (id) VALUES ('Neo.Cowsay');",
        )
        .unwrap();
    }

    #[test]
    fn finds_known_package_id() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("installed.db");
        make_db(&db_path);
        assert!(contains_package_id(&db_path, "Neo.Cowsay"));
        assert!(!contains_package_id(&db_path, "Not.Installed"));
    }

    #[test]
    fn missing_database_is_not_found_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("does-not-exist.db");
        assert!(!contains_package_id(&db_path, "Neo.Cowsay"));
    }
}
