//! Conversions between a `packages` row and a [`PackageRecord`].

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use winpacman_model::{Manager, PackageRecord, Version};

pub fn record_to_tags_json(record: &PackageRecord) -> String {
    serde_json::to_string(&record.tags).unwrap_or_else(|_| "[]".to_string())
}

/// Read one `packages` row back into a [`PackageRecord`]. Unparseable
/// `manager`/`install_source` values would indicate DB corruption rather
/// than a recoverable condition, so they bubble up via `rusqlite::Error`
/// through `Row::get`'s conversion machinery.
pub fn row_to_record(row: &Row<'_>) -> rusqlite::Result<PackageRecord> {
    let manager: String = row.get("manager")?;
    let manager = Manager::from_str(&manager).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let tags_json: String = row.get("tags_json")?;
    let tags = serde_json::from_str(&tags_json).unwrap_or_default();

    let last_seen_at: String = row.get("last_seen_at")?;
    let last_seen_at = parse_timestamp(&last_seen_at);

    let install_source: Option<String> = row.get("install_source")?;
    let install_source = install_source.and_then(|s| Manager::from_str(&s).ok());

    let install_date: Option<String> = row.get("install_date")?;
    let install_date = install_date.map(|s| parse_timestamp(&s));

    let install_location: Option<String> = row.get("install_location")?;

    Ok(PackageRecord {
        package_id: row.get("package_id")?,
        name: row.get("name")?,
        version: Version::new(row.get::<_, String>("version")?),
        manager,
        description: row.get("description")?,
        publisher: row.get("publisher")?,
        homepage: row.get("homepage")?,
        license: row.get("license")?,
        tags,
        search_tokens: row.get("search_tokens")?,
        is_installed: row.get::<_, i64>("is_installed")? != 0,
        installed_version: row.get("installed_version")?,
        install_date,
        install_source,
        install_location: install_location.map(PathBuf::from),
        last_seen_at,
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
