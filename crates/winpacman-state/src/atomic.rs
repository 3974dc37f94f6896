//! Temp-file-then-rename JSON writes, grounded on
//! `vx_cache::download::DownloadCache`'s `write_metadata` (write to a
//! `.tmp` sibling, remove any stale destination, then rename into place).

use std::path::Path;

use serde::Serialize;

pub fn write_json_atomically<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(value).map_err(std::io::Error::other)?;
    std::fs::write(&temp_path, bytes)?;

    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
    std::fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_land_at_the_final_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("thing.json");
        write_json_atomically(&path, &json!({"a": 1})).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn overwrites_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thing.json");
        write_json_atomically(&path, &json!({"a": 1})).unwrap();
        write_json_atomically(&path, &json!({"a": 2})).unwrap();
        let contents: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(contents["a"], 2);
    }
}
