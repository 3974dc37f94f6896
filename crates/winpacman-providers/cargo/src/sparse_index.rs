//! Sparse index path mapping and newline-delimited JSON record parsing
//! (spec §4.3.5).

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct IndexLine {
    pub name: String,
    pub vers: String,
    #[serde(default)]
    pub yanked: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Map a crate name to its sparse-index path fragment, appended to a
/// registry base such as `https://index.crates.io`. Length-1/2/3 names
/// get shallow prefix directories; longer names split into two 2-char
/// groups (spec §4.3.5).
pub fn index_path(crate_name: &str) -> String {
    let lower = crate_name.to_lowercase();
    match lower.len() {
        0 => String::new(),
        1 => format!("1/{lower}"),
        2 => format!("2/{lower}"),
        3 => {
            let first = &lower[..1];
            format!("3/{first}/{lower}")
        }
        _ => {
            let first2 = &lower[..2];
            let next2 = &lower[2..4];
            format!("{first2}/{next2}/{lower}")
        }
    }
}

/// Parse a newline-delimited index file, keeping non-yanked entries
/// (spec §4.3.5: "yanked versions are filtered out"). Unparseable lines
/// are skipped rather than failing the whole file.
pub fn parse_index_file(body: &str) -> Vec<IndexLine> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<IndexLine>(line) {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!(%error, "skipping unparseable sparse-index line");
                None
            }
        })
        .filter(|entry| !entry.yanked)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_short_names_by_length() {
        assert_eq!(index_path("a"), "1/a");
        assert_eq!(index_path("ab"), "2/ab");
        assert_eq!(index_path("abc"), "3/a/abc");
    }

    #[test]
    fn maps_long_names_by_two_two_split() {
        assert_eq!(index_path("serde"), "se/rd/serde");
        assert_eq!(index_path("tokio"), "to/ki/tokio");
    }

    #[test]
    fn filters_out_yanked_versions() {
        let body = r#"{"name":"foo","vers":"1.0.0","yanked":false}
{"name":"foo","vers":"1.0.1","yanked":true}
{"name":"foo","vers":"1.1.0","yanked":false}"#;
        let entries = parse_index_file(body);
        let versions: Vec<_> = entries.iter().map(|e| e.vers.as_str()).collect();
        assert_eq!(versions, vec!["1.0.0", "1.1.0"]);
    }

    #[test]
    fn skips_unparseable_lines_without_failing_the_file() {
        let body = "not json\n{\"name\":\"foo\",\"vers\":\"1.0.0\",\"yanked\":false}";
        let entries = parse_index_file(body);
        assert_eq!(entries.len(), 1);
    }
}
