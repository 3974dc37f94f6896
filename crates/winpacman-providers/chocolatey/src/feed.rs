//! OData v2 Atom feed parsing (spec §4.3.2).
//!
//! Deliberately event-driven rather than `serde`-derived: the feed mixes
//! the bare Atom namespace (`<id>`, `<title>`, `<link>`) with the `m:`/`d:`
//! OData namespaces (`<m:properties><d:Version>...`), and this reads the
//! properties we need by local tag name without requiring a namespace-aware
//! deserializer.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One `<entry>` from the feed, mapped per spec §4.3.2 ("Id, Title,
/// Version, Description, Authors, ProjectUrl, LicenseUrl, Tags").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChocoEntry {
    pub package_id: String,
    pub title: Option<String>,
    pub version: String,
    pub description: Option<String>,
    pub authors: Option<String>,
    pub project_url: Option<String>,
    pub license_url: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub entries: Vec<ChocoEntry>,
    /// The `<link rel="next" href="...">` URL, present once `$skip`
    /// pagination must hand off to `$skiptoken` pagination (spec §4.3.2).
    pub next_link: Option<String>,
}

#[derive(Default)]
struct EntryBuilder {
    package_id: Option<String>,
    title: Option<String>,
    version: Option<String>,
    description: Option<String>,
    authors: Option<String>,
    project_url: Option<String>,
    license_url: Option<String>,
    tags: Option<String>,
}

impl EntryBuilder {
    fn set(&mut self, tag: &str, text: String) {
        if text.trim().is_empty() {
            return;
        }
        match tag {
            // `d:Id` is the OData package id; the bare Atom `<id>` is a
            // request URL and is ignored.
            "Id" if self.package_id.is_none() => self.package_id = Some(text),
            "title" => self.title = Some(text),
            "Version" => self.version = Some(text),
            "Description" => self.description = Some(text),
            "Authors" => self.authors = Some(text),
            "ProjectUrl" => self.project_url = Some(text),
            "LicenseUrl" => self.license_url = Some(text),
            "Tags" => self.tags = Some(text),
            _ => {}
        }
    }

    fn build(self) -> Option<ChocoEntry> {
        Some(ChocoEntry {
            package_id: self.package_id?,
            title: self.title,
            version: self.version?,
            description: self.description,
            authors: self.authors,
            project_url: self.project_url,
            license_url: self.license_url,
            tags: self.tags,
        })
    }
}

fn local_name(start: &BytesStart) -> String {
    let raw = start.name();
    let full = String::from_utf8_lossy(raw.as_ref());
    full.rsplit(':').next().unwrap_or(&full).to_string()
}

fn attr(start: &BytesStart, key: &str) -> Option<String> {
    start.attributes().flatten().find_map(|a| {
        if a.key.as_ref() == key.as_bytes() {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

/// Parse one page of the Atom feed into entries plus an optional
/// next-page link.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut next_link = None;

    let mut in_entry = false;
    let mut current = EntryBuilder::default();
    let mut tag_stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| e.to_string())? {
            Event::Eof => break,
            Event::Start(start) | Event::Empty(start) => {
                let name = local_name(&start);
                if name == "entry" {
                    in_entry = true;
                    current = EntryBuilder::default();
                }
                if name == "link" && !in_entry && attr(&start, "rel").as_deref() == Some("next") {
                    next_link = attr(&start, "href");
                }
                tag_stack.push(name);
            }
            Event::End(end) => {
                let name = local_name_end(&end);
                if name == "entry" {
                    in_entry = false;
                    if let Some(entry) = std::mem::take(&mut current).build() {
                        entries.push(entry);
                    }
                }
                tag_stack.pop();
            }
            Event::Text(text) => {
                if in_entry {
                    if let Some(tag) = tag_stack.last() {
                        let value = text.unescape().map_err(|e| e.to_string())?.into_owned();
                        current.set(tag, value);
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(ParsedFeed { entries, next_link })
}

fn local_name_end(end: &quick_xml::events::BytesEnd) -> String {
    let raw = end.name();
    let full = String::from_utf8_lossy(raw.as_ref());
    full.rsplit(':').next().unwrap_or(&full).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:d="http://schemas.microsoft.com/ado/2007/08/dataservices" xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata">
  <link rel="next" href="https://community.chocolatey.org/api/v2/Packages()?$skiptoken='git','2.40.0'" />
  <entry>
    <id>https://community.chocolatey.org/api/v2/Packages(Id='git',Version='2.40.0')</id>
    <title type="text">git</title>
    <content type="application/zip" src="https://community.chocolatey.org/api/v2/package/git/2.40.0" />
    <m:properties>
      <d:Id>git</d:Id>
      <d:Version>2.40.0</d:Version>
      <d:Description>Git distributed version control</d:Description>
      <d:Authors>Git Development Community</d:Authors>
      <d:ProjectUrl>https://git-scm.com</d:ProjectUrl>
      <d:LicenseUrl>https://opensource.org/licenses/GPL-2.0</d:LicenseUrl>
      <d:Tags>git vcs version-control</d:Tags>
    </m:properties>
  </entry>
</feed>"#;

    #[test]
    fn parses_entry_fields_and_next_link() {
        let parsed = parse_feed(SAMPLE).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        let entry = &parsed.entries[0];
        assert_eq!(entry.package_id, "git");
        assert_eq!(entry.title.as_deref(), Some("git"));
        assert_eq!(entry.version, "2.40.0");
        assert_eq!(entry.description.as_deref(), Some("Git distributed version control"));
        assert_eq!(entry.project_url.as_deref(), Some("https://git-scm.com"));
        assert!(parsed.next_link.unwrap().contains("skiptoken"));
    }

    #[test]
    fn feed_without_next_link_has_none() {
        let xml = SAMPLE.replace(
            r#"<link rel="next" href="https://community.chocolatey.org/api/v2/Packages()?$skiptoken='git','2.40.0'" />"#,
            "",
        );
        let parsed = parse_feed(&xml).unwrap();
        assert!(parsed.next_link.is_none());
    }

    #[test]
    fn entry_missing_id_is_dropped() {
        let xml = r#"<feed><entry><title>no id here</title><m:properties><d:Version>1.0</d:Version></m:properties></entry></feed>"#;
        let parsed = parse_feed(xml).unwrap();
        assert!(parsed.entries.is_empty());
    }
}
