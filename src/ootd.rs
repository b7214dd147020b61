use crate::error::{Result, WardrobeError};
use crate::extract::extract_json;
use crate::store::write_atomic;
use crate::types::Record;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const UNTITLED: &str = "Untitled";

/// One outfit suggested by the AI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Outfit {
    pub title: String,
    pub reason: String,
    #[serde(rename = "itemIds")]
    pub item_ids: Vec<String>,
    pub notes: String,
}

/// Parse an outfit suggestion; the response must carry `outfits`
pub fn parse_outfits(raw: &str) -> Result<Vec<Outfit>> {
    let extraction = extract_json(raw)?;
    debug!("Outfit response parsed via {:?}", extraction.method);
    let mut json = extraction.json;

    if json.get("ok").and_then(Value::as_bool) == Some(false) {
        let message = json
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no reason given")
            .to_string();
        return Err(WardrobeError::ModelDeclined(message));
    }

    match json.get_mut("outfits").map(Value::take) {
        Some(outfits @ Value::Array(_)) => Ok(serde_json::from_value(outfits)?),
        _ => Err(WardrobeError::SchemaMismatch { expected: "outfits" }),
    }
}

/// A worn outfit as kept in `ootd_log.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OotdEntry {
    /// `YYYY-MM-DD HH:MM`
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub item_ids: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl OotdEntry {
    pub fn from_outfit(outfit: &Outfit, at: NaiveDateTime) -> Self {
        let title = if outfit.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            outfit.title.clone()
        };
        Self {
            date: at.format("%Y-%m-%d %H:%M").to_string(),
            title,
            reason: outfit.reason.clone(),
            item_ids: outfit.item_ids.clone(),
            notes: outfit.notes.clone(),
        }
    }

    /// Names of the referenced items still in the wardrobe
    pub fn item_names<'a>(&self, records: &'a [Record]) -> Vec<&'a str> {
        self.item_ids
            .iter()
            .filter_map(|id| records.iter().find(|r| &r.id == id))
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Append-only outfit history
pub struct OotdLog {
    path: PathBuf,
    entries: Vec<OotdEntry>,
}

impl OotdLog {
    /// Load the log; a missing or unreadable file gives an empty log
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = if path.exists() {
            match fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|c| serde_json::from_str(&c).map_err(|e| e.to_string()))
            {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Failed to read outfit log {}: {}", path.display(), e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        Self { path, entries }
    }

    pub fn entries(&self) -> &[OotdEntry] {
        &self.entries
    }

    /// Most recent first
    pub fn newest_first(&self) -> impl Iterator<Item = &OotdEntry> {
        self.entries.iter().rev()
    }

    pub fn append(&mut self, entry: OotdEntry) -> Result<()> {
        info!("Logging outfit \"{}\"", entry.title);
        self.entries.push(entry);
        let json = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(&self.path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_outfits() {
        let raw = r#"Here is today's look:
```json
{"ok": true, "message": "Have fun", "outfits": [
  {"title": "Soft office", "reason": "Mild weather", "itemIds": ["a_20250101_001", "b_20250101_001"], "notes": "Tuck in"},
  {"title": "Backup"}
]}
```"#;
        let outfits = parse_outfits(raw).unwrap();
        assert_eq!(outfits.len(), 2);
        assert_eq!(outfits[0].item_ids, vec!["a_20250101_001", "b_20250101_001"]);
        assert!(outfits[1].item_ids.is_empty());
    }

    #[test]
    fn test_parse_outfits_requires_key() {
        let err = parse_outfits(r#"{"ok": true, "data": {}}"#).unwrap_err();
        assert!(matches!(err, WardrobeError::SchemaMismatch { expected: "outfits" }));

        let err = parse_outfits(r#"{"ok": false, "message": "No items"}"#).unwrap_err();
        assert!(matches!(err, WardrobeError::ModelDeclined(_)));
    }

    #[test]
    fn test_log_append_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ootd_log.json");
        let mut log = OotdLog::load(&path);
        assert!(log.entries().is_empty());

        let first = Outfit {
            title: String::new(),
            item_ids: vec!["a_20250101_001".to_string()],
            ..Default::default()
        };
        log.append(OotdEntry::from_outfit(&first, at(8, 5))).unwrap();
        let second = Outfit {
            title: "Weekend".to_string(),
            ..Default::default()
        };
        log.append(OotdEntry::from_outfit(&second, at(9, 30))).unwrap();

        let reloaded = OotdLog::load(&path);
        assert_eq!(reloaded.entries(), log.entries());
        let titles: Vec<_> = reloaded.newest_first().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Weekend", "Untitled"]);
        assert_eq!(reloaded.entries()[0].date, "2025-03-14 08:05");
    }

    #[test]
    fn test_item_names_skip_missing_items() {
        let records = vec![Record::new("a_20250101_001", "Linen shirt")];
        let entry = OotdEntry {
            date: String::new(),
            title: "x".to_string(),
            reason: String::new(),
            item_ids: vec!["a_20250101_001".to_string(), "gone".to_string()],
            notes: String::new(),
        };
        assert_eq!(entry.item_names(&records), vec!["Linen shirt"]);
    }
}
