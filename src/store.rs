use crate::error::{Result, WardrobeError};
use crate::ids;
use crate::types::{Record, RecordPatch, Status};
use chrono::NaiveDate;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const BACKUP_SUFFIX: &str = ".bak";
pub const TEMP_SUFFIX: &str = ".tmp";

/// How a save went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The new file is in place but the previous one could not be copied
    SavedWithoutBackup { reason: String },
}

/// What `open` found on disk
#[derive(Debug)]
pub enum LoadStatus {
    /// No backing file yet
    Missing,
    Loaded(usize),
    /// Primary was gone but a complete temp file from an interrupted save was
    RecoveredFromTemp(usize),
    /// Backing file exists but is unreadable; it is left untouched until the
    /// next explicit save
    Corrupt(WardrobeError),
}

/// Path with `suffix` appended to the file name
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| WardrobeError::persistence(parent, e))?;
    }
    Ok(())
}

/// Write `data` to `path` and flush it to disk
fn write_synced(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| WardrobeError::persistence(path, e))?;
    file.write_all(data)
        .map_err(|e| WardrobeError::persistence(path, e))?;
    file.sync_all()
        .map_err(|e| WardrobeError::persistence(path, e))
}

/// Move a finished temp file over `target`
fn replace(temp: &Path, target: &Path) -> Result<()> {
    // rename() cannot replace an existing file on Windows
    #[cfg(windows)]
    if target.exists() {
        fs::remove_file(target).map_err(|e| WardrobeError::persistence(target, e))?;
    }
    fs::rename(temp, target).map_err(|e| WardrobeError::persistence(target, e))
}

/// Atomically write `data` to `path` via a `.tmp` sibling
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    let temp = sibling(path, TEMP_SUFFIX);
    write_synced(&temp, data)?;
    replace(&temp, path)
}

/// Ordered collection of records persisted as one JSON array
pub struct RecordStore {
    path: PathBuf,
    records: Vec<Record>,
    load_status: LoadStatus,
    last_save: Option<SaveOutcome>,
}

impl RecordStore {
    /// Open the store at `path`, loading whatever is there
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let temp = sibling(&path, TEMP_SUFFIX);

        let (records, load_status) = if path.exists() {
            if temp.exists() {
                warn!(
                    "Found leftover {} from an interrupted save; it will be replaced",
                    temp.display()
                );
            }
            let content = fs::read(&path).map_err(|e| WardrobeError::persistence(&path, e))?;
            match serde_json::from_slice::<Vec<Record>>(&content) {
                Ok(records) => {
                    let n = records.len();
                    (records, LoadStatus::Loaded(n))
                }
                Err(e) => {
                    warn!(
                        "{} is corrupt ({}); starting empty and leaving the file untouched",
                        path.display(),
                        e
                    );
                    let corrupt = WardrobeError::StoreCorrupt {
                        path: path.clone(),
                        reason: e.to_string(),
                    };
                    (Vec::new(), LoadStatus::Corrupt(corrupt))
                }
            }
        } else {
            match Self::read_temp(&temp) {
                Some(records) => {
                    warn!(
                        "{} missing, recovered {} records from {}",
                        path.display(),
                        records.len(),
                        temp.display()
                    );
                    let n = records.len();
                    (records, LoadStatus::RecoveredFromTemp(n))
                }
                None => (Vec::new(), LoadStatus::Missing),
            }
        };

        debug!("Opened store {} ({:?})", path.display(), load_status);

        Ok(Self {
            path,
            records,
            load_status,
            last_save: None,
        })
    }

    fn read_temp(temp: &Path) -> Option<Vec<Record>> {
        let content = fs::read(temp).ok()?;
        serde_json::from_slice(&content).ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        sibling(&self.path, BACKUP_SUFFIX)
    }

    fn temp_path(&self) -> PathBuf {
        sibling(&self.path, TEMP_SUFFIX)
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    /// Outcome of the most recent successful save
    pub fn last_save(&self) -> Option<&SaveOutcome> {
        self.last_save.as_ref()
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Next free id for `category` on `date`
    pub fn generate_id_on(&self, category: &str, date: NaiveDate) -> String {
        ids::next_id(category, date, self.records.iter().map(|r| r.id.as_str()))
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Back up, write a temp file, then rename it over the primary
    pub fn save(&mut self) -> Result<SaveOutcome> {
        ensure_parent(&self.path)?;
        let outcome = self.backup();
        let temp = self.write_temp()?;
        replace(&temp, &self.path)?;

        debug!("Saved {} records to {}", self.records.len(), self.path.display());
        self.last_save = Some(outcome.clone());
        Ok(outcome)
    }

    fn backup(&self) -> SaveOutcome {
        if !self.path.exists() {
            return SaveOutcome::Saved;
        }
        let backup = self.backup_path();
        match fs::copy(&self.path, &backup) {
            Ok(_) => SaveOutcome::Saved,
            Err(e) => {
                warn!("Failed to create backup {}: {}", backup.display(), e);
                SaveOutcome::SavedWithoutBackup {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn write_temp(&self) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(&self.records)?;
        let temp = self.temp_path();
        write_synced(&temp, json.as_bytes())?;
        Ok(temp)
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Append a record and save
    pub fn add(&mut self, record: Record) -> Result<SaveOutcome> {
        if self.get(&record.id).is_some() {
            return Err(WardrobeError::DuplicateId(record.id));
        }
        info!("Adding item {}", record.id);
        self.records.push(record);
        self.save()
    }

    /// Merge `patch` into the record with `id` and save; `false` if unknown
    pub fn update(&mut self, id: &str, patch: RecordPatch) -> Result<bool> {
        let Some(record) = self.records.iter_mut().find(|r| r.id == id) else {
            debug!("Update skipped, no item {}", id);
            return Ok(false);
        };
        record.apply(patch);
        self.save()?;
        Ok(true)
    }

    pub fn set_status(&mut self, id: &str, status: Status) -> Result<bool> {
        self.update(
            id,
            RecordPatch {
                status: Some(status),
                ..Default::default()
            },
        )
    }

    /// Bump the wear count; returns the new count
    pub fn record_wear(&mut self, id: &str) -> Result<Option<u32>> {
        let Some(current) = self.get(id).map(|r| r.wear_count) else {
            return Ok(None);
        };
        let next = current.saturating_add(1);
        self.update(
            id,
            RecordPatch {
                wear_count: Some(next),
                ..Default::default()
            },
        )?;
        Ok(Some(next))
    }

    /// Remove the record with `id`; saves only if something was removed
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        self.records.remove(index);
        info!("Deleted item {}", id);
        self.save()?;
        Ok(true)
    }

    /// Append several records with a single save
    pub fn extend(&mut self, records: Vec<Record>) -> Result<SaveOutcome> {
        for record in &records {
            if self.get(&record.id).is_some() {
                return Err(WardrobeError::DuplicateId(record.id.clone()));
            }
        }
        self.records.extend(records);
        debug!("Store now holds {} records", self.len());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attributes;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(id: &str) -> Record {
        let mut r = Record::new(id, "Test item");
        r.created_at = NaiveDate::from_ymd_opt(2025, 1, 1);
        r.attributes = Attributes::from_value(&json!({"type": "coat", "color": "navy"}));
        r
    }

    fn store_in(dir: &TempDir) -> RecordStore {
        RecordStore::open(dir.path().join("wardrobe.json")).unwrap()
    }

    #[test]
    fn test_open_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.is_empty());
        assert!(matches!(store.load_status(), LoadStatus::Missing));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(record("coat_20250101_001")).unwrap();

        // Bare record: no date, no attributes, no optional fields
        store.add(Record::new("bag_20250101_001", "")).unwrap();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.records(), store.records());
        assert!(matches!(reloaded.load_status(), LoadStatus::Loaded(2)));
    }

    #[test]
    fn test_file_is_pretty_json_array() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(record("coat_20250101_001")).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("[\n"));
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value[0]["ai"]["type"], json!("coat"));
        assert_eq!(value[0]["purchase_date"], json!("2025-01-01"));
    }

    #[test]
    fn test_backup_holds_previous_version() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        assert_eq!(store.add(record("a_20250101_001")).unwrap(), SaveOutcome::Saved);
        assert!(!store.backup_path().exists());

        store.add(record("a_20250101_002")).unwrap();
        let backup: Vec<Record> =
            serde_json::from_str(&fs::read_to_string(store.backup_path()).unwrap()).unwrap();
        assert_eq!(backup.len(), 1);
        assert_eq!(backup[0].id, "a_20250101_001");
    }

    #[test]
    fn test_backup_failure_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(record("a_20250101_001")).unwrap();

        fs::create_dir(store.backup_path()).unwrap();
        let outcome = store.add(record("a_20250101_002")).unwrap();
        assert!(matches!(outcome, SaveOutcome::SavedWithoutBackup { .. }));
        assert_eq!(store.last_save(), Some(&outcome));
        assert_eq!(store_in(&dir).len(), 2);
    }

    #[test]
    fn test_corrupt_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wardrobe.json");
        fs::write(&path, "[{\"id\": \"a\", ").unwrap();

        let store = store_in(&dir);
        assert!(store.is_empty());
        assert!(matches!(
            store.load_status(),
            LoadStatus::Corrupt(WardrobeError::StoreCorrupt { .. })
        ));
        drop(store);
        assert_eq!(fs::read_to_string(&path).unwrap(), "[{\"id\": \"a\", ");
    }

    #[test]
    fn test_wrong_shape_is_corrupt() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("wardrobe.json"), r#"{"items": []}"#).unwrap();
        let store = store_in(&dir);
        assert!(matches!(store.load_status(), LoadStatus::Corrupt(_)));
    }

    #[test]
    fn test_non_utf8_file_is_corrupt_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wardrobe.json");
        let bytes = [0xff, 0xfe, b'[', b']'];
        fs::write(&path, bytes).unwrap();

        let store = store_in(&dir);
        assert!(store.is_empty());
        assert!(matches!(store.load_status(), LoadStatus::Corrupt(_)));
        drop(store);
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_loose_legacy_records_still_load() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("wardrobe.json"),
            r#"[
  {"id": "a_20250101_001", "name": "Coat", "purchase_date": "", "ai": {"type": "coat"}},
  {"id": "b_20250101_001", "name": "Scarf", "ai": null}
]"#,
        )
        .unwrap();

        let store = store_in(&dir);
        assert!(matches!(store.load_status(), LoadStatus::Loaded(2)));
        assert!(store.get("a_20250101_001").unwrap().created_at.is_none());
        assert!(store.get("b_20250101_001").unwrap().attributes.item_type.is_none());
    }

    #[test]
    fn test_explicit_save_after_corruption_keeps_evidence_in_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wardrobe.json");
        fs::write(&path, "not json").unwrap();

        let mut store = store_in(&dir);
        store.add(record("a_20250101_001")).unwrap();

        assert_eq!(fs::read_to_string(store.backup_path()).unwrap(), "not json");
        assert_eq!(store_in(&dir).len(), 1);
    }

    #[test]
    fn test_interrupted_save_keeps_old_primary() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(record("a_20250101_001")).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        // Crash after the temp file is written but before the rename
        store.records.push(record("a_20250101_002"));
        let temp = store.write_temp().unwrap();
        assert!(temp.exists());

        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
        let reopened = store_in(&dir);
        assert_eq!(reopened.len(), 1);
        assert!(matches!(reopened.load_status(), LoadStatus::Loaded(1)));
    }

    #[test]
    fn test_recovers_from_temp_when_primary_missing() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.records.push(record("a_20250101_001"));
        store.write_temp().unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.len(), 1);
        assert!(matches!(reopened.load_status(), LoadStatus::RecoveredFromTemp(1)));
    }

    #[test]
    fn test_update_merges_and_ignores_unknown() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(record("a_20250101_001")).unwrap();

        let patch = RecordPatch {
            name: Some("Navy coat".to_string()),
            attributes: Some(Attributes::from_value(&json!({"color": "black"}))),
            ..Default::default()
        };
        assert!(store.update("a_20250101_001", patch).unwrap());

        let reloaded = store_in(&dir);
        let item = reloaded.get("a_20250101_001").unwrap();
        assert_eq!(item.name, "Navy coat");
        assert_eq!(item.attributes.item_type.as_deref(), Some("coat"));
        assert_eq!(item.attributes.color.as_deref(), Some("black"));

        assert!(!store.update("missing", RecordPatch::default()).unwrap());
    }

    #[test]
    fn test_unknown_update_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert!(!store.set_status("missing", Status::Lent).unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(record("a_20250101_001")).unwrap();
        store.add(record("a_20250101_002")).unwrap();

        assert!(store.delete("a_20250101_001").unwrap());
        assert!(!store.delete("a_20250101_001").unwrap());

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.records()[0].id, "a_20250101_002");
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(record("a_20250101_001")).unwrap();
        let err = store.add(record("a_20250101_001")).unwrap_err();
        assert!(matches!(err, WardrobeError::DuplicateId(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_status_and_wear() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(record("a_20250101_001")).unwrap();

        assert!(store.set_status("a_20250101_001", Status::Laundry).unwrap());
        assert_eq!(store.record_wear("a_20250101_001").unwrap(), Some(1));
        assert_eq!(store.record_wear("a_20250101_001").unwrap(), Some(2));
        assert_eq!(store.record_wear("missing").unwrap(), None);

        let reloaded = store_in(&dir);
        let item = reloaded.get("a_20250101_001").unwrap();
        assert_eq!(item.status, Status::Laundry);
        assert_eq!(item.wear_count, 2);
    }

    #[test]
    fn test_generate_id_uses_store_contents() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        store.add(record("coat_20250101_001")).unwrap();
        store.add(record("coat_20250101_002")).unwrap();
        assert_eq!(store.generate_id_on("coat", day), "coat_20250101_003");
    }

    #[test]
    fn test_failed_save_keeps_memory_state() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file").unwrap();

        let mut store = RecordStore::open(blocker.join("wardrobe.json")).unwrap();
        let err = store.add(record("a_20250101_001")).unwrap_err();
        assert!(matches!(err, WardrobeError::Persistence { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_write_atomic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("log.json");
        write_atomic(&path, b"[]").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        assert!(!sibling(&path, TEMP_SUFFIX).exists());
    }
}
