use crate::error::{Result, WardrobeError};
use crate::extract::extract_json;
use crate::generator::TextGenerator;
use crate::ids;
use crate::profile::UserProfile;
use crate::prompts::build_add_item_prompt;
use crate::resolve::AssetResolver;
use crate::store::RecordStore;
use crate::types::{Attributes, ItemDraft, Record};
use chrono::NaiveDate;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const BATCH_SIZE: &str = "F";
const OFFLINE_BATCH_NOTES: &str = "Offline batch import";
const FOLDER_SCAN_NOTES: &str = "Folder scan import";

/// Keys that may hold the entry array in an object-shaped batch response
const BATCH_ARRAY_KEYS: &[&str] = &["items", "data", "list"];

/// Everything the pipeline needs besides the store, owned by the caller
#[derive(Debug, Clone)]
pub struct IngestContext {
    /// Permanent image directory assets are copied into
    pub images_dir: PathBuf,
    pub base_currency: String,
    /// Date used for new ids and `purchase_date`
    pub today: NaiveDate,
    pub resolver: AssetResolver,
}

impl IngestContext {
    pub fn new(
        images_dir: impl Into<PathBuf>,
        base_currency: impl Into<String>,
        today: NaiveDate,
    ) -> Self {
        Self {
            images_dir: images_dir.into(),
            base_currency: base_currency.into(),
            today,
            resolver: AssetResolver::new(),
        }
    }
}

/// A batch entry that was not ingested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub filename: String,
    pub reason: String,
}

/// Outcome of a batch run; partial success is normal
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub attempted: usize,
    pub ingested: Vec<String>,
    pub skipped: Vec<SkippedEntry>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.ingested.len()
    }

    fn skip(&mut self, filename: impl Into<String>, reason: impl Into<String>) {
        let entry = SkippedEntry {
            filename: filename.into(),
            reason: reason.into(),
        };
        warn!("Skipping {}: {}", entry.filename, entry.reason);
        self.skipped.push(entry);
    }
}

/// Parse a single-item analysis: `{"ok", "message", "data": {...}}`
pub fn parse_item_response(raw: &str) -> Result<Attributes> {
    let extraction = extract_json(raw)?;
    debug!("Item response parsed via {:?}", extraction.method);
    let json = extraction.json;

    if json.get("ok").and_then(Value::as_bool) == Some(false) {
        let message = json
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no reason given")
            .to_string();
        return Err(WardrobeError::ModelDeclined(message));
    }

    match json.get("data") {
        Some(data @ Value::Object(_)) => Ok(Attributes::from_value(data)),
        _ => Err(WardrobeError::SchemaMismatch { expected: "data" }),
    }
}

/// Entry array of a batch response: a bare array, or one nested under
/// `items`, `data` or `list`
pub fn batch_entries(json: Value) -> Result<Vec<Value>> {
    match json {
        Value::Array(entries) => Ok(entries),
        Value::Object(mut map) => BATCH_ARRAY_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(entries)) => Some(entries),
                _ => None,
            })
            .ok_or(WardrobeError::SchemaMismatch { expected: "items" }),
        _ => Err(WardrobeError::SchemaMismatch { expected: "items" }),
    }
}

/// Turns AI responses into store mutations
pub struct IngestionPipeline<'a> {
    store: &'a mut RecordStore,
    ctx: IngestContext,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(store: &'a mut RecordStore, ctx: IngestContext) -> Self {
        Self { store, ctx }
    }

    // -------------------------------------------------------------------------
    // Single item
    // -------------------------------------------------------------------------

    /// Store one analysed item; `image` is the operator's chosen file.
    /// Returns the new id.
    pub fn ingest_single(
        &mut self,
        response: &str,
        draft: ItemDraft,
        image: Option<&Path>,
    ) -> Result<String> {
        let attributes = parse_item_response(response)?;
        let id = self
            .store
            .generate_id_on(attributes.type_or_unknown(), self.ctx.today);

        let asset_path = match image {
            Some(src) => match self.copy_asset(src, &id) {
                Ok(dest) => dest.to_string_lossy().into_owned(),
                Err(e) => {
                    warn!(
                        "Failed to copy {} into {}: {}; keeping original path",
                        src.display(),
                        self.ctx.images_dir.display(),
                        e
                    );
                    src.to_string_lossy().into_owned()
                }
            },
            None => String::new(),
        };

        let name = if draft.name.trim().is_empty() {
            attributes.type_or_unknown().to_string()
        } else {
            draft.name
        };

        let mut record = Record::new(id.clone(), name);
        record.size = draft.size;
        record.monetary_amount = draft.price;
        record.currency = draft
            .currency
            .unwrap_or_else(|| self.ctx.base_currency.clone());
        record.wear_count = draft.wear_count;
        record.user_notes = draft.notes;
        record.asset_path = asset_path;
        record.created_at = Some(self.ctx.today);
        record.attributes = attributes;

        self.store.add(record)?;
        info!("Ingested {}", id);
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Batch
    // -------------------------------------------------------------------------

    /// Reconcile a batch response against the images in `source_dir`
    pub fn ingest_batch(&mut self, response: &str, source_dir: &Path) -> Result<BatchReport> {
        let extraction = extract_json(response)?;
        debug!("Batch response parsed via {:?}", extraction.method);
        let entries = batch_entries(extraction.json)?;
        let mut report = BatchReport {
            attempted: entries.len(),
            ..Default::default()
        };
        let mut pending = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            let filename = entry.get("filename").and_then(Value::as_str);
            let data = entry
                .get("data")
                .filter(|d| d.as_object().is_some_and(|m| !m.is_empty()));
            let (filename, data) = match (filename, data) {
                (Some(f), Some(d)) => (f, d),
                _ => {
                    let label = filename
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("entry #{}", index + 1));
                    report.skip(label, "invalid entry: needs `filename` and non-empty `data`");
                    continue;
                }
            };

            let resolved = match self.ctx.resolver.resolve(filename, source_dir) {
                Ok(resolved) => resolved,
                Err(e) => {
                    report.skip(filename, e.to_string());
                    continue;
                }
            };
            debug!("{} -> {} ({:?})", filename, resolved.file_name(), resolved.method);

            let attributes = Attributes::from_value(data);
            match self.stage(&resolved.path, attributes, OFFLINE_BATCH_NOTES, &pending) {
                Ok(record) => pending.push(record),
                Err(reason) => report.skip(filename, reason),
            }
        }

        self.commit(pending, &mut report)?;
        Ok(report)
    }

    /// Analyse every image in `dir` through `generator`, one call per image
    pub fn ingest_folder(
        &mut self,
        dir: &Path,
        generator: &dyn TextGenerator,
        profile: &UserProfile,
    ) -> Result<BatchReport> {
        let images = self.scan_images(dir)?;
        let mut report = BatchReport {
            attempted: images.len(),
            ..Default::default()
        };
        let mut pending = Vec::new();

        for image in images {
            let label = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let asset = self.ctx.resolver.nobg_sibling(&image).unwrap_or(image);

            let draft = ItemDraft {
                name: display_name(&self.ctx.resolver, &asset),
                ..Default::default()
            };
            let prompt = build_add_item_prompt(profile, &draft);

            let Some(text) = generator.generate(&prompt, Some(&asset)) else {
                report.skip(label, "no response from generator");
                continue;
            };

            let attributes = match parse_item_response(&text) {
                Ok(attributes) => attributes,
                Err(e) => {
                    report.skip(label, e.to_string());
                    continue;
                }
            };

            match self.stage(&asset, attributes, FOLDER_SCAN_NOTES, &pending) {
                Ok(record) => pending.push(record),
                Err(reason) => report.skip(label, reason),
            }
        }

        self.commit(pending, &mut report)?;
        Ok(report)
    }

    /// Top-level images in `dir` that are not background-removed variants
    fn scan_images(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(WardrobeError::persistence(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let images = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let name = e.file_name().to_string_lossy();
                self.ctx.resolver.is_image(&name) && !self.ctx.resolver.has_marker(&name)
            })
            .map(|e| e.into_path())
            .collect();
        Ok(images)
    }

    /// Mint an id, copy the asset and build the record; nothing is stored yet
    fn stage(
        &self,
        asset: &Path,
        attributes: Attributes,
        notes: &str,
        pending: &[Record],
    ) -> std::result::Result<Record, String> {
        let existing = self
            .store
            .records()
            .iter()
            .chain(pending)
            .map(|r| r.id.as_str());
        let id = ids::next_id(attributes.type_or_unknown(), self.ctx.today, existing);

        let dest = self
            .copy_asset(asset, &id)
            .map_err(|e| format!("failed to copy {}: {}", asset.display(), e))?;

        let mut record = Record::new(id, display_name(&self.ctx.resolver, asset));
        record.size = Some(BATCH_SIZE.to_string());
        record.currency = self.ctx.base_currency.clone();
        record.user_notes = Some(notes.to_string());
        record.asset_path = dest.to_string_lossy().into_owned();
        record.created_at = Some(self.ctx.today);
        record.attributes = attributes;
        Ok(record)
    }

    /// Store staged records with one save
    fn commit(&mut self, pending: Vec<Record>, report: &mut BatchReport) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }
        let new_ids: Vec<String> = pending.iter().map(|r| r.id.clone()).collect();
        self.store.extend(pending)?;
        info!(
            "Batch ingested {} of {} entries",
            new_ids.len(),
            report.attempted
        );
        report.ingested = new_ids;
        Ok(())
    }

    /// Copy `src` to `{images_dir}/{safe id}{.ext}`
    fn copy_asset(&self, src: &Path, id: &str) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.ctx.images_dir)?;
        let ext = src
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let dest = self
            .ctx
            .images_dir
            .join(format!("{}{}", ids::file_safe(id), ext));
        fs::copy(src, &dest)?;
        Ok(dest)
    }
}

/// File stem with the background-removal marker dropped
fn display_name(resolver: &AssetResolver, path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    resolver.strip_marker(&stem)
}
