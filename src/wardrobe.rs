use crate::config::{find_wardrobe_path, WardrobeConfig, DATA_DIR_NAME};
use crate::currency::{Conversion, CurrencyConverter, RateSource};
use crate::generator::TextGenerator;
use crate::ingest::{BatchReport, IngestContext, IngestionPipeline};
use crate::ootd::{parse_outfits, OotdEntry, OotdLog, Outfit};
use crate::profile::UserProfile;
use crate::resolve::AssetResolver;
use crate::store::{LoadStatus, RecordStore, SaveOutcome};
use crate::types::{categorize, CostPerWear, ItemDraft, Record, RecordPatch, Status, WardrobeStats};
use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const STORE_FILE: &str = "wardrobe.json";
const OOTD_LOG_FILE: &str = "ootd_log.json";
const PROFILE_FILE: &str = "user_profile.json";
const RATES_FILE: &str = "rates.json";
const BODY_PHOTO_STEM: &str = "user_body";
const RECOVERED_NOTES: &str = "Recovered from image file";
const CPW_TOP: usize = 10;

/// The main wardrobe interface
pub struct Wardrobe {
    data_path: PathBuf,
    config: WardrobeConfig,
    store: RecordStore,
    rates: CurrencyConverter,
}

impl Wardrobe {
    /// Open an existing wardrobe
    pub fn open() -> Result<Self, String> {
        let data_path =
            find_wardrobe_path().ok_or("No .wardrobe directory found. Run 'wardrobe init' first.")?;
        Self::open_at(data_path)
    }

    /// Open a wardrobe at a specific data directory
    pub fn open_at(data_path: PathBuf) -> Result<Self, String> {
        if !data_path.exists() {
            return Err(format!("Path does not exist: {}", data_path.display()));
        }

        let store = RecordStore::open(data_path.join(STORE_FILE))
            .map_err(|e| format!("Failed to open store: {}", e))?;
        let config = WardrobeConfig::new(data_path.clone());
        let rates = CurrencyConverter::load_cached(&data_path.join(RATES_FILE));
        if let LoadStatus::Loaded(n) = store.load_status() {
            debug!("Loaded {} items from {}", n, store.path().display());
        }

        Ok(Self {
            data_path,
            config,
            store,
            rates,
        })
    }

    /// Initialize a new wardrobe under `path`
    pub fn init(path: &Path) -> Result<Self, String> {
        let data_path = path.join(DATA_DIR_NAME);
        fs::create_dir_all(&data_path)
            .map_err(|e| format!("Failed to create {} directory: {}", DATA_DIR_NAME, e))?;

        let wardrobe = Self::open_at(data_path)?;
        fs::create_dir_all(wardrobe.images_dir())
            .map_err(|e| format!("Failed to create image directory: {}", e))?;

        let profile_path = wardrobe.data_path.join(PROFILE_FILE);
        if !profile_path.exists() {
            UserProfile::default()
                .save(&profile_path)
                .map_err(|e| format!("Failed to write profile: {}", e))?;
        }
        Ok(wardrobe)
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn config(&self) -> &WardrobeConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut WardrobeConfig {
        &mut self.config
    }

    pub fn images_dir(&self) -> PathBuf {
        self.config.images_dir()
    }

    pub fn base_currency(&self) -> String {
        self.config.base_currency()
    }

    /// Warning to show when the store file could not be read
    pub fn load_warning(&self) -> Option<String> {
        match self.store.load_status() {
            LoadStatus::Corrupt(e) => Some(format!(
                "{}. Starting empty; the file is untouched until the next change.",
                e
            )),
            LoadStatus::RecoveredFromTemp(n) => Some(format!(
                "Recovered {} items from an interrupted save.",
                n
            )),
            _ => None,
        }
    }

    /// Warning to show when the last save could not back up the old file
    pub fn save_warning(&self) -> Option<String> {
        match self.store.last_save() {
            Some(SaveOutcome::SavedWithoutBackup { reason }) => {
                Some(format!("Saved without backup: {}", reason))
            }
            _ => None,
        }
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    fn pipeline(&mut self) -> IngestionPipeline<'_> {
        let ctx = IngestContext::new(
            self.config.images_dir(),
            self.config.base_currency(),
            Local::now().date_naive(),
        );
        IngestionPipeline::new(&mut self.store, ctx)
    }

    /// Store a single analysed item
    pub fn add_from_response(
        &mut self,
        response: &str,
        draft: ItemDraft,
        image: Option<&Path>,
    ) -> Result<String, String> {
        self.pipeline()
            .ingest_single(response, draft, image)
            .map_err(|e| format!("Failed to add item: {}", e))
    }

    /// Reconcile an offline batch response against `source_dir`
    pub fn import_batch(&mut self, response: &str, source_dir: &Path) -> Result<BatchReport, String> {
        self.pipeline()
            .ingest_batch(response, source_dir)
            .map_err(|e| format!("Failed to import batch: {}", e))
    }

    /// Analyse every image in `dir` through `generator`
    pub fn scan_folder(
        &mut self,
        dir: &Path,
        generator: &dyn TextGenerator,
    ) -> Result<BatchReport, String> {
        let profile = self.profile();
        self.pipeline()
            .ingest_folder(dir, generator, &profile)
            .map_err(|e| format!("Failed to scan folder: {}", e))
    }

    // =========================================================================
    // Core operations
    // =========================================================================

    pub fn records(&self) -> &[Record] {
        self.store.records()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.store.get(id)
    }

    /// Items filtered by display category and status
    pub fn list(&self, category: Option<&str>, status: Option<&Status>) -> Vec<&Record> {
        self.store
            .records()
            .iter()
            .filter(|r| category.map_or(true, |c| matches_category(r, c)))
            .filter(|r| status.map_or(true, |s| &r.status == s))
            .collect()
    }

    pub fn update(&mut self, id: &str, patch: RecordPatch) -> Result<bool, String> {
        self.store
            .update(id, patch)
            .map_err(|e| format!("Failed to update item: {}", e))
    }

    pub fn set_status(&mut self, id: &str, status: Status) -> Result<bool, String> {
        self.store
            .set_status(id, status)
            .map_err(|e| format!("Failed to update status: {}", e))
    }

    pub fn record_wear(&mut self, id: &str) -> Result<Option<u32>, String> {
        self.store
            .record_wear(id)
            .map_err(|e| format!("Failed to record wear: {}", e))
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, String> {
        self.store
            .delete(id)
            .map_err(|e| format!("Failed to delete item: {}", e))
    }

    // =========================================================================
    // Currency and stats
    // =========================================================================

    pub fn rates(&self) -> &CurrencyConverter {
        &self.rates
    }

    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Conversion {
        self.rates
            .convert(amount, &from.to_uppercase(), &to.to_uppercase())
    }

    /// Refresh rates from `source` and cache them; `false` if nothing changed
    pub fn refresh_rates(&mut self, source: &dyn RateSource) -> Result<bool, String> {
        if !self.rates.refresh(source) {
            return Ok(false);
        }
        self.rates
            .save_cache(&self.data_path.join(RATES_FILE))
            .map_err(|e| format!("Failed to cache rates: {}", e))?;
        Ok(true)
    }

    /// Statistics with amounts in `currency` (the base currency by default)
    pub fn stats(&self, currency: Option<&str>) -> WardrobeStats {
        let currency = currency
            .map(str::to_uppercase)
            .unwrap_or_else(|| self.base_currency());
        let records = self.store.records();

        let mut total_value = 0.0;
        let mut approximate = false;
        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
        let mut cost_per_wear = Vec::with_capacity(records.len());

        for record in records {
            let converted = self
                .rates
                .convert(record.monetary_amount, &record.currency, &currency);
            approximate |= converted.is_approximate();
            let price = converted.value();
            total_value += price;

            *by_category.entry(record.category()).or_default() += 1;
            *by_status.entry(record.status.to_string()).or_default() += 1;

            let cpw = if record.wear_count == 0 {
                price
            } else {
                price / record.wear_count as f64
            };
            cost_per_wear.push(CostPerWear {
                id: record.id.clone(),
                name: record.name.clone(),
                price_display: format!("{} {}", record.currency, record.monetary_amount),
                wear_count: record.wear_count,
                cost_per_wear: cpw,
            });
        }

        cost_per_wear.sort_by(|a, b| a.cost_per_wear.total_cmp(&b.cost_per_wear));
        cost_per_wear.truncate(CPW_TOP);

        let mut by_category: Vec<_> = by_category.into_iter().collect();
        by_category.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let total_items = records.len();
        WardrobeStats {
            currency,
            total_items,
            total_value,
            avg_price: if total_items > 0 {
                total_value / total_items as f64
            } else {
                0.0
            },
            by_category,
            by_status: by_status.into_iter().collect(),
            best_cost_per_wear: cost_per_wear,
            approximate,
        }
    }

    // =========================================================================
    // Profile and outfits
    // =========================================================================

    pub fn profile_path(&self) -> PathBuf {
        self.data_path.join(PROFILE_FILE)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::load(&self.profile_path())
    }

    pub fn save_profile(&self, profile: &UserProfile) -> Result<(), String> {
        profile
            .save(&self.profile_path())
            .map_err(|e| format!("Failed to save profile: {}", e))
    }

    pub fn ootd_log(&self) -> OotdLog {
        OotdLog::load(self.data_path.join(OOTD_LOG_FILE))
    }

    /// Parse an outfit suggestion and log its first outfit
    pub fn log_outfit(&self, response: &str) -> Result<Option<(Outfit, OotdEntry)>, String> {
        let outfits = parse_outfits(response).map_err(|e| format!("Failed to read outfit: {}", e))?;
        let Some(outfit) = outfits.into_iter().next() else {
            return Ok(None);
        };

        let entry = OotdEntry::from_outfit(&outfit, Local::now().naive_local());
        self.ootd_log()
            .append(entry.clone())
            .map_err(|e| format!("Failed to log outfit: {}", e))?;
        Ok(Some((outfit, entry)))
    }

    // =========================================================================
    // Recovery and export
    // =========================================================================

    /// Rebuild records for images that have no matching item
    pub fn recover_from_images(&mut self) -> Result<Vec<String>, String> {
        self.recover_from_images_on(Local::now().date_naive())
    }

    pub fn recover_from_images_on(&mut self, today: NaiveDate) -> Result<Vec<String>, String> {
        let images_dir = self.images_dir();
        if !images_dir.is_dir() {
            return Err(format!("Image directory not found: {}", images_dir.display()));
        }

        let resolver = AssetResolver::new();
        let mut recovered: Vec<Record> = Vec::new();

        for entry in WalkDir::new(&images_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let file_name = entry.file_name().to_string_lossy();
            if !resolver.is_image(&file_name) {
                continue;
            }
            let Some(stem) = entry.path().file_stem().map(|s| s.to_string_lossy().into_owned())
            else {
                continue;
            };
            if stem == BODY_PHOTO_STEM
                || self.store.get(&stem).is_some()
                || recovered.iter().any(|r| r.id == stem)
            {
                continue;
            }

            let (name, date) = split_id_stem(&stem);
            let mut record = Record::new(stem.clone(), name);
            record.created_at = Some(date.unwrap_or(today));
            record.currency = self.base_currency();
            record.asset_path = entry.path().to_string_lossy().into_owned();
            record.user_notes = Some(RECOVERED_NOTES.to_string());
            info!("Recovered {} from {}", record.id, file_name);
            recovered.push(record);
        }

        let ids: Vec<String> = recovered.iter().map(|r| r.id.clone()).collect();
        if !recovered.is_empty() {
            self.store
                .extend(recovered)
                .map_err(|e| format!("Failed to save recovered items: {}", e))?;
        }
        Ok(ids)
    }

    /// The whole store as pretty JSON
    pub fn export_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self.store.records())
            .map_err(|e| format!("Failed to export: {}", e))
    }

    /// The whole store as a markdown table grouped by category
    pub fn export_markdown(&self) -> String {
        let mut groups: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
        for record in self.store.records() {
            groups.entry(record.category()).or_default().push(record);
        }

        let mut out = String::from("# Wardrobe\n");
        for (category, records) in groups {
            out.push_str(&format!("\n## {} ({})\n\n", category, records.len()));
            out.push_str("| ID | Name | Color | Status | Price | Wears |\n");
            out.push_str("|----|------|-------|--------|-------|-------|\n");
            for r in records {
                out.push_str(&format!(
                    "| {} | {} | {} | {} | {} {} | {} |\n",
                    r.id,
                    r.name,
                    r.attributes.color.as_deref().unwrap_or(""),
                    r.status,
                    r.currency,
                    r.monetary_amount,
                    r.wear_count
                ));
            }
        }
        out
    }
}

/// Split `name_YYYYMMDD_NNN` into the name and its date
fn split_id_stem(stem: &str) -> (String, Option<NaiveDate>) {
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() >= 3 {
        let date_part = parts[parts.len() - 2];
        if date_part.len() == 8 && date_part.chars().all(|c| c.is_ascii_digit()) {
            let name = parts[..parts.len() - 2].join("_");
            return (name, NaiveDate::parse_from_str(date_part, "%Y%m%d").ok());
        }
    }
    (stem.to_string(), None)
}

/// Category keyword filter for listings, accepting either a display
/// category or a raw item type
pub fn matches_category(record: &Record, filter: &str) -> bool {
    record.category().eq_ignore_ascii_case(filter) || categorize(filter) == record.category()
}
