use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

pub const DEFAULT_CURRENCY: &str = "TWD";

// =============================================================================
// Status
// =============================================================================

/// Where an item currently is. Unknown strings from older files are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    #[default]
    Available,
    Laundry,
    Lent,
    Repair,
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Available => "available",
            Status::Laundry => "laundry",
            Status::Lent => "lent",
            Status::Repair => "repair",
            Status::Other(s) => s,
        }
    }

    /// Parse one of the four known statuses, rejecting anything else
    pub fn parse_known(s: &str) -> Option<Self> {
        match Status::from(s.trim().to_lowercase()) {
            Status::Other(_) => None,
            status => Some(status),
        }
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        match s.as_str() {
            "available" => Status::Available,
            "laundry" => Status::Laundry,
            "lent" => Status::Lent,
            "repair" => Status::Repair,
            _ => Status::Other(s),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Attributes
// =============================================================================

/// AI analysis of an item. Known keys are typed; anything else, including a
/// known key with an unexpected shape, stays in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Attributes {
    pub item_type: Option<String>,
    pub color: Option<String>,
    pub style_tags: Option<Vec<String>>,
    pub seasons: Option<Vec<String>>,
    pub occasions: Option<Vec<String>>,
    pub length_desc: Option<String>,
    pub body_effect: Option<String>,
    pub notes: Option<String>,
    pub extra: Map<String, Value>,
}

const KEY_TYPE: &str = "type";
const KEY_COLOR: &str = "color";
const KEY_STYLE_TAGS: &str = "styleTags";
const KEY_SEASONS: &str = "seasons";
const KEY_OCCASIONS: &str = "occasions";
const KEY_LENGTH_DESC: &str = "lengthDesc";
const KEY_BODY_EFFECT: &str = "bodyEffect";
const KEY_NOTES: &str = "notes";

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(_)) => match map.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}

fn take_string_list(map: &mut Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let all_strings = match map.get(key) {
        Some(Value::Array(items)) => items.iter().all(Value::is_string),
        _ => false,
    };
    if !all_strings {
        return None;
    }
    match map.remove(key) {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

impl From<Map<String, Value>> for Attributes {
    fn from(mut map: Map<String, Value>) -> Self {
        Self {
            item_type: take_string(&mut map, KEY_TYPE),
            color: take_string(&mut map, KEY_COLOR),
            style_tags: take_string_list(&mut map, KEY_STYLE_TAGS),
            seasons: take_string_list(&mut map, KEY_SEASONS),
            occasions: take_string_list(&mut map, KEY_OCCASIONS),
            length_desc: take_string(&mut map, KEY_LENGTH_DESC),
            body_effect: take_string(&mut map, KEY_BODY_EFFECT),
            notes: take_string(&mut map, KEY_NOTES),
            extra: map,
        }
    }
}

impl From<Attributes> for Map<String, Value> {
    fn from(attrs: Attributes) -> Self {
        let mut map = Map::new();
        let strings = [
            (KEY_TYPE, attrs.item_type),
            (KEY_COLOR, attrs.color),
        ];
        for (key, value) in strings {
            if let Some(v) = value {
                map.insert(key.to_string(), Value::String(v));
            }
        }
        let lists = [
            (KEY_STYLE_TAGS, attrs.style_tags),
            (KEY_SEASONS, attrs.seasons),
            (KEY_OCCASIONS, attrs.occasions),
        ];
        for (key, value) in lists {
            if let Some(v) = value {
                map.insert(
                    key.to_string(),
                    Value::Array(v.into_iter().map(Value::String).collect()),
                );
            }
        }
        let texts = [
            (KEY_LENGTH_DESC, attrs.length_desc),
            (KEY_BODY_EFFECT, attrs.body_effect),
            (KEY_NOTES, attrs.notes),
        ];
        for (key, value) in texts {
            if let Some(v) = value {
                map.insert(key.to_string(), Value::String(v));
            }
        }
        for (key, value) in attrs.extra {
            map.insert(key, value);
        }
        map
    }
}

impl Attributes {
    /// Build from an arbitrary JSON value; non-objects yield empty attributes
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from(map.clone()),
            _ => Self::default(),
        }
    }

    /// Item type, or `unknown` when the AI did not provide one
    pub fn type_or_unknown(&self) -> &str {
        self.item_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("unknown")
    }

    /// Merge another attribute set in, key by key
    pub fn merge(&mut self, other: Attributes) {
        fn set<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        set(&mut self.item_type, other.item_type);
        set(&mut self.color, other.color);
        set(&mut self.style_tags, other.style_tags);
        set(&mut self.seasons, other.seasons);
        set(&mut self.occasions, other.occasions);
        set(&mut self.length_desc, other.length_desc);
        set(&mut self.body_effect, other.body_effect);
        set(&mut self.notes, other.notes);
        for (key, value) in other.extra {
            self.extra.insert(key, value);
        }
    }
}

// =============================================================================
// Record
// =============================================================================

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// A wardrobe item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct Record {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(rename = "price")]
    pub monetary_amount: f64,
    pub currency: String,
    pub wear_count: u32,
    #[serde(rename = "image_path")]
    pub asset_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_notes: Option<String>,
    pub status: Status,
    #[serde(rename = "purchase_date", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDate>,
    #[serde(rename = "ai")]
    pub attributes: Attributes,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// On-disk shape of a record. Dates and AI data written by hand or by
/// older versions are taken loosely so one odd record cannot sink the store.
#[derive(Deserialize)]
struct StoredRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(rename = "price", default)]
    monetary_amount: f64,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default)]
    wear_count: u32,
    #[serde(rename = "image_path", default)]
    asset_path: String,
    #[serde(default)]
    user_notes: Option<String>,
    #[serde(default)]
    status: Status,
    #[serde(rename = "purchase_date", default)]
    created_at: Option<Value>,
    #[serde(rename = "ai", default)]
    attributes: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<StoredRecord> for Record {
    fn from(stored: StoredRecord) -> Self {
        let mut extra = stored.extra;

        let created_at = match stored.created_at {
            Some(Value::String(raw)) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    // kept verbatim so the next save writes it back
                    extra.insert(KEY_PURCHASE_DATE.to_string(), Value::String(raw));
                    None
                }
            },
            Some(Value::Null) | None => None,
            Some(other) => {
                extra.insert(KEY_PURCHASE_DATE.to_string(), other);
                None
            }
        };

        let attributes = match stored.attributes {
            Some(Value::Object(map)) => Attributes::from(map),
            Some(Value::Null) | None => Attributes::default(),
            Some(other) => {
                warn!("Dropping non-object AI data on {}: {}", stored.id, other);
                Attributes::default()
            }
        };

        Self {
            id: stored.id,
            name: stored.name,
            size: stored.size,
            monetary_amount: stored.monetary_amount,
            currency: stored.currency,
            wear_count: stored.wear_count,
            asset_path: stored.asset_path,
            user_notes: stored.user_notes,
            status: stored.status,
            created_at,
            attributes,
            extra,
        }
    }
}

const KEY_PURCHASE_DATE: &str = "purchase_date";

impl Record {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size: None,
            monetary_amount: 0.0,
            currency: default_currency(),
            wear_count: 0,
            asset_path: String::new(),
            user_notes: None,
            status: Status::Available,
            created_at: None,
            attributes: Attributes::default(),
            extra: Map::new(),
        }
    }

    /// Display category derived from the AI type
    pub fn category(&self) -> String {
        categorize(self.attributes.item_type.as_deref().unwrap_or(""))
    }

    /// Apply a partial update; attributes are merged rather than replaced
    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(size) = patch.size {
            self.size = Some(size);
        }
        if let Some(amount) = patch.monetary_amount {
            self.monetary_amount = amount;
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        if let Some(wear_count) = patch.wear_count {
            self.wear_count = wear_count;
        }
        if let Some(asset_path) = patch.asset_path {
            self.asset_path = asset_path;
        }
        if let Some(notes) = patch.user_notes {
            self.user_notes = Some(notes);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(attributes) = patch.attributes {
            self.attributes.merge(attributes);
        }
    }
}

/// Partial update for a record; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub size: Option<String>,
    pub monetary_amount: Option<f64>,
    pub currency: Option<String>,
    pub wear_count: Option<u32>,
    pub asset_path: Option<String>,
    pub user_notes: Option<String>,
    pub status: Option<Status>,
    pub attributes: Option<Attributes>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.size.is_none()
            && self.monetary_amount.is_none()
            && self.currency.is_none()
            && self.wear_count.is_none()
            && self.asset_path.is_none()
            && self.user_notes.is_none()
            && self.status.is_none()
            && self.attributes.is_none()
    }
}

/// Operator-supplied fields for a new item
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub name: String,
    pub size: Option<String>,
    pub price: f64,
    pub currency: Option<String>,
    pub wear_count: u32,
    pub notes: Option<String>,
}

// =============================================================================
// Categories
// =============================================================================

const CATEGORY_RULES: &[(&str, &[&str])] = &[
    ("Bottoms", &["褲", "裙", "bottom", "skirt", "pants", "jeans"]),
    ("Dresses", &["洋裝", "連身", "dress"]),
    (
        "Outerwear",
        &["外套", "大衣", "夾克", "西裝", "風衣", "coat", "jacket", "blazer"],
    ),
    (
        "Shoes",
        &["鞋", "靴", "shoe", "boot", "sneaker", "sandal", "heel"],
    ),
    (
        "Accessories",
        &[
            "包", "帽", "巾", "飾", "鍊", "環", "帶", "鏡", "錶", "bag", "hat", "scarf",
            "accessory", "necklace", "earring", "ring", "belt", "glasses", "watch",
        ],
    ),
    (
        "Underwear",
        &[
            "內衣", "胸罩", "內褲", "bra", "underwear", "lingerie", "panties", "briefs",
            "boxers",
        ],
    ),
    (
        "Tops",
        &[
            "上衣", "t-shirt", "shirt", "blouse", "top", "polo", "vest", "sweater", "hoodie",
        ],
    ),
];

/// Map an AI item type to a display category
pub fn categorize(item_type: &str) -> String {
    let lowered = item_type.to_lowercase();
    for (category, keywords) in CATEGORY_RULES {
        if keywords.iter().any(|k| lowered.contains(k)) {
            return category.to_string();
        }
    }

    let trimmed = item_type.trim();
    if trimmed.is_empty() {
        return "Uncategorized".to_string();
    }
    title_case(trimmed)
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Stats
// =============================================================================

/// One row of the cost-per-wear ranking
#[derive(Debug, Clone)]
pub struct CostPerWear {
    pub id: String,
    pub name: String,
    pub price_display: String,
    pub wear_count: u32,
    pub cost_per_wear: f64,
}

/// Statistics about the wardrobe
#[derive(Debug, Clone, Default)]
pub struct WardrobeStats {
    pub currency: String,
    pub total_items: usize,
    pub total_value: f64,
    pub avg_price: f64,
    pub by_category: Vec<(String, usize)>,
    pub by_status: Vec<(String, usize)>,
    pub best_cost_per_wear: Vec<CostPerWear>,
    /// Some conversion fell back to a default rate
    pub approximate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_round_trip_keeps_unknown_values() {
        let status: Status = serde_json::from_value(json!("donated")).unwrap();
        assert_eq!(status, Status::Other("donated".to_string()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("donated"));

        let status: Status = serde_json::from_value(json!("laundry")).unwrap();
        assert_eq!(status, Status::Laundry);
    }

    #[test]
    fn test_parse_known_status() {
        assert_eq!(Status::parse_known(" Lent "), Some(Status::Lent));
        assert_eq!(Status::parse_known("donated"), None);
    }

    #[test]
    fn test_attributes_keep_unexpected_shapes() {
        let raw = json!({
            "type": "coat",
            "seasons": "winter",
            "styleTags": ["warm", "classic"],
            "fabric": {"wool": 80}
        });
        let attrs: Attributes = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(attrs.item_type.as_deref(), Some("coat"));
        assert_eq!(attrs.style_tags, Some(vec!["warm".to_string(), "classic".to_string()]));
        assert!(attrs.seasons.is_none());
        assert_eq!(attrs.extra.get("seasons"), Some(&json!("winter")));

        let back = serde_json::to_value(&attrs).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_attributes_merge() {
        let mut base = Attributes::from_value(&json!({"type": "coat", "color": "navy", "x": 1}));
        base.merge(Attributes::from_value(&json!({"color": "black", "y": 2})));
        assert_eq!(base.item_type.as_deref(), Some("coat"));
        assert_eq!(base.color.as_deref(), Some("black"));
        assert_eq!(base.extra.get("x"), Some(&json!(1)));
        assert_eq!(base.extra.get("y"), Some(&json!(2)));
    }

    #[test]
    fn test_record_defaults_for_missing_fields() {
        let record: Record = serde_json::from_value(json!({"id": "coat_20250101_001"})).unwrap();
        assert_eq!(record.status, Status::Available);
        assert_eq!(record.currency, "TWD");
        assert_eq!(record.wear_count, 0);
        assert!(record.asset_path.is_empty());
        assert!(record.created_at.is_none());
    }

    #[test]
    fn test_record_preserves_unknown_top_level_fields() {
        let raw = json!({
            "id": "x_20250101_001",
            "name": "Scarf",
            "brand": "Acme",
            "ai": {"type": "scarf"}
        });
        let record: Record = serde_json::from_value(raw).unwrap();
        assert_eq!(record.extra.get("brand"), Some(&json!("Acme")));
        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["brand"], json!("Acme"));
    }

    #[test]
    fn test_record_with_blank_or_free_text_date() {
        let record: Record = serde_json::from_value(json!({
            "id": "coat_20250101_001",
            "purchase_date": ""
        }))
        .unwrap();
        assert!(record.created_at.is_none());
        assert_eq!(record.extra.get("purchase_date"), Some(&json!("")));

        let record: Record = serde_json::from_value(json!({
            "id": "coat_20250101_002",
            "purchase_date": "last spring"
        }))
        .unwrap();
        assert!(record.created_at.is_none());
        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["purchase_date"], json!("last spring"));

        let record: Record = serde_json::from_value(json!({
            "id": "coat_20250101_003",
            "purchase_date": "2024-11-02"
        }))
        .unwrap();
        assert_eq!(record.created_at, NaiveDate::from_ymd_opt(2024, 11, 2));
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_record_with_null_ai_data() {
        let record: Record = serde_json::from_value(json!({
            "id": "coat_20250101_001",
            "name": "Trench",
            "ai": null
        }))
        .unwrap();
        assert_eq!(record.attributes, Attributes::default());
        assert_eq!(record.category(), "Uncategorized");
        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["ai"], json!({}));
    }

    #[test]
    fn test_categorize() {
        assert_eq!(categorize("Wool Coat"), "Outerwear");
        assert_eq!(categorize("牛仔褲"), "Bottoms");
        assert_eq!(categorize("Linen Shirt"), "Tops");
        assert_eq!(categorize("kimono robe"), "Kimono Robe");
        assert_eq!(categorize(""), "Uncategorized");
    }

    #[test]
    fn test_apply_patch() {
        let mut record = Record::new("coat_20250101_001", "Coat");
        record.attributes = Attributes::from_value(&json!({"type": "coat"}));
        record.apply(RecordPatch {
            wear_count: Some(3),
            status: Some(Status::Laundry),
            attributes: Some(Attributes::from_value(&json!({"color": "red"}))),
            ..Default::default()
        });
        assert_eq!(record.wear_count, 3);
        assert_eq!(record.status, Status::Laundry);
        assert_eq!(record.attributes.item_type.as_deref(), Some("coat"));
        assert_eq!(record.attributes.color.as_deref(), Some("red"));
    }
}
