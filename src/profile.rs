use crate::error::Result;
use crate::store::write_atomic;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Body measurements in centimetres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
    pub shoulder_width_cm: f64,
    pub bust_cm: f64,
    pub underbust_cm: f64,
    pub waist_cm: f64,
    pub abdomen_cm: f64,
    pub hip_cm: f64,
    pub thigh_circ_cm: f64,
    pub calf_circ_cm: f64,
    pub ankle_circ_cm: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Measurements {
    fn default() -> Self {
        Self {
            shoulder_width_cm: 0.0,
            bust_cm: 0.0,
            underbust_cm: 0.0,
            waist_cm: 0.0,
            abdomen_cm: 0.0,
            hip_cm: 0.0,
            thigh_circ_cm: 0.0,
            calf_circ_cm: 0.0,
            ankle_circ_cm: 0.0,
            extra: Map::new(),
        }
    }
}

/// The wearer, as described to the AI in every prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub gender_identity: String,
    pub gender_expression: String,
    pub body_shape_notes: String,
    pub measurements: Measurements,
    pub style_preferences: Vec<String>,
    pub style_avoid: Vec<String>,
    pub workplace_rules: String,
    pub climate_notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_photo_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "User".to_string(),
            height_cm: 160.0,
            weight_kg: 50.0,
            gender_identity: "cis_female".to_string(),
            gender_expression: "feminine".to_string(),
            body_shape_notes: String::new(),
            measurements: Measurements::default(),
            style_preferences: Vec::new(),
            style_avoid: Vec::new(),
            workplace_rules: String::new(),
            climate_notes: String::new(),
            body_photo_path: None,
            extra: Map::new(),
        }
    }
}

impl UserProfile {
    /// Load the profile, using the default when missing or unreadable
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()))
        {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Failed to read profile {}: {}; using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())
    }

    /// Pretty JSON for embedding in prompts
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Set a top-level field from a command-line string.
    ///
    /// Numbers stay numbers, list fields take comma-separated values, and
    /// `measurements.<name>` reaches into the measurement table.
    pub fn set_field(&mut self, key: &str, raw: &str) -> std::result::Result<(), String> {
        let mut value = serde_json::to_value(&*self).map_err(|e| e.to_string())?;
        let Value::Object(ref mut root) = value else {
            return Err("Profile is not an object".to_string());
        };

        let (target, field) = match key.split_once('.') {
            Some((parent, child)) => {
                let nested = root
                    .entry(parent.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                match nested {
                    Value::Object(map) => (map, child),
                    _ => return Err(format!("{} is not a group of fields", parent)),
                }
            }
            None => (root, key),
        };

        let parsed = match target.get(field) {
            Some(Value::Number(_)) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("{} expects a number", key))?,
            Some(Value::Array(_)) => Value::Array(
                raw.split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
            _ => Value::String(raw.to_string()),
        };
        target.insert(field.to_string(), parsed);

        *self = serde_json::from_value(value).map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_profile_is_default() {
        let dir = TempDir::new().unwrap();
        let profile = UserProfile::load(&dir.path().join("user_profile.json"));
        assert_eq!(profile, UserProfile::default());
    }

    #[test]
    fn test_partial_profile_fills_defaults_and_keeps_extra() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_profile.json");
        fs::write(&path, r#"{"name": "Mei", "height_cm": 158, "favourite_colour": "green"}"#)
            .unwrap();

        let profile = UserProfile::load(&path);
        assert_eq!(profile.name, "Mei");
        assert_eq!(profile.height_cm, 158.0);
        assert_eq!(profile.gender_expression, "feminine");
        assert_eq!(profile.extra.get("favourite_colour"), Some(&Value::from("green")));

        profile.save(&path).unwrap();
        assert_eq!(UserProfile::load(&path), profile);
    }

    #[test]
    fn test_set_field() {
        let mut profile = UserProfile::default();
        profile.set_field("height_cm", "171").unwrap();
        profile.set_field("style_preferences", "minimal, earthy").unwrap();
        profile.set_field("measurements.waist_cm", "68").unwrap();
        profile.set_field("climate_notes", "humid summers").unwrap();

        assert_eq!(profile.height_cm, 171.0);
        assert_eq!(profile.style_preferences, vec!["minimal", "earthy"]);
        assert_eq!(profile.measurements.waist_cm, 68.0);
        assert_eq!(profile.climate_notes, "humid summers");

        assert!(profile.set_field("weight_kg", "heavy").is_err());
    }
}
