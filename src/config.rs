use crate::types::DEFAULT_CURRENCY;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_DIR_NAME: &str = ".wardrobe";
pub const DEFAULT_IMAGES_DIR: &str = "images";

/// Keys understood by `wardrobe config`
pub static KNOWN_KEYS: &[(&str, &str)] = &[
    ("base_currency", "Currency for new items and statistics"),
    ("images_dir", "Where item images are copied (relative to .wardrobe)"),
    (
        "generator_command",
        "Shell command that answers a prompt on stdin (image path in $WARDROBE_IMAGE)",
    ),
];

// -----------------------------------------------------------------------------
// Global config
// -----------------------------------------------------------------------------

fn global_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("wardrobe")
}

fn global_config_file() -> PathBuf {
    global_config_dir().join("config.yaml")
}

/// Get global config
pub fn get_global_config() -> HashMap<String, String> {
    let path = global_config_file();
    if path.exists() {
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(config) = serde_yaml::from_str::<HashMap<String, String>>(&content) {
                return config;
            }
        }
    }
    HashMap::new()
}

/// Set a global config value
pub fn set_global_config(key: &str, value: &str) -> std::io::Result<()> {
    let dir = global_config_dir();
    fs::create_dir_all(&dir)?;

    let mut config = get_global_config();
    config.insert(key.to_string(), value.to_string());

    let content = serde_yaml::to_string(&config).map_err(std::io::Error::other)?;
    fs::write(global_config_file(), content)
}

// -----------------------------------------------------------------------------
// Per-wardrobe config
// -----------------------------------------------------------------------------

/// Configuration manager for a .wardrobe directory
pub struct WardrobeConfig {
    data_path: PathBuf,
    config_file: PathBuf,
    config: HashMap<String, serde_yaml::Value>,
}

impl WardrobeConfig {
    pub fn new(data_path: PathBuf) -> Self {
        let config_file = data_path.join("_config.yaml");
        let mut instance = Self {
            data_path,
            config_file,
            config: HashMap::new(),
        };
        instance.load();
        instance
    }

    fn load(&mut self) {
        if self.config_file.exists() {
            if let Ok(content) = fs::read_to_string(&self.config_file) {
                match serde_yaml::from_str::<HashMap<String, serde_yaml::Value>>(&content) {
                    Ok(config) => self.config = config,
                    Err(e) => tracing::warn!(
                        "Ignoring unreadable {}: {}",
                        self.config_file.display(),
                        e
                    ),
                }
            }
        }
    }

    fn save(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_path)?;
        let content = serde_yaml::to_string(&self.config).map_err(std::io::Error::other)?;
        fs::write(&self.config_file, content)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).and_then(|v| match v {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            serde_yaml::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn set(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        self.config
            .insert(key.to_string(), serde_yaml::Value::String(value.to_string()));
        self.save()
    }

    /// Currency used for new items and statistics
    pub fn base_currency(&self) -> String {
        self.get("base_currency")
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
    }

    /// Absolute image directory
    pub fn images_dir(&self) -> PathBuf {
        let dir = self
            .get("images_dir")
            .unwrap_or_else(|| DEFAULT_IMAGES_DIR.to_string());
        let dir = Path::new(&dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.data_path.join(dir)
        }
    }

    /// Text-generation command; falls back to the global config
    pub fn generator_command(&self) -> Option<String> {
        self.get("generator_command")
            .or_else(|| get_global_config().get("generator_command").cloned())
            .filter(|c| !c.trim().is_empty())
    }
}

/// Find the .wardrobe directory, searching upward from current directory
pub fn find_wardrobe_path() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(DATA_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }

        if !current.pop() {
            break;
        }
    }

    // Check WARDROBE_PATH environment variable
    if let Ok(path) = std::env::var("WARDROBE_PATH") {
        let candidate = PathBuf::from(path);
        if candidate.is_dir() {
            return Some(candidate);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = WardrobeConfig::new(dir.path().to_path_buf());
        assert_eq!(config.base_currency(), "TWD");
        assert_eq!(config.images_dir(), dir.path().join("images"));
    }

    #[test]
    fn test_set_persists() {
        let dir = TempDir::new().unwrap();
        let mut config = WardrobeConfig::new(dir.path().to_path_buf());
        config.set("base_currency", "usd").unwrap();
        config.set("images_dir", "/srv/closet").unwrap();

        let reloaded = WardrobeConfig::new(dir.path().to_path_buf());
        assert_eq!(reloaded.base_currency(), "USD");
        assert_eq!(reloaded.images_dir(), PathBuf::from("/srv/closet"));
    }

    #[test]
    fn test_unreadable_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_config.yaml"), "- just\n- a list\n").unwrap();
        let config = WardrobeConfig::new(dir.path().to_path_buf());
        assert_eq!(config.base_currency(), "TWD");
    }
}
