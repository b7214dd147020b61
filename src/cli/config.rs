use super::open_wardrobe;
use crate::config::{get_global_config, set_global_config, KNOWN_KEYS};

/// Run the config command
pub fn run_config(key: Option<&str>, value: Option<&str>, global: bool) -> Result<(), String> {
    if global {
        return run_global_config(key, value);
    }

    let mut wardrobe = open_wardrobe()?;

    match (key, value) {
        (None, None) => {
            // Show current config
            println!("Current configuration:\n");
            let config = wardrobe.config();
            println!("  base_currency: {}", config.base_currency());
            println!("  images_dir: {}", config.images_dir().display());
            match config.generator_command() {
                Some(cmd) => println!("  generator_command: {}", cmd),
                None => println!("  generator_command: (not set)"),
            }

            println!("\nKeys:");
            for (k, description) in KNOWN_KEYS {
                println!("  {:18} {}", k, description);
            }
        }
        (Some(k), None) => {
            if let Some(v) = wardrobe.config().get(k) {
                println!("{}: {}", k, v);
            } else {
                println!("{}: (not set)", k);
            }
        }
        (Some(k), Some(v)) => {
            if !KNOWN_KEYS.iter().any(|(known, _)| *known == k) {
                eprintln!("Note: {} is not a key wardrobe reads", k);
            }
            wardrobe
                .config_mut()
                .set(k, v)
                .map_err(|e| format!("Failed to save: {}", e))?;
            println!("Set {} = {}", k, v);
        }
        (None, Some(_)) => {
            return Err("Key required when setting a value".to_string());
        }
    }

    Ok(())
}

fn run_global_config(key: Option<&str>, value: Option<&str>) -> Result<(), String> {
    match (key, value) {
        (None, None) => {
            let config = get_global_config();
            if config.is_empty() {
                println!("No global configuration.");
            }
            let mut entries: Vec<_> = config.into_iter().collect();
            entries.sort();
            for (k, v) in entries {
                println!("  {}: {}", k, v);
            }
        }
        (Some(k), None) => match get_global_config().get(k) {
            Some(v) => println!("{}: {}", k, v),
            None => println!("{}: (not set)", k),
        },
        (Some(k), Some(v)) => {
            set_global_config(k, v).map_err(|e| format!("Failed to save: {}", e))?;
            println!("Set global {} = {}", k, v);
        }
        (None, Some(_)) => {
            return Err("Key required when setting a value".to_string());
        }
    }

    Ok(())
}

/// Run the profile command
pub fn run_profile(key: Option<&str>, value: Option<&str>) -> Result<(), String> {
    let wardrobe = open_wardrobe()?;
    let mut profile = wardrobe.profile();

    match (key, value) {
        (None, None) => println!("{}", profile.to_prompt_json()),
        (Some(k), None) => {
            let json = serde_json::to_value(&profile)
                .map_err(|e| format!("Failed to serialize: {}", e))?;
            let found = k
                .split('.')
                .try_fold(&json, |node, part| node.get(part));
            match found {
                Some(v) => println!("{}: {}", k, v),
                None => println!("{}: (not set)", k),
            }
        }
        (Some(k), Some(v)) => {
            profile.set_field(k, v)?;
            wardrobe.save_profile(&profile)?;
            println!("Set {} = {}", k, v);
        }
        (None, Some(_)) => {
            return Err("Key required when setting a value".to_string());
        }
    }

    Ok(())
}
