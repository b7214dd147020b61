pub mod config;
pub mod ingest;
pub mod items;
pub mod ootd;
pub mod rates;

use crate::wardrobe::Wardrobe;
use std::fs;
use std::io::{self, Read, Write};

/// Read an AI response from a file, or from stdin when `source` is `-`
pub fn read_response(source: &str) -> Result<String, String> {
    let text = if source == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        buf
    } else {
        fs::read_to_string(source).map_err(|e| format!("Failed to read {}: {}", source, e))?
    };

    if text.trim().is_empty() {
        return Err("Response is empty".to_string());
    }
    Ok(text)
}

/// Ask a yes/no question on stdin
pub fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    io::stdout().flush().ok();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    input.trim().eq_ignore_ascii_case("y")
}

/// Open the wardrobe and print any load warning
pub fn open_wardrobe() -> Result<Wardrobe, String> {
    let wardrobe = Wardrobe::open()?;
    if let Some(warning) = wardrobe.load_warning() {
        eprintln!("Warning: {}", warning);
    }
    Ok(wardrobe)
}

/// Print a warning if the last save skipped its backup
pub fn report_save(wardrobe: &Wardrobe) {
    if let Some(warning) = wardrobe.save_warning() {
        eprintln!("Warning: {}", warning);
    }
}

/// Split a comma-separated list, dropping empty parts
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" work, ,date,"), vec!["work", "date"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_read_response_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reply.txt");
        fs::write(&path, "{\"ok\": true}").unwrap();
        assert_eq!(read_response(path.to_str().unwrap()).unwrap(), "{\"ok\": true}");

        fs::write(&path, "  \n").unwrap();
        assert!(read_response(path.to_str().unwrap()).is_err());
        assert!(read_response(dir.path().join("missing").to_str().unwrap()).is_err());
    }
}
