use super::{open_wardrobe, read_response, report_save};
use crate::generator::CommandGenerator;
use crate::ingest::BatchReport;
use crate::prompts::{build_add_item_prompt, build_batch_prompt, build_ootd_prompt, OotdContext};
use crate::resolve::AssetResolver;
use crate::types::ItemDraft;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// =============================================================================
// Prompts
// =============================================================================

/// Run `prompt add`
pub fn run_prompt_add(draft: &ItemDraft) -> Result<(), String> {
    let wardrobe = open_wardrobe()?;
    println!("{}", build_add_item_prompt(&wardrobe.profile(), draft));
    Ok(())
}

/// Run `prompt batch`
pub fn run_prompt_batch(dir: &str) -> Result<(), String> {
    let wardrobe = open_wardrobe()?;
    let files = batch_file_names(Path::new(dir))?;
    if files.is_empty() {
        return Err(format!("No images found in {}", dir));
    }

    println!("{}", build_batch_prompt(&files, &wardrobe.profile()));
    eprintln!("\nAttach these {} image(s) to the conversation.", files.len());
    Ok(())
}

/// Run `prompt ootd`
pub fn run_prompt_ootd(context: &OotdContext) -> Result<(), String> {
    let wardrobe = open_wardrobe()?;
    if wardrobe.is_empty() {
        return Err("The wardrobe is empty; add some items first".to_string());
    }
    println!(
        "{}",
        build_ootd_prompt(&wardrobe.profile(), wardrobe.records(), context)
    );
    Ok(())
}

/// Images to upload for a batch: the background-removed variant when one exists
fn batch_file_names(dir: &Path) -> Result<Vec<String>, String> {
    if !dir.is_dir() {
        return Err(format!("Not a directory: {}", dir.display()));
    }

    let resolver = AssetResolver::new();
    let names = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            resolver.is_image(&name) && !resolver.has_marker(&name)
        })
        .map(|e| {
            let path = resolver
                .nobg_sibling(e.path())
                .unwrap_or_else(|| e.path().to_path_buf());
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();
    Ok(names)
}

// =============================================================================
// Ingestion
// =============================================================================

/// Run the add command
pub fn run_add(response: &str, image: Option<&str>, draft: ItemDraft) -> Result<(), String> {
    let mut wardrobe = open_wardrobe()?;
    let text = read_response(response)?;

    let image: Option<PathBuf> = image.map(PathBuf::from);
    if let Some(path) = &image {
        if !path.is_file() {
            return Err(format!("Image not found: {}", path.display()));
        }
    }

    let id = wardrobe.add_from_response(&text, draft, image.as_deref())?;
    report_save(&wardrobe);

    let record = wardrobe
        .get(&id)
        .ok_or_else(|| format!("Item not found: {}", id))?;
    println!("Added [{}] {}", record.id, record.name);
    println!("  category: {}", record.category());
    if !record.asset_path.is_empty() {
        println!("  image:    {}", record.asset_path);
    }

    Ok(())
}

/// Run the import command
pub fn run_import(response: &str, dir: &str) -> Result<(), String> {
    let mut wardrobe = open_wardrobe()?;
    let text = read_response(response)?;

    let report = wardrobe.import_batch(&text, Path::new(dir))?;
    report_save(&wardrobe);
    print_report(&report);

    Ok(())
}

/// Run the scan command
pub fn run_scan(dir: &str, command: Option<&str>) -> Result<(), String> {
    let mut wardrobe = open_wardrobe()?;

    let command = command
        .map(str::to_string)
        .or_else(|| wardrobe.config().generator_command())
        .ok_or("No generator command. Pass --command or run: wardrobe config generator_command \"...\"")?;
    let generator = CommandGenerator::new(command);

    let report = wardrobe.scan_folder(Path::new(dir), &generator)?;
    report_save(&wardrobe);
    print_report(&report);

    Ok(())
}

fn print_report(report: &BatchReport) {
    for id in &report.ingested {
        println!("Added [{}]", id);
    }
    for skipped in &report.skipped {
        println!("Skipped {}: {}", skipped.filename, skipped.reason);
    }
    println!(
        "\nImported {} of {} item(s)",
        report.success_count(),
        report.attempted
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_batch_file_names_prefer_nobg() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "a_nobg.png", "b.PNG", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let names = batch_file_names(dir.path()).unwrap();
        assert_eq!(names, vec!["a_nobg.png", "b.PNG"]);
    }

    #[test]
    fn test_batch_file_names_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(batch_file_names(&dir.path().join("nope")).is_err());
    }
}
