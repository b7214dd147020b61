use super::{confirm, open_wardrobe, report_save, split_list};
use crate::config::DATA_DIR_NAME;
use crate::types::{Attributes, Record, RecordPatch, Status};
use crate::wardrobe::Wardrobe;
use std::path::Path;

/// Run the init command
pub fn run_init(path: &str) -> Result<(), String> {
    let path = Path::new(path);
    let data_path = path.join(DATA_DIR_NAME);

    if data_path.exists() {
        return Err(format!("{} already exists at {}", DATA_DIR_NAME, data_path.display()));
    }

    let wardrobe = Wardrobe::init(path)?;
    println!("Initialized {} at {}", DATA_DIR_NAME, wardrobe.data_path().display());
    println!("  images:  {}", wardrobe.images_dir().display());
    println!("  profile: {}", wardrobe.profile_path().display());

    Ok(())
}

/// Run the list command
pub fn run_list(category: Option<&str>, status: Option<&str>) -> Result<(), String> {
    let wardrobe = open_wardrobe()?;
    let status = status.map(parse_status).transpose()?;

    let records = wardrobe.list(category, status.as_ref());
    if records.is_empty() {
        if category.is_some() || status.is_some() {
            println!("No items match.");
        } else {
            println!("No items yet. Add one with: wardrobe add <response> --image <photo>");
        }
        return Ok(());
    }

    for r in &records {
        print_record(r);
    }
    println!("{} item(s)", records.len());

    Ok(())
}

/// Run the show command
pub fn run_show(id: &str) -> Result<(), String> {
    let wardrobe = open_wardrobe()?;
    let record = wardrobe
        .get(id)
        .ok_or_else(|| format!("Item not found: {}", id))?;

    println!("[{}] {}", record.id, record.name);
    println!("  category: {}", record.category());
    println!("  status:   {}", record.status);
    println!("  price:    {} {}", record.currency, record.monetary_amount);
    println!("  worn:     {} time(s)", record.wear_count);
    if let Some(size) = &record.size {
        println!("  size:     {}", size);
    }
    if let Some(date) = record.created_at {
        println!("  added:    {}", date);
    }
    if !record.asset_path.is_empty() {
        println!("  image:    {}", record.asset_path);
    }
    if let Some(notes) = &record.user_notes {
        println!("  notes:    {}", notes);
    }

    let attrs = serde_json::to_string_pretty(&record.attributes)
        .map_err(|e| format!("Failed to serialize: {}", e))?;
    println!("\nAI analysis:\n{}", attrs);

    Ok(())
}

/// Fields settable through `wardrobe update`
#[derive(Debug, Default)]
pub struct UpdateArgs {
    pub name: Option<String>,
    pub size: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    pub color: Option<String>,
    pub item_type: Option<String>,
    pub seasons: Option<String>,
    pub occasions: Option<String>,
}

impl UpdateArgs {
    fn into_patch(self) -> RecordPatch {
        let attributes = Attributes {
            item_type: self.item_type,
            color: self.color,
            seasons: self.seasons.as_deref().map(split_list),
            occasions: self.occasions.as_deref().map(split_list),
            ..Default::default()
        };
        RecordPatch {
            name: self.name,
            size: self.size,
            monetary_amount: self.price,
            currency: self.currency.map(|c| c.to_uppercase()),
            user_notes: self.notes,
            attributes: (attributes != Attributes::default()).then_some(attributes),
            ..Default::default()
        }
    }
}

/// Run the update command
pub fn run_update(id: &str, args: UpdateArgs) -> Result<(), String> {
    let mut wardrobe = open_wardrobe()?;
    let patch = args.into_patch();
    if patch.is_empty() {
        return Err("Nothing to update".to_string());
    }

    if !wardrobe.update(id, patch)? {
        return Err(format!("Item not found: {}", id));
    }
    report_save(&wardrobe);
    println!("Updated [{}]", id);

    Ok(())
}

/// Run the status command
pub fn run_status(id: &str, status: &str) -> Result<(), String> {
    let mut wardrobe = open_wardrobe()?;
    let status = parse_status(status)?;

    if !wardrobe.set_status(id, status.clone())? {
        return Err(format!("Item not found: {}", id));
    }
    report_save(&wardrobe);
    println!("[{}] is now {}", id, status);

    Ok(())
}

/// Run the wear command
pub fn run_wear(ids: &[String]) -> Result<(), String> {
    let mut wardrobe = open_wardrobe()?;

    for id in ids {
        match wardrobe.record_wear(id)? {
            Some(count) => println!("[{}] worn {} time(s)", id, count),
            None => eprintln!("Item not found: {}", id),
        }
    }
    report_save(&wardrobe);

    Ok(())
}

/// Run the delete command
pub fn run_delete(id: &str, force: bool) -> Result<(), String> {
    let mut wardrobe = open_wardrobe()?;

    let record = wardrobe
        .get(id)
        .ok_or_else(|| format!("Item not found: {}", id))?;

    if !force {
        println!("Delete [{}] {}", record.id, record.name);
        if !confirm("Confirm?") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    wardrobe.delete(id)?;
    report_save(&wardrobe);
    println!("Deleted [{}]", id);

    Ok(())
}

/// Run the stats command
pub fn run_stats(currency: Option<&str>) -> Result<(), String> {
    let wardrobe = open_wardrobe()?;
    let stats = wardrobe.stats(currency);
    let approx = if stats.approximate { " (approx.)" } else { "" };

    println!("Wardrobe Statistics");
    println!("===================\n");

    println!("Total items: {}", stats.total_items);
    println!("Total value: {} {:.0}{}", stats.currency, stats.total_value, approx);
    println!("Avg price:   {} {:.0}{}", stats.currency, stats.avg_price, approx);

    if !stats.by_category.is_empty() {
        println!("\nBy category:");
        for (category, count) in &stats.by_category {
            println!("  {:20} {}", category, count);
        }
    }

    if !stats.by_status.is_empty() {
        println!("\nBy status:");
        for (status, count) in &stats.by_status {
            println!("  {:20} {}", status, count);
        }
    }

    if !stats.best_cost_per_wear.is_empty() {
        println!("\nBest cost per wear:");
        for row in &stats.best_cost_per_wear {
            println!(
                "  [{}] {:24} {:>14} {:>4}x  {} {:.0}",
                row.id,
                truncate(&row.name, 24),
                row.price_display,
                row.wear_count,
                stats.currency,
                row.cost_per_wear
            );
        }
    }

    if stats.approximate {
        println!("\nSome currencies have no known rate; totals are approximate.");
    }

    Ok(())
}

/// Run the export command
pub fn run_export(format: &str) -> Result<(), String> {
    let wardrobe = open_wardrobe()?;

    match format {
        "json" => println!("{}", wardrobe.export_json()?),
        "md" => print!("{}", wardrobe.export_markdown()),
        _ => return Err(format!("Unknown format: {}", format)),
    }

    Ok(())
}

/// Run the recover command
pub fn run_recover() -> Result<(), String> {
    let mut wardrobe = open_wardrobe()?;
    let ids = wardrobe.recover_from_images()?;

    if ids.is_empty() {
        println!("Nothing to recover; every image already has an item.");
        return Ok(());
    }
    report_save(&wardrobe);
    for id in &ids {
        println!("Recovered [{}]", id);
    }
    println!("Total items recovered: {}", ids.len());

    Ok(())
}

fn parse_status(raw: &str) -> Result<Status, String> {
    Status::parse_known(raw).ok_or_else(|| {
        format!(
            "Unknown status: {} (expected available, laundry, lent or repair)",
            raw
        )
    })
}

// Helper to print a record
fn print_record(r: &Record) {
    let color = r.attributes.color.as_deref().unwrap_or("-");
    println!(
        "[{}] {} ({}, {}) {}",
        r.id,
        r.name,
        r.category(),
        color,
        r.status
    );
    println!(
        "    {} {}  worn {}x",
        r.currency, r.monetary_amount, r.wear_count
    );
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_args_to_patch() {
        let patch = UpdateArgs {
            price: Some(990.0),
            currency: Some("usd".to_string()),
            seasons: Some("spring, autumn".to_string()),
            ..Default::default()
        }
        .into_patch();

        assert_eq!(patch.monetary_amount, Some(990.0));
        assert_eq!(patch.currency.as_deref(), Some("USD"));
        let attrs = patch.attributes.unwrap();
        assert_eq!(attrs.seasons, Some(vec!["spring".to_string(), "autumn".to_string()]));
        assert!(attrs.color.is_none());

        assert!(UpdateArgs::default().into_patch().is_empty());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("LAUNDRY").unwrap(), Status::Laundry);
        assert!(parse_status("donated").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long item name", 10), "a very ...");
    }
}
