use super::{open_wardrobe, read_response};

/// Run the ootd command - log the first outfit of an AI suggestion
pub fn run_ootd(response: &str) -> Result<(), String> {
    let wardrobe = open_wardrobe()?;
    let text = read_response(response)?;

    let Some((outfit, entry)) = wardrobe.log_outfit(&text)? else {
        println!("The response has no outfits.");
        return Ok(());
    };

    println!("{}", entry.title);
    println!("{}\n", "=".repeat(entry.title.chars().count().max(3)));
    if !outfit.reason.is_empty() {
        println!("Why: {}\n", outfit.reason);
    }

    println!("Items:");
    for id in &outfit.item_ids {
        match wardrobe.get(id) {
            Some(r) => println!("  [{}] {} ({})", r.id, r.name, r.category()),
            None => println!("  [{}] (not in wardrobe)", id),
        }
    }

    if !outfit.notes.is_empty() {
        println!("\nTips: {}", outfit.notes);
    }
    println!("\nLogged at {}", entry.date);

    Ok(())
}

/// Run the log command - outfit history, newest first
pub fn run_log(limit: usize) -> Result<(), String> {
    let wardrobe = open_wardrobe()?;
    let log = wardrobe.ootd_log();

    if log.entries().is_empty() {
        println!("No outfits logged yet.");
        return Ok(());
    }

    for entry in log.newest_first().take(limit) {
        println!("{}  {}", entry.date, entry.title);
        let names = entry.item_names(wardrobe.records());
        if !names.is_empty() {
            println!("    {}", names.join(", "));
        }
    }

    Ok(())
}
