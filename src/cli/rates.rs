use super::open_wardrobe;
use crate::currency::{Conversion, JsonFileRateSource};

/// Run the convert command
pub fn run_convert(amount: f64, from: &str, to: Option<&str>) -> Result<(), String> {
    let wardrobe = open_wardrobe()?;
    let to = to
        .map(str::to_uppercase)
        .unwrap_or_else(|| wardrobe.base_currency());
    let from = from.to_uppercase();

    match wardrobe.convert(amount, &from, &to) {
        Conversion::Exact(v) => println!("{} {} = {} {:.2}", from, amount, to, v),
        Conversion::DefaultRate(v) => println!(
            "{} {} = {} {:.2} (approx., no rate known for one of the currencies)",
            from, amount, to, v
        ),
    }

    Ok(())
}

/// Run the rates command
pub fn run_rates(refresh_from: Option<&str>) -> Result<(), String> {
    let mut wardrobe = open_wardrobe()?;

    if let Some(path) = refresh_from {
        let source = JsonFileRateSource::new(path);
        if wardrobe.refresh_rates(&source)? {
            println!("Rates updated from {}\n", path);
        } else {
            eprintln!("Could not read rates from {}; keeping the previous table\n", path);
        }
    }

    let rates = wardrobe.rates();
    println!("Base currency: {}", rates.base());
    match rates.last_updated() {
        Some(at) => println!("Updated:       {}\n", at.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Updated:       (built-in defaults)\n"),
    }
    for (code, rate) in rates.rates() {
        println!("  {:5} {:>14.6}", code, rate);
    }

    Ok(())
}
