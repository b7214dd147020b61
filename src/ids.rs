use chrono::NaiveDate;

/// Next id of the form `{category}_{YYYYMMDD}_{seq:03}`.
///
/// `seq` is one past the highest sequence already used for the same
/// category and day. Ids whose suffix is not all ASCII digits are ignored.
pub fn next_id<'a>(
    category: &str,
    date: NaiveDate,
    existing: impl IntoIterator<Item = &'a str>,
) -> String {
    let category = normalize_category(category);
    let prefix = format!("{}_{}", category, date.format("%Y%m%d"));
    let seq_prefix = format!("{}_", prefix);

    let max_seq = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(&seq_prefix))
        .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|suffix| suffix.parse::<u128>().ok())
        .max()
        .unwrap_or(0);

    format!("{}_{:03}", prefix, max_seq.saturating_add(1))
}

fn normalize_category(category: &str) -> &str {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        "unknown"
    } else {
        trimmed
    }
}

/// Reduce an id to characters that are safe in a file name
pub fn file_safe(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
