/// Price with two decimals, or four below 1.0 where cents hide the move.
pub fn format_price(value: f64) -> String {
    if value.abs() < 1.0 && value != 0.0 {
        format!("{:.4}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Signed amount, e.g. "+12.50" or "-3.00".
pub fn format_signed(value: f64) -> String {
    format!("{:+.2}", value)
}

/// Percentage with one decimal, e.g. "66.7%".
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Reduce backend timestamps to something readable.
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%Y-%m-%d %H:%M").to_string()
    } else if date.len() >= 10 {
        // YYYY-MM-DD prefix
        date.chars().take(10).collect()
    } else {
        date.to_string()
    }
}
