

/// Single-line, char-safe excerpt of user text for log messages.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max_chars {
        format!("{}...", flat.chars().take(max_chars).collect::<String>())
    } else {
        flat
    }
}
