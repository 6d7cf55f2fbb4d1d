/// Turn a spec name (or any identifier) into a safe file stem.
///
/// Rules:
/// - Keep only letters, numbers, hyphens, underscores, dots
/// - Path separators and anything else become "_"
/// - Strip leading dots so a key never names a hidden or parent entry
/// - Limit to 128 characters
pub fn file_key(raw: &str) -> String {
    let mut key: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    while key.contains("__") {
        key = key.replace("__", "_");
    }

    let key = key.trim_start_matches('.');
    let mut key = key.trim_matches('_').to_string();

    if key.len() > 128 {
        key.truncate(128);
    }

    if key.is_empty() {
        "default".to_string()
    } else {
        key
    }
}
