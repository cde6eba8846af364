//! Tool name display helpers

/// Display name for an MCP tool.
///
/// Strips the server namespace up to the first `__`, turns underscores into
/// spaces and capitalises each word: `oracle__run_sql` becomes `Run Sql`.
pub fn normalize_tool_name(raw: &str) -> String {
    let bare = raw.split_once("__").map_or(raw, |(_, rest)| rest);
    bare.split('_')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
