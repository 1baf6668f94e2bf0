// src/utils/html.rs

/// Sanitizes rich-text fields (lesson and gallery descriptions) with ammonia's
/// whitelist: formatting tags survive, scripts and event handlers do not.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitizes an optional field, mapping blank input to `None`.
pub fn clean_optional(input: Option<String>) -> Option<String> {
    input
        .map(|text| clean_html(&text))
        .filter(|text| !text.trim().is_empty())
}
