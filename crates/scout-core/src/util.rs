/// Strip an optional Markdown code fence around a model response.
///
/// Example: ```` "```json\n[1]\n```" ```` → `"[1]"`
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the language tag (e.g. "json") up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) if rest[..idx].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[idx + 1..],
        _ => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    body.strip_suffix("```").unwrap_or(body).trim()
}
