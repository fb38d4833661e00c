pub mod filter;
pub mod items;

use serde_json::Value;

/// Markdown text of one crawled page. Pages arrive either as a bare string or
/// as a document object; `markdown` is read first, then `content`, then a
/// wrapped `data.markdown`. Anything else counts as no content.
pub fn page_text(page: &Value) -> Option<&str> {
    let text = match page {
        Value::String(s) => Some(s.as_str()),
        Value::Object(_) => ["/markdown", "/content", "/data/markdown"]
            .iter()
            .find_map(|ptr| page.pointer(ptr).and_then(Value::as_str)),
        _ => None,
    }?;
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
