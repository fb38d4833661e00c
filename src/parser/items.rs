use std::sync::LazyLock;

use regex::Regex;

/// `[**Name**](link)`, a blank line, then a `$`-prefixed price token. The
/// token is ASCII digits and dots only, the same set `parse_price` keeps, and
/// must end on a word boundary so a token running into other digits is not
/// cut short.
static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\*\*([^*]+)\*\*\]\(.*\)\n\n(\$[0-9.]+)\b").unwrap());

/// A (name, price text) pair found in page text, not yet filtered or parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub name: &'a str,
    pub price_text: &'a str,
}

/// Menu item candidates in order of appearance. Duplicates are kept; names
/// are trimmed and blank names dropped.
pub fn candidates(text: &str) -> impl Iterator<Item = Candidate<'_>> + '_ {
    ITEM_RE.captures_iter(text).filter_map(|caps| {
        let name = caps.get(1)?.as_str().trim();
        if name.is_empty() {
            return None;
        }
        Some(Candidate {
            name,
            price_text: caps.get(2)?.as_str(),
        })
    })
}

/// Keep only digits and dots, then parse. `None` when nothing numeric is left.
pub fn parse_price(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
