//! Header slugification.
//!
//! Raw headers differ release to release (`Happiness Rank`,
//! `Happiness.Rank`, `Overall rank`), so they are first reduced to a
//! predictable slug and only then renamed through the per-shape tables.

use once_cell::sync::Lazy;
use regex::Regex;

static PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[()]").expect("static regex"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s.]").expect("static regex"));

/// Lowercase, drop parentheses, replace each whitespace or period with `_`.
///
/// Every separator character becomes its own underscore, so
/// `Economy..GDP.per.Capita.` yields `economy__gdp_per_capita_`.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim_matches('\u{feff}').trim().to_lowercase();
    let without_parens = PARENS.replace_all(&lowered, "");
    SEPARATORS.replace_all(&without_parens, "_").into_owned()
}

/// Normalize a full header row.
pub fn normalize_headers(raw: &[String]) -> Vec<String> {
    raw.iter().map(|h| normalize_header(h)).collect()
}
