use std::sync::LazyLock;

use regex::Regex;

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9A-Fa-f]{1,6})|([0-9]{1,7}));").unwrap());

/// Fields recovered from the semicolon-delimited metadata attribute.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EpisodeMeta {
    pub title: String,
    pub broadcast_date: String,
    pub broadcast_start: String,
}

/// Parse `…;title;…;…;start_end`. Missing segments leave fields empty; never fails.
pub fn parse(raw: &str) -> EpisodeMeta {
    let parts: Vec<&str> = raw.split(';').collect();
    let mut meta = EpisodeMeta::default();

    if let Some(title) = parts.get(1) {
        meta.title = decode_entities(title).trim().to_string();
    }

    // "2024-04-01T10:00:00+09:00_2024-04-01T10:50:00+09:00", or a lone start followed by "_"
    if let Some(window) = parts.get(4).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let start = window.split('_').next().unwrap_or_default().trim();
        meta.broadcast_start = start.to_string();
        meta.broadcast_date = start.split('T').next().unwrap_or_default().to_string();
    }

    meta
}

/// Decode the entities that show up in the player attributes. Unknown entities pass through.
pub fn decode_entities(s: &str) -> String {
    let named = s
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}");

    let numeric = NUMERIC_ENTITY_RE.replace_all(&named, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // &amp; last so "&amp;lt;" decodes to "&lt;", not "<"
    numeric.replace("&amp;", "&")
}
