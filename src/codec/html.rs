//! HTML to plain text reduction.
//!
//! Produces a readable plain-text rendering of an HTML body for display
//! and previews. This is a lossy reduction driven by regex rewrites, not
//! an HTML parser; it must never fail on malformed markup.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref STYLE_RE: Regex = Regex::new(r"(?is)<style[^>]*>.*?(?:</style>|\z)").unwrap();
    static ref SCRIPT_RE: Regex = Regex::new(r"(?is)<script[^>]*>.*?(?:</script>|\z)").unwrap();
    static ref LINE_BREAK_RE: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    static ref PARAGRAPH_CLOSE_RE: Regex = Regex::new(r"(?i)</p\s*>").unwrap();
    static ref BLOCK_CLOSE_RE: Regex = Regex::new(r"(?i)</(?:div|li)\s*>").unwrap();
    static ref LIST_ITEM_RE: Regex = Regex::new(r"(?i)<li[^>]*>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref NUMERIC_ENTITY_RE: Regex = Regex::new(r"&#([xX][0-9a-fA-F]+|[0-9]+);").unwrap();
    static ref EXTRA_NEWLINES_RE: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Converts HTML to plain text.
///
/// Style and script blocks are dropped with their content, including
/// blocks left unterminated. Line breaks,
/// paragraph ends, and block ends become newlines; list items become `- `
/// bullets. Remaining tags are stripped and entities are decoded; runs of
/// three or more newlines collapse to two.
pub fn html_to_text(html: &str) -> String {
    let text = STYLE_RE.replace_all(html, "");
    let text = SCRIPT_RE.replace_all(&text, "");
    let text = LINE_BREAK_RE.replace_all(&text, "\n");
    let text = PARAGRAPH_CLOSE_RE.replace_all(&text, "\n\n");
    let text = BLOCK_CLOSE_RE.replace_all(&text, "\n");
    let text = LIST_ITEM_RE.replace_all(&text, "- ");
    let text = TAG_RE.replace_all(&text, "");
    let text = NUMERIC_ENTITY_RE.replace_all(&text, decode_numeric_entity);
    let text = decode_named_entities(&text);
    let text = EXTRA_NEWLINES_RE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

fn decode_numeric_entity(caps: &Captures) -> String {
    let body = &caps[1];
    let code = match body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => body.parse::<u32>().ok(),
    };
    match code.and_then(char::from_u32) {
        Some(c) => c.to_string(),
        // Out-of-range references stay literal.
        None => caps[0].to_string(),
    }
}

fn decode_named_entities(text: &str) -> String {
    // &amp; decodes last so it cannot manufacture new entities.
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
