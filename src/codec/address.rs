//! Email address parsing and formatting.
//!
//! Parses the address shapes that occur in real message headers:
//! `Name <email>`, `"Quoted Name" <email>`, `<email>`, and a bare email.
//! Parsing never fails; input that fits no shape degrades to an address
//! whose email is the raw token. Formatting quotes display names that
//! contain specials so formatted output parses back to the same address.

use lazy_static::lazy_static;
use regex::Regex;

use crate::domain::Address;

lazy_static! {
    static ref EMAIL_SHAPE_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Parses a single address from a header token.
pub fn parse_address(input: &str) -> Address {
    let input = input.trim();

    // A quoted display name may itself contain '<' or escaped quotes, so
    // the bracket scan starts after the closing quote.
    let quoted_end = input
        .strip_prefix('"')
        .and_then(closing_quote)
        .map(|close| close + 1);
    let search_from = quoted_end.map_or(0, |end| end + 1);

    if let Some(start) = input[search_from..].find('<').map(|i| i + search_from) {
        if let Some(end) = input[start + 1..].find('>').map(|i| i + start + 1) {
            let email = input[start + 1..end].trim().to_string();
            let name = match quoted_end {
                Some(close) => unescape_display_name(&input[1..close]),
                None => input[..start].trim().to_string(),
            };
            return Address {
                email,
                name: if name.is_empty() { None } else { Some(name) },
            };
        }
    }

    Address {
        email: input.to_string(),
        name: None,
    }
}

/// Parses a comma-separated address list.
///
/// Commas inside double-quoted display names do not split; empty tokens
/// are skipped.
pub fn parse_address_list(input: &str) -> Vec<Address> {
    let mut addresses = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                if !current.trim().is_empty() {
                    addresses.push(parse_address(&current));
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        addresses.push(parse_address(&current));
    }

    addresses
}

/// Formats an address for a message header.
///
/// Display names containing specials are wrapped in double quotes, with
/// embedded quotes and backslashes backslash-escaped, so that
/// [`parse_address`] recovers the same name.
pub fn format_address(address: &Address) -> String {
    match &address.name {
        Some(name) if !name.is_empty() => {
            if name_needs_quoting(name) {
                format!("\"{}\" <{}>", escape_display_name(name), address.email)
            } else {
                format!("{} <{}>", name, address.email)
            }
        }
        _ => address.email.clone(),
    }
}

/// Formats an address list as a comma-separated header value.
pub fn format_address_list(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(format_address)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Checks that a string is shaped like an email address.
///
/// This is a loose shape check (something@domain.tld), not an RFC 5321
/// validation.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE_RE.is_match(email)
}

fn name_needs_quoting(name: &str) -> bool {
    name.chars()
        .any(|c| matches!(c, ',' | ';' | ':' | '<' | '>' | '(' | ')' | '@' | '"'))
}

/// Returns the index of the first unescaped `"` after an opening quote.
fn closing_quote(rest: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}

fn escape_display_name(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unescape_display_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            // A trailing lone backslash stays literal.
            out.push(chars.next().unwrap_or(c));
        } else {
            out.push(c);
        }
    }
    out
}
