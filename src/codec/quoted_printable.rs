//! Quoted-printable decoder (RFC 2045).
//!
//! Decodes leaf part content whose Content-Transfer-Encoding declares
//! quoted-printable. The decoder is total: soft line breaks are removed,
//! `=XX` escapes become bytes, and anything malformed passes through
//! literally.

/// Decodes quoted-printable content.
///
/// Handles `=XX` hex escapes (either case) and soft line breaks (`=\r\n`
/// and `=\n`). An `=` followed by anything else, including end of input,
/// is kept as a literal byte.
pub fn decode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let b = input[i];
        if b != b'=' {
            out.push(b);
            i += 1;
            continue;
        }

        match (input.get(i + 1), input.get(i + 2)) {
            (Some(b'\r'), Some(b'\n')) => i += 3,
            (Some(b'\n'), _) => i += 2,
            (Some(&hi), Some(&lo)) => match (hex_value(hi), hex_value(lo)) {
                (Some(hi), Some(lo)) => {
                    out.push((hi << 4) | lo);
                    i += 3;
                }
                _ => {
                    out.push(b);
                    i += 1;
                }
            },
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }

    out
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}
