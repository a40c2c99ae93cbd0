//! Buffer URI handling: data URIs, remote URIs and package-relative paths.

use crate::error::{LoadError, Result};

/// How a buffer URI is satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriKind<'a> {
    /// `data:` URI with an inline payload.
    Data(&'a str),
    /// `http:`, `https:` or protocol-relative URI.
    Remote(&'a str),
    /// Path relative to the root asset.
    Relative(&'a str),
}

pub fn classify(uri: &str) -> UriKind<'_> {
    if uri.starts_with("data:") {
        UriKind::Data(uri)
    } else if uri.starts_with("http://") || uri.starts_with("https://") || uri.starts_with("//") {
        UriKind::Remote(uri)
    } else {
        UriKind::Relative(uri)
    }
}

/// Map a relative URI to a package key.
///
/// The URI is optionally percent-decoded, stripped of a leading `./` or `/`
/// and prefixed with `root_path` (the root asset's directory, ending in `/`
/// or empty).
pub fn resolve_relative(root_path: &str, uri: &str, decode: bool) -> Result<String> {
    let decoded = if decode {
        String::from_utf8(percent_decode(uri))
            .map_err(|_| LoadError::InvalidUri(format!("{} is not valid UTF-8 once decoded", uri)))?
    } else {
        uri.to_string()
    };

    let trimmed = decoded
        .strip_prefix("./")
        .or_else(|| decoded.strip_prefix('/'))
        .unwrap_or(&decoded);
    Ok(format!("{}{}", root_path, trimmed))
}

/// Decode a `data:[<mediatype>][;base64],<data>` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let body = uri
        .strip_prefix("data:")
        .ok_or_else(|| LoadError::InvalidUri("Not a data URI".into()))?;
    let comma_pos = body
        .find(',')
        .ok_or_else(|| LoadError::InvalidUri("Invalid data URI: no comma".into()))?;

    let header = &body[..comma_pos];
    let data = &body[comma_pos + 1..];

    if header.ends_with(";base64") {
        decode_base64(data)
    } else {
        Ok(percent_decode(data))
    }
}

pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    const DECODE_TABLE: [i8; 128] = [
        -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
        -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 62, -1, -1,
        -1, 63, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, -1, -1, -1, -1, -1, -1, -1, 0, 1, 2, 3, 4,
        5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, -1, -1, -1,
        -1, -1, -1, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45,
        46, 47, 48, 49, 50, 51, -1, -1, -1, -1, -1,
    ];

    let input: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let mut output = Vec::with_capacity(input.len() * 3 / 4);

    for chunk in input.chunks(4) {
        let mut sextets = [0u8; 4];
        let mut valid = 0;

        for (i, &byte) in chunk.iter().enumerate() {
            if byte == b'=' {
                break;
            }
            let value = DECODE_TABLE.get(byte as usize).copied().unwrap_or(-1);
            if value < 0 {
                return Err(LoadError::InvalidUri(format!(
                    "Invalid base64 character {:?}",
                    byte as char
                )));
            }
            sextets[i] = value as u8;
            valid = i + 1;
        }

        let n = (u32::from(sextets[0]) << 18)
            | (u32::from(sextets[1]) << 12)
            | (u32::from(sextets[2]) << 6)
            | u32::from(sextets[3]);

        if valid > 1 {
            output.push((n >> 16) as u8);
        }
        if valid > 2 {
            output.push((n >> 8) as u8);
        }
        if valid > 3 {
            output.push(n as u8);
        }
    }

    Ok(output)
}

/// Decode `%XX` escapes; malformed escapes are kept verbatim.
pub fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                output.push((h << 4) | l);
                i += 3;
                continue;
            }
        }
        output.push(bytes[i]);
        i += 1;
    }

    output
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
