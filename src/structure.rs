// Structure file parsing: one light per line, three comma-separated numbers.
// File column order is (z, x, y) relative to render space. Do not "fix" the permutation.

use tracing::debug;

use crate::types::{FileUpload, LightPosition, Structure};

/// Parse structure file text into an ordered list of light positions.
///
/// Lines that are empty (or whitespace only) are skipped, so a trailing newline
/// does not produce a phantom light. Unparseable fields become NaN.
pub fn parse_structure(filename: &str, content: &str) -> Structure {
    let lights: Vec<LightPosition> = content
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(parse_row)
        .collect();

    debug!(filename, count = lights.len(), "parsed structure");

    Structure {
        filename: filename.to_string(),
        lights,
    }
}

fn parse_row(line: &str) -> LightPosition {
    let mut fields = line.split(',').map(parse_float_prefix);
    let mut next = || fields.next().unwrap_or(f64::NAN);
    let (first, second, third) = (next(), next(), next());

    LightPosition {
        x: second,
        y: third,
        z: first,
    }
}

/// `parseFloat` semantics: skip leading whitespace, take the longest numeric
/// prefix, NaN when there is none.
pub(crate) fn parse_float_prefix(field: &str) -> f64 {
    let s = field.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    let bytes = s.as_bytes();
    let len = bytes.len();

    let mut end = 0;
    let negative = bytes.first() == Some(&b'-');
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    if s[end..].starts_with("Infinity") {
        return if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = end;
    while end < len && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < len && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < len && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits + (frac_end - frac_start) > 0 {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return f64::NAN;
    }

    if end < len && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < len && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < len && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

impl Structure {
    /// Parse an uploaded structure file.
    pub fn from_upload(upload: &FileUpload) -> Structure {
        parse_structure(&upload.name, &upload.text())
    }
}
