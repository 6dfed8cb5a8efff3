// Color animation file parsing.
// Header line, then one frame per line: frameId, r1,g1,b1, r2,g2,b2, ...

use tracing::debug;

use crate::types::{Animation, AnimationFrame, FileUpload, LightColor};

/// Parse animation file text into frames.
///
/// The first line is always treated as a header and dropped. Blank lines are
/// skipped. Malformed integers become `None` and flow through untouched.
pub fn parse_animation(filename: &str, content: &str) -> Animation {
    let frames: Vec<AnimationFrame> = content
        .split('\n')
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(parse_frame)
        .collect();

    debug!(filename, frames = frames.len(), "parsed color animation");

    Animation {
        filename: filename.to_string(),
        frames,
    }
}

fn parse_frame(line: &str) -> AnimationFrame {
    let values: Vec<Option<i64>> = line.split(',').map(parse_int_prefix).collect();
    let frame_id = values.first().copied().flatten();

    let lights = values
        .get(1..)
        .unwrap_or_default()
        .chunks(3)
        .map(|channels| {
            let channel = |i: usize| channels.get(i).copied().flatten();
            LightColor::new(channel(0), channel(1), channel(2))
        })
        .collect();

    AnimationFrame { frame_id, lights }
}

/// `parseInt(value, 10)` semantics: skip leading whitespace, optional sign,
/// longest run of decimal digits. `None` when there are no digits. Values
/// past the `i64` range saturate at `i64::MAX` / `i64::MIN`.
pub(crate) fn parse_int_prefix(field: &str) -> Option<i64> {
    let s = field.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let sign = if negative { -1 } else { 1 };
    let value = rest.bytes().take(digits).fold(0i64, |acc, digit| {
        acc.saturating_mul(10).saturating_add(sign * i64::from(digit - b'0'))
    });
    Some(value)
}

impl Animation {
    /// Parse an uploaded color animation file.
    pub fn from_upload(upload: &FileUpload) -> Animation {
        parse_animation(&upload.name, &upload.text())
    }
}
