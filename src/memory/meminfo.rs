/*!
 * Meminfo Parser
 * Labeled kilobyte fields out of `/proc/meminfo` style text
 */

use serde::{Deserialize, Serialize};

/// Fields read from meminfo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemInfoField {
    MemTotal,
    SwapTotal,
    MemFree,
    Buffers,
    Cached,
    SwapFree,
}

impl MemInfoField {
    /// Every field, in table order
    pub const ALL: [MemInfoField; 6] = [
        MemInfoField::MemTotal,
        MemInfoField::SwapTotal,
        MemInfoField::MemFree,
        MemInfoField::Buffers,
        MemInfoField::Cached,
        MemInfoField::SwapFree,
    ];

    /// Canonical label, colon included
    pub const fn label(self) -> &'static str {
        match self {
            MemInfoField::MemTotal => "MemTotal:",
            MemInfoField::SwapTotal => "SwapTotal:",
            MemInfoField::MemFree => "MemFree:",
            MemInfoField::Buffers => "Buffers:",
            MemInfoField::Cached => "Cached:",
            MemInfoField::SwapFree => "SwapFree:",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Result of one parse: kilobyte values per matched field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    values: [Option<usize>; 6],
}

impl MemInfo {
    /// Value of a field if it was matched
    pub fn get(&self, field: MemInfoField) -> Option<usize> {
        self.values[field.index()]
    }

    /// Value of a field, 0 when unmatched
    pub fn kb(&self, field: MemInfoField) -> usize {
        self.get(field).unwrap_or(0)
    }

    /// Number of fields matched
    pub fn matched(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Parse the requested fields out of meminfo lines
///
/// A line belongs to a field when it starts with the field's label
/// (byte-exact). The value is read after the label plus one separator
/// character; a malformed remainder yields 0. The first match of a field
/// wins. Stops as soon as every requested field has been seen.
pub fn parse_meminfo<'a, I>(lines: I, fields: &[MemInfoField]) -> MemInfo
where
    I: IntoIterator<Item = &'a str>,
{
    let mut info = MemInfo::default();
    let mut remaining = fields.len();

    for line in lines {
        if remaining == 0 {
            break;
        }

        let hit = fields
            .iter()
            .copied()
            .filter(|field| info.get(*field).is_none())
            .find(|field| line.as_bytes().starts_with(field.label().as_bytes()));

        if let Some(field) = hit {
            let rest = line.get(field.label().len() + 1..).unwrap_or("");
            info.values[field.index()] = Some(parse_leading(rest));
            remaining -= 1;
        }
    }

    info
}

/// Parse a single-value file body
///
/// `None` when empty or the value is not positive.
pub fn parse_value(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    if raw.starts_with('-') {
        return None;
    }
    match parse_leading(raw) {
        0 => None,
        value => Some(value),
    }
}

/// Best-effort unsigned integer: skip blanks, take digits, stop at the first
/// non-digit; 0 when there are none
fn parse_leading(text: &str) -> usize {
    let text = text.trim_start();
    let text = text.strip_prefix('+').unwrap_or(text);
    text.bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0usize, |acc, digit| {
            acc.saturating_mul(10).saturating_add(usize::from(digit - b'0'))
        })
}
