use serde::Serialize;

use crate::error::{AdapterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Field names and kinds, in pointer-table order.
pub const SONG_INFO_FIELDS: [FieldSpec; 6] = [
    FieldSpec { name: "title", kind: FieldKind::Text },
    FieldSpec { name: "author", kind: FieldKind::Text },
    FieldSpec { name: "desc", kind: FieldKind::Text },
    FieldSpec { name: "player", kind: FieldKind::Text },
    FieldSpec { name: "speed", kind: FieldKind::Number },
    FieldSpec { name: "tracks", kind: FieldKind::Number },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(Option<i64>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SongInfo {
    pub title: String,
    pub author: String,
    pub desc: String,
    pub player: String,
    pub speed: Option<i64>,
    pub tracks: Option<i64>,
}

impl SongInfo {
    /// Stores a decoded field by schema name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: FieldValue) {
        match (name, value) {
            ("title", FieldValue::Text(s)) => self.title = s,
            ("author", FieldValue::Text(s)) => self.author = s,
            ("desc", FieldValue::Text(s)) => self.desc = s,
            ("player", FieldValue::Text(s)) => self.player = s,
            ("speed", FieldValue::Number(n)) => self.speed = n,
            ("tracks", FieldValue::Number(n)) => self.tracks = n,
            _ => {}
        }
    }
}

/// Reads a NUL-terminated string at `ptr`. A null pointer reads as empty.
pub fn read_c_string(memory: &[u8], ptr: usize) -> Result<String> {
    if ptr == 0 {
        return Ok(String::new());
    }
    let tail = memory.get(ptr..).ok_or(AdapterError::OutOfBounds {
        start: ptr,
        end: ptr,
        size: memory.len(),
    })?;
    let nul = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(AdapterError::UnterminatedString(ptr))?;
    Ok(String::from_utf8_lossy(&tail[..nul]).into_owned())
}

/// Parses the leading integer of `text`, skipping leading whitespace.
/// Returns `None` when no digits follow the optional sign.
pub fn parse_int(text: &str) -> Option<i64> {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Reads `count` little-endian pointers of `ptr_size` bytes starting at `base`.
pub fn read_pointer_table(
    memory: &[u8],
    base: usize,
    count: usize,
    ptr_size: usize,
) -> Result<Vec<usize>> {
    if ptr_size != 4 && ptr_size != 8 {
        return Err(AdapterError::PointerWidth(ptr_size));
    }
    if base % ptr_size != 0 {
        return Err(AdapterError::Misaligned {
            what: "track info",
            raw: base,
            unit: ptr_size,
        });
    }
    let end = count
        .checked_mul(ptr_size)
        .and_then(|bytes| base.checked_add(bytes));
    let block = end
        .and_then(|end| memory.get(base..end))
        .ok_or(AdapterError::OutOfBounds {
            start: base,
            end: end.unwrap_or(usize::MAX),
            size: memory.len(),
        })?;
    Ok(block
        .chunks_exact(ptr_size)
        .map(|slot| {
            let mut raw = [0u8; 8];
            raw[..ptr_size].copy_from_slice(slot);
            u64::from_le_bytes(raw) as usize
        })
        .collect())
}

pub fn decode_record(
    memory: &[u8],
    base: usize,
    ptr_size: usize,
    schema: &[FieldSpec],
) -> Result<Vec<FieldValue>> {
    let slots = read_pointer_table(memory, base, schema.len(), ptr_size)?;
    schema
        .iter()
        .zip(slots)
        .map(|(field, ptr)| {
            let text = read_c_string(memory, ptr)?;
            Ok(match field.kind {
                FieldKind::Text => FieldValue::Text(text),
                FieldKind::Number => FieldValue::Number(parse_int(&text)),
            })
        })
        .collect()
}

/// Decodes a song-info record, substituting `filename` for an empty title.
pub fn decode_song_info(
    memory: &[u8],
    base: usize,
    ptr_size: usize,
    filename: &str,
) -> Result<SongInfo> {
    let values = decode_record(memory, base, ptr_size, &SONG_INFO_FIELDS)?;
    let mut info = SongInfo::default();
    for (field, value) in SONG_INFO_FIELDS.iter().zip(values) {
        info.set(field.name, value);
    }
    if info.title.is_empty() {
        info.title = filename.to_string();
    }
    Ok(info)
}
