//! Bruker OPUS reader
//!
//! An OPUS file starts with a 24-byte header (magic, directory offset at
//! byte 12, block count at byte 20) followed by a block directory of 12-byte
//! entries: block kind (u8), channel (u8), reserved (u16), length in 4-byte
//! words (i32), absolute offset (i32). Parameter blocks hold tagged values
//! terminated by `END`; data blocks hold little-endian `f32` samples.

use std::collections::BTreeMap;
use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use super::{Spectrum, SpectrumError};

pub const MAGIC: [u8; 4] = [0x0a, 0x0a, 0xfe, 0xfe];

const HEADER_BYTES: usize = 24;
const DIR_ENTRY_BYTES: usize = 12;

/// Block kinds (first directory byte).
mod kind {
    pub const DATA: u8 = 7;
    pub const INSTRUMENT: u8 = 32;
    pub const ACQUISITION: u8 = 48;
    pub const DATA_PARAMETERS: u8 = 23;
    pub const OPTIC: u8 = 96;
}

/// Channels (second directory byte) that carry a spectrum.
mod channel {
    /// Single-channel sample spectrum.
    pub const SPSM: u8 = 4;
    /// Single-channel spectrum (ScSm), used when SpSm is absent.
    pub const SCSM: u8 = 132;
}

/// Header parameters copied into [`Spectrum::header`], per block kind.
const INFO_PARAMETERS: [(u8, &[&str]); 3] = [
    (kind::ACQUISITION, &["RES", "NSS", "AQM"]),
    (kind::OPTIC, &["APT", "DTC", "BMS"]),
    (kind::INSTRUMENT, &["LWN", "PKA"]),
];

// ---------------------------------------------------------------------------
// Parameter values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(f64::from(*i)),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(s) => write!(f, "{s}"),
        }
    }
}

pub type Parameters = BTreeMap<String, ParamValue>;

#[derive(Debug, Clone, Copy)]
struct BlockEntry {
    kind: u8,
    channel: u8,
    /// Length in 4-byte words.
    length: usize,
    offset: usize,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

pub fn is_opus(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC)
}

/// Decode the sample spectrum (SpSm, else ScSm) of an OPUS file.
pub fn parse(name: &str, bytes: &[u8]) -> Result<Spectrum, SpectrumError> {
    let blocks = read_directory(bytes)?;
    let find = |k: u8, c: u8| blocks.iter().find(|b| b.kind == k && b.channel == c);

    let spectrum_channel = [channel::SPSM, channel::SCSM]
        .into_iter()
        .find(|&c| find(kind::DATA, c).is_some())
        .ok_or(SpectrumError::MissingBlock("spectrum data block"))?;
    let data = find(kind::DATA, spectrum_channel)
        .ok_or(SpectrumError::MissingBlock("spectrum data block"))?;
    let param_block = find(kind::DATA_PARAMETERS, spectrum_channel)
        .ok_or(SpectrumError::MissingBlock("data parameter block"))?;

    let params = read_parameters(bytes, param_block.offset)?;
    let first = params
        .get("FXV")
        .and_then(ParamValue::as_f64)
        .ok_or(SpectrumError::MissingParameter("FXV"))?;
    let last = params
        .get("LXV")
        .and_then(ParamValue::as_f64)
        .ok_or(SpectrumError::MissingParameter("LXV"))?;

    let mut y = read_f32_block(bytes, data.offset, data.length)?;
    // Data blocks may be padded past the declared point count.
    if let Some(npt) = params.get("NPT").and_then(ParamValue::as_f64) {
        if npt >= 0.0 && (npt as usize) < y.len() {
            y.truncate(npt as usize);
        }
    }
    if y.is_empty() {
        return Err(SpectrumError::Empty);
    }
    let x = linspace(first, last, y.len());

    let measured_at = match (
        params.get("DAT").and_then(ParamValue::as_text),
        params.get("TIM").and_then(ParamValue::as_text),
    ) {
        (Some(date), Some(time)) => measurement_time(date, time),
        _ => None,
    };

    let mut header: Vec<(String, String)> = ["DAT", "TIM", "NPT", "FXV", "LXV"]
        .iter()
        .filter_map(|&k| params.get(k).map(|v| (k.to_string(), v.to_string())))
        .collect();
    for (block_kind, keys) in INFO_PARAMETERS {
        let Some(block) = blocks.iter().find(|b| b.kind == block_kind) else {
            continue;
        };
        match read_parameters(bytes, block.offset) {
            Ok(extra) => header.extend(
                keys.iter()
                    .filter_map(|&k| extra.get(k).map(|v| (k.to_string(), v.to_string()))),
            ),
            Err(e) => log::debug!("{name}: skipping header block {block_kind}: {e}"),
        }
    }

    Ok(Spectrum {
        name: name.to_string(),
        x,
        y,
        x_label: "Wavenumber [cm⁻¹]".to_string(),
        measured_at,
        header,
    })
}

// ---------------------------------------------------------------------------
// Block decoding
// ---------------------------------------------------------------------------

fn read_directory(bytes: &[u8]) -> Result<Vec<BlockEntry>, SpectrumError> {
    slice(bytes, 0, HEADER_BYTES)?;
    let dir_offset = offset_from(LittleEndian::read_i32(&bytes[12..16]), 12)?;
    let count = offset_from(LittleEndian::read_i32(&bytes[20..24]), 20)?;

    (0..count)
        .map(|i| {
            let at = dir_offset + i * DIR_ENTRY_BYTES;
            let entry = slice(bytes, at, DIR_ENTRY_BYTES)?;
            Ok(BlockEntry {
                kind: entry[0],
                channel: entry[1],
                length: offset_from(LittleEndian::read_i32(&entry[4..8]), at + 4)?,
                offset: offset_from(LittleEndian::read_i32(&entry[8..12]), at + 8)?,
            })
        })
        .collect()
}

/// Read tagged parameters starting at `offset` until `END` or an empty entry.
pub fn read_parameters(bytes: &[u8], offset: usize) -> Result<Parameters, SpectrumError> {
    let mut params = Parameters::new();
    let mut at = offset;
    loop {
        let head = slice(bytes, at, 8)?;
        let tag = &head[..4];
        let value_type = LittleEndian::read_u16(&head[4..6]);
        let words = usize::from(LittleEndian::read_u16(&head[6..8]));
        at += 8;
        if tag.starts_with(b"END") || words == 0 {
            break;
        }

        let raw = slice(bytes, at, 2 * words)?;
        at += 2 * words;
        let value = match value_type {
            0 if raw.len() >= 4 => ParamValue::Int(LittleEndian::read_i32(raw)),
            1 if raw.len() >= 8 => ParamValue::Float(LittleEndian::read_f64(raw)),
            2..=4 => ParamValue::Text(latin1_until_nul(raw)),
            other => {
                log::debug!("Unknown OPUS parameter type {other} at offset {at}");
                continue;
            }
        };
        params.insert(latin1_until_nul(tag), value);
    }
    Ok(params)
}

fn read_f32_block(bytes: &[u8], offset: usize, words: usize) -> Result<Vec<f64>, SpectrumError> {
    let raw = slice(bytes, offset, words * 4)?;
    Ok(raw
        .chunks_exact(4)
        .map(|c| f64::from(LittleEndian::read_f32(c)))
        .collect())
}

fn slice(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], SpectrumError> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(SpectrumError::Truncated {
            offset,
            needed: len,
        })
}

fn offset_from(value: i32, at: usize) -> Result<usize, SpectrumError> {
    usize::try_from(value).map_err(|_| SpectrumError::Truncated {
        offset: at,
        needed: 4,
    })
}

fn latin1_until_nul(raw: &[u8]) -> String {
    raw.iter()
        .take_while(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect()
}

fn linspace(first: f64, last: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![first],
        _ => {
            let step = (last - first) / (n - 1) as f64;
            (0..n).map(|i| first + step * i as f64).collect()
        }
    }
}

/// `DAT` is `dd/mm/yyyy`, `TIM` is `HH:MM:SS.fff (GMT+h)`; result is UTC.
fn measurement_time(date: &str, time: &str) -> Option<NaiveDateTime> {
    let day = NaiveDate::parse_from_str(date.trim(), "%d/%m/%Y").ok()?;
    let mut parts = time.split_whitespace();
    let clock = NaiveTime::parse_from_str(parts.next()?, "%H:%M:%S%.f").ok()?;
    let gmt_offset_hours = parts
        .next()
        .map(|zone| zone.trim_matches(|c| c == '(' || c == ')'))
        .and_then(|zone| zone.strip_prefix("GMT"))
        .and_then(|h| h.parse::<i64>().ok())
        .unwrap_or(0);
    day.and_time(clock)
        .checked_sub_signed(TimeDelta::try_hours(gmt_offset_hours)?)
}
