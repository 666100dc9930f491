//! Video display metadata read straight from the MP4 container.
//!
//! Only the `moov` box is inspected: `mvhd` for the presentation duration and
//! the first `trak/tkhd` with a non-zero frame size for orientation. Anything
//! unreadable falls back to `VideoMetadata::default()`.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

const ENABLE_LOGS: bool = true;

pub const DEFAULT_DURATION_SECS: u64 = 10;

/// `moov` is small for any sane file; refuse to buffer something absurd.
const MAX_MOOV_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    Landscape,
    Portrait,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub orientation: Orientation,
    pub duration_secs: u64,
}

impl Default for VideoMetadata {
    fn default() -> Self {
        Self {
            orientation: Orientation::Landscape,
            duration_secs: DEFAULT_DURATION_SECS,
        }
    }
}

pub fn video_metadata(path: &Path) -> VideoMetadata {
    match probe(path) {
        Ok(metadata) => metadata,
        Err(err) => {
            crate::log_debug!(
                "Using default metadata for {}: {:#}",
                path.display(),
                err
            );
            VideoMetadata::default()
        }
    }
}

fn probe(path: &Path) -> Result<VideoMetadata> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let moov = read_top_level_box(&mut file, *b"moov")?;

    let mut duration_secs = None;
    let mut frame = None;
    for (kind, payload) in child_boxes(&moov)? {
        match &kind {
            b"mvhd" => duration_secs = parse_mvhd(payload)?,
            b"trak" if frame.is_none() => {
                for (child, body) in child_boxes(payload)? {
                    if &child == b"tkhd" {
                        frame = parse_tkhd(body)?.filter(|(w, h)| *w > 0 && *h > 0);
                    }
                }
            }
            _ => {}
        }
    }

    let orientation = match frame {
        Some((width, height)) if height > width => Orientation::Portrait,
        _ => Orientation::Landscape,
    };

    Ok(VideoMetadata {
        orientation,
        duration_secs: duration_secs.unwrap_or(DEFAULT_DURATION_SECS),
    })
}

/// Walks the file's top-level boxes and buffers the payload of `wanted`.
fn read_top_level_box<R: Read + Seek>(reader: &mut R, wanted: [u8; 4]) -> Result<Vec<u8>> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    let mut offset = 0u64;

    while file_len.saturating_sub(offset) >= 8 {
        reader.seek(SeekFrom::Start(offset))?;
        let mut header = [0u8; 8];
        reader.read_exact(&mut header)?;
        let mut size = u64::from(u32::from_be_bytes([header[0], header[1], header[2], header[3]]));
        let kind = [header[4], header[5], header[6], header[7]];
        let mut header_len = 8u64;

        if size == 1 {
            let mut large = [0u8; 8];
            reader.read_exact(&mut large)?;
            size = u64::from_be_bytes(large);
            header_len = 16;
        } else if size == 0 {
            size = file_len - offset;
        }
        if size < header_len {
            bail!("box at offset {offset} declares size {size}");
        }

        if kind == wanted {
            let payload_len = size - header_len;
            if payload_len > MAX_MOOV_BYTES {
                bail!("'{}' box too large ({payload_len} bytes)", String::from_utf8_lossy(&kind));
            }
            let mut payload = vec![0u8; payload_len as usize];
            reader.read_exact(&mut payload)?;
            return Ok(payload);
        }
        offset = offset
            .checked_add(size)
            .ok_or_else(|| anyhow!("box at offset {offset} overflows with size {size}"))?;
    }

    Err(anyhow!("no '{}' box found", String::from_utf8_lossy(&wanted)))
}

/// Splits an in-memory container payload into `(type, payload)` pairs.
fn child_boxes(data: &[u8]) -> Result<Vec<([u8; 4], &[u8])>> {
    let mut boxes = Vec::new();
    let mut offset = 0usize;

    while data.len().saturating_sub(offset) >= 8 {
        let size = u64::from(u32::from_be_bytes(read_array(data, offset)?));
        let kind: [u8; 4] = read_array(data, offset + 4)?;
        let (size, header_len) = match size {
            0 => (data.len() - offset, 8),
            1 => {
                let large = u64::from_be_bytes(read_array(data, offset + 8)?);
                let large = usize::try_from(large)
                    .map_err(|_| anyhow!("'{}' box size {large} out of range", kind_name(&kind)))?;
                (large, 16)
            }
            n => (n as usize, 8),
        };
        let end = offset
            .checked_add(size)
            .filter(|end| size >= header_len && *end <= data.len())
            .ok_or_else(|| anyhow!("truncated '{}' box", kind_name(&kind)))?;
        boxes.push((kind, &data[offset + header_len..end]));
        offset = end;
    }

    Ok(boxes)
}

fn kind_name(kind: &[u8; 4]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(kind)
}

fn read_array<const N: usize>(data: &[u8], at: usize) -> Result<[u8; N]> {
    at.checked_add(N)
        .and_then(|end| data.get(at..end))
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| anyhow!("unexpected end of box at byte {at}"))
}

/// Whole seconds, rounded up. `None` when the header carries no usable value.
fn parse_mvhd(body: &[u8]) -> Result<Option<u64>> {
    let version = *body.first().ok_or_else(|| anyhow!("empty mvhd"))?;
    let (timescale, duration) = if version == 1 {
        (
            u32::from_be_bytes(read_array(body, 20)?),
            u64::from_be_bytes(read_array(body, 24)?),
        )
    } else {
        (
            u32::from_be_bytes(read_array(body, 12)?),
            u64::from(u32::from_be_bytes(read_array(body, 16)?)),
        )
    };

    if timescale == 0 || duration == 0 {
        return Ok(None);
    }
    Ok(Some(duration.div_ceil(u64::from(timescale))))
}

/// Frame size in whole pixels from the 16.16 fixed-point fields.
fn parse_tkhd(body: &[u8]) -> Result<Option<(u32, u32)>> {
    let version = *body.first().ok_or_else(|| anyhow!("empty tkhd"))?;
    // version/flags + times/ids/duration, then reserved, layer, group, volume,
    // reserved and the 3x3 matrix
    let fixed = if version == 1 { 4 + 32 } else { 4 + 20 };
    let width_at = fixed + 52;
    let width = u32::from_be_bytes(read_array(body, width_at)?) >> 16;
    let height = u32::from_be_bytes(read_array(body, width_at + 4)?) >> 16;
    Ok(Some((width, height)))
}
