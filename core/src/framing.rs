use crate::error::{GhostlinkError, Result};
use crate::{FRAME_MAGIC, FRAME_OVERHEAD};
use sha2::{Digest, Sha256};

/// CRC-32 (IEEE) of the payload, as carried in the frame trailer
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Wrap a payload as `magic || len (u32 BE) || payload || crc32 (u32 BE)`
pub fn build_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
    frame.extend_from_slice(FRAME_MAGIC);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&crc32(payload).to_be_bytes());
    frame
}

/// Validate a frame and return its payload
///
/// Trailing bytes after the checksum are ignored; the decoder routinely hands
/// in a few bytes of FEC/interleave padding past the end of the frame.
pub fn parse_frame(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < FRAME_OVERHEAD {
        return Err(GhostlinkError::TooShort);
    }
    if &data[..3] != FRAME_MAGIC {
        return Err(GhostlinkError::MagicMismatch);
    }

    let declared = u32::from_be_bytes([data[3], data[4], data[5], data[6]]) as usize;
    let available = data.len() - FRAME_OVERHEAD;
    if declared > available {
        return Err(GhostlinkError::Truncated {
            declared,
            available,
        });
    }

    let payload = &data[7..7 + declared];
    let trailer = &data[7 + declared..7 + declared + 4];
    let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = crc32(payload);
    if expected != actual {
        return Err(GhostlinkError::ChecksumMismatch { expected, actual });
    }

    Ok(payload.to_vec())
}

/// Lowercase hex SHA-256 of a framed payload; the dedup key
pub fn frame_hash(frame: &[u8]) -> String {
    Sha256::digest(frame)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
