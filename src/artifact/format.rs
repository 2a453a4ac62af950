//! Binary container for pipeline artifacts.
//!
//! A pipeline artifact is a 24-byte header followed by a Postcard-encoded
//! payload:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic ("VPPL")
//! 4       1     Version major
//! 5       1     Version minor
//! 6       2     Reserved
//! 8       4     Payload size (bytes, little-endian)
//! 12      4     CRC32 checksum of payload
//! 16      4     Number of features
//! 20      4     Reserved
//! ```
//!
//! The header lets a loader reject foreign files, future format versions,
//! truncation, and bit rot before attempting to decode the payload.

use std::io::{Read, Write};

use super::ArtifactError;

/// Magic bytes identifying a pipeline artifact.
pub const MAGIC: &[u8; 4] = b"VPPL";

/// Current format version (major).
pub const CURRENT_VERSION_MAJOR: u8 = 1;

/// Current format version (minor).
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the artifact header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Parsed artifact header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHeader {
    /// Format version (major).
    pub version_major: u8,
    /// Format version (minor).
    pub version_minor: u8,
    /// Size of the payload in bytes.
    pub payload_size: u32,
    /// CRC32 checksum of the payload.
    pub checksum: u32,
    /// Number of input features.
    pub n_features: u32,
}

impl ArtifactHeader {
    /// Create a header with the current version. Payload size and checksum
    /// are filled in by [`write_artifact`].
    pub fn new(n_features: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            payload_size: 0,
            checksum: 0,
            n_features,
        }
    }

    /// Serialize to the fixed 24-byte layout.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[8..12].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf[16..20].copy_from_slice(&self.n_features.to_le_bytes());
        buf
    }

    /// Parse from the fixed 24-byte layout.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, ArtifactError> {
        if &buf[0..4] != MAGIC {
            return Err(ArtifactError::NotAnArtifact);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(ArtifactError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        Ok(Self {
            version_major,
            version_minor,
            payload_size: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            checksum: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            n_features: u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
        })
    }
}

/// Compute the CRC32 checksum of a payload.
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Write header and payload to a writer.
pub fn write_artifact<W: Write>(
    writer: &mut W,
    n_features: u32,
    payload: &[u8],
) -> Result<(), ArtifactError> {
    let mut header = ArtifactHeader::new(n_features);
    header.payload_size = payload.len() as u32;
    header.checksum = compute_checksum(payload);

    writer.write_all(&header.to_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Read header and payload from a reader, verifying the checksum.
pub fn read_artifact<R: Read>(reader: &mut R) -> Result<(ArtifactHeader, Vec<u8>), ArtifactError> {
    let mut header_buf = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ArtifactError::Truncated {
                expected: HEADER_SIZE,
                actual: 0,
            }
        } else {
            ArtifactError::Io(e)
        }
    })?;
    let header = ArtifactHeader::from_bytes(&header_buf)?;

    let mut payload = vec![0u8; header.payload_size as usize];
    reader.read_exact(&mut payload).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ArtifactError::Truncated {
                expected: header.payload_size as usize,
                actual: 0,
            }
        } else {
            ArtifactError::Io(e)
        }
    })?;

    let actual = compute_checksum(&payload);
    if actual != header.checksum {
        return Err(ArtifactError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    Ok((header, payload))
}
