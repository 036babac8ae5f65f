//! Metadata recorded on every uploaded object.
//!
//! `CachedLength` holds the original (pre-compression) byte length and
//! `CachedLastModified` the cache file's modification time as a Windows file
//! time: 100 ns ticks since 1601-01-01 UTC, both as decimal strings.

use blobdir_store::Metadata;
use chrono::{DateTime, Utc};

/// Metadata key for the uncompressed length.
pub const CACHED_LENGTH: &str = "CachedLength";

/// Metadata key for the original modification time.
pub const CACHED_LAST_MODIFIED: &str = "CachedLastModified";

/// Seconds between 1601-01-01 and 1970-01-01.
const FILE_TIME_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

const TICKS_PER_SECOND: i64 = 10_000_000;

/// Convert a timestamp to file-time ticks.
pub fn to_file_time(time: DateTime<Utc>) -> i64 {
    (time.timestamp() + FILE_TIME_EPOCH_OFFSET_SECS) * TICKS_PER_SECOND
        + i64::from(time.timestamp_subsec_nanos() / 100)
}

/// Convert file-time ticks back to a timestamp.
pub fn from_file_time(ticks: i64) -> Option<DateTime<Utc>> {
    let secs = ticks.div_euclid(TICKS_PER_SECOND) - FILE_TIME_EPOCH_OFFSET_SECS;
    let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Parsed view of the cache metadata on a remote object.
///
/// Either field may be missing: a crash between upload and the metadata
/// update leaves the object without them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheMetadata {
    pub length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl CacheMetadata {
    /// Read both keys, ignoring values that do not parse.
    pub fn parse(metadata: &Metadata) -> Self {
        Self {
            length: metadata.get(CACHED_LENGTH).and_then(|v| v.parse().ok()),
            last_modified: metadata
                .get(CACHED_LAST_MODIFIED)
                .and_then(|v| v.parse().ok())
                .and_then(from_file_time),
        }
    }

    /// Build the metadata map written after an upload.
    pub fn encode(length: u64, last_modified: DateTime<Utc>) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert(CACHED_LENGTH.to_string(), length.to_string());
        metadata.insert(
            CACHED_LAST_MODIFIED.to_string(),
            to_file_time(last_modified).to_string(),
        );
        metadata
    }
}
