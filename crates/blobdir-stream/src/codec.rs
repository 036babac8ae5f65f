//! Compression policy and raw deflate codec.
//!
//! Only index-segment files with a known extension are compressed, and only
//! when the directory has compression enabled. The same fixed extension set
//! applies to every directory.

use std::io::{self, Write};

use flate2::write::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;

/// Extensions of segment files that are deflated before upload.
///
/// Compound file, stored fields data and index, frequencies, term dictionary
/// and term index, norms, term vector index/documents/fields, positions.
pub const COMPRESSED_EXTENSIONS: [&str; 11] = [
    "cfs", "fdt", "fdx", "frq", "tis", "tii", "nrm", "tvx", "tvd", "tvf", "prx",
];

/// Whether `name` is stored compressed. Extension matching is case-sensitive.
pub fn should_compress(name: &str, enabled: bool) -> bool {
    if !enabled {
        return false;
    }
    match name.rsplit_once('.') {
        Some((_, ext)) => COMPRESSED_EXTENSIONS.contains(&ext),
        None => false,
    }
}

/// Deflate `data` into an in-memory buffer.
pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inflate a complete deflate stream.
#[cfg(test)]
pub(crate) fn decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(Vec::new());
    decoder.write_all(data)?;
    decoder.finish()
}

/// Wrap `sink` so that deflate data written to the result is inflated into it.
///
/// Call `finish` on the returned decoder to flush the tail of the stream.
pub fn inflater<W: Write>(sink: W) -> DeflateDecoder<W> {
    DeflateDecoder::new(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn policy_truth_table() {
        assert!(should_compress("segment.fdt", true));
        assert!(!should_compress("segment.fdt", false));
        assert!(!should_compress("segment.txt", true));
        assert!(!should_compress("segment.txt", false));
    }

    #[test]
    fn every_listed_extension_compresses() {
        for ext in COMPRESSED_EXTENSIONS {
            assert!(should_compress(&format!("_0.{ext}"), true), "{ext}");
        }
    }

    #[test]
    fn extension_match_is_exact() {
        assert!(!should_compress("_0.FDT", true));
        assert!(!should_compress("segments_2", true));
        assert!(!should_compress("cfs", true));
        assert!(!should_compress("_0.cfsx", true));
        assert!(should_compress("_0.old.cfs", true));
    }

    #[test]
    fn compresses_repetitive_data() {
        let data = vec![0x42u8; 64 * 1024];
        let packed = compress(&data).unwrap();
        assert!(packed.len() < data.len() / 10);
        assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn empty_roundtrip() {
        let packed = compress(&[]).unwrap();
        assert!(decompress(&packed).unwrap().is_empty());
    }

    #[test]
    fn inflater_streams_into_sink() {
        let packed = compress(b"streamed through the inflater").unwrap();
        let mut out = Vec::new();
        let mut inflate = inflater(&mut out);
        for chunk in packed.chunks(3) {
            inflate.write_all(chunk).unwrap();
        }
        inflate.finish().unwrap();
        assert_eq!(out, b"streamed through the inflater");
    }

    #[test]
    fn garbage_fails_to_inflate() {
        assert!(decompress(&[0xff; 16]).is_err());
    }

    proptest! {
        #[test]
        fn deflate_roundtrip_is_exact(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let packed = compress(&data).unwrap();
            prop_assert_eq!(decompress(&packed).unwrap(), data);
        }
    }
}
