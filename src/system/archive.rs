// src/system/archive.rs

//! Gzip framing of backup archives.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read, Write};

/// Compresses `bytes` at the best compression level.
pub fn gzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Decompresses a gzip stream.
pub fn gunzip(compressed: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_output_is_a_gzip_stream() {
        let payload = br#"{"dashboards":[]}"#.repeat(64);
        let compressed = gzip(&payload).unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert!(compressed.len() < payload.len());
        assert_eq!(gunzip(&compressed).unwrap(), payload);
    }

    #[test]
    fn test_gunzip_rejects_plain_data() {
        assert!(gunzip(b"{\"not\": \"gzipped\"}").is_err());
    }
}
