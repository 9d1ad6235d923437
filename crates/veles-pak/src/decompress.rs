//! Decompression of entry data.

use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};

use crate::{CompressionMethod, Error, Result};

/// Zstandard frame magic.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Decompress Zlib-framed data with known output size.
pub fn decompress_zlib_sized(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(expected_size);
    let mut decoder = ZlibDecoder::new(data);
    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::Decompression(e.to_string()))?;
    Ok(output)
}

/// Decompress gzip-framed data with known output size.
pub fn decompress_gzip_sized(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(expected_size);
    let mut decoder = GzDecoder::new(data);
    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::Decompression(e.to_string()))?;
    Ok(output)
}

/// Decompress Zstandard data with known output size.
pub fn decompress_zstd_sized(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(expected_size);
    let mut decoder = zstd::Decoder::new(data).map_err(|e| Error::Decompression(e.to_string()))?;
    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::Decompression(e.to_string()))?;
    Ok(output)
}

/// Decompress entry data according to its resolved method.
///
/// The `Detect` sentinel sniffs the compressor from the leading bytes:
/// a Zstandard frame magic selects zstd, a Zlib header byte selects zlib.
pub fn decompress(method: &CompressionMethod, data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::Store => Ok(data.to_vec()),
        CompressionMethod::Named(name) => {
            if name.eq_ignore_ascii_case("zlib") {
                decompress_zlib_sized(data, expected_size)
            } else if name.eq_ignore_ascii_case("gzip") {
                decompress_gzip_sized(data, expected_size)
            } else if name.eq_ignore_ascii_case("zstd") {
                decompress_zstd_sized(data, expected_size)
            } else {
                Err(Error::Decompression(format!(
                    "no decompressor for method \"{name}\""
                )))
            }
        }
        CompressionMethod::Detect => {
            if data.len() >= 4 && data[..4] == ZSTD_MAGIC {
                decompress_zstd_sized(data, expected_size)
            } else if data.first() == Some(&0x78) {
                decompress_zlib_sized(data, expected_size)
            } else {
                Err(Error::Decompression(
                    "could not detect compression method from content".into(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zlib_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_zlib_roundtrip() {
        let original = b"Hello, World! This is a test of Zlib compression.";
        let compressed = zlib_compress(original);
        let decompressed = decompress_zlib_sized(&compressed, original.len()).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_zstd_roundtrip() {
        let original = b"Hello, World! This is a test of Zstandard compression.";
        let compressed = zstd::encode_all(&original[..], 3).unwrap();
        let decompressed = decompress_zstd_sized(&compressed, original.len()).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_detect_sentinel() {
        let original = b"detect me if you can";

        let zlib = zlib_compress(original);
        assert_eq!(
            decompress(&CompressionMethod::Detect, &zlib, original.len()).unwrap(),
            original
        );

        let zstd_data = zstd::encode_all(&original[..], 3).unwrap();
        assert_eq!(
            decompress(&CompressionMethod::Detect, &zstd_data, original.len()).unwrap(),
            original
        );

        assert!(decompress(&CompressionMethod::Detect, b"\xFFgarbage", 7).is_err());
    }

    #[test]
    fn test_unknown_named_method() {
        let result = decompress(&CompressionMethod::Named("Oodle".into()), b"data", 4);
        assert!(matches!(result, Err(Error::Decompression(_))));
    }
}
