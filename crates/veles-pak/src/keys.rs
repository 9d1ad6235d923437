//! Candidate decryption key parsing.
//!
//! Keys are supplied as literal ASCII strings or `0x`-prefixed hex strings,
//! either directly or through an `@file` argument naming a newline-delimited
//! key list. Order is preserved: recovery tries candidates first to last.

use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// AES key length in bytes.
pub const KEY_LEN: usize = 32;

/// One candidate decryption key, zero-padded to the AES-256 key size.
#[derive(Clone, PartialEq, Eq)]
pub struct AesKey {
    bytes: [u8; KEY_LEN],
}

impl AesKey {
    /// Parse a single key string.
    ///
    /// A `0x` prefix selects hex decoding (even digit count required);
    /// anything else is taken as literal bytes. Leading and trailing
    /// whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();

        let decoded = if trimmed.len() >= 3 && (trimmed.starts_with("0x") || trimmed.starts_with("0X"))
        {
            Self::decode_hex(&trimmed[2..])?
        } else {
            trimmed.as_bytes().to_vec()
        };

        if decoded.len() > KEY_LEN {
            return Err(Error::InvalidKey(format!(
                "key is {} bytes, maximum is {}",
                decoded.len(),
                KEY_LEN
            )));
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes[..decoded.len()].copy_from_slice(&decoded);
        Ok(Self { bytes })
    }

    fn decode_hex(digits: &str) -> Result<Vec<u8>> {
        if digits.len() % 2 != 0 {
            return Err(Error::InvalidKey(
                "hexadecimal key contains an odd number of characters".into(),
            ));
        }

        let mut out = Vec::with_capacity(digits.len() / 2);
        let bytes = digits.as_bytes();
        for pair in bytes.chunks_exact(2) {
            let hi = hex_digit(pair[0])?;
            let lo = hex_digit(pair[1])?;
            out.push((hi << 4) | lo);
        }
        Ok(out)
    }

    /// The padded key bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.write_str("AesKey(..)")
    }
}

fn hex_digit(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(Error::InvalidKey(
            "illegal character in hexadecimal key".into(),
        )),
    }
}

/// Ordered list of candidate keys for index recovery.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: Vec<AesKey>,
}

impl KeyRing {
    /// Create an empty key ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add keys from a command-line style argument.
    ///
    /// `@path` loads one key per line from the named file (blank lines
    /// skipped); anything else is parsed as a single key.
    pub fn add_arg(&mut self, arg: &str) -> Result<()> {
        if let Some(path) = arg.strip_prefix('@') {
            self.add_file(path)
        } else {
            self.keys.push(AesKey::parse(arg)?);
            Ok(())
        }
    }

    /// Add keys from a newline-delimited key file.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            self.keys.push(AesKey::parse(line)?);
        }
        Ok(())
    }

    /// The candidate keys, in supply order.
    #[inline]
    pub fn keys(&self) -> &[AesKey] {
        &self.keys
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_literal_key() {
        let key = AesKey::parse("hunter2").unwrap();
        assert_eq!(&key.bytes()[..7], b"hunter2");
        assert!(key.bytes()[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_parse_hex_key() {
        let key = AesKey::parse("0xDEADbeef").unwrap();
        assert_eq!(&key.bytes()[..4], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_parse_full_length_hex_key() {
        let hex = "0x".to_string() + &"AB".repeat(KEY_LEN);
        let key = AesKey::parse(&hex).unwrap();
        assert!(key.bytes().iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_odd_hex_length_rejected() {
        assert!(matches!(
            AesKey::parse("0xABC"),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_illegal_hex_digit_rejected() {
        assert!(matches!(
            AesKey::parse("0xZZ"),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_overlong_key_rejected() {
        let hex = "0x".to_string() + &"AB".repeat(KEY_LEN + 1);
        assert!(AesKey::parse(&hex).is_err());
    }

    #[test]
    fn test_short_literal_is_not_hex() {
        // "0x" alone is below the 3-char threshold and stays literal.
        let key = AesKey::parse("0x").unwrap();
        assert_eq!(&key.bytes()[..2], b"0x");
    }

    #[test]
    fn test_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first-key").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "0x0102").unwrap();
        file.flush().unwrap();

        let mut ring = KeyRing::new();
        ring.add_arg(&format!("@{}", file.path().display())).unwrap();
        assert_eq!(ring.len(), 2);
        assert_eq!(&ring.keys()[0].bytes()[..9], b"first-key");
        assert_eq!(&ring.keys()[1].bytes()[..2], &[0x01, 0x02]);
    }
}
