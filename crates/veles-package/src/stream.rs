//! Spliced package stream.
//!
//! A split package is stored as two physical files: a header-only file and
//! a data sibling. [`PackageStream`] joins them into one logical byte
//! stream - reads past the header boundary resolve into the sibling with
//! all offsets shifted by the header size.

use std::io::{Read, Seek, SeekFrom};

/// A `Read + Seek` view over a package, optionally spliced with its data
/// sibling.
#[derive(Debug)]
pub struct PackageStream {
    header: Vec<u8>,
    data: Vec<u8>,
    pos: u64,
}

impl PackageStream {
    /// A stream over a self-contained package.
    pub fn new(header: Vec<u8>) -> Self {
        Self {
            header,
            data: Vec::new(),
            pos: 0,
        }
    }

    /// A stream over a header half spliced with its data sibling.
    ///
    /// Logical address `header.len()` maps to address `0` of `data`.
    pub fn spliced(header: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            header,
            data,
            pos: 0,
        }
    }

    /// Size of the header half - the splice boundary.
    #[inline]
    pub fn header_size(&self) -> u64 {
        self.header.len() as u64
    }

    /// Total logical length of the stream.
    #[inline]
    pub fn len(&self) -> u64 {
        (self.header.len() + self.data.len()) as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.data.is_empty()
    }

    /// The header bytes, for summary parsing without a copy.
    #[inline]
    pub fn header_bytes(&self) -> &[u8] {
        &self.header
    }
}

impl Read for PackageStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let boundary = self.header.len() as u64;
        let source: &[u8] = if self.pos < boundary {
            &self.header[self.pos as usize..]
        } else {
            let local = (self.pos - boundary) as usize;
            if local >= self.data.len() {
                return Ok(0);
            }
            &self.data[local..]
        };

        let n = source.len().min(buf.len());
        buf[..n].copy_from_slice(&source[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for PackageStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(p) => p as i128,
            SeekFrom::End(delta) => self.len() as i128 + delta as i128,
            SeekFrom::Current(delta) => self.pos as i128 + delta as i128,
        };
        if new_pos < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ));
        }
        self.pos = new_pos as u64;
        Ok(self.pos)
    }
}
