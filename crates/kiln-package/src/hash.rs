//! Weak content hash
//!
//! A djb2-style multiply-add accumulator (`state = state * 33 + unit`) kept
//! to 96 bits. Input is folded in reverse index order. File contents are
//! folded in fixed [`CHUNK_SIZE`] chunks, each chunk reversed on its own, so
//! a file hashes the same whether it was streamed, transformed in memory or
//! read whole.
//!
//! This is a change fingerprint, not an integrity check.

use std::io::{self, Read, Write};

/// Chunk size used when hashing file contents.
pub const CHUNK_SIZE: usize = 100 * 1024;

const SEED: u128 = 5381;
const MASK: u128 = (1 << 96) - 1;
const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Rolling 96-bit accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hash {
    state: u128,
}

impl Default for Hash {
    fn default() -> Self {
        Self::new()
    }
}

impl Hash {
    pub fn new() -> Self {
        Self { state: SEED }
    }

    /// Fold raw bytes, last byte first.
    pub fn update(&mut self, bytes: &[u8]) {
        let mut state = self.state;
        for &b in bytes.iter().rev() {
            // state < 2^96, so the product cannot overflow u128
            state = (state * 33 + u128::from(b)) & MASK;
        }
        self.state = state;
    }

    /// Fold the UTF-16 code units of a string, last unit first.
    pub fn update_str(&mut self, input: &str) {
        let units: Vec<u16> = input.encode_utf16().collect();
        let mut state = self.state;
        for &unit in units.iter().rev() {
            state = (state * 33 + u128::from(unit)) & MASK;
        }
        self.state = state;
    }

    /// Narrow digest over the low 32 bits (per-file digests)
    pub fn digest32(&self) -> String {
        render(self.state & 0xFFFF_FFFF)
    }

    /// Wide digest over all 96 bits (package identity digests)
    pub fn digest128(&self) -> String {
        render(self.state)
    }
}

fn render(mut value: u128) -> String {
    let mut out = String::new();
    loop {
        out.push(char::from(ALPHABET[(value & 0x3F) as usize]));
        value >>= 6;
        if value == 0 {
            break;
        }
    }
    out
}

/// Hash an in-memory file body using the same chunking as [`hash_reader`].
pub fn hash_bytes(bytes: &[u8]) -> Hash {
    let mut hash = Hash::new();
    for chunk in bytes.chunks(CHUNK_SIZE) {
        hash.update(chunk);
    }
    hash
}

/// Hash everything readable from `reader` in [`CHUNK_SIZE`] chunks.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<Hash> {
    let mut hash = Hash::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let len = fill(&mut reader, &mut buf)?;
        hash.update(&buf[..len]);
        if len < CHUNK_SIZE {
            return Ok(hash);
        }
    }
}

// Short reads must not split a chunk, or the digest would depend on the OS.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Writer adapter that hashes every byte written through it.
///
/// Bytes are buffered into [`CHUNK_SIZE`] chunks so the result matches
/// [`hash_bytes`] over the same content.
pub struct HashingWriter<W: Write> {
    inner: W,
    hash: Hash,
    pending: Vec<u8>,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hash: Hash::new(),
            pending: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    /// Flush the inner writer and return it with the final hash.
    pub fn finish(mut self) -> io::Result<(W, Hash)> {
        self.inner.flush()?;
        self.hash.update(&self.pending);
        Ok((self.inner, self.hash))
    }

    fn absorb(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let room = CHUNK_SIZE - self.pending.len();
            let take = room.min(bytes.len());
            self.pending.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            if self.pending.len() == CHUNK_SIZE {
                self.hash.update(&self.pending);
                self.pending.clear();
            }
        }
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.absorb(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
