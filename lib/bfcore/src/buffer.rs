//! # Byte-buffer primitive
//!
//! A growable, contiguous byte buffer with amortized append and
//! reserve-in-place, backing the compiled artifact while it is assembled.

use alloc::vec::Vec;

/// Upper bound on a buffer's length. Chosen generously above any artifact
/// this compiler could plausibly emit; its only purpose is to turn a
/// runaway input (or an optimizer bug) into a diagnosable error instead of
/// an unbounded allocation.
pub const MAX_LEN: usize = 1 << 40;

/// A growable byte buffer.
///
/// `append` and `reserve` are the only ways to grow the buffer; both behave
/// as if bytes were appended one at a time, just amortized. Exceeding
/// [`MAX_LEN`] or failing to grow the backing allocation are both fatal
/// (§7 category 3): this type aborts the process rather than returning an
/// error, since there is no sensible recovery and no further allocation
/// should be attempted once the allocator itself is in trouble.
#[derive(Default)]
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Appends `bytes` to the end of the buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        self.check_len(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Extends the buffer by `n` bytes (zero-initialized) and returns a
    /// mutable handle to the freshly reserved region. Equivalent to
    /// `append`-ing `n` bytes and then borrowing them back.
    pub fn reserve(&mut self, n: usize) -> &mut [u8] {
        self.check_len(n);
        let start = self.data.len();
        self.data.resize(start + n, 0);
        &mut self.data[start..]
    }

    fn check_len(&self, n: usize) {
        let new_len = self.data.len().checked_add(n).unwrap_or_else(|| fatal_buffer_too_large());
        if new_len > MAX_LEN {
            fatal_buffer_too_large();
        }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

#[cold]
fn fatal_buffer_too_large() -> usize {
    panic!("bfcore: fatal: BufferTooLarge");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_grows_length() {
        let mut buf = Buffer::new();
        buf.append(&[1, 2, 3]);
        buf.append(&[4, 5]);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn reserve_extends_and_returns_the_fresh_region() {
        let mut buf = Buffer::new();
        buf.append(&[0xaa]);
        let region = buf.reserve(4);
        region.copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(buf.as_slice(), &[0xaa, 1, 2, 3, 4]);
    }

    #[test]
    fn reserve_then_append_matches_append_of_reserved_bytes() {
        let mut a = Buffer::new();
        a.reserve(3)[..].copy_from_slice(&[7, 8, 9]);

        let mut b = Buffer::new();
        b.append(&[7, 8, 9]);

        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    #[should_panic(expected = "BufferTooLarge")]
    fn overflow_is_fatal() {
        let mut buf = Buffer::new();
        buf.reserve(MAX_LEN + 1);
    }
}
