/// A cursor for reading bytes from a buffer.
///
/// The callers are expected to check the remaining length before reading, typically
/// via the `ensure_size!` family of macros.
#[derive(Clone, Debug)]
pub struct ReadCursor<'a> {
    inner: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    /// Creates a new `ReadCursor` from a byte slice.
    #[inline]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { inner: bytes, pos: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    pub const fn len(&self) -> usize {
        self.inner.len() - self.pos
    }

    /// Returns `true` if there are no bytes remaining.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if there are no bytes remaining.
    #[inline]
    pub const fn eof(&self) -> bool {
        self.is_empty()
    }

    /// Returns a slice of the remaining bytes.
    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        let idx = core::cmp::min(self.pos, self.inner.len());
        &self.inner[idx..]
    }

    /// Returns the current position.
    #[inline]
    pub const fn pos(&self) -> usize {
        self.pos
    }

    /// Reads an array of `N` bytes.
    #[inline]
    #[track_caller]
    pub fn read_array<const N: usize>(&mut self) -> [u8; N] {
        let bytes = &self.inner[self.pos..self.pos + N];
        self.pos += N;
        bytes.try_into().expect("N-elements array")
    }

    /// Reads a slice of `n` bytes.
    #[inline]
    #[track_caller]
    pub fn read_slice(&mut self, n: usize) -> &'a [u8] {
        let bytes = &self.inner[self.pos..self.pos + n];
        self.pos += n;
        bytes
    }

    /// Reads the remaining bytes.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        self.read_slice(self.len())
    }

    /// Reads a `u8`.
    #[inline]
    #[track_caller]
    pub fn read_u8(&mut self) -> u8 {
        self.read_array::<1>()[0]
    }

    /// Reads a `u16` in big-endian.
    #[inline]
    #[track_caller]
    pub fn read_u16_be(&mut self) -> u16 {
        u16::from_be_bytes(self.read_array::<2>())
    }

    /// Reads a `u32` in big-endian.
    #[inline]
    #[track_caller]
    pub fn read_u32_be(&mut self) -> u32 {
        u32::from_be_bytes(self.read_array::<4>())
    }

    /// Reads an `i32` in big-endian.
    #[inline]
    #[track_caller]
    pub fn read_i32_be(&mut self) -> i32 {
        i32::from_be_bytes(self.read_array::<4>())
    }

    /// Peeks a `u8` without consuming it.
    #[inline]
    #[track_caller]
    pub fn peek_u8(&self) -> u8 {
        self.inner[self.pos]
    }

    /// Advances the cursor by `len` bytes.
    #[inline]
    #[track_caller]
    pub fn advance(&mut self, len: usize) {
        self.pos += len;
    }
}

/// A cursor for writing bytes to a buffer.
#[derive(Debug)]
pub struct WriteCursor<'a> {
    inner: &'a mut [u8],
    pos: usize,
}

impl<'a> WriteCursor<'a> {
    /// Creates a new `WriteCursor` from a mutable slice of bytes.
    #[inline]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { inner: bytes, pos: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    pub const fn len(&self) -> usize {
        self.inner.len() - self.pos
    }

    /// Returns `true` if there are no bytes remaining.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current position of the cursor.
    #[inline]
    pub const fn pos(&self) -> usize {
        self.pos
    }

    /// Writes an array of bytes to the buffer.
    #[inline]
    #[track_caller]
    pub fn write_array<const N: usize>(&mut self, array: [u8; N]) {
        self.inner[self.pos..self.pos + N].copy_from_slice(&array);
        self.pos += N;
    }

    /// Writes a slice of bytes to the buffer.
    #[inline]
    #[track_caller]
    pub fn write_slice(&mut self, slice: &[u8]) {
        let n = slice.len();
        self.inner[self.pos..self.pos + n].copy_from_slice(slice);
        self.pos += n;
    }

    /// Writes a byte to the buffer.
    #[inline]
    #[track_caller]
    pub fn write_u8(&mut self, value: u8) {
        self.write_array([value])
    }

    /// Writes a big-endian `u16` to the buffer.
    #[inline]
    #[track_caller]
    pub fn write_u16_be(&mut self, value: u16) {
        self.write_array(value.to_be_bytes())
    }

    /// Writes a big-endian `u32` to the buffer.
    #[inline]
    #[track_caller]
    pub fn write_u32_be(&mut self, value: u32) {
        self.write_array(value.to_be_bytes())
    }

    /// Writes a big-endian `i32` to the buffer.
    #[inline]
    #[track_caller]
    pub fn write_i32_be(&mut self, value: i32) {
        self.write_array(value.to_be_bytes())
    }

    /// Writes `n` zero bytes to the buffer.
    #[inline]
    #[track_caller]
    pub fn write_padding(&mut self, n: usize) {
        self.inner[self.pos..self.pos + n].fill(0);
        self.pos += n;
    }
}
