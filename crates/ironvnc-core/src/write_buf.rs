/// Max capacity to keep for the inner `Vec<u8>` when `WriteBuf::clear` is called.
const MAX_CAPACITY_WHEN_CLEARED: usize = 16384; // 16 kib

/// Growable buffer backed by a [`Vec<u8>`] that is incrementally filled.
///
/// This type is tracking the filled region and provides methods to
/// grow and write into the unfilled region.
#[derive(Debug, Default)]
pub struct WriteBuf {
    inner: Vec<u8>,
    filled: usize,
}

impl WriteBuf {
    /// Constructs a new, empty `WriteBuf`.
    ///
    /// The underlying buffer will not allocate until bytes are written to it.
    pub const fn new() -> Self {
        Self {
            inner: Vec::new(),
            filled: 0,
        }
    }

    /// Returns length of the filled region.
    pub const fn filled_len(&self) -> usize {
        self.filled
    }

    /// Returns a shared reference to the filled portion of the buffer.
    pub fn filled(&self) -> &[u8] {
        &self.inner[..self.filled]
    }

    /// Ensures the initialized and unfilled portion of the buffer is big enough for `additional` more bytes.
    pub fn initialize(&mut self, additional: usize) {
        if self.inner.len() < self.filled + additional {
            self.inner.resize(self.filled + additional, 0);
        }
    }

    /// Returns a mutable reference to the first `n` bytes of the unfilled part of the buffer,
    /// allocating additional memory as necessary.
    pub fn unfilled_to(&mut self, n: usize) -> &mut [u8] {
        self.initialize(n);
        &mut self.inner[self.filled..self.filled + n]
    }

    /// Writes a slice of bytes into the buffer.
    pub fn write_slice(&mut self, slice: &[u8]) {
        let n = slice.len();
        self.initialize(n);
        self.inner[self.filled..self.filled + n].copy_from_slice(slice);
        self.filled += n;
    }

    /// Writes a byte into the buffer.
    pub fn write_u8(&mut self, value: u8) {
        self.write_slice(&[value]);
    }

    /// Advances the filled region cursor by `len` bytes.
    pub fn advance(&mut self, len: usize) {
        self.filled += len;
    }

    /// Sets the filled cursor to the very beginning of the buffer.
    ///
    /// If the buffer grew big, it is shrunk in order to reclaim memory.
    pub fn clear(&mut self) {
        self.filled = 0;
        if self.inner.len() > MAX_CAPACITY_WHEN_CLEARED {
            self.inner.truncate(MAX_CAPACITY_WHEN_CLEARED);
            self.inner.shrink_to_fit();
        }
    }
}
