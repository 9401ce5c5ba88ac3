/*!
RAM module: the console's 64 KiB main memory.

Every address the CPU can form is 16 bits wide, so the whole address space
is backed and nothing is ever out of range. Zero-page accesses are the same
memory restricted to $0000-$00FF by masking at the call site.

This module provides a small, hot-path-friendly API for reading and writing
bytes and big-endian words, plus a wrapping bulk load used to install boot
images and serve ROM paging.
*/

/// Size of main memory (in bytes).
pub const RAM_SIZE: usize = 0x1_0000;

/// 64 KiB main memory.
pub struct Ram {
    data: Box<[u8; RAM_SIZE]>,
}

impl Default for Ram {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ram").field("len", &RAM_SIZE).finish()
    }
}

impl Ram {
    /// Create a new RAM instance initialized to 0.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: Box::new([0; RAM_SIZE]),
        }
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        self.data[addr as usize] = value;
    }

    /// Read a big-endian word; the second byte wraps within `mask`.
    #[inline]
    pub fn read_word_masked(&self, addr: u16, mask: u16) -> u16 {
        let hi = self.read(addr & mask) as u16;
        let lo = self.read(addr.wrapping_add(1) & mask) as u16;
        (hi << 8) | lo
    }

    /// Big-endian word read wrapping at 64 KiB.
    #[inline]
    pub fn read_word(&self, addr: u16) -> u16 {
        self.read_word_masked(addr, 0xFFFF)
    }

    /// Big-endian word write wrapping at 64 KiB.
    #[inline]
    pub fn write_word(&mut self, addr: u16, value: u16) {
        self.write(addr, (value >> 8) as u8);
        self.write(addr.wrapping_add(1), value as u8);
    }

    /// Copy `bytes` into memory starting at `offset`, wrapping at 64 KiB.
    ///
    /// Only the last `RAM_SIZE` bytes of an oversized slice survive, exactly
    /// as if each byte had been written in order.
    pub fn load(&mut self, offset: u16, bytes: &[u8]) {
        let mut dst = offset as usize;
        for chunk in bytes.chunks(RAM_SIZE) {
            let mut rest = chunk;
            while !rest.is_empty() {
                let n = rest.len().min(RAM_SIZE - dst);
                self.data[dst..dst + n].copy_from_slice(&rest[..n]);
                dst = (dst + n) % RAM_SIZE;
                rest = &rest[n..];
            }
        }
    }

    /// Expose the internal slice (read-only). Useful for diagnostics or hashing.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }
}
