//! Toroidal bulk memory helpers.
//!
//! Both helpers take a destination buffer whose length is its capacity, an
//! offset and a byte count, and wrap at the end of the buffer instead of
//! stopping. Work is split at the wrap boundaries so each chunk is a single
//! slice operation.

/// Fill `n` bytes of `dst` with `value` starting at `offset`, wrapping.
pub fn circ_fill(dst: &mut [u8], offset: usize, value: u8, n: usize) {
    let size = dst.len();
    if size == 0 {
        return;
    }
    if n >= size {
        dst.fill(value);
        return;
    }
    let mut i = offset % size;
    let mut left = n;
    while left > 0 {
        let a = (size - i).min(left);
        dst[i..i + a].fill(value);
        i = (i + a) % size;
        left -= a;
    }
}

/// Copy `n` bytes from `src` (starting at `src_off`) into `dst` (starting
/// at `dst_off`), each side wrapping at its own length. Later bytes
/// overwrite earlier ones when `n` exceeds the destination.
pub fn circ_copy(dst: &mut [u8], dst_off: usize, src: &[u8], src_off: usize, n: usize) {
    let (ds, ss) = (dst.len(), src.len());
    if ds == 0 || ss == 0 {
        return;
    }
    let mut di = dst_off % ds;
    let mut si = src_off % ss;
    let mut left = n;
    while left > 0 {
        let a = (ds - di).min(ss - si).min(left);
        dst[di..di + a].copy_from_slice(&src[si..si + a]);
        di = (di + a) % ds;
        si = (si + a) % ss;
        left -= a;
    }
}
