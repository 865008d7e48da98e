//! Memory pressure for the real-world emulation.

use std::hint::black_box;

pub const MIB: usize = 1024 * 1024;
const PAGE: usize = 4096;

/// Allocates `mib` MiB and writes one byte per page so the kernel actually
/// backs the whole buffer. The memory is released on return.
pub fn allocate_and_touch(mib: u64) -> usize {
    let bytes = usize::try_from(mib).unwrap_or(usize::MAX).saturating_mul(MIB);
    let mut buffer: Vec<u8> = vec![0u8; bytes];
    for offset in (0..bytes).step_by(PAGE) {
        buffer[offset] = 1;
    }
    black_box(&buffer);
    buffer.len()
}
