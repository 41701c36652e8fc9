//! The "crc32-style, seed=1" checksum primitive (`SPEC_FULL.md §4.1`).
//!
//! Seeding a CRC-32 at 1 rather than the usual `0xFFFFFFFF` is unusual for CRC-32 proper and is
//! in fact the Adler-32 initial value; the primitive is specified here only as a call boundary
//! (it's an out-of-scope collaborator per `SPEC_FULL.md §1`), so this is a concrete stand-in
//! rather than a claim of bit-for-bit compatibility with a real EWF reader.

use crc32fast::Hasher;

/// Computes the checksum over `data` with the initial state fixed at 1.
pub fn crc32_seed1(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new_with_initial(1);
    hasher.update(data);
    hasher.finalize()
}
