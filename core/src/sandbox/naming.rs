//! Deterministic, collision-free sandbox directory names.
//!
//! A repo source is mapped to a single path component by keeping lowercase
//! ASCII letters, digits, `-` and non-leading `.` verbatim and escaping every
//! other byte as `_xx` (lowercase hex). Since `_` itself is always escaped, the
//! mapping is injective: two different sources never share a directory.
//! Uppercase letters are escaped too, so names stay distinct on
//! case-insensitive filesystems.
//!
//! Names longer than [`MAX_DIR_NAME_LEN`] are cut and end in `_z` plus a
//! digest of the full source. `z` is not a hex digit, so no escaped name can
//! end up equal to a hashed one.

use std::path::{Path, PathBuf};

/// Longest directory name produced before falling back to a hashed suffix.
///
/// Most filesystems cap a single component at 255 bytes.
pub const MAX_DIR_NAME_LEN: usize = 200;

/// Separates a truncated name from its digest; never produced by escaping.
const HASH_MARKER: &str = "_z";

/// Returns the filesystem-safe directory name for a repo source.
pub fn sandbox_dir_name(source: &str) -> String {
    let mut name = String::with_capacity(source.len());
    for (i, byte) in source.bytes().enumerate() {
        let keep = byte.is_ascii_lowercase()
            || byte.is_ascii_digit()
            || byte == b'-'
            || (byte == b'.' && i > 0);
        if keep {
            name.push(byte as char);
        } else {
            name.push_str(&format!("_{:02x}", byte));
        }
    }

    if name.len() <= MAX_DIR_NAME_LEN {
        return name;
    }

    // Over-long names keep a readable prefix and a digest of the full source.
    let suffix = format!("{}{:016x}", HASH_MARKER, fnv1a64(source.as_bytes()));
    let mut cut = MAX_DIR_NAME_LEN - suffix.len();
    // Don't split an escape sequence.
    while (cut > 0 && name.as_bytes()[cut - 1] == b'_')
        || (cut > 1 && name.as_bytes()[cut - 2] == b'_')
    {
        cut -= 1;
    }
    name.truncate(cut);
    name.push_str(&suffix);
    name
}

/// Returns the sandbox path for `source` under `root`.
pub fn sandbox_path(root: &Path, source: &str) -> PathBuf {
    root.join(sandbox_dir_name(source))
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}
