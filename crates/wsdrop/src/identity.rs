//! Client identity and remote file names.
//!
//! Both carry a random suffix. Randomness comes in through [`Entropy`] so
//! the protocol layer stays deterministic under test.

use std::path::Path;

use rand::Rng;

/// Source of random suffixes.
pub trait Entropy: Send + Sync {
    /// A value in `0..bound`. `bound` is never 0.
    fn below(&self, bound: u32) -> u32;
}

/// Thread-local RNG from `rand`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn below(&self, bound: u32) -> u32 {
        rand::thread_rng().gen_range(0..bound)
    }
}

/// Always yields the same value (modulo `bound`).
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy(pub u32);

impl Entropy for FixedEntropy {
    fn below(&self, bound: u32) -> u32 {
        self.0 % bound
    }
}

fn suffix(entropy: &dyn Entropy, range: u32) -> Option<u32> {
    (range > 0).then(|| entropy.below(range))
}

/// `"<name> <n>"`, or just `name` when `range` is 0.
pub fn client_identity(name: &str, entropy: &dyn Entropy, range: u32) -> String {
    match suffix(entropy, range) {
        Some(n) => format!("{name} {n}"),
        None => name.to_string(),
    }
}

/// The name the peer stores the file under.
///
/// A non-empty `configured` name wins. Otherwise `<stem><n>.<ext>` is derived
/// from the local path, e.g. `test.txt` → `test42.txt`.
pub fn remote_file_name(
    local: &Path,
    configured: &str,
    entropy: &dyn Entropy,
    range: u32,
) -> String {
    if !configured.is_empty() {
        return configured.to_string();
    }
    let stem = local
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("file");
    let n = suffix(entropy, range)
        .map(|n| n.to_string())
        .unwrap_or_default();
    match local.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}{n}.{ext}"),
        None => format!("{stem}{n}"),
    }
}
