/// Deterministic query hashing for cache keys.
use sha2::{Digest, Sha256};

/// Compute the cache-key hash for a free-text query: SHA-256 over the
/// normalized query, lowercase hex, always 64 characters.
///
/// Normalization is trim + lowercase + collapse of internal whitespace, so
/// queries differing only in casing or spacing share a cache entry.
/// Punctuation is preserved (removing it can change meaning).
pub fn query_hash(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(query).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
