//! Content fingerprints: truncated SHA-256 used as a cheap equality proxy.
//!
//! The scheme must match bit-for-bit across implementations:
//! SHA-256 over the UTF-8 bytes, lowercase hex, first [`FINGERPRINT_LEN`]
//! characters. It is applied to section content (merge), whole document
//! content (conflict detection) and the joined specification string (drift).
//! Content is hashed as-is; no line-ending normalisation.

use sha2::{Digest, Sha256};

use docsync_core::Specification;

/// Hex characters kept from the SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 16;

const SPEC_SEPARATOR: &str = "\n---\n";

/// Fingerprint of raw content.
pub fn content_hash(content: &str) -> String {
    let digest = {
        let mut h = Sha256::new();
        h.update(content.as_bytes());
        hex::encode(h.finalize())
    };
    digest[..FINGERPRINT_LEN].to_string()
}

/// Order-independent fingerprint over a set of specifications.
///
/// Specs are sorted ascending by id, each rendered as
/// `ID:<id>|V:<version>|<content>`, joined with `"\n---\n"` and hashed.
/// An empty set yields `""`, which never equals a real fingerprint.
pub fn spec_fingerprint(specs: &[Specification]) -> String {
    if specs.is_empty() {
        return String::new();
    }
    let mut sorted: Vec<&Specification> = specs.iter().collect();
    sorted.sort_by_key(|s| s.id);

    let joined = sorted
        .iter()
        .map(|s| format!("ID:{}|V:{}|{}", s.id, s.version, s.content))
        .collect::<Vec<_>>()
        .join(SPEC_SEPARATOR);
    content_hash(&joined)
}
