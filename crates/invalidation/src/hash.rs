//! Digest helpers shared by key combination and generator seeding

use sha2::{Digest, Sha256};

/// Hash a sequence of strings into a lowercase hex SHA-256 digest.
///
/// Every item is followed by a NUL byte so that `["ab", "c"]` and `["a", "bc"]`
/// hash differently. The digest is order-sensitive; callers that need an
/// order-independent result sort their input first.
pub fn hash_all<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for item in items {
        hasher.update(item.as_ref().as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
