//! Content addressing compatible with the remote store's blob ids.
//!
//! The address of `bytes` is `sha1("blob <len>\0" ++ bytes)` in lower-case
//! hex, which is what the hosting API reports as a file's `sha`. Bytes are
//! hashed verbatim: no line-ending normalisation, since the remote does none.

use sha1::{Digest, Sha1};

use sitesync_core::ContentAddress;

/// Compute the content address of `bytes`. Never fails; empty input is valid.
pub fn hash_bytes(bytes: &[u8]) -> ContentAddress {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", bytes.len()).as_bytes());
    hasher.update(bytes);
    ContentAddress(hex::encode(hasher.finalize()))
}
