//! Best-effort wiping of sensitive buffers.
//!
//! These helpers overwrite plaintext and ciphertext buffers before they
//! are dropped. They are defense-in-depth, not a guarantee: Rust may
//! have copied the data during moves or reallocations, and those copies
//! are out of reach. Key material gets the stronger treatment via
//! [`crate::crypto::MasterKey`], which zeroizes on drop.
//!
//! None of these functions can fail.

use std::collections::BTreeMap;

use zeroize::Zeroize;

/// Overwrite a string's bytes with zeros and truncate it.
pub fn wipe_string(s: &mut String) {
    s.zeroize();
}

/// Overwrite a byte buffer with zeros.
pub fn wipe_bytes(b: &mut [u8]) {
    b.zeroize();
}

/// Overwrite every value in a string map, then empty the map.
///
/// Keys are secret *names*, not secret material, so they are left alone.
pub fn wipe_map(m: &mut BTreeMap<String, String>) {
    for value in m.values_mut() {
        value.zeroize();
    }
    m.clear();
}
