//! Deterministic per-identity salt.
//!
//! The salt is mixed into the address derivation so the same external
//! identity always lands on the same on-chain address without a server-side
//! mapping table. It must therefore be reproducible bit-for-bit on any
//! device: no randomness, no I/O, fixed fallback policy.

use crate::zklogin::claim::IdentityClaim;

/// Identity basis used when the claim carries neither an email nor a subject.
pub const DEFAULT_IDENTITY: &str = "default-user";

/// Derive the salt for a claim: `email`, else `sub`, else the fixed sentinel.
#[must_use]
pub fn derive_salt(claim: &IdentityClaim) -> String {
    let basis = claim
        .email
        .as_deref()
        .or(claim.subject_id.as_deref())
        .unwrap_or(DEFAULT_IDENTITY);

    hashcode(basis)
}

/// Classic `h = h * 31 + code` rolling hash over UTF-16 code units with
/// 32-bit wraparound, reinterpreted as unsigned and rendered in decimal.
/// The exact arithmetic is normative: existing addresses depend on it.
fn hashcode(s: &str) -> String {
    let mut hash: i32 = 0;
    for unit in s.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    (hash as u32).to_string()
}
