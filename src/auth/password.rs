//! Password Hashing
//! Mission: One-way credential hashing with constant-time verification

use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};

/// Minimum accepted password length, in bytes.
///
/// No upper bound and no complexity rule; inherited policy, known to be weak.
const MIN_PASSWORD_LEN: usize = 6;

/// Hash a password with bcrypt at the library's default cost.
pub fn hash_password(plain: &str) -> Result<String> {
    hash(plain, DEFAULT_COST).context("Failed to hash password")
}

/// Verify a password against a bcrypt hash.
///
/// bcrypt's comparison is constant-time with respect to the candidate.
pub fn verify_password(plain: &str, digest: &str) -> Result<bool> {
    verify(plain, digest).context("Failed to verify password")
}

/// Policy check applied before hashing a new password.
pub fn is_acceptable_password(plain: &str) -> bool {
    plain.len() >= MIN_PASSWORD_LEN
}
