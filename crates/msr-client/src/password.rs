//! Random passwords for accounts created without one.

use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ123456789!@#$";

/// Generates a random password of `len` characters.
///
/// # Examples
///
/// ```
/// let password = msr_client::generate_password(16);
/// assert_eq!(password.len(), 16);
/// ```
#[must_use]
pub fn generate_password(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}
