//! Reference numbers and one-time codes.
//!
//! References are cosmetic: they are printed on receipts and ledger rows but
//! nothing looks them up, so uniqueness is not enforced.

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

/// `FCB<year>-<8 uppercase alphanumerics>`
pub fn transfer_reference(now: DateTime<Utc>) -> String {
    format!("FCB{}-{}", now.year(), random_code(8))
}

/// `AC-<10 uppercase alphanumerics>`, issued when an application is approved.
pub fn access_code() -> String {
    format!("AC-{}", random_code(10))
}
