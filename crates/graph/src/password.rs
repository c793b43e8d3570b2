//! Temporary password generation for new accounts.

use rand::seq::SliceRandom;
use rand::Rng;

pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%&*";

/// Generate a random password of the given length. At least one character of
/// each class is included so the result satisfies the default Entra ID
/// complexity policy. Lengths below 4 are raised to 4.
pub fn generate_random_password(length: usize) -> String {
    let length = length.max(4);
    let mut rng = rand::thread_rng();
    let classes = [UPPER, LOWER, DIGITS, SYMBOLS];
    let all: Vec<u8> = classes.concat();

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|set| set[rng.gen_range(0..set.len())])
        .collect();
    chars.extend((chars.len()..length).map(|_| all[rng.gen_range(0..all.len())]));

    // the guaranteed characters must not always lead
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}
