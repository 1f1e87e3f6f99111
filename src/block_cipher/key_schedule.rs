use super::sbox::ROUNDS;
use super::KEY_LEN;
use crate::number_theory::{BitWidth, Direction, rotate};

/// Fractional part of the golden ratio, mixed into every expanded word.
const GOLDEN_RATIO: u32 = 0x9e37_79b9;

const KEY_WORDS: usize = KEY_LEN / 4;
const EXPANDED_WORDS: usize = 4 * ROUNDS;

/// Expands a 256-bit key into one 128-bit key per round.
///
/// The first eight words are the key itself; every later word is
/// `rotl11(w[i-8] ^ w[i-5] ^ w[i-3] ^ w[i-1] ^ phi ^ i)`. Each run of four words
/// forms one round key, most significant word first.
pub(super) fn expand(key: &[u8; KEY_LEN]) -> [u128; ROUNDS] {
    let mut words = [0u32; EXPANDED_WORDS];
    for (word, bytes) in words.iter_mut().zip(key.chunks_exact(4)) {
        *word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }

    for i in KEY_WORDS..EXPANDED_WORDS {
        let mixed = words[i - 8] ^ words[i - 5] ^ words[i - 3] ^ words[i - 1] ^ GOLDEN_RATIO ^ i as u32;
        words[i] = rotate(u64::from(mixed), 11, Direction::Left, BitWidth::W32) as u32;
    }

    let mut round_keys = [0u128; ROUNDS];
    for (round_key, group) in round_keys.iter_mut().zip(words.chunks_exact(4)) {
        *round_key = group
            .iter()
            .fold(0u128, |acc, &word| (acc << 32) | u128::from(word));
    }
    round_keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_round_keys_are_the_key() {
        let key: [u8; KEY_LEN] = core::array::from_fn(|i| i as u8);
        let round_keys = expand(&key);

        assert_eq!(round_keys[0].to_be_bytes().as_slice(), &key[..16]);
        assert_eq!(round_keys[1].to_be_bytes().as_slice(), &key[16..]);
    }

    #[test]
    fn test_expansion_regression() {
        let round_keys = expand(&[0u8; KEY_LEN]);
        // w[8] = rotl11(phi ^ 8)
        assert_eq!((round_keys[2] >> 96) as u32, 0xbbcd_8cf1);
    }

    #[test]
    fn test_expansion_is_deterministic_and_key_sensitive() {
        let mut key = [7u8; KEY_LEN];
        let first = expand(&key);
        assert_eq!(first, expand(&key));

        key[31] ^= 1;
        let second = expand(&key);
        assert_ne!(first[ROUNDS - 1], second[ROUNDS - 1]);
    }
}
