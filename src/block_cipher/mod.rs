mod key_schedule;
mod sbox;

use crate::number_theory::{BitWidth, Direction, rotate, shift};
use crate::{Error, SymmetricCipher};
use rand::TryRngCore;
use rand::rngs::OsRng;
use sbox::{ROUNDS, SUBSTITUTION_BOXES};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Key size in bytes.
pub const KEY_LEN: usize = 32;

/// Bit `i` of the permuted block is bit `32 * (i % 4) + i / 4` of the input.
const INITIAL_PERMUTATION: [u8; 128] = {
    let mut table = [0u8; 128];
    let mut i = 0;
    while i < 128 {
        table[i] = (32 * (i % 4) + i / 4) as u8;
        i += 1;
    }
    table
};

/// Inverse of [`INITIAL_PERMUTATION`].
const FINAL_PERMUTATION: [u8; 128] = {
    let mut table = [0u8; 128];
    let mut i = 0;
    while i < 128 {
        table[i] = (4 * (i % 32) + i / 32) as u8;
        i += 1;
    }
    table
};

/// A 32-round substitution-permutation network over 128-bit blocks with a 256-bit key.
///
/// Messages are zero-padded to a whole number of blocks and each block is
/// enciphered independently. Decryption strips every trailing zero byte, so a
/// plaintext that legitimately ends in `0x00` does not survive the round trip.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BlockCipher {
    round_keys: [u128; ROUNDS],
}

impl BlockCipher {
    /// Builds a cipher from a 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        let key: &[u8; KEY_LEN] = key.try_into().map_err(|_| {
            Error::InvalidInput(format!(
                "block cipher key must be {KEY_LEN} bytes, got {}",
                key.len()
            ))
        })?;

        Ok(Self {
            round_keys: key_schedule::expand(key),
        })
    }

    /// Generates a random 256-bit key.
    pub fn generate_key() -> Result<Box<[u8; KEY_LEN]>, Error> {
        let mut key = Box::new([0u8; KEY_LEN]);
        OsRng
            .try_fill_bytes(key.as_mut_slice())
            .map_err(|_| Error::Random)?;
        Ok(key)
    }

    /// Enciphers a single block.
    pub fn encrypt_block(&self, block: [u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
        let boxes = &*SUBSTITUTION_BOXES;
        let mut state = permute(u128::from_be_bytes(block), &INITIAL_PERMUTATION);

        for (round, round_key) in self.round_keys.iter().enumerate() {
            state ^= round_key;
            state = boxes.substitute(round, state);
            state = linear_transform(state);
        }

        permute(state, &FINAL_PERMUTATION).to_be_bytes()
    }

    /// Deciphers a single block.
    pub fn decrypt_block(&self, block: [u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
        let boxes = &*SUBSTITUTION_BOXES;
        let mut state = permute(u128::from_be_bytes(block), &INITIAL_PERMUTATION);

        for (round, round_key) in self.round_keys.iter().enumerate().rev() {
            state = inverse_linear_transform(state);
            state = boxes.invert(round, state);
            state ^= round_key;
        }

        permute(state, &FINAL_PERMUTATION).to_be_bytes()
    }
}

impl SymmetricCipher for BlockCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut ciphertext = Vec::with_capacity(plaintext.len().div_ceil(BLOCK_LEN) * BLOCK_LEN);
        for chunk in plaintext.chunks(BLOCK_LEN) {
            let mut block = [0u8; BLOCK_LEN];
            block[..chunk.len()].copy_from_slice(chunk);
            ciphertext.extend_from_slice(&self.encrypt_block(block));
        }
        ciphertext
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(Error::InvalidInput(format!(
                "ciphertext length {} is not a multiple of {BLOCK_LEN}",
                ciphertext.len()
            )));
        }

        let mut plaintext = Vec::with_capacity(ciphertext.len());
        for chunk in ciphertext.chunks_exact(BLOCK_LEN) {
            let mut block = [0u8; BLOCK_LEN];
            block.copy_from_slice(chunk);
            plaintext.extend_from_slice(&self.decrypt_block(block));
        }

        while plaintext.last() == Some(&0) {
            plaintext.pop();
        }
        Ok(plaintext)
    }
}

/// Output bit `i` (most significant first) is input bit `table[i]`.
fn permute(block: u128, table: &[u8; 128]) -> u128 {
    table
        .iter()
        .enumerate()
        .fold(0u128, |acc, (i, &source)| {
            let bit = (block >> (127 - u32::from(source))) & 1;
            acc | (bit << (127 - i))
        })
}

fn rotl(word: u32, amount: u32) -> u32 {
    rotate(u64::from(word), amount, Direction::Left, BitWidth::W32) as u32
}

fn rotr(word: u32, amount: u32) -> u32 {
    rotate(u64::from(word), amount, Direction::Right, BitWidth::W32) as u32
}

fn shl(word: u32, amount: u32) -> u32 {
    shift(u64::from(word), amount, Direction::Left, BitWidth::W32) as u32
}

fn split_lanes(block: u128) -> [u32; 4] {
    [
        (block >> 96) as u32,
        (block >> 64) as u32,
        (block >> 32) as u32,
        block as u32,
    ]
}

fn join_lanes([x0, x1, x2, x3]: [u32; 4]) -> u128 {
    (u128::from(x0) << 96) | (u128::from(x1) << 64) | (u128::from(x2) << 32) | u128::from(x3)
}

fn linear_transform(block: u128) -> u128 {
    let [mut x0, mut x1, mut x2, mut x3] = split_lanes(block);

    x0 = rotl(x0, 13);
    x2 = rotl(x2, 3);
    x1 ^= x0 ^ x2;
    x3 ^= x2 ^ shl(x0, 3);
    x1 = rotl(x1, 1);
    x3 = rotl(x3, 7);
    x0 ^= x1 ^ x3;
    x2 ^= x3 ^ shl(x1, 7);
    x0 = rotl(x0, 5);
    x2 = rotl(x2, 22);

    join_lanes([x0, x1, x2, x3])
}

fn inverse_linear_transform(block: u128) -> u128 {
    let [mut x0, mut x1, mut x2, mut x3] = split_lanes(block);

    x2 = rotr(x2, 22);
    x0 = rotr(x0, 5);
    x2 ^= x3 ^ shl(x1, 7);
    x0 ^= x1 ^ x3;
    x3 = rotr(x3, 7);
    x1 = rotr(x1, 1);
    x3 ^= x2 ^ shl(x0, 3);
    x1 ^= x0 ^ x2;
    x2 = rotr(x2, 3);
    x0 = rotr(x0, 13);

    join_lanes([x0, x1, x2, x3])
}
