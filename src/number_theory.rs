use crate::Error;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::RngCore;
use std::str::FromStr;

/// Miller-Rabin witnesses used when the caller does not pick a count.
pub const DEFAULT_PRIMALITY_ROUNDS: usize = 10;

const SMALL_PRIMES: [u32; 25] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Greatest common divisor by iterative Euclid.
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    let mut a = a.clone();
    let mut b = b.clone();
    while !b.is_zero() {
        let remainder = &a % &b;
        a = b;
        b = remainder;
    }
    a
}

/// Inverse of `a` modulo `m` in `[0, m)`, or `None` when `gcd(a, m) != 1`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() || !gcd(a, m).is_one() {
        return None;
    }

    let modulus = BigInt::from(m.clone());
    let (mut old_r, mut r) = (BigInt::from(a % m), modulus.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());

    while !r.is_zero() {
        let quotient = &old_r / &r;
        let next_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    old_s.mod_floor(&modulus).to_biguint()
}

/// Uniform integer in `[0, bound)`. Returns zero for a zero bound.
pub(crate) fn random_below(bound: &BigUint) -> BigUint {
    if bound.is_zero() {
        return BigUint::zero();
    }

    let bits = bound.bits();
    let len = bits.div_ceil(8) as usize;
    let excess = len as u64 * 8 - bits;
    let mut buf = vec![0u8; len];
    let mut rng = rand::rng();

    loop {
        rng.fill_bytes(&mut buf);
        buf[0] &= 0xffu8 >> excess;
        let candidate = BigUint::from_bytes_be(&buf);
        if &candidate < bound {
            return candidate;
        }
    }
}

/// Uniform integer in `[low, high)`.
pub(crate) fn random_in_range(low: &BigUint, high: &BigUint) -> BigUint {
    if high <= low {
        return low.clone();
    }
    low + random_below(&(high - low))
}

/// Miller-Rabin with [`DEFAULT_PRIMALITY_ROUNDS`] random witnesses.
pub fn is_prime(n: &BigUint) -> bool {
    is_probable_prime(n, DEFAULT_PRIMALITY_ROUNDS)
}

/// Miller-Rabin with `rounds` random witnesses.
///
/// A composite passes with probability at most `4^-rounds`. Primes are never rejected.
pub fn is_probable_prime(n: &BigUint, rounds: usize) -> bool {
    let two = BigUint::from(2u32);
    if n < &two {
        return false;
    }

    for small in SMALL_PRIMES {
        let small = BigUint::from(small);
        if *n == small {
            return true;
        }
        if (n % &small).is_zero() {
            return false;
        }
    }

    let n_minus_one = n - BigUint::one();
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for _ in 0..rounds {
        let a = random_in_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }

        for _ in 1..s {
            x = (&x * &x) % n;
            if x == n_minus_one {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

/// Samples odd integers of exactly `bits` bits until one passes Miller-Rabin.
pub fn generate_prime(bits: u64, rounds: usize) -> Result<BigUint, Error> {
    if bits < 2 {
        return Err(Error::InvalidInput(format!(
            "cannot generate a prime of {bits} bits"
        )));
    }
    if rounds == 0 {
        return Err(Error::InvalidInput(
            "primality testing needs at least one round".to_string(),
        ));
    }

    let len = bits.div_ceil(8) as usize;
    let excess = len as u64 * 8 - bits;
    let top_bit = BigUint::one() << (bits - 1);
    let mut buf = vec![0u8; len];
    let mut rng = rand::rng();
    let mut attempts = 0u64;

    loop {
        attempts += 1;
        rng.fill_bytes(&mut buf);
        buf[0] &= 0xffu8 >> excess;

        let mut candidate = BigUint::from_bytes_be(&buf);
        candidate |= &top_bit;
        candidate |= BigUint::one();

        if is_probable_prime(&candidate, rounds) {
            tracing::debug!(bits, attempts, "generated probable prime");
            return Ok(candidate);
        }
    }
}

/// Direction of a rotation or shift.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Towards the most significant bit.
    Left,
    /// Towards the least significant bit.
    Right,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(Error::InvalidInput(format!(
                "unsupported direction `{other}`"
            ))),
        }
    }
}

/// Width of a fixed-size bit vector, between 1 and 64 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitWidth(u32);

impl BitWidth {
    /// A 32-bit lane.
    pub const W32: BitWidth = BitWidth(32);

    /// Validates a bit width.
    pub fn new(bits: u32) -> Result<Self, Error> {
        if bits == 0 || bits > 64 {
            return Err(Error::InvalidInput(format!(
                "bit width must be within 1..=64, got {bits}"
            )));
        }
        Ok(Self(bits))
    }

    /// Number of bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    fn mask(self) -> u64 {
        if self.0 == 64 {
            u64::MAX
        } else {
            (1u64 << self.0) - 1
        }
    }
}

/// Circular rotation of the low `width` bits of `value`.
pub fn rotate(value: u64, amount: u32, direction: Direction, width: BitWidth) -> u64 {
    let mask = width.mask();
    let value = value & mask;
    let amount = amount % width.0;
    if amount == 0 {
        return value;
    }

    let rotated = match direction {
        Direction::Left => (value << amount) | (value >> (width.0 - amount)),
        Direction::Right => (value >> amount) | (value << (width.0 - amount)),
    };
    rotated & mask
}

/// Zero-filling shift of the low `width` bits of `value`.
pub fn shift(value: u64, amount: u32, direction: Direction, width: BitWidth) -> u64 {
    let mask = width.mask();
    if amount >= width.0 {
        return 0;
    }

    match direction {
        Direction::Left => (value << amount) & mask,
        Direction::Right => (value & mask) >> amount,
    }
}
