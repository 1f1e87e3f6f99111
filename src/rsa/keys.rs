use crate::{Error, SignatureVerifier, Signer};
use crate::digest::Sha256;
use crate::number_theory::{generate_prime, mod_inverse};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::fmt;

/// Fixed public exponent.
pub const PUBLIC_EXPONENT: u32 = 65537;

/// The public half `(n, e)` of an RSA key pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    modulus: BigUint,
    exponent: BigUint,
}

fn check_modulus(modulus: &BigUint) -> Result<(), Error> {
    if modulus.is_zero() {
        return Err(Error::InvalidInput("RSA modulus is zero".to_string()));
    }
    Ok(())
}

impl PublicKey {
    /// Creates a public key from its modulus and exponent. The modulus must be non-zero.
    pub fn new(modulus: BigUint, exponent: BigUint) -> Result<Self, Error> {
        check_modulus(&modulus)?;
        Ok(Self { modulus, exponent })
    }

    /// The modulus `n`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// The public exponent `e`.
    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }
}

impl SignatureVerifier for PublicKey {
    type Signature = BigUint;

    /// Checks a hash-then-exponentiate signature over `message`.
    fn verify(&self, message: &[u8], signature: &BigUint) -> bool {
        if signature >= &self.modulus {
            return false;
        }
        let expected = message_representative(message, &self.modulus);
        signature.modpow(&self.exponent, &self.modulus) == expected
    }
}

/// The private half `(n, d)` of an RSA key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    modulus: BigUint,
    exponent: BigUint,
}

impl PrivateKey {
    pub fn new(modulus: BigUint, exponent: BigUint) -> Result<Self, Error> {
        check_modulus(&modulus)?;
        Ok(Self { modulus, exponent })
    }

    /// The modulus `n`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// The private exponent `d`.
    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }
}

impl Signer for PrivateKey {
    type Signature = BigUint;

    /// Signs the SHA-256 digest of `message` with the private exponent.
    fn sign(&self, message: &[u8]) -> BigUint {
        message_representative(message, &self.modulus).modpow(&self.exponent, &self.modulus)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("modulus_bits", &self.modulus.bits())
            .finish_non_exhaustive()
    }
}

/// The digest of `message` as an integer, reduced below `modulus`.
fn message_representative(message: &[u8], modulus: &BigUint) -> BigUint {
    BigUint::from_bytes_be(Sha256::digest(message).as_bytes()) % modulus
}

/// An RSA key pair with `n = p * q` and `d = e^-1 mod (p - 1)(q - 1)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Generates a key pair from two independent primes of `prime_bits` bits each.
    ///
    /// Retries with fresh primes in the rare case that `e` is not invertible.
    pub fn generate(prime_bits: u64, primality_rounds: usize) -> Result<Self, Error> {
        if prime_bits < 64 {
            return Err(Error::InvalidInput(format!(
                "RSA primes must be at least 64 bits, got {prime_bits}"
            )));
        }

        let exponent = BigUint::from(PUBLIC_EXPONENT);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let p = generate_prime(prime_bits, primality_rounds)?;
            let q = generate_prime(prime_bits, primality_rounds)?;
            if p == q {
                continue;
            }

            let phi = (&p - BigUint::one()) * (&q - BigUint::one());
            let Some(private_exponent) = mod_inverse(&exponent, &phi) else {
                tracing::debug!(attempts, "public exponent not invertible, retrying");
                continue;
            };

            let modulus = p * q;
            tracing::debug!(modulus_bits = modulus.bits(), attempts, "generated RSA key pair");

            return Ok(Self {
                public: PublicKey::new(modulus.clone(), exponent)?,
                private: PrivateKey::new(modulus, private_exponent)?,
            });
        }
    }

    /// Reassembles a key pair from its halves. Both halves must share a modulus.
    pub fn from_parts(public: PublicKey, private: PrivateKey) -> Result<Self, Error> {
        if public.modulus != private.modulus {
            return Err(Error::InvalidInput(
                "public and private keys have different moduli".to_string(),
            ));
        }
        Ok(Self { public, private })
    }

    /// The public half.
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// The private half.
    pub fn private(&self) -> &PrivateKey {
        &self.private
    }

    /// `d^e mod n`: a public stand-in for the private exponent, checked by the
    /// proof of knowledge.
    pub fn proof_witness(&self) -> BigUint {
        self.private
            .exponent
            .modpow(&self.public.exponent, &self.public.modulus)
    }
}
