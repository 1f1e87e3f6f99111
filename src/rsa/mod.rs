mod keys;
pub use keys::*;

use crate::{AsymmetricCipher, Error};
use num_bigint::BigUint;

/// Marker byte prepended to every plaintext so leading zero bytes survive the
/// integer conversion.
const FRAME_MARKER: u8 = 0x01;

fn exponentiate_framed(
    plaintext: &[u8],
    exponent: &BigUint,
    modulus: &BigUint,
) -> Result<BigUint, Error> {
    let mut framed = Vec::with_capacity(plaintext.len() + 1);
    framed.push(FRAME_MARKER);
    framed.extend_from_slice(plaintext);

    let message = BigUint::from_bytes_be(&framed);
    if &message >= modulus {
        return Err(Error::InvalidInput(format!(
            "plaintext of {} bytes does not fit under a {}-bit modulus",
            plaintext.len(),
            modulus.bits()
        )));
    }

    Ok(message.modpow(exponent, modulus))
}

fn recover_framed(
    ciphertext: &BigUint,
    exponent: &BigUint,
    modulus: &BigUint,
) -> Result<Vec<u8>, Error> {
    if ciphertext >= modulus {
        return Err(Error::InvalidInput(
            "ciphertext is not reduced modulo the key".to_string(),
        ));
    }

    let framed = ciphertext.modpow(exponent, modulus).to_bytes_be();
    match framed.split_first() {
        Some((&FRAME_MARKER, plaintext)) => Ok(plaintext.to_vec()),
        _ => Err(Error::Crypto(
            "ciphertext was not produced under the matching key".to_string(),
        )),
    }
}

impl AsymmetricCipher for PublicKey {
    type Ciphertext = BigUint;

    /// Confidentiality: only the private half recovers the plaintext.
    fn encrypt(&self, plaintext: &[u8]) -> Result<BigUint, Error> {
        exponentiate_framed(plaintext, self.exponent(), self.modulus())
    }

    /// Provenance: recovers a plaintext that was encrypted under the private half.
    fn decrypt(&self, ciphertext: &BigUint) -> Result<Vec<u8>, Error> {
        recover_framed(ciphertext, self.exponent(), self.modulus())
    }
}

impl AsymmetricCipher for PrivateKey {
    type Ciphertext = BigUint;

    fn encrypt(&self, plaintext: &[u8]) -> Result<BigUint, Error> {
        exponentiate_framed(plaintext, self.exponent(), self.modulus())
    }

    fn decrypt(&self, ciphertext: &BigUint) -> Result<Vec<u8>, Error> {
        recover_framed(ciphertext, self.exponent(), self.modulus())
    }
}
