use crate::Error;

/// A cipher whose single secret key both encrypts and decrypts.
pub trait SymmetricCipher {
    /// Encrypts `plaintext`, zero-padding it to a whole number of blocks.
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8>;

    /// Decrypts `ciphertext` and strips the zero padding.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error>;
}

/// One half of an asymmetric key pair.
///
/// Both halves implement this trait: a value encrypted under one half is
/// recovered with the other, so the caller picks the direction by picking the key.
pub trait AsymmetricCipher {
    /// Encrypted representation.
    type Ciphertext;

    /// Encrypts `plaintext` under this key.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Self::Ciphertext, Error>;

    /// Decrypts `ciphertext` that was produced under the matching key.
    fn decrypt(&self, ciphertext: &Self::Ciphertext) -> Result<Vec<u8>, Error>;
}

/// The half of a key pair that produces signatures.
pub trait Signer {
    type Signature;

    fn sign(&self, message: &[u8]) -> Self::Signature;
}

/// The half of a key pair that checks signatures made by the matching [`Signer`].
pub trait SignatureVerifier {
    type Signature;

    /// A malformed signature is rejected, not reported as an error.
    fn verify(&self, message: &[u8], signature: &Self::Signature) -> bool;
}
