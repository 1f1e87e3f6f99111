use crate::Error;
use rand::TryRngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Seed material of a hash ratchet: the current chain key, a fixed salt and the
/// number of keys already derived.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ChainState {
    pub(crate) chain_key: Vec<u8>,
    pub(crate) salt: Vec<u8>,
    #[zeroize(skip)]
    pub(crate) counter: u64,
}

impl ChainState {
    /// A chain state that has not derived any key yet.
    pub fn new(chain_key: Vec<u8>, salt: Vec<u8>) -> Self {
        Self {
            chain_key,
            salt,
            counter: 0,
        }
    }

    /// Fresh random chain key and salt.
    pub fn generate(chain_key_len: usize, salt_len: usize) -> Result<Self, Error> {
        if chain_key_len == 0 {
            return Err(Error::InvalidInput(
                "chain key must not be empty".to_string(),
            ));
        }

        let mut chain_key = vec![0u8; chain_key_len];
        let mut salt = vec![0u8; salt_len];
        OsRng
            .try_fill_bytes(&mut chain_key)
            .map_err(|_| Error::Random)?;
        OsRng.try_fill_bytes(&mut salt).map_err(|_| Error::Random)?;

        Ok(Self::new(chain_key, salt))
    }

    /// The current chain key.
    pub fn chain_key(&self) -> &[u8] {
        &self.chain_key
    }

    /// The salt mixed into every derivation.
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Number of keys derived so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }
}

impl std::fmt::Debug for ChainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainState")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}
