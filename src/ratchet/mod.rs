mod chain;
pub use chain::ChainState;

use crate::Error;
use crate::digest::{DIGEST_LEN, hmac_sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A symmetric key produced by one ratchet step.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MessageKey(Vec<u8>);

impl MessageKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for MessageKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageKey")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

/// One-way hash ratchet over a [`ChainState`].
///
/// Every call to [`KeyRatchet::derive`] consumes one counter value:
///
/// ```text
/// message_key = HMAC(chain_key, chain_key || salt || counter)
/// chain_key'  = HMAC(chain_key, salt || chain_key || counter)
/// ```
///
/// There is no way back: a ratchet only moves forward, and a given counter value
/// yields a key at most once. `derive` takes `&mut self`, so two derivations on the
/// same ratchet can never race.
pub struct KeyRatchet {
    state: ChainState,
    key_len: usize,
}

impl KeyRatchet {
    /// Starts a ratchet that hands out keys of `key_len` bytes (at most 32).
    pub fn new(state: ChainState, key_len: usize) -> Result<Self, Error> {
        if key_len == 0 || key_len > DIGEST_LEN {
            return Err(Error::InvalidInput(format!(
                "ratchet keys must be 1..={DIGEST_LEN} bytes, got {key_len}"
            )));
        }
        Ok(Self { state, key_len })
    }

    /// Advances the chain and returns the next message key.
    pub fn derive(&mut self) -> MessageKey {
        let counter = self.state.counter.to_be_bytes();
        let mut input =
            Vec::with_capacity(self.state.chain_key.len() + self.state.salt.len() + counter.len());

        input.extend_from_slice(&self.state.chain_key);
        input.extend_from_slice(&self.state.salt);
        input.extend_from_slice(&counter);
        let message_key = hmac_sha256(&self.state.chain_key, &input);

        input.clear();
        input.extend_from_slice(&self.state.salt);
        input.extend_from_slice(&self.state.chain_key);
        input.extend_from_slice(&counter);
        let next_chain_key = hmac_sha256(&self.state.chain_key, &input);
        input.zeroize();

        self.state.chain_key.zeroize();
        self.state.chain_key = next_chain_key.as_bytes().to_vec();
        self.state.counter += 1;

        MessageKey(message_key.as_bytes()[..self.key_len].to_vec())
    }

    /// Derives and discards `steps` keys.
    pub fn fast_forward(&mut self, steps: u64) {
        for _ in 0..steps {
            self.derive();
        }
    }

    /// Number of keys derived from the initial state.
    pub fn counter(&self) -> u64 {
        self.state.counter
    }

    /// Current chain state.
    pub fn state(&self) -> &ChainState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn initial_state() -> ChainState {
        ChainState::new(b"0123456789abcdef0123456789abcdef".to_vec(), b"pepper".to_vec())
    }

    #[test]
    fn test_identical_seeds_produce_identical_sequences() {
        let mut first = KeyRatchet::new(initial_state(), 32).unwrap();
        let mut second = KeyRatchet::new(initial_state(), 32).unwrap();

        for _ in 0..10 {
            assert_eq!(first.derive(), second.derive());
        }
        assert_eq!(first.state(), second.state());
    }

    #[test]
    fn test_keys_are_never_reused() {
        let mut ratchet = KeyRatchet::new(initial_state(), 32).unwrap();
        let mut seen = HashSet::new();
        for _ in 0..200 {
            assert!(seen.insert(ratchet.derive().as_bytes().to_vec()));
        }
    }

    #[test]
    fn test_counter_advances_by_one() {
        let mut ratchet = KeyRatchet::new(initial_state(), 32).unwrap();
        assert_eq!(ratchet.counter(), 0);
        ratchet.derive();
        assert_eq!(ratchet.counter(), 1);
        ratchet.fast_forward(4);
        assert_eq!(ratchet.counter(), 5);
    }

    #[test]
    fn test_fast_forward_matches_stepping() {
        let mut stepped = KeyRatchet::new(initial_state(), 32).unwrap();
        for _ in 0..7 {
            stepped.derive();
        }

        let mut skipped = KeyRatchet::new(initial_state(), 32).unwrap();
        skipped.fast_forward(7);

        assert_eq!(stepped.derive(), skipped.derive());
    }

    #[test]
    fn test_salt_diversifies_keys() {
        let mut plain = KeyRatchet::new(initial_state(), 32).unwrap();
        let salted = ChainState::new(initial_state().chain_key().to_vec(), b"other".to_vec());
        let mut salted = KeyRatchet::new(salted, 32).unwrap();

        assert_ne!(plain.derive(), salted.derive());
    }

    #[test]
    fn test_truncated_keys_are_prefixes() {
        let mut full = KeyRatchet::new(initial_state(), 32).unwrap();
        let mut short = KeyRatchet::new(initial_state(), 16).unwrap();

        let full_key = full.derive();
        let short_key = short.derive();
        assert_eq!(short_key.as_bytes().len(), 16);
        assert_eq!(short_key.as_bytes(), &full_key.as_bytes()[..16]);
    }

    #[test]
    fn test_rejects_bad_key_length() {
        assert!(matches!(
            KeyRatchet::new(initial_state(), 0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            KeyRatchet::new(initial_state(), 33),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_message_key_debug_is_redacted() {
        let mut ratchet = KeyRatchet::new(initial_state(), 32).unwrap();
        let key = ratchet.derive();
        let rendered = format!("{key:?}");

        assert_eq!(rendered, "MessageKey { len: 32, .. }");
        assert!(!rendered.contains(&hex::encode(key.as_bytes())));
    }

    #[test]
    fn test_generated_states_differ() {
        let first = ChainState::generate(32, 16).unwrap();
        let second = ChainState::generate(32, 16).unwrap();
        assert_eq!(first.chain_key().len(), 32);
        assert_eq!(first.salt().len(), 16);
        assert_ne!(first, second);
        assert!(matches!(
            ChainState::generate(0, 16),
            Err(Error::InvalidInput(_))
        ));
    }
}
