use crate::block_cipher::KEY_LEN;
use crate::digest::Sha256;
use crate::storage::{ConversationRecord, ConversationStore, KeyStore, WrappedChainState};
use crate::{AsymmetricCipher, BlockCipher, ChainState, Error, KeyPair, KeyRatchet, SymmetricCipher};
use base64::Engine;
use std::time::{SystemTime, UNIX_EPOCH};

/// A decrypted conversation entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// 1-based position in the log.
    pub id: u64,
    pub sender: String,
    pub text: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

/// Stable identifier for the conversation between two identities, independent of
/// which side asks.
pub fn conversation_id(me: &str, other: &str) -> String {
    let (first, second) = if me <= other { (me, other) } else { (other, me) };

    let mut hasher = Sha256::new();
    hasher.update(first.as_bytes());
    hasher.update(b":");
    hasher.update(second.as_bytes());

    let engine = base64::engine::general_purpose::STANDARD;
    engine.encode(hasher.finalize().as_bytes())
}

fn load_keys<S: KeyStore>(store: &S, name: &str) -> Result<KeyPair, Error> {
    store
        .key_pair(name)?
        .ok_or_else(|| Error::UnknownIdentity(name.to_string()))
}

fn load_record<S: ConversationStore>(
    store: &S,
    owner: &str,
    peer: &str,
) -> Result<ConversationRecord, Error> {
    store
        .conversation(owner, peer)?
        .ok_or_else(|| Error::NoSessionEstablished {
            owner: owner.to_string(),
            peer: peer.to_string(),
        })
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn unwrap_state(keys: &KeyPair, wrapped: &WrappedChainState) -> Result<ChainState, Error> {
    Ok(ChainState::new(
        keys.private().decrypt(&wrapped.chain_key)?,
        keys.private().decrypt(&wrapped.salt)?,
    ))
}

/// Stores `initial` for both participants, each copy wrapped under its owner's
/// public key.
///
/// A participant that already holds state for this pair keeps it, provided that
/// state still unwraps under the participant's current key and agrees with the
/// peer's copy. Anything else is reported as [`Error::VerificationFailed`] and
/// nothing is written.
pub fn create_conversation<S>(
    store: &mut S,
    me: &str,
    other: &str,
    initial: &ChainState,
) -> Result<(), Error>
where
    S: KeyStore + ConversationStore,
{
    if me == other {
        return Err(Error::InvalidInput(
            "a conversation needs two distinct identities".to_string(),
        ));
    }

    let my_keys = load_keys(store, me)?;
    let other_keys = load_keys(store, other)?;
    let sides = [(me, other, &my_keys), (other, me, &other_keys)];

    let mut existing: Option<ChainState> = None;
    for (owner, peer, keys) in sides {
        let Some(record) = store.conversation(owner, peer)? else {
            continue;
        };
        let state = unwrap_state(keys, &record.wrapped).map_err(|_| {
            Error::VerificationFailed(format!(
                "stored conversation state of {owner} with {peer} does not unwrap under its key"
            ))
        })?;
        if existing.as_ref().is_some_and(|previous| *previous != state) {
            return Err(Error::VerificationFailed(format!(
                "conversation state of {me} and {other} disagrees between the two sides"
            )));
        }
        existing = Some(state);
    }

    for (owner, peer, keys) in sides {
        let wrapped = WrappedChainState {
            chain_key: keys.public().encrypt(initial.chain_key())?,
            salt: keys.public().encrypt(initial.salt())?,
        };
        let created = store.create_conversation(owner, peer, wrapped)?;
        tracing::info!(owner, peer, created, "bootstrapped conversation state");
    }

    Ok(())
}

/// One identity's live view of a conversation.
///
/// Holds the unwrapped initial chain state and a ratchet positioned just after
/// the last logged message.
pub struct Conversation<'s, S> {
    store: &'s mut S,
    me: String,
    other: String,
    id: String,
    initial: ChainState,
    ratchet: KeyRatchet,
}

impl<'s, S> Conversation<'s, S>
where
    S: KeyStore + ConversationStore,
{
    /// Unwraps `me`'s copy of the shared state and fast-forwards past the logged messages.
    pub fn open(store: &'s mut S, me: &str, other: &str) -> Result<Self, Error> {
        let keys = load_keys(store, me)?;
        let record = load_record(store, me, other)?;

        let initial = unwrap_state(&keys, &record.wrapped)?;
        let mut ratchet = KeyRatchet::new(initial.clone(), KEY_LEN)?;
        ratchet.fast_forward(record.messages.len() as u64);

        tracing::debug!(me, other, messages = record.messages.len(), "opened conversation");

        Ok(Self {
            store,
            me: me.to_string(),
            other: other.to_string(),
            id: conversation_id(me, other),
            initial,
            ratchet,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The local identity.
    pub fn me(&self) -> &str {
        &self.me
    }

    /// The peer identity.
    pub fn other(&self) -> &str {
        &self.other
    }

    /// Number of keys the live ratchet has consumed.
    pub fn counter(&self) -> u64 {
        self.ratchet.counter()
    }

    /// Encrypts `text` under the next ratchet key and appends it to both logs.
    ///
    /// Returns the message's position in the log.
    pub fn send_message(&mut self, text: &str) -> Result<u64, Error> {
        let record = load_record(&*self.store, &self.me, &self.other)?;
        let peer_record = load_record(&*self.store, &self.other, &self.me)?;
        let logged = record.messages.len() as u64;

        if peer_record.messages.len() as u64 != logged {
            return Err(Error::Storage(format!(
                "logs of {} and {} have diverged",
                self.me, self.other
            )));
        }
        // The peer may have appended since we opened; never hand out a consumed key.
        match logged.checked_sub(self.ratchet.counter()) {
            Some(behind) => self.ratchet.fast_forward(behind),
            None => {
                return Err(Error::Storage(format!(
                    "log of {} holds {logged} messages but {} keys were consumed",
                    self.me,
                    self.ratchet.counter()
                )));
            }
        }

        let key = self.ratchet.derive();
        let ciphertext = BlockCipher::new(key.as_bytes())?.encrypt(text.as_bytes());
        let timestamp = now();

        let id = self
            .store
            .append_message(&self.me, &self.other, &ciphertext, &self.me, timestamp)?;
        self.store
            .append_message(&self.other, &self.me, &ciphertext, &self.me, timestamp)?;

        tracing::debug!(conversation = %self.id, id, "appended message");
        Ok(id)
    }

    /// Decrypts the whole log in order by replaying the ratchet from the initial state.
    pub fn messages(&self) -> Result<Vec<Message>, Error> {
        let record = load_record(&*self.store, &self.me, &self.other)?;
        let mut replay = KeyRatchet::new(self.initial.clone(), KEY_LEN)?;

        record
            .messages
            .into_iter()
            .map(|entry| -> Result<Message, Error> {
                let key = replay.derive();
                let plaintext = BlockCipher::new(key.as_bytes())?.decrypt(&entry.ciphertext)?;
                let text = String::from_utf8(plaintext).map_err(|_| {
                    Error::Crypto(format!("message {} did not decrypt to text", entry.id))
                })?;

                Ok(Message {
                    id: entry.id,
                    sender: entry.sender,
                    text,
                    timestamp: entry.timestamp,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::LazyLock;

    static ALICE: LazyLock<KeyPair> = LazyLock::new(|| KeyPair::generate(256, 10).unwrap());
    static BOB: LazyLock<KeyPair> = LazyLock::new(|| KeyPair::generate(256, 10).unwrap());

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.put_key_pair("alice", &ALICE).unwrap();
        store.put_key_pair("bob", &BOB).unwrap();
        store
    }

    fn shared_state() -> ChainState {
        ChainState::new(vec![0x5a; 32], vec![0x00, 0x11, 0x22, 0x33])
    }

    #[test]
    fn test_conversation_id_is_symmetric() {
        assert_eq!(conversation_id("alice", "bob"), conversation_id("bob", "alice"));
        assert_ne!(conversation_id("alice", "bob"), conversation_id("alice", "carol"));
        assert_eq!(conversation_id("alice", "bob").len(), 44);
    }

    #[test]
    fn test_first_message_is_read_by_peer() {
        let mut store = store();
        create_conversation(&mut store, "alice", "bob", &shared_state()).unwrap();

        let id = Conversation::open(&mut store, "alice", "bob")
            .unwrap()
            .send_message("Hello World!")
            .unwrap();
        assert_eq!(id, 1);

        let bob = Conversation::open(&mut store, "bob", "alice").unwrap();
        assert_eq!(bob.counter(), 1);
        let messages = bob.messages().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, 1);
        assert_eq!(messages[0].sender, "alice");
        assert_eq!(messages[0].text, "Hello World!");
    }

    #[test]
    fn test_wrapped_state_unwraps_for_both_sides() {
        let mut store = store();
        create_conversation(&mut store, "alice", "bob", &shared_state()).unwrap();

        let alice = Conversation::open(&mut store, "alice", "bob").unwrap();
        assert_eq!(alice.initial, shared_state());
        let bob = Conversation::open(&mut store, "bob", "alice").unwrap();
        assert_eq!(bob.initial, shared_state());
        assert_eq!(bob.id(), conversation_id("alice", "bob"));
    }

    #[test]
    fn test_interleaved_senders_never_reuse_keys() {
        let mut store = store();
        create_conversation(&mut store, "alice", "bob", &shared_state()).unwrap();

        let mut alice = Conversation::open(&mut store, "alice", "bob").unwrap();
        assert_eq!(alice.send_message("one").unwrap(), 1);
        assert_eq!(alice.send_message("two").unwrap(), 2);

        let mut bob = Conversation::open(&mut store, "bob", "alice").unwrap();
        assert_eq!(bob.send_message("three").unwrap(), 3);

        let record = store.conversation("alice", "bob").unwrap().unwrap();
        let mut ciphertexts: Vec<_> = record.messages.iter().map(|m| m.ciphertext.clone()).collect();
        ciphertexts.sort();
        ciphertexts.dedup();
        assert_eq!(ciphertexts.len(), 3);

        let alice = Conversation::open(&mut store, "alice", "bob").unwrap();
        let texts: Vec<_> = alice
            .messages()
            .unwrap()
            .into_iter()
            .map(|m| (m.id, m.sender, m.text))
            .collect();
        assert_eq!(
            texts,
            vec![
                (1, "alice".to_string(), "one".to_string()),
                (2, "alice".to_string(), "two".to_string()),
                (3, "bob".to_string(), "three".to_string()),
            ]
        );
    }

    #[test]
    fn test_creation_is_idempotent() {
        let mut store = store();
        create_conversation(&mut store, "alice", "bob", &shared_state()).unwrap();
        Conversation::open(&mut store, "alice", "bob")
            .unwrap()
            .send_message("kept")
            .unwrap();

        let replacement = ChainState::new(vec![0x77; 32], vec![0x01]);
        create_conversation(&mut store, "bob", "alice", &replacement).unwrap();

        let bob = Conversation::open(&mut store, "bob", "alice").unwrap();
        assert_eq!(bob.messages().unwrap()[0].text, "kept");
    }

    #[test]
    fn test_stale_state_after_key_change_is_rejected() {
        let mut store = store();
        create_conversation(&mut store, "alice", "bob", &shared_state()).unwrap();

        let replacement = KeyPair::generate(256, 10).unwrap();
        store.put_key_pair("bob", &replacement).unwrap();

        assert!(matches!(
            create_conversation(&mut store, "alice", "bob", &shared_state()),
            Err(Error::VerificationFailed(_))
        ));
        assert!(matches!(
            create_conversation(&mut store, "bob", "alice", &shared_state()),
            Err(Error::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_sides_with_different_state_are_rejected() {
        let mut store = store();
        let wrap = |keys: &KeyPair, state: &ChainState| WrappedChainState {
            chain_key: keys.public().encrypt(state.chain_key()).unwrap(),
            salt: keys.public().encrypt(state.salt()).unwrap(),
        };
        let other_state = ChainState::new(vec![0x77; 32], vec![0x01]);
        store
            .create_conversation("alice", "bob", wrap(&*ALICE, &shared_state()))
            .unwrap();
        store
            .create_conversation("bob", "alice", wrap(&*BOB, &other_state))
            .unwrap();

        assert!(matches!(
            create_conversation(&mut store, "alice", "bob", &shared_state()),
            Err(Error::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_open_without_bootstrap() {
        let mut store = store();
        assert!(matches!(
            Conversation::open(&mut store, "alice", "bob"),
            Err(Error::NoSessionEstablished { .. })
        ));
    }

    #[test]
    fn test_unknown_participant() {
        let mut store = store();
        assert_eq!(
            create_conversation(&mut store, "alice", "carol", &shared_state()),
            Err(Error::UnknownIdentity("carol".to_string()))
        );
        assert!(matches!(
            create_conversation(&mut store, "alice", "alice", &shared_state()),
            Err(Error::InvalidInput(_))
        ));
    }
}
