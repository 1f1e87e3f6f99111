use super::{
    CertificateStore, ConversationRecord, ConversationStore, DirectMessage, KeyStore,
    LoggedMessage, MailboxStore, WrappedChainState,
};
use crate::{Certificate, Error, KeyPair};
use std::collections::{BTreeSet, HashMap};

/// In-process storage that keeps every record in its encoded form.
///
/// Records go through the same Protocol Buffers encoding a persistent backend
/// would use, so a corrupt or outdated record surfaces as [`Error::Serde`].
#[derive(Default)]
pub struct MemoryStore {
    key_pairs: HashMap<String, Vec<u8>>,
    certificates: HashMap<String, Vec<u8>>,
    conversations: HashMap<(String, String), Vec<u8>>,
    mailboxes: HashMap<String, Vec<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conversation_key(owner: &str, peer: &str) -> (String, String) {
    (owner.to_string(), peer.to_string())
}

impl KeyStore for MemoryStore {
    fn key_pair(&self, name: &str) -> Result<Option<KeyPair>, Error> {
        self.key_pairs
            .get(name)
            .map(|bytes| KeyPair::from_bytes(bytes))
            .transpose()
    }

    fn put_key_pair(&mut self, name: &str, keys: &KeyPair) -> Result<(), Error> {
        self.key_pairs.insert(name.to_string(), keys.to_bytes()?);
        Ok(())
    }

    fn delete_key_pair(&mut self, name: &str) -> Result<bool, Error> {
        Ok(self.key_pairs.remove(name).is_some())
    }

    fn identities(&self) -> Result<BTreeSet<String>, Error> {
        Ok(self.key_pairs.keys().cloned().collect())
    }
}

impl CertificateStore for MemoryStore {
    fn certificate(&self, name: &str) -> Result<Option<Certificate>, Error> {
        self.certificates
            .get(name)
            .map(|bytes| Certificate::from_bytes(bytes))
            .transpose()
    }

    fn put_certificate(&mut self, name: &str, certificate: &Certificate) -> Result<(), Error> {
        self.certificates
            .insert(name.to_string(), certificate.to_bytes()?);
        Ok(())
    }

    fn delete_certificate(&mut self, name: &str) -> Result<bool, Error> {
        Ok(self.certificates.remove(name).is_some())
    }
}

impl ConversationStore for MemoryStore {
    fn conversation(&self, owner: &str, peer: &str) -> Result<Option<ConversationRecord>, Error> {
        self.conversations
            .get(&conversation_key(owner, peer))
            .map(|bytes| ConversationRecord::from_bytes(bytes))
            .transpose()
    }

    fn create_conversation(
        &mut self,
        owner: &str,
        peer: &str,
        wrapped: WrappedChainState,
    ) -> Result<bool, Error> {
        let key = conversation_key(owner, peer);
        if self.conversations.contains_key(&key) {
            return Ok(false);
        }

        let record = ConversationRecord {
            wrapped,
            messages: Vec::new(),
        };
        self.conversations.insert(key, record.to_bytes()?);
        Ok(true)
    }

    fn append_message(
        &mut self,
        owner: &str,
        peer: &str,
        ciphertext: &[u8],
        sender: &str,
        timestamp: u64,
    ) -> Result<u64, Error> {
        let key = conversation_key(owner, peer);
        let Some(bytes) = self.conversations.get_mut(&key) else {
            return Err(Error::NoSessionEstablished {
                owner: owner.to_string(),
                peer: peer.to_string(),
            });
        };

        let mut record = ConversationRecord::from_bytes(bytes)?;
        let id = record.messages.len() as u64 + 1;
        record.messages.push(LoggedMessage {
            id,
            sender: sender.to_string(),
            ciphertext: ciphertext.to_vec(),
            timestamp,
        });
        *bytes = record.to_bytes()?;

        Ok(id)
    }
}

impl MailboxStore for MemoryStore {
    fn deliver(&mut self, recipient: &str, message: DirectMessage) -> Result<(), Error> {
        let encoded = message.to_bytes()?;
        self.mailboxes
            .entry(recipient.to_string())
            .or_default()
            .push(encoded);
        Ok(())
    }

    fn inbox(&self, recipient: &str) -> Result<Vec<DirectMessage>, Error> {
        self.mailboxes
            .get(recipient)
            .map(|messages| {
                messages
                    .iter()
                    .map(|bytes| DirectMessage::from_bytes(bytes))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;
    use std::sync::LazyLock;

    static KEYS: LazyLock<KeyPair> = LazyLock::new(|| KeyPair::generate(128, 10).unwrap());

    fn wrapped(value: u32) -> WrappedChainState {
        WrappedChainState {
            chain_key: BigUint::from(value),
            salt: BigUint::from(value + 1),
        }
    }

    #[test]
    fn test_key_pairs() {
        let mut store = MemoryStore::new();
        assert_eq!(store.key_pair("alice").unwrap(), None);

        store.put_key_pair("alice", &KEYS).unwrap();
        store.put_key_pair("bob", &KEYS).unwrap();
        assert_eq!(store.key_pair("alice").unwrap().as_ref(), Some(&*KEYS));
        assert_eq!(
            store.identities().unwrap().into_iter().collect::<Vec<_>>(),
            vec!["alice".to_string(), "bob".to_string()]
        );

        assert!(store.delete_key_pair("alice").unwrap());
        assert!(!store.delete_key_pair("alice").unwrap());
        assert_eq!(store.key_pair("alice").unwrap(), None);
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let mut store = MemoryStore::new();
        store.key_pairs.insert("alice".to_string(), vec![0xff; 4]);
        assert!(matches!(store.key_pair("alice"), Err(Error::Serde(_))));
    }

    #[test]
    fn test_conversation_creation_is_idempotent() {
        let mut store = MemoryStore::new();
        assert!(store.create_conversation("alice", "bob", wrapped(1)).unwrap());
        assert!(!store.create_conversation("alice", "bob", wrapped(9)).unwrap());

        let record = store.conversation("alice", "bob").unwrap().unwrap();
        assert_eq!(record.wrapped, wrapped(1));
        assert!(record.messages.is_empty());
        assert_eq!(store.conversation("bob", "alice").unwrap(), None);
    }

    #[test]
    fn test_append_assigns_positions() {
        let mut store = MemoryStore::new();
        store.create_conversation("alice", "bob", wrapped(1)).unwrap();

        assert_eq!(store.append_message("alice", "bob", b"one", "alice", 10).unwrap(), 1);
        assert_eq!(store.append_message("alice", "bob", b"two", "bob", 11).unwrap(), 2);

        let record = store.conversation("alice", "bob").unwrap().unwrap();
        let ids: Vec<_> = record.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(record.messages[1].sender, "bob");
        assert_eq!(record.messages[1].ciphertext, b"two");
    }

    #[test]
    fn test_append_without_conversation() {
        let mut store = MemoryStore::new();
        assert_eq!(
            store.append_message("alice", "bob", b"hi", "alice", 0),
            Err(Error::NoSessionEstablished {
                owner: "alice".to_string(),
                peer: "bob".to_string(),
            })
        );
    }

    #[test]
    fn test_mailbox_keeps_delivery_order() {
        let mut store = MemoryStore::new();
        assert!(store.inbox("bob").unwrap().is_empty());

        for (sender, value) in [("alice", 1u32), ("carol", 2)] {
            store
                .deliver(
                    "bob",
                    DirectMessage {
                        sender: sender.to_string(),
                        ciphertext: BigUint::from(value),
                        timestamp: u64::from(value),
                    },
                )
                .unwrap();
        }

        let senders: Vec<_> = store
            .inbox("bob")
            .unwrap()
            .into_iter()
            .map(|message| message.sender)
            .collect();
        assert_eq!(senders, vec!["alice", "carol"]);
    }
}
