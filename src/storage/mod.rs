mod memory;
pub use memory::MemoryStore;

use crate::{Certificate, Error, KeyPair};
use num_bigint::BigUint;
use std::collections::BTreeSet;

/// A conversation's chain key and salt, each RSA-encrypted under the public key
/// of the identity that owns this copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedChainState {
    pub chain_key: BigUint,
    pub salt: BigUint,
}

/// One entry of a conversation log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggedMessage {
    /// 1-based position in the log.
    pub id: u64,
    pub sender: String,
    pub ciphertext: Vec<u8>,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

/// Everything one identity stores about a conversation with a peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationRecord {
    pub wrapped: WrappedChainState,
    pub messages: Vec<LoggedMessage>,
}

/// A message encrypted under its sender's private key and left in a mailbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectMessage {
    pub sender: String,
    pub ciphertext: BigUint,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

/// Key pairs indexed by identity name.
pub trait KeyStore {
    fn key_pair(&self, name: &str) -> Result<Option<KeyPair>, Error>;

    fn put_key_pair(&mut self, name: &str, keys: &KeyPair) -> Result<(), Error>;

    /// Returns whether a key pair was removed.
    fn delete_key_pair(&mut self, name: &str) -> Result<bool, Error>;

    /// Every stored identity name, in order.
    fn identities(&self) -> Result<BTreeSet<String>, Error>;
}

/// Certificates indexed by subject name.
pub trait CertificateStore {
    fn certificate(&self, name: &str) -> Result<Option<Certificate>, Error>;

    fn put_certificate(&mut self, name: &str, certificate: &Certificate) -> Result<(), Error>;

    /// Returns whether a certificate was removed.
    fn delete_certificate(&mut self, name: &str) -> Result<bool, Error>;
}

/// Per-identity conversation logs, addressed by `(owner, peer)`.
pub trait ConversationStore {
    fn conversation(&self, owner: &str, peer: &str) -> Result<Option<ConversationRecord>, Error>;

    /// Stores `wrapped` as the owner's copy of the shared state unless one already
    /// exists. Returns whether a new record was created.
    fn create_conversation(
        &mut self,
        owner: &str,
        peer: &str,
        wrapped: WrappedChainState,
    ) -> Result<bool, Error>;

    /// Appends to the owner's log and returns the new entry's id.
    ///
    /// Fails with [`Error::NoSessionEstablished`] when the owner has no record for `peer`.
    fn append_message(
        &mut self,
        owner: &str,
        peer: &str,
        ciphertext: &[u8],
        sender: &str,
        timestamp: u64,
    ) -> Result<u64, Error>;
}

/// Direct-message inboxes.
pub trait MailboxStore {
    fn deliver(&mut self, recipient: &str, message: DirectMessage) -> Result<(), Error>;

    /// Messages delivered to `recipient`, oldest first.
    fn inbox(&self, recipient: &str) -> Result<Vec<DirectMessage>, Error>;
}

/// Everything the identity directory needs from its storage collaborator.
pub trait Storage: KeyStore + CertificateStore + ConversationStore + MailboxStore {}

impl<T> Storage for T where T: KeyStore + CertificateStore + ConversationStore + MailboxStore {}
