use crate::conversation::{Conversation, create_conversation};
use crate::proof::prove_possession;
use crate::storage::{DirectMessage, Storage};
use crate::{
    AsymmetricCipher, Certificate, CertificateAuthority, ChainState, CryptoConfig, Error, KeyPair,
};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// A decrypted direct message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectText {
    pub sender: String,
    pub text: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

/// Identity management over an injected storage collaborator.
///
/// Owns the store and the tunables used for key generation, certificates and
/// conversations. The certificate authority lives in the same store under
/// [`CryptoConfig::authority_name`] and is created on first use.
pub struct Directory<S> {
    store: S,
    config: CryptoConfig,
}

impl<S: Storage> Directory<S> {
    /// Fails with [`Error::InvalidInput`] if `config` does not pass
    /// [`CryptoConfig::validate`].
    pub fn new(store: S, config: CryptoConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gives the store back, e.g. to reopen it under another directory.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Generates a key pair for a new identity.
    pub fn create_user(&mut self, name: &str) -> Result<KeyPair, Error> {
        self.check_new_identity(name)?;
        let keys = KeyPair::generate(self.config.rsa_prime_bits, self.config.primality_rounds)?;
        self.store.put_key_pair(name, &keys)?;
        tracing::info!(user = name, "created identity");
        Ok(keys)
    }

    /// Registers a new identity with existing keys.
    pub fn create_user_with_keys(&mut self, name: &str, keys: &KeyPair) -> Result<(), Error> {
        self.check_new_identity(name)?;
        self.store.put_key_pair(name, keys)?;
        tracing::info!(user = name, "imported identity");
        Ok(())
    }

    fn check_new_identity(&self, name: &str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("identity name is empty".to_string()));
        }
        if name == self.config.authority_name || self.store.key_pair(name)?.is_some() {
            return Err(Error::DuplicateIdentity(name.to_string()));
        }
        Ok(())
    }

    /// Removes an identity together with its certificate.
    pub fn delete_user(&mut self, name: &str) -> Result<(), Error> {
        if name == self.config.authority_name || !self.store.delete_key_pair(name)? {
            return Err(Error::UnknownIdentity(name.to_string()));
        }
        self.store.delete_certificate(name)?;
        tracing::info!(user = name, "deleted identity");
        Ok(())
    }

    /// Every registered identity except the authority.
    pub fn users(&self) -> Result<BTreeSet<String>, Error> {
        let mut users = self.store.identities()?;
        users.remove(&self.config.authority_name);
        Ok(users)
    }

    /// The key pair of `name`.
    pub fn keys(&self, name: &str) -> Result<KeyPair, Error> {
        self.store
            .key_pair(name)?
            .ok_or_else(|| Error::UnknownIdentity(name.to_string()))
    }

    /// The certificate authority, generating its key pair on first use.
    pub fn authority(&mut self) -> Result<CertificateAuthority, Error> {
        let name = &self.config.authority_name;
        if let Some(keys) = self.store.key_pair(name)? {
            return Ok(CertificateAuthority::new(keys));
        }

        let keys = KeyPair::generate(self.config.rsa_prime_bits, self.config.primality_rounds)?;
        self.store.put_key_pair(name, &keys)?;
        tracing::info!(authority = %name, "created certificate authority");
        Ok(CertificateAuthority::new(keys))
    }

    /// Issues and stores a certificate for `name`, embedding its proof witness.
    pub fn certify(&mut self, name: &str) -> Result<Certificate, Error> {
        if name == self.config.authority_name {
            return Err(Error::InvalidInput(
                "the authority does not certify itself".to_string(),
            ));
        }
        let keys = self.keys(name)?;
        let authority = self.authority()?;
        let certificate =
            authority.create_certificate(keys.public(), name, Some(keys.proof_witness()));
        self.store.put_certificate(name, &certificate)?;
        Ok(certificate)
    }

    /// The stored certificate of `name`.
    pub fn certificate(&self, name: &str) -> Result<Certificate, Error> {
        self.store
            .certificate(name)?
            .ok_or_else(|| Error::UnknownIdentity(format!("no certificate for {name}")))
    }

    /// Whether the stored certificate of `name` was issued by the current authority.
    pub fn verify_certificate(&self, name: &str) -> Result<bool, Error> {
        let certificate = self.certificate(name)?;
        let authority = self.existing_authority()?;
        Ok(authority.verify_certificate(&certificate))
    }

    fn existing_authority(&self) -> Result<CertificateAuthority, Error> {
        let name = &self.config.authority_name;
        let keys = self
            .store
            .key_pair(name)?
            .ok_or_else(|| Error::UnknownIdentity(name.clone()))?;
        Ok(CertificateAuthority::new(keys))
    }

    /// Bootstraps a conversation between `me` and `other` with fresh chain state.
    ///
    /// Leaves an existing conversation untouched. State left behind by a deleted
    /// and recreated identity no longer unwraps and is reported as
    /// [`Error::VerificationFailed`].
    pub fn start_conversation(&mut self, me: &str, other: &str) -> Result<(), Error> {
        let initial = ChainState::generate(self.config.chain_key_len, self.config.salt_len)?;
        create_conversation(&mut self.store, me, other, &initial)
    }

    /// Opens `me`'s side of the conversation with `other`.
    pub fn open_conversation(
        &mut self,
        me: &str,
        other: &str,
    ) -> Result<Conversation<'_, S>, Error> {
        Conversation::open(&mut self.store, me, other)
    }

    /// Has `verifier` challenge `prover` to prove it holds the key behind its certificate.
    ///
    /// A certificate the authority did not issue fails without running the protocol.
    pub fn request_proof(&self, verifier: &str, prover: &str) -> Result<bool, Error> {
        self.keys(verifier)?;
        let prover_keys = self.keys(prover)?;
        let certificate = self.certificate(prover)?;

        if !self.existing_authority()?.verify_certificate(&certificate) {
            return Ok(false);
        }

        let accepted =
            prove_possession(&prover_keys, &certificate, self.config.proof_challenge_bits)?;
        tracing::info!(verifier, prover, accepted, "proof of knowledge requested");
        Ok(accepted)
    }

    /// Encrypts `text` under the sender's private key and leaves it in the recipient's
    /// mailbox. Anyone holding the sender's public key can read it.
    pub fn send_direct(&mut self, sender: &str, recipient: &str, text: &str) -> Result<(), Error> {
        let sender_keys = self.keys(sender)?;
        self.keys(recipient)?;

        let ciphertext = sender_keys.private().encrypt(text.as_bytes())?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        self.store.deliver(
            recipient,
            DirectMessage {
                sender: sender.to_string(),
                ciphertext,
                timestamp,
            },
        )?;
        tracing::debug!(sender, recipient, "delivered direct message");
        Ok(())
    }

    /// Decrypts every message in `recipient`'s mailbox with its sender's public key.
    ///
    /// The outer error covers the recipient and the mailbox itself. Each entry
    /// carries its own outcome, so one forged, corrupted or orphaned message does
    /// not hide the rest of the inbox.
    pub fn read_direct(&self, recipient: &str) -> Result<Vec<Result<DirectText, Error>>, Error> {
        self.keys(recipient)?;

        let inbox = self
            .store
            .inbox(recipient)?
            .into_iter()
            .map(|message| self.open_direct(message))
            .inspect(|entry| {
                if let Err(error) = entry {
                    tracing::warn!(recipient, %error, "unreadable direct message");
                }
            })
            .collect();
        Ok(inbox)
    }

    fn open_direct(&self, message: DirectMessage) -> Result<DirectText, Error> {
        let sender_keys = self.keys(&message.sender)?;
        let plaintext = sender_keys.public().decrypt(&message.ciphertext)?;
        let text = String::from_utf8(plaintext)
            .map_err(|_| Error::Crypto(format!("message from {} is not text", message.sender)))?;

        Ok(DirectText {
            sender: message.sender,
            text,
            timestamp: message.timestamp,
        })
    }
}
