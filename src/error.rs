/// Errors that can occur across the cipher, identity and conversation layers.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// Structural misuse: bad widths, unsupported directions, oversized plaintexts.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A key pair, certificate or mailbox lookup found nothing.
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// An identity with this name already exists.
    #[error("Identity already exists: {0}")]
    DuplicateIdentity(String),

    /// A signature, certificate or proof did not check out.
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Conversation operations were attempted before the chain state was bootstrapped.
    #[error("No session established between {owner} and {peer}")]
    NoSessionEstablished {
        /// Identity whose log was looked up.
        owner: String,
        /// The other participant.
        peer: String,
    },

    /// A cryptographic operation produced an unusable result.
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// Random number generation failed.
    #[error("Random number generation failed")]
    Random,

    /// Serialization or deserialization failed.
    #[error("Serialization/deserialization failed: {0}")]
    Serde(String),

    /// The storage collaborator reported a failure.
    #[error("Storage failure: {0}")]
    Storage(String),
}
