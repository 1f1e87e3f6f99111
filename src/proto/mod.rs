use crate::storage::{ConversationRecord, DirectMessage, LoggedMessage, WrappedChainState};
use crate::{Certificate, Error, KeyPair, PrivateKey, PublicKey};
use num_bigint::BigUint;
use prost::Message;

/// Current schema version for every stored record.
const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, PartialEq, Message)]
pub(crate) struct KeyPairProto {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub modulus: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub public_exponent: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub private_exponent: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct CertificateProto {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(string, tag = "2")]
    pub subject_name: String,
    #[prost(bytes = "vec", tag = "3")]
    pub modulus: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub exponent: Vec<u8>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub proof: Option<Vec<u8>>,
    #[prost(bytes = "vec", tag = "6")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct LoggedMessageProto {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(string, tag = "2")]
    pub sender: String,
    #[prost(bytes = "vec", tag = "3")]
    pub ciphertext: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub timestamp: u64,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct ConversationProto {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub wrapped_chain_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub wrapped_salt: Vec<u8>,
    #[prost(message, repeated, tag = "4")]
    pub messages: Vec<LoggedMessageProto>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct DirectMessageProto {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(string, tag = "2")]
    pub sender: String,
    #[prost(bytes = "vec", tag = "3")]
    pub ciphertext: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub timestamp: u64,
}

fn check_version(record: &str, version: u32) -> Result<(), Error> {
    if version != SCHEMA_VERSION {
        return Err(Error::Serde(format!(
            "Unsupported {record} schema version: {version}"
        )));
    }
    Ok(())
}

fn encode<M: Message>(record: &str, message: &M) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::with_capacity(message.encoded_len());
    message
        .encode(&mut buf)
        .map_err(|err| Error::Serde(format!("Failed to encode {record}: {err:?}")))?;
    Ok(buf)
}

fn decode<M: Message + Default>(record: &str, bytes: &[u8]) -> Result<M, Error> {
    M::decode(bytes).map_err(|err| Error::Serde(format!("Failed to decode {record}: {err:?}")))
}

fn integer(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

impl KeyPair {
    /// Serialize the key pair to Protocol Buffers format
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let proto = KeyPairProto {
            version: SCHEMA_VERSION,
            modulus: self.public().modulus().to_bytes_be(),
            public_exponent: self.public().exponent().to_bytes_be(),
            private_exponent: self.private().exponent().to_bytes_be(),
        };
        encode("key pair", &proto)
    }

    /// Deserialize a key pair from Protocol Buffers format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let proto: KeyPairProto = decode("key pair", bytes)?;
        check_version("key pair", proto.version)?;

        let modulus = integer(&proto.modulus);
        let public = PublicKey::new(modulus.clone(), integer(&proto.public_exponent))
            .map_err(|err| Error::Serde(format!("Invalid key pair: {err}")))?;
        let private = PrivateKey::new(modulus, integer(&proto.private_exponent))
            .map_err(|err| Error::Serde(format!("Invalid key pair: {err}")))?;
        KeyPair::from_parts(public, private).map_err(|err| Error::Serde(err.to_string()))
    }
}

impl Certificate {
    /// Serialize the certificate to Protocol Buffers format
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let proto = CertificateProto {
            version: SCHEMA_VERSION,
            subject_name: self.subject_name.clone(),
            modulus: self.subject_public_key.modulus().to_bytes_be(),
            exponent: self.subject_public_key.exponent().to_bytes_be(),
            proof: self.proof.as_ref().map(BigUint::to_bytes_be),
            signature: self.signature.to_bytes_be(),
        };
        encode("certificate", &proto)
    }

    /// Deserialize a certificate from Protocol Buffers format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let proto: CertificateProto = decode("certificate", bytes)?;
        check_version("certificate", proto.version)?;

        if proto.subject_name.is_empty() {
            return Err(Error::Serde("Missing certificate subject".to_string()));
        }

        let subject_public_key = PublicKey::new(integer(&proto.modulus), integer(&proto.exponent))
            .map_err(|err| Error::Serde(format!("Invalid certificate key: {err}")))?;

        Ok(Certificate {
            subject_name: proto.subject_name,
            subject_public_key,
            proof: proto.proof.as_deref().map(integer),
            signature: integer(&proto.signature),
        })
    }
}

impl ConversationRecord {
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let proto = ConversationProto {
            version: SCHEMA_VERSION,
            wrapped_chain_key: self.wrapped.chain_key.to_bytes_be(),
            wrapped_salt: self.wrapped.salt.to_bytes_be(),
            messages: self
                .messages
                .iter()
                .map(|message| LoggedMessageProto {
                    id: message.id,
                    sender: message.sender.clone(),
                    ciphertext: message.ciphertext.clone(),
                    timestamp: message.timestamp,
                })
                .collect(),
        };
        encode("conversation", &proto)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let proto: ConversationProto = decode("conversation", bytes)?;
        check_version("conversation", proto.version)?;

        let messages = proto
            .messages
            .into_iter()
            .map(|message| LoggedMessage {
                id: message.id,
                sender: message.sender,
                ciphertext: message.ciphertext,
                timestamp: message.timestamp,
            })
            .collect();

        Ok(ConversationRecord {
            wrapped: WrappedChainState {
                chain_key: integer(&proto.wrapped_chain_key),
                salt: integer(&proto.wrapped_salt),
            },
            messages,
        })
    }
}

impl DirectMessage {
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let proto = DirectMessageProto {
            version: SCHEMA_VERSION,
            sender: self.sender.clone(),
            ciphertext: self.ciphertext.to_bytes_be(),
            timestamp: self.timestamp,
        };
        encode("direct message", &proto)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let proto: DirectMessageProto = decode("direct message", bytes)?;
        check_version("direct message", proto.version)?;

        Ok(DirectMessage {
            sender: proto.sender,
            ciphertext: integer(&proto.ciphertext),
            timestamp: proto.timestamp,
        })
    }
}
