//! A cryptographic stack built from first principles: number theory, a
//! substitution-permutation block cipher, textbook RSA, SHA-256 and HMAC, a hash
//! ratchet, certificates, a proof of knowledge and two-party conversations.
//!
//! None of it is hardened. Arithmetic is not constant time and the block cipher
//! runs without an authenticated mode.

mod error;
pub use error::Error;

mod config;
pub use config::CryptoConfig;

pub mod number_theory;

mod digest;
pub use digest::*;

mod cipher;
pub use cipher::*;

mod block_cipher;
pub use block_cipher::*;

mod rsa;
pub use rsa::*;

mod ratchet;
pub use ratchet::*;

pub mod storage;

mod proto;

mod authority;
pub use authority::*;

mod proof;
pub use proof::*;

mod conversation;
pub use conversation::*;

mod directory;
pub use directory::*;
