//! Interactive proof that an identity holds the private exponent behind its
//! certificate.
//!
//! The certificate carries the public witness `X = d^e mod n`. One round runs:
//!
//! 1. the prover picks a random `y` and sends `Y = y^e mod n`,
//! 2. the verifier answers with a random challenge `c`,
//! 3. the prover sends `z = y * d^c mod n`,
//! 4. the verifier accepts iff `z^e == Y * X^c (mod n)`.
//!
//! `z` reveals nothing about `d` without `y`, and answering two challenges for the
//! same commitment requires knowing `d`. Both sides consume themselves on the
//! final step so a commitment is never answered twice.

use crate::number_theory::{gcd, random_below, random_in_range};
use crate::{Certificate, Error, KeyPair, PublicKey};
use num_bigint::BigUint;
use num_traits::One;

/// The prover's first message, `Y = y^e mod n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment(BigUint);

/// The verifier's random challenge `c`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge(BigUint);

/// The prover's answer `z = y * d^c mod n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response(BigUint);

impl Challenge {
    pub fn value(&self) -> &BigUint {
        &self.0
    }
}

/// Prover state between commitment and response.
pub struct Prover<'a> {
    keys: &'a KeyPair,
    nonce: BigUint,
}

impl<'a> Prover<'a> {
    /// Picks a nonce coprime to the modulus and commits to it.
    pub fn commit(keys: &'a KeyPair) -> Result<(Self, Commitment), Error> {
        let modulus = keys.public().modulus();
        if modulus <= &BigUint::from(3u32) {
            return Err(Error::InvalidInput(
                "modulus too small for a proof of knowledge".to_string(),
            ));
        }

        let two = BigUint::from(2u32);
        let nonce = loop {
            let candidate = random_in_range(&two, modulus);
            if gcd(&candidate, modulus).is_one() {
                break candidate;
            }
        };

        let commitment = nonce.modpow(keys.public().exponent(), modulus);
        Ok((Self { keys, nonce }, Commitment(commitment)))
    }

    /// Answers `challenge`, consuming the nonce.
    pub fn respond(self, challenge: &Challenge) -> Response {
        let modulus = self.keys.private().modulus();
        let masked = self
            .keys
            .private()
            .exponent()
            .modpow(&challenge.0, modulus);
        Response((self.nonce * masked) % modulus)
    }
}

/// Verifier state before a challenge has been issued.
pub struct Verifier {
    public_key: PublicKey,
    witness: BigUint,
    challenge_bits: u64,
}

/// Verifier state holding the commitment and the challenge it answered with.
pub struct PendingVerification {
    verifier: Verifier,
    commitment: Commitment,
    challenge: Challenge,
}

impl Verifier {
    /// Prepares to check the identity described by `certificate`.
    ///
    /// The certificate must carry a proof witness; it is not checked against the
    /// authority here.
    pub fn new(certificate: &Certificate, challenge_bits: u64) -> Result<Self, Error> {
        let Some(witness) = certificate.proof() else {
            return Err(Error::VerificationFailed(format!(
                "certificate for {} carries no proof value",
                certificate.subject_name()
            )));
        };
        if challenge_bits == 0 {
            return Err(Error::InvalidInput(
                "challenge must be at least one bit wide".to_string(),
            ));
        }

        Ok(Self {
            public_key: certificate.subject_public_key().clone(),
            witness: witness.clone(),
            challenge_bits,
        })
    }

    /// Draws a challenge in `[2^(bits-1), 2^bits)` for `commitment`.
    pub fn challenge(self, commitment: Commitment) -> (PendingVerification, Challenge) {
        let low = BigUint::one() << (self.challenge_bits - 1);
        let challenge = Challenge(&low + random_below(&low));

        let pending = PendingVerification {
            verifier: self,
            commitment,
            challenge: challenge.clone(),
        };
        (pending, challenge)
    }
}

impl PendingVerification {
    /// Accepts iff `z^e == Y * X^c (mod n)`.
    pub fn verify(self, response: &Response) -> bool {
        let modulus = self.verifier.public_key.modulus();
        let exponent = self.verifier.public_key.exponent();
        if response.0 >= *modulus {
            return false;
        }

        let lhs = response.0.modpow(exponent, modulus);
        let rhs = (&self.commitment.0 * self.verifier.witness.modpow(&self.challenge.0, modulus))
            % modulus;
        lhs == rhs
    }
}

/// Runs one full round between `keys` as prover and `certificate` as the claimed identity.
pub fn prove_possession(
    keys: &KeyPair,
    certificate: &Certificate,
    challenge_bits: u64,
) -> Result<bool, Error> {
    let verifier = Verifier::new(certificate, challenge_bits)?;
    let (prover, commitment) = Prover::commit(keys)?;
    let (pending, challenge) = verifier.challenge(commitment);
    let response = prover.respond(&challenge);
    let accepted = pending.verify(&response);

    tracing::info!(
        subject = certificate.subject_name(),
        accepted,
        "proof of knowledge finished"
    );
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CertificateAuthority;
    use std::sync::LazyLock;

    static AUTHORITY: LazyLock<CertificateAuthority> =
        LazyLock::new(|| CertificateAuthority::new(KeyPair::generate(256, 10).unwrap()));
    static ALICE: LazyLock<KeyPair> = LazyLock::new(|| KeyPair::generate(256, 10).unwrap());
    static MALLORY: LazyLock<KeyPair> = LazyLock::new(|| KeyPair::generate(256, 10).unwrap());

    fn alice_certificate(proof: Option<BigUint>) -> Certificate {
        AUTHORITY.create_certificate(ALICE.public(), "alice", proof)
    }

    #[test]
    fn test_honest_prover_is_accepted() {
        let certificate = alice_certificate(Some(ALICE.proof_witness()));
        for _ in 0..5 {
            assert!(prove_possession(&ALICE, &certificate, 255).unwrap());
        }
    }

    #[test]
    fn test_mismatched_proof_value_is_rejected() {
        let certificate = alice_certificate(Some(MALLORY.proof_witness()));
        assert!(!prove_possession(&ALICE, &certificate, 255).unwrap());
    }

    #[test]
    fn test_impostor_is_rejected() {
        let certificate = alice_certificate(Some(ALICE.proof_witness()));
        assert!(!prove_possession(&MALLORY, &certificate, 255).unwrap());
    }

    #[test]
    fn test_certificate_without_proof() {
        let certificate = alice_certificate(None);
        assert!(matches!(
            Verifier::new(&certificate, 255),
            Err(Error::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_challenge_range() {
        let certificate = alice_certificate(Some(ALICE.proof_witness()));
        for bits in [1u64, 8, 64] {
            let verifier = Verifier::new(&certificate, bits).unwrap();
            let (_, commitment) = Prover::commit(&ALICE).unwrap();
            let (_, challenge) = verifier.challenge(commitment);
            assert_eq!(challenge.value().bits(), bits);
        }
    }

    #[test]
    fn test_replayed_response_fails_fresh_challenge() {
        let certificate = alice_certificate(Some(ALICE.proof_witness()));

        let (prover, commitment) = Prover::commit(&ALICE).unwrap();
        let verifier = Verifier::new(&certificate, 255).unwrap();
        let (_, challenge) = verifier.challenge(commitment.clone());
        let response = prover.respond(&challenge);

        // A second verifier issues a different challenge for the same commitment.
        let verifier = Verifier::new(&certificate, 255).unwrap();
        let (pending, second) = verifier.challenge(commitment);
        assert_ne!(challenge, second);
        assert!(!pending.verify(&response));
    }
}
