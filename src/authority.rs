use crate::{Error, KeyPair, PublicKey, SignatureVerifier, Signer};
use num_bigint::BigUint;

/// A signed binding of an identity name to an RSA public key.
///
/// Certificates are immutable. Re-issuing produces a new certificate that
/// replaces the stored one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    pub(crate) subject_name: String,
    pub(crate) subject_public_key: PublicKey,
    pub(crate) proof: Option<BigUint>,
    pub(crate) signature: BigUint,
}

impl Certificate {
    /// The certified identity.
    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    /// The certified public key.
    pub fn subject_public_key(&self) -> &PublicKey {
        &self.subject_public_key
    }

    /// Public witness `d^e mod n` used by the proof of knowledge, if one was embedded.
    pub fn proof(&self) -> Option<&BigUint> {
        self.proof.as_ref()
    }

    /// The authority's signature over the name and key.
    pub fn signature(&self) -> &BigUint {
        &self.signature
    }

    /// Bytes covered by the signature: `"{name}:{n}:{e}"` with decimal integers.
    pub(crate) fn signed_data(name: &str, public_key: &PublicKey) -> Vec<u8> {
        format!(
            "{name}:{}:{}",
            public_key.modulus(),
            public_key.exponent()
        )
        .into_bytes()
    }
}

/// Issues and verifies certificates under a single authority key pair.
pub struct CertificateAuthority {
    keys: KeyPair,
}

impl CertificateAuthority {
    pub fn new(keys: KeyPair) -> Self {
        Self { keys }
    }

    /// The key that verifies this authority's signatures.
    pub fn public_key(&self) -> &PublicKey {
        self.keys.public()
    }

    /// Signs the binding of `subject_name` to `public_key`.
    ///
    /// The optional `proof` value travels with the certificate but is not
    /// covered by the signature.
    pub fn create_certificate(
        &self,
        public_key: &PublicKey,
        subject_name: &str,
        proof: Option<BigUint>,
    ) -> Certificate {
        let data = Certificate::signed_data(subject_name, public_key);
        let signature = self.keys.private().sign(&data);

        tracing::info!(subject = subject_name, has_proof = proof.is_some(), "issued certificate");

        Certificate {
            subject_name: subject_name.to_string(),
            subject_public_key: public_key.clone(),
            proof,
            signature,
        }
    }

    /// Whether `certificate` carries a valid signature from this authority.
    pub fn verify_certificate(&self, certificate: &Certificate) -> bool {
        let data =
            Certificate::signed_data(&certificate.subject_name, &certificate.subject_public_key);
        let valid = self.keys.public().verify(&data, &certificate.signature);
        if !valid {
            tracing::warn!(
                subject = %certificate.subject_name,
                "certificate signature does not match authority"
            );
        }
        valid
    }

    /// Like [`CertificateAuthority::verify_certificate`], as a `Result`.
    pub fn check_certificate(&self, certificate: &Certificate) -> Result<(), Error> {
        if self.verify_certificate(certificate) {
            Ok(())
        } else {
            Err(Error::VerificationFailed(format!(
                "certificate for {} was not issued by this authority",
                certificate.subject_name
            )))
        }
    }
}
