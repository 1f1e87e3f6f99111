use crate::Error;

/// Tunables shared by key generation, the certificate authority and conversations.
#[derive(Clone, Debug)]
pub struct CryptoConfig {
    /// Bit width of each RSA prime. The modulus is twice as wide.
    pub rsa_prime_bits: u64,
    /// Number of Miller-Rabin witnesses per primality test.
    pub primality_rounds: usize,
    /// Well-known identity under which the authority key pair is stored.
    pub authority_name: String,
    /// Length in bytes of freshly generated conversation chain keys.
    pub chain_key_len: usize,
    /// Length in bytes of freshly generated conversation salts.
    pub salt_len: usize,
    /// Challenges in the proof of knowledge are drawn from `[2^(bits-1), 2^bits)`.
    pub proof_challenge_bits: u64,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            rsa_prime_bits: 1024,
            primality_rounds: 10,
            authority_name: "authority".to_string(),
            chain_key_len: 32,
            salt_len: 16,
            proof_challenge_bits: 255,
        }
    }
}

impl CryptoConfig {
    /// Rejects tunables that would only fail later, deep inside key generation or
    /// conversation bootstrap.
    ///
    /// Conversation state is wrapped in a single RSA block together with a one-byte
    /// frame marker, so the modulus must be wider than the longer of the chain key
    /// and the salt.
    pub fn validate(&self) -> Result<(), Error> {
        if self.rsa_prime_bits < 64 {
            return Err(Error::InvalidInput(format!(
                "RSA primes must be at least 64 bits, got {}",
                self.rsa_prime_bits
            )));
        }
        if self.primality_rounds == 0 {
            return Err(Error::InvalidInput(
                "primality testing needs at least one round".to_string(),
            ));
        }
        if self.authority_name.is_empty() {
            return Err(Error::InvalidInput("authority name is empty".to_string()));
        }
        if self.chain_key_len == 0 {
            return Err(Error::InvalidInput("chain keys cannot be empty".to_string()));
        }

        let wrapped_bits = 8 * (self.chain_key_len.max(self.salt_len) as u64 + 1);
        if 2 * self.rsa_prime_bits <= wrapped_bits {
            return Err(Error::InvalidInput(format!(
                "{}-bit primes cannot wrap {} bytes of chain state",
                self.rsa_prime_bits,
                self.chain_key_len.max(self.salt_len)
            )));
        }
        Ok(())
    }
}
