use aes_gcm::{
    Aes256Gcm, Key,
    aead::{Aead, AeadCore, KeyInit, Nonce, OsRng, rand_core::RngCore},
};
use anyhow::{Context, Result, anyhow, ensure};
use argon2::Argon2;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Password-based sealing of a seed phrase
///
/// Output format is `hex(salt):hex(nonce):hex(ciphertext)`. The key is
/// derived with Argon2id (default parameters) from the password and salt;
/// the payload is sealed with AES-256-GCM.
pub struct SeedCipher;

impl SeedCipher {
    pub fn encrypt(plaintext: &str, password: &str) -> Result<String> {
        ensure!(!password.is_empty(), "password must not be empty");

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let cipher = Self::cipher(password, &salt)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow!("failed to encrypt seed: {e}"))?;

        Ok(format!(
            "{}:{}:{}",
            hex::encode(salt),
            hex::encode(nonce),
            hex::encode(ciphertext)
        ))
    }

    pub fn decrypt(encrypted: &str, password: &str) -> Result<String> {
        let mut parts = encrypted.trim().split(':');
        let (Some(salt), Some(nonce), Some(ciphertext), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            anyhow::bail!("failed to parse encrypted seed: expected salt:nonce:ciphertext");
        };

        let salt = hex::decode(salt).context("failed to decode salt")?;
        let nonce = hex::decode(nonce).context("failed to decode nonce")?;
        let ciphertext = hex::decode(ciphertext).context("failed to decode ciphertext")?;
        ensure!(
            nonce.len() == NONCE_LEN,
            "invalid nonce length: {}",
            nonce.len()
        );

        let cipher = Self::cipher(password, &salt)?;
        let plaintext = cipher
            .decrypt(Nonce::<Aes256Gcm>::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| anyhow!("failed to decrypt seed: wrong password or corrupted data"))?;

        String::from_utf8(plaintext).context("decrypted seed is not valid utf-8")
    }

    fn cipher(password: &str, salt: &[u8]) -> Result<Aes256Gcm> {
        let mut key = Key::<Aes256Gcm>::default();
        Argon2::default()
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|e| anyhow!("failed to derive key: {e}"))?;

        Ok(Aes256Gcm::new(&key))
    }
}
