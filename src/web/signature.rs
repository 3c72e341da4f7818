//! Ed25519 verification of Discord interaction requests

use ed25519_dalek::{Signature, VerifyingKey};

/// Checks `X-Signature-Ed25519` over `X-Signature-Timestamp ‖ body`.
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    /// Build from the application's hex-encoded public key.
    pub fn from_hex(public_key: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(public_key.trim())
            .map_err(|e| anyhow::anyhow!("DISCORD_PUBLIC_KEY is not valid hex: {}", e))?;
        let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!("DISCORD_PUBLIC_KEY must be 32 bytes, got {}", bytes.len())
        })?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| anyhow::anyhow!("DISCORD_PUBLIC_KEY is not a valid Ed25519 key: {}", e))?;
        Ok(Self { key })
    }

    pub fn verify(&self, signature_hex: &str, timestamp: &str, body: &[u8]) -> bool {
        let Ok(raw) = hex::decode(signature_hex.trim()) else {
            return false;
        };
        let Ok(raw) = <[u8; 64]>::try_from(raw.as_slice()) else {
            return false;
        };
        let signature = Signature::from_bytes(&raw);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key.verify_strict(&message, &signature).is_ok()
    }
}

#[cfg(test)]
pub(crate) mod test_keys {
    use ed25519_dalek::{Signer, SigningKey};

    pub fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    pub fn public_key_hex() -> String {
        hex::encode(signing_key().verifying_key().to_bytes())
    }

    pub fn sign(timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(signing_key().sign(&message).to_bytes())
    }
}
