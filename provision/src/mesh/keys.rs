use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{x25519, X25519_BASEPOINT_BYTES};

use crate::error::MeshError;

pub const KEY_LEN: usize = 32;

/// WireGuard key pair of one host
#[derive(Clone, PartialEq, Eq)]
pub struct HostKeyPair {
    private: [u8; KEY_LEN],
    public: [u8; KEY_LEN],
}

impl HostKeyPair {
    /// Build a key pair from raw scalar bytes, clamping them first
    pub fn from_private(private: [u8; KEY_LEN]) -> Self {
        let private = clamp(private);
        let public = x25519(private, X25519_BASEPOINT_BYTES);
        Self { private, public }
    }

    pub fn private_key(&self) -> &[u8; KEY_LEN] {
        &self.private
    }

    pub fn public_key(&self) -> &[u8; KEY_LEN] {
        &self.public
    }

    pub fn private_key_base64(&self) -> String {
        STANDARD.encode(self.private)
    }

    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.public)
    }
}

impl fmt::Debug for HostKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostKeyPair")
            .field("public", &self.public_key_base64())
            .field("private", &"<redacted>")
            .finish()
    }
}

/// Curve25519 scalar clamping
pub fn clamp(mut key: [u8; KEY_LEN]) -> [u8; KEY_LEN] {
    key[0] &= 248;
    key[31] = (key[31] & 127) | 64;
    key
}

/// Generates host key pairs from a random source
pub struct MeshKeyGenerator<R = OsRng> {
    rng: R,
}

impl MeshKeyGenerator<OsRng> {
    pub fn new() -> Self {
        Self { rng: OsRng }
    }
}

impl Default for MeshKeyGenerator<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> MeshKeyGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self) -> Result<HostKeyPair, MeshError> {
        let mut private = [0u8; KEY_LEN];
        self.rng
            .try_fill_bytes(&mut private)
            .map_err(|e| MeshError::Entropy(e.to_string()))?;
        Ok(HostKeyPair::from_private(private))
    }
}
