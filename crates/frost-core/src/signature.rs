//! Signatures and the Ed25519-layout challenge

use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar};
use serde::{Deserialize, Serialize};

use crate::{curve, keys::PublicKey, Error, Result};

/// Wire length of a signature: `R (32) ‖ S (32)`.
pub const SIGNATURE_LEN: usize = 64;

/// A Schnorr signature `(R, S)` over the group.
///
/// The 64-byte wire form is accepted by a stock Ed25519 verifier when paired
/// with the group key's 32-byte encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "curve::point_serde")]
    r: EdwardsPoint,
    #[serde(with = "curve::scalar_serde")]
    s: Scalar,
}

impl Signature {
    pub fn new(r: EdwardsPoint, s: Scalar) -> Self {
        Self { r, s }
    }

    pub fn r(&self) -> &EdwardsPoint {
        &self.r
    }

    pub fn s(&self) -> &Scalar {
        &self.s
    }

    /// Canonical 64-byte encoding `R ‖ S`.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..32].copy_from_slice(self.r.compress().as_bytes());
        bytes[32..].copy_from_slice(&self.s.to_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; SIGNATURE_LEN]) -> Result<Self> {
        let r_bytes: [u8; 32] = bytes[..32]
            .try_into()
            .map_err(|_| Error::BadInput("truncated signature".into()))?;
        let s_bytes: [u8; 32] = bytes[32..]
            .try_into()
            .map_err(|_| Error::BadInput("truncated signature".into()))?;
        Ok(Self {
            r: curve::decode_point(&r_bytes)?,
            s: curve::decode_scalar(&s_bytes)?,
        })
    }

    /// Reinterpret as an Ed25519 signature for the standard verifier.
    pub fn to_ed25519(&self) -> ed25519_dalek::Signature {
        ed25519_dalek::Signature::from_bytes(&self.to_bytes())
    }
}

/// The Ed25519 challenge `c = H(R ‖ A ‖ m)`, SHA-512 reduced mod the group
/// order. Matching Ed25519's layout is what makes the aggregated signature
/// acceptable to stock verifiers.
pub fn compute_challenge(big_r: &EdwardsPoint, group_key: &PublicKey, message: &[u8]) -> Scalar {
    curve::hash_to_scalar(&[
        big_r.compress().as_bytes(),
        &group_key.to_bytes(),
        message,
    ])
}
