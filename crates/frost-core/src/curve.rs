//! Group and scalar primitives
//!
//! All protocol arithmetic happens on the prime-order subgroup of
//! edwards25519. Encodings are the canonical 32-byte compressed form;
//! decoding rejects non-canonical encodings and points carrying a
//! small-subgroup component, so every point that enters the protocol lives
//! in the prime-order group. This keeps the DKG free of small-subgroup
//! confinement while the emitted signatures stay byte-compatible with the
//! stock Ed25519 verifier.

use curve25519_dalek::{
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar,
};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};

use crate::{Error, Result};

/// Byte length of point and scalar encodings.
pub const ENCODED_LEN: usize = 32;

/// Sample a uniformly random scalar.
///
/// Draws 64 bytes from the rng and reduces mod the group order, so the
/// result carries no modular bias.
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Hash the concatenation of `parts` with SHA-512 and reduce the 64-byte
/// digest to a scalar.
pub fn hash_to_scalar(parts: &[&[u8]]) -> Scalar {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let digest: [u8; 64] = hasher.finalize().into();
    Scalar::from_bytes_mod_order_wide(&digest)
}

/// Decode a canonical 32-byte point encoding.
///
/// Rejects encodings that do not decompress, non-canonical encodings (the
/// re-compressed bytes must match the input) and points outside the
/// prime-order subgroup.
pub fn decode_point(bytes: &[u8; 32]) -> Result<EdwardsPoint> {
    let point = CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or_else(|| Error::BadInput("invalid point encoding".into()))?;
    if point.compress().as_bytes() != bytes {
        return Err(Error::BadInput("non-canonical point encoding".into()));
    }
    if !point.is_torsion_free() {
        return Err(Error::BadInput(
            "point is outside the prime-order subgroup".into(),
        ));
    }
    Ok(point)
}

/// Decode a canonical 32-byte scalar encoding, rejecting values >= the group
/// order. Clamping is never applied here; these are stored scalars, not seed
/// bytes.
pub fn decode_scalar(bytes: &[u8; 32]) -> Result<Scalar> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(*bytes))
        .ok_or_else(|| Error::BadInput("non-canonical scalar encoding".into()))
}

fn bytes_from_hex(encoded: &str) -> std::result::Result<[u8; 32], String> {
    let raw = hex::decode(encoded).map_err(|e| format!("invalid hex: {e}"))?;
    raw.try_into()
        .map_err(|_| format!("expected {ENCODED_LEN} bytes"))
}

/// Serde adapter rendering points as canonical hex strings.
pub mod point_serde {
    use curve25519_dalek::edwards::EdwardsPoint;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(point: &EdwardsPoint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(point.compress().as_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<EdwardsPoint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = super::bytes_from_hex(&encoded).map_err(D::Error::custom)?;
        super::decode_point(&bytes).map_err(D::Error::custom)
    }
}

/// Serde adapter rendering scalars as canonical hex strings.
pub mod scalar_serde {
    use curve25519_dalek::scalar::Scalar;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(scalar: &Scalar, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(scalar.to_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Scalar, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = super::bytes_from_hex(&encoded).map_err(D::Error::custom)?;
        super::decode_scalar(&bytes).map_err(D::Error::custom)
    }
}
