//! Key material produced by the DKG
//!
//! [`PublicKeySet`] is the public output every party derives identically:
//! the group key plus one public share per participant. [`SecretShare`] is
//! the private output held by exactly one party.

use std::collections::BTreeMap;
use std::fmt;

use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    curve,
    party::{PartyId, PartySet},
    signature::{compute_challenge, Signature},
    Error, Result,
};

/// The group public key `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "curve::point_serde")] EdwardsPoint);

impl PublicKey {
    pub fn from_point(point: EdwardsPoint) -> Self {
        Self(point)
    }

    pub fn as_point(&self) -> &EdwardsPoint {
        &self.0
    }

    /// Canonical 32-byte encoding, also valid as an Ed25519 public key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        Ok(Self(curve::decode_point(bytes)?))
    }

    /// Reinterpret as a key for the standard Ed25519 verifier.
    pub fn to_ed25519(&self) -> Result<ed25519_dalek::VerifyingKey> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.to_bytes())
            .map_err(|e| Error::BadInput(format!("not a valid Ed25519 public key: {e}")))
    }

    /// Group-equation verification: accept iff `S·B = R + c·A` with
    /// `c = H(R ‖ A ‖ m)`.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let c = compute_challenge(signature.r(), self, message);
        let recovered =
            EdwardsPoint::vartime_double_scalar_mul_basepoint(&-c, &self.0, signature.s());
        recovered == *signature.r()
    }
}

/// Public result of a completed key generation: the group key and the public
/// share of every participant. Identical at every honest party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeySet {
    threshold: u16,
    party_ids: PartySet,
    #[serde(with = "share_map_serde")]
    shares: BTreeMap<PartyId, EdwardsPoint>,
    group_key: PublicKey,
}

impl PublicKeySet {
    pub(crate) fn new(
        threshold: u16,
        party_ids: PartySet,
        group_key: PublicKey,
        shares: BTreeMap<PartyId, EdwardsPoint>,
    ) -> Result<Self> {
        for id in party_ids.iter() {
            if !shares.contains_key(&id) {
                return Err(Error::Precondition(format!(
                    "party {id} has no public share"
                )));
            }
        }
        if shares.len() != party_ids.len() {
            return Err(Error::Precondition(
                "public shares do not match the party set".into(),
            ));
        }
        Ok(Self {
            threshold,
            party_ids,
            shares,
            group_key,
        })
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    pub fn party_ids(&self) -> &PartySet {
        &self.party_ids
    }

    pub fn group_key(&self) -> &PublicKey {
        &self.group_key
    }

    pub fn share(&self, id: PartyId) -> Result<&EdwardsPoint> {
        self.shares
            .get(&id)
            .ok_or_else(|| Error::Precondition(format!("party {id} has no public share")))
    }

    pub fn shares(&self) -> &BTreeMap<PartyId, EdwardsPoint> {
        &self.shares
    }
}

/// One party's private output of the DKG: `(id, s_id)` with
/// `s_id·B = A_id`. Wiped on drop.
#[derive(Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretShare {
    #[zeroize(skip)]
    id: PartyId,
    #[serde(with = "curve::scalar_serde")]
    secret: Scalar,
}

impl SecretShare {
    pub fn new(id: PartyId, secret: Scalar) -> Self {
        Self { id, secret }
    }

    pub fn id(&self) -> PartyId {
        self.id
    }

    pub fn secret(&self) -> &Scalar {
        &self.secret
    }
}

impl fmt::Debug for SecretShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretShare")
            .field("id", &self.id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

mod share_map_serde {
    use std::collections::BTreeMap;

    use curve25519_dalek::edwards::EdwardsPoint;
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    use crate::{curve, party::PartyId};

    pub fn serialize<S>(
        map: &BTreeMap<PartyId, EdwardsPoint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded: BTreeMap<PartyId, String> = map
            .iter()
            .map(|(id, point)| (*id, hex::encode(point.compress().as_bytes())))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<PartyId, EdwardsPoint>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: BTreeMap<PartyId, String> = BTreeMap::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(id, hex_point)| {
                let raw = hex::decode(&hex_point).map_err(D::Error::custom)?;
                let bytes: [u8; 32] = raw
                    .try_into()
                    .map_err(|_| D::Error::custom("expected 32 bytes"))?;
                let point = curve::decode_point(&bytes).map_err(D::Error::custom)?;
                Ok((id, point))
            })
            .collect()
    }
}
