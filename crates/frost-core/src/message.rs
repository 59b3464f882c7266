//! Protocol message envelope
//!
//! A closed tagged union: the envelope carries the sender, the recipient
//! (absent for broadcasts, wire value 0) and exactly one round payload, so
//! invalid type/payload combinations cannot be constructed.

use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar};
use serde::{Deserialize, Serialize};

use crate::{curve, party::PartyId, polynomial::PolynomialExponent, schnorr::SchnorrProof};

/// Message discriminator, one per protocol round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    KeyGen1,
    KeyGen2,
    Sign1,
    Sign2,
}

/// Round payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// Keygen round 1 broadcast: polynomial commitment plus proof of
    /// knowledge of its constant term.
    KeyGen1 {
        commitments: PolynomialExponent,
        proof: SchnorrProof,
    },
    /// Keygen round 2 unicast: the recipient's evaluation of the sender's
    /// polynomial.
    KeyGen2 {
        #[serde(with = "curve::scalar_serde")]
        share: Scalar,
    },
    /// Signing round 1 broadcast: nonce commitments `D = d·B`, `E = e·B`.
    Sign1 {
        #[serde(with = "curve::point_serde")]
        d: EdwardsPoint,
        #[serde(with = "curve::point_serde")]
        e: EdwardsPoint,
    },
    /// Signing round 2 broadcast: the sender's partial signature.
    Sign2 {
        #[serde(with = "curve::scalar_serde")]
        z: Scalar,
    },
}

/// An addressed protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: PartyId,
    /// `None` for broadcast; encoded as party id 0 on the wire.
    #[serde(with = "recipient_serde")]
    pub to: Option<PartyId>,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Message {
    pub fn keygen1(from: PartyId, commitments: PolynomialExponent, proof: SchnorrProof) -> Self {
        Self {
            from,
            to: None,
            payload: Payload::KeyGen1 { commitments, proof },
        }
    }

    pub fn keygen2(from: PartyId, to: PartyId, share: Scalar) -> Self {
        Self {
            from,
            to: Some(to),
            payload: Payload::KeyGen2 { share },
        }
    }

    pub fn sign1(from: PartyId, d: EdwardsPoint, e: EdwardsPoint) -> Self {
        Self {
            from,
            to: None,
            payload: Payload::Sign1 { d, e },
        }
    }

    pub fn sign2(from: PartyId, z: Scalar) -> Self {
        Self {
            from,
            to: None,
            payload: Payload::Sign2 { z },
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self.payload {
            Payload::KeyGen1 { .. } => MessageType::KeyGen1,
            Payload::KeyGen2 { .. } => MessageType::KeyGen2,
            Payload::Sign1 { .. } => MessageType::Sign1,
            Payload::Sign2 { .. } => MessageType::Sign2,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.to.is_none()
    }
}

mod recipient_serde {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use crate::party::PartyId;

    pub fn serialize<S>(to: &Option<PartyId>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u16(to.map_or(0, PartyId::as_u16))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<PartyId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match u16::deserialize(deserializer)? {
            0 => Ok(None),
            id => PartyId::new(id).map(Some).map_err(D::Error::custom),
        }
    }
}
