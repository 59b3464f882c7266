//! Non-interactive Schnorr proof of knowledge
//!
//! Used during key generation to prove knowledge of the discrete log of the
//! commitment's constant term. The challenge binds the prover's party id,
//! the public element and a 32-byte context, so proofs cannot be replayed
//! across parties or deployments.

use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{curve, party::PartyId};

const DOMAIN: &[u8] = b"FROST-Schnorr";

/// Replay-domain context bound into the challenge.
pub type Context = [u8; 32];

/// A Schnorr proof `(M, s)` with `M = k·B` and `s = k + e·secret`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrProof {
    #[serde(with = "curve::point_serde")]
    commitment: EdwardsPoint,
    #[serde(with = "curve::scalar_serde")]
    response: Scalar,
}

impl SchnorrProof {
    /// Prove knowledge of `secret` where `public = secret·B`, bound to the
    /// prover's id and `context`.
    pub fn new<R: RngCore + CryptoRng>(
        rng: &mut R,
        prover: PartyId,
        public: &EdwardsPoint,
        context: &Context,
        secret: &Scalar,
    ) -> Self {
        let nonce = curve::random_scalar(rng);
        let commitment = EdwardsPoint::mul_base(&nonce);
        let e = challenge(prover, public, context, &commitment);
        let response = nonce + e * secret;
        Self {
            commitment,
            response,
        }
    }

    /// Accept iff `s·B − e·public = M`.
    #[must_use]
    pub fn verify(&self, prover: PartyId, public: &EdwardsPoint, context: &Context) -> bool {
        let e = challenge(prover, public, context, &self.commitment);
        let recovered =
            EdwardsPoint::vartime_double_scalar_mul_basepoint(&-e, public, &self.response);
        recovered == self.commitment
    }
}

fn challenge(
    prover: PartyId,
    public: &EdwardsPoint,
    context: &Context,
    commitment: &EdwardsPoint,
) -> Scalar {
    curve::hash_to_scalar(&[
        DOMAIN,
        &prover.to_bytes(),
        context,
        public.compress().as_bytes(),
        commitment.compress().as_bytes(),
    ])
}
