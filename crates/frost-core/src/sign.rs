//! FROST signing round machine
//!
//! Two-round threshold signing. At initialization every signer's public
//! share (and the local secret share) is scaled by its Lagrange coefficient
//! over the chosen signer set, turning the Shamir sharing into an additive
//! one for this session. Round 1 exchanges nonce commitment pairs and
//! produces the partial signature; round 2 verifies every peer's partial
//! against its nonce commitment before aggregating, so a corrupted partial
//! is attributed to its sender instead of surfacing as a bad signature.
//!
//! Binding factors follow the FROST construction: each signer's nonce pair
//! is bound to the message and to the full commitment list, which blocks
//! rogue-nonce attacks against concurrent sessions.

use std::collections::BTreeMap;

use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar, traits::{Identity, IsIdentity}};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tracing::{debug, info, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    curve,
    keys::{PublicKey, PublicKeySet, SecretShare},
    message::{Message, Payload},
    party::{PartyId, PartySet},
    signature::{compute_challenge, Signature},
    Error, Result,
};

const BINDING_DOMAIN: &[u8] = b"FROST-SHA512";

/// Where a signing session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignStatus {
    /// Waiting for the round 1 nonce commitment broadcasts.
    Round1,
    /// Waiting for the round 2 partial signatures.
    Round2,
    /// Finished successfully; secrets are wiped.
    Done,
    /// Failed terminally; secrets are wiped.
    Aborted,
}

/// Book-keeping for one co-signer. Identity points mark values that have
/// not arrived yet; identity commitments are invalid on the wire, so the
/// sentinel cannot be forged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Cosigner {
    /// Lagrange-weighted public share `λ_j · A_j`.
    #[serde(with = "curve::point_serde")]
    public: EdwardsPoint,
    /// Nonce commitments `D_j`, `E_j`.
    #[serde(with = "curve::point_serde")]
    d: EdwardsPoint,
    #[serde(with = "curve::point_serde")]
    e: EdwardsPoint,
    /// Nonce share `R_j = D_j + ρ_j·E_j`.
    #[serde(with = "curve::point_serde")]
    r: EdwardsPoint,
    /// Binding factor `ρ_j`.
    #[serde(with = "curve::scalar_serde")]
    rho: Scalar,
    /// Partial signature `z_j`.
    #[serde(with = "curve::scalar_serde")]
    z: Scalar,
}

impl Cosigner {
    fn new(public: EdwardsPoint) -> Self {
        Self {
            public,
            d: EdwardsPoint::identity(),
            e: EdwardsPoint::identity(),
            r: EdwardsPoint::identity(),
            rho: Scalar::ZERO,
            z: Scalar::ZERO,
        }
    }

    fn has_commitments(&self) -> bool {
        !self.d.is_identity() && !self.e.is_identity()
    }
}

/// Per-party state of one signing session.
///
/// Sessions are single-use: the Lagrange normalization and the nonces are
/// specific to this signer set and message, and everything secret is wiped
/// as soon as it has served its purpose.
#[derive(Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SignSession {
    #[zeroize(skip)]
    self_id: PartyId,
    #[zeroize(skip)]
    signer_ids: PartySet,
    #[zeroize(skip)]
    message: Vec<u8>,
    #[zeroize(skip)]
    group_key: PublicKey,
    /// Own secret share scaled by the Lagrange coefficient; wiped right
    /// after the partial signature is formed.
    #[serde(with = "curve::scalar_serde")]
    secret_share: Scalar,
    /// Private nonces `d`, `e`; single-use, wiped with the secret share.
    #[serde(with = "curve::scalar_serde")]
    nonce_d: Scalar,
    #[serde(with = "curve::scalar_serde")]
    nonce_e: Scalar,
    /// Aggregated nonce `R = Σ R_j`.
    #[zeroize(skip)]
    #[serde(with = "curve::point_serde")]
    big_r: EdwardsPoint,
    /// Challenge `c = H(R ‖ A ‖ m)`.
    #[zeroize(skip)]
    #[serde(with = "curve::scalar_serde")]
    challenge: Scalar,
    #[zeroize(skip)]
    signers: BTreeMap<PartyId, Cosigner>,
    #[zeroize(skip)]
    status: SignStatus,
}

impl SignSession {
    /// Start a signing session over `message` with the given signer set,
    /// emitting the nonce commitment broadcast.
    #[instrument(skip_all, fields(party = %secret_share.id()))]
    pub fn new<R: RngCore + CryptoRng>(
        signer_ids: PartySet,
        secret_share: &SecretShare,
        public: &PublicKeySet,
        message: Vec<u8>,
        rng: &mut R,
    ) -> Result<(Message, Self)> {
        let minimum = usize::from(public.threshold()) + 1;
        if signer_ids.len() < minimum {
            return Err(Error::Precondition(format!(
                "signing requires at least {minimum} signers, got {}",
                signer_ids.len()
            )));
        }
        if !signer_ids.contains(secret_share.id()) {
            return Err(Error::Precondition(format!(
                "own party {} is not in the signer set",
                secret_share.id()
            )));
        }
        if !signer_ids.is_subset_of(public.party_ids()) {
            return Err(Error::Precondition(
                "signer set is not a subset of the registered participants".into(),
            ));
        }

        let self_id = secret_share.id();
        info!(signers = signer_ids.len(), "starting signing session");

        // Scale every public share (and our secret share below) by its
        // Lagrange coefficient over the signer set: partial signatures then
        // reconstruct additively and the per-round λ factor disappears.
        let mut signers = BTreeMap::new();
        for id in signer_ids.iter() {
            let lambda = id.lagrange(&signer_ids)?;
            signers.insert(id, Cosigner::new(public.share(id)? * lambda));
        }

        let lambda = self_id.lagrange(&signer_ids)?;
        let normalized_share = lambda * secret_share.secret();

        let nonce_d = curve::random_scalar(rng);
        let nonce_e = curve::random_scalar(rng);
        let commitment_d = EdwardsPoint::mul_base(&nonce_d);
        let commitment_e = EdwardsPoint::mul_base(&nonce_e);
        if let Some(own) = signers.get_mut(&self_id) {
            own.d = commitment_d;
            own.e = commitment_e;
        }

        let session = Self {
            self_id,
            signer_ids,
            message,
            group_key: *public.group_key(),
            secret_share: normalized_share,
            nonce_d,
            nonce_e,
            big_r: EdwardsPoint::identity(),
            challenge: Scalar::ZERO,
            signers,
            status: SignStatus::Round1,
        };
        Ok((Message::sign1(self_id, commitment_d, commitment_e), session))
    }

    pub fn self_id(&self) -> PartyId {
        self.self_id
    }

    pub fn signer_ids(&self) -> &PartySet {
        &self.signer_ids
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn status(&self) -> SignStatus {
        self.status
    }

    /// Process the nonce commitments, derive the binding factors and emit
    /// our partial signature.
    #[instrument(skip_all, fields(party = %self.self_id))]
    pub fn round1(&mut self, messages: &[Message]) -> Result<Message> {
        self.guard(SignStatus::Round1)?;
        debug!(received = messages.len(), "processing signing round 1");
        match self.process_round1(messages) {
            Ok(out) => {
                self.status = SignStatus::Round2;
                Ok(out)
            }
            Err(error) => Err(self.abort(error)),
        }
    }

    fn process_round1(&mut self, messages: &[Message]) -> Result<Message> {
        for message in messages {
            if message.from == self.self_id {
                continue;
            }
            let Payload::Sign1 { d, e } = &message.payload else {
                return Err(Error::BadInput(format!(
                    "unexpected {:?} message in signing round 1",
                    message.message_type()
                )));
            };
            let Some(cosigner) = self.signers.get_mut(&message.from) else {
                return Err(Error::Precondition(format!(
                    "party {} is not part of this signing session",
                    message.from
                )));
            };
            if cosigner.has_commitments() {
                return Err(Error::BadInput(format!(
                    "duplicate nonce commitments from party {}",
                    message.from
                )));
            }
            if d.is_identity() || e.is_identity() {
                return Err(Error::BadInput(format!(
                    "identity nonce commitment from party {}",
                    message.from
                )));
            }
            cosigner.d = *d;
            cosigner.e = *e;
        }

        for (id, cosigner) in &self.signers {
            if !cosigner.has_commitments() {
                return Err(Error::Precondition(format!(
                    "missing nonce commitments from party {id}"
                )));
            }
        }

        self.compute_binding_factors();

        let mut big_r = EdwardsPoint::identity();
        for cosigner in self.signers.values_mut() {
            cosigner.r = cosigner.d + cosigner.e * cosigner.rho;
            big_r += cosigner.r;
        }
        self.big_r = big_r;
        self.challenge = compute_challenge(&self.big_r, &self.group_key, &self.message);

        let rho_self = self
            .signers
            .get(&self.self_id)
            .map(|cosigner| cosigner.rho)
            .ok_or_else(|| Error::Precondition("own signer entry is missing".into()))?;

        // z = d + e·ρ + s·c, with λ already folded into s
        let z = self.nonce_d + self.nonce_e * rho_self + self.secret_share * self.challenge;
        if let Some(own) = self.signers.get_mut(&self.self_id) {
            own.z = z;
        }

        // nonces and the normalized share are single-use
        self.nonce_d.zeroize();
        self.nonce_e.zeroize();
        self.secret_share.zeroize();

        debug!("signing round 1 complete");
        Ok(Message::sign2(self.self_id, z))
    }

    /// Verify every peer's partial signature and aggregate the result.
    #[instrument(skip_all, fields(party = %self.self_id))]
    pub fn round2(&mut self, messages: &[Message]) -> Result<Signature> {
        self.guard(SignStatus::Round2)?;
        debug!(received = messages.len(), "processing signing round 2");
        match self.process_round2(messages) {
            Ok(signature) => {
                self.status = SignStatus::Done;
                Ok(signature)
            }
            Err(error) => Err(self.abort(error)),
        }
    }

    fn process_round2(&mut self, messages: &[Message]) -> Result<Signature> {
        let mut received: Vec<PartyId> = Vec::with_capacity(messages.len());
        let neg_challenge = -self.challenge;

        for message in messages {
            if message.from == self.self_id {
                continue;
            }
            let Payload::Sign2 { z } = &message.payload else {
                return Err(Error::BadInput(format!(
                    "unexpected {:?} message in signing round 2",
                    message.message_type()
                )));
            };
            let Some(cosigner) = self.signers.get_mut(&message.from) else {
                return Err(Error::Precondition(format!(
                    "party {} is not part of this signing session",
                    message.from
                )));
            };
            if received.contains(&message.from) {
                return Err(Error::BadInput(format!(
                    "duplicate partial signature from party {}",
                    message.from
                )));
            }

            // z_j·B − c·(λ_j·A_j) must reproduce R_j
            let recovered = EdwardsPoint::vartime_double_scalar_mul_basepoint(
                &neg_challenge,
                &cosigner.public,
                z,
            );
            if recovered != cosigner.r {
                return Err(Error::InvalidPartial(message.from));
            }

            cosigner.z = *z;
            received.push(message.from);
        }

        for id in self.signer_ids.iter() {
            if id != self.self_id && !received.contains(&id) {
                return Err(Error::Precondition(format!(
                    "missing partial signature from party {id}"
                )));
            }
        }

        let s = self
            .signers
            .values()
            .fold(Scalar::ZERO, |acc, cosigner| acc + cosigner.z);
        let signature = Signature::new(self.big_r, s);

        // Inputs were all validated, so a failure here means the session
        // state itself is corrupt.
        if !self.group_key.verify(&self.message, &signature) {
            return Err(Error::AggregatedInvalid);
        }

        info!(party = %self.self_id, "signing complete");
        Ok(signature)
    }

    /// Binding factors, one per signer:
    /// `ρ_i = H("FROST-SHA512" ‖ i ‖ SHA-512(m) ‖ B)` where `B` is the
    /// concatenation of `(j ‖ D_j ‖ E_j)` over the sorted signer set. The id
    /// slot after the domain tag is rewritten once per signer, so each ρ_i
    /// is a function of `(i, m, B)` only.
    fn compute_binding_factors(&mut self) {
        let message_hash: [u8; 64] = Sha512::digest(&self.message).into();
        let id_offset = BINDING_DOMAIN.len();

        let mut buffer = Vec::with_capacity(
            id_offset
                + PartyId::ENCODED_LEN
                + message_hash.len()
                + self.signers.len() * (PartyId::ENCODED_LEN + 2 * curve::ENCODED_LEN),
        );
        buffer.extend_from_slice(BINDING_DOMAIN);
        buffer.extend_from_slice(&self.self_id.to_bytes());
        buffer.extend_from_slice(&message_hash);
        // the commitment list B, in sorted signer order
        for (id, cosigner) in &self.signers {
            buffer.extend_from_slice(&id.to_bytes());
            buffer.extend_from_slice(cosigner.d.compress().as_bytes());
            buffer.extend_from_slice(cosigner.e.compress().as_bytes());
        }

        for (id, cosigner) in self.signers.iter_mut() {
            buffer[id_offset..id_offset + PartyId::ENCODED_LEN].copy_from_slice(&id.to_bytes());
            let digest: [u8; 64] = Sha512::digest(&buffer).into();
            cosigner.rho = Scalar::from_bytes_mod_order_wide(&digest);
        }
    }

    fn guard(&self, expected: SignStatus) -> Result<()> {
        match self.status {
            SignStatus::Done | SignStatus::Aborted => Err(Error::SessionAborted),
            status if status == expected => Ok(()),
            _ => Err(Error::Precondition(format!(
                "signing round called out of order (status {:?})",
                self.status
            ))),
        }
    }

    fn abort(&mut self, error: Error) -> Error {
        self.nonce_d.zeroize();
        self.nonce_e.zeroize();
        self.secret_share.zeroize();
        self.status = SignStatus::Aborted;
        error
    }
}

impl std::fmt::Debug for SignSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignSession")
            .field("self_id", &self.self_id)
            .field("signer_ids", &self.signer_ids)
            .field("status", &self.status)
            .field("secret_share", &"[REDACTED]")
            .field("nonces", &"[REDACTED]")
            .finish()
    }
}
