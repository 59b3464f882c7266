//! Distributed key generation round machine
//!
//! Two-round Pedersen-style DKG with Feldman VSS: every party deals a random
//! polynomial, broadcasts its commitment with a Schnorr proof of knowledge
//! of the constant term, then sends one polynomial evaluation to each peer.
//! Received evaluations are checked against the sender's commitment before
//! they are folded into the local secret share. The sum of all commitments
//! yields the group key and every party's public share, so all honest
//! parties finish with the identical public output.
//!
//! The session is driven by its host: `new` emits the round 1 broadcast,
//! `round1` consumes the peers' broadcasts and emits one unicast share per
//! peer, `round2` consumes the incoming shares and returns the outputs. Any
//! failure wipes the secret state and parks the session in `Aborted`.

use std::collections::BTreeMap;

use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    curve,
    keys::{PublicKey, PublicKeySet, SecretShare},
    message::{Message, Payload},
    party::{PartyId, PartySet},
    polynomial::{Polynomial, PolynomialExponent},
    schnorr::{Context, SchnorrProof},
    Error, Result,
};

/// Context bound into the keygen proofs of knowledge. All-zero today; a
/// deployment that needs to domain-separate key generation ceremonies (e.g.
/// by a group epoch) can thread a different value through [`SchnorrProof`].
pub const KEYGEN_CONTEXT: Context = [0u8; 32];

/// Where a keygen session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeygenStatus {
    /// Waiting for the round 1 commitment broadcasts.
    Round1,
    /// Waiting for the round 2 share unicasts.
    Round2,
    /// Finished successfully; secrets are wiped.
    Done,
    /// Failed terminally; secrets are wiped.
    Aborted,
}

/// Per-party state of the key generation protocol.
#[derive(Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeygenSession {
    #[zeroize(skip)]
    self_id: PartyId,
    #[zeroize(skip)]
    party_ids: PartySet,
    #[zeroize(skip)]
    threshold: u16,
    /// Own dealing polynomial; constant term is this party's secret
    /// contribution. Destroyed once the session terminates.
    polynomial: Polynomial,
    /// Running sum of received shares, seeded with `f(self_id)`.
    #[serde(with = "curve::scalar_serde")]
    secret: Scalar,
    /// Commitments received from peers in round 1.
    #[zeroize(skip)]
    commitments: BTreeMap<PartyId, PolynomialExponent>,
    /// Pointwise sum of all commitments, own included.
    #[zeroize(skip)]
    commitments_sum: Option<PolynomialExponent>,
    #[zeroize(skip)]
    status: KeygenStatus,
}

impl KeygenSession {
    /// Start key generation for `self_id` among parties `{1, …, parties}`
    /// with the given threshold, emitting the round 1 broadcast.
    ///
    /// Any `threshold + 1` parties will later be able to sign; `threshold`
    /// or fewer learn nothing about the group secret.
    #[instrument(skip(rng))]
    pub fn new<R: RngCore + CryptoRng>(
        self_id: PartyId,
        parties: u16,
        threshold: u16,
        rng: &mut R,
    ) -> Result<(Message, Self)> {
        if parties < 2 {
            return Err(Error::Precondition(format!(
                "key generation needs at least 2 parties, got {parties}"
            )));
        }
        if threshold == 0 || threshold >= parties {
            return Err(Error::Precondition(format!(
                "threshold must satisfy 1 <= t < n, got t={threshold} n={parties}"
            )));
        }
        if self_id.as_u16() > parties {
            return Err(Error::Precondition(format!(
                "party id {self_id} is outside 1..={parties}"
            )));
        }

        info!(party = %self_id, n = parties, t = threshold, "starting key generation");

        let secret = curve::random_scalar(rng);
        let polynomial = Polynomial::new(threshold, secret, rng);
        let commitments = PolynomialExponent::from_polynomial(&polynomial);
        let proof = SchnorrProof::new(rng, self_id, &commitments.constant(), &KEYGEN_CONTEXT, &secret);

        // The accumulator starts from our own share of our own polynomial,
        // so round 2 only needs to add what the peers send.
        let own_share = polynomial.evaluate_at(self_id)?;

        let session = Self {
            self_id,
            party_ids: PartySet::full(parties)?,
            threshold,
            polynomial,
            secret: own_share,
            commitments: BTreeMap::new(),
            commitments_sum: None,
            status: KeygenStatus::Round1,
        };
        Ok((Message::keygen1(self_id, commitments, proof), session))
    }

    pub fn self_id(&self) -> PartyId {
        self.self_id
    }

    pub fn party_ids(&self) -> &PartySet {
        &self.party_ids
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    pub fn status(&self) -> KeygenStatus {
        self.status
    }

    /// Process the round 1 commitment broadcasts and deal one share to every
    /// other party.
    ///
    /// A peer whose broadcast is missing from the batch still receives its
    /// share; the gap turns into a deterministic failure in `round2`, where
    /// its commitment is required.
    #[instrument(skip_all, fields(party = %self.self_id))]
    pub fn round1(&mut self, messages: &[Message]) -> Result<Vec<Message>> {
        self.guard(KeygenStatus::Round1)?;
        debug!(received = messages.len(), "processing keygen round 1");
        match self.process_round1(messages) {
            Ok(out) => {
                self.status = KeygenStatus::Round2;
                Ok(out)
            }
            Err(error) => Err(self.abort(error)),
        }
    }

    fn process_round1(&mut self, messages: &[Message]) -> Result<Vec<Message>> {
        let mut sum = PolynomialExponent::from_polynomial(&self.polynomial);

        for message in messages {
            if message.from == self.self_id {
                // own broadcast echoed back by the transport
                continue;
            }
            let Payload::KeyGen1 { commitments, proof } = &message.payload else {
                return Err(Error::BadInput(format!(
                    "unexpected {:?} message in keygen round 1",
                    message.message_type()
                )));
            };
            if !self.party_ids.contains(message.from) {
                return Err(Error::Precondition(format!(
                    "sender {} is not a participant",
                    message.from
                )));
            }
            if self.commitments.contains_key(&message.from) {
                return Err(Error::BadInput(format!(
                    "duplicate round 1 message from party {}",
                    message.from
                )));
            }
            if commitments.degree() != self.threshold {
                return Err(Error::BadInput(format!(
                    "commitment from party {} has degree {}, expected {}",
                    message.from,
                    commitments.degree(),
                    self.threshold
                )));
            }
            if !proof.verify(message.from, &commitments.constant(), &KEYGEN_CONTEXT) {
                return Err(Error::PoKFailure(message.from));
            }
            sum.add_assign(commitments)?;
            self.commitments.insert(message.from, commitments.clone());
        }
        self.commitments_sum = Some(sum);

        let mut out = Vec::with_capacity(self.party_ids.len() - 1);
        for id in self.party_ids.iter() {
            if id == self.self_id {
                continue;
            }
            let share = self.polynomial.evaluate_at(id)?;
            out.push(Message::keygen2(self.self_id, id, share));
        }
        debug!(dealt = out.len(), "keygen round 1 complete");
        Ok(out)
    }

    /// Verify the incoming shares against their senders' commitments, fold
    /// them into the secret and produce the final outputs.
    #[instrument(skip_all, fields(party = %self.self_id))]
    pub fn round2(&mut self, messages: &[Message]) -> Result<(PublicKeySet, SecretShare)> {
        self.guard(KeygenStatus::Round2)?;
        debug!(received = messages.len(), "processing keygen round 2");
        match self.process_round2(messages) {
            Ok(output) => {
                self.polynomial.reset();
                self.secret.zeroize();
                self.status = KeygenStatus::Done;
                Ok(output)
            }
            Err(error) => Err(self.abort(error)),
        }
    }

    fn process_round2(&mut self, messages: &[Message]) -> Result<(PublicKeySet, SecretShare)> {
        let mut received: Vec<PartyId> = Vec::with_capacity(messages.len());

        for message in messages {
            if message.from == self.self_id {
                continue;
            }
            let Payload::KeyGen2 { share } = &message.payload else {
                return Err(Error::BadInput(format!(
                    "unexpected {:?} message in keygen round 2",
                    message.message_type()
                )));
            };
            if !self.party_ids.contains(message.from) {
                return Err(Error::Precondition(format!(
                    "sender {} is not a participant",
                    message.from
                )));
            }
            if message.to != Some(self.self_id) {
                return Err(Error::BadInput(format!(
                    "round 2 share from party {} is not addressed to this party",
                    message.from
                )));
            }
            if received.contains(&message.from) {
                return Err(Error::BadInput(format!(
                    "duplicate round 2 share from party {}",
                    message.from
                )));
            }
            let Some(commitments) = self.commitments.get(&message.from) else {
                return Err(Error::Precondition(format!(
                    "no round 1 commitment on record for party {}",
                    message.from
                )));
            };

            // Feldman check: σ·B must equal F_sender(self_id)
            let expected = commitments.evaluate_at(self.self_id);
            if EdwardsPoint::mul_base(share) != expected {
                return Err(Error::VssFailure(message.from));
            }

            self.secret += share;
            received.push(message.from);
        }

        for id in self.party_ids.iter() {
            if id != self.self_id && !received.contains(&id) {
                return Err(Error::Precondition(format!(
                    "missing round 2 share from party {id}"
                )));
            }
        }

        let sum = self
            .commitments_sum
            .as_ref()
            .ok_or_else(|| Error::Precondition("round 1 did not run".into()))?;

        let mut shares = BTreeMap::new();
        for id in self.party_ids.iter() {
            shares.insert(id, sum.evaluate_at(id));
        }
        let group_key = PublicKey::from_point(sum.constant());
        let public = PublicKeySet::new(self.threshold, self.party_ids.clone(), group_key, shares)?;
        let secret_share = SecretShare::new(self.self_id, self.secret);

        info!(
            party = %self.self_id,
            group_key = %hex::encode(group_key.to_bytes()),
            "key generation complete"
        );
        Ok((public, secret_share))
    }

    fn guard(&self, expected: KeygenStatus) -> Result<()> {
        match self.status {
            KeygenStatus::Done | KeygenStatus::Aborted => Err(Error::SessionAborted),
            status if status == expected => Ok(()),
            _ => Err(Error::Precondition(format!(
                "keygen round called out of order (status {:?})",
                self.status
            ))),
        }
    }

    fn abort(&mut self, error: Error) -> Error {
        self.polynomial.reset();
        self.secret.zeroize();
        self.status = KeygenStatus::Aborted;
        error
    }
}

impl std::fmt::Debug for KeygenSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeygenSession")
            .field("self_id", &self.self_id)
            .field("party_ids", &self.party_ids)
            .field("threshold", &self.threshold)
            .field("status", &self.status)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
