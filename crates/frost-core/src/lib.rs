//! # frost-core
//!
//! FROST (Flexible Round-Optimized Schnorr Threshold) signatures producing
//! standard Ed25519-verifiable output.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Distributed Key Generation**: two rounds; N parties jointly derive an
//!   Ed25519-compatible group key without the private key ever existing in
//!   one place. Commitments carry Schnorr proofs of knowledge and every
//!   received share passes a Feldman VSS check.
//! - **Threshold Signing**: two rounds; any T+1 of the N parties produce a
//!   signature on a message. Nonce commitments are bound to the message and
//!   the signer set through FROST binding factors, and every partial
//!   signature is verified before aggregation.
//! - **Message Envelope**: a closed tagged union with broadcast/unicast
//!   addressing; the host owns all transport.
//! - **Persistable State**: session objects and messages serialize with
//!   `serde`, so a host can park a party on disk between rounds.
//!
//! ## Protocol Flow
//!
//! ```text
//! Keygen:  new ──KG1 broadcast──► round1 ──KG2 unicasts──► round2
//!          └─► (PublicKeySet, SecretShare) at every party
//!
//! Signing: new ──S1 broadcast──► round1 ──S2 broadcast──► round2
//!          └─► Signature, verified against the group key
//! ```
//!
//! Each party is an independent state machine stepped by its host with
//! batches of inbound messages. Round functions never block and never do
//! I/O; message order within a batch does not affect the outcome.
//!
//! ## Security Model
//!
//! - Up to T corrupted parties learn nothing about the group secret.
//! - All arithmetic stays in the prime-order subgroup; decoding rejects
//!   non-canonical encodings and small-subgroup points.
//! - Failures are terminal per session and secret state is zeroized on
//!   every exit path. Nothing is retried inside the core.

pub mod curve;
pub mod error;
pub mod keygen;
pub mod keys;
pub mod message;
pub mod party;
pub mod polynomial;
pub mod schnorr;
pub mod sign;
pub mod signature;

pub use error::{Error, Result};
pub use keygen::{KeygenSession, KeygenStatus, KEYGEN_CONTEXT};
pub use keys::{PublicKey, PublicKeySet, SecretShare};
pub use message::{Message, MessageType, Payload};
pub use party::{PartyId, PartySet};
pub use schnorr::SchnorrProof;
pub use sign::{SignSession, SignStatus};
pub use signature::{compute_challenge, Signature};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
