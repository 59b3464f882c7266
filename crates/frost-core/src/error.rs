//! Error types for the protocol engine

use thiserror::Error;

use crate::party::PartyId;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the protocol engine.
///
/// Every error is terminal for the session that produced it: the round
/// machine wipes its secret material, moves to its aborted state and answers
/// [`Error::SessionAborted`] to any further call. Nothing is retried inside
/// the core; the host decides what to do with a failed session.
#[derive(Debug, Error)]
pub enum Error {
    // ============ Input Validation ============
    /// Malformed message bytes, non-canonical encoding, duplicate sender or
    /// a message that does not belong in the current round.
    #[error("bad input: {0}")]
    BadInput(String),

    /// A structural requirement was violated: threshold constraints at
    /// initialization, signer set too small or not a subset of the
    /// participants, unknown sender, or a missing expected message.
    #[error("precondition violated: {0}")]
    Precondition(String),

    // ============ Cryptographic Verification ============
    /// The Schnorr proof of knowledge attached to a keygen commitment did
    /// not verify.
    #[error("proof of knowledge from party {0} failed to verify")]
    PoKFailure(PartyId),

    /// A received secret share is inconsistent with the sender's published
    /// polynomial commitment.
    #[error("share from party {0} does not match its commitment")]
    VssFailure(PartyId),

    /// A partial signature failed the per-signer equality check.
    #[error("partial signature from party {0} is invalid")]
    InvalidPartial(PartyId),

    /// The aggregated signature did not pass final verification. Inputs were
    /// already validated at this point, so this indicates either an internal
    /// fault or corrupted session state.
    #[error("aggregated signature failed verification")]
    AggregatedInvalid,

    // ============ Session Lifecycle ============
    /// The session already terminated (successfully or with an error) and
    /// accepts no further input.
    #[error("session is no longer active")]
    SessionAborted,

    // ============ Encoding ============
    /// State or message serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}
