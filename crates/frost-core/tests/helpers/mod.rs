//! Shared helpers: in-memory delivery loops for full protocol executions.

use frost_core::{
    KeygenSession, Message, PartyId, PartySet, PublicKeySet, SecretShare, SignSession, Signature,
};
use rand::rngs::OsRng;

pub fn id(n: u16) -> PartyId {
    PartyId::new(n).unwrap()
}

pub fn signer_set(ids: &[u16]) -> PartySet {
    PartySet::new(ids.iter().map(|n| id(*n)).collect()).unwrap()
}

/// Run a full honest DKG among `{1, …, n}` and return every party's output,
/// indexed by party position.
pub fn run_keygen(n: u16, t: u16) -> Vec<(PublicKeySet, SecretShare)> {
    let mut rng = OsRng;
    let mut broadcasts = Vec::with_capacity(usize::from(n));
    let mut sessions = Vec::with_capacity(usize::from(n));
    for i in 1..=n {
        let (message, session) = KeygenSession::new(id(i), n, t, &mut rng).unwrap();
        broadcasts.push(message);
        sessions.push(session);
    }

    let mut share_batches: Vec<Vec<Message>> = vec![Vec::new(); usize::from(n)];
    for session in sessions.iter_mut() {
        for message in session.round1(&broadcasts).unwrap() {
            let to = message.to.unwrap();
            share_batches[usize::from(to.as_u16()) - 1].push(message);
        }
    }

    sessions
        .iter_mut()
        .zip(share_batches)
        .map(|(session, batch)| session.round2(&batch).unwrap())
        .collect()
}

/// Run a full honest signing session for the given signer ids and return
/// each signer's copy of the signature (they must all agree).
pub fn run_sign(
    signers: &[u16],
    outputs: &[(PublicKeySet, SecretShare)],
    message: &[u8],
) -> Vec<Signature> {
    let mut rng = OsRng;
    let set = signer_set(signers);
    let mut sessions = Vec::with_capacity(signers.len());
    let mut broadcasts = Vec::with_capacity(signers.len());
    for n in signers {
        let (public, share) = &outputs[usize::from(*n) - 1];
        let (msg, session) =
            SignSession::new(set.clone(), share, public, message.to_vec(), &mut rng).unwrap();
        broadcasts.push(msg);
        sessions.push(session);
    }

    let partials: Vec<Message> = sessions
        .iter_mut()
        .map(|session| session.round1(&broadcasts).unwrap())
        .collect();

    sessions
        .iter_mut()
        .map(|session| session.round2(&partials).unwrap())
        .collect()
}
