//! Serialization fidelity: parked sessions and exchanged messages must
//! round-trip bit-for-bit, mid-protocol included, the way the file-exchange
//! host uses them.

use frost_core::{
    KeygenSession, Message, PublicKeySet, SecretShare, Signature, SignSession,
};
use rand::rngs::OsRng;

use crate::helpers::{id, run_keygen, signer_set};

fn reload<T: serde::Serialize + serde::de::DeserializeOwned>(value: &T) -> T {
    let encoded = serde_json::to_string(value).unwrap();
    serde_json::from_str(&encoded).unwrap()
}

#[test]
fn test_keygen_session_round_trips_between_rounds() {
    let mut rng = OsRng;
    let n = 3;
    let mut broadcasts = Vec::new();
    let mut sessions = Vec::new();
    for i in 1..=n {
        let (message, session) = KeygenSession::new(id(i), n, 1, &mut rng).unwrap();
        broadcasts.push(reload(&message));
        sessions.push(session);
    }

    // park every party on "disk" after init and again after round 1
    let mut sessions: Vec<KeygenSession> = sessions.iter().map(reload).collect();
    for (session, original) in sessions.iter().zip(broadcasts.iter().map(|m| m.from)) {
        assert_eq!(session.self_id(), original);
    }

    let mut share_batches: Vec<Vec<Message>> = vec![Vec::new(); usize::from(n)];
    for session in sessions.iter_mut() {
        for message in session.round1(&broadcasts).unwrap() {
            let to = message.to.unwrap();
            share_batches[usize::from(to.as_u16()) - 1].push(reload(&message));
        }
    }

    let restored: Vec<KeygenSession> = sessions.iter().map(reload).collect();
    for (a, b) in sessions.iter().zip(&restored) {
        assert_eq!(a, b);
    }

    let mut sessions = restored;
    let outputs: Vec<(PublicKeySet, SecretShare)> = sessions
        .iter_mut()
        .zip(share_batches)
        .map(|(session, batch)| session.round2(&batch).unwrap())
        .collect();

    // the resumed run still converges on one public output
    for (public, _) in &outputs {
        assert_eq!(public, &outputs[0].0);
    }
}

#[test]
fn test_sign_session_round_trips_between_rounds() {
    let outputs = run_keygen(3, 1);
    let signers = signer_set(&[1, 2, 3]);
    let mut rng = OsRng;

    let mut sessions = Vec::new();
    let mut broadcasts = Vec::new();
    for n in 1..=3usize {
        let (public, share) = &outputs[n - 1];
        let (message, session) =
            SignSession::new(signers.clone(), share, public, b"park me".to_vec(), &mut rng)
                .unwrap();
        broadcasts.push(reload(&message));
        sessions.push(reload(&session));
    }

    let partials: Vec<Message> = sessions
        .iter_mut()
        .map(|session| reload(&session.round1(&broadcasts).unwrap()))
        .collect();

    // park between round 1 and round 2
    let mut sessions: Vec<SignSession> = sessions.iter().map(reload).collect();
    let signatures: Vec<Signature> = sessions
        .iter_mut()
        .map(|session| session.round2(&partials).unwrap())
        .collect();

    let (public, _) = &outputs[0];
    for signature in &signatures {
        assert_eq!(signature, &signatures[0]);
        assert!(public.group_key().verify(b"park me", signature));
    }
}

#[test]
fn test_outputs_round_trip() {
    let outputs = run_keygen(2, 1);
    let (public, share) = &outputs[0];

    let restored_public: PublicKeySet = reload(public);
    assert_eq!(&restored_public, public);

    let restored_share: SecretShare = reload(share);
    assert_eq!(&restored_share, share);

    let signature = crate::helpers::run_sign(&[1, 2], &outputs, b"wire").remove(0);
    let restored_signature: Signature = reload(&signature);
    assert_eq!(restored_signature, signature);

    // 64-byte wire form survives as well
    let from_wire = Signature::from_bytes(&signature.to_bytes()).unwrap();
    assert_eq!(from_wire, signature);
}

#[test]
fn test_corrupted_state_is_rejected_on_load() {
    let outputs = run_keygen(2, 1);
    let (public, _) = &outputs[0];
    let mut encoded = serde_json::to_value(public).unwrap();
    // flip the group key to a non-canonical encoding
    encoded["group_key"] = serde_json::Value::String("ff".repeat(32));
    assert!(serde_json::from_value::<PublicKeySet>(encoded).is_err());
}
