//! End-to-end protocol flows: honest executions across parameter choices
//! plus the canonical misbehavior scenarios.

use curve25519_dalek::{edwards::EdwardsPoint, traits::Identity};
use ed25519_dalek::Verifier;
use frost_core::{
    curve, polynomial::{Polynomial, PolynomialExponent}, Error, KeygenSession, Message, Payload,
    SecretShare, SignSession, SignStatus,
};
use rand::rngs::OsRng;

use crate::helpers::{id, run_keygen, run_sign, signer_set};

#[test]
fn test_two_of_two_full_flow() {
    let outputs = run_keygen(2, 1);
    let (public, _) = &outputs[0];

    // λ_1 = 2/(2−1) = 2, λ_2 = 1/(1−2) = −1; the weighted shares must
    // recombine into the group key
    let lambda_1 = id(1).lagrange(public.party_ids()).unwrap();
    let lambda_2 = id(2).lagrange(public.party_ids()).unwrap();
    let combined = public.share(id(1)).unwrap() * lambda_1 + public.share(id(2)).unwrap() * lambda_2;
    assert_eq!(combined, *public.group_key().as_point());

    let signatures = run_sign(&[1, 2], &outputs, b"hello");
    for signature in &signatures {
        assert!(public.group_key().verify(b"hello", signature));
    }

    // stock Ed25519 verification
    let verifying_key = public.group_key().to_ed25519().unwrap();
    assert!(verifying_key
        .verify(b"hello", &signatures[0].to_ed25519())
        .is_ok());
    assert!(verifying_key
        .verify_strict(b"hello", &signatures[0].to_ed25519())
        .is_ok());
    assert!(verifying_key
        .verify(b"goodbye", &signatures[0].to_ed25519())
        .is_err());
}

#[test]
fn test_five_party_distinct_signer_subsets() {
    let outputs = run_keygen(5, 2);
    let (public, _) = &outputs[0];

    let first = run_sign(&[1, 2, 3], &outputs, b"abc");
    let second = run_sign(&[3, 4, 5], &outputs, b"abc");

    // every signer agrees within a session
    assert!(first.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(second.windows(2).all(|pair| pair[0] == pair[1]));

    // both subsets sign under the same group key, with different nonces
    assert!(public.group_key().verify(b"abc", &first[0]));
    assert!(public.group_key().verify(b"abc", &second[0]));
    assert_ne!(first[0], second[0]);

    let verifying_key = public.group_key().to_ed25519().unwrap();
    assert!(verifying_key.verify(b"abc", &first[0].to_ed25519()).is_ok());
    assert!(verifying_key.verify(b"abc", &second[0].to_ed25519()).is_ok());
}

#[test]
fn test_undersized_signer_set_rejected() {
    let outputs = run_keygen(5, 2);
    let (public, share) = &outputs[0];
    // T+1 = 3 signers are required
    let result = SignSession::new(
        signer_set(&[1, 2]),
        share,
        public,
        b"msg".to_vec(),
        &mut OsRng,
    );
    assert!(matches!(result, Err(Error::Precondition(_))));
}

#[test]
fn test_tampered_commitment_fails_pok() {
    let mut rng = OsRng;
    let n = 3;
    let mut broadcasts = Vec::new();
    let mut sessions = Vec::new();
    for i in 1..=n {
        let (message, session) = KeygenSession::new(id(i), n, 1, &mut rng).unwrap();
        broadcasts.push(message);
        sessions.push(session);
    }

    // party 2 swaps in commitments whose constant term its proof does not
    // cover
    let Payload::KeyGen1 { proof, .. } = broadcasts[1].payload.clone() else {
        panic!("expected a KeyGen1 payload");
    };
    let forged_poly = Polynomial::new(1, curve::random_scalar(&mut rng), &mut rng);
    let forged = Message::keygen1(id(2), PolynomialExponent::from_polynomial(&forged_poly), proof);
    let batch = vec![broadcasts[0].clone(), forged, broadcasts[2].clone()];

    // every honest party rejects and aborts
    let err = sessions[0].round1(&batch).unwrap_err();
    assert!(matches!(err, Error::PoKFailure(p) if p == id(2)));
    let err = sessions[2].round1(&batch).unwrap_err();
    assert!(matches!(err, Error::PoKFailure(p) if p == id(2)));
    assert!(matches!(
        sessions[0].round1(&broadcasts),
        Err(Error::SessionAborted)
    ));
}

#[test]
fn test_identity_nonce_commitment_aborts_honest_parties() {
    let outputs = run_keygen(3, 1);
    let signers = signer_set(&[1, 2, 3]);
    let mut rng = OsRng;

    let mut sessions = Vec::new();
    let mut broadcasts = Vec::new();
    for n in 1..=3usize {
        let (public, share) = &outputs[n - 1];
        let (msg, session) =
            SignSession::new(signers.clone(), share, public, b"msg".to_vec(), &mut rng).unwrap();
        broadcasts.push(msg);
        sessions.push(session);
    }

    // party 2 replaces E with the identity
    let Payload::Sign1 { d, .. } = broadcasts[1].payload.clone() else {
        panic!("expected a Sign1 payload");
    };
    let forged = Message::sign1(id(2), d, EdwardsPoint::identity());
    let batch = vec![broadcasts[0].clone(), forged, broadcasts[2].clone()];

    let err = sessions[0].round1(&batch).unwrap_err();
    assert!(matches!(err, Error::BadInput(_)));
    let err = sessions[2].round1(&batch).unwrap_err();
    assert!(matches!(err, Error::BadInput(_)));
}

#[test]
fn test_corrupted_share_yields_invalid_partial_and_aggregate() {
    let outputs = run_keygen(3, 1);
    let signers = signer_set(&[1, 2, 3]);
    let mut rng = OsRng;

    // party 2 signs with a corrupted secret share
    let corrupted = SecretShare::new(id(2), curve::random_scalar(&mut rng));

    let mut sessions = Vec::new();
    let mut broadcasts = Vec::new();
    for n in 1..=3usize {
        let (public, share) = &outputs[n - 1];
        let effective = if n == 2 { &corrupted } else { share };
        let (msg, session) =
            SignSession::new(signers.clone(), effective, public, b"msg".to_vec(), &mut rng)
                .unwrap();
        broadcasts.push(msg);
        sessions.push(session);
    }

    let partials: Vec<Message> = sessions
        .iter_mut()
        .map(|session| session.round1(&broadcasts).unwrap())
        .collect();

    // honest party 1 pins the bad partial on party 2
    let err = sessions[0].round2(&partials).unwrap_err();
    assert!(matches!(err, Error::InvalidPartial(p) if p == id(2)));
    assert_eq!(sessions[0].status(), SignStatus::Aborted);

    // party 2 accepts the honest partials but its own aggregate cannot
    // verify
    let err = sessions[1].round2(&partials).unwrap_err();
    assert!(matches!(err, Error::AggregatedInvalid));
}

#[test]
fn test_signatures_bind_to_message() {
    let outputs = run_keygen(3, 1);
    let (public, _) = &outputs[0];
    let signatures = run_sign(&[1, 3], &outputs, b"first");
    assert!(public.group_key().verify(b"first", &signatures[0]));
    assert!(!public.group_key().verify(b"second", &signatures[0]));
}

#[test]
fn test_group_keys_differ_between_ceremonies() {
    let first = run_keygen(2, 1);
    let second = run_keygen(2, 1);
    assert_ne!(
        first[0].0.group_key().to_bytes(),
        second[0].0.group_key().to_bytes()
    );
}
