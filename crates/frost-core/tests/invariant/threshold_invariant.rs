//! Critical guarantees across parameter choices: every honest execution
//! must yield consistent public outputs, reconstructable secrets and
//! Ed25519-compatible signatures.

use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar, traits::Identity};
use ed25519_dalek::Verifier;
use itertools::Itertools;

use crate::helpers::{id, run_keygen, run_sign, signer_set};

#[test]
fn test_all_parties_agree_on_public_output() {
    for (n, t) in [(2u16, 1u16), (3, 1), (3, 2), (4, 2), (5, 3), (6, 2), (10, 4)] {
        let outputs = run_keygen(n, t);
        let reference = &outputs[0].0;
        assert_eq!(reference.threshold(), t);
        assert_eq!(reference.party_ids().len(), usize::from(n));
        for (public, _) in &outputs {
            assert_eq!(public, reference, "public outputs diverged for n={n} t={t}");
        }
    }
}

#[test]
fn test_public_shares_match_secret_shares() {
    for (n, t) in [(3u16, 1u16), (4, 2), (5, 2)] {
        let outputs = run_keygen(n, t);
        let (reference, _) = &outputs[0];
        for (public, share) in &outputs {
            let expected = public.share(share.id()).unwrap();
            assert_eq!(
                EdwardsPoint::mul_base(share.secret()),
                *expected,
                "share/public mismatch for n={n} t={t}"
            );
            assert_eq!(public, reference);
        }
    }
}

#[test]
fn test_every_qualified_subset_reconstructs_the_group_key() {
    for (n, t) in [(3u16, 1u16), (4, 2), (5, 2)] {
        let outputs = run_keygen(n, t);
        let (public, _) = &outputs[0];

        for size in usize::from(t) + 1..=usize::from(n) {
            for subset in (1..=n).combinations(size) {
                let set = signer_set(&subset);
                let mut secret = Scalar::ZERO;
                let mut combined = EdwardsPoint::identity();
                for i in &subset {
                    let lambda = id(*i).lagrange(&set).unwrap();
                    secret += lambda * outputs[usize::from(*i) - 1].1.secret();
                    combined += public.share(id(*i)).unwrap() * lambda;
                }
                assert_eq!(
                    EdwardsPoint::mul_base(&secret),
                    *public.group_key().as_point(),
                    "scalar reconstruction failed for n={n} t={t} subset={subset:?}"
                );
                assert_eq!(
                    combined,
                    *public.group_key().as_point(),
                    "share reconstruction failed for n={n} t={t} subset={subset:?}"
                );
            }
        }
    }
}

#[test]
fn test_every_minimal_subset_signs_verifiably() {
    let n = 4u16;
    let t = 1u16;
    let outputs = run_keygen(n, t);
    let (public, _) = &outputs[0];
    let verifying_key = public.group_key().to_ed25519().unwrap();

    for subset in (1..=n).combinations(usize::from(t) + 1) {
        let signatures = run_sign(&subset, &outputs, b"rotating quorum");
        assert!(signatures.windows(2).all(|pair| pair[0] == pair[1]));
        assert!(public.group_key().verify(b"rotating quorum", &signatures[0]));
        assert!(verifying_key
            .verify(b"rotating quorum", &signatures[0].to_ed25519())
            .is_ok());
    }
}

#[test]
fn test_signature_verifies_under_group_equation() {
    // S·B = R + c·A, checked through the public verifier on a fresh run
    let outputs = run_keygen(3, 2);
    let signatures = run_sign(&[1, 2, 3], &outputs, b"equation");
    let (public, _) = &outputs[0];
    assert!(public.group_key().verify(b"equation", &signatures[0]));
}
