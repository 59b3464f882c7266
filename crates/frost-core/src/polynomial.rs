//! Secret-sharing polynomials and their commitments
//!
//! A [`Polynomial`] holds the dealt secret in its constant term and
//! uniformly random higher coefficients. Its [`PolynomialExponent`] is the
//! coefficient-wise commitment `A_k = a_k·B`, which peers use for the
//! Feldman consistency check and for deriving the public shares.

use std::fmt;

use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar, traits::Identity};
use rand::{CryptoRng, RngCore};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{curve, party::PartyId, Error, Result};

/// A polynomial `f(x) = a_0 + a_1·x + … + a_t·x^t` over the scalar field.
///
/// `a_0` is the party's secret contribution; `a_1 … a_t` are sampled
/// uniformly. The coefficients are wiped on drop and must also be wiped
/// explicitly as soon as the key generation session ends.
#[derive(Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct Polynomial {
    coefficients: Vec<Scalar>,
}

impl Polynomial {
    /// Build a polynomial of exactly `degree` with the given constant term.
    pub fn new<R: RngCore + CryptoRng>(degree: u16, constant: Scalar, rng: &mut R) -> Self {
        let mut coefficients = Vec::with_capacity(usize::from(degree) + 1);
        coefficients.push(constant);
        for _ in 0..degree {
            coefficients.push(curve::random_scalar(rng));
        }
        Self { coefficients }
    }

    pub fn degree(&self) -> u16 {
        (self.coefficients.len() - 1) as u16
    }

    /// Evaluate at `x` with Horner's rule.
    ///
    /// Evaluation at zero is refused: it would hand out the constant term,
    /// which is the secret.
    pub fn evaluate(&self, x: &Scalar) -> Result<Scalar> {
        if *x == Scalar::ZERO {
            return Err(Error::BadInput(
                "polynomial evaluation at zero would reveal the secret".into(),
            ));
        }
        let mut accumulator = Scalar::ZERO;
        for coefficient in self.coefficients.iter().rev() {
            accumulator = accumulator * x + coefficient;
        }
        Ok(accumulator)
    }

    /// Evaluate at a party's canonical field coordinate.
    pub fn evaluate_at(&self, id: PartyId) -> Result<Scalar> {
        self.evaluate(&id.to_scalar())
    }

    /// Overwrite every coefficient with zero, keeping the shape.
    pub fn reset(&mut self) {
        for coefficient in self.coefficients.iter_mut() {
            *coefficient = Scalar::ZERO;
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + self.coefficients.len() * curve::ENCODED_LEN);
        bytes.extend_from_slice(&self.degree().to_be_bytes());
        for coefficient in &self.coefficients {
            bytes.extend_from_slice(&coefficient.to_bytes());
        }
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let coefficients = decode_coefficients(bytes, curve::decode_scalar)?;
        Ok(Self { coefficients })
    }
}

impl fmt::Debug for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Polynomial")
            .field("degree", &self.degree())
            .field("coefficients", &"[REDACTED]")
            .finish()
    }
}

impl Serialize for Polynomial {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Polynomial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        Self::from_bytes(&bytes).map_err(D::Error::custom)
    }
}

/// A polynomial mapped through the base point: the ordered commitments
/// `A_k = a_k·B`. Its constant term commits to the dealt secret.
///
/// Wire format: degree as two bytes big-endian, followed by `degree + 1`
/// canonical point encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolynomialExponent {
    coefficients: Vec<EdwardsPoint>,
}

impl PolynomialExponent {
    pub fn from_polynomial(polynomial: &Polynomial) -> Self {
        Self {
            coefficients: polynomial
                .coefficients
                .iter()
                .map(EdwardsPoint::mul_base)
                .collect(),
        }
    }

    pub fn degree(&self) -> u16 {
        (self.coefficients.len() - 1) as u16
    }

    /// The commitment to the constant term.
    pub fn constant(&self) -> EdwardsPoint {
        self.coefficients[0]
    }

    /// Evaluate `Σ A_k · x^k` with Horner's rule.
    pub fn evaluate(&self, x: &Scalar) -> EdwardsPoint {
        let mut accumulator = EdwardsPoint::identity();
        for coefficient in self.coefficients.iter().rev() {
            accumulator = accumulator * x + coefficient;
        }
        accumulator
    }

    /// Evaluate at a party's canonical field coordinate.
    pub fn evaluate_at(&self, id: PartyId) -> EdwardsPoint {
        self.evaluate(&id.to_scalar())
    }

    /// Pointwise addition; both polynomials must have the same degree.
    pub fn add_assign(&mut self, other: &PolynomialExponent) -> Result<()> {
        if self.coefficients.len() != other.coefficients.len() {
            return Err(Error::BadInput(format!(
                "cannot add commitments of degree {} and {}",
                self.degree(),
                other.degree()
            )));
        }
        for (own, theirs) in self.coefficients.iter_mut().zip(&other.coefficients) {
            *own += theirs;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + self.coefficients.len() * curve::ENCODED_LEN);
        bytes.extend_from_slice(&self.degree().to_be_bytes());
        for coefficient in &self.coefficients {
            bytes.extend_from_slice(coefficient.compress().as_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let coefficients = decode_coefficients(bytes, curve::decode_point)?;
        Ok(Self { coefficients })
    }
}

impl Serialize for PolynomialExponent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for PolynomialExponent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        Self::from_bytes(&bytes).map_err(D::Error::custom)
    }
}

/// Shared framing for both coefficient kinds: `degree (2 bytes BE)` followed
/// by `degree + 1` fixed-width encodings.
fn decode_coefficients<T>(
    bytes: &[u8],
    decode: impl Fn(&[u8; 32]) -> Result<T>,
) -> Result<Vec<T>> {
    if bytes.len() < 2 {
        return Err(Error::BadInput("truncated polynomial encoding".into()));
    }
    let degree = u16::from_be_bytes([bytes[0], bytes[1]]);
    let body = &bytes[2..];
    let expected = (usize::from(degree) + 1) * curve::ENCODED_LEN;
    if body.len() != expected {
        return Err(Error::BadInput(format!(
            "polynomial encoding carries {} coefficient bytes, expected {expected}",
            body.len()
        )));
    }
    body.chunks_exact(curve::ENCODED_LEN)
        .map(|chunk| {
            let fixed: [u8; 32] = chunk
                .try_into()
                .map_err(|_| Error::BadInput("truncated coefficient".into()))?;
            decode(&fixed)
        })
        .collect()
}
