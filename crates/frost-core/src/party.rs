//! Party identifiers and signer sets

use std::fmt;

use curve25519_dalek::scalar::Scalar;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifier of a protocol participant.
///
/// Non-zero 16-bit integer; zero is reserved to mean "broadcast" in message
/// addressing and is rejected here. The canonical wire encoding is two bytes
/// big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct PartyId(u16);

impl PartyId {
    /// Length of the canonical byte encoding.
    pub const ENCODED_LEN: usize = 2;

    /// Create a party identifier, rejecting the reserved value zero.
    pub fn new(id: u16) -> Result<Self> {
        if id == 0 {
            return Err(Error::BadInput(
                "party id 0 is reserved for broadcast".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Canonical two-byte big-endian encoding.
    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 2]) -> Result<Self> {
        Self::new(u16::from_be_bytes(bytes))
    }

    /// Canonical injection into the scalar field (little-endian,
    /// zero-padded).
    pub fn to_scalar(self) -> Scalar {
        Scalar::from(u64::from(self.0))
    }

    /// Lagrange coefficient of this party over `set`, evaluated at zero:
    /// `λ_i = Π_{j∈set, j≠i} j / (j − i)`.
    ///
    /// Fails if this party is not a member of `set`. The set type already
    /// guarantees distinct, non-zero members, so the denominator is
    /// invertible.
    pub fn lagrange(self, set: &PartySet) -> Result<Scalar> {
        if !set.contains(self) {
            return Err(Error::Precondition(format!(
                "party {self} is not in the interpolation set"
            )));
        }
        let x_i = self.to_scalar();
        let mut numerator = Scalar::ONE;
        let mut denominator = Scalar::ONE;
        for j in set.iter() {
            if j == self {
                continue;
            }
            let x_j = j.to_scalar();
            numerator *= x_j;
            denominator *= x_j - x_i;
        }
        Ok(numerator * denominator.invert())
    }
}

impl TryFrom<u16> for PartyId {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PartyId> for u16 {
    fn from(id: PartyId) -> Self {
        id.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered set of party identifiers.
///
/// Always sorted, free of duplicates and free of the reserved zero id, so
/// iteration order is canonical and Lagrange denominators never vanish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PartyId>", into = "Vec<PartyId>")]
pub struct PartySet(Vec<PartyId>);

impl PartySet {
    /// Build a set from arbitrary ids; sorts and rejects duplicates.
    pub fn new(mut ids: Vec<PartyId>) -> Result<Self> {
        if ids.is_empty() {
            return Err(Error::BadInput("party set is empty".into()));
        }
        ids.sort_unstable();
        if ids.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(Error::BadInput("duplicate party id in set".into()));
        }
        Ok(Self(ids))
    }

    /// The full set `{1, …, n}` used by key generation.
    pub fn full(n: u16) -> Result<Self> {
        if n == 0 {
            return Err(Error::BadInput("party set is empty".into()));
        }
        Ok(Self((1..=n).map(PartyId).collect()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: PartyId) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    pub fn is_subset_of(&self, other: &PartySet) -> bool {
        self.iter().all(|id| other.contains(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = PartyId> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[PartyId] {
        &self.0
    }
}

impl TryFrom<Vec<PartyId>> for PartySet {
    type Error = Error;

    fn try_from(ids: Vec<PartyId>) -> Result<Self> {
        Self::new(ids)
    }
}

impl From<PartySet> for Vec<PartyId> {
    fn from(set: PartySet) -> Self {
        set.0
    }
}
