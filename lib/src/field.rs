//! BN254 scalar field elements.
//!
//! Every hash input, hash output and amount in the pool is an element of the
//! scalar field of BN254. Values wider than the field are reduced modulo the
//! field order on the way in, never rejected and never left unreduced.

use core::fmt;
use core::str::FromStr;

use ark_bn254::Fr;
use ark_ff::{BigInteger, One, PrimeField, Zero};
use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PoolError, Result};

/// An element of the BN254 scalar field.
///
/// Ordering follows the canonical integer representative, which is what the
/// accumulator's value ordering and the overspend check compare.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FieldElement(Fr);

impl FieldElement {
    pub fn zero() -> Self {
        FieldElement(Fr::zero())
    }

    pub fn one() -> Self {
        FieldElement(Fr::one())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Least-significant bit of the canonical representative.
    pub fn is_odd(&self) -> bool {
        self.0.into_bigint().is_odd()
    }

    /// Interpret big-endian bytes of any length as an integer and reduce it.
    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        FieldElement(Fr::from_be_bytes_mod_order(bytes))
    }

    /// Canonical 32-byte big-endian encoding.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let bytes = self.0.into_bigint().to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(&bytes);
        out
    }

    /// `0x`-prefixed, zero-padded 64 digit hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_be_bytes()))
    }

    /// Integer subtraction: `None` when `rhs` is larger than `self`, instead
    /// of wrapping around the field order.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        if rhs > self {
            None
        } else {
            Some(FieldElement(self.0 - rhs.0))
        }
    }

    /// Uniformly random element: 64 random bytes reduced modulo the order.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut wide = [0u8; 64];
        rng.fill_bytes(&mut wide);
        Self::from_be_bytes_mod_order(&wide)
    }

    /// Parse `0x`-prefixed hex or plain decimal digits, reducing modulo the
    /// field order.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = |reason| PoolError::InvalidFieldInput {
            input: input.to_string(),
            reason,
        };

        if let Some(digits) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            if digits.is_empty() {
                return Err(invalid("missing hex digits"));
            }
            if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid("non-hex character"));
            }
            let padded = if digits.len() % 2 == 1 {
                format!("0{digits}")
            } else {
                digits.to_string()
            };
            let bytes = hex::decode(padded).map_err(|_| invalid("malformed hex"))?;
            return Ok(Self::from_be_bytes_mod_order(&bytes));
        }

        if trimmed.is_empty() {
            return Err(invalid("empty input"));
        }
        let ten = Fr::from(10u64);
        let mut acc = Fr::zero();
        for b in trimmed.bytes() {
            if !b.is_ascii_digit() {
                return Err(invalid("non-decimal character"));
            }
            acc = acc * ten + Fr::from(u64::from(b - b'0'));
        }
        Ok(FieldElement(acc))
    }

    pub fn inner(&self) -> Fr {
        self.0
    }
}

impl core::ops::Add for FieldElement {
    type Output = FieldElement;

    fn add(self, rhs: FieldElement) -> FieldElement {
        FieldElement(self.0 + rhs.0)
    }
}

impl From<Fr> for FieldElement {
    fn from(value: Fr) -> Self {
        FieldElement(value)
    }
}

impl From<FieldElement> for Fr {
    fn from(value: FieldElement) -> Self {
        value.0
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        FieldElement(Fr::from(value))
    }
}

impl From<u128> for FieldElement {
    fn from(value: u128) -> Self {
        FieldElement(Fr::from(value))
    }
}

impl FromStr for FieldElement {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Decimal, the form the proving backend's witness record uses.
impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.into_bigint())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        struct FieldVisitor;

        impl<'de> de::Visitor<'de> for FieldVisitor {
            type Value = FieldElement;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal or 0x-prefixed hex string, or a non-negative integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> core::result::Result<FieldElement, E> {
                FieldElement::parse(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> core::result::Result<FieldElement, E> {
                Ok(FieldElement::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> core::result::Result<FieldElement, E> {
                u64::try_from(v)
                    .map(FieldElement::from)
                    .map_err(|_| E::custom("negative integers are not field elements"))
            }
        }

        deserializer.deserialize_any(FieldVisitor)
    }
}
