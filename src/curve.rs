//! Elliptic-curve capability consumed by the VM and the solver
//!
//! The script engine never touches libsecp256k1 directly; it goes through
//! [`Curve`], so the arithmetic backend can be swapped (or mocked) without
//! touching consensus code. Scalars and coordinates are `BigUint`, digests
//! are the 32 raw sighash bytes read as a big-endian integer.

use crate::error::{ConsensusError, Result};
use crate::types::Hash;
use num_bigint::BigUint;
use num_traits::Zero;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use std::borrow::Cow;
use std::fmt;

/// An ECDSA signature as its two scalars.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EcdsaSignature {
    pub r: BigUint,
    pub s: BigUint,
}

impl EcdsaSignature {
    pub fn new(r: BigUint, s: BigUint) -> Self {
        Self { r, s }
    }

    /// Replaces `s` by `order - s` when `s > order / 2`.
    #[must_use]
    pub fn normalize_s(self, order: &BigUint) -> Self {
        if self.s > order >> 1 {
            Self {
                s: order - &self.s,
                r: self.r,
            }
        } else {
            self
        }
    }

    pub fn is_low_s(&self, order: &BigUint) -> bool {
        self.s <= order >> 1
    }
}

/// An affine curve point.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicPoint {
    pub x: BigUint,
    pub y: BigUint,
}

impl PublicPoint {
    pub fn new(x: BigUint, y: BigUint) -> Self {
        Self { x, y }
    }

    /// SEC1 encoding: `02/03 || x` compressed, `04 || x || y` otherwise.
    pub fn to_sec(&self, compressed: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(65);
        if compressed {
            let prefix = if self.y.bit(0) { 0x03 } else { 0x02 };
            out.push(prefix);
            out.extend_from_slice(&to_32_bytes(&self.x));
        } else {
            out.push(0x04);
            out.extend_from_slice(&to_32_bytes(&self.x));
            out.extend_from_slice(&to_32_bytes(&self.y));
        }
        out
    }
}

impl fmt::Debug for PublicPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicPoint({})", hex::encode(self.to_sec(true)))
    }
}

/// Big-endian, left-padded to 32 bytes. Values wider than 256 bits keep
/// their low 32 bytes.
pub fn to_32_bytes(n: &BigUint) -> [u8; 32] {
    let bytes = n.to_bytes_be();
    let mut out = [0u8; 32];
    let take = bytes.len().min(32);
    out[32 - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    out
}

/// The operations the engine needs from an elliptic curve.
pub trait Curve: Send + Sync {
    /// Group order `n`.
    fn order(&self) -> BigUint;

    fn sign(&self, secret: &BigUint, digest: &Hash) -> Result<EcdsaSignature>;

    fn verify(&self, point: &PublicPoint, digest: &Hash, signature: &EcdsaSignature) -> bool;

    fn derive_public_point(&self, secret: &BigUint) -> Result<PublicPoint>;

    /// Every point that could have produced `signature` over `digest`.
    fn possible_public_points_for_signature(
        &self,
        digest: &Hash,
        signature: &EcdsaSignature,
    ) -> Vec<PublicPoint>;

    /// Decodes a SEC1 public key, `None` if it is not on the curve.
    fn parse_sec(&self, sec: &[u8]) -> Option<PublicPoint>;
}

/// secp256k1 backed by libsecp256k1. Signing is RFC 6979 deterministic.
pub struct Secp256k1Curve {
    ctx: Secp256k1<All>,
    order: BigUint,
}

impl Default for Secp256k1Curve {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Secp256k1Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secp256k1Curve")
    }
}

impl Secp256k1Curve {
    pub fn new() -> Self {
        Self {
            ctx: Secp256k1::new(),
            order: BigUint::from_bytes_be(&secp256k1::constants::CURVE_ORDER),
        }
    }

    fn secret_key(&self, secret: &BigUint) -> Result<SecretKey> {
        if secret.is_zero() || *secret >= self.order {
            return Err(ConsensusError::InvalidKey(Cow::Borrowed(
                "secret exponent out of range",
            )));
        }
        SecretKey::from_slice(&to_32_bytes(secret))
            .map_err(|e| ConsensusError::InvalidKey(Cow::Owned(e.to_string())))
    }

    fn compact(&self, signature: &EcdsaSignature) -> Option<[u8; 64]> {
        let in_range = |n: &BigUint| !n.is_zero() && *n < self.order;
        if !in_range(&signature.r) || !in_range(&signature.s) {
            return None;
        }
        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(&to_32_bytes(&signature.r));
        compact[32..].copy_from_slice(&to_32_bytes(&signature.s));
        Some(compact)
    }

    fn point_from_key(key: &PublicKey) -> PublicPoint {
        let sec = key.serialize_uncompressed();
        PublicPoint::new(
            BigUint::from_bytes_be(&sec[1..33]),
            BigUint::from_bytes_be(&sec[33..65]),
        )
    }

    fn key_from_point(point: &PublicPoint) -> Option<PublicKey> {
        PublicKey::from_slice(&point.to_sec(false)).ok()
    }
}

impl Curve for Secp256k1Curve {
    fn order(&self) -> BigUint {
        self.order.clone()
    }

    fn sign(&self, secret: &BigUint, digest: &Hash) -> Result<EcdsaSignature> {
        let key = self.secret_key(secret)?;
        let msg = Message::from_digest_slice(digest)
            .map_err(|e| ConsensusError::InvalidSignature(Cow::Owned(e.to_string())))?;
        let compact = self.ctx.sign_ecdsa(&msg, &key).serialize_compact();
        Ok(EcdsaSignature::new(
            BigUint::from_bytes_be(&compact[..32]),
            BigUint::from_bytes_be(&compact[32..]),
        ))
    }

    fn verify(&self, point: &PublicPoint, digest: &Hash, signature: &EcdsaSignature) -> bool {
        let Some(compact) = self.compact(signature) else {
            return false;
        };
        let Some(key) = Self::key_from_point(point) else {
            return false;
        };
        let Ok(msg) = Message::from_digest_slice(digest) else {
            return false;
        };
        let Ok(mut sig) = Signature::from_compact(&compact) else {
            return false;
        };
        // libsecp only accepts low-S; consensus accepts both
        sig.normalize_s();
        self.ctx.verify_ecdsa(&msg, &sig, &key).is_ok()
    }

    fn derive_public_point(&self, secret: &BigUint) -> Result<PublicPoint> {
        let key = self.secret_key(secret)?;
        Ok(Self::point_from_key(&PublicKey::from_secret_key(
            &self.ctx, &key,
        )))
    }

    fn possible_public_points_for_signature(
        &self,
        digest: &Hash,
        signature: &EcdsaSignature,
    ) -> Vec<PublicPoint> {
        let (Some(compact), Ok(msg)) = (self.compact(signature), Message::from_digest_slice(digest))
        else {
            return Vec::new();
        };
        (0..4)
            .filter_map(|id| {
                let id = RecoveryId::from_i32(id).ok()?;
                let sig = RecoverableSignature::from_compact(&compact, id).ok()?;
                let key = self.ctx.recover_ecdsa(&msg, &sig).ok()?;
                Some(Self::point_from_key(&key))
            })
            .collect()
    }

    fn parse_sec(&self, sec: &[u8]) -> Option<PublicPoint> {
        PublicKey::from_slice(sec)
            .ok()
            .map(|key| Self::point_from_key(&key))
    }
}
