//! Hash primitives used by transactions and scripts

use crate::types::{Hash, Hash160};
use bitcoin_hashes::{sha1, sha256d, Hash as BitcoinHash};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// SHA256(x)
pub fn sha256(data: &[u8]) -> Hash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// SHA256(SHA256(x)), the hash behind txids and signature hashes
pub fn double_sha256(data: &[u8]) -> Hash {
    sha256d::Hash::hash(data).into_inner()
}

/// RIPEMD160(x)
pub fn ripemd160(data: &[u8]) -> Hash160 {
    let mut out = [0u8; 20];
    out.copy_from_slice(&Ripemd160::digest(data));
    out
}

/// RIPEMD160(SHA256(x))
pub fn hash160(data: &[u8]) -> Hash160 {
    ripemd160(&Sha256::digest(data))
}

/// SHA1(x), only reachable through OP_SHA1
pub fn sha1(data: &[u8]) -> [u8; 20] {
    sha1::Hash::hash(data).into_inner()
}
