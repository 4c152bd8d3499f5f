//! Core byte-level types shared across the crate

/// Hash type: 256-bit hash in internal (wire) byte order
pub type Hash = [u8; 32];

/// 160-bit hash: RIPEMD160(SHA256(x))
pub type Hash160 = [u8; 20];

/// Byte string type
pub type ByteString = Vec<u8>;

/// The all-zero hash, used as the previous hash of coinbase inputs
pub const ZERO_HASH: Hash = [0u8; 32];

/// Renders a hash the way block explorers show ids: bytes reversed, hex encoded.
pub fn hash_to_hex_reversed(hash: &Hash) -> String {
    let mut reversed = *hash;
    reversed.reverse();
    hex::encode(reversed)
}

/// Parses an id shown in reversed-hex form back into a wire-order hash.
pub fn hash_from_hex_reversed(text: &str) -> Option<Hash> {
    let bytes = hex::decode(text).ok()?;
    if bytes.len() != 32 {
        return None;
    }
    let mut hash = [0u8; 32];
    for (i, b) in bytes.iter().rev().enumerate() {
        hash[i] = *b;
    }
    Some(hash)
}

/// Which sighash algorithm a script is evaluated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigVersion {
    /// Legacy scripts: scriptSig, scriptPubKey and P2SH redeem scripts
    Base,
    /// SegWit v0 witness scripts (BIP-143 sighash)
    WitnessV0,
}
