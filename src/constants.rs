//! Bitcoin consensus constants used by the codec, the script VM and the signer

/// Maximum money supply: 21,000,000 BTC in satoshis
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

/// Satoshis per BTC
pub const SATOSHIS_PER_BTC: u64 = 100_000_000;

/// Largest serialized transaction accepted by `Tx::check`
pub const MAX_BLOCK_SIZE: usize = 1_000_000;

/// Witness scale factor (BIP-141)
pub const WITNESS_SCALE_FACTOR: usize = 4;

/// Maximum script length
pub const MAX_SCRIPT_LENGTH: usize = 10_000;

/// Maximum size of a single pushed element
pub const MAX_BLOB_LENGTH: usize = 520;

/// Maximum number of non-push operations per script
pub const MAX_OP_COUNT: usize = 201;

/// Maximum combined size of the main and alt stacks
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of public keys in a CHECKMULTISIG
pub const MAX_PUBKEYS_PER_MULTISIG: i64 = 20;

/// Default byte width of script numbers used in arithmetic
pub const SCRIPT_NUM_MAX_LEN: usize = 4;

/// Byte width of script numbers consumed by CHECKLOCKTIMEVERIFY/CHECKSEQUENCEVERIFY
pub const SCRIPT_NUM_LOCKTIME_LEN: usize = 5;

/// Lock time threshold: values below are block heights, above are timestamps
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Sequence number for final transaction
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// BIP-68: relative lock time disabled when this bit is set
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;

/// BIP-68: relative lock time is time-based when this bit is set
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;

/// BIP-68: mask extracting the relative lock time value
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_ffff;

/// Previous index of a coinbase input
pub const COINBASE_PREVIOUS_INDEX: u32 = 0xffff_ffff;

/// Signs all outputs
pub const SIGHASH_ALL: u32 = 0x01;
/// Signs no outputs
pub const SIGHASH_NONE: u32 = 0x02;
/// Signs only the output with the same index as the input
pub const SIGHASH_SINGLE: u32 = 0x03;
/// Fork-id bit required by Bitcoin Cash and Bitcoin Gold
pub const SIGHASH_FORKID: u32 = 0x40;
/// Signs only the input being solved
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;
/// Mask selecting the base sighash mode
pub const SIGHASH_BASE_MASK: u32 = 0x1f;

/// Bitcoin Gold fork id, placed in bits 8.. of the hash type
pub const BITCOIN_GOLD_FORK_ID: u32 = 79;
