//! Transaction model and wire format
//!
//! `Tx` streams in two layouts. Legacy:
//! `version | n_in | txs_in | n_out | txs_out | lock_time`.
//! SegWit (BIP-144), used whenever any input carries witness data, inserts
//! the marker/flag pair `0x00 0x01` after the version and the per-input
//! witness stacks before the lock time.
//!
//! Verification and signing need the outputs being spent; those travel
//! beside the transaction in `unspents`, and can optionally be appended to
//! the serialization for offline signing.

use crate::constants::*;
use crate::error::{ConsensusError, Result, SolvingError, ValidationFailureError};
use crate::hashing::double_sha256;
use crate::segwit;
use crate::serialization::{parse_struct, ByteReader, ByteWriter, Field, Streamable};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::debug;

/// A transaction output: an amount locked by a puzzle script.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxOut {
    pub coin_value: u64,
    pub script: ByteString,
}

impl TxOut {
    pub fn new(coin_value: u64, script: ByteString) -> Self {
        Self { coin_value, script }
    }
}

impl Streamable for TxOut {
    fn stream(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.coin_value);
        writer.write_byte_string(&self.script);
    }

    fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let mut fields = parse_struct("QS", reader)?.into_iter();
        let coin_value = fields.next().and_then(|f| f.as_u64());
        let script = fields.next().and_then(Field::into_bytes);
        match (coin_value, script) {
            (Some(coin_value), Some(script)) => Ok(Self { coin_value, script }),
            _ => Err(ConsensusError::Serialization(Cow::Borrowed("malformed TxOut"))),
        }
    }
}

/// A transaction input: a reference to a previous output plus the
/// solution (scriptSig and witness) that unlocks it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_hash: Hash,
    pub previous_index: u32,
    pub script: ByteString,
    pub sequence: u32,
    #[serde(default)]
    pub witness: Vec<ByteString>,
}

impl TxIn {
    pub fn new(previous_hash: Hash, previous_index: u32, script: ByteString, sequence: u32) -> Self {
        Self {
            previous_hash,
            previous_index,
            script,
            sequence,
            witness: Vec::new(),
        }
    }

    pub fn coinbase(script: ByteString, sequence: u32) -> Self {
        Self::new(ZERO_HASH, COINBASE_PREVIOUS_INDEX, script, sequence)
    }

    pub fn is_coinbase(&self) -> bool {
        self.previous_hash == ZERO_HASH && self.previous_index == COINBASE_PREVIOUS_INDEX
    }

    fn outpoint(&self) -> (Hash, u32) {
        (self.previous_hash, self.previous_index)
    }
}

impl Streamable for TxIn {
    fn stream(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.previous_hash);
        writer.write_u32_le(self.previous_index);
        writer.write_byte_string(&self.script);
        writer.write_u32_le(self.sequence);
    }

    fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let mut fields = parse_struct("#LSL", reader)?.into_iter();
        let previous_hash = fields.next().and_then(|f| f.as_hash());
        let previous_index = fields.next().and_then(|f| f.as_u32());
        let script = fields.next().and_then(Field::into_bytes);
        let sequence = fields.next().and_then(|f| f.as_u32());
        match (previous_hash, previous_index, script, sequence) {
            (Some(previous_hash), Some(previous_index), Some(script), Some(sequence)) => {
                Ok(Self::new(previous_hash, previous_index, script, sequence))
            }
            _ => Err(ConsensusError::Serialization(Cow::Borrowed("malformed TxIn"))),
        }
    }
}

/// A `TxOut` plus wallet bookkeeping about where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spendable {
    pub coin_value: u64,
    pub script: ByteString,
    pub tx_hash: Hash,
    pub tx_out_index: u32,
    #[serde(default)]
    pub block_index_available: u32,
    #[serde(default)]
    pub does_seem_spent: bool,
    #[serde(default)]
    pub block_index_spent: u32,
}

impl Spendable {
    pub fn from_tx_out(tx_out: &TxOut, tx_hash: Hash, tx_out_index: u32) -> Self {
        Self {
            coin_value: tx_out.coin_value,
            script: tx_out.script.clone(),
            tx_hash,
            tx_out_index,
            block_index_available: 0,
            does_seem_spent: false,
            block_index_spent: 0,
        }
    }

    pub fn tx_out(&self) -> TxOut {
        TxOut::new(self.coin_value, self.script.clone())
    }

    /// An unsigned input spending this output.
    pub fn tx_in(&self) -> TxIn {
        TxIn::new(self.tx_hash, self.tx_out_index, Vec::new(), SEQUENCE_FINAL)
    }
}

/// A transaction with its optional `unspents` attachment.
///
/// `unspents` is either empty (detached) or holds one entry per input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub version: u32,
    pub txs_in: Vec<TxIn>,
    pub txs_out: Vec<TxOut>,
    pub lock_time: u32,
    #[serde(default)]
    pub unspents: Vec<Option<TxOut>>,
}

impl Tx {
    pub fn new(version: u32, txs_in: Vec<TxIn>, txs_out: Vec<TxOut>, lock_time: u32) -> Self {
        Self {
            version,
            txs_in,
            txs_out,
            lock_time,
            unspents: Vec::new(),
        }
    }

    /// Builds an unsigned transaction spending `spendables`, with the
    /// unspents attached.
    pub fn from_spendables(version: u32, spendables: &[Spendable], txs_out: Vec<TxOut>, lock_time: u32) -> Self {
        let mut tx = Self::new(
            version,
            spendables.iter().map(Spendable::tx_in).collect(),
            txs_out,
            lock_time,
        );
        tx.unspents = spendables.iter().map(|s| Some(s.tx_out())).collect();
        tx
    }

    pub fn is_coinbase(&self) -> bool {
        self.txs_in.len() == 1 && self.txs_in[0].is_coinbase()
    }

    pub fn has_witness_data(&self) -> bool {
        self.txs_in.iter().any(|tx_in| !tx_in.witness.is_empty())
    }

    /// Streams the transaction. Witness data is written only when asked for
    /// and present; unspents only when asked for.
    pub fn stream_with(&self, writer: &mut ByteWriter, include_witness: bool, include_unspents: bool) {
        let segwit = include_witness && self.has_witness_data();
        writer.write_u32_le(self.version);
        if segwit {
            writer.write_u8(0x00);
            writer.write_u8(0x01);
        }
        writer.write_compact_size(self.txs_in.len() as u64);
        for tx_in in &self.txs_in {
            tx_in.stream(writer);
        }
        writer.write_compact_size(self.txs_out.len() as u64);
        for tx_out in &self.txs_out {
            tx_out.stream(writer);
        }
        if segwit {
            for tx_in in &self.txs_in {
                writer.write_compact_size(tx_in.witness.len() as u64);
                for item in &tx_in.witness {
                    writer.write_byte_string(item);
                }
            }
        }
        writer.write_u32_le(self.lock_time);
        if include_unspents {
            for idx in 0..self.txs_in.len() {
                match self.unspents.get(idx).and_then(Option::as_ref) {
                    Some(tx_out) => tx_out.stream(writer),
                    None => TxOut::new(0, Vec::new()).stream(writer),
                }
            }
        }
    }

    fn parse_unspents(&self, reader: &mut ByteReader<'_>) -> Result<Vec<Option<TxOut>>> {
        (0..self.txs_in.len())
            .map(|_| {
                let tx_out = TxOut::parse(reader)?;
                Ok((tx_out.coin_value != 0 || !tx_out.script.is_empty()).then_some(tx_out))
            })
            .collect()
    }

    pub fn to_bin(&self) -> Vec<u8> {
        self.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bin())
    }

    /// Serialization followed by one `TxOut` per input (zero value and
    /// empty script where the unspent is unknown).
    pub fn to_bin_with_unspents(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.stream_with(&mut writer, true, true);
        writer.into_bytes()
    }

    /// Parses `bytes`, including the unspents extension when it is present
    /// and well formed. Anything unparseable after the lock time is ignored.
    pub fn from_bin(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        Self::parse(&mut reader)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        Self::from_bin(&hex::decode(text.trim())?)
    }

    /// Legacy serialization, never carrying witness data.
    pub fn to_legacy_bin(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.stream_with(&mut writer, false, false);
        writer.into_bytes()
    }

    /// txid: double SHA-256 of the legacy serialization.
    pub fn hash(&self) -> Hash {
        double_sha256(&self.to_legacy_bin())
    }

    /// wtxid: double SHA-256 of the witness serialization.
    pub fn w_hash(&self) -> Hash {
        double_sha256(&self.to_bin())
    }

    pub fn id(&self) -> String {
        hash_to_hex_reversed(&self.hash())
    }

    pub fn w_id(&self) -> String {
        hash_to_hex_reversed(&self.w_hash())
    }

    /// Hash with every scriptSig emptied; equal for malleated variants.
    pub fn blanked_hash(&self) -> Hash {
        let mut blank = self.clone();
        for tx_in in &mut blank.txs_in {
            tx_in.script.clear();
        }
        double_sha256(&blank.to_legacy_bin())
    }

    pub fn size(&self) -> usize {
        self.to_bin().len()
    }

    pub fn weight(&self) -> usize {
        segwit::transaction_weight(self)
    }

    pub fn vsize(&self) -> usize {
        segwit::virtual_size(self)
    }

    /// Attaches the outputs spent by each input, in input order.
    pub fn set_unspents(&mut self, unspents: Vec<Option<TxOut>>) -> Result<()> {
        if !unspents.is_empty() && unspents.len() != self.txs_in.len() {
            return Err(ConsensusError::Validation(ValidationFailureError::new(format!(
                "{} unspents for {} inputs",
                unspents.len(),
                self.txs_in.len()
            ))));
        }
        self.unspents = unspents;
        Ok(())
    }

    pub fn unspent(&self, tx_in_idx: usize) -> Option<&TxOut> {
        self.unspents.get(tx_in_idx).and_then(Option::as_ref)
    }

    /// Indices of non-coinbase inputs with no known unspent.
    pub fn missing_unspents(&self) -> Vec<usize> {
        self.txs_in
            .iter()
            .enumerate()
            .filter(|(idx, tx_in)| !tx_in.is_coinbase() && self.unspent(*idx).is_none())
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn total_in(&self) -> Result<u64> {
        if self.is_coinbase() {
            return Ok(0);
        }
        self.txs_in.iter().enumerate().try_fold(0u64, |acc, (idx, _)| {
            let value = self
                .unspent(idx)
                .ok_or(SolvingError::MissingUnspent(idx))?
                .coin_value;
            acc.checked_add(value)
                .ok_or_else(|| ValidationFailureError::new("input total overflows").into())
        })
    }

    pub fn total_out(&self) -> u64 {
        self.txs_out
            .iter()
            .fold(0u64, |acc, tx_out| acc.saturating_add(tx_out.coin_value))
    }

    /// `total_in - total_out`; negative when the outputs overspend.
    pub fn fee(&self) -> Result<i128> {
        Ok(i128::from(self.total_in()?) - i128::from(self.total_out()))
    }

    /// CheckTransaction: 𝒯𝒳 → {valid, invalid}
    ///
    /// A transaction is well formed iff:
    /// 1. |txs_in| > 0 ∧ |txs_out| > 0
    /// 2. |legacy serialization| ≤ MAX_BLOCK_SIZE
    /// 3. ∀o: o.coin_value ≤ MAX_MONEY and every partial sum ≤ MAX_MONEY
    /// 4. no outpoint is spent twice
    /// 5. coinbase: 2 ≤ |script| ≤ 100; otherwise no input references the null outpoint
    pub fn check(&self) -> Result<()> {
        let fail = |msg: Cow<'static, str>| -> Result<()> {
            Err(ValidationFailureError::new(msg).into())
        };

        // 1. Non-empty inputs and outputs
        if self.txs_in.is_empty() {
            return fail("txs_in empty".into());
        }
        if self.txs_out.is_empty() {
            return fail("txs_out empty".into());
        }

        // 2. Size limit
        let size = self.to_legacy_bin().len();
        if size > MAX_BLOCK_SIZE {
            return fail(format!("transaction too large: {size} bytes").into());
        }

        // 3. Output values
        let mut total: u64 = 0;
        for (idx, tx_out) in self.txs_out.iter().enumerate() {
            if tx_out.coin_value > MAX_MONEY {
                return fail(format!("txs_out[{idx}] value too large").into());
            }
            total = total.saturating_add(tx_out.coin_value);
            if total > MAX_MONEY {
                return fail("total output value too large".into());
            }
        }

        // 4. Duplicate outpoints
        let mut seen = HashSet::new();
        for tx_in in &self.txs_in {
            if !seen.insert(tx_in.outpoint()) {
                return fail("duplicate inputs".into());
            }
        }

        // 5. Coinbase script size / null prevouts
        if self.is_coinbase() {
            let len = self.txs_in[0].script.len();
            if !(2..=100).contains(&len) {
                return fail(format!("bad coinbase script size {len}").into());
            }
        } else if self.txs_in.iter().any(|tx_in| tx_in.previous_hash == ZERO_HASH) {
            return fail("prevout is null".into());
        }
        Ok(())
    }
}

impl Streamable for Tx {
    fn stream(&self, writer: &mut ByteWriter) {
        self.stream_with(writer, true, false);
    }

    fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let version = reader.read_u32_le()?;

        let segwit = match (reader.peek_u8(), reader.peek_at(1)) {
            (Some(0x00), Some(0x01)) => {
                reader.read_u8()?;
                reader.read_u8()?;
                true
            }
            (Some(0x00), Some(0x00)) => {
                return Err(ConsensusError::Serialization(Cow::Borrowed(
                    "invalid segwit flag 0x00",
                )))
            }
            _ => false,
        };

        let n_in = reader.read_compact_size()?;
        // every input occupies at least 41 bytes
        if n_in > (reader.remaining() / 41) as u64 {
            return Err(ConsensusError::Serialization(Cow::Borrowed("too many inputs")));
        }
        let txs_in = (0..n_in)
            .map(|_| TxIn::parse(reader))
            .collect::<Result<Vec<_>>>()?;

        let n_out = reader.read_compact_size()?;
        if n_out > (reader.remaining() / 9) as u64 {
            return Err(ConsensusError::Serialization(Cow::Borrowed("too many outputs")));
        }
        let txs_out = (0..n_out)
            .map(|_| TxOut::parse(reader))
            .collect::<Result<Vec<_>>>()?;

        let mut tx = Tx::new(version, txs_in, txs_out, 0);
        if segwit {
            for tx_in in &mut tx.txs_in {
                let n_items = reader.read_compact_size()?;
                if n_items > reader.remaining() as u64 {
                    return Err(ConsensusError::Serialization(Cow::Borrowed(
                        "too many witness items",
                    )));
                }
                tx_in.witness = (0..n_items)
                    .map(|_| reader.read_byte_string())
                    .collect::<Result<Vec<_>>>()?;
            }
        }
        tx.lock_time = reader.read_u32_le()?;

        if !reader.is_empty() {
            let mut lookahead = reader.clone();
            match tx.parse_unspents(&mut lookahead) {
                Ok(unspents) => {
                    tx.unspents = unspents;
                    *reader = lookahead;
                }
                Err(err) => debug!(%err, "ignoring trailing bytes after transaction"),
            }
        }
        Ok(tx)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bin(bytes)
    }
}
