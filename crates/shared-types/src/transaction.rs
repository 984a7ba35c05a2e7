//! # Transactions
//!
//! Typed EVM transactions (EIP-2718 envelope) with canonical RLP encoding,
//! signing hashes and intrinsic gas.
//!
//! | Type | Byte | Fee fields |
//! |------|------|------------|
//! | Legacy | none | `gas_price` |
//! | AccessList | `0x01` | `gas_price` |
//! | DynamicFee | `0x02` | tip cap / fee cap |
//! | Blob | `0x03` | tip cap / fee cap / blob fee cap |
//! | SetCode | `0x04` | tip cap / fee cap, plus authorizations |
//!
//! Legacy and access-list transactions store their single gas price in both
//! `gas_tip_cap` and `gas_fee_cap`.
//!
//! Sender recovery needs secp256k1 and lives in `shared-crypto`.

use crate::errors::TypesError;
use crate::hashing::{keccak256, keccak256_concat};
use crate::primitives::{
    append_rlp_list, expect_list_len, rlp_list_at, Address, Gas, Hash, U256,
};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

/// Base cost of every transaction.
pub const TX_GAS: Gas = 21_000;
/// Base cost of a contract creation.
pub const TX_GAS_CONTRACT_CREATION: Gas = 53_000;
/// Cost per zero calldata byte.
pub const TX_DATA_ZERO_GAS: Gas = 4;
/// Cost per non-zero calldata byte.
pub const TX_DATA_NON_ZERO_GAS: Gas = 16;
/// Cost per 32-byte word of init code.
pub const INIT_CODE_WORD_GAS: Gas = 2;
/// Cost per access-list address.
pub const TX_ACCESS_LIST_ADDRESS_GAS: Gas = 2_400;
/// Cost per access-list storage key.
pub const TX_ACCESS_LIST_STORAGE_KEY_GAS: Gas = 1_900;
/// Cost per set-code authorization.
pub const TX_AUTHORIZATION_GAS: Gas = 25_000;
/// Magic prefix of the authorization signing preimage.
pub const AUTHORIZATION_MAGIC: u8 = 0x05;

/// EIP-2718 transaction type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TxType {
    /// Pre-EIP-2718 transaction.
    Legacy,
    /// EIP-2930.
    AccessList,
    /// EIP-1559.
    DynamicFee,
    /// EIP-4844.
    Blob,
    /// EIP-7702.
    SetCode,
}

impl TxType {
    /// Envelope type byte.
    pub fn as_byte(&self) -> u8 {
        match self {
            TxType::Legacy => 0,
            TxType::AccessList => 1,
            TxType::DynamicFee => 2,
            TxType::Blob => 3,
            TxType::SetCode => 4,
        }
    }

    /// Parse an envelope type byte.
    pub fn from_byte(b: u8) -> Result<Self, TypesError> {
        match b {
            0 => Ok(TxType::Legacy),
            1 => Ok(TxType::AccessList),
            2 => Ok(TxType::DynamicFee),
            3 => Ok(TxType::Blob),
            4 => Ok(TxType::SetCode),
            other => Err(TypesError::UnknownTxType(other)),
        }
    }
}

/// One access-list entry.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessListItem {
    /// Touched account.
    pub address: Address,
    /// Touched storage slots.
    pub storage_keys: Vec<Hash>,
}

impl Encodable for AccessListItem {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.address);
        append_rlp_list(s, &self.storage_keys);
    }
}

impl Decodable for AccessListItem {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 2)?;
        Ok(Self {
            address: rlp.val_at(0)?,
            storage_keys: rlp_list_at(rlp, 1)?,
        })
    }
}

/// Signed EIP-7702 delegation.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Authorization {
    /// Chain id the authorization is valid on (zero = any chain).
    pub chain_id: U256,
    /// Delegation target.
    pub address: Address,
    /// Authority nonce the authorization consumes.
    pub nonce: u64,
    /// Signature recovery bit.
    pub y_parity: u8,
    /// Signature R.
    pub r: U256,
    /// Signature S.
    pub s: U256,
}

impl Authorization {
    /// Digest the authority signs: `keccak(0x05 ‖ rlp([chain_id, address, nonce]))`.
    pub fn signing_hash(&self) -> Hash {
        let mut s = RlpStream::new_list(3);
        s.append(&self.chain_id);
        s.append(&self.address);
        s.append(&self.nonce);
        let body = s.out();
        keccak256_concat(&[&[AUTHORIZATION_MAGIC][..], &body[..]])
    }
}

impl Encodable for Authorization {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(6);
        s.append(&self.chain_id);
        s.append(&self.address);
        s.append(&self.nonce);
        s.append(&self.y_parity);
        s.append(&self.r);
        s.append(&self.s);
    }
}

impl Decodable for Authorization {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 6)?;
        Ok(Self {
            chain_id: rlp.val_at(0)?,
            address: rlp.val_at(1)?,
            nonce: rlp.val_at(2)?,
            y_parity: rlp.val_at(3)?,
            r: rlp.val_at(4)?,
            s: rlp.val_at(5)?,
        })
    }
}

/// Transaction signature values.
///
/// For legacy transactions `v` follows EIP-155 (`recid + 35 + 2·chain_id`);
/// for typed transactions it is the y-parity bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxSignature {
    /// Recovery value.
    pub v: u64,
    /// R.
    pub r: U256,
    /// S.
    pub s: U256,
}

impl TxSignature {
    /// True when no signature has been attached.
    pub fn is_empty(&self) -> bool {
        self.r.is_zero() && self.s.is_zero()
    }
}

/// An EVM transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Envelope type.
    pub tx_type: TxType,
    /// Chain id.
    pub chain_id: u64,
    /// Sender nonce.
    pub nonce: u64,
    /// Priority fee cap (gas price for legacy types).
    pub gas_tip_cap: U256,
    /// Total fee cap (gas price for legacy types).
    pub gas_fee_cap: U256,
    /// Gas limit.
    pub gas: Gas,
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Transferred value.
    pub value: U256,
    /// Calldata or init code.
    pub data: Vec<u8>,
    /// EIP-2930 access list.
    pub access_list: Vec<AccessListItem>,
    /// EIP-4844 blob fee cap.
    pub max_fee_per_blob_gas: U256,
    /// EIP-4844 versioned blob hashes.
    pub blob_hashes: Vec<Hash>,
    /// EIP-7702 authorizations.
    pub authorizations: Vec<Authorization>,
    /// Signature.
    pub signature: TxSignature,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            tx_type: TxType::Legacy,
            chain_id: 0,
            nonce: 0,
            gas_tip_cap: U256::zero(),
            gas_fee_cap: U256::zero(),
            gas: 0,
            to: None,
            value: U256::zero(),
            data: Vec::new(),
            access_list: Vec::new(),
            max_fee_per_blob_gas: U256::zero(),
            blob_hashes: Vec::new(),
            authorizations: Vec::new(),
            signature: TxSignature::default(),
        }
    }
}

impl Transaction {
    /// Gas price used for ordering: the fee cap.
    pub fn gas_price(&self) -> U256 {
        self.gas_fee_cap
    }

    /// Effective priority fee under `base_fee`, `None` if the fee cap does
    /// not cover the base fee.
    pub fn effective_gas_tip(&self, base_fee: U256) -> Option<U256> {
        if self.gas_fee_cap < base_fee {
            return None;
        }
        Some(std::cmp::min(self.gas_tip_cap, self.gas_fee_cap - base_fee))
    }

    /// Price actually paid per gas unit under `base_fee`.
    pub fn effective_gas_price(&self, base_fee: U256) -> U256 {
        match self.effective_gas_tip(base_fee) {
            Some(tip) => base_fee + tip,
            None => self.gas_fee_cap,
        }
    }

    /// True for contract creations.
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }

    /// Canonical encoding: legacy RLP list, or `type ‖ rlp(fields)` for typed
    /// transactions.
    pub fn encoded(&self) -> Vec<u8> {
        let mut s = RlpStream::new();
        self.append_fields(&mut s, true);
        let body = s.out().to_vec();
        match self.tx_type {
            TxType::Legacy => body,
            ty => {
                let mut out = Vec::with_capacity(body.len() + 1);
                out.push(ty.as_byte());
                out.extend_from_slice(&body);
                out
            }
        }
    }

    /// Transaction hash: Keccak-256 of the canonical encoding.
    pub fn hash(&self) -> Hash {
        keccak256(&self.encoded())
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> u64 {
        self.encoded().len() as u64
    }

    /// Digest the sender signs.
    pub fn signing_hash(&self) -> Hash {
        let mut s = RlpStream::new();
        self.append_fields(&mut s, false);
        let body = s.out();
        match self.tx_type {
            TxType::Legacy => keccak256(&body),
            ty => keccak256_concat(&[&[ty.as_byte()][..], &body[..]]),
        }
    }

    /// Intrinsic gas, `None` on overflow.
    pub fn intrinsic_gas(&self) -> Option<Gas> {
        let mut gas = if self.is_create() {
            TX_GAS_CONTRACT_CREATION
        } else {
            TX_GAS
        };

        let non_zero = self.data.iter().filter(|b| **b != 0).count() as u64;
        let zero = self.data.len() as u64 - non_zero;
        gas = gas.checked_add(non_zero.checked_mul(TX_DATA_NON_ZERO_GAS)?)?;
        gas = gas.checked_add(zero.checked_mul(TX_DATA_ZERO_GAS)?)?;

        if self.is_create() {
            let words = (self.data.len() as u64).div_ceil(32);
            gas = gas.checked_add(words.checked_mul(INIT_CODE_WORD_GAS)?)?;
        }

        for item in &self.access_list {
            gas = gas.checked_add(TX_ACCESS_LIST_ADDRESS_GAS)?;
            let keys = item.storage_keys.len() as u64;
            gas = gas.checked_add(keys.checked_mul(TX_ACCESS_LIST_STORAGE_KEY_GAS)?)?;
        }

        let auths = self.authorizations.len() as u64;
        gas = gas.checked_add(auths.checked_mul(TX_AUTHORIZATION_GAS)?)?;
        Some(gas)
    }

    /// Decode a canonical encoding produced by [`Transaction::encoded`].
    pub fn decode_canonical(bytes: &[u8]) -> Result<Self, TypesError> {
        let first = *bytes.first().ok_or(TypesError::Empty)?;
        if first >= 0xc0 {
            let rlp = Rlp::new(bytes);
            return Ok(Self::decode_fields(TxType::Legacy, &rlp)?);
        }
        let ty = TxType::from_byte(first)?;
        let rlp = Rlp::new(&bytes[1..]);
        Ok(Self::decode_fields(ty, &rlp)?)
    }

    fn append_to(s: &mut RlpStream, to: &Option<Address>) {
        match to {
            Some(addr) => {
                s.append(addr);
            }
            None => {
                s.append_empty_data();
            }
        }
    }

    fn append_fields(&self, s: &mut RlpStream, with_signature: bool) {
        let sig_items = if with_signature { 3 } else { 0 };
        match self.tx_type {
            TxType::Legacy => {
                s.begin_list(9);
                s.append(&self.nonce);
                s.append(&self.gas_fee_cap);
                s.append(&self.gas);
                Self::append_to(s, &self.to);
                s.append(&self.value);
                s.append(&self.data);
                if with_signature {
                    s.append(&self.signature.v);
                    s.append(&self.signature.r);
                    s.append(&self.signature.s);
                } else {
                    // EIP-155 replay protection
                    s.append(&self.chain_id);
                    s.append(&0u8);
                    s.append(&0u8);
                }
                return;
            }
            TxType::AccessList => {
                s.begin_list(8 + sig_items);
                s.append(&self.chain_id);
                s.append(&self.nonce);
                s.append(&self.gas_fee_cap);
                s.append(&self.gas);
                Self::append_to(s, &self.to);
                s.append(&self.value);
                s.append(&self.data);
                append_rlp_list(s, &self.access_list);
            }
            TxType::DynamicFee => {
                s.begin_list(9 + sig_items);
                self.append_dynamic_fee_prefix(s);
            }
            TxType::Blob => {
                s.begin_list(11 + sig_items);
                self.append_dynamic_fee_prefix(s);
                s.append(&self.max_fee_per_blob_gas);
                append_rlp_list(s, &self.blob_hashes);
            }
            TxType::SetCode => {
                s.begin_list(10 + sig_items);
                self.append_dynamic_fee_prefix(s);
                append_rlp_list(s, &self.authorizations);
            }
        }
        if with_signature {
            s.append(&self.signature.v);
            s.append(&self.signature.r);
            s.append(&self.signature.s);
        }
    }

    fn append_dynamic_fee_prefix(&self, s: &mut RlpStream) {
        s.append(&self.chain_id);
        s.append(&self.nonce);
        s.append(&self.gas_tip_cap);
        s.append(&self.gas_fee_cap);
        s.append(&self.gas);
        Self::append_to(s, &self.to);
        s.append(&self.value);
        s.append(&self.data);
        append_rlp_list(s, &self.access_list);
    }

    fn decode_to(rlp: &Rlp, index: usize) -> Result<Option<Address>, DecoderError> {
        let item = rlp.at(index)?;
        if item.is_empty() {
            Ok(None)
        } else {
            Ok(Some(item.as_val()?))
        }
    }

    fn decode_signature(rlp: &Rlp, from: usize) -> Result<TxSignature, DecoderError> {
        Ok(TxSignature {
            v: rlp.val_at(from)?,
            r: rlp.val_at(from + 1)?,
            s: rlp.val_at(from + 2)?,
        })
    }

    fn decode_fields(ty: TxType, rlp: &Rlp) -> Result<Self, DecoderError> {
        let mut tx = Transaction {
            tx_type: ty,
            ..Default::default()
        };
        match ty {
            TxType::Legacy => {
                expect_list_len(rlp, 9)?;
                tx.nonce = rlp.val_at(0)?;
                tx.gas_fee_cap = rlp.val_at(1)?;
                tx.gas_tip_cap = tx.gas_fee_cap;
                tx.gas = rlp.val_at(2)?;
                tx.to = Self::decode_to(rlp, 3)?;
                tx.value = rlp.val_at(4)?;
                tx.data = rlp.val_at(5)?;
                tx.signature = Self::decode_signature(rlp, 6)?;
                tx.chain_id = legacy_chain_id(tx.signature.v).unwrap_or(0);
            }
            TxType::AccessList => {
                expect_list_len(rlp, 11)?;
                tx.chain_id = rlp.val_at(0)?;
                tx.nonce = rlp.val_at(1)?;
                tx.gas_fee_cap = rlp.val_at(2)?;
                tx.gas_tip_cap = tx.gas_fee_cap;
                tx.gas = rlp.val_at(3)?;
                tx.to = Self::decode_to(rlp, 4)?;
                tx.value = rlp.val_at(5)?;
                tx.data = rlp.val_at(6)?;
                tx.access_list = rlp_list_at(rlp, 7)?;
                tx.signature = Self::decode_signature(rlp, 8)?;
            }
            TxType::DynamicFee | TxType::Blob | TxType::SetCode => {
                let expected = match ty {
                    TxType::DynamicFee => 12,
                    TxType::Blob => 14,
                    _ => 13,
                };
                expect_list_len(rlp, expected)?;
                tx.chain_id = rlp.val_at(0)?;
                tx.nonce = rlp.val_at(1)?;
                tx.gas_tip_cap = rlp.val_at(2)?;
                tx.gas_fee_cap = rlp.val_at(3)?;
                tx.gas = rlp.val_at(4)?;
                tx.to = Self::decode_to(rlp, 5)?;
                tx.value = rlp.val_at(6)?;
                tx.data = rlp.val_at(7)?;
                tx.access_list = rlp_list_at(rlp, 8)?;
                let sig_at = match ty {
                    TxType::Blob => {
                        tx.max_fee_per_blob_gas = rlp.val_at(9)?;
                        tx.blob_hashes = rlp_list_at(rlp, 10)?;
                        11
                    }
                    TxType::SetCode => {
                        tx.authorizations = rlp_list_at(rlp, 9)?;
                        10
                    }
                    _ => 9,
                };
                tx.signature = Self::decode_signature(rlp, sig_at)?;
            }
        }
        Ok(tx)
    }
}

/// Chain id carried by an EIP-155 `v`, `None` for pre-EIP-155 signatures.
pub fn legacy_chain_id(v: u64) -> Option<u64> {
    if v >= 35 {
        Some((v - 35) / 2)
    } else {
        None
    }
}

impl Encodable for Transaction {
    fn rlp_append(&self, s: &mut RlpStream) {
        match self.tx_type {
            TxType::Legacy => self.append_fields(s, true),
            _ => {
                s.append(&self.encoded());
            }
        }
    }
}

impl Decodable for Transaction {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.is_list() {
            return Self::decode_fields(TxType::Legacy, rlp);
        }
        let data = rlp.data()?;
        let first = *data.first().ok_or(DecoderError::RlpIsTooShort)?;
        let ty = TxType::from_byte(first).map_err(|_| DecoderError::Custom("unknown tx type"))?;
        if ty == TxType::Legacy {
            return Err(DecoderError::Custom("legacy tx in typed envelope"));
        }
        Self::decode_fields(ty, &Rlp::new(&data[1..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic_fee_tx() -> Transaction {
        Transaction {
            tx_type: TxType::DynamicFee,
            chain_id: 4003,
            nonce: 7,
            gas_tip_cap: U256::from(2u64),
            gas_fee_cap: U256::from(10u64),
            gas: 50_000,
            to: Some(Address::repeat_byte(0x11)),
            value: U256::from(1_000u64),
            data: vec![0, 1, 2, 0],
            signature: TxSignature {
                v: 1,
                r: U256::from(5u64),
                s: U256::from(6u64),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_intrinsic_gas_for_call() {
        let tx = dynamic_fee_tx();
        // 21000 + 2 non-zero * 16 + 2 zero * 4
        assert_eq!(tx.intrinsic_gas(), Some(21_000 + 32 + 8));
    }

    #[test]
    fn test_intrinsic_gas_for_create_counts_init_code_words() {
        let tx = Transaction {
            data: vec![1u8; 33],
            gas: 100_000,
            ..Default::default()
        };
        // 53000 + 33 * 16 + 2 words * 2
        assert_eq!(tx.intrinsic_gas(), Some(53_000 + 528 + 4));
    }

    #[test]
    fn test_intrinsic_gas_access_list_and_authorizations() {
        let mut tx = dynamic_fee_tx();
        tx.tx_type = TxType::SetCode;
        tx.data.clear();
        tx.access_list = vec![AccessListItem {
            address: Address::zero(),
            storage_keys: vec![Hash::zero(), Hash::zero()],
        }];
        tx.authorizations = vec![Authorization::default()];
        assert_eq!(tx.intrinsic_gas(), Some(21_000 + 2_400 + 3_800 + 25_000));
    }

    #[test]
    fn test_typed_envelope_roundtrip() {
        let tx = dynamic_fee_tx();
        let encoded = tx.encoded();
        assert_eq!(encoded[0], 2);
        assert_eq!(Transaction::decode_canonical(&encoded).unwrap(), tx);
    }

    #[test]
    fn test_legacy_inside_list() {
        let tx = Transaction {
            tx_type: TxType::Legacy,
            chain_id: 4003,
            nonce: 1,
            gas_tip_cap: U256::from(3u64),
            gas_fee_cap: U256::from(3u64),
            gas: 21_000,
            to: Some(Address::repeat_byte(0x22)),
            signature: TxSignature {
                v: 35 + 2 * 4003,
                r: U256::one(),
                s: U256::one(),
            },
            ..Default::default()
        };
        let mut s = RlpStream::new();
        append_rlp_list(&mut s, &[tx.clone(), dynamic_fee_tx()]);
        let out = s.out();
        let decoded: Vec<Transaction> = Rlp::new(&out)
            .iter()
            .map(|r| Transaction::decode(&r))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded, vec![tx, dynamic_fee_tx()]);
    }

    #[test]
    fn test_signing_hash_ignores_signature() {
        let a = dynamic_fee_tx();
        let mut b = a.clone();
        b.signature.r = U256::from(99u64);
        assert_eq!(a.signing_hash(), b.signing_hash());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_effective_tip() {
        let tx = dynamic_fee_tx();
        assert_eq!(tx.effective_gas_tip(U256::from(9u64)), Some(U256::one()));
        assert_eq!(tx.effective_gas_tip(U256::from(11u64)), None);
        assert_eq!(tx.effective_gas_price(U256::from(5u64)), U256::from(7u64));
    }
}
