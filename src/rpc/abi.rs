//! Minimal ABI encoding for the handful of read-only contract calls the feed
//! issues: call data for static `bytes32`/no-arg functions, ENS namehashing,
//! and decoding of `uint256`, `address` and `string` return values.

use alloy_primitives::{keccak256, Address, B256};
use anyhow::{bail, ensure, Context, Result};

const WORD: usize = 32;

/// First four bytes of the keccak hash of a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Builds `0x`-prefixed call data for `signature` with static 32-byte arguments.
pub fn encode_call(signature: &str, args: &[B256]) -> String {
    let mut data = Vec::with_capacity(4 + args.len() * WORD);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(arg.as_slice());
    }
    format!("0x{}", hex::encode(data))
}

/// ENS namehash (EIP-137) of a dot-separated name.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 2 * WORD];
        buf[..WORD].copy_from_slice(node.as_slice());
        buf[WORD..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }
    node
}

/// Reverse-registrar node for `address`: `namehash("<hex>.addr.reverse")`.
pub fn reverse_node(address: &Address) -> B256 {
    namehash(&format!("{}.addr.reverse", hex::encode(address.as_slice())))
}

pub fn decode_u64(data: &str) -> Result<u64> {
    let bytes = decode_hex(data)?;
    let word = word_at(&bytes, 0)?;
    ensure!(
        word[..WORD - 8].iter().all(|byte| *byte == 0),
        "uint256 return value does not fit in u64"
    );
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(tail))
}

pub fn decode_address(data: &str) -> Result<Address> {
    let bytes = decode_hex(data)?;
    let word = word_at(&bytes, 0)?;
    Ok(Address::from_slice(&word[WORD - 20..]))
}

/// Decodes a single dynamic `string` return value (offset, length, bytes).
/// Invalid UTF-8 is replaced rather than rejected.
pub fn decode_string(data: &str) -> Result<String> {
    let bytes = decode_hex(data)?;
    if bytes.is_empty() {
        return Ok(String::new());
    }
    let offset = word_as_usize(word_at(&bytes, 0)?).context("string offset out of range")?;
    let length_word = bytes
        .get(offset..offset.saturating_add(WORD))
        .context("string length word out of range")?;
    let length = word_as_usize(length_word).context("string length out of range")?;
    let start = offset + WORD;
    let content = bytes
        .get(start..start.saturating_add(length))
        .context("string content out of range")?;
    Ok(String::from_utf8_lossy(content).into_owned())
}

pub fn encode_u64(value: u64) -> String {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    format!("0x{}", hex::encode(word))
}

pub fn encode_address(address: &Address) -> String {
    let mut word = [0u8; WORD];
    word[WORD - 20..].copy_from_slice(address.as_slice());
    format!("0x{}", hex::encode(word))
}

pub fn encode_string(value: &str) -> String {
    let bytes = value.as_bytes();
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(2 * WORD + padded);
    out.extend_from_slice(&usize_word(WORD));
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(2 * WORD + padded, 0);
    format!("0x{}", hex::encode(out))
}

fn decode_hex(data: &str) -> Result<Vec<u8>> {
    let trimmed = data.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(stripped).context("invalid hex in eth_call result")
}

fn word_at(bytes: &[u8], index: usize) -> Result<&[u8]> {
    let start = index * WORD;
    match bytes.get(start..start + WORD) {
        Some(word) => Ok(word),
        None => bail!("eth_call result shorter than {} bytes", start + WORD),
    }
}

fn word_as_usize(word: &[u8]) -> Option<usize> {
    if word[..WORD - 8].iter().any(|byte| *byte != 0) {
        return None;
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(tail)).ok()
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}
