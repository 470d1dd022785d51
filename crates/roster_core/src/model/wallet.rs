//! Ethereum-style wallet address rules.
//!
//! # Invariants
//! - A valid address is `0x` followed by exactly 40 hex digits.
//! - Mixed-case input must match its EIP-55 checksum; single-case input is
//!   accepted as-is.
//! - Stored and compared addresses are lowercase.

use once_cell::sync::Lazy;
use regex::Regex;
use sha3::{Digest, Keccak256};

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("valid address regex"));

/// Lowercases an address for storage and lookup.
pub fn normalize_wallet_address(address: &str) -> String {
    address.to_ascii_lowercase()
}

/// Returns whether `address` passes the format and checksum rules.
pub fn is_valid_wallet_address(address: &str) -> bool {
    if !ADDRESS_RE.is_match(address) {
        return false;
    }

    let digits = &address[2..];
    let has_lower = digits.bytes().any(|byte| byte.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|byte| byte.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }

    checksum_wallet_address(address).is_some_and(|expected| expected == address)
}

/// Renders the EIP-55 mixed-case form of a well-formed address.
pub fn checksum_wallet_address(address: &str) -> Option<String> {
    if !ADDRESS_RE.is_match(address) {
        return None;
    }

    let lower = address[2..].to_ascii_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());
    let mut checksummed = String::with_capacity(address.len());
    checksummed.push_str("0x");
    for (index, ch) in lower.chars().enumerate() {
        let byte = hash[index / 2];
        let nibble = if index % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if ch.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(ch.to_ascii_uppercase());
        } else {
            checksummed.push(ch);
        }
    }
    Some(checksummed)
}
