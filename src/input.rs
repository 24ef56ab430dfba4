//! Boundary validation for scan requests
//!
//! Requests arrive as untyped JSON from the wallet transport layer. This
//! module is the only place that accepts untyped data: everything past it is
//! fully typed. Structurally invalid requests are rejected here with
//! [`InputError`](crate::errors::InputError) and never turn into risk
//! findings.
//!
//! EIP-7702 authorization lists get one deliberate exception to strictness:
//! malformed entries are dropped individually and the valid remainder is
//! kept, so one garbage entry cannot suppress analysis of an otherwise
//! well-formed transaction.

use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::InputError;
use crate::types::Chain;

/// One EIP-7702 authorization entry, passed through to the simulator untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Authorization {
    pub address: Address,
    pub chain_id: u64,
    pub nonce: u64,
}

/// A pending transaction to analyze before signing
#[derive(Debug, Clone, Serialize)]
pub struct CalldataInput {
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub data: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<Chain>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authorization_list: Vec<Authorization>,
}

/// A validated analysis request: exactly one of an address or a pending
/// transaction
#[derive(Debug, Clone, Serialize)]
pub struct ScanInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calldata: Option<CalldataInput>,
}

impl ScanInput {
    /// Build an address-only request
    pub fn for_address(address: Address) -> Self {
        Self {
            address: Some(address),
            calldata: None,
        }
    }

    /// Build a calldata request
    pub fn for_calldata(calldata: CalldataInput) -> Self {
        Self {
            address: None,
            calldata: Some(calldata),
        }
    }

    /// True when the request carries a simulatable transaction
    pub fn has_calldata(&self) -> bool {
        self.calldata.is_some()
    }
}

/// Parse and validate a scan request from untyped JSON
pub fn parse_scan_input(value: &Value) -> Result<ScanInput, InputError> {
    let address = match value.get("address") {
        Some(raw) => Some(parse_address(raw)?),
        None => None,
    };
    let calldata = match value.get("calldata") {
        Some(raw) => Some(parse_calldata(raw)?),
        None => None,
    };

    if address.is_some() == calldata.is_some() {
        return Err(InputError::AmbiguousInput);
    }

    Ok(ScanInput { address, calldata })
}

fn parse_calldata(value: &Value) -> Result<CalldataInput, InputError> {
    let to = parse_address(
        value
            .get("to")
            .ok_or_else(|| InputError::InvalidAddress("missing `to`".to_string()))?,
    )?;
    let from = match value.get("from") {
        Some(raw) => Some(parse_address(raw)?),
        None => None,
    };
    let data = parse_hex_data(
        value
            .get("data")
            .ok_or_else(|| InputError::InvalidHexData("missing `data`".to_string()))?,
    )?;
    let tx_value = match value.get("value") {
        Some(raw) => Some(parse_numeric(raw)?),
        None => None,
    };
    let chain = match value.get("chain").and_then(Value::as_str) {
        Some(raw) => Some(Chain::from_str(raw)?),
        None => None,
    };
    let authorization_list = value
        .get("authorizationList")
        .map(parse_authorization_list)
        .unwrap_or_default();

    Ok(CalldataInput {
        to,
        from,
        data,
        value: tx_value,
        chain,
        authorization_list,
    })
}

/// Extract the valid entries of an EIP-7702 authorization list
///
/// Malformed entries (bad address, non-numeric chain ID or nonce, non-object
/// items) are dropped individually; the remainder is preserved in order.
pub fn parse_authorization_list(value: &Value) -> Vec<Authorization> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        match parse_authorization(entry) {
            Some(auth) => out.push(auth),
            None => {
                debug!(target: "txsentry::input", ?entry, "dropping malformed authorization entry");
            }
        }
    }
    out
}

fn parse_authorization(entry: &Value) -> Option<Authorization> {
    let object = entry.as_object()?;
    let address = parse_address(object.get("address")?).ok()?;
    let chain_id = parse_quantity(object.get("chainId")?)?;
    let nonce = parse_quantity(object.get("nonce")?)?;
    Some(Authorization {
        address,
        chain_id,
        nonce,
    })
}

fn parse_address(value: &Value) -> Result<Address, InputError> {
    let raw = value
        .as_str()
        .ok_or_else(|| InputError::InvalidAddress(value.to_string()))?;
    if !is_address_literal(raw) {
        return Err(InputError::InvalidAddress(raw.to_string()));
    }
    Address::from_str(raw).map_err(|_| InputError::InvalidAddress(raw.to_string()))
}

fn parse_hex_data(value: &Value) -> Result<Bytes, InputError> {
    let raw = value
        .as_str()
        .ok_or_else(|| InputError::InvalidHexData(value.to_string()))?;
    if !raw.starts_with("0x") || !raw[2..].bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(InputError::InvalidHexData(raw.to_string()));
    }
    Bytes::from_str(raw).map_err(|_| InputError::InvalidHexData(raw.to_string()))
}

/// Accepts both decimal strings and 0x-hex quantities for `value`
fn parse_numeric(value: &Value) -> Result<U256, InputError> {
    let raw = value
        .as_str()
        .ok_or_else(|| InputError::InvalidValue(value.to_string()))?;
    let parsed = if let Some(hex) = raw.strip_prefix("0x") {
        U256::from_str_radix(hex, 16)
    } else {
        U256::from_str_radix(raw, 10)
    };
    parsed.map_err(|_| InputError::InvalidValue(raw.to_string()))
}

/// Quantity fields inside authorization entries: JSON number or 0x-hex string
fn parse_quantity(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let raw = value.as_str()?;
    if let Some(hex) = raw.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        raw.parse().ok()
    }
}

fn is_address_literal(raw: &str) -> bool {
    raw.len() == 42
        && raw.starts_with("0x")
        && raw[2..].bytes().all(|b| b.is_ascii_hexdigit())
}
