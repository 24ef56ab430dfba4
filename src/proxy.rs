//! Proxy contract detection and implementation resolution
//!
//! Classifies an address against the common on-chain proxy patterns:
//! - EIP-1967 (implementation slot)
//! - EIP-1967 beacon proxy
//! - Legacy pre-EIP-1967 upgradeable proxies (same semantic, older slot)
//! - EIP-1167 minimal proxy (clone bytecode)
//!
//! Checks run in strict priority order and the first match wins. Any single
//! storage or bytecode read failure is treated as "slot is zero/absent" and
//! detection continues down the chain: one RPC hiccup must not hide a beacon
//! or minimal pattern further down.

use std::str::FromStr;

use alloy::primitives::{Address, B256};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::traits::ChainReader;
use crate::types::{Chain, ProxyInfo, ProxyType};

/// Slot for the EIP-1967 implementation address
///
/// Calculated as: keccak256("eip1967.proxy.implementation") - 1
const EIP_1967_LOGIC_SLOT: &str =
    "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";

/// Slot for the EIP-1967 beacon address
///
/// Calculated as: keccak256("eip1967.proxy.beacon") - 1
const EIP_1967_BEACON_SLOT: &str =
    "0xa3f0ad74e5423aebfd80d3ef4346578335a9a72aeaee59ff6cb3582b35133d50";

/// Implementation slot used by early upgradeable-proxy deployments that
/// predate EIP-1967
const LEGACY_IMPLEMENTATION_SLOT: &str =
    "0x7050c9e0f4ca769c69bd3a8ef740bc37934f8e2c036e5a723fd8ee048ed3f8c3";

/// EIP-1167 minimal proxy runtime bytecode prefix; the implementation
/// address is the 20 bytes that follow it
const MINIMAL_PROXY_PREFIX: [u8; 10] = [0x36, 0x3d, 0x3d, 0x37, 0x3d, 0x3d, 0x3d, 0x36, 0x3d, 0x73];

static IMPLEMENTATION_SLOT: Lazy<B256> =
    Lazy::new(|| B256::from_str(EIP_1967_LOGIC_SLOT).unwrap());
static BEACON_SLOT: Lazy<B256> = Lazy::new(|| B256::from_str(EIP_1967_BEACON_SLOT).unwrap());
static LEGACY_SLOT: Lazy<B256> =
    Lazy::new(|| B256::from_str(LEGACY_IMPLEMENTATION_SLOT).unwrap());

/// Classify an address as a known proxy pattern and resolve its implementation
///
/// Detection order, first match wins:
/// 1. EIP-1967 implementation slot → `eip1967`
/// 2. EIP-1967 beacon slot → `beacon` (resolving the implementation behind
///    the beacon is the beacon contract's concern, not this detector's)
/// 3. Legacy pre-EIP-1967 implementation slot → `eip1967`
/// 4. EIP-1167 minimal-proxy bytecode prefix → `minimal`
/// 5. Otherwise: not a proxy
pub async fn detect_proxy(reader: &dyn ChainReader, address: Address, chain: Chain) -> ProxyInfo {
    if let Some(implementation) = read_address_slot(reader, address, *IMPLEMENTATION_SLOT).await {
        return ProxyInfo {
            is_proxy: true,
            proxy_type: Some(ProxyType::Eip1967),
            implementation: Some(implementation),
            beacon: None,
        };
    }

    if let Some(beacon) = read_address_slot(reader, address, *BEACON_SLOT).await {
        return ProxyInfo {
            is_proxy: true,
            proxy_type: Some(ProxyType::Beacon),
            implementation: None,
            beacon: Some(beacon),
        };
    }

    if let Some(implementation) = read_address_slot(reader, address, *LEGACY_SLOT).await {
        return ProxyInfo {
            is_proxy: true,
            proxy_type: Some(ProxyType::Eip1967),
            implementation: Some(implementation),
            beacon: None,
        };
    }

    match reader.get_code(address, None).await {
        Ok(code) => {
            if let Some(implementation) = extract_minimal_proxy_target(&code) {
                return ProxyInfo {
                    is_proxy: true,
                    proxy_type: Some(ProxyType::Minimal),
                    implementation: Some(implementation),
                    beacon: None,
                };
            }
        }
        Err(err) => {
            debug!(target: "txsentry::proxy", %address, chain = %chain, %err, "bytecode read failed");
        }
    }

    ProxyInfo::none()
}

/// True iff the address has non-empty deployed bytecode
pub async fn is_contract(
    reader: &dyn ChainReader,
    address: Address,
) -> Result<bool, crate::errors::ProviderError> {
    let code = reader.get_code(address, None).await?;
    Ok(!code.is_empty())
}

/// Read a storage slot and interpret a nonzero value as an address
///
/// Addresses live in the last 20 bytes of the 32-byte slot. Read failures
/// are logged and treated as an empty slot.
async fn read_address_slot(
    reader: &dyn ChainReader,
    address: Address,
    slot: B256,
) -> Option<Address> {
    let value = match reader.get_storage_at(address, slot, None).await {
        Ok(value) => value,
        Err(err) => {
            debug!(target: "txsentry::proxy", %address, %slot, %err, "storage read failed");
            return None;
        }
    };
    if value == B256::ZERO {
        return None;
    }
    let resolved = Address::from_slice(&value.as_slice()[12..32]);
    if resolved == Address::ZERO {
        None
    } else {
        Some(resolved)
    }
}

/// Extract the implementation address from EIP-1167 clone bytecode
fn extract_minimal_proxy_target(code: &[u8]) -> Option<Address> {
    if code.len() < MINIMAL_PROXY_PREFIX.len() + 20 {
        return None;
    }
    if code[..MINIMAL_PROXY_PREFIX.len()] != MINIMAL_PROXY_PREFIX {
        return None;
    }
    let start = MINIMAL_PROXY_PREFIX.len();
    Some(Address::from_slice(&code[start..start + 20]))
}
