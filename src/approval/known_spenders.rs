//! Curated per-chain table of known, legitimate spender contracts
//!
//! Broad approvals to these addresses are routine wallet activity (router
//! and marketplace flows); the drainer heuristic suppresses its
//! broad-approval signal for them, and the typosquat check uses them as the
//! reference set an attacker would imitate.
//!
//! Entries are canonical public deployments. Permit2, the 0x exchange proxy
//! and the 1inch router are same-address deployments across chains.

use alloy::primitives::{address, Address};
use once_cell::sync::Lazy;

use crate::types::Chain;

/// A known legitimate spender
#[derive(Debug, Clone, Copy)]
pub struct KnownSpender {
    pub name: &'static str,
    pub address: Address,
}

const PERMIT2: KnownSpender = KnownSpender {
    name: "Permit2",
    address: address!("000000000022D473030F116dDEE9F6B43aC78BA3"),
};

const ZEROX_EXCHANGE_PROXY: KnownSpender = KnownSpender {
    name: "0x Exchange Proxy",
    address: address!("Def1C0ded9bec7F1a1670819833240f027b25EfF"),
};

const ONEINCH_ROUTER_V5: KnownSpender = KnownSpender {
    name: "1inch Router v5",
    address: address!("1111111254EEB25477B68fb85Ed929f73A960582"),
};

const SEAPORT_1_5: KnownSpender = KnownSpender {
    name: "Seaport 1.5",
    address: address!("00000000000000ADc04C56Bf30aC9d3c0aAF14dC"),
};

static ETHEREUM_SPENDERS: Lazy<Vec<KnownSpender>> = Lazy::new(|| {
    vec![
        KnownSpender {
            name: "Uniswap V2 Router",
            address: address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
        },
        KnownSpender {
            name: "Uniswap V3 Router",
            address: address!("E592427A0AEce92De3Edee1F18E0157C05861564"),
        },
        KnownSpender {
            name: "Uniswap Universal Router",
            address: address!("3fC91A3afd70395Cd496C647d5a6CC9D4B2b7FAD"),
        },
        PERMIT2,
        ZEROX_EXCHANGE_PROXY,
        ONEINCH_ROUTER_V5,
        SEAPORT_1_5,
    ]
});

static BASE_SPENDERS: Lazy<Vec<KnownSpender>> = Lazy::new(|| {
    vec![
        KnownSpender {
            name: "Uniswap Universal Router",
            address: address!("198EF79F1F515F02dFE9e3115eD9fC07183f02fC"),
        },
        PERMIT2,
        ZEROX_EXCHANGE_PROXY,
        ONEINCH_ROUTER_V5,
        SEAPORT_1_5,
    ]
});

static ARBITRUM_SPENDERS: Lazy<Vec<KnownSpender>> = Lazy::new(|| {
    vec![
        KnownSpender {
            name: "Uniswap V3 Router",
            address: address!("E592427A0AEce92De3Edee1F18E0157C05861564"),
        },
        PERMIT2,
        ZEROX_EXCHANGE_PROXY,
        ONEINCH_ROUTER_V5,
        SEAPORT_1_5,
    ]
});

static OPTIMISM_SPENDERS: Lazy<Vec<KnownSpender>> = Lazy::new(|| {
    vec![
        KnownSpender {
            name: "Uniswap V3 Router",
            address: address!("E592427A0AEce92De3Edee1F18E0157C05861564"),
        },
        PERMIT2,
        ZEROX_EXCHANGE_PROXY,
        ONEINCH_ROUTER_V5,
        SEAPORT_1_5,
    ]
});

static POLYGON_SPENDERS: Lazy<Vec<KnownSpender>> = Lazy::new(|| {
    vec![
        KnownSpender {
            name: "QuickSwap Router",
            address: address!("a5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff"),
        },
        PERMIT2,
        ZEROX_EXCHANGE_PROXY,
        ONEINCH_ROUTER_V5,
        SEAPORT_1_5,
    ]
});

/// The known-spender set for one chain
pub fn known_spenders(chain: Chain) -> &'static [KnownSpender] {
    match chain {
        Chain::Ethereum => &ETHEREUM_SPENDERS,
        Chain::Base => &BASE_SPENDERS,
        Chain::Arbitrum => &ARBITRUM_SPENDERS,
        Chain::Optimism => &OPTIMISM_SPENDERS,
        Chain::Polygon => &POLYGON_SPENDERS,
    }
}

/// True when `spender` is in the chain's known-spender table
pub fn is_known_spender(chain: Chain, spender: Address) -> bool {
    known_spenders(chain)
        .iter()
        .any(|entry| entry.address == spender)
}
