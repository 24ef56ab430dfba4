//! Collaborator seams for chain state, metadata providers and the simulator
//!
//! The engine never talks to an RPC endpoint or an explorer API directly.
//! Every external data source sits behind one of the traits in this module,
//! injected through [`Providers`]:
//!
//! - [`ChainReader`]: typed reads of on-chain state, block-pinnable for
//!   before/after diffing
//! - [`MetadataProvider`]: contract verification, age and activity data
//! - [`TokenSecurityProvider`]: token-level risk database
//! - [`ProtocolRegistry`]: known-protocol matching
//! - [`TransactionSimulator`]: executes a pending transaction against a fork
//!   and returns its logs and block range
//!
//! Raw provider payloads are decoded *behind* these traits; the core only
//! ever sees the typed shapes defined here. Every method can fail
//! independently, and every caller in the core treats a failure as "data
//! unavailable": it degrades confidence or falls back, it never aborts the
//! analysis.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, Log, B256, U256};
use async_trait::async_trait;
use serde::Serialize;

use crate::errors::ProviderError;
use crate::input::Authorization;
use crate::types::Chain;

/// Typed, block-pinnable reads of on-chain state
///
/// `block: None` means latest. Implementations must honor explicit block
/// numbers; the approval-diff and delta engines rely on them for
/// before/after comparisons.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Raw storage slot read
    async fn get_storage_at(
        &self,
        address: Address,
        slot: B256,
        block: Option<u64>,
    ) -> Result<B256, ProviderError>;

    /// Deployed runtime bytecode (empty for EOAs)
    async fn get_code(&self, address: Address, block: Option<u64>) -> Result<Bytes, ProviderError>;

    /// Native currency balance in wei
    async fn get_balance(
        &self,
        address: Address,
        block: Option<u64>,
    ) -> Result<U256, ProviderError>;

    /// ERC-20 `balanceOf(owner)`
    async fn erc20_balance_of(
        &self,
        token: Address,
        owner: Address,
        block: Option<u64>,
    ) -> Result<U256, ProviderError>;

    /// ERC-20 `allowance(owner, spender)`
    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        block: Option<u64>,
    ) -> Result<U256, ProviderError>;

    /// ERC-721 `getApproved(tokenId)`
    async fn erc721_get_approved(
        &self,
        token: Address,
        token_id: U256,
        block: Option<u64>,
    ) -> Result<Address, ProviderError>;

    /// ERC-721/1155 `isApprovedForAll(owner, operator)`
    async fn is_approved_for_all(
        &self,
        token: Address,
        owner: Address,
        operator: Address,
        block: Option<u64>,
    ) -> Result<bool, ProviderError>;

    /// Permit2 `allowance(owner, token, spender)`
    ///
    /// Returns the full `(amount, expiration, nonce)` tuple; the diff engine
    /// consumes only the amount component.
    async fn permit2_allowance(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        block: Option<u64>,
    ) -> Result<(U256, u64, u64), ProviderError>;
}

/// Contract metadata merged from explorer and verification sources
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContractMetadata {
    pub verified: bool,
    pub name: Option<String>,
    pub source: Option<String>,
    pub age_days: Option<u64>,
    pub tx_count: Option<u64>,
}

/// Verification, age and activity data per (address, chain)
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// `Ok(None)` means the provider answered definitively with "unknown
    /// contract"; errors mean the provider could not answer at all.
    async fn contract_metadata(
        &self,
        address: Address,
        chain: Chain,
    ) -> Result<Option<ContractMetadata>, ProviderError>;
}

/// Token-level security attributes from a token-security database
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenSecurity {
    pub is_honeypot: bool,
    pub is_mintable: bool,
    pub selfdestruct: bool,
    pub is_blacklisted: bool,
    pub owner_can_change_balance: bool,
    pub buy_tax: Option<f64>,
    pub sell_tax: Option<f64>,
}

/// Token security lookups; `Ok(None)` when the address is not a token
#[async_trait]
pub trait TokenSecurityProvider: Send + Sync {
    async fn token_security(
        &self,
        address: Address,
        chain: Chain,
    ) -> Result<Option<TokenSecurity>, ProviderError>;
}

/// A recognized protocol deployment
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolMatch {
    pub name: String,
    pub tvl: Option<f64>,
}

/// Known-protocol matching by address per chain
#[async_trait]
pub trait ProtocolRegistry: Send + Sync {
    async fn match_protocol(
        &self,
        address: Address,
        chain: Chain,
    ) -> Result<Option<ProtocolMatch>, ProviderError>;
}

/// A pending transaction handed to the simulator
///
/// The EIP-7702 authorization list is passed through untouched; the engine
/// validates entries at the input boundary but never interprets them.
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    pub to: Address,
    pub from: Address,
    pub data: Bytes,
    pub value: U256,
    pub chain: Chain,
    pub authorization_list: Vec<Authorization>,
}

/// Outcome of asking the simulator to execute a pending transaction
#[derive(Debug, Clone)]
pub enum SimulatedTransaction {
    /// The local simulation backend is unavailable or misconfigured
    NotRun { reason: String },
    /// The transaction was executed against a fork
    Executed {
        success: bool,
        revert_reason: Option<String>,
        logs: Vec<Log>,
        /// Fork state immediately before the transaction
        before_block: u64,
        /// Fork state immediately after the transaction
        after_block: u64,
    },
}

/// Executes a pending transaction against forked chain state
#[async_trait]
pub trait TransactionSimulator: Send + Sync {
    async fn simulate(
        &self,
        request: &SimulationRequest,
    ) -> Result<SimulatedTransaction, ProviderError>;
}

/// Injected bundle of collaborator handles
///
/// Held by value per request; there is no module-level provider state in the
/// core, so tests inject mocks and production wires real clients.
#[derive(Clone)]
pub struct Providers {
    pub chain: Arc<dyn ChainReader>,
    pub metadata: Arc<dyn MetadataProvider>,
    pub token_security: Arc<dyn TokenSecurityProvider>,
    pub protocols: Arc<dyn ProtocolRegistry>,
    pub simulator: Arc<dyn TransactionSimulator>,
}
