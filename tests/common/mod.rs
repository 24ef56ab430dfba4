//! Shared mock providers for integration tests
//!
//! The mocks are map-driven: tests preload the exact reads they expect and
//! anything not preloaded behaves like the real world's unhappy path
//! (empty code for unknown addresses, an error for unpreloaded allowance
//! reads). That makes failure injection free: leave the key out.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use txsentry::errors::ProviderError;
use txsentry::traits::{
    ChainReader, ContractMetadata, MetadataProvider, ProtocolMatch, ProtocolRegistry, Providers,
    SimulatedTransaction, SimulationRequest, TokenSecurity, TokenSecurityProvider,
    TransactionSimulator,
};
use txsentry::types::Chain;

fn missing(what: &str) -> ProviderError {
    ProviderError::ChainRead(format!("missing mock for {what}"))
}

#[derive(Default)]
pub struct MockChainReader {
    pub storage: HashMap<(Address, B256), B256>,
    pub code: HashMap<Address, Bytes>,
    /// (address, block) -> wei; missing keys read as zero
    pub native_balance: HashMap<(Address, Option<u64>), U256>,
    pub fail_native: HashSet<Address>,
    /// (token, owner, block)
    pub erc20_balance: HashMap<(Address, Address, Option<u64>), U256>,
    /// (token, owner, spender, block)
    pub erc20_allowance: HashMap<(Address, Address, Address, Option<u64>), U256>,
    /// (token, token_id, block)
    pub erc721_approved: HashMap<(Address, U256, Option<u64>), Address>,
    /// (token, owner, operator, block)
    pub operator_approval: HashMap<(Address, Address, Address, Option<u64>), bool>,
    /// (owner, token, spender, block)
    pub permit2_allowance: HashMap<(Address, Address, Address, Option<u64>), (U256, u64, u64)>,
}

impl MockChainReader {
    pub fn with_contract(mut self, address: Address) -> Self {
        self.code.insert(address, Bytes::from(vec![0x60, 0x80]));
        self
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn get_storage_at(
        &self,
        address: Address,
        slot: B256,
        _block: Option<u64>,
    ) -> Result<B256, ProviderError> {
        Ok(self
            .storage
            .get(&(address, slot))
            .copied()
            .unwrap_or(B256::ZERO))
    }

    async fn get_code(
        &self,
        address: Address,
        _block: Option<u64>,
    ) -> Result<Bytes, ProviderError> {
        Ok(self.code.get(&address).cloned().unwrap_or_default())
    }

    async fn get_balance(
        &self,
        address: Address,
        block: Option<u64>,
    ) -> Result<U256, ProviderError> {
        if self.fail_native.contains(&address) {
            return Err(missing("native balance"));
        }
        Ok(self
            .native_balance
            .get(&(address, block))
            .copied()
            .unwrap_or_default())
    }

    async fn erc20_balance_of(
        &self,
        token: Address,
        owner: Address,
        block: Option<u64>,
    ) -> Result<U256, ProviderError> {
        self.erc20_balance
            .get(&(token, owner, block))
            .copied()
            .ok_or_else(|| missing("erc20 balance"))
    }

    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        block: Option<u64>,
    ) -> Result<U256, ProviderError> {
        self.erc20_allowance
            .get(&(token, owner, spender, block))
            .copied()
            .ok_or_else(|| missing("erc20 allowance"))
    }

    async fn erc721_get_approved(
        &self,
        token: Address,
        token_id: U256,
        block: Option<u64>,
    ) -> Result<Address, ProviderError> {
        self.erc721_approved
            .get(&(token, token_id, block))
            .copied()
            .ok_or_else(|| missing("erc721 getApproved"))
    }

    async fn is_approved_for_all(
        &self,
        token: Address,
        owner: Address,
        operator: Address,
        block: Option<u64>,
    ) -> Result<bool, ProviderError> {
        self.operator_approval
            .get(&(token, owner, operator, block))
            .copied()
            .ok_or_else(|| missing("isApprovedForAll"))
    }

    async fn permit2_allowance(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        block: Option<u64>,
    ) -> Result<(U256, u64, u64), ProviderError> {
        self.permit2_allowance
            .get(&(owner, token, spender, block))
            .copied()
            .ok_or_else(|| missing("permit2 allowance"))
    }
}

#[derive(Default)]
pub struct MockMetadataProvider {
    pub metadata: HashMap<Address, ContractMetadata>,
    pub fail: bool,
}

#[async_trait]
impl MetadataProvider for MockMetadataProvider {
    async fn contract_metadata(
        &self,
        address: Address,
        _chain: Chain,
    ) -> Result<Option<ContractMetadata>, ProviderError> {
        if self.fail {
            return Err(ProviderError::Upstream {
                provider: "mock-metadata".to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(self.metadata.get(&address).cloned())
    }
}

#[derive(Default)]
pub struct MockTokenSecurityProvider {
    pub security: HashMap<Address, TokenSecurity>,
}

#[async_trait]
impl TokenSecurityProvider for MockTokenSecurityProvider {
    async fn token_security(
        &self,
        address: Address,
        _chain: Chain,
    ) -> Result<Option<TokenSecurity>, ProviderError> {
        Ok(self.security.get(&address).cloned())
    }
}

#[derive(Default)]
pub struct MockProtocolRegistry {
    pub protocols: HashMap<Address, ProtocolMatch>,
}

#[async_trait]
impl ProtocolRegistry for MockProtocolRegistry {
    async fn match_protocol(
        &self,
        address: Address,
        _chain: Chain,
    ) -> Result<Option<ProtocolMatch>, ProviderError> {
        Ok(self.protocols.get(&address).cloned())
    }
}

pub struct MockSimulator {
    pub response: SimulatedTransaction,
}

impl Default for MockSimulator {
    fn default() -> Self {
        Self {
            response: SimulatedTransaction::NotRun {
                reason: "Local simulation backend not configured. Install Foundry (Anvil not found).".to_string(),
            },
        }
    }
}

#[async_trait]
impl TransactionSimulator for MockSimulator {
    async fn simulate(
        &self,
        _request: &SimulationRequest,
    ) -> Result<SimulatedTransaction, ProviderError> {
        Ok(self.response.clone())
    }
}

/// Assemble a provider bundle from mock parts
pub fn providers_with(
    chain: MockChainReader,
    metadata: MockMetadataProvider,
    simulator: MockSimulator,
) -> Providers {
    Providers {
        chain: Arc::new(chain),
        metadata: Arc::new(metadata),
        token_security: Arc::new(MockTokenSecurityProvider::default()),
        protocols: Arc::new(MockProtocolRegistry::default()),
        simulator: Arc::new(simulator),
    }
}

/// Metadata for a verified, established contract
pub fn verified_metadata(name: &str) -> ContractMetadata {
    ContractMetadata {
        verified: true,
        name: Some(name.to_string()),
        source: Some("// contract source".to_string()),
        age_days: Some(900),
        tx_count: Some(1_000_000),
    }
}
