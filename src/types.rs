//! Core types for transaction and approval risk analysis
//!
//! This module defines the core data structures used throughout the analysis
//! engine:
//! - Findings, confidence and the recommendation lattice
//! - Contract metadata and proxy classification
//! - Asset and approval changes derived from simulated transactions
//! - Simulation and analysis result aggregates

use std::fmt;
use std::str::FromStr;

pub use alloy::primitives::{Address, Bytes, Log, B256, I256, U256};
use serde::Serialize;

/// Maximum representable 256-bit unsigned value, the canonical
/// "unlimited allowance" sentinel used by wallets and routers.
pub const MAX_UINT256: U256 = U256::MAX;

/// Supported EVM-compatible chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Base,
    Arbitrum,
    Optimism,
    Polygon,
}

impl Chain {
    /// Numeric chain ID for the network
    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Base => 8453,
            Chain::Arbitrum => 42161,
            Chain::Optimism => 10,
            Chain::Polygon => 137,
        }
    }

    /// Symbol of the chain's native currency
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Ethereum | Chain::Base | Chain::Arbitrum | Chain::Optimism => "ETH",
            Chain::Polygon => "POL",
        }
    }

    /// Resolve a chain from its numeric ID
    pub fn from_chain_id(id: u64) -> Option<Chain> {
        match id {
            1 => Some(Chain::Ethereum),
            8453 => Some(Chain::Base),
            42161 => Some(Chain::Arbitrum),
            10 => Some(Chain::Optimism),
            137 => Some(Chain::Polygon),
            _ => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Polygon => "polygon",
        };
        f.write_str(name)
    }
}

impl FromStr for Chain {
    type Err = crate::errors::InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" | "mainnet" | "1" => Ok(Chain::Ethereum),
            "base" | "8453" => Ok(Chain::Base),
            "arbitrum" | "42161" => Ok(Chain::Arbitrum),
            "optimism" | "10" => Ok(Chain::Optimism),
            "polygon" | "137" => Ok(Chain::Polygon),
            other => Err(crate::errors::InputError::UnknownChain(other.to_string())),
        }
    }
}

/// Severity of a single finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingLevel {
    Danger,
    Warning,
    Info,
    Safe,
}

/// Closed set of finding codes emitted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCode {
    // Contract analysis
    Unverified,
    Verified,
    KnownProtocol,
    Upgradeable,
    NewContract,
    LowActivity,
    Honeypot,
    HiddenMint,
    Selfdestruct,
    OwnerDrain,
    Blacklist,
    HighTax,
    // Approval analysis
    UnlimitedApproval,
    ApprovalToEoa,
    ApprovalTargetMismatch,
    ApprovalToUnverified,
    ApprovalToDangerousContract,
    ApprovalToNewContract,
    PossibleTyposquat,
    // Simulation
    DrainerLikeSimulation,
    SimulationNotRun,
    Eip7702Authorization,
}

/// A single analysis observation
///
/// Findings are append-only: once emitted into a result they are never
/// mutated or removed.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub level: FindingLevel,
    pub code: FindingCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,
}

impl Finding {
    /// Build a finding with no details or references
    pub fn new(level: FindingLevel, code: FindingCode, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            message: message.into(),
            details: None,
            refs: Vec::new(),
        }
    }

    /// Attach structured details to the finding
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Final advisory recommendation, totally ordered: `Ok < Caution < Warning < Danger`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Ok,
    Caution,
    Warning,
    Danger,
}

impl Recommendation {
    /// Raise the recommendation to at least `floor`
    ///
    /// This is the single monotonic-severity primitive: a recommendation is
    /// only ever raised within one analysis pass, never lowered.
    pub fn bump(self, floor: Recommendation) -> Recommendation {
        if floor > self {
            floor
        } else {
            self
        }
    }
}

/// Engine's self-assessed certainty in its own verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// Confidence with the reasons it was degraded
#[derive(Debug, Clone, Serialize)]
pub struct Confidence {
    pub level: ConfidenceLevel,
    pub reasons: Vec<String>,
}

impl Confidence {
    /// Full confidence with no caveats
    pub fn high() -> Self {
        Self {
            level: ConfidenceLevel::High,
            reasons: Vec::new(),
        }
    }

    /// Lower confidence to `level`, recording why
    ///
    /// Downgrades are monotonic within one analysis: if the current level is
    /// already at or below `level`, only the reason is recorded.
    pub fn downgrade(&mut self, level: ConfidenceLevel, reason: impl Into<String>) {
        if level < self.level {
            self.level = level;
        }
        self.reasons.push(reason.into());
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::high()
    }
}

/// Known proxy patterns the detector can classify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    /// EIP-1967 implementation slot (also covers the legacy pre-1967 layout)
    Eip1967,
    /// EIP-1967 beacon proxy; the implementation lives behind the beacon
    Beacon,
    /// EIP-1167 minimal proxy (clone)
    Minimal,
}

/// Result of proxy pattern detection for one address
#[derive(Debug, Clone, Serialize)]
pub struct ProxyInfo {
    pub is_proxy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_type: Option<ProxyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beacon: Option<Address>,
}

impl ProxyInfo {
    /// The "not a proxy" result
    pub fn none() -> Self {
        Self {
            is_proxy: false,
            proxy_type: None,
            implementation: None,
            beacon: None,
        }
    }
}

/// Merged contract metadata for the analyzed address
///
/// Created once per analysis from the provider responses and never mutated
/// after construction.
#[derive(Debug, Clone, Serialize)]
pub struct ContractInfo {
    pub address: Address,
    pub chain: Chain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_days: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_count: Option<u64>,
    pub is_proxy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beacon: Option<Address>,
}

/// Asset class of a balance change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Native,
    Erc20,
    Erc721,
    Erc1155,
}

/// Direction of a balance change relative to the analyzed actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

/// Net asset movement for the analyzed actor within one simulated transaction
///
/// One record per distinct asset with nonzero net movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetChange {
    pub asset_type: AssetType,
    /// Token contract address; absent for the native currency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Absolute magnitude of the net movement
    pub amount: U256,
    pub direction: Direction,
    /// The single other party, when every transfer of this asset named the
    /// same one; ambiguous flows carry no counterparty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<Address>,
}

/// NFT standard discriminant for operator-wide approvals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NftStandard {
    Erc721,
    Erc1155,
}

/// An observed allowance change, typed over (standard, scope)
///
/// Previous-state fields are optional because the fallback path emits
/// event-derived changes for which the before value could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "standard", rename_all = "lowercase")]
pub enum ApprovalChange {
    Erc20 {
        token: Address,
        owner: Address,
        spender: Address,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous_amount: Option<U256>,
        amount: U256,
    },
    Permit2 {
        token: Address,
        owner: Address,
        spender: Address,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous_amount: Option<U256>,
        amount: U256,
    },
    /// ERC-721 single-token approve; the spender is the newly approved address
    #[serde(rename = "erc721")]
    Erc721Token {
        token: Address,
        owner: Address,
        spender: Address,
        token_id: U256,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous_spender: Option<Address>,
    },
    /// ApprovalForAll / operator approval over an entire collection
    #[serde(rename = "operator")]
    OperatorAll {
        nft_standard: NftStandard,
        token: Address,
        owner: Address,
        operator: Address,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous_approved: Option<bool>,
        approved: bool,
    },
}

impl ApprovalChange {
    /// Token contract the permission is scoped to
    pub fn token(&self) -> Address {
        match self {
            ApprovalChange::Erc20 { token, .. }
            | ApprovalChange::Permit2 { token, .. }
            | ApprovalChange::Erc721Token { token, .. }
            | ApprovalChange::OperatorAll { token, .. } => *token,
        }
    }

    /// The address granted the permission
    pub fn spender(&self) -> Address {
        match self {
            ApprovalChange::Erc20 { spender, .. }
            | ApprovalChange::Permit2 { spender, .. }
            | ApprovalChange::Erc721Token { spender, .. } => *spender,
            ApprovalChange::OperatorAll { operator, .. } => *operator,
        }
    }

    /// Standard tag used in dedup keys and diagnostics
    pub fn standard_tag(&self) -> &'static str {
        match self {
            ApprovalChange::Erc20 { .. } => "erc20",
            ApprovalChange::Permit2 { .. } => "permit2",
            ApprovalChange::Erc721Token { .. } => "erc721",
            ApprovalChange::OperatorAll { nft_standard, .. } => match nft_standard {
                NftStandard::Erc721 => "erc721",
                NftStandard::Erc1155 => "erc1155",
            },
        }
    }

    /// Scope tag: `token` for single-asset permissions, `all` for operator approvals
    pub fn scope_tag(&self) -> &'static str {
        match self {
            ApprovalChange::OperatorAll { .. } => "all",
            _ => "token",
        }
    }

    /// Whether the new state grants broad spend rights: an unlimited ERC-20
    /// allowance or an operator approval being turned on
    pub fn is_broad(&self) -> bool {
        match self {
            ApprovalChange::Erc20 { amount, .. } => *amount == MAX_UINT256,
            ApprovalChange::OperatorAll { approved, .. } => *approved,
            _ => false,
        }
    }
}

/// Result of simulating the pending transaction and diffing its effects
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    /// Signed net native-currency movement for the sender (wei)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_diff: Option<I256>,
    pub asset_changes: Vec<AssetChange>,
    pub approvals: Vec<ApprovalChange>,
    pub confidence: ConfidenceLevel,
    pub notes: Vec<String>,
}

impl SimulationResult {
    /// A "simulation not run" result with an explanatory note
    pub fn not_run(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            revert_reason: Some("Simulation not run".to_string()),
            native_diff: None,
            asset_changes: Vec::new(),
            approvals: Vec::new(),
            confidence: ConfidenceLevel::Low,
            notes: vec![reason.into()],
        }
    }
}

/// The root aggregate returned to callers
///
/// Fully constructed before any caller observes it; no partial verdicts are
/// ever streamed.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub contract: ContractInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub findings: Vec<Finding>,
    pub confidence: Confidence,
    pub recommendation: Recommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationResult>,
}

/// Policy constants for the analysis engine
///
/// These are tunable thresholds, not invariants; the defaults match the
/// values the engine ships with.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Contracts younger than this many days are flagged as new
    pub new_contract_age_days: u64,
    /// Contracts with fewer transactions than this are flagged as low activity
    pub low_activity_tx_count: u64,
    /// Buy/sell tax fraction above which a token is flagged
    pub high_tax_threshold: f64,
    /// Cap on distinct ERC-20 tokens the delta engine reads balances for
    pub max_delta_tokens: usize,
    /// Native outflow at or above this many wei counts as a near-total drain
    pub native_outflow_threshold_wei: U256,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            new_contract_age_days: 7,
            low_activity_tx_count: 100,
            high_tax_threshold: 0.1,
            max_delta_tokens: 10,
            native_outflow_threshold_wei: U256::from(9_000u64)
                * U256::from(10u64).pow(U256::from(18u64)),
        }
    }
}

/// Boolean mirror of every approval check, for programmatic consumers
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApprovalFlags {
    pub is_unlimited: bool,
    pub spender_is_eoa: bool,
    pub target_mismatch: bool,
    pub spender_unverified: bool,
    pub spender_dangerous: bool,
    pub spender_new: bool,
    pub possible_typosquat: bool,
}

/// Result of analyzing a single proposed allowance change
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalAnalysisResult {
    pub flags: ApprovalFlags,
    pub findings: Vec<Finding>,
    pub recommendation: Recommendation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_bump_is_monotonic() {
        assert_eq!(
            Recommendation::Ok.bump(Recommendation::Caution),
            Recommendation::Caution
        );
        assert_eq!(
            Recommendation::Danger.bump(Recommendation::Caution),
            Recommendation::Danger
        );
        assert_eq!(
            Recommendation::Warning.bump(Recommendation::Warning),
            Recommendation::Warning
        );
    }

    #[test]
    fn confidence_never_upgrades() {
        let mut confidence = Confidence::high();
        confidence.downgrade(ConfidenceLevel::Low, "slot read failed");
        confidence.downgrade(ConfidenceLevel::Medium, "missing metadata");
        assert_eq!(confidence.level, ConfidenceLevel::Low);
        assert_eq!(confidence.reasons.len(), 2);
    }

    #[test]
    fn broad_approval_classification() {
        let unlimited = ApprovalChange::Erc20 {
            token: Address::ZERO,
            owner: Address::ZERO,
            spender: Address::ZERO,
            previous_amount: None,
            amount: MAX_UINT256,
        };
        assert!(unlimited.is_broad());

        let bounded = ApprovalChange::Erc20 {
            token: Address::ZERO,
            owner: Address::ZERO,
            spender: Address::ZERO,
            previous_amount: None,
            amount: U256::from(500u64),
        };
        assert!(!bounded.is_broad());

        let operator = ApprovalChange::OperatorAll {
            nft_standard: NftStandard::Erc721,
            token: Address::ZERO,
            owner: Address::ZERO,
            operator: Address::ZERO,
            previous_approved: Some(false),
            approved: true,
        };
        assert!(operator.is_broad());
    }
}
