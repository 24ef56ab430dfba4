//! Error types for the risk-analysis engine
//!
//! The taxonomy follows the engine's degradation policy:
//! - Provider/chain-read failures are *data unavailable*: callers degrade
//!   confidence or fall back to last-known data, they never abort an analysis
//! - Structurally invalid input is rejected at the boundary, before any
//!   analysis starts, and is never surfaced as a risk finding

use thiserror::Error;

/// Top-level error type for the analysis engine
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Structurally invalid request, rejected at the boundary
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// External collaborator failure that could not be degraded around
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Boundary-validation errors for scan requests
///
/// These never become findings: a malformed request is a caller bug, not a
/// property of the contract under analysis.
#[derive(Debug, Error)]
pub enum InputError {
    /// Address is not 20 hex-encoded bytes
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Calldata is not a 0x-prefixed hex string
    #[error("Invalid hex data: {0}")]
    InvalidHexData(String),

    /// Transaction value is neither decimal nor 0x-hex numeric
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Chain name or ID not recognized
    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    /// A request must carry exactly one of address or calldata
    #[error("Provide either address or calldata")]
    AmbiguousInput,
}

/// Failures from external collaborators (chain reads, metadata providers,
/// the simulator)
///
/// All of these are non-fatal to the overall analysis: each component
/// exhausts its own fallback before returning.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Errors reading account or storage state
    #[error("Chain read failed: {0}")]
    ChainRead(String),

    /// A typed contract call failed or returned undecodable data
    #[error("Contract call failed for {address}: {reason}")]
    ContractCall { address: String, reason: String },

    /// Metadata/security/registry provider failure
    #[error("Provider {provider} failed: {reason}")]
    Upstream { provider: String, reason: String },

    /// The read exceeded the caller's timeout policy
    #[error("Read timed out: {0}")]
    Timeout(String),
}
