//! # Pre-Signature Transaction Risk Analysis
//!
//! A library for analyzing EVM contract addresses, pending transactions and
//! token approvals *before* the user signs, producing a structured risk
//! verdict with findings, confidence and a monotonic recommendation.
//!
//! ## Core Features
//!
//! - **Contract Analysis**
//!   - Verification, age and activity signals from injected providers
//!   - Proxy pattern detection (EIP-1967, beacon, legacy, EIP-1167)
//!   - Known-protocol and token-security matching
//!
//! - **Simulation Diffing**
//!   - Wallet balance deltas for the transaction's sender
//!   - Actual before/after allowance state per approval slot
//!   - Drainer-pattern heuristic over the combined diff
//!
//! - **Approval Analysis**
//!   - EOA, unverified, dangerous and newly-deployed spender checks
//!   - Typosquat detection against known legitimate spenders
//!   - Expected-spender mismatch (UI spoofing signature)
//!
//! The engine is advisory only: it never signs or submits transactions, and
//! final execution authority always remains with the caller. All external
//! data flows through the traits in [`traits`]; the engine itself performs
//! no network I/O.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use txsentry::{analyze, AnalyzerConfig, Chain, Providers};
//! use alloy::primitives::address;
//!
//! # async fn example(providers: Providers) -> anyhow::Result<()> {
//! let config = AnalyzerConfig::default();
//! let result = analyze(
//!     &providers,
//!     address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
//!     Chain::Ethereum,
//!     &config,
//! )
//! .await;
//!
//! println!("{:?}: {} findings", result.recommendation, result.findings.len());
//! for finding in &result.findings {
//!     println!("[{:?}] {}", finding.level, finding.message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `analyzer`: contract-analysis and full-scan orchestration
//! - `approval`: approval context analysis and typosquat detection
//! - `simulation`: log parsing, balance/approval diffing, verdict aggregation
//! - `heuristics`: drain-pattern detection over the simulation diff
//! - `proxy`: proxy pattern detection and implementation resolution
//! - `input`: boundary validation of scan requests
//! - `traits`: collaborator seams for chain state, providers and the simulator
//! - `types`: core data structures
//! - `errors`: error taxonomy

pub mod analyzer;
pub mod approval;
pub mod errors;
pub mod heuristics;
pub mod input;
pub mod proxy;
pub mod simulation;
pub mod traits;
pub mod types;

// Re-export only the essential types and entry points
pub use analyzer::{analyze, scan};
pub use approval::{analyze_approval, ApprovalContext, ApprovalRequest};
pub use input::{parse_scan_input, CalldataInput, ScanInput};
pub use proxy::{detect_proxy, is_contract};
pub use simulation::verdict::apply_simulation_verdict;
pub use traits::Providers;
pub use types::{
    AnalysisResult, AnalyzerConfig, ApprovalAnalysisResult, Chain, Confidence, Finding,
    Recommendation,
};
