//! Post-simulation diffing of a pending transaction
//!
//! The simulator (an external collaborator behind
//! [`TransactionSimulator`](crate::traits::TransactionSimulator)) executes
//! the pending transaction against a fork and hands back its event logs and
//! the block numbers bracketing the execution. The modules here turn that
//! immutable snapshot into a verdict:
//!
//! - [`logs`]: decode Transfer/Approval events into typed records
//! - [`delta`]: net asset movement for the transaction's sender
//! - [`approval_diffs`]: actual before/after allowance state per permission slot
//! - [`verdict`]: merge findings, simulation outcome and heuristic floors
//!   into the final recommendation

pub mod approval_diffs;
pub mod delta;
pub mod logs;
pub mod verdict;

use alloy::primitives::{address, Address};

/// Canonical Permit2 deployment, shared across chains
///
/// Permit2 allowances are recorded against (owner, token, spender) inside
/// this contract rather than in per-token state.
pub const PERMIT2_ADDRESS: Address = address!("000000000022D473030F116dDEE9F6B43aC78BA3");

/// The block numbers bracketing one simulated transaction
#[derive(Debug, Clone, Copy)]
pub struct BlockRange {
    pub before: u64,
    pub after: u64,
}
