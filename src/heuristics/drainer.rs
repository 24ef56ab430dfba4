//! Drainer-pattern heuristic
//!
//! The canonical drainer fingerprint is a transaction that simultaneously
//! grants broad spend rights to an unknown party and moves most of the
//! wallet's value out. This heuristic scans the combined simulation diff
//! (balance changes plus approval changes) for those two signal families
//! and produces a recommendation *floor* — a lower bound the verdict
//! aggregator applies through the monotonic bump, never a downgrade.

use std::collections::HashSet;

use alloy::primitives::Address;

use crate::approval::known_spenders::is_known_spender;
use crate::types::{
    AnalysisResult, AnalyzerConfig, ApprovalChange, AssetType, Chain, Direction, Recommendation,
    SimulationResult,
};

/// Floor and reasoning produced by the heuristic
#[derive(Debug, Clone)]
pub struct DrainerHeuristicResult {
    pub recommendation_floor: Option<Recommendation>,
    pub reasons: Vec<String>,
}

impl DrainerHeuristicResult {
    fn none() -> Self {
        Self {
            recommendation_floor: None,
            reasons: Vec::new(),
        }
    }
}

/// Scan a completed analysis for drain signatures
///
/// No-op when no simulation ran or it did not succeed. Any single signal
/// floors the recommendation at `Caution`; an unknown broad approval
/// co-occurring with a large outflow floors it at `Warning`.
pub fn evaluate_drainer_heuristic(
    analysis: &AnalysisResult,
    config: &AnalyzerConfig,
) -> DrainerHeuristicResult {
    let Some(simulation) = analysis.simulation.as_ref() else {
        return DrainerHeuristicResult::none();
    };
    if !simulation.success {
        return DrainerHeuristicResult::none();
    }

    let chain = analysis.contract.chain;
    let approval_reasons = unknown_broad_approval_reasons(&simulation.approvals, chain);
    let outflow_reasons = large_outflow_reasons(simulation, config);

    let has_unknown_broad_approval = !approval_reasons.is_empty();
    let has_large_outflow = !outflow_reasons.is_empty();

    let mut reasons = approval_reasons;
    reasons.extend(outflow_reasons);
    if reasons.is_empty() {
        return DrainerHeuristicResult::none();
    }

    let recommendation_floor = if has_unknown_broad_approval && has_large_outflow {
        Recommendation::Warning
    } else {
        Recommendation::Caution
    };

    DrainerHeuristicResult {
        recommendation_floor: Some(recommendation_floor),
        reasons,
    }
}

/// Broad approvals granted to spenders outside the known-good table
///
/// Deduplicated by (standard, token, spender, scope) so repeated diffs of
/// the same permission produce one reason.
fn unknown_broad_approval_reasons(approvals: &[ApprovalChange], chain: Chain) -> Vec<String> {
    let mut reasons = Vec::new();
    let mut seen: HashSet<(&'static str, Address, Address, &'static str)> = HashSet::new();

    for approval in approvals {
        if !approval.is_broad() {
            continue;
        }
        let spender = approval.spender();
        if is_known_spender(chain, spender) {
            continue;
        }
        let key = (
            approval.standard_tag(),
            approval.token(),
            spender,
            approval.scope_tag(),
        );
        if !seen.insert(key) {
            continue;
        }

        if matches!(approval, ApprovalChange::OperatorAll { .. }) {
            reasons.push(format!(
                "Simulation: broad NFT approval (ApprovalForAll) to unknown operator {} for {}.",
                spender,
                approval.token()
            ));
        } else {
            reasons.push(format!(
                "Simulation: unlimited token approval to unknown spender {} for {}.",
                spender,
                approval.token()
            ));
        }
    }

    reasons
}

/// Near-total native outflow, or outflows across several ERC-20 tokens
fn large_outflow_reasons(simulation: &SimulationResult, config: &AnalyzerConfig) -> Vec<String> {
    let mut reasons = Vec::new();

    if let Some(native_diff) = simulation.native_diff {
        if native_diff.is_negative() {
            let outflow = native_diff.unsigned_abs();
            if outflow >= config.native_outflow_threshold_wei {
                reasons.push(format!(
                    "Simulation: near-total native currency outflow detected ({outflow} wei)."
                ));
            }
        }
    }

    let out_tokens: HashSet<Address> = simulation
        .asset_changes
        .iter()
        .filter(|change| change.asset_type == AssetType::Erc20)
        .filter(|change| change.direction == Direction::Out)
        .filter(|change| !change.amount.is_zero())
        .filter_map(|change| change.address)
        .collect();
    if out_tokens.len() >= 2 {
        reasons.push(format!(
            "Simulation: multiple ERC-20 outflows detected ({} different tokens sent out).",
            out_tokens.len()
        ));
    }

    reasons
}
