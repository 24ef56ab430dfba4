//! Approval context analysis
//!
//! Judges a single proposed allowance change before the user signs it. The
//! spender is the security-relevant party: an approval hands it standing
//! permission to move the owner's assets, so every check here is about who
//! the spender actually is.
//!
//! All checks run independently and all of them are evaluated; nothing
//! short-circuits. Each boolean check is mirrored in
//! [`ApprovalFlags`](crate::types::ApprovalFlags) for programmatic
//! consumers, alongside the human-readable findings.

pub mod known_spenders;
pub mod typosquat;

use alloy::primitives::{Address, U256};
use serde_json::json;
use tracing::warn;

use crate::analyzer::analyze;
use crate::proxy::is_contract;
use crate::simulation::verdict::recommendation_from_findings;
use crate::traits::Providers;
use crate::types::{
    AnalyzerConfig, ApprovalAnalysisResult, ApprovalFlags, Chain, Finding, FindingCode,
    FindingLevel, Recommendation, MAX_UINT256,
};

use self::known_spenders::known_spenders;
use self::typosquat::is_possible_typosquat;

/// A proposed allowance change as decoded from the wallet request
///
/// Token-scoped approvals carry `amount`; operator approvals carry
/// `approved`.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub token: Address,
    pub spender: Address,
    pub amount: Option<U256>,
    pub approved: Option<bool>,
}

/// Caller-supplied context for the approval
#[derive(Debug, Clone, Default)]
pub struct ApprovalContext {
    /// The contract the wallet UI claims is being approved; a mismatch with
    /// the on-chain spender is a UI-spoofing signature
    pub expected_spender: Option<Address>,
}

/// Analyze one proposed allowance change
///
/// Runs every check of the approval surface:
/// - unlimited allowance
/// - spender is an EOA
/// - on-chain spender differs from the UI-claimed spender
/// - spender contract is unverified
/// - independent contract analysis of the spender returns a danger verdict
/// - spender contract is newly deployed
/// - spender address typosquats a known legitimate spender
pub async fn analyze_approval(
    providers: &Providers,
    request: &ApprovalRequest,
    chain: Chain,
    context: &ApprovalContext,
    config: &AnalyzerConfig,
) -> ApprovalAnalysisResult {
    let mut flags = ApprovalFlags::default();
    let mut findings = Vec::new();

    if request.amount == Some(MAX_UINT256) {
        flags.is_unlimited = true;
        findings.push(Finding::new(
            FindingLevel::Warning,
            FindingCode::UnlimitedApproval,
            "Unlimited token allowance requested",
        ));
    }

    if let Some(expected) = context.expected_spender {
        if expected != request.spender {
            flags.target_mismatch = true;
            findings.push(
                Finding::new(
                    FindingLevel::Danger,
                    FindingCode::ApprovalTargetMismatch,
                    format!(
                        "On-chain spender {} differs from the expected spender {}",
                        request.spender, expected
                    ),
                )
                .with_details(json!({
                    "spender": request.spender,
                    "expected_spender": expected,
                })),
            );
        }
    }

    if let Some(squat) = is_possible_typosquat(request.spender, known_spenders(chain)) {
        flags.possible_typosquat = true;
        findings.push(
            Finding::new(
                FindingLevel::Danger,
                FindingCode::PossibleTyposquat,
                format!(
                    "Spender resembles {} ({}) at edit distance {}",
                    squat.matched.name, squat.matched.address, squat.distance
                ),
            )
            .with_details(json!({
                "matched_name": squat.matched.name,
                "matched_address": squat.matched.address,
                "distance": squat.distance,
            })),
        );
    }

    // A chain-read failure here must not manufacture a danger finding, so
    // an unreadable spender is treated as a contract and left to the
    // contract-analysis checks below.
    let spender_is_contract = match is_contract(providers.chain.as_ref(), request.spender).await {
        Ok(deployed) => deployed,
        Err(err) => {
            warn!(target: "txsentry::approval", spender = %request.spender, %err, "spender code read failed");
            true
        }
    };

    if !spender_is_contract {
        flags.spender_is_eoa = true;
        findings.push(Finding::new(
            FindingLevel::Danger,
            FindingCode::ApprovalToEoa,
            "Spender has no deployed code (externally-owned account)",
        ));
    } else {
        let spender_analysis = analyze(providers, request.spender, chain, config).await;

        if !spender_analysis.contract.verified {
            flags.spender_unverified = true;
            findings.push(Finding::new(
                FindingLevel::Warning,
                FindingCode::ApprovalToUnverified,
                "Spender contract source is not verified",
            ));
        }

        if spender_analysis.recommendation == Recommendation::Danger {
            flags.spender_dangerous = true;
            findings.push(Finding::new(
                FindingLevel::Danger,
                FindingCode::ApprovalToDangerousContract,
                "Independent analysis of the spender returned a danger verdict",
            ));
        }

        if let Some(age_days) = spender_analysis.contract.age_days {
            if age_days < config.new_contract_age_days {
                flags.spender_new = true;
                findings.push(Finding::new(
                    FindingLevel::Warning,
                    FindingCode::ApprovalToNewContract,
                    format!("Spender contract deployed {age_days} days ago"),
                ));
            }
        }
    }

    let recommendation = recommendation_from_findings(&findings);

    ApprovalAnalysisResult {
        flags,
        findings,
        recommendation,
    }
}
