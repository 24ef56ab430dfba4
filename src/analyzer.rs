//! Contract and transaction analysis orchestration
//!
//! [`analyze`] is the contract-analysis path: it merges provider data about
//! one address into findings, confidence and a recommendation. [`scan`] is
//! the full request path: it analyzes the target, simulates the pending
//! transaction when calldata is present, diffs the simulated effects and
//! applies the simulation-aware verdict.
//!
//! Provider faults never abort an analysis. Each source that cannot answer
//! degrades confidence with a recorded reason, and the result is always a
//! fully-formed verdict — the engine fails toward caution, not silence.

use alloy::primitives::Address;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::AnalysisError;
use crate::input::{CalldataInput, ScanInput};
use crate::proxy::{detect_proxy, is_contract};
use crate::simulation::approval_diffs::build_approval_diffs;
use crate::simulation::delta::compute_wallet_delta;
use crate::simulation::logs::parse_simulation_logs;
use crate::simulation::verdict::{apply_simulation_verdict, recommendation_from_findings};
use crate::simulation::BlockRange;
use crate::traits::{Providers, SimulatedTransaction, SimulationRequest};
use crate::types::{
    AnalysisResult, AnalyzerConfig, Chain, Confidence, ConfidenceLevel, ContractInfo, Finding,
    FindingCode, FindingLevel, Recommendation, SimulationResult,
};

/// Analyze one contract address
///
/// Resolves contract metadata, proxy status, protocol identity and token
/// security concurrently, then reduces the merged picture to findings and a
/// recommendation. An address with no deployed code short-circuits to a
/// cautionary EOA result.
pub async fn analyze(
    providers: &Providers,
    address: Address,
    chain: Chain,
    config: &AnalyzerConfig,
) -> AnalysisResult {
    let mut confidence = Confidence::high();

    let deployed = match is_contract(providers.chain.as_ref(), address).await {
        Ok(deployed) => deployed,
        Err(err) => {
            warn!(target: "txsentry::analyzer", %address, %err, "code lookup failed");
            confidence.downgrade(ConfidenceLevel::Medium, "contract code unavailable");
            true
        }
    };
    if !deployed {
        return AnalysisResult {
            contract: ContractInfo {
                address,
                chain,
                name: None,
                verified: false,
                age_days: None,
                tx_count: None,
                is_proxy: false,
                implementation: None,
                beacon: None,
            },
            protocol: None,
            findings: vec![Finding::new(
                FindingLevel::Warning,
                FindingCode::LowActivity,
                "Address is not a contract (EOA or empty)",
            )],
            confidence,
            recommendation: Recommendation::Caution,
            simulation: None,
        };
    }

    // Independent sources, merged at the join point
    let (metadata, proxy_info, protocol, token_security) = tokio::join!(
        providers.metadata.contract_metadata(address, chain),
        detect_proxy(providers.chain.as_ref(), address, chain),
        providers.protocols.match_protocol(address, chain),
        providers.token_security.token_security(address, chain),
    );

    let metadata = match metadata {
        Ok(metadata) => metadata.unwrap_or_default(),
        Err(err) => {
            debug!(target: "txsentry::analyzer", %address, %err, "metadata provider failed");
            confidence.downgrade(
                ConfidenceLevel::Medium,
                "contract metadata unavailable - limited data",
            );
            Default::default()
        }
    };
    let protocol = match protocol {
        Ok(protocol) => protocol,
        Err(err) => {
            debug!(target: "txsentry::analyzer", %address, %err, "protocol registry failed");
            confidence.downgrade(ConfidenceLevel::Medium, "protocol registry unavailable");
            None
        }
    };
    let token_security = match token_security {
        Ok(token_security) => token_security,
        Err(err) => {
            debug!(target: "txsentry::analyzer", %address, %err, "token security provider failed");
            confidence.downgrade(ConfidenceLevel::Medium, "token security data unavailable");
            None
        }
    };

    let mut findings = Vec::new();

    if metadata.verified {
        let message = match metadata.name.as_deref() {
            Some(name) => format!("Source code verified: {name}"),
            None => "Source code verified".to_string(),
        };
        findings.push(Finding::new(
            FindingLevel::Safe,
            FindingCode::Verified,
            message,
        ));
    } else {
        findings.push(Finding::new(
            FindingLevel::Danger,
            FindingCode::Unverified,
            "Source code not verified - cannot analyze contract logic",
        ));
        confidence.downgrade(ConfidenceLevel::Low, "source not verified");
    }

    if let Some(protocol) = protocol.as_ref() {
        findings.push(Finding::new(
            FindingLevel::Safe,
            FindingCode::KnownProtocol,
            format!("Recognized protocol: {}", protocol.name),
        ));
    }

    if proxy_info.is_proxy {
        let pattern = proxy_info
            .proxy_type
            .map(|t| format!("{t:?}").to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());
        findings.push(Finding::new(
            FindingLevel::Warning,
            FindingCode::Upgradeable,
            format!("Upgradeable proxy ({pattern}) - code can change"),
        ));
    }

    if let Some(age_days) = metadata.age_days {
        if age_days < config.new_contract_age_days {
            findings.push(Finding::new(
                FindingLevel::Warning,
                FindingCode::NewContract,
                format!("Contract deployed {age_days} days ago"),
            ));
        }
    }

    if let Some(tx_count) = metadata.tx_count {
        if tx_count < config.low_activity_tx_count {
            findings.push(Finding::new(
                FindingLevel::Info,
                FindingCode::LowActivity,
                format!("Only {tx_count} transactions"),
            ));
        }
    }

    if let Some(security) = token_security.as_ref() {
        if security.is_honeypot {
            findings.push(Finding::new(
                FindingLevel::Danger,
                FindingCode::Honeypot,
                "Honeypot detected - tokens cannot be sold",
            ));
        }
        if security.is_mintable {
            findings.push(Finding::new(
                FindingLevel::Danger,
                FindingCode::HiddenMint,
                "Owner can mint unlimited tokens",
            ));
        }
        if security.selfdestruct {
            findings.push(Finding::new(
                FindingLevel::Danger,
                FindingCode::Selfdestruct,
                "Contract can self-destruct",
            ));
        }
        if security.owner_can_change_balance {
            findings.push(Finding::new(
                FindingLevel::Danger,
                FindingCode::OwnerDrain,
                "Owner can modify balances",
            ));
        }
        if security.is_blacklisted {
            findings.push(Finding::new(
                FindingLevel::Warning,
                FindingCode::Blacklist,
                "Contract has blacklist functionality",
            ));
        }
        let max_tax = security
            .buy_tax
            .unwrap_or(0.0)
            .max(security.sell_tax.unwrap_or(0.0));
        if max_tax > config.high_tax_threshold {
            findings.push(Finding::new(
                FindingLevel::Warning,
                FindingCode::HighTax,
                format!("High transfer tax: {:.1}%", max_tax * 100.0),
            ));
        }
    }

    let recommendation = recommendation_from_findings(&findings);

    AnalysisResult {
        contract: ContractInfo {
            address,
            chain,
            name: metadata.name,
            verified: metadata.verified,
            age_days: metadata.age_days,
            tx_count: metadata.tx_count,
            is_proxy: proxy_info.is_proxy,
            implementation: proxy_info.implementation,
            beacon: proxy_info.beacon,
        },
        protocol: protocol.map(|p| p.name),
        findings,
        confidence,
        recommendation,
        simulation: None,
    }
}

/// Run a full scan request: contract analysis, optional simulation, verdict
///
/// Address-only requests return the contract analysis directly. Calldata
/// requests additionally simulate the transaction, diff its balance and
/// approval effects, and pass the merged result through the simulation-aware
/// verdict aggregator.
pub async fn scan(
    providers: &Providers,
    input: &ScanInput,
    default_chain: Chain,
    config: &AnalyzerConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let (target, chain) = match (&input.address, &input.calldata) {
        (Some(address), None) => (*address, default_chain),
        (None, Some(calldata)) => (calldata.to, calldata.chain.unwrap_or(default_chain)),
        _ => return Err(crate::errors::InputError::AmbiguousInput.into()),
    };

    let mut analysis = analyze(providers, target, chain, config).await;

    if let Some(calldata) = &input.calldata {
        let mut simulation = run_simulation(providers, calldata, chain, config).await;

        if !calldata.authorization_list.is_empty() {
            // Account-code delegation cannot be reproduced by the local
            // fork, so the simulated effects may be misleading
            simulation.notes.push(
                "EIP-7702 authorization list present; simulation does not reproduce code delegation."
                    .to_string(),
            );
            simulation.confidence = ConfidenceLevel::Low;
            analysis.findings.push(
                Finding::new(
                    FindingLevel::Warning,
                    FindingCode::Eip7702Authorization,
                    format!(
                        "Transaction delegates account code via {} EIP-7702 authorization(s)",
                        calldata.authorization_list.len()
                    ),
                )
                .with_details(json!({
                    "authorization_list": calldata.authorization_list,
                })),
            );
            analysis.recommendation = analysis.recommendation.bump(Recommendation::Warning);
        }

        analysis.simulation = Some(simulation);
        analysis = apply_simulation_verdict(input, analysis, config);
    }

    Ok(analysis)
}

/// Simulate the pending transaction and diff its effects
///
/// Simulator unavailability and simulator faults both come back as a
/// not-run result; the verdict aggregator turns either into a caution
/// floor. A successful execution fans out the balance-delta and
/// approval-diff engines concurrently over the immutable snapshot.
async fn run_simulation(
    providers: &Providers,
    calldata: &CalldataInput,
    chain: Chain,
    config: &AnalyzerConfig,
) -> SimulationResult {
    let actor = calldata.from.unwrap_or(Address::ZERO);
    let request = SimulationRequest {
        to: calldata.to,
        from: actor,
        data: calldata.data.clone(),
        value: calldata.value.unwrap_or_default(),
        chain,
        authorization_list: calldata.authorization_list.clone(),
    };

    let simulated = match providers.simulator.simulate(&request).await {
        Ok(simulated) => simulated,
        Err(err) => {
            warn!(target: "txsentry::analyzer", %err, "simulator fault");
            return SimulationResult::not_run(format!("Simulator error: {err}"));
        }
    };

    match simulated {
        SimulatedTransaction::NotRun { reason } => SimulationResult::not_run(reason),
        SimulatedTransaction::Executed {
            success: false,
            revert_reason,
            ..
        } => SimulationResult {
            success: false,
            revert_reason,
            native_diff: None,
            asset_changes: Vec::new(),
            approvals: Vec::new(),
            confidence: ConfidenceLevel::High,
            notes: vec!["Transaction reverted during simulation.".to_string()],
        },
        SimulatedTransaction::Executed {
            success: true,
            logs,
            before_block,
            after_block,
            ..
        } => {
            let parsed = parse_simulation_logs(&logs);
            let blocks = BlockRange {
                before: before_block,
                after: after_block,
            };

            let (delta, diffs) = tokio::join!(
                compute_wallet_delta(
                    providers.chain.as_ref(),
                    actor,
                    &parsed.transfers,
                    blocks,
                    config
                ),
                build_approval_diffs(providers.chain.as_ref(), &parsed.approvals, blocks),
            );

            let confidence = delta.confidence.min(diffs.confidence);
            let mut notes = delta.notes;
            notes.extend(diffs.notes);

            SimulationResult {
                success: true,
                revert_reason: None,
                native_diff: delta.native_diff,
                asset_changes: delta.asset_changes,
                approvals: diffs.approvals,
                confidence,
                notes,
            }
        }
    }
}
