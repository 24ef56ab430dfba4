//! Verdict aggregation
//!
//! Merges contract-level findings, the simulation outcome and heuristic
//! floors into one final recommendation. Every adjustment goes through
//! [`Recommendation::bump`], so a danger signal established anywhere in the
//! pipeline can never be silently downgraded later.

use serde_json::json;

use crate::heuristics::drainer::evaluate_drainer_heuristic;
use crate::input::ScanInput;
use crate::types::{
    AnalysisResult, AnalyzerConfig, ConfidenceLevel, Finding, FindingCode, FindingLevel,
    Recommendation,
};

/// Reduce findings alone to a recommendation
///
/// Any danger-level finding wins outright. Warning-level findings yield
/// `Warning`, softened one notch to `Caution` when at least one safe-level
/// signal was also confirmed. Otherwise `Ok`.
pub fn recommendation_from_findings(findings: &[Finding]) -> Recommendation {
    let has_danger = findings.iter().any(|f| f.level == FindingLevel::Danger);
    let has_warning = findings.iter().any(|f| f.level == FindingLevel::Warning);
    let has_safe = findings.iter().any(|f| f.level == FindingLevel::Safe);

    if has_danger {
        Recommendation::Danger
    } else if has_warning {
        if has_safe {
            Recommendation::Caution
        } else {
            Recommendation::Warning
        }
    } else {
        Recommendation::Ok
    }
}

/// Apply the simulation-aware adjustment to a completed analysis
///
/// Only requests that carried calldata are adjusted: for an address-only
/// request there was nothing to simulate and the findings-derived
/// recommendation stands. For calldata requests:
///
/// - no simulation attempted, or a failed/reverted/not-run simulation,
///   bumps the recommendation to at least `Caution` — an un-simulatable
///   transaction must never read as fully safe
/// - a drainer heuristic floor bumps to at least that floor and appends a
///   `DRAINER_LIKE_SIMULATION` finding
/// - a successful high-confidence simulation with no floor leaves the
///   recommendation as computed from findings
pub fn apply_simulation_verdict(
    input: &ScanInput,
    mut analysis: AnalysisResult,
    config: &AnalyzerConfig,
) -> AnalysisResult {
    if !input.has_calldata() {
        return analysis;
    }

    let Some(simulation) = analysis.simulation.as_ref() else {
        analysis.recommendation = analysis.recommendation.bump(Recommendation::Caution);
        return analysis;
    };

    if !simulation.success {
        let not_run = simulation
            .revert_reason
            .as_deref()
            .is_some_and(|reason| reason == "Simulation not run");
        if not_run {
            let explanation = simulation
                .notes
                .first()
                .cloned()
                .unwrap_or_else(|| "The local simulation backend is unavailable".to_string());
            analysis.findings.push(Finding::new(
                FindingLevel::Info,
                FindingCode::SimulationNotRun,
                format!("Transaction was not simulated: {explanation}"),
            ));
        }
        analysis.recommendation = analysis.recommendation.bump(Recommendation::Caution);
        return analysis;
    }

    if simulation.confidence < ConfidenceLevel::High {
        analysis.confidence.downgrade(
            simulation.confidence,
            "simulation diff is incomplete".to_string(),
        );
    }

    let heuristic = evaluate_drainer_heuristic(&analysis, config);
    if let Some(floor) = heuristic.recommendation_floor {
        analysis.findings.push(
            Finding::new(
                FindingLevel::Warning,
                FindingCode::DrainerLikeSimulation,
                "Simulated effects match a drainer pattern",
            )
            .with_details(json!({ "reasons": heuristic.reasons })),
        );
        analysis.recommendation = analysis.recommendation.bump(floor);
    }

    analysis
}
