//! Approval context analyzer tests
//!
//! Each check is exercised end-to-end through mock providers, including the
//! canonical case of an unlimited allowance requested for a spender with no
//! deployed code.

mod common;

use alloy::primitives::{address, Address, U256};
use common::{providers_with, verified_metadata, MockChainReader, MockMetadataProvider, MockSimulator};
use txsentry::types::{Chain, FindingCode, Recommendation, MAX_UINT256};
use txsentry::{analyze_approval, ApprovalContext, ApprovalRequest};

const TOKEN: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
const EOA_SPENDER: Address = address!("0000000000000000000000000000000000000001");
const CONTRACT_SPENDER: Address = address!("5555555555555555555555555555555555555555");

fn request(spender: Address, amount: U256) -> ApprovalRequest {
    ApprovalRequest {
        token: TOKEN,
        spender,
        amount: Some(amount),
        approved: None,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unlimited_approval_to_eoa_flags_both() {
    // No code entry for the spender: it reads as an EOA
    let providers = providers_with(
        MockChainReader::default(),
        MockMetadataProvider::default(),
        MockSimulator::default(),
    );

    let result = analyze_approval(
        &providers,
        &request(EOA_SPENDER, MAX_UINT256),
        Chain::Ethereum,
        &ApprovalContext {
            expected_spender: Some(address!("E592427A0AEce92De3Edee1F18E0157C05861564")),
        },
        &Default::default(),
    )
    .await;

    assert!(result.flags.is_unlimited);
    assert!(result.flags.spender_is_eoa);
    assert!(result.flags.target_mismatch);
    assert!(result
        .findings
        .iter()
        .any(|f| f.code == FindingCode::UnlimitedApproval));
    assert!(result
        .findings
        .iter()
        .any(|f| f.code == FindingCode::ApprovalToEoa));
    assert!(result
        .findings
        .iter()
        .any(|f| f.code == FindingCode::ApprovalTargetMismatch));
    assert_eq!(result.recommendation, Recommendation::Danger);
}

#[tokio::test(flavor = "multi_thread")]
async fn matching_expected_spender_does_not_flag() {
    let mut metadata = MockMetadataProvider::default();
    metadata
        .metadata
        .insert(CONTRACT_SPENDER, verified_metadata("Router"));
    let providers = providers_with(
        MockChainReader::default().with_contract(CONTRACT_SPENDER),
        metadata,
        MockSimulator::default(),
    );

    let result = analyze_approval(
        &providers,
        &request(CONTRACT_SPENDER, U256::from(100u64)),
        Chain::Ethereum,
        &ApprovalContext {
            expected_spender: Some(CONTRACT_SPENDER),
        },
        &Default::default(),
    )
    .await;

    assert!(!result.flags.target_mismatch);
    assert!(!result.flags.is_unlimited);
    assert!(!result.flags.spender_is_eoa);
    assert_eq!(result.recommendation, Recommendation::Ok);
}

#[tokio::test(flavor = "multi_thread")]
async fn newly_deployed_spender_is_flagged() {
    let mut meta = verified_metadata("FreshRouter");
    meta.age_days = Some(3);
    let mut metadata = MockMetadataProvider::default();
    metadata.metadata.insert(CONTRACT_SPENDER, meta);
    let providers = providers_with(
        MockChainReader::default().with_contract(CONTRACT_SPENDER),
        metadata,
        MockSimulator::default(),
    );

    let result = analyze_approval(
        &providers,
        &request(CONTRACT_SPENDER, U256::from(1u64)),
        Chain::Ethereum,
        &ApprovalContext::default(),
        &Default::default(),
    )
    .await;

    assert!(result.flags.spender_new);
    assert!(result
        .findings
        .iter()
        .any(|f| f.code == FindingCode::ApprovalToNewContract));
}

#[tokio::test(flavor = "multi_thread")]
async fn unverified_spender_is_flagged_and_dangerous() {
    // Spender has code but no metadata: the contract analysis of the
    // spender reports unverified source, which is itself a danger verdict
    let providers = providers_with(
        MockChainReader::default().with_contract(CONTRACT_SPENDER),
        MockMetadataProvider::default(),
        MockSimulator::default(),
    );

    let result = analyze_approval(
        &providers,
        &request(CONTRACT_SPENDER, U256::from(1u64)),
        Chain::Ethereum,
        &ApprovalContext::default(),
        &Default::default(),
    )
    .await;

    assert!(result.flags.spender_unverified);
    assert!(result.flags.spender_dangerous);
    assert!(result
        .findings
        .iter()
        .any(|f| f.code == FindingCode::ApprovalToUnverified));
    assert!(result
        .findings
        .iter()
        .any(|f| f.code == FindingCode::ApprovalToDangerousContract));
}

#[tokio::test(flavor = "multi_thread")]
async fn typosquatted_spender_is_flagged() {
    // One character away from the Uniswap V2 router
    let squatter = address!("7a250d5630b4cf539739df2c5eacb4c659f2488d");
    let mut metadata = MockMetadataProvider::default();
    metadata
        .metadata
        .insert(squatter, verified_metadata("Totally Legit Router"));
    let providers = providers_with(
        MockChainReader::default().with_contract(squatter),
        metadata,
        MockSimulator::default(),
    );

    let result = analyze_approval(
        &providers,
        &request(squatter, U256::from(1u64)),
        Chain::Ethereum,
        &ApprovalContext::default(),
        &Default::default(),
    )
    .await;

    assert!(result.flags.possible_typosquat);
    let finding = result
        .findings
        .iter()
        .find(|f| f.code == FindingCode::PossibleTyposquat)
        .expect("typosquat finding");
    assert!(finding.message.contains("Uniswap V2 Router"));
    assert_eq!(result.recommendation, Recommendation::Danger);
}

#[tokio::test(flavor = "multi_thread")]
async fn exact_known_spender_is_not_a_typosquat() {
    let uniswap = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
    let mut metadata = MockMetadataProvider::default();
    metadata
        .metadata
        .insert(uniswap, verified_metadata("Uniswap V2 Router"));
    let providers = providers_with(
        MockChainReader::default().with_contract(uniswap),
        metadata,
        MockSimulator::default(),
    );

    let result = analyze_approval(
        &providers,
        &request(uniswap, U256::from(1u64)),
        Chain::Ethereum,
        &ApprovalContext::default(),
        &Default::default(),
    )
    .await;

    assert!(!result.flags.possible_typosquat);
    assert_eq!(result.recommendation, Recommendation::Ok);
}
