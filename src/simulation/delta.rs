//! Wallet balance delta engine
//!
//! Computes the net asset movement for the transaction's sender out of the
//! simulated log stream and the pre/post account state. Token selection is
//! capped: balance reads are the expensive part of a simulation, so only the
//! first N distinct ERC-20 tokens touching the actor (in log-index order)
//! are diffed, and the result says when the cap cut anything off.

use std::collections::{HashMap, HashSet};

use alloy::primitives::{Address, I256, U256};
use futures::future::join_all;
use tracing::debug;

use crate::traits::ChainReader;
use crate::types::{AnalyzerConfig, AssetChange, AssetType, ConfidenceLevel, Direction};

use super::logs::{ParsedTransfer, TransferStandard};
use super::BlockRange;

/// Tokens chosen for balance diffing
#[derive(Debug, Clone)]
pub struct TokenSelection {
    pub tokens: Vec<Address>,
    /// True when distinct actor-touching tokens existed beyond the cap
    pub truncated: bool,
}

/// Net movement for the actor plus the bookkeeping around it
#[derive(Debug, Clone)]
pub struct WalletDelta {
    pub asset_changes: Vec<AssetChange>,
    /// Signed native-currency diff for the actor (wei)
    pub native_diff: Option<I256>,
    pub truncated: bool,
    pub confidence: ConfidenceLevel,
    pub notes: Vec<String>,
}

/// Select the ERC-20 tokens whose balances are worth diffing for `actor`
///
/// Scans transfers in log-index order and keeps the first `max_tokens`
/// distinct token addresses in which the actor appears as sender or
/// receiver. `truncated` reports whether more distinct tokens existed
/// beyond the cap.
pub fn select_erc20_tokens(
    actor: Address,
    transfers: &[ParsedTransfer],
    max_tokens: Option<usize>,
) -> TokenSelection {
    let mut sorted: Vec<&ParsedTransfer> = transfers
        .iter()
        .filter(|t| t.standard == TransferStandard::Erc20)
        .filter(|t| t.from == actor || t.to == actor)
        .collect();
    sorted.sort_by_key(|t| t.log_index);

    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    let mut truncated = false;
    for transfer in sorted {
        if !seen.insert(transfer.token) {
            continue;
        }
        if let Some(cap) = max_tokens {
            if tokens.len() >= cap {
                truncated = true;
                break;
            }
        }
        tokens.push(transfer.token);
    }

    TokenSelection { tokens, truncated }
}

/// Diff before/after balances for the selected tokens into change records
///
/// Tokens without both a before and an after reading are skipped (their
/// absence is accounted for by the caller); zero diffs are dropped. Output
/// is sorted by token address ascending, `out` before `in` on ties, so the
/// result is deterministic regardless of read-completion order.
pub fn build_erc20_changes(
    actor: Address,
    transfers: &[ParsedTransfer],
    tokens: &[Address],
    before: &HashMap<Address, U256>,
    after: &HashMap<Address, U256>,
) -> Vec<AssetChange> {
    let mut changes = Vec::new();
    for token in tokens {
        let (Some(&before_balance), Some(&after_balance)) = (before.get(token), after.get(token))
        else {
            continue;
        };
        if before_balance == after_balance {
            continue;
        }
        let (amount, direction) = if after_balance < before_balance {
            (before_balance - after_balance, Direction::Out)
        } else {
            (after_balance - before_balance, Direction::In)
        };

        changes.push(AssetChange {
            asset_type: AssetType::Erc20,
            address: Some(*token),
            amount,
            direction,
            counterparty: unique_counterparty(actor, transfers, *token),
        });
    }

    changes.sort_by(|a, b| {
        a.address
            .cmp(&b.address)
            .then_with(|| match (a.direction, b.direction) {
                (Direction::Out, Direction::In) => std::cmp::Ordering::Less,
                (Direction::In, Direction::Out) => std::cmp::Ordering::Greater,
                _ => std::cmp::Ordering::Equal,
            })
    });

    changes
}

/// The single other party across every transfer of `token` touching the actor
///
/// Multiple distinct counterparties mean the flow is ambiguous; no guess is
/// made and no counterparty is reported.
fn unique_counterparty(
    actor: Address,
    transfers: &[ParsedTransfer],
    token: Address,
) -> Option<Address> {
    let mut counterparty: Option<Address> = None;
    for transfer in transfers {
        if transfer.standard != TransferStandard::Erc20 || transfer.token != token {
            continue;
        }
        let other = if transfer.from == actor {
            transfer.to
        } else if transfer.to == actor {
            transfer.from
        } else {
            continue;
        };
        match counterparty {
            Some(existing) if existing != other => return None,
            _ => counterparty = Some(other),
        }
    }
    counterparty
}

/// Compute the full wallet delta for one simulated transaction
///
/// Fans out one before/after balance-read pair per selected token plus one
/// for the native balance; per-token failures drop that token, add a note
/// and lower confidence without blocking the sibling reads.
pub async fn compute_wallet_delta(
    reader: &dyn ChainReader,
    actor: Address,
    transfers: &[ParsedTransfer],
    blocks: BlockRange,
    config: &AnalyzerConfig,
) -> WalletDelta {
    let selection = select_erc20_tokens(actor, transfers, Some(config.max_delta_tokens));

    let mut confidence = ConfidenceLevel::High;
    let mut notes = Vec::new();
    if selection.truncated {
        confidence = ConfidenceLevel::Medium;
        notes.push(format!(
            "More than {} distinct ERC-20 tokens touched the sender; balance diffs were capped.",
            config.max_delta_tokens
        ));
    }

    let reads = selection.tokens.iter().map(|&token| async move {
        let before = reader
            .erc20_balance_of(token, actor, Some(blocks.before))
            .await;
        let after = reader
            .erc20_balance_of(token, actor, Some(blocks.after))
            .await;
        (token, before, after)
    });

    let mut before_balances = HashMap::new();
    let mut after_balances = HashMap::new();
    for (token, before, after) in join_all(reads).await {
        match (before, after) {
            (Ok(before), Ok(after)) => {
                before_balances.insert(token, before);
                after_balances.insert(token, after);
            }
            (Err(err), _) | (_, Err(err)) => {
                debug!(target: "txsentry::delta", %token, %err, "balance read failed");
                confidence = ConfidenceLevel::Low;
                notes.push(format!("Balance diff failed for token {token}: {err}"));
            }
        }
    }

    let mut asset_changes = Vec::new();

    let native_diff = match native_balance_diff(reader, actor, blocks).await {
        Ok(diff) => {
            if !diff.is_zero() {
                asset_changes.push(AssetChange {
                    asset_type: AssetType::Native,
                    address: None,
                    amount: diff.unsigned_abs(),
                    direction: if diff.is_negative() {
                        Direction::Out
                    } else {
                        Direction::In
                    },
                    counterparty: None,
                });
            }
            Some(diff)
        }
        Err(err) => {
            debug!(target: "txsentry::delta", %actor, %err, "native balance read failed");
            confidence = ConfidenceLevel::Low;
            notes.push(format!("Native balance diff failed: {err}"));
            None
        }
    };

    asset_changes.extend(build_erc20_changes(
        actor,
        transfers,
        &selection.tokens,
        &before_balances,
        &after_balances,
    ));

    WalletDelta {
        asset_changes,
        native_diff,
        truncated: selection.truncated,
        confidence,
        notes,
    }
}

async fn native_balance_diff(
    reader: &dyn ChainReader,
    actor: Address,
    blocks: BlockRange,
) -> Result<I256, crate::errors::ProviderError> {
    let before = reader.get_balance(actor, Some(blocks.before)).await?;
    let after = reader.get_balance(actor, Some(blocks.after)).await?;
    Ok(signed_diff(before, after))
}

/// `after - before` as a signed value, saturating at the I256 bounds
fn signed_diff(before: U256, after: U256) -> I256 {
    if after >= before {
        I256::try_from(after - before).unwrap_or(I256::MAX)
    } else {
        I256::try_from(before - after)
            .map(|magnitude| -magnitude)
            .unwrap_or(I256::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const ACTOR: Address = address!("1111111111111111111111111111111111111111");
    const OTHER_X: Address = address!("2222222222222222222222222222222222222222");
    const OTHER_Y: Address = address!("3333333333333333333333333333333333333333");
    const TOKEN_A: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const TOKEN_B: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

    fn erc20_transfer(token: Address, from: Address, to: Address, log_index: u64) -> ParsedTransfer {
        ParsedTransfer {
            standard: TransferStandard::Erc20,
            token,
            from,
            to,
            amount: U256::from(10u64),
            token_id: None,
            log_index,
        }
    }

    #[test]
    fn token_selection_caps_and_reports_truncation() {
        let transfers = vec![
            erc20_transfer(TOKEN_B, ACTOR, OTHER_X, 2),
            erc20_transfer(TOKEN_A, OTHER_X, ACTOR, 1),
            erc20_transfer(OTHER_Y, ACTOR, OTHER_X, 3),
        ];

        let selection = select_erc20_tokens(ACTOR, &transfers, Some(2));
        // Log-index order, not slice order
        assert_eq!(selection.tokens, vec![TOKEN_A, TOKEN_B]);
        assert!(selection.truncated);

        let unbounded = select_erc20_tokens(ACTOR, &transfers, None);
        assert_eq!(unbounded.tokens.len(), 3);
        assert!(!unbounded.truncated);
    }

    #[test]
    fn zero_diffs_are_dropped_and_output_is_sorted() {
        let transfers = vec![
            erc20_transfer(TOKEN_A, ACTOR, OTHER_X, 0),
            erc20_transfer(TOKEN_B, OTHER_X, ACTOR, 1),
        ];
        let tokens = vec![TOKEN_B, TOKEN_A];
        let before = HashMap::from([
            (TOKEN_A, U256::from(100u64)),
            (TOKEN_B, U256::from(50u64)),
        ]);
        let after = HashMap::from([
            (TOKEN_A, U256::from(100u64)),
            (TOKEN_B, U256::from(80u64)),
        ]);

        let changes = build_erc20_changes(ACTOR, &transfers, &tokens, &before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].address, Some(TOKEN_B));
        assert_eq!(changes[0].direction, Direction::In);
        assert_eq!(changes[0].amount, U256::from(30u64));
        assert_eq!(changes[0].counterparty, Some(OTHER_X));
    }

    #[test]
    fn ambiguous_counterparty_is_not_guessed() {
        let transfers = vec![
            erc20_transfer(TOKEN_A, OTHER_X, ACTOR, 0),
            erc20_transfer(TOKEN_A, OTHER_Y, ACTOR, 1),
        ];
        let tokens = vec![TOKEN_A];
        let before = HashMap::from([(TOKEN_A, U256::from(0u64))]);
        let after = HashMap::from([(TOKEN_A, U256::from(20u64))]);

        let changes = build_erc20_changes(ACTOR, &transfers, &tokens, &before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].counterparty, None);
    }

    #[test]
    fn signed_diff_directions() {
        assert_eq!(
            signed_diff(U256::from(5u64), U256::from(9u64)),
            I256::try_from(4i64).unwrap()
        );
        assert_eq!(
            signed_diff(U256::from(9u64), U256::from(5u64)),
            I256::try_from(-4i64).unwrap()
        );
        assert!(signed_diff(U256::ZERO, U256::ZERO).is_zero());
    }
}
