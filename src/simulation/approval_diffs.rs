//! Approval diff engine
//!
//! Computes the actual before/after allowance state for every distinct
//! permission slot a simulated transaction touched. Events are only the
//! trigger: the authoritative values come from reading on-chain state at the
//! blocks bracketing the simulation, so re-approvals of an unchanged
//! allowance produce no diff at all.
//!
//! Fan-out contract: one concurrent read pair per slot, and one slot's
//! failure never blocks or fails the others. A failed slot falls back to its
//! last event's data, drops the call-scoped confidence to low and appends
//! exactly one diagnostic note.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use futures::future::join_all;
use tracing::debug;

use crate::errors::ProviderError;
use crate::traits::ChainReader;
use crate::types::{ApprovalChange, ConfidenceLevel, NftStandard};

use super::logs::ParsedApproval;
use super::BlockRange;

/// Outcome of diffing every approval slot of one simulated transaction
#[derive(Debug, Clone)]
pub struct ApprovalDiffResult {
    pub approvals: Vec<ApprovalChange>,
    /// Call-scoped: a single slot fallback lowers it for the whole call
    pub confidence: ConfidenceLevel,
    pub notes: Vec<String>,
}

/// A deduplicated unit of "permission that could change"
///
/// The identity of a slot is (standard, token, owner, spender-or-tokenId,
/// scope); the payload is the latest event that touched it.
#[derive(Debug, Clone)]
struct ApprovalSlot {
    kind: SlotKind,
    last_event: ParsedApproval,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SlotKind {
    Erc20 {
        token: Address,
        owner: Address,
        spender: Address,
    },
    Permit2 {
        token: Address,
        owner: Address,
        spender: Address,
    },
    Erc721Token {
        token: Address,
        owner: Address,
        token_id: U256,
    },
    OperatorAll {
        standard: NftStandard,
        token: Address,
        owner: Address,
        operator: Address,
    },
}

/// Build the actual allowance diffs for a simulated transaction
///
/// 1. Collapse the event stream to one slot per permission key, keeping the
///    highest-log-index event (last write wins within the transaction)
/// 2. Read each slot's state at `blocks.before` and `blocks.after`
///    concurrently
/// 3. Emit a typed change per slot whose state actually differs; drop
///    unchanged slots
/// 4. On a failed read, fall back to the slot's event data and record why
pub async fn build_approval_diffs(
    reader: &dyn ChainReader,
    approvals: &[ParsedApproval],
    blocks: BlockRange,
) -> ApprovalDiffResult {
    let slots = collect_approval_slots(approvals);
    if slots.is_empty() {
        return ApprovalDiffResult {
            approvals: Vec::new(),
            confidence: ConfidenceLevel::High,
            notes: Vec::new(),
        };
    }

    let reads = slots.iter().map(|slot| async move {
        let outcome = read_slot_diff(reader, slot, blocks).await;
        (slot, outcome)
    });

    let mut confidence = ConfidenceLevel::High;
    let mut notes = Vec::new();
    let mut changes = Vec::new();

    for (slot, outcome) in join_all(reads).await {
        match outcome {
            Ok(Some(change)) => changes.push(change),
            // before == after: the slot produced no observable change
            Ok(None) => {}
            Err(err) => {
                debug!(target: "txsentry::approval_diffs", ?slot, %err, "slot read failed, using event data");
                confidence = ConfidenceLevel::Low;
                notes.push(format_slot_error(slot, &err));
                changes.push(fallback_approval(slot));
            }
        }
    }

    ApprovalDiffResult {
        approvals: changes,
        confidence,
        notes,
    }
}

/// Collapse raw events into unique slots, latest log index winning
///
/// The returned slots are ordered by their last event's log index so the
/// result (and any notes) is deterministic regardless of read completion.
fn collect_approval_slots(approvals: &[ParsedApproval]) -> Vec<ApprovalSlot> {
    let mut by_key: HashMap<SlotKind, ParsedApproval> = HashMap::new();
    for approval in approvals {
        let kind = slot_kind(approval);
        match by_key.get(&kind) {
            Some(existing) if approval.log_index() < existing.log_index() => {}
            _ => {
                by_key.insert(kind, approval.clone());
            }
        }
    }

    let mut slots: Vec<ApprovalSlot> = by_key
        .into_iter()
        .map(|(kind, last_event)| ApprovalSlot { kind, last_event })
        .collect();
    slots.sort_by_key(|slot| slot.last_event.log_index());
    slots
}

fn slot_kind(approval: &ParsedApproval) -> SlotKind {
    match approval {
        ParsedApproval::Erc20 {
            token,
            owner,
            spender,
            ..
        } => SlotKind::Erc20 {
            token: *token,
            owner: *owner,
            spender: *spender,
        },
        ParsedApproval::Permit2 {
            token,
            owner,
            spender,
            ..
        } => SlotKind::Permit2 {
            token: *token,
            owner: *owner,
            spender: *spender,
        },
        ParsedApproval::Erc721Approval {
            token,
            owner,
            token_id,
            ..
        } => SlotKind::Erc721Token {
            token: *token,
            owner: *owner,
            token_id: *token_id,
        },
        ParsedApproval::ApprovalForAll {
            standard,
            token,
            owner,
            operator,
            ..
        } => SlotKind::OperatorAll {
            standard: *standard,
            token: *token,
            owner: *owner,
            operator: *operator,
        },
    }
}

/// Read one slot's state at both blocks and diff it
///
/// `Ok(None)` means the slot did not observably change.
async fn read_slot_diff(
    reader: &dyn ChainReader,
    slot: &ApprovalSlot,
    blocks: BlockRange,
) -> Result<Option<ApprovalChange>, ProviderError> {
    match &slot.kind {
        SlotKind::Erc20 {
            token,
            owner,
            spender,
        } => {
            let before = reader
                .erc20_allowance(*token, *owner, *spender, Some(blocks.before))
                .await?;
            let after = reader
                .erc20_allowance(*token, *owner, *spender, Some(blocks.after))
                .await?;
            if before == after {
                return Ok(None);
            }
            Ok(Some(ApprovalChange::Erc20 {
                token: *token,
                owner: *owner,
                spender: *spender,
                previous_amount: Some(before),
                amount: after,
            }))
        }
        SlotKind::Permit2 {
            token,
            owner,
            spender,
        } => {
            // Permit2 reads return (amount, expiration, nonce); only the
            // amount participates in the diff
            let (before, _, _) = reader
                .permit2_allowance(*owner, *token, *spender, Some(blocks.before))
                .await?;
            let (after, _, _) = reader
                .permit2_allowance(*owner, *token, *spender, Some(blocks.after))
                .await?;
            if before == after {
                return Ok(None);
            }
            Ok(Some(ApprovalChange::Permit2 {
                token: *token,
                owner: *owner,
                spender: *spender,
                previous_amount: Some(before),
                amount: after,
            }))
        }
        SlotKind::Erc721Token {
            token,
            owner,
            token_id,
        } => {
            let before = reader
                .erc721_get_approved(*token, *token_id, Some(blocks.before))
                .await?;
            let after = reader
                .erc721_get_approved(*token, *token_id, Some(blocks.after))
                .await?;
            if before == after {
                return Ok(None);
            }
            Ok(Some(ApprovalChange::Erc721Token {
                token: *token,
                owner: *owner,
                spender: after,
                token_id: *token_id,
                previous_spender: Some(before),
            }))
        }
        SlotKind::OperatorAll {
            standard,
            token,
            owner,
            operator,
        } => {
            let before = reader
                .is_approved_for_all(*token, *owner, *operator, Some(blocks.before))
                .await?;
            let after = reader
                .is_approved_for_all(*token, *owner, *operator, Some(blocks.after))
                .await?;
            if before == after {
                return Ok(None);
            }
            Ok(Some(ApprovalChange::OperatorAll {
                nft_standard: *standard,
                token: *token,
                owner: *owner,
                operator: *operator,
                previous_approved: Some(before),
                approved: after,
            }))
        }
    }
}

/// Event-derived change for a slot whose state could not be read
///
/// The before value is unknown, so the previous-state field is left empty.
fn fallback_approval(slot: &ApprovalSlot) -> ApprovalChange {
    match (&slot.kind, &slot.last_event) {
        (
            SlotKind::Erc20 {
                token,
                owner,
                spender,
            },
            ParsedApproval::Erc20 { amount, .. },
        ) => ApprovalChange::Erc20 {
            token: *token,
            owner: *owner,
            spender: *spender,
            previous_amount: None,
            amount: *amount,
        },
        (
            SlotKind::Permit2 {
                token,
                owner,
                spender,
            },
            ParsedApproval::Permit2 { amount, .. },
        ) => ApprovalChange::Permit2 {
            token: *token,
            owner: *owner,
            spender: *spender,
            previous_amount: None,
            amount: *amount,
        },
        (
            SlotKind::Erc721Token {
                token,
                owner,
                token_id,
            },
            ParsedApproval::Erc721Approval { spender, .. },
        ) => ApprovalChange::Erc721Token {
            token: *token,
            owner: *owner,
            spender: *spender,
            token_id: *token_id,
            previous_spender: None,
        },
        (
            SlotKind::OperatorAll {
                standard,
                token,
                owner,
                operator,
            },
            ParsedApproval::ApprovalForAll { approved, .. },
        ) => ApprovalChange::OperatorAll {
            nft_standard: *standard,
            token: *token,
            owner: *owner,
            operator: *operator,
            previous_approved: None,
            approved: *approved,
        },
        // Slot kinds are derived from their own events, so the pairs above
        // are exhaustive in practice; mismatches still degrade gracefully
        (_, event) => fallback_from_event(event),
    }
}

fn fallback_from_event(event: &ParsedApproval) -> ApprovalChange {
    match event {
        ParsedApproval::Erc20 {
            token,
            owner,
            spender,
            amount,
            ..
        } => ApprovalChange::Erc20 {
            token: *token,
            owner: *owner,
            spender: *spender,
            previous_amount: None,
            amount: *amount,
        },
        ParsedApproval::Permit2 {
            token,
            owner,
            spender,
            amount,
            ..
        } => ApprovalChange::Permit2 {
            token: *token,
            owner: *owner,
            spender: *spender,
            previous_amount: None,
            amount: *amount,
        },
        ParsedApproval::Erc721Approval {
            token,
            owner,
            spender,
            token_id,
            ..
        } => ApprovalChange::Erc721Token {
            token: *token,
            owner: *owner,
            spender: *spender,
            token_id: *token_id,
            previous_spender: None,
        },
        ParsedApproval::ApprovalForAll {
            standard,
            token,
            owner,
            operator,
            approved,
            ..
        } => ApprovalChange::OperatorAll {
            nft_standard: *standard,
            token: *token,
            owner: *owner,
            operator: *operator,
            previous_approved: None,
            approved: *approved,
        },
    }
}

/// One diagnostic line identifying the failing slot
fn format_slot_error(slot: &ApprovalSlot, err: &ProviderError) -> String {
    match &slot.kind {
        SlotKind::Erc20 {
            token,
            owner,
            spender,
        } => format!("Approval diff failed for erc20 {token} {owner} -> {spender}: {err}"),
        SlotKind::Permit2 {
            token,
            owner,
            spender,
        } => format!("Approval diff failed for permit2 {token} {owner} -> {spender}: {err}"),
        SlotKind::Erc721Token { token, token_id, .. } => {
            format!("Approval diff failed for ERC-721 {token} #{token_id}: {err}")
        }
        SlotKind::OperatorAll {
            standard,
            token,
            owner,
            operator,
        } => {
            let tag = match standard {
                NftStandard::Erc721 => "erc721",
                NftStandard::Erc1155 => "erc1155",
            };
            format!("Approval diff failed for {tag} ApprovalForAll {token} {owner} -> {operator}: {err}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const TOKEN: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const OWNER: Address = address!("1111111111111111111111111111111111111111");
    const SPENDER: Address = address!("2222222222222222222222222222222222222222");

    fn erc20_event(amount: u64, log_index: u64) -> ParsedApproval {
        ParsedApproval::Erc20 {
            token: TOKEN,
            owner: OWNER,
            spender: SPENDER,
            amount: U256::from(amount),
            log_index,
        }
    }

    #[test]
    fn slot_collapse_keeps_latest_event() {
        let slots = collect_approval_slots(&[erc20_event(1, 3), erc20_event(999, 8)]);
        assert_eq!(slots.len(), 1);
        match &slots[0].last_event {
            ParsedApproval::Erc20 { amount, log_index, .. } => {
                assert_eq!(*amount, U256::from(999u64));
                assert_eq!(*log_index, 8);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn slot_collapse_keeps_distinct_slots_apart() {
        let other_spender = address!("3333333333333333333333333333333333333333");
        let slots = collect_approval_slots(&[
            erc20_event(1, 0),
            ParsedApproval::Erc20 {
                token: TOKEN,
                owner: OWNER,
                spender: other_spender,
                amount: U256::from(2u64),
                log_index: 1,
            },
        ]);
        assert_eq!(slots.len(), 2);
    }
}
