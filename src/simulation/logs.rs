//! Decoding of transfer and approval events from a simulated transaction
//!
//! Turns the raw log stream into typed [`ParsedTransfer`] and
//! [`ParsedApproval`] records. Log position in the stream is the log index;
//! "latest event per slot" downstream is defined by this index, never by
//! read-completion order.
//!
//! ERC-20 and ERC-721 share the `Transfer`/`Approval` signatures; the two
//! are told apart by topic arity (ERC-20 carries the amount in the data
//! section, ERC-721 indexes the token ID as a fourth topic). Permit2
//! approvals have a distinct signature and carry the token address as an
//! indexed topic rather than as the emitting contract.

use alloy::primitives::{keccak256, Address, FixedBytes, Log, U256};
use once_cell::sync::Lazy;

use crate::types::NftStandard;

use super::PERMIT2_ADDRESS;

/// keccak256("Transfer(address,address,uint256)")
static TRANSFER_SIGNATURE: Lazy<FixedBytes<32>> =
    Lazy::new(|| keccak256(b"Transfer(address,address,uint256)"));

/// keccak256("Approval(address,address,uint256)")
static APPROVAL_SIGNATURE: Lazy<FixedBytes<32>> =
    Lazy::new(|| keccak256(b"Approval(address,address,uint256)"));

/// keccak256("ApprovalForAll(address,address,bool)")
static APPROVAL_FOR_ALL_SIGNATURE: Lazy<FixedBytes<32>> =
    Lazy::new(|| keccak256(b"ApprovalForAll(address,address,bool)"));

/// keccak256("TransferSingle(address,address,address,uint256,uint256)")
static TRANSFER_SINGLE_SIGNATURE: Lazy<FixedBytes<32>> =
    Lazy::new(|| keccak256(b"TransferSingle(address,address,address,uint256,uint256)"));

/// keccak256("Approval(address,address,address,uint160,uint48)") — Permit2
static PERMIT2_APPROVAL_SIGNATURE: Lazy<FixedBytes<32>> =
    Lazy::new(|| keccak256(b"Approval(address,address,address,uint160,uint48)"));

/// Standard of a decoded transfer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStandard {
    Erc20,
    Erc721,
    Erc1155,
}

/// One decoded transfer event
#[derive(Debug, Clone)]
pub struct ParsedTransfer {
    pub standard: TransferStandard,
    pub token: Address,
    pub from: Address,
    pub to: Address,
    /// Transfer amount; 1 for ERC-721
    pub amount: U256,
    pub token_id: Option<U256>,
    pub log_index: u64,
}

/// One decoded approval-related event
#[derive(Debug, Clone)]
pub enum ParsedApproval {
    Erc20 {
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
        log_index: u64,
    },
    Permit2 {
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
        log_index: u64,
    },
    /// ERC-721 single-token approve
    Erc721Approval {
        token: Address,
        owner: Address,
        spender: Address,
        token_id: U256,
        log_index: u64,
    },
    /// ApprovalForAll; ERC-721 and ERC-1155 share the event, so the
    /// standard tag is the caller's best knowledge of the collection
    ApprovalForAll {
        standard: NftStandard,
        token: Address,
        owner: Address,
        operator: Address,
        approved: bool,
        log_index: u64,
    },
}

impl ParsedApproval {
    /// Position of the originating event in the simulated log stream
    pub fn log_index(&self) -> u64 {
        match self {
            ParsedApproval::Erc20 { log_index, .. }
            | ParsedApproval::Permit2 { log_index, .. }
            | ParsedApproval::Erc721Approval { log_index, .. }
            | ParsedApproval::ApprovalForAll { log_index, .. } => *log_index,
        }
    }
}

/// All typed records decoded from one simulated transaction's log stream
#[derive(Debug, Clone, Default)]
pub struct ParsedLogs {
    pub transfers: Vec<ParsedTransfer>,
    pub approvals: Vec<ParsedApproval>,
}

/// Decode the full log stream of one simulated transaction
///
/// Unrecognized events are skipped. The position of each log in the stream
/// becomes its log index.
pub fn parse_simulation_logs(logs: &[Log]) -> ParsedLogs {
    let mut parsed = ParsedLogs::default();
    for (index, log) in logs.iter().enumerate() {
        let log_index = index as u64;
        if let Some(transfer) = parse_transfer(log, log_index) {
            parsed.transfers.push(transfer);
        } else if let Some(approval) = parse_approval(log, log_index) {
            parsed.approvals.push(approval);
        }
    }
    parsed
}

fn parse_transfer(log: &Log, log_index: u64) -> Option<ParsedTransfer> {
    let topics = log.data.topics();
    let signature = topics.first()?;

    if *signature == *TRANSFER_SIGNATURE {
        match topics.len() {
            // ERC-20: amount in the data section
            3 => {
                let amount = word(&log.data.data, 0)?;
                if amount.is_zero() {
                    return None;
                }
                Some(ParsedTransfer {
                    standard: TransferStandard::Erc20,
                    token: log.address,
                    from: topic_address(&topics[1]),
                    to: topic_address(&topics[2]),
                    amount,
                    token_id: None,
                    log_index,
                })
            }
            // ERC-721: token ID indexed as the fourth topic
            4 => Some(ParsedTransfer {
                standard: TransferStandard::Erc721,
                token: log.address,
                from: topic_address(&topics[1]),
                to: topic_address(&topics[2]),
                amount: U256::from(1u64),
                token_id: Some(U256::from_be_bytes(topics[3].0)),
                log_index,
            }),
            _ => None,
        }
    } else if *signature == *TRANSFER_SINGLE_SIGNATURE && topics.len() == 4 {
        let token_id = word(&log.data.data, 0)?;
        let amount = word(&log.data.data, 1)?;
        Some(ParsedTransfer {
            standard: TransferStandard::Erc1155,
            token: log.address,
            from: topic_address(&topics[2]),
            to: topic_address(&topics[3]),
            amount,
            token_id: Some(token_id),
            log_index,
        })
    } else {
        None
    }
}

fn parse_approval(log: &Log, log_index: u64) -> Option<ParsedApproval> {
    let topics = log.data.topics();
    let signature = topics.first()?;

    if *signature == *APPROVAL_SIGNATURE {
        match topics.len() {
            // ERC-20: amount in the data section; zero amounts are
            // revocations and are kept
            3 => Some(ParsedApproval::Erc20 {
                token: log.address,
                owner: topic_address(&topics[1]),
                spender: topic_address(&topics[2]),
                amount: word(&log.data.data, 0)?,
                log_index,
            }),
            // ERC-721 approve: token ID indexed as the fourth topic
            4 => Some(ParsedApproval::Erc721Approval {
                token: log.address,
                owner: topic_address(&topics[1]),
                spender: topic_address(&topics[2]),
                token_id: U256::from_be_bytes(topics[3].0),
                log_index,
            }),
            _ => None,
        }
    } else if *signature == *APPROVAL_FOR_ALL_SIGNATURE && topics.len() == 3 {
        Some(ParsedApproval::ApprovalForAll {
            standard: NftStandard::Erc721,
            token: log.address,
            owner: topic_address(&topics[1]),
            operator: topic_address(&topics[2]),
            approved: !word(&log.data.data, 0)?.is_zero(),
            log_index,
        })
    } else if *signature == *PERMIT2_APPROVAL_SIGNATURE
        && topics.len() == 4
        && log.address == PERMIT2_ADDRESS
    {
        Some(ParsedApproval::Permit2 {
            owner: topic_address(&topics[1]),
            token: topic_address(&topics[2]),
            spender: topic_address(&topics[3]),
            amount: word(&log.data.data, 0)?,
            log_index,
        })
    } else {
        None
    }
}

/// Address from the last 20 bytes of an indexed topic
fn topic_address(topic: &FixedBytes<32>) -> Address {
    Address::from_slice(&topic.as_slice()[12..])
}

/// The `n`-th 32-byte word of the data section
fn word(data: &[u8], n: usize) -> Option<U256> {
    let start = n * 32;
    let end = start + 32;
    if data.len() < end {
        return None;
    }
    Some(U256::from_be_slice(&data[start..end]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Bytes, LogData, B256};

    fn topic_from(addr: Address) -> B256 {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(addr.as_slice());
        B256::from(bytes)
    }

    fn amount_data(amount: U256) -> Bytes {
        Bytes::from(amount.to_be_bytes::<32>().to_vec())
    }

    fn make_log(emitter: Address, topics: Vec<B256>, data: Bytes) -> Log {
        Log {
            address: emitter,
            data: LogData::new_unchecked(topics, data),
        }
    }

    const TOKEN: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const ALICE: Address = address!("1111111111111111111111111111111111111111");
    const BOB: Address = address!("2222222222222222222222222222222222222222");

    #[test]
    fn decodes_erc20_transfer_and_approval() {
        let logs = vec![
            make_log(
                TOKEN,
                vec![*TRANSFER_SIGNATURE, topic_from(ALICE), topic_from(BOB)],
                amount_data(U256::from(77u64)),
            ),
            make_log(
                TOKEN,
                vec![*APPROVAL_SIGNATURE, topic_from(ALICE), topic_from(BOB)],
                amount_data(U256::ZERO),
            ),
        ];
        let parsed = parse_simulation_logs(&logs);

        assert_eq!(parsed.transfers.len(), 1);
        let transfer = &parsed.transfers[0];
        assert_eq!(transfer.standard, TransferStandard::Erc20);
        assert_eq!(transfer.amount, U256::from(77u64));
        assert_eq!(transfer.log_index, 0);

        // Zero-amount approvals are revocations and must be kept
        assert_eq!(parsed.approvals.len(), 1);
        match &parsed.approvals[0] {
            ParsedApproval::Erc20 { amount, log_index, .. } => {
                assert!(amount.is_zero());
                assert_eq!(*log_index, 1);
            }
            other => panic!("unexpected approval: {other:?}"),
        }
    }

    #[test]
    fn distinguishes_erc721_by_topic_arity() {
        let token_id = U256::from(123u64);
        let logs = vec![make_log(
            TOKEN,
            vec![
                *APPROVAL_SIGNATURE,
                topic_from(ALICE),
                topic_from(BOB),
                B256::from(token_id.to_be_bytes::<32>()),
            ],
            Bytes::new(),
        )];
        let parsed = parse_simulation_logs(&logs);

        match &parsed.approvals[0] {
            ParsedApproval::Erc721Approval { token_id: id, spender, .. } => {
                assert_eq!(*id, token_id);
                assert_eq!(*spender, BOB);
            }
            other => panic!("unexpected approval: {other:?}"),
        }
    }

    #[test]
    fn decodes_permit2_approval_from_indexed_token() {
        let mut data = U256::from(500u64).to_be_bytes::<32>().to_vec();
        data.extend_from_slice(&U256::ZERO.to_be_bytes::<32>());
        let logs = vec![make_log(
            PERMIT2_ADDRESS,
            vec![
                *PERMIT2_APPROVAL_SIGNATURE,
                topic_from(ALICE),
                topic_from(TOKEN),
                topic_from(BOB),
            ],
            Bytes::from(data),
        )];
        let parsed = parse_simulation_logs(&logs);

        match &parsed.approvals[0] {
            ParsedApproval::Permit2 { token, owner, spender, amount, .. } => {
                assert_eq!(*token, TOKEN);
                assert_eq!(*owner, ALICE);
                assert_eq!(*spender, BOB);
                assert_eq!(*amount, U256::from(500u64));
            }
            other => panic!("unexpected approval: {other:?}"),
        }
    }

    #[test]
    fn skips_zero_amount_erc20_transfers() {
        let logs = vec![make_log(
            TOKEN,
            vec![*TRANSFER_SIGNATURE, topic_from(ALICE), topic_from(BOB)],
            amount_data(U256::ZERO),
        )];
        assert!(parse_simulation_logs(&logs).transfers.is_empty());
    }
}
