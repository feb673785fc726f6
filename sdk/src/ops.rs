//! Batch operations and their instruction encoding.
//!
//! A [`Batch`] is the unit of atomicity: it is submitted as one
//! transaction and either every operation lands or none does.

use anchor_lang::prelude::{AccountMeta, Pubkey};
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::system_program;
use anchor_lang::{InstructionData, ToAccountMetas};
use mpl_core::instructions::{
    AddPluginV1Builder, ApprovePluginAuthorityV1Builder, RevokePluginAuthorityV1Builder,
    TransferV1Builder, UpdatePluginV1Builder,
};
use mpl_core::types::{PermanentFreezeDelegate, Plugin, PluginAuthority, PluginType, TransferDelegate};
use mpl_token_metadata::instructions::UnverifyCollectionV1Builder;

use crate::pda;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegKind {
    Fungible,
    RuleEnforcedNft,
}

/// Where a ledger instruction keeps or takes the tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Settlement {
    /// The owner's vault `[mint, owner]`; vault balance tracks the entry
    #[default]
    Vault,
    /// The pooled sink `[mint]`, shared by every owner
    Sink,
}

impl Settlement {
    pub fn uses_sink(self) -> bool {
        self == Settlement::Sink
    }
}

/// One asset moving through a ledger instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerLeg {
    pub mint: Pubkey,
    pub amount: u64,
    pub kind: LegKind,
    /// Owner of the vault used for this mint
    pub vault_owner: Pubkey,
    pub vault_bump: u8,
    pub sink_bump: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    InitLocker {
        owner: Pubkey,
        payer: Pubkey,
        max_entries: u16,
    },
    ResizeLocker {
        owner: Pubkey,
        max_entries: u16,
    },
    SetCollectibleFrozen {
        asset: Pubkey,
        collection: Pubkey,
        /// Collection update authority
        authority: Pubkey,
        payer: Pubkey,
        frozen: bool,
    },
    AddTransferDelegate {
        asset: Pubkey,
        collection: Pubkey,
        owner: Pubkey,
        delegate: Pubkey,
    },
    ApproveTransferDelegate {
        asset: Pubkey,
        collection: Pubkey,
        owner: Pubkey,
        delegate: Pubkey,
    },
    RevokeTransferDelegate {
        asset: Pubkey,
        collection: Pubkey,
        authority: Pubkey,
        payer: Pubkey,
    },
    TransferCollectible {
        asset: Pubkey,
        collection: Pubkey,
        authority: Pubkey,
        payer: Pubkey,
        new_owner: Pubkey,
    },
    UnverifyLegacyCollection {
        mint: Pubkey,
        collection_mint: Pubkey,
        authority: Pubkey,
    },
    DepositBatch {
        owner: Pubkey,
        admin: Pubkey,
        expected_version: u64,
        legs: Vec<LedgerLeg>,
        pnft_count: u8,
        settlement: Settlement,
        remaining: Vec<AccountMeta>,
    },
    WithdrawBatch {
        recipient: Pubkey,
        admin: Pubkey,
        expected_version: u64,
        legs: Vec<LedgerLeg>,
        pnft_count: u8,
        settlement: Settlement,
        remaining: Vec<AccountMeta>,
    },
    IncrementVersion {
        owner: Pubkey,
        admin: Pubkey,
        expected_version: u64,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::InitLocker { .. } => "init_locker",
            Operation::ResizeLocker { .. } => "resize_locker",
            Operation::SetCollectibleFrozen { .. } => "set_collectible_frozen",
            Operation::AddTransferDelegate { .. } => "add_transfer_delegate",
            Operation::ApproveTransferDelegate { .. } => "approve_transfer_delegate",
            Operation::RevokeTransferDelegate { .. } => "revoke_transfer_delegate",
            Operation::TransferCollectible { .. } => "transfer_collectible",
            Operation::UnverifyLegacyCollection { .. } => "unverify_legacy_collection",
            Operation::DepositBatch { .. } => "deposit_batch",
            Operation::WithdrawBatch { .. } => "withdraw_batch",
            Operation::IncrementVersion { .. } => "increment_version",
        }
    }

    /// Version the operation is gated on, for ledger operations.
    pub fn expected_version(&self) -> Option<u64> {
        match self {
            Operation::DepositBatch {
                expected_version, ..
            }
            | Operation::WithdrawBatch {
                expected_version, ..
            }
            | Operation::IncrementVersion {
                expected_version, ..
            } => Some(*expected_version),
            _ => None,
        }
    }

    pub fn signers(&self) -> Vec<Pubkey> {
        match self {
            Operation::InitLocker { payer, .. } => vec![*payer],
            Operation::ResizeLocker { owner, .. } => vec![*owner],
            Operation::SetCollectibleFrozen {
                authority, payer, ..
            }
            | Operation::RevokeTransferDelegate {
                authority, payer, ..
            }
            | Operation::TransferCollectible {
                authority, payer, ..
            } => vec![*payer, *authority],
            Operation::AddTransferDelegate { owner, .. }
            | Operation::ApproveTransferDelegate { owner, .. } => vec![*owner],
            Operation::UnverifyLegacyCollection { authority, .. } => vec![*authority],
            Operation::DepositBatch { owner, admin, .. } => vec![*owner, *admin],
            Operation::WithdrawBatch {
                recipient, admin, ..
            } => vec![*recipient, *admin],
            Operation::IncrementVersion { admin, .. } => vec![*admin],
        }
    }

    pub fn instruction(&self, program_id: &Pubkey) -> Instruction {
        match self {
            Operation::InitLocker {
                owner,
                payer,
                max_entries,
            } => Instruction {
                program_id: *program_id,
                accounts: casier::accounts::InitLocker {
                    locker: pda::locker_address(program_id, owner),
                    owner: *owner,
                    payer: *payer,
                    system_program: system_program::ID,
                }
                .to_account_metas(None),
                data: casier::instruction::InitLocker {
                    max_entries: *max_entries,
                }
                .data(),
            },
            Operation::ResizeLocker { owner, max_entries } => Instruction {
                program_id: *program_id,
                accounts: casier::accounts::ResizeLocker {
                    locker: pda::locker_address(program_id, owner),
                    owner: *owner,
                    system_program: system_program::ID,
                }
                .to_account_metas(None),
                data: casier::instruction::ResizeLocker {
                    max_entries: *max_entries,
                }
                .data(),
            },
            Operation::SetCollectibleFrozen {
                asset,
                collection,
                authority,
                payer,
                frozen,
            } => UpdatePluginV1Builder::new()
                .asset(*asset)
                .collection(Some(*collection))
                .payer(*payer)
                .authority(Some(*authority))
                .plugin(Plugin::PermanentFreezeDelegate(PermanentFreezeDelegate {
                    frozen: *frozen,
                }))
                .instruction(),
            Operation::AddTransferDelegate {
                asset,
                collection,
                owner,
                delegate,
            } => AddPluginV1Builder::new()
                .asset(*asset)
                .collection(Some(*collection))
                .payer(*owner)
                .authority(Some(*owner))
                .plugin(Plugin::TransferDelegate(TransferDelegate {}))
                .init_authority(PluginAuthority::Address { address: *delegate })
                .instruction(),
            Operation::ApproveTransferDelegate {
                asset,
                collection,
                owner,
                delegate,
            } => ApprovePluginAuthorityV1Builder::new()
                .asset(*asset)
                .collection(Some(*collection))
                .payer(*owner)
                .authority(Some(*owner))
                .plugin_type(PluginType::TransferDelegate)
                .new_authority(PluginAuthority::Address { address: *delegate })
                .instruction(),
            Operation::RevokeTransferDelegate {
                asset,
                collection,
                authority,
                payer,
            } => RevokePluginAuthorityV1Builder::new()
                .asset(*asset)
                .collection(Some(*collection))
                .payer(*payer)
                .authority(Some(*authority))
                .plugin_type(PluginType::TransferDelegate)
                .instruction(),
            Operation::TransferCollectible {
                asset,
                collection,
                authority,
                payer,
                new_owner,
            } => TransferV1Builder::new()
                .asset(*asset)
                .collection(Some(*collection))
                .payer(*payer)
                .authority(Some(*authority))
                .new_owner(*new_owner)
                .instruction(),
            Operation::UnverifyLegacyCollection {
                mint,
                collection_mint,
                authority,
            } => UnverifyCollectionV1Builder::new()
                .authority(*authority)
                .metadata(pda::metadata_address(mint))
                .collection_mint(*collection_mint)
                .collection_metadata(Some(pda::metadata_address(collection_mint)))
                .instruction(),
            Operation::DepositBatch {
                owner,
                admin,
                expected_version,
                legs,
                pnft_count,
                settlement,
                remaining,
            } => {
                let mut accounts = casier::accounts::DepositBatch {
                    config: pda::config_address(program_id),
                    locker: pda::locker_address(program_id, owner),
                    owner: *owner,
                    admin: *admin,
                    system_program: system_program::ID,
                    token_program: anchor_spl::token::ID,
                    associated_token_program: anchor_spl::associated_token::ID,
                }
                .to_account_metas(None);
                accounts.extend(remaining.iter().cloned());
                Instruction {
                    program_id: *program_id,
                    accounts,
                    data: casier::instruction::DepositBatch {
                        amounts: legs.iter().map(|l| l.amount).collect(),
                        expected_version: *expected_version,
                        vault_bumps: legs.iter().map(|l| l.vault_bump).collect(),
                        sink_bumps: legs.iter().map(|l| l.sink_bump).collect(),
                        pnft_count: *pnft_count,
                        use_sink: settlement.uses_sink(),
                    }
                    .data(),
                }
            }
            Operation::WithdrawBatch {
                recipient,
                admin,
                expected_version,
                legs,
                pnft_count,
                settlement,
                remaining,
            } => {
                let mut accounts = casier::accounts::WithdrawBatch {
                    config: pda::config_address(program_id),
                    locker: pda::locker_address(program_id, recipient),
                    recipient: *recipient,
                    admin: *admin,
                    system_program: system_program::ID,
                    token_program: anchor_spl::token::ID,
                    associated_token_program: anchor_spl::associated_token::ID,
                }
                .to_account_metas(None);
                accounts.extend(remaining.iter().cloned());
                Instruction {
                    program_id: *program_id,
                    accounts,
                    data: casier::instruction::WithdrawBatch {
                        amounts: legs.iter().map(|l| l.amount).collect(),
                        expected_version: *expected_version,
                        vault_bumps: legs.iter().map(|l| l.vault_bump).collect(),
                        sink_bumps: legs.iter().map(|l| l.sink_bump).collect(),
                        pnft_count: *pnft_count,
                        use_sink: settlement.uses_sink(),
                    }
                    .data(),
                }
            }
            Operation::IncrementVersion {
                owner,
                admin,
                expected_version,
            } => Instruction {
                program_id: *program_id,
                accounts: casier::accounts::IncrementVersion {
                    config: pda::config_address(program_id),
                    locker: pda::locker_address(program_id, owner),
                    admin: *admin,
                }
                .to_account_metas(None),
                data: casier::instruction::IncrementVersion {
                    expected_version: *expected_version,
                }
                .data(),
            },
        }
    }
}

/// Ordered operations for one owner, committed atomically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub program_id: Pubkey,
    /// Locker the batch is gated on
    pub locker_owner: Pubkey,
    pub ops: Vec<Operation>,
}

impl Batch {
    pub fn new(program_id: Pubkey, locker_owner: Pubkey) -> Self {
        Self {
            program_id,
            locker_owner,
            ops: Vec::new(),
        }
    }

    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Version the ledger operation was built against.
    pub fn expected_version(&self) -> Option<u64> {
        self.ops.iter().find_map(Operation::expected_version)
    }

    /// Every required signer, deduplicated in first-use order.
    pub fn signers(&self) -> Vec<Pubkey> {
        let mut out: Vec<Pubkey> = Vec::new();
        for key in self.ops.iter().flat_map(Operation::signers) {
            if !out.contains(&key) {
                out.push(key);
            }
        }
        out
    }

    pub fn instructions(&self) -> Vec<Instruction> {
        self.ops
            .iter()
            .map(|op| op.instruction(&self.program_id))
            .collect()
    }
}
