//! Deposit and withdraw batch construction.
//!
//! Every batch has the same shape:
//!  1. locker preparation (init or resize), when needed
//!  2. collectible custody operations, one group per collectible
//!  3. exactly one gated ledger operation: a deposit or withdraw carrying
//!     the non-collectible assets, or a bare version increment when the
//!     batch holds collectibles only

use std::collections::HashMap;
use std::sync::Arc;

use anchor_lang::prelude::{AccountMeta, Pubkey};
use anchor_lang::solana_program::sysvar;
use futures::stream::{self, TryStreamExt};
use tracing::{debug, info};

use crate::asset::{AssetKind, CollectibleInfo, CollectionDescriptor, DelegateAuthority};
use crate::classify::{self, Classification, ClassifiedAsset};
use crate::config::{MigrationConfig, SdkConfig};
use crate::error::{Result, SdkError};
use crate::ledger::{self, LockerSnapshot};
use crate::migration::{legacy_number, MigrationLookup};
use crate::ops::{Batch, LedgerLeg, LegKind, Operation, Settlement};
use crate::pda;
use crate::reader::AccountReader;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DepositRequest {
    pub owner: Pubkey,
    pub mints: Vec<Pubkey>,
    pub amounts: Vec<u64>,
    /// Pays for locker creation, defaults to the owner
    pub payer: Option<Pubkey>,
    /// Mints created earlier in the same transaction
    pub created_mints: Vec<Pubkey>,
    /// Owner's vault by default, the pooled sink on request
    pub settlement: Settlement,
}

impl DepositRequest {
    pub fn new(owner: Pubkey, mints: Vec<Pubkey>, amounts: Vec<u64>) -> Self {
        Self {
            owner,
            mints,
            amounts,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WithdrawRequest {
    pub recipient: Pubkey,
    pub mints: Vec<Pubkey>,
    pub amounts: Vec<u64>,
    /// Owner of the legacy vault swept for each mint, positional with
    /// `mints`. Empty means the recipient for every mint.
    pub vault_owners: Vec<Pubkey>,
    pub created_mints: Vec<Pubkey>,
    pub settlement: Settlement,
}

impl WithdrawRequest {
    pub fn new(recipient: Pubkey, mints: Vec<Pubkey>, amounts: Vec<u64>) -> Self {
        Self {
            recipient,
            mints,
            amounts,
            ..Default::default()
        }
    }
}

/// Migration settings plus the tables that drive them.
#[derive(Clone)]
pub struct Migration {
    pub config: MigrationConfig,
    pub lookup: Arc<dyn MigrationLookup>,
}

pub struct BatchBuilder<'a, R: ?Sized> {
    reader: &'a R,
    config: &'a SdkConfig,
    migration: Option<&'a Migration>,
}

impl<'a, R: AccountReader + ?Sized> BatchBuilder<'a, R> {
    pub fn new(reader: &'a R, config: &'a SdkConfig) -> Self {
        Self {
            reader,
            config,
            migration: None,
        }
    }

    pub fn with_migration(mut self, migration: Option<&'a Migration>) -> Self {
        self.migration = migration;
        self
    }

    pub async fn deposit(&self, req: &DepositRequest) -> Result<Batch> {
        classify::check_request(&req.mints, &req.amounts)?;
        let payer = req.payer.unwrap_or(req.owner);

        let (classified, snapshot) = futures::try_join!(
            classify::classify(self.reader, &req.mints, &req.amounts, &req.created_mints),
            ledger::read_locker(self.reader, &self.config.program_id, &req.owner),
        )?;

        if let Some(batch) = self.legacy_migration(req, &classified, &snapshot, &payer).await? {
            return Ok(batch);
        }

        let mut batch = Batch::new(self.config.program_id, req.owner);
        batch.ops.extend(ledger::prepare_locker(
            &snapshot,
            &payer,
            self.config.locker_capacity,
            incoming(&classified),
        )?);
        batch
            .ops
            .extend(self.custody_ops(&classified, &req.owner, Direction::Deposit).await?);

        let legs = self.legs(&classified, |_| req.owner);
        let version = snapshot.version();
        batch.push(if legs.is_empty() {
            Operation::IncrementVersion {
                owner: req.owner,
                admin: self.config.admin,
                expected_version: version,
            }
        } else {
            let pnft_count = pnft_count(&classified)?;
            Operation::DepositBatch {
                owner: req.owner,
                admin: self.config.admin,
                expected_version: version,
                remaining: deposit_accounts(
                    &self.config.program_id,
                    &req.owner,
                    &legs,
                    req.settlement,
                ),
                legs,
                pnft_count,
                settlement: req.settlement,
            }
        });

        info!(
            owner = %req.owner,
            version,
            ops = batch.len(),
            collectibles = classified.counts.collectibles,
            settlement = ?req.settlement,
            "built deposit batch"
        );
        Ok(batch)
    }

    pub async fn withdraw(&self, req: &WithdrawRequest) -> Result<Batch> {
        classify::check_request(&req.mints, &req.amounts)?;
        if !req.vault_owners.is_empty() && req.vault_owners.len() != req.mints.len() {
            return Err(SdkError::VaultOwnerMismatch {
                assets: req.mints.len(),
                vault_owners: req.vault_owners.len(),
            });
        }

        let (classified, snapshot) = futures::try_join!(
            classify::classify(self.reader, &req.mints, &req.amounts, &req.created_mints),
            ledger::read_locker(self.reader, &self.config.program_id, &req.recipient),
        )?;

        let mut batch = Batch::new(self.config.program_id, req.recipient);
        batch.ops.extend(ledger::prepare_locker(
            &snapshot,
            &req.recipient,
            self.config.locker_capacity,
            incoming(&classified),
        )?);
        batch
            .ops
            .extend(self.custody_ops(&classified, &req.recipient, Direction::Withdraw).await?);

        let legs = self.legs(&classified, |asset| {
            req.vault_owners
                .get(asset.index)
                .copied()
                .unwrap_or(req.recipient)
        });
        let version = snapshot.version();
        batch.push(if legs.is_empty() {
            Operation::IncrementVersion {
                owner: req.recipient,
                admin: self.config.admin,
                expected_version: version,
            }
        } else {
            let pnft_count = pnft_count(&classified)?;
            Operation::WithdrawBatch {
                recipient: req.recipient,
                admin: self.config.admin,
                expected_version: version,
                remaining: withdraw_accounts(
                    &self.config.program_id,
                    &req.recipient,
                    &legs,
                    req.settlement,
                ),
                legs,
                pnft_count,
                settlement: req.settlement,
            }
        });

        info!(
            recipient = %req.recipient,
            version,
            ops = batch.len(),
            collectibles = classified.counts.collectibles,
            settlement = ?req.settlement,
            "built withdraw batch"
        );
        Ok(batch)
    }

    fn legs(
        &self,
        classified: &Classification,
        vault_owner: impl Fn(&ClassifiedAsset) -> Pubkey,
    ) -> Vec<LedgerLeg> {
        let program_id = &self.config.program_id;
        classified
            .ledger_assets()
            .map(|asset| {
                let owner = vault_owner(asset);
                LedgerLeg {
                    mint: asset.mint,
                    amount: asset.amount,
                    kind: match asset.kind {
                        AssetKind::RuleEnforcedNft => LegKind::RuleEnforcedNft,
                        _ => LegKind::Fungible,
                    },
                    vault_owner: owner,
                    vault_bump: pda::vault_address(program_id, &asset.mint, &owner).1,
                    sink_bump: pda::sink_address(program_id, &asset.mint).1,
                }
            })
            .collect()
    }

    /// Collection lookups are cached for the duration of one batch.
    async fn collection_for(
        &self,
        asset: &Pubkey,
        info: &CollectibleInfo,
        cache: &mut HashMap<Pubkey, CollectionDescriptor>,
    ) -> Result<CollectionDescriptor> {
        let address = info.collection().ok_or(SdkError::NotInCollection(*asset))?;
        if let Some(hit) = cache.get(&address) {
            return Ok(hit.clone());
        }
        let collection = self
            .reader
            .collection(&address)
            .await?
            .ok_or(SdkError::CollectionNotFound {
                asset: *asset,
                collection: address,
            })?;
        cache.insert(address, collection.clone());
        Ok(collection)
    }

    /// One group of custody operations per collectible, folded in
    /// classification order.
    async fn custody_ops(
        &self,
        classified: &Classification,
        holder: &Pubkey,
        direction: Direction,
    ) -> Result<Vec<Operation>> {
        let custody = &self.config.custody_authority;
        let (_, ops) = stream::iter(classified.collectibles().map(Ok::<_, SdkError>))
            .try_fold(
                (HashMap::new(), Vec::new()),
                |(mut cache, mut ops), asset| async move {
                    let AssetKind::Collectible(info) = &asset.kind else {
                        return Ok((cache, ops));
                    };
                    let collection = self.collection_for(&asset.mint, info, &mut cache).await?;
                    let group = match direction {
                        Direction::Deposit => {
                            lock_collectible(asset.mint, info, &collection, holder, custody)
                        }
                        Direction::Withdraw => {
                            release_collectible(asset.mint, info, &collection, holder, custody)
                        }
                    };
                    debug!(asset = %asset.mint, ops = group.len(), ?direction, "collectible custody");
                    ops.extend(group);
                    Ok((cache, ops))
                },
            )
            .await?;
        Ok(ops)
    }

    /// A single legacy item is exchanged for its registered replacement
    /// instead of entering the ledger.
    async fn legacy_migration(
        &self,
        req: &DepositRequest,
        classified: &Classification,
        snapshot: &LockerSnapshot,
        payer: &Pubkey,
    ) -> Result<Option<Batch>> {
        let Some(migration) = self.migration else {
            return Ok(None);
        };
        let [asset] = classified.assets.as_slice() else {
            return Ok(None);
        };
        if asset.created || asset.kind.is_collectible() {
            return Ok(None);
        }
        let Some(name) = asset.name.as_deref() else {
            return Ok(None);
        };
        let Some(number) = legacy_number(name) else {
            return Ok(None);
        };
        if asset.amount != 1 {
            return Err(SdkError::InvalidCollectibleAmount {
                asset: asset.mint,
                amount: asset.amount,
            });
        }

        let (sequence, replacement) = migration.lookup.replacement_for(&asset.mint).ok_or_else(|| {
            SdkError::LegacyMappingMissing {
                asset: asset.mint,
                name: name.to_string(),
            }
        })?;
        let descriptor = self
            .reader
            .asset(&replacement)
            .await?
            .ok_or(SdkError::AssetNotFound(replacement))?;
        let info = descriptor
            .collectible()
            .ok_or(SdkError::ReplacementNotCollectible(replacement))?;
        let collection = self
            .collection_for(&replacement, info, &mut HashMap::new())
            .await?;

        let owner = req.owner;
        let mut batch = Batch::new(self.config.program_id, owner);
        batch
            .ops
            .extend(ledger::prepare_locker(
                snapshot,
                payer,
                self.config.locker_capacity,
                std::iter::empty(),
            )?);
        batch.push(Operation::UnverifyLegacyCollection {
            mint: asset.mint,
            collection_mint: migration.config.legacy_collection,
            authority: migration.config.legacy_authority,
        });
        batch.push(Operation::TransferCollectible {
            asset: replacement,
            collection: collection.address,
            authority: migration.config.treasury,
            payer: owner,
            new_owner: owner,
        });

        // the transfer resets the delegate, so lock as the new owner
        let transferred = CollectibleInfo {
            owner,
            transfer_delegate: info.transfer_delegate.map(|_| DelegateAuthority::Owner),
            ..info.clone()
        };
        batch.ops.extend(lock_collectible(
            replacement,
            &transferred,
            &collection,
            &owner,
            &self.config.custody_authority,
        ));
        batch.push(Operation::IncrementVersion {
            owner,
            admin: self.config.admin,
            expected_version: snapshot.version(),
        });

        info!(
            %owner,
            legacy = %asset.mint,
            number,
            sequence,
            %replacement,
            "built legacy migration batch"
        );
        Ok(Some(batch))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Deposit,
    Withdraw,
}

/// Mints that may open a ledger entry.
fn incoming(classified: &Classification) -> Vec<&Pubkey> {
    classified
        .ledger_assets()
        .filter(|a| a.amount > 0)
        .map(|a| &a.mint)
        .collect()
}

fn pnft_count(classified: &Classification) -> Result<u8> {
    let count = classified.counts.rule_enforced;
    u8::try_from(count).map_err(|_| SdkError::TooManyAssets {
        kind: "rule-enforced",
        count,
    })
}

/// Freeze in place and hand transfer authority to custody.
fn lock_collectible(
    asset: Pubkey,
    info: &CollectibleInfo,
    collection: &CollectionDescriptor,
    owner: &Pubkey,
    custody: &Pubkey,
) -> Vec<Operation> {
    let mut ops = vec![Operation::SetCollectibleFrozen {
        asset,
        collection: collection.address,
        authority: collection.update_authority,
        payer: *owner,
        frozen: true,
    }];
    match info.transfer_delegate {
        None => ops.push(Operation::AddTransferDelegate {
            asset,
            collection: collection.address,
            owner: *owner,
            delegate: *custody,
        }),
        Some(DelegateAuthority::Address(a)) if a == *custody => {}
        Some(_) => ops.push(Operation::ApproveTransferDelegate {
            asset,
            collection: collection.address,
            owner: *owner,
            delegate: *custody,
        }),
    }
    ops
}

/// Unfreeze, then either hand the asset to a new recipient or give
/// transfer authority back to its current owner.
fn release_collectible(
    asset: Pubkey,
    info: &CollectibleInfo,
    collection: &CollectionDescriptor,
    recipient: &Pubkey,
    custody: &Pubkey,
) -> Vec<Operation> {
    let mut ops = vec![Operation::SetCollectibleFrozen {
        asset,
        collection: collection.address,
        authority: collection.update_authority,
        payer: *recipient,
        frozen: false,
    }];
    if info.owner != *recipient {
        ops.push(Operation::TransferCollectible {
            asset,
            collection: collection.address,
            authority: *custody,
            payer: *recipient,
            new_owner: *recipient,
        });
    } else if matches!(info.transfer_delegate, Some(DelegateAuthority::Address(_))) {
        ops.push(Operation::RevokeTransferDelegate {
            asset,
            collection: collection.address,
            authority: *custody,
            payer: *recipient,
        });
    }
    ops
}

fn pnft_prefix(legs: &[LedgerLeg]) -> Vec<AccountMeta> {
    if legs.iter().any(|l| l.kind == LegKind::RuleEnforcedNft) {
        vec![
            AccountMeta::new_readonly(mpl_token_metadata::ID, false),
            AccountMeta::new_readonly(sysvar::instructions::ID, false),
        ]
    } else {
        Vec::new()
    }
}

/// Token account holding custody of `mint` for a leg.
fn custody_account(program_id: &Pubkey, mint: &Pubkey, vault_owner: &Pubkey, settlement: Settlement) -> Pubkey {
    match settlement {
        Settlement::Vault => pda::vault_address(program_id, mint, vault_owner).0,
        Settlement::Sink => pda::sink_address(program_id, mint).0,
    }
}

/// Remaining accounts for a deposit: the pNFT prefix, then per asset
/// `[mint, owner_ta, vault, sink]` and, for pNFTs, `[metadata,
/// owner_token_record, custody_token_record, edition]`.
pub fn deposit_accounts(
    program_id: &Pubkey,
    owner: &Pubkey,
    legs: &[LedgerLeg],
    settlement: Settlement,
) -> Vec<AccountMeta> {
    let mut metas = pnft_prefix(legs);
    for leg in legs {
        let owner_ta = pda::wallet_token_address(owner, &leg.mint);
        let (vault, _) = pda::vault_address(program_id, &leg.mint, owner);
        let (sink, _) = pda::sink_address(program_id, &leg.mint);
        metas.extend([
            AccountMeta::new(leg.mint, false),
            AccountMeta::new(owner_ta, false),
            AccountMeta::new(vault, false),
            AccountMeta::new(sink, false),
        ]);
        if leg.kind == LegKind::RuleEnforcedNft {
            let custody = custody_account(program_id, &leg.mint, owner, settlement);
            metas.extend([
                AccountMeta::new(pda::metadata_address(&leg.mint), false),
                AccountMeta::new(pda::token_record_address(&leg.mint, &owner_ta), false),
                AccountMeta::new(pda::token_record_address(&leg.mint, &custody), false),
                AccountMeta::new_readonly(pda::edition_address(&leg.mint), false),
            ]);
        }
    }
    metas
}

/// Remaining accounts for a withdraw: the pNFT prefix, then per asset
/// `[mint, recipient_ta, vault, vault_owner, sink]` and, for pNFTs,
/// `[metadata, custody_token_record, recipient_token_record, edition]`.
pub fn withdraw_accounts(
    program_id: &Pubkey,
    recipient: &Pubkey,
    legs: &[LedgerLeg],
    settlement: Settlement,
) -> Vec<AccountMeta> {
    let mut metas = pnft_prefix(legs);
    for leg in legs {
        let recipient_ta = pda::wallet_token_address(recipient, &leg.mint);
        let (vault, _) = pda::vault_address(program_id, &leg.mint, &leg.vault_owner);
        let (sink, _) = pda::sink_address(program_id, &leg.mint);
        metas.extend([
            AccountMeta::new(leg.mint, false),
            AccountMeta::new(recipient_ta, false),
            AccountMeta::new(vault, false),
            AccountMeta::new(leg.vault_owner, false),
            AccountMeta::new(sink, false),
        ]);
        if leg.kind == LegKind::RuleEnforcedNft {
            let custody = custody_account(program_id, &leg.mint, &leg.vault_owner, settlement);
            metas.extend([
                AccountMeta::new(pda::metadata_address(&leg.mint), false),
                AccountMeta::new(pda::token_record_address(&leg.mint, &custody), false),
                AccountMeta::new(pda::token_record_address(&leg.mint, &recipient_ta), false),
                AccountMeta::new_readonly(pda::edition_address(&leg.mint), false),
            ]);
        }
    }
    metas
}
