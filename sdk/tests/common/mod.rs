#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use anchor_lang::error::ErrorCode as AnchorErrorCode;
use anchor_lang::prelude::{AccountMeta, Pubkey};
use anchor_lang::solana_program::{system_program, sysvar};
use async_trait::async_trait;
use casier::errors::CasierError;
use casier::instructions::{
    check_batch_shape, DEPOSIT_ASSET_LEN, PNFT_COMPANION_LEN, PNFT_PREFIX_LEN, WITHDRAW_ASSET_LEN,
};
use casier::Locker;
use casier_sdk::pda;
use casier_sdk::{
    AccountReader, AssetDescriptor, AssetKind, Batch, BatchSubmitter, CollectibleInfo,
    CollectionDescriptor, DelegateAuthority, LegKind, LedgerLeg, Operation, SdkConfig, Settlement,
    SubmitError, UpdateAuthority,
};
use parking_lot::Mutex;

/// Custom code used for every rejected collectible operation.
pub const CORE_REJECTED: u32 = 0x1000;
/// SPL token "insufficient funds".
pub const TOKEN_INSUFFICIENT_FUNDS: u32 = 1;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("casier_sdk=debug")
        .with_test_writer()
        .try_init();
}

#[derive(Clone, Debug, Default)]
pub struct ChainState {
    pub assets: HashMap<Pubkey, AssetDescriptor>,
    pub collections: HashMap<Pubkey, CollectionDescriptor>,
    /// Keyed by locker address
    pub lockers: HashMap<Pubkey, Locker>,
    /// (mint, holder) -> amount. Wallets hold under their own key,
    /// sinks and vaults under their PDA.
    pub tokens: HashMap<(Pubkey, Pubkey), u64>,
    pub unverified: HashSet<Pubkey>,
    pub frozen_config: bool,
}

/// In-memory program runtime: reads like a chain and executes batches
/// atomically, applying ledger updates with the program's own locker
/// logic.
pub struct LocalChain {
    pub config: SdkConfig,
    state: Mutex<ChainState>,
    submitted: Mutex<Vec<Batch>>,
    collection_reads: AtomicUsize,
}

impl LocalChain {
    pub fn new() -> Self {
        Self::with_config(SdkConfig::new(Pubkey::new_unique()))
    }

    pub fn with_config(config: SdkConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ChainState::default()),
            submitted: Mutex::new(Vec::new()),
            collection_reads: AtomicUsize::new(0),
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.config.program_id
    }

    pub fn snapshot(&self) -> ChainState {
        self.state.lock().clone()
    }

    pub fn submitted(&self) -> usize {
        self.submitted.lock().len()
    }

    pub fn collection_reads(&self) -> usize {
        self.collection_reads.load(Ordering::SeqCst)
    }

    pub fn set_config_frozen(&self, frozen: bool) {
        self.state.lock().frozen_config = frozen;
    }

    // --- fixtures

    pub fn fungible(&self) -> Pubkey {
        let mint = Pubkey::new_unique();
        self.state
            .lock()
            .assets
            .insert(mint, AssetDescriptor::fungible(mint));
        mint
    }

    pub fn named_nft(&self, name: &str) -> Pubkey {
        let mint = Pubkey::new_unique();
        self.state.lock().assets.insert(
            mint,
            AssetDescriptor {
                address: mint,
                kind: AssetKind::Fungible,
                name: Some(name.to_string()),
            },
        );
        mint
    }

    pub fn pnft(&self) -> Pubkey {
        let mint = Pubkey::new_unique();
        self.state.lock().assets.insert(
            mint,
            AssetDescriptor {
                address: mint,
                kind: AssetKind::RuleEnforcedNft,
                name: Some("Relic".to_string()),
            },
        );
        mint
    }

    pub fn collection(&self) -> CollectionDescriptor {
        let collection = CollectionDescriptor {
            address: Pubkey::new_unique(),
            update_authority: Pubkey::new_unique(),
            name: "Hatchlings".to_string(),
        };
        self.state
            .lock()
            .collections
            .insert(collection.address, collection.clone());
        collection
    }

    pub fn collectible(&self, owner: Pubkey, update_authority: UpdateAuthority) -> Pubkey {
        let asset = Pubkey::new_unique();
        self.state.lock().assets.insert(
            asset,
            AssetDescriptor {
                address: asset,
                kind: AssetKind::Collectible(CollectibleInfo {
                    owner,
                    update_authority,
                    frozen: false,
                    transfer_delegate: None,
                }),
                name: Some("Hatchling #1".to_string()),
            },
        );
        asset
    }

    pub fn fund(&self, mint: Pubkey, holder: Pubkey, amount: u64) {
        *self.state.lock().tokens.entry((mint, holder)).or_default() += amount;
    }

    /// Puts tokens straight into an owner's vault, outside any batch.
    pub fn fund_vault(&self, mint: Pubkey, owner: Pubkey, amount: u64) {
        let (vault, _) = pda::vault_address(&self.config.program_id, &mint, &owner);
        self.fund(mint, vault, amount);
    }

    // --- inspection

    pub fn balance(&self, mint: &Pubkey, holder: &Pubkey) -> u64 {
        self.state
            .lock()
            .tokens
            .get(&(*mint, *holder))
            .copied()
            .unwrap_or(0)
    }

    pub fn sink_balance(&self, mint: &Pubkey) -> u64 {
        let (sink, _) = pda::sink_address(&self.config.program_id, mint);
        self.balance(mint, &sink)
    }

    pub fn vault_balance(&self, mint: &Pubkey, owner: &Pubkey) -> u64 {
        let (vault, _) = pda::vault_address(&self.config.program_id, mint, owner);
        self.balance(mint, &vault)
    }

    /// Whether the vault token account exists.
    pub fn vault_open(&self, mint: &Pubkey, owner: &Pubkey) -> bool {
        let (vault, _) = pda::vault_address(&self.config.program_id, mint, owner);
        self.state.lock().tokens.contains_key(&(*mint, vault))
    }

    pub fn stored_locker(&self, owner: &Pubkey) -> Option<Locker> {
        let address = pda::locker_address(&self.config.program_id, owner);
        self.state.lock().lockers.get(&address).cloned()
    }

    pub fn collectible_info(&self, asset: &Pubkey) -> CollectibleInfo {
        match self.state.lock().assets.get(asset).map(|a| a.kind.clone()) {
            Some(AssetKind::Collectible(info)) => info,
            other => panic!("{asset} is not a collectible: {other:?}"),
        }
    }

    pub fn is_unverified(&self, mint: &Pubkey) -> bool {
        self.state.lock().unverified.contains(mint)
    }
}

impl Default for LocalChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountReader for LocalChain {
    async fn asset(&self, address: &Pubkey) -> casier_sdk::Result<Option<AssetDescriptor>> {
        Ok(self.state.lock().assets.get(address).cloned())
    }

    async fn collection(&self, address: &Pubkey) -> casier_sdk::Result<Option<CollectionDescriptor>> {
        self.collection_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().collections.get(address).cloned())
    }

    async fn locker(&self, address: &Pubkey) -> casier_sdk::Result<Option<Locker>> {
        Ok(self.state.lock().lockers.get(address).cloned())
    }
}

#[async_trait]
impl BatchSubmitter for LocalChain {
    async fn submit(&self, batch: &Batch) -> Result<(), SubmitError> {
        let mut state = self.state.lock();
        let mut draft = state.clone();
        let exec = Executor {
            program_id: batch.program_id,
            admin: self.config.admin,
        };
        for (index, op) in batch.ops.iter().enumerate() {
            exec.apply(&mut draft, op)
                .map_err(|(program_id, code)| SubmitError::Program {
                    index,
                    program_id,
                    code,
                })?;
        }
        *state = draft;
        self.submitted.lock().push(batch.clone());
        Ok(())
    }
}

type Failure = (Pubkey, u32);

struct Executor {
    program_id: Pubkey,
    admin: Pubkey,
}

impl Executor {
    fn program_err(&self, err: anchor_lang::error::Error) -> Failure {
        let code = match err {
            anchor_lang::error::Error::AnchorError(e) => e.error_code_number,
            anchor_lang::error::Error::ProgramError(_) => u32::MAX,
        };
        (self.program_id, code)
    }

    fn casier(&self, err: CasierError) -> Failure {
        (self.program_id, u32::from(err))
    }

    fn core(&self) -> Failure {
        (mpl_core::ID, CORE_REJECTED)
    }

    fn apply(&self, state: &mut ChainState, op: &Operation) -> Result<(), Failure> {
        match op {
            Operation::InitLocker {
                owner, max_entries, ..
            } => {
                let address = pda::locker_address(&self.program_id, owner);
                if state.lockers.contains_key(&address) {
                    return Err((system_program::ID, 0));
                }
                state.lockers.insert(
                    address,
                    Locker {
                        owner: *owner,
                        max_entries: *max_entries,
                        ..Default::default()
                    },
                );
                Ok(())
            }
            Operation::ResizeLocker { owner, max_entries } => {
                let locker = self.locker_mut(state, owner)?;
                if (*max_entries as usize) < locker.entry_count() {
                    return Err(self.casier(CasierError::CannotShrinkLocker));
                }
                locker.max_entries = *max_entries;
                Ok(())
            }
            Operation::IncrementVersion {
                owner,
                admin,
                expected_version,
            } => {
                self.check_admin(state, admin)?;
                let locker = self.locker_mut(state, owner)?;
                locker.check_version(*expected_version).map_err(|e| self.program_err(e))?;
                locker.bump_version().map_err(|e| self.program_err(e))?;
                Ok(())
            }
            Operation::DepositBatch {
                owner,
                admin,
                expected_version,
                legs,
                pnft_count,
                settlement,
                remaining,
            } => {
                self.check_admin(state, admin)?;
                self.check_layout(legs, *pnft_count, remaining, DEPOSIT_ASSET_LEN, Some(owner))?;
                let mut locker = self.locker_mut(state, owner)?.clone();
                locker.check_version(*expected_version).map_err(|e| self.program_err(e))?;
                for leg in legs {
                    self.deposit_leg(state, owner, leg, *settlement)?;
                    locker.credit(leg.mint, leg.amount).map_err(|e| self.program_err(e))?;
                }
                locker.bump_version().map_err(|e| self.program_err(e))?;
                *self.locker_mut(state, owner)? = locker;
                Ok(())
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
                self.check_admin(state, admin)?;
                self.check_layout(legs, *pnft_count, remaining, WITHDRAW_ASSET_LEN, None)?;
                let mut locker = self.locker_mut(state, recipient)?.clone();
                locker.check_version(*expected_version).map_err(|e| self.program_err(e))?;
                for leg in legs {
                    self.withdraw_leg(state, recipient, leg, *settlement)?;
                    locker.debit(leg.mint, leg.amount).map_err(|e| self.program_err(e))?;
                }
                locker.bump_version().map_err(|e| self.program_err(e))?;
                *self.locker_mut(state, recipient)? = locker;
                Ok(())
            }
            Operation::SetCollectibleFrozen {
                asset,
                collection,
                authority,
                frozen,
                ..
            } => {
                let ua = state
                    .collections
                    .get(collection)
                    .map(|c| c.update_authority)
                    .ok_or(self.core())?;
                let info = self.collectible_mut(state, asset)?;
                if ua != *authority || info.collection() != Some(*collection) {
                    return Err(self.core());
                }
                info.frozen = *frozen;
                Ok(())
            }
            Operation::AddTransferDelegate {
                asset,
                owner,
                delegate,
                ..
            } => {
                let failure = self.core();
                let info = self.collectible_mut(state, asset)?;
                if info.owner != *owner || info.transfer_delegate.is_some() {
                    return Err(failure);
                }
                info.transfer_delegate = Some(DelegateAuthority::Address(*delegate));
                Ok(())
            }
            Operation::ApproveTransferDelegate {
                asset,
                owner,
                delegate,
                ..
            } => {
                let failure = self.core();
                let info = self.collectible_mut(state, asset)?;
                if info.owner != *owner || info.transfer_delegate.is_none() {
                    return Err(failure);
                }
                info.transfer_delegate = Some(DelegateAuthority::Address(*delegate));
                Ok(())
            }
            Operation::RevokeTransferDelegate {
                asset, authority, ..
            } => {
                let failure = self.core();
                let info = self.collectible_mut(state, asset)?;
                let allowed = info.owner == *authority
                    || info.transfer_delegate == Some(DelegateAuthority::Address(*authority));
                if !allowed {
                    return Err(failure);
                }
                info.transfer_delegate = Some(DelegateAuthority::Owner);
                Ok(())
            }
            Operation::TransferCollectible {
                asset,
                authority,
                new_owner,
                ..
            } => {
                let failure = self.core();
                let info = self.collectible_mut(state, asset)?;
                if !info.can_transfer(authority) {
                    return Err(failure);
                }
                info.owner = *new_owner;
                if info.transfer_delegate.is_some() {
                    info.transfer_delegate = Some(DelegateAuthority::Owner);
                }
                Ok(())
            }
            Operation::UnverifyLegacyCollection { mint, .. } => {
                if !state.unverified.insert(*mint) {
                    return Err((mpl_token_metadata::ID, CORE_REJECTED));
                }
                Ok(())
            }
        }
    }

    fn check_admin(&self, state: &ChainState, admin: &Pubkey) -> Result<(), Failure> {
        if state.frozen_config {
            return Err(self.casier(CasierError::ConfigFrozen));
        }
        if *admin != self.admin {
            return Err(self.program_err(AnchorErrorCode::ConstraintHasOne.into()));
        }
        Ok(())
    }

    fn locker_mut<'s>(&self, state: &'s mut ChainState, owner: &Pubkey) -> Result<&'s mut Locker, Failure> {
        let address = pda::locker_address(&self.program_id, owner);
        match state.lockers.get_mut(&address) {
            Some(l) => Ok(l),
            None => Err((self.program_id, AnchorErrorCode::AccountNotInitialized as u32)),
        }
    }

    fn collectible_mut<'s>(
        &self,
        state: &'s mut ChainState,
        asset: &Pubkey,
    ) -> Result<&'s mut CollectibleInfo, Failure> {
        match state.assets.get_mut(asset).map(|a| &mut a.kind) {
            Some(AssetKind::Collectible(info)) => Ok(info),
            _ => Err((mpl_core::ID, CORE_REJECTED)),
        }
    }

    /// Walks the remaining accounts the way the ledger handlers do.
    /// `vault_owner` is the depositor; withdrawals name it per asset.
    fn check_layout(
        &self,
        legs: &[LedgerLeg],
        pnft_count: u8,
        remaining: &[AccountMeta],
        per_asset: usize,
        vault_owner: Option<&Pubkey>,
    ) -> Result<(), Failure> {
        check_batch_shape(
            remaining.len(),
            legs.len(),
            legs.len(),
            legs.len(),
            pnft_count,
            per_asset,
        )
        .map_err(|e| self.program_err(e))?;

        let mut cursor = 0;
        if pnft_count > 0 {
            if remaining[0].pubkey != mpl_token_metadata::ID
                || remaining[1].pubkey != sysvar::instructions::ID
            {
                return Err((mpl_token_metadata::ID, CORE_REJECTED));
            }
            cursor = PNFT_PREFIX_LEN;
        }
        for (i, leg) in legs.iter().enumerate() {
            let mint = remaining[cursor].pubkey;
            let vault_owner = match vault_owner {
                Some(owner) => *owner,
                None => remaining[cursor + 3].pubkey,
            };
            // vault sits third in both layouts, sink last
            let sink_at = per_asset - 1;
            let (vault, vault_bump) = pda::vault_address(&self.program_id, &mint, &vault_owner);
            let (sink, sink_bump) = pda::sink_address(&self.program_id, &mint);
            if mint != leg.mint
                || remaining[cursor + 2].pubkey != vault
                || leg.vault_bump != vault_bump
                || leg.vault_owner != vault_owner
            {
                return Err(self.casier(CasierError::InvalidVault));
            }
            if remaining[cursor + sink_at].pubkey != sink || leg.sink_bump != sink_bump {
                return Err(self.casier(CasierError::InvalidSink));
            }
            cursor += per_asset;

            let as_pnft = i < pnft_count as usize;
            if as_pnft != (leg.kind == LegKind::RuleEnforcedNft) {
                return Err((mpl_token_metadata::ID, CORE_REJECTED));
            }
            if as_pnft {
                if remaining[cursor].pubkey != pda::metadata_address(&mint) {
                    return Err((mpl_token_metadata::ID, CORE_REJECTED));
                }
                cursor += PNFT_COMPANION_LEN;
            }
        }
        Ok(())
    }

    fn sweep(&self, state: &mut ChainState, mint: &Pubkey, vault_owner: &Pubkey, sink: &Pubkey) {
        let (vault, _) = pda::vault_address(&self.program_id, mint, vault_owner);
        if let Some(residue) = state.tokens.remove(&(*mint, vault)) {
            *state.tokens.entry((*mint, *sink)).or_default() += residue;
        }
    }

    fn deposit_leg(
        &self,
        state: &mut ChainState,
        owner: &Pubkey,
        leg: &LedgerLeg,
        settlement: Settlement,
    ) -> Result<(), Failure> {
        let (vault, _) = pda::vault_address(&self.program_id, &leg.mint, owner);
        let (sink, _) = pda::sink_address(&self.program_id, &leg.mint);
        let custody = match settlement {
            Settlement::Vault => vault,
            Settlement::Sink => sink,
        };
        let held = state.tokens.get(&(leg.mint, *owner)).copied().unwrap_or(0);
        if held < leg.amount {
            return Err((anchor_spl::token::ID, TOKEN_INSUFFICIENT_FUNDS));
        }
        state.tokens.insert((leg.mint, *owner), held - leg.amount);
        *state.tokens.entry((leg.mint, custody)).or_default() += leg.amount;
        if settlement == Settlement::Sink && leg.kind == LegKind::Fungible {
            self.sweep(state, &leg.mint, owner, &sink);
        }
        Ok(())
    }

    fn withdraw_leg(
        &self,
        state: &mut ChainState,
        recipient: &Pubkey,
        leg: &LedgerLeg,
        settlement: Settlement,
    ) -> Result<(), Failure> {
        let (vault, _) = pda::vault_address(&self.program_id, &leg.mint, &leg.vault_owner);
        let (sink, _) = pda::sink_address(&self.program_id, &leg.mint);
        let source = match settlement {
            Settlement::Vault => vault,
            Settlement::Sink => {
                if leg.kind == LegKind::Fungible {
                    self.sweep(state, &leg.mint, &leg.vault_owner, &sink);
                }
                sink
            }
        };
        let held = state.tokens.get(&(leg.mint, source)).copied().unwrap_or(0);
        if held < leg.amount {
            return Err(self.casier(CasierError::InsufficientFunds));
        }
        let left = held - leg.amount;
        if settlement == Settlement::Vault && leg.kind == LegKind::Fungible && left == 0 {
            state.tokens.remove(&(leg.mint, source));
        } else if state.tokens.contains_key(&(leg.mint, source)) || left > 0 {
            state.tokens.insert((leg.mint, source), left);
        }
        *state.tokens.entry((leg.mint, *recipient)).or_default() += leg.amount;
        Ok(())
    }
}
