#![allow(unexpected_cfgs)]

//! # Casier
//!
//! Per-owner locker for custodied assets:
//!  - fungible tokens and rule-enforced NFTs held in per-owner vaults,
//!    or settled through a pooled per-mint sink
//!  - a signed balance ledger per owner, append-only in arrival order
//!  - optimistic concurrency: every mutation must present the locker
//!    version it was built against
//!  - admin co-signature and a config-wide freeze switch

use anchor_lang::prelude::*;

pub mod custody;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;

pub use instructions::*;
pub use state::*;

declare_id!("FLoc9nBwGb2ayzVzb5GC9NttuPY3CxMhd4KDnApr79Ab");

#[program]
pub mod casier {
    use super::*;

    /// Deploy-time bootstrap, no state.
    pub fn initialize(ctx: Context<Initialize>) -> Result<()> {
        instructions::initialize(ctx)
    }

    /// Create the config; the fee payer becomes admin.
    pub fn init_config(ctx: Context<InitConfig>) -> Result<()> {
        instructions::init_config(ctx)
    }

    /// Freeze or unfreeze every locker mutation.
    pub fn set_frozen(ctx: Context<SetFrozen>, frozen: bool) -> Result<()> {
        instructions::set_frozen(ctx, frozen)
    }

    /// Create an empty locker at version zero.
    pub fn init_locker(ctx: Context<InitLocker>, max_entries: u16) -> Result<()> {
        instructions::init_locker(ctx, max_entries)
    }

    /// Grow a locker's entry capacity.
    pub fn resize_locker(ctx: Context<ResizeLocker>, max_entries: u16) -> Result<()> {
        instructions::resize_locker(ctx, max_entries)
    }

    /// Deposit a batch of assets, gated on `expected_version`.
    #[allow(clippy::too_many_arguments)]
    pub fn deposit_batch<'info>(
        ctx: Context<'_, '_, 'info, 'info, DepositBatch<'info>>,
        amounts: Vec<u64>,
        expected_version: u64,
        vault_bumps: Vec<u8>,
        sink_bumps: Vec<u8>,
        pnft_count: u8,
        use_sink: bool,
    ) -> Result<()> {
        instructions::deposit_batch(
            ctx,
            amounts,
            expected_version,
            vault_bumps,
            sink_bumps,
            pnft_count,
            use_sink,
        )
    }

    /// Withdraw a batch of assets, gated on `expected_version`.
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw_batch<'info>(
        ctx: Context<'_, '_, 'info, 'info, WithdrawBatch<'info>>,
        amounts: Vec<u64>,
        expected_version: u64,
        vault_bumps: Vec<u8>,
        sink_bumps: Vec<u8>,
        pnft_count: u8,
        use_sink: bool,
    ) -> Result<()> {
        instructions::withdraw_batch(
            ctx,
            amounts,
            expected_version,
            vault_bumps,
            sink_bumps,
            pnft_count,
            use_sink,
        )
    }

    /// Pass the gate and bump the version without moving tokens.
    pub fn increment_version(ctx: Context<IncrementVersion>, expected_version: u64) -> Result<()> {
        instructions::increment_version(ctx, expected_version)
    }
}
