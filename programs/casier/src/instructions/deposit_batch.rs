use anchor_lang::prelude::*;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::Token;

use crate::custody::{self, PnftAccounts};
use crate::errors::CasierError;
use crate::events::LockerUpdated;
use crate::instructions::{check_batch_shape, PNFT_COMPANION_LEN, PNFT_PREFIX_LEN};
use crate::state::{Config, Locker, CONFIG_SEED};

/// mint, owner token account, vault, sink
pub const DEPOSIT_ASSET_LEN: usize = 4;

/// Moves every asset of the batch from the owner into custody and
/// credits the owner's locker.
///
/// Custody is the owner's vault `[mint, owner]`, created on first use. With
/// `use_sink` the assets go to the pooled sink `[mint]` instead, and any
/// vault balance the owner still has for the mint is swept along.
///
/// Remaining accounts: the pNFT prefix (only when `pnft_count > 0`), then
/// per asset `[mint, owner_ta, vault, sink]`, followed for the first
/// `pnft_count` assets by `[metadata, owner_token_record,
/// custody_token_record, edition]`.
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
    let remaining = ctx.remaining_accounts;
    check_batch_shape(
        remaining.len(),
        amounts.len(),
        vault_bumps.len(),
        sink_bumps.len(),
        pnft_count,
        DEPOSIT_ASSET_LEN,
    )?;

    let owner_info = ctx.accounts.owner.to_account_info();
    let owner_key = owner_info.key();
    let system_program = ctx.accounts.system_program.to_account_info();
    let token_program = ctx.accounts.token_program.to_account_info();
    let associated_token_program = ctx.accounts.associated_token_program.to_account_info();

    let locker = &mut ctx.accounts.locker;
    locker.check_version(expected_version)?;

    let mut cursor = 0usize;
    let prefix = if pnft_count > 0 {
        let p = (&remaining[0], &remaining[1]);
        cursor = PNFT_PREFIX_LEN;
        Some(p)
    } else {
        None
    };

    for (i, amount) in amounts.iter().copied().enumerate() {
        let mint = &remaining[cursor];
        let owner_ta = &remaining[cursor + 1];
        let vault = &remaining[cursor + 2];
        let sink = &remaining[cursor + 3];
        cursor += DEPOSIT_ASSET_LEN;

        let mint_key = mint.key();
        custody::verify_vault(vault, &mint_key, &owner_key, vault_bumps[i])?;
        custody::verify_sink(sink, &mint_key, sink_bumps[i])?;

        let vault_bump = [vault_bumps[i]];
        let vault_seeds: [&[u8]; 3] = [mint_key.as_ref(), owner_key.as_ref(), &vault_bump];
        let sink_bump = [sink_bumps[i]];
        let sink_seeds: [&[u8]; 2] = [mint_key.as_ref(), &sink_bump];
        let (custody_ta, custody_seeds) = if use_sink {
            (sink, &sink_seeds[..])
        } else {
            (vault, &vault_seeds[..])
        };
        custody::ensure_pda_token_account(
            custody_ta,
            mint,
            &owner_info,
            custody_seeds,
            &system_program,
            &token_program,
        )?;

        match prefix {
            Some((token_metadata_program, sysvar_instructions)) if i < pnft_count as usize => {
                let companions = &remaining[cursor..cursor + PNFT_COMPANION_LEN];
                cursor += PNFT_COMPANION_LEN;
                let pnft = PnftAccounts {
                    metadata: &companions[0],
                    source_token_record: &companions[1],
                    destination_token_record: &companions[2],
                    edition: &companions[3],
                    token_metadata_program,
                    sysvar_instructions,
                };
                custody::transfer_pnft(
                    &pnft,
                    mint,
                    owner_ta,
                    &owner_info,
                    custody_ta,
                    custody_ta,
                    &owner_info,
                    &system_program,
                    &token_program,
                    &associated_token_program,
                    amount,
                    &[],
                )?;
            }
            _ => {
                custody::transfer_from_owner(owner_ta, custody_ta, &owner_info, amount, &token_program)?;

                if use_sink {
                    let swept =
                        custody::sweep_vault(vault, sink, &owner_info, &vault_seeds, &token_program)?;
                    if swept > 0 {
                        msg!("[casier] swept {} from vault {}", swept, vault.key());
                    }
                }
            }
        }

        let balance = locker.credit(mint_key, amount)?;
        msg!(
            "[casier] deposit mint={} amount={} balance={} sink={}",
            mint_key,
            amount,
            balance,
            use_sink
        );
    }

    let version = locker.bump_version()?;
    emit!(LockerUpdated {
        owner: locker.owner,
        version,
        entries: locker.entry_count() as u16,
    });
    Ok(())
}

#[derive(Accounts)]
pub struct DepositBatch<'info> {
    #[account(
        seeds = [CONFIG_SEED],
        bump,
        has_one = admin,
        constraint = !config.is_frozen @ CasierError::ConfigFrozen
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [owner.key().as_ref()],
        bump,
        has_one = owner
    )]
    pub locker: Account<'info, Locker>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub admin: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
}
