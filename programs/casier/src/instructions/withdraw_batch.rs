use anchor_lang::prelude::*;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::Token;

use crate::custody::{self, PnftAccounts};
use crate::errors::CasierError;
use crate::events::LockerUpdated;
use crate::instructions::{check_batch_shape, PNFT_COMPANION_LEN, PNFT_PREFIX_LEN};
use crate::state::{Config, Locker, CONFIG_SEED};

/// mint, recipient token account, vault, vault owner, sink
pub const WITHDRAW_ASSET_LEN: usize = 5;

/// Pays every asset of the batch out of custody to the recipient and
/// debits the recipient's locker.
///
/// Custody is the vault `[mint, vault_owner]`, closed to its owner once
/// emptied. With `use_sink` the pooled sink `[mint]` pays instead, after
/// the vault balance is swept into it. Only the sink can take an entry
/// below zero; the admin co-signature is what authorizes that settlement.
///
/// Remaining accounts: the pNFT prefix (only when `pnft_count > 0`), then
/// per asset `[mint, recipient_ta, vault, vault_owner, sink]`, followed
/// for the first `pnft_count` assets by `[metadata, custody_token_record,
/// recipient_token_record, edition]`.
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
    let remaining = ctx.remaining_accounts;
    check_batch_shape(
        remaining.len(),
        amounts.len(),
        vault_bumps.len(),
        sink_bumps.len(),
        pnft_count,
        WITHDRAW_ASSET_LEN,
    )?;

    let recipient = ctx.accounts.recipient.to_account_info();
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
        let recipient_ta = &remaining[cursor + 1];
        let vault = &remaining[cursor + 2];
        let vault_owner = &remaining[cursor + 3];
        let sink = &remaining[cursor + 4];
        cursor += WITHDRAW_ASSET_LEN;

        let mint_key = mint.key();
        let vault_owner_key = vault_owner.key();
        custody::verify_vault(vault, &mint_key, &vault_owner_key, vault_bumps[i])?;
        custody::verify_sink(sink, &mint_key, sink_bumps[i])?;

        let vault_bump = [vault_bumps[i]];
        let vault_seeds: [&[u8]; 3] = [mint_key.as_ref(), vault_owner_key.as_ref(), &vault_bump];
        let sink_bump = [sink_bumps[i]];
        let sink_seeds: [&[u8]; 2] = [mint_key.as_ref(), &sink_bump];
        let is_pnft = prefix.is_some() && i < pnft_count as usize;

        let (source, source_seeds) = if use_sink {
            custody::ensure_pda_token_account(
                sink,
                mint,
                &recipient,
                &sink_seeds,
                &system_program,
                &token_program,
            )?;
            if !is_pnft {
                let swept =
                    custody::sweep_vault(vault, sink, vault_owner, &vault_seeds, &token_program)?;
                if swept > 0 {
                    msg!("[casier] swept {} from vault {}", swept, vault.key());
                }
            }
            (sink, &sink_seeds[..])
        } else {
            (vault, &vault_seeds[..])
        };

        require!(
            custody::held(source, &token_program)? >= amount,
            CasierError::InsufficientFunds
        );

        match prefix {
            Some((token_metadata_program, sysvar_instructions)) if is_pnft => {
                let companions = &remaining[cursor..cursor + PNFT_COMPANION_LEN];
                cursor += PNFT_COMPANION_LEN;
                if amount > 0 {
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
                        source,
                        source,
                        recipient_ta,
                        &recipient,
                        &recipient,
                        &system_program,
                        &token_program,
                        &associated_token_program,
                        amount,
                        source_seeds,
                    )?;
                }
            }
            _ => {
                custody::ensure_associated_account(
                    recipient_ta,
                    &recipient,
                    mint,
                    &recipient,
                    &system_program,
                    &token_program,
                    &associated_token_program,
                )?;
                if amount > 0 {
                    custody::transfer_signed(source, recipient_ta, source_seeds, amount, &token_program)?;
                }
                if !use_sink
                    && custody::close_if_empty(vault, vault_owner, &vault_seeds, &token_program)?
                {
                    msg!("[casier] closed empty vault {}", vault.key());
                }
            }
        }

        let balance = locker.debit(mint_key, amount)?;
        msg!(
            "[casier] withdraw mint={} amount={} balance={} sink={}",
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
pub struct WithdrawBatch<'info> {
    #[account(
        seeds = [CONFIG_SEED],
        bump,
        has_one = admin,
        constraint = !config.is_frozen @ CasierError::ConfigFrozen
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [recipient.key().as_ref()],
        bump,
        constraint = locker.owner == recipient.key()
    )]
    pub locker: Account<'info, Locker>,

    #[account(mut)]
    pub recipient: Signer<'info>,

    pub admin: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
}
