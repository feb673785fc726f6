use anchor_lang::prelude::*;

use crate::errors::CasierError;
use crate::state::Locker;

/// Creates an empty locker for `owner` at version zero.
///
/// `init` fails on an existing account, so a second call for the same
/// owner is rejected on-chain. Clients check existence before adding this
/// instruction to a batch.
pub fn init_locker(ctx: Context<InitLocker>, max_entries: u16) -> Result<()> {
    require!(max_entries <= Locker::MAX_ENTRIES, CasierError::LockerTooLarge);
    let locker = &mut ctx.accounts.locker;
    locker.owner = ctx.accounts.owner.key();
    locker.mints = Vec::new();
    locker.amounts = Vec::new();
    locker.version = 0;
    locker.max_entries = max_entries;

    msg!("[casier] locker initialized for {} ({} entries)", locker.owner, max_entries);
    Ok(())
}

#[derive(Accounts)]
#[instruction(max_entries: u16)]
pub struct InitLocker<'info> {
    #[account(
        init,
        seeds = [owner.key().as_ref()],
        bump,
        payer = payer,
        space = Locker::space(max_entries)
    )]
    pub locker: Account<'info, Locker>,

    /// CHECK: only used as PDA seed and recorded as locker owner
    pub owner: UncheckedAccount<'info>,

    #[account(mut)]
    pub payer: Signer<'info>,

    pub system_program: Program<'info, System>,
}
