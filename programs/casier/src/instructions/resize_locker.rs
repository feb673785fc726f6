use anchor_lang::prelude::*;

use crate::errors::CasierError;
use crate::state::Locker;

pub fn resize_locker(ctx: Context<ResizeLocker>, max_entries: u16) -> Result<()> {
    require!(max_entries <= Locker::MAX_ENTRIES, CasierError::LockerTooLarge);
    let locker = &mut ctx.accounts.locker;
    require!(
        max_entries as usize >= locker.entry_count(),
        CasierError::CannotShrinkLocker
    );
    locker.max_entries = max_entries;

    msg!("[casier] locker {} resized to {} entries", locker.owner, max_entries);
    Ok(())
}

#[derive(Accounts)]
#[instruction(max_entries: u16)]
pub struct ResizeLocker<'info> {
    #[account(
        mut,
        seeds = [owner.key().as_ref()],
        bump,
        has_one = owner,
        realloc = Locker::space(max_entries),
        realloc::payer = owner,
        realloc::zero = false
    )]
    pub locker: Account<'info, Locker>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}
