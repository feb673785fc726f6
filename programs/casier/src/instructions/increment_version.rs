use anchor_lang::prelude::*;

use crate::errors::CasierError;
use crate::events::LockerUpdated;
use crate::state::{Config, Locker, CONFIG_SEED};

/// Version-only mutation. Collectible custody is expressed through freeze
/// and delegate plugins on the asset itself, so a batch made only of
/// collectibles moves no tokens but still has to pass the gate.
pub fn increment_version(ctx: Context<IncrementVersion>, expected_version: u64) -> Result<()> {
    let locker = &mut ctx.accounts.locker;
    locker.check_version(expected_version)?;
    let version = locker.bump_version()?;

    emit!(LockerUpdated {
        owner: locker.owner,
        version,
        entries: locker.entry_count() as u16,
    });
    msg!("[casier] locker {} version {}", locker.owner, version);
    Ok(())
}

#[derive(Accounts)]
pub struct IncrementVersion<'info> {
    #[account(
        seeds = [CONFIG_SEED],
        bump,
        has_one = admin,
        constraint = !config.is_frozen @ CasierError::ConfigFrozen
    )]
    pub config: Account<'info, Config>,

    #[account(mut, seeds = [locker.owner.as_ref()], bump)]
    pub locker: Account<'info, Locker>,

    pub admin: Signer<'info>,
}
