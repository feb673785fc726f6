use anchor_lang::prelude::*;

use crate::events::ConfigFrozenSet;
use crate::state::{Config, CONFIG_SEED};

pub fn set_frozen(ctx: Context<SetFrozen>, frozen: bool) -> Result<()> {
    let config = &mut ctx.accounts.config;
    config.is_frozen = frozen;

    emit!(ConfigFrozenSet {
        admin: config.admin,
        is_frozen: frozen,
    });
    msg!("[casier] config is_frozen={}", frozen);
    Ok(())
}

#[derive(Accounts)]
pub struct SetFrozen<'info> {
    #[account(mut, seeds = [CONFIG_SEED], bump, has_one = admin)]
    pub config: Account<'info, Config>,

    pub admin: Signer<'info>,
}
