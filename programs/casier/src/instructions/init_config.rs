use anchor_lang::prelude::*;

use crate::state::{Config, CONFIG_SEED};

/// Creates the program config. The fee payer becomes admin and must
/// co-sign every locker mutation from then on.
pub fn init_config(ctx: Context<InitConfig>) -> Result<()> {
    let config = &mut ctx.accounts.config;
    config.admin = ctx.accounts.fee_payer.key();
    config.is_frozen = false;

    msg!("[casier] config initialized, admin={}", config.admin);
    Ok(())
}

#[derive(Accounts)]
pub struct InitConfig<'info> {
    #[account(
        init,
        seeds = [CONFIG_SEED],
        bump,
        payer = fee_payer,
        space = Config::LEN
    )]
    pub config: Account<'info, Config>,

    #[account(mut)]
    pub fee_payer: Signer<'info>,

    pub system_program: Program<'info, System>,
}
