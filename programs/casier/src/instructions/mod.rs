#![allow(ambiguous_glob_reexports)]

pub mod deposit_batch;
pub mod increment_version;
pub mod init_config;
pub mod init_locker;
pub mod initialize;
pub mod resize_locker;
pub mod set_frozen;
pub mod withdraw_batch;

pub use deposit_batch::*;
pub use increment_version::*;
pub use init_config::*;
pub use init_locker::*;
pub use initialize::*;
pub use resize_locker::*;
pub use set_frozen::*;
pub use withdraw_batch::*;

use anchor_lang::prelude::*;

use crate::errors::CasierError;

/// Shared accounts placed once in front of the first pNFT:
/// token metadata program, instructions sysvar.
pub const PNFT_PREFIX_LEN: usize = 2;

/// Per-pNFT companion accounts: metadata, source token record,
/// destination token record, edition.
pub const PNFT_COMPANION_LEN: usize = 4;

/// Checks batch arguments and the remaining account count. pNFTs always
/// come first in a batch, so the first `pnft_count` assets carry the
/// companion block.
pub fn check_batch_shape(
    remaining: usize,
    amounts: usize,
    vault_bumps: usize,
    sink_bumps: usize,
    pnft_count: u8,
    per_asset: usize,
) -> Result<()> {
    require!(
        amounts == vault_bumps && amounts == sink_bumps,
        CasierError::LengthMismatch
    );
    let pnft_count = pnft_count as usize;
    require!(pnft_count <= amounts, CasierError::InvalidPnftCount);

    let prefix = if pnft_count > 0 { PNFT_PREFIX_LEN } else { 0 };
    let expected = prefix + amounts * per_asset + pnft_count * PNFT_COMPANION_LEN;
    require!(remaining == expected, CasierError::WrongRemainingAccountsSize);
    Ok(())
}
