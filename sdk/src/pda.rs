//! Address derivation for every account a locker batch touches.

use anchor_lang::prelude::Pubkey;
use anchor_spl::associated_token::get_associated_token_address;
use casier::CONFIG_SEED;
use mpl_token_metadata::accounts::{MasterEdition, Metadata, TokenRecord};

pub fn config_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id).0
}

/// The owner's ledger account.
pub fn locker_address(program_id: &Pubkey, owner: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[owner.as_ref()], program_id).0
}

/// Legacy per-owner token account for `mint`. Only older lockers hold
/// balances here; batches sweep them into the sink.
pub fn vault_address(program_id: &Pubkey, mint: &Pubkey, owner: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[mint.as_ref(), owner.as_ref()], program_id)
}

/// Pooled token account holding every owner's custodied `mint`.
pub fn sink_address(program_id: &Pubkey, mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[mint.as_ref()], program_id)
}

pub fn wallet_token_address(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(wallet, mint)
}

pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    Metadata::find_pda(mint).0
}

pub fn edition_address(mint: &Pubkey) -> Pubkey {
    MasterEdition::find_pda(mint).0
}

pub fn token_record_address(mint: &Pubkey, token_account: &Pubkey) -> Pubkey {
    TokenRecord::find_pda(mint, token_account).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_is_scoped_to_owner_and_sink_is_not() {
        let program = casier::ID;
        let mint = Pubkey::new_unique();
        let (alice, bob) = (Pubkey::new_unique(), Pubkey::new_unique());

        assert_ne!(
            vault_address(&program, &mint, &alice).0,
            vault_address(&program, &mint, &bob).0
        );
        assert_eq!(sink_address(&program, &mint), sink_address(&program, &mint));
        assert_ne!(sink_address(&program, &mint).0, vault_address(&program, &mint, &alice).0);
    }

    #[test]
    fn bumps_recreate_the_address() {
        let program = casier::ID;
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let (vault, bump) = vault_address(&program, &mint, &owner);
        let again =
            Pubkey::create_program_address(&[mint.as_ref(), owner.as_ref(), &[bump]], &program)
                .unwrap();
        assert_eq!(vault, again);
    }

    #[test]
    fn locker_and_config_do_not_collide() {
        let program = casier::ID;
        let owner = Pubkey::new_unique();
        assert_ne!(locker_address(&program, &owner), config_address(&program));
    }
}
