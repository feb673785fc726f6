use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, CreateAccount};
use anchor_spl::associated_token::{self, Create};
use anchor_spl::token::{self, CloseAccount, InitializeAccount3, TokenAccount, Transfer};
use mpl_token_metadata::instructions::TransferV1CpiBuilder;

use crate::errors::CasierError;

/// Accounts every pNFT transfer needs besides the token accounts.
pub struct PnftAccounts<'a, 'info> {
    pub metadata: &'a AccountInfo<'info>,
    pub source_token_record: &'a AccountInfo<'info>,
    pub destination_token_record: &'a AccountInfo<'info>,
    pub edition: &'a AccountInfo<'info>,
    pub token_metadata_program: &'a AccountInfo<'info>,
    pub sysvar_instructions: &'a AccountInfo<'info>,
}

pub fn verify_vault(vault: &AccountInfo, mint: &Pubkey, owner: &Pubkey, bump: u8) -> Result<()> {
    let expected = Pubkey::create_program_address(
        &[mint.as_ref(), owner.as_ref(), &[bump]],
        &crate::ID,
    )
    .map_err(|_| error!(CasierError::InvalidVault))?;
    require_keys_eq!(expected, vault.key(), CasierError::InvalidVault);
    Ok(())
}

pub fn verify_sink(sink: &AccountInfo, mint: &Pubkey, bump: u8) -> Result<()> {
    let expected = Pubkey::create_program_address(&[mint.as_ref(), &[bump]], &crate::ID)
        .map_err(|_| error!(CasierError::InvalidSink))?;
    require_keys_eq!(expected, sink.key(), CasierError::InvalidSink);
    Ok(())
}

pub fn is_token_account(account: &AccountInfo, token_program: &AccountInfo) -> bool {
    *account.owner == token_program.key()
}

pub fn token_amount(account: &AccountInfo) -> Result<u64> {
    let data = account.try_borrow_data()?;
    let parsed = TokenAccount::try_deserialize(&mut &data[..])?;
    Ok(parsed.amount)
}

/// Balance of a custody account, zero when it was never created.
pub fn held(account: &AccountInfo, token_program: &AccountInfo) -> Result<u64> {
    if is_token_account(account, token_program) {
        token_amount(account)
    } else {
        Ok(0)
    }
}

/// Creates a self-owned token account at a PDA unless one already exists.
#[allow(clippy::too_many_arguments)]
pub fn ensure_pda_token_account<'info>(
    account: &AccountInfo<'info>,
    mint: &AccountInfo<'info>,
    payer: &AccountInfo<'info>,
    seeds: &[&[u8]],
    system_program: &AccountInfo<'info>,
    token_program: &AccountInfo<'info>,
) -> Result<()> {
    if is_token_account(account, token_program) {
        return Ok(());
    }

    let lamports = Rent::get()?.minimum_balance(TokenAccount::LEN);
    system_program::create_account(
        CpiContext::new_with_signer(
            system_program.clone(),
            CreateAccount {
                from: payer.clone(),
                to: account.clone(),
            },
            &[seeds],
        ),
        lamports,
        TokenAccount::LEN as u64,
        token_program.key,
    )?;

    token::initialize_account3(CpiContext::new(
        token_program.clone(),
        InitializeAccount3 {
            account: account.clone(),
            mint: mint.clone(),
            authority: account.clone(),
        },
    ))
}

pub fn ensure_associated_account<'info>(
    associated: &AccountInfo<'info>,
    wallet: &AccountInfo<'info>,
    mint: &AccountInfo<'info>,
    payer: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    token_program: &AccountInfo<'info>,
    associated_token_program: &AccountInfo<'info>,
) -> Result<()> {
    if is_token_account(associated, token_program) {
        return Ok(());
    }
    associated_token::create(CpiContext::new(
        associated_token_program.clone(),
        Create {
            payer: payer.clone(),
            associated_token: associated.clone(),
            authority: wallet.clone(),
            mint: mint.clone(),
            system_program: system_program.clone(),
            token_program: token_program.clone(),
        },
    ))
}

pub fn transfer_signed<'info>(
    from: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    seeds: &[&[u8]],
    amount: u64,
    token_program: &AccountInfo<'info>,
) -> Result<()> {
    token::transfer(
        CpiContext::new_with_signer(
            token_program.clone(),
            Transfer {
                from: from.clone(),
                to: to.clone(),
                authority: from.clone(),
            },
            &[seeds],
        ),
        amount,
    )
}

pub fn transfer_from_owner<'info>(
    from: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    owner: &AccountInfo<'info>,
    amount: u64,
    token_program: &AccountInfo<'info>,
) -> Result<()> {
    token::transfer(
        CpiContext::new(
            token_program.clone(),
            Transfer {
                from: from.clone(),
                to: to.clone(),
                authority: owner.clone(),
            },
        ),
        amount,
    )
}

/// Moves whatever a per-owner vault holds into the sink and closes it,
/// refunding rent to `rent_receiver`.
pub fn sweep_vault<'info>(
    vault: &AccountInfo<'info>,
    sink: &AccountInfo<'info>,
    rent_receiver: &AccountInfo<'info>,
    vault_seeds: &[&[u8]],
    token_program: &AccountInfo<'info>,
) -> Result<u64> {
    if !is_token_account(vault, token_program) {
        return Ok(0);
    }
    let residue = token_amount(vault)?;
    if residue > 0 {
        transfer_signed(vault, sink, vault_seeds, residue, token_program)?;
    }
    close_vault(vault, rent_receiver, vault_seeds, token_program)?;
    Ok(residue)
}

/// Closes a vault once it is empty. Returns whether it was closed.
pub fn close_if_empty<'info>(
    vault: &AccountInfo<'info>,
    rent_receiver: &AccountInfo<'info>,
    vault_seeds: &[&[u8]],
    token_program: &AccountInfo<'info>,
) -> Result<bool> {
    if !is_token_account(vault, token_program) || token_amount(vault)? > 0 {
        return Ok(false);
    }
    close_vault(vault, rent_receiver, vault_seeds, token_program)?;
    Ok(true)
}

fn close_vault<'info>(
    vault: &AccountInfo<'info>,
    rent_receiver: &AccountInfo<'info>,
    vault_seeds: &[&[u8]],
    token_program: &AccountInfo<'info>,
) -> Result<()> {
    token::close_account(CpiContext::new_with_signer(
        token_program.clone(),
        CloseAccount {
            account: vault.clone(),
            destination: rent_receiver.clone(),
            authority: vault.clone(),
        },
        &[vault_seeds],
    ))
}

/// Token-metadata transfer for rule-enforced NFTs. `signer_seeds` is
/// empty when the owner signs the transaction directly.
#[allow(clippy::too_many_arguments)]
pub fn transfer_pnft<'info>(
    pnft: &PnftAccounts<'_, 'info>,
    mint: &AccountInfo<'info>,
    source: &AccountInfo<'info>,
    source_owner: &AccountInfo<'info>,
    destination: &AccountInfo<'info>,
    destination_owner: &AccountInfo<'info>,
    payer: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    token_program: &AccountInfo<'info>,
    associated_token_program: &AccountInfo<'info>,
    amount: u64,
    signer_seeds: &[&[u8]],
) -> Result<()> {
    let mut cpi = TransferV1CpiBuilder::new(pnft.token_metadata_program);
    cpi.token(source)
        .token_owner(source_owner)
        .destination_token(destination)
        .destination_owner(destination_owner)
        .mint(mint)
        .metadata(pnft.metadata)
        .edition(Some(pnft.edition))
        .token_record(Some(pnft.source_token_record))
        .destination_token_record(Some(pnft.destination_token_record))
        .authority(source_owner)
        .payer(payer)
        .system_program(system_program)
        .sysvar_instructions(pnft.sysvar_instructions)
        .spl_token_program(token_program)
        .spl_ata_program(associated_token_program)
        .amount(amount);

    if signer_seeds.is_empty() {
        cpi.invoke()?;
    } else {
        cpi.invoke_signed(&[signer_seeds])?;
    }
    Ok(())
}
