//! Raw account bytes to SDK descriptors.

use anchor_lang::prelude::Pubkey;
use anchor_lang::AccountDeserialize;
use casier::Locker;
use mpl_core::accounts::BaseCollectionV1;
use mpl_core::types::{PluginAuthority, UpdateAuthority as CoreUpdateAuthority};
use mpl_token_metadata::accounts::Metadata;
use mpl_token_metadata::types::TokenStandard;

use crate::asset::{
    AssetDescriptor, AssetKind, CollectibleInfo, CollectionDescriptor, DelegateAuthority,
    UpdateAuthority,
};
use crate::error::{Result, SdkError};

fn decode_err(address: &Pubkey, reason: impl ToString) -> SdkError {
    SdkError::Decode {
        address: *address,
        reason: reason.to_string(),
    }
}

/// Metadata names are fixed-width and NUL padded.
pub fn clean_name(raw: &str) -> String {
    raw.trim_end_matches('\0').trim().to_string()
}

pub fn core_asset(address: &Pubkey, data: &[u8]) -> Result<AssetDescriptor> {
    let asset = mpl_core::Asset::from_bytes(data).map_err(|e| decode_err(address, e))?;
    let plugins = &asset.plugin_list;

    let frozen = plugins
        .permanent_freeze_delegate
        .as_ref()
        .map(|p| p.permanent_freeze_delegate.frozen)
        .unwrap_or(false)
        || plugins
            .freeze_delegate
            .as_ref()
            .map(|p| p.freeze_delegate.frozen)
            .unwrap_or(false);

    let transfer_delegate = plugins
        .transfer_delegate
        .as_ref()
        .map(|p| delegate_authority(&p.base.authority));

    let update_authority = match asset.base.update_authority {
        CoreUpdateAuthority::None => UpdateAuthority::None,
        CoreUpdateAuthority::Address(a) => UpdateAuthority::Address(a),
        CoreUpdateAuthority::Collection(c) => UpdateAuthority::Collection(c),
    };

    Ok(AssetDescriptor {
        address: *address,
        name: Some(clean_name(&asset.base.name)),
        kind: AssetKind::Collectible(CollectibleInfo {
            owner: asset.base.owner,
            update_authority,
            frozen,
            transfer_delegate,
        }),
    })
}

fn delegate_authority(authority: &PluginAuthority) -> DelegateAuthority {
    match authority {
        PluginAuthority::None => DelegateAuthority::None,
        PluginAuthority::Owner => DelegateAuthority::Owner,
        PluginAuthority::UpdateAuthority => DelegateAuthority::UpdateAuthority,
        PluginAuthority::Address { address } => DelegateAuthority::Address(*address),
    }
}

pub fn core_collection(address: &Pubkey, data: &[u8]) -> Result<CollectionDescriptor> {
    let collection = BaseCollectionV1::from_bytes(data).map_err(|e| decode_err(address, e))?;
    Ok(CollectionDescriptor {
        address: *address,
        update_authority: collection.update_authority,
        name: clean_name(&collection.name),
    })
}

/// Classifies a token mint from its metadata account. Mints without
/// metadata are plain fungibles.
pub fn token_mint(mint: &Pubkey, metadata: Option<&[u8]>) -> Result<AssetDescriptor> {
    let Some(data) = metadata else {
        return Ok(AssetDescriptor::fungible(*mint));
    };
    let md = Metadata::safe_deserialize(data).map_err(|e| decode_err(mint, e))?;
    let kind = match md.token_standard {
        Some(TokenStandard::ProgrammableNonFungible)
        | Some(TokenStandard::ProgrammableNonFungibleEdition) => AssetKind::RuleEnforcedNft,
        _ => AssetKind::Fungible,
    };
    Ok(AssetDescriptor {
        address: *mint,
        kind,
        name: Some(clean_name(&md.name)),
    })
}

pub fn locker(address: &Pubkey, data: &[u8]) -> Result<Locker> {
    Locker::try_deserialize(&mut &data[..]).map_err(|e| decode_err(address, e))
}
