use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use casier::Locker;
use futures::future::try_join_all;
use tracing::debug;

use crate::asset::{AssetDescriptor, CollectionDescriptor};
use crate::decode;
use crate::error::Result;
use crate::pda;

/// Read-only view of chain state used while building batches.
///
/// Implementations may lag behind the chain; the version gate catches
/// whatever a stale read gets wrong.
#[async_trait]
pub trait AccountReader: Send + Sync {
    /// `None` when no account exists at `address`.
    async fn asset(&self, address: &Pubkey) -> Result<Option<AssetDescriptor>>;

    /// Positional batch lookup.
    async fn assets(&self, addresses: &[Pubkey]) -> Result<Vec<Option<AssetDescriptor>>> {
        try_join_all(addresses.iter().map(|a| self.asset(a))).await
    }

    async fn collection(&self, address: &Pubkey) -> Result<Option<CollectionDescriptor>>;

    /// Locker account at `address`, if initialized.
    async fn locker(&self, address: &Pubkey) -> Result<Option<Locker>>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAccount {
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// Byte-level account access, typically an RPC client.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn account(&self, address: &Pubkey) -> Result<Option<RawAccount>>;

    async fn multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<RawAccount>>> {
        try_join_all(addresses.iter().map(|a| self.account(a))).await
    }
}

/// [`AccountReader`] over raw account bytes.
pub struct ChainReader<S> {
    source: S,
}

impl<S: AccountSource> ChainReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn describe(
        address: &Pubkey,
        raw: Option<&RawAccount>,
        metadata: Option<&RawAccount>,
    ) -> Result<Option<AssetDescriptor>> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        if raw.owner == mpl_core::ID {
            return decode::core_asset(address, &raw.data).map(Some);
        }
        decode::token_mint(address, metadata.map(|m| m.data.as_slice())).map(Some)
    }
}

#[async_trait]
impl<S: AccountSource> AccountReader for ChainReader<S> {
    async fn asset(&self, address: &Pubkey) -> Result<Option<AssetDescriptor>> {
        let raw = self.source.account(address).await?;
        let metadata = match &raw {
            Some(r) if r.owner != mpl_core::ID => {
                self.source.account(&pda::metadata_address(address)).await?
            }
            _ => None,
        };
        Self::describe(address, raw.as_ref(), metadata.as_ref())
    }

    async fn assets(&self, addresses: &[Pubkey]) -> Result<Vec<Option<AssetDescriptor>>> {
        let raws = self.source.multiple_accounts(addresses).await?;

        // second round trip only for token mints
        let metadata_keys: Vec<Pubkey> = addresses
            .iter()
            .zip(&raws)
            .filter(|(_, raw)| matches!(raw, Some(r) if r.owner != mpl_core::ID))
            .map(|(a, _)| pda::metadata_address(a))
            .collect();
        debug!(
            assets = addresses.len(),
            metadata = metadata_keys.len(),
            "fetching asset accounts"
        );
        let mut metadata = self.source.multiple_accounts(&metadata_keys).await?.into_iter();

        addresses
            .iter()
            .zip(&raws)
            .map(|(address, raw)| {
                let md = match raw {
                    Some(r) if r.owner != mpl_core::ID => metadata.next().flatten(),
                    _ => None,
                };
                Self::describe(address, raw.as_ref(), md.as_ref())
            })
            .collect()
    }

    async fn collection(&self, address: &Pubkey) -> Result<Option<CollectionDescriptor>> {
        match self.source.account(address).await? {
            Some(raw) => decode::core_collection(address, &raw.data).map(Some),
            None => Ok(None),
        }
    }

    async fn locker(&self, address: &Pubkey) -> Result<Option<Locker>> {
        match self.source.account(address).await? {
            Some(raw) => decode::locker(address, &raw.data).map(Some),
            None => Ok(None),
        }
    }
}
