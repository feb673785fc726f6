use anchor_lang::prelude::Pubkey;
use thiserror::Error;

use crate::gate::SubmitError;

pub type Result<T> = std::result::Result<T, SdkError>;

/// Errors raised while building or submitting a locker batch.
///
/// Input errors are raised before any account is read. State errors come
/// from the account reader and may clear up on retry if the reader lags
/// behind the chain. Commit errors come back from the submitter.
#[derive(Debug, Error)]
pub enum SdkError {
    // input validation
    #[error("{assets} assets but {amounts} amounts")]
    LengthMismatch { assets: usize, amounts: usize },

    #[error("{assets} assets but {vault_owners} vault owners")]
    VaultOwnerMismatch { assets: usize, vault_owners: usize },

    #[error("batch has no assets")]
    EmptyBatch,

    #[error("created asset {0} is not part of the batch")]
    CreatedAssetNotListed(Pubkey),

    #[error("collectible {asset} can only move as a single unit, got {amount}")]
    InvalidCollectibleAmount { asset: Pubkey, amount: u64 },

    #[error("{count} {kind} assets do not fit in one batch")]
    TooManyAssets { kind: &'static str, count: usize },

    #[error("classification produced {actual} assets from {expected}")]
    ClassificationMismatch { expected: usize, actual: usize },

    // state resolution
    #[error("collectible {0} does not belong to a collection")]
    NotInCollection(Pubkey),

    #[error("collection {collection} of {asset} not found")]
    CollectionNotFound { asset: Pubkey, collection: Pubkey },

    #[error("asset {0} not found")]
    AssetNotFound(Pubkey),

    #[error("no replacement registered for legacy asset {asset} ({name})")]
    LegacyMappingMissing { asset: Pubkey, name: String },

    #[error("replacement {0} is not a collectible")]
    ReplacementNotCollectible(Pubkey),

    #[error("locker would need {needed} entries, more than {max}")]
    LockerCapacity { needed: usize, max: usize },

    #[error("cannot decode account {address}: {reason}")]
    Decode { address: Pubkey, reason: String },

    #[error("account reader: {0}")]
    Reader(String),

    // commit time
    #[error("locker {locker} moved past version {expected}")]
    StaleVersion { locker: Pubkey, expected: u64 },

    #[error(transparent)]
    Rejected(#[from] SubmitError),

    // configuration
    #[error("invalid public key {0:?}")]
    InvalidPubkey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SdkError {
    /// Whether rebuilding the batch from a fresh read can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SdkError::StaleVersion { .. }
                | SdkError::CollectionNotFound { .. }
                | SdkError::AssetNotFound(_)
                | SdkError::Reader(_)
        )
    }
}
