//! # Casier SDK
//!
//! Builds atomic batches for the casier locker program:
//!  - classifies requested assets and orders them for custody
//!  - reads the owner's locker and gates the batch on its version
//!  - emits custody operations for collectibles and one ledger operation
//!    for everything else
//!
//! ```ignore
//! let sdk = LockerSdk::new(reader, SdkConfig::new(admin));
//! let batch = sdk.deposit(&DepositRequest::new(owner, mints, amounts)).await?;
//! sdk.submit(&submitter, &batch).await?;
//! ```

pub mod asset;
pub mod builder;
pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod migration;
pub mod ops;
pub mod pda;
pub mod reader;
pub mod sdk;

pub use asset::{
    AssetDescriptor, AssetKind, CollectibleInfo, CollectionDescriptor, DelegateAuthority,
    UpdateAuthority,
};
pub use builder::{BatchBuilder, DepositRequest, Migration, WithdrawRequest};
pub use classify::{Classification, ClassifiedAsset, KindCounts};
pub use config::{MigrationConfig, SdkConfig};
pub use error::{Result, SdkError};
pub use gate::{BatchSubmitter, SubmitError};
pub use ledger::LockerSnapshot;
pub use migration::{MigrationLookup, MigrationTables};
pub use ops::{Batch, LedgerLeg, LegKind, Operation, Settlement};
pub use reader::{AccountReader, AccountSource, ChainReader, RawAccount};
pub use sdk::LockerSdk;
