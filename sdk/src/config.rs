use std::fs::File;
use std::path::Path;

use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Fixed parameters of a deployed locker program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(with = "pubkey_str")]
    pub program_id: Pubkey,
    /// Co-signer required by every ledger instruction
    #[serde(with = "pubkey_str")]
    pub admin: Pubkey,
    /// Address that receives transfer-delegate authority over custodied
    /// collectibles
    #[serde(with = "pubkey_str")]
    pub custody_authority: Pubkey,
    /// Entry capacity requested for new lockers
    #[serde(default = "default_capacity")]
    pub locker_capacity: u16,
}

fn default_capacity() -> u16 {
    casier::Locker::DEFAULT_MAX_ENTRIES
}

impl SdkConfig {
    /// Config for the built-in program id where the admin also holds
    /// collectible custody.
    pub fn new(admin: Pubkey) -> Self {
        Self {
            program_id: casier::ID,
            admin,
            custody_authority: admin,
            locker_capacity: default_capacity(),
        }
    }

    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }

    pub fn with_custody_authority(mut self, authority: Pubkey) -> Self {
        self.custody_authority = authority;
        self
    }

    pub fn with_locker_capacity(mut self, capacity: u16) -> Self {
        self.locker_capacity = capacity;
        self
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

/// Accounts involved in replacing a legacy collection item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Holds the replacement collectibles and signs their transfer
    #[serde(with = "pubkey_str")]
    pub treasury: Pubkey,
    /// Collection mint the legacy items are verified against
    #[serde(with = "pubkey_str")]
    pub legacy_collection: Pubkey,
    /// Update authority of the legacy collection
    #[serde(with = "pubkey_str")]
    pub legacy_authority: Pubkey,
}

/// Base58 (de)serialization for public keys.
pub(crate) mod pubkey_str {
    use std::str::FromStr;

    use anchor_lang::prelude::Pubkey;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(d)?;
        Pubkey::from_str(&raw).map_err(|e| de::Error::custom(format!("{raw}: {e}")))
    }
}
