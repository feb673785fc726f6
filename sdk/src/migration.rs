//! Legacy collection migration.
//!
//! Items of the legacy collections are plain token-metadata NFTs named
//! `Aurorian #<n>` or `Helios #<n>`. Depositing one alone swaps it for the
//! collectible registered under its sequence number.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use anchor_lang::prelude::Pubkey;
use serde::Deserialize;

use crate::error::{Result, SdkError};

pub const LEGACY_PREFIXES: [&str; 2] = ["Aurorian", "Helios"];

/// Number of a legacy item, from names of the exact form
/// `<prefix> #<digits>`. The digits are returned as written: the mapping
/// is keyed by mint, so the number is never parsed and any length
/// matches.
pub fn legacy_number(name: &str) -> Option<&str> {
    let (prefix, digits) = name.split_once(" #")?;
    if !LEGACY_PREFIXES.contains(&prefix) {
        return None;
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits)
}

pub trait MigrationLookup: Send + Sync {
    fn sequence_of(&self, legacy: &Pubkey) -> Option<u32>;
    fn replacement_of(&self, sequence: u32) -> Option<Pubkey>;

    fn replacement_for(&self, legacy: &Pubkey) -> Option<(u32, Pubkey)> {
        let seq = self.sequence_of(legacy)?;
        Some((seq, self.replacement_of(seq)?))
    }
}

#[derive(Debug, Deserialize)]
struct TablesFile {
    legacy: HashMap<String, u32>,
    replacements: HashMap<u32, String>,
}

/// In-memory lookup tables, usually loaded from JSON:
///
/// ```json
/// { "legacy": { "<mint>": 17 }, "replacements": { "17": "<asset>" } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationTables {
    legacy: HashMap<Pubkey, u32>,
    replacements: HashMap<u32, Pubkey>,
}

impl MigrationTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, legacy: Pubkey, sequence: u32, replacement: Pubkey) {
        self.legacy.insert(legacy, sequence);
        self.replacements.insert(sequence, replacement);
    }

    pub fn len(&self) -> usize {
        self.legacy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legacy.is_empty()
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let file: TablesFile = serde_json::from_reader(reader)?;
        let parse = |s: &str| Pubkey::from_str(s).map_err(|_| SdkError::InvalidPubkey(s.to_string()));

        let legacy = file
            .legacy
            .iter()
            .map(|(k, v)| Ok((parse(k)?, *v)))
            .collect::<Result<_>>()?;
        let replacements = file
            .replacements
            .iter()
            .map(|(k, v)| Ok((*k, parse(v)?)))
            .collect::<Result<_>>()?;
        Ok(Self {
            legacy,
            replacements,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}

impl MigrationLookup for MigrationTables {
    fn sequence_of(&self, legacy: &Pubkey) -> Option<u32> {
        self.legacy.get(legacy).copied()
    }

    fn replacement_of(&self, sequence: u32) -> Option<Pubkey> {
        self.replacements.get(&sequence).copied()
    }
}
