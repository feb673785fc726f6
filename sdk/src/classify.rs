//! Asset classification and custody ordering.
//!
//! A batch is reordered into three partitions:
//!  1. collectibles, in discovery order
//!  2. rule-enforced NFTs, each moved to the front of its partition as it
//!     is discovered (so the last one found comes first)
//!  3. fungibles, in discovery order, followed by assets created in the
//!     same transaction in caller order
//!
//! Amounts and any other per-asset data travel with their asset through
//! the reorder via [`ClassifiedAsset::index`].

use std::collections::{HashSet, VecDeque};

use anchor_lang::prelude::Pubkey;
use tracing::{debug, warn};

use crate::asset::{AssetDescriptor, AssetKind};
use crate::error::{Result, SdkError};
use crate::reader::AccountReader;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedAsset {
    pub mint: Pubkey,
    pub amount: u64,
    pub kind: AssetKind,
    pub name: Option<String>,
    /// Position in the caller's request
    pub index: usize,
    /// Created earlier in the same transaction, never looked up
    pub created: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub collectibles: usize,
    pub rule_enforced: usize,
    pub fungibles: usize,
}

impl KindCounts {
    pub fn total(&self) -> usize {
        self.collectibles + self.rule_enforced + self.fungibles
    }

    /// Assets that go through the ledger instruction
    pub fn ledger(&self) -> usize {
        self.rule_enforced + self.fungibles
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub assets: Vec<ClassifiedAsset>,
    pub counts: KindCounts,
}

impl Classification {
    pub fn collectibles(&self) -> impl Iterator<Item = &ClassifiedAsset> {
        self.assets.iter().filter(|a| a.kind.is_collectible())
    }

    /// Rule-enforced NFTs followed by fungibles, in custody order.
    pub fn ledger_assets(&self) -> impl Iterator<Item = &ClassifiedAsset> {
        self.assets.iter().filter(|a| !a.kind.is_collectible())
    }
}

/// Validates a request's shape before anything is read.
pub fn check_request(mints: &[Pubkey], amounts: &[u64]) -> Result<()> {
    if mints.len() != amounts.len() {
        return Err(SdkError::LengthMismatch {
            assets: mints.len(),
            amounts: amounts.len(),
        });
    }
    if mints.is_empty() {
        return Err(SdkError::EmptyBatch);
    }
    Ok(())
}

/// Orders already-resolved descriptors. `descriptors` is positional with
/// `mints`; a `None` entry is treated as fungible.
pub fn order(
    mints: &[Pubkey],
    amounts: &[u64],
    created: &[Pubkey],
    descriptors: Vec<Option<AssetDescriptor>>,
) -> Result<Classification> {
    check_request(mints, amounts)?;
    let created_set: HashSet<&Pubkey> = created.iter().collect();
    for c in created {
        if !mints.contains(c) {
            return Err(SdkError::CreatedAssetNotListed(*c));
        }
    }

    let mut collectibles = Vec::new();
    let mut rule_enforced = VecDeque::new();
    let mut fungibles = Vec::new();
    let mut descriptors = descriptors.into_iter();

    for (index, (mint, amount)) in mints.iter().zip(amounts).enumerate() {
        if created_set.contains(mint) {
            continue;
        }
        let descriptor = descriptors.next().flatten().unwrap_or_else(|| {
            warn!(%mint, "no account found, treating as fungible");
            AssetDescriptor::fungible(*mint)
        });
        let asset = ClassifiedAsset {
            mint: *mint,
            amount: *amount,
            kind: descriptor.kind,
            name: descriptor.name,
            index,
            created: false,
        };
        match asset.kind {
            AssetKind::Collectible(_) => {
                if asset.amount != 1 {
                    return Err(SdkError::InvalidCollectibleAmount {
                        asset: asset.mint,
                        amount: asset.amount,
                    });
                }
                collectibles.push(asset)
            }
            AssetKind::RuleEnforcedNft => rule_enforced.push_front(asset),
            AssetKind::Fungible => fungibles.push(asset),
        }
    }

    for c in created {
        if let Some(index) = mints.iter().position(|m| m == c) {
            fungibles.push(ClassifiedAsset {
                mint: *c,
                amount: amounts[index],
                kind: AssetKind::Fungible,
                name: None,
                index,
                created: true,
            });
        }
    }

    let counts = KindCounts {
        collectibles: collectibles.len(),
        rule_enforced: rule_enforced.len(),
        fungibles: fungibles.len(),
    };
    let assets: Vec<ClassifiedAsset> = collectibles
        .into_iter()
        .chain(rule_enforced)
        .chain(fungibles)
        .collect();

    if assets.len() != mints.len() {
        return Err(SdkError::ClassificationMismatch {
            expected: mints.len(),
            actual: assets.len(),
        });
    }
    Ok(Classification { assets, counts })
}

/// Looks up every non-created asset in one batched read and orders the
/// result.
pub async fn classify<R: AccountReader + ?Sized>(
    reader: &R,
    mints: &[Pubkey],
    amounts: &[u64],
    created: &[Pubkey],
) -> Result<Classification> {
    check_request(mints, amounts)?;
    let lookup: Vec<Pubkey> = mints
        .iter()
        .filter(|m| !created.contains(m))
        .copied()
        .collect();
    let descriptors = reader.assets(&lookup).await?;
    if descriptors.len() != lookup.len() {
        return Err(SdkError::Reader(format!(
            "asked for {} assets, got {}",
            lookup.len(),
            descriptors.len()
        )));
    }

    let classification = order(mints, amounts, created, descriptors)?;
    debug!(
        collectibles = classification.counts.collectibles,
        rule_enforced = classification.counts.rule_enforced,
        fungibles = classification.counts.fungibles,
        "classified batch"
    );
    Ok(classification)
}
