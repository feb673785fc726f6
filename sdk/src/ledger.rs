use anchor_lang::prelude::Pubkey;
use casier::Locker;
use tracing::debug;

use crate::error::{Result, SdkError};
use crate::ops::Operation;
use crate::pda;
use crate::reader::AccountReader;

/// A locker as read at build time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockerSnapshot {
    pub address: Pubkey,
    pub owner: Pubkey,
    /// `None` when no locker exists yet
    pub locker: Option<Locker>,
}

impl LockerSnapshot {
    pub fn exists(&self) -> bool {
        self.locker.is_some()
    }

    /// Version to gate on; an absent locker is created at zero.
    pub fn version(&self) -> u64 {
        self.locker.as_ref().map(|l| l.version).unwrap_or(0)
    }

    pub fn entry_count(&self) -> usize {
        self.locker.as_ref().map(Locker::entry_count).unwrap_or(0)
    }

    pub fn balance_of(&self, mint: &Pubkey) -> i64 {
        self.locker.as_ref().map(|l| l.balance_of(mint)).unwrap_or(0)
    }

    pub fn entries(&self) -> Vec<(Pubkey, i64)> {
        self.locker
            .as_ref()
            .map(|l| l.entries().map(|(m, a)| (*m, *a)).collect())
            .unwrap_or_default()
    }

    pub fn max_entries(&self) -> Option<u16> {
        self.locker.as_ref().map(|l| l.max_entries)
    }

    /// Mints from `incoming` that would open a new entry.
    pub fn new_entries<'a>(&self, incoming: impl IntoIterator<Item = &'a Pubkey>) -> usize {
        let mut seen: Vec<&Pubkey> = Vec::new();
        for mint in incoming {
            let known = self.locker.as_ref().and_then(|l| l.position(mint)).is_some();
            if !known && !seen.contains(&mint) {
                seen.push(mint);
            }
        }
        seen.len()
    }
}

pub async fn read_locker<R: AccountReader + ?Sized>(
    reader: &R,
    program_id: &Pubkey,
    owner: &Pubkey,
) -> Result<LockerSnapshot> {
    let address = pda::locker_address(program_id, owner);
    let locker = reader.locker(&address).await?;
    debug!(
        %owner,
        exists = locker.is_some(),
        version = locker.as_ref().map(|l| l.version).unwrap_or(0),
        "read locker"
    );
    Ok(LockerSnapshot {
        address,
        owner: *owner,
        locker,
    })
}

/// Operations that make room for `incoming`: an init when the locker is
/// absent, a resize when the new entries would not fit.
///
/// Existence is judged from the snapshot. Two builders racing on the same
/// fresh owner both emit the init; the second one fails on-chain.
pub fn prepare_locker<'a>(
    snapshot: &LockerSnapshot,
    payer: &Pubkey,
    capacity: u16,
    incoming: impl IntoIterator<Item = &'a Pubkey>,
) -> Result<Vec<Operation>> {
    let needed = snapshot.entry_count() + snapshot.new_entries(incoming);
    let limit = Locker::MAX_ENTRIES as usize;
    if needed > limit {
        return Err(SdkError::LockerCapacity { needed, max: limit });
    }
    // needed <= MAX_ENTRIES, so the cast is lossless
    let fit = |max: u16| max.max(needed as u16);

    match snapshot.max_entries() {
        None => Ok(vec![Operation::InitLocker {
            owner: snapshot.owner,
            payer: *payer,
            max_entries: fit(capacity.min(Locker::MAX_ENTRIES)),
        }]),
        Some(max) if needed > max as usize => Ok(vec![Operation::ResizeLocker {
            owner: snapshot.owner,
            max_entries: fit(max),
        }]),
        Some(_) => Ok(Vec::new()),
    }
}

/// Init operation for `owner` unless its locker already exists.
pub async fn init_locker_if_needed<R: AccountReader + ?Sized>(
    reader: &R,
    program_id: &Pubkey,
    owner: &Pubkey,
    payer: &Pubkey,
    capacity: u16,
) -> Result<Option<Operation>> {
    let snapshot = read_locker(reader, program_id, owner).await?;
    if snapshot.exists() {
        return Ok(None);
    }
    Ok(Some(Operation::InitLocker {
        owner: *owner,
        payer: *payer,
        max_entries: capacity,
    }))
}
