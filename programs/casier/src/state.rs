use anchor_lang::prelude::*;
use anchor_lang::solana_program::entrypoint::MAX_PERMITTED_DATA_INCREASE;

use crate::errors::CasierError;

pub const CONFIG_SEED: &[u8] = b"config";

/// Program-wide settings (PDA, seeds = [b"config"])
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct Config {
    /// Co-signer required on every locker mutation
    pub admin: Pubkey,
    /// Circuit breaker: when set, no locker can be mutated
    pub is_frozen: bool,
}

impl Config {
    pub const LEN: usize = 8 + // discriminator
        32 + // admin
        1; // is_frozen
}

/// Per-owner ledger of custodied balances (PDA, seeds = [owner])
///
/// `mints` and `amounts` are parallel vectors kept in arrival order.
/// Balances are signed: a withdrawal settled out of the pooled sink can
/// take an owner below zero for that asset.
///
/// `version` is the optimistic-concurrency counter. Every mutating
/// instruction carries the version its builder observed and is rejected
/// if the counter moved in between. The number of live entries is always
/// `mints.len()` and is never stored separately.
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct Locker {
    pub owner: Pubkey,
    pub mints: Vec<Pubkey>,
    pub amounts: Vec<i64>,
    pub version: u64,
    /// Capacity the account was allocated for
    pub max_entries: u16,
}

impl Locker {
    pub const BASE_LEN: usize = 8 + // discriminator
        32 + // owner
        4 + // mints vec prefix
        4 + // amounts vec prefix
        8 + // version
        2; // max_entries

    pub const ENTRY_LEN: usize = 32 + // mint
        8; // amount

    pub const DEFAULT_MAX_ENTRIES: u16 = 10;

    /// Largest locker that can be created through CPI or grown by one
    /// realloc from empty.
    pub const MAX_ENTRIES: u16 =
        ((MAX_PERMITTED_DATA_INCREASE - Self::BASE_LEN) / Self::ENTRY_LEN) as u16;

    pub fn space(max_entries: u16) -> usize {
        Self::BASE_LEN + Self::ENTRY_LEN * max_entries as usize
    }

    pub fn entry_count(&self) -> usize {
        self.mints.len()
    }

    pub fn position(&self, mint: &Pubkey) -> Option<usize> {
        self.mints.iter().position(|m| m == mint)
    }

    /// Balance recorded for `mint`, zero when there is no entry.
    pub fn balance_of(&self, mint: &Pubkey) -> i64 {
        self.position(mint).map(|i| self.amounts[i]).unwrap_or(0)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Pubkey, &i64)> {
        self.mints.iter().zip(self.amounts.iter())
    }

    /// Consistency gate: the caller must present the version it read.
    pub fn check_version(&self, expected: u64) -> Result<()> {
        require!(
            self.version == expected,
            CasierError::StaleLockerVersion
        );
        Ok(())
    }

    pub fn bump_version(&mut self) -> Result<u64> {
        self.version = self
            .version
            .checked_add(1)
            .ok_or(CasierError::ArithmeticOverflow)?;
        Ok(self.version)
    }

    pub fn credit(&mut self, mint: Pubkey, amount: u64) -> Result<i64> {
        let delta = i64::try_from(amount).map_err(|_| CasierError::ArithmeticOverflow)?;
        self.apply_delta(mint, delta)
    }

    pub fn debit(&mut self, mint: Pubkey, amount: u64) -> Result<i64> {
        let delta = i64::try_from(amount).map_err(|_| CasierError::ArithmeticOverflow)?;
        self.apply_delta(mint, -delta)
    }

    /// Adds a signed delta to the entry for `mint` and returns the new
    /// balance.
    ///
    /// An absent mint is appended at the end. A balance that lands on
    /// exactly zero is removed with `Vec::remove`, so the remaining
    /// entries keep their relative arrival order.
    pub fn apply_delta(&mut self, mint: Pubkey, delta: i64) -> Result<i64> {
        match self.position(&mint) {
            Some(i) => {
                let balance = self.amounts[i]
                    .checked_add(delta)
                    .ok_or(CasierError::ArithmeticOverflow)?;
                if balance == 0 {
                    self.mints.remove(i);
                    self.amounts.remove(i);
                } else {
                    self.amounts[i] = balance;
                }
                Ok(balance)
            }
            None if delta == 0 => Ok(0),
            None => {
                require!(
                    self.mints.len() < self.max_entries as usize,
                    CasierError::LockerFull
                );
                self.mints.push(mint);
                self.amounts.push(delta);
                Ok(delta)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(err: anchor_lang::error::Error) -> u32 {
        match err {
            anchor_lang::error::Error::AnchorError(e) => e.error_code_number,
            other => panic!("unexpected error {other:?}"),
        }
    }

    fn locker() -> Locker {
        Locker {
            owner: Pubkey::new_unique(),
            max_entries: Locker::DEFAULT_MAX_ENTRIES,
            ..Default::default()
        }
    }

    #[test]
    fn credit_appends_in_arrival_order() {
        let mut l = locker();
        let (a, b, c) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        l.credit(b, 5).unwrap();
        l.credit(a, 7).unwrap();
        l.credit(c, 1).unwrap();
        assert_eq!(l.mints, vec![b, a, c]);
        assert_eq!(l.amounts, vec![5, 7, 1]);
    }

    #[test]
    fn zero_balance_compacts_by_shifting_left() {
        let mut l = locker();
        let (a, b, c) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        l.credit(a, 1).unwrap();
        l.credit(b, 2).unwrap();
        l.credit(c, 3).unwrap();

        assert_eq!(l.debit(a, 1).unwrap(), 0);
        assert_eq!(l.mints, vec![b, c]);
        assert_eq!(l.amounts, vec![2, 3]);
        assert_eq!(l.entry_count(), 2);
    }

    #[test]
    fn debit_below_zero_keeps_signed_entry() {
        let mut l = locker();
        let m = Pubkey::new_unique();
        assert_eq!(l.debit(m, 40).unwrap(), -40);
        assert_eq!(l.balance_of(&m), -40);
        assert_eq!(l.credit(m, 40).unwrap(), 0);
        assert_eq!(l.entry_count(), 0);
    }

    #[test]
    fn zero_delta_on_absent_mint_adds_nothing() {
        let mut l = locker();
        let m = Pubkey::new_unique();
        assert_eq!(l.debit(m, 0).unwrap(), 0);
        assert!(l.mints.is_empty());
    }

    #[test]
    fn version_gate_rejects_stale_reads() {
        let mut l = locker();
        l.check_version(0).unwrap();
        assert_eq!(l.bump_version().unwrap(), 1);

        let err = l.check_version(0).unwrap_err();
        assert_eq!(code(err), u32::from(CasierError::StaleLockerVersion));
        l.check_version(1).unwrap();
    }

    #[test]
    fn full_locker_rejects_new_mint_but_updates_existing() {
        let mut l = locker();
        l.max_entries = 1;
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        l.credit(a, 1).unwrap();
        let err = l.credit(b, 1).unwrap_err();
        assert_eq!(code(err), u32::from(CasierError::LockerFull));
        assert_eq!(l.credit(a, 1).unwrap(), 2);
    }

    #[test]
    fn overflow_is_reported() {
        let mut l = locker();
        let m = Pubkey::new_unique();
        l.credit(m, i64::MAX as u64).unwrap();
        let err = l.credit(m, 1).unwrap_err();
        assert_eq!(code(err), u32::from(CasierError::ArithmeticOverflow));

        let err = l.credit(Pubkey::new_unique(), u64::MAX).unwrap_err();
        assert_eq!(code(err), u32::from(CasierError::ArithmeticOverflow));
    }

    #[test]
    fn largest_locker_fits_one_allocation() {
        assert!(Locker::space(Locker::MAX_ENTRIES) <= MAX_PERMITTED_DATA_INCREASE);
        assert!(Locker::space(Locker::MAX_ENTRIES + 1) > MAX_PERMITTED_DATA_INCREASE);
        assert_eq!(Locker::MAX_ENTRIES, 254);
    }

    #[test]
    fn space_matches_serialized_size() {
        let mut l = locker();
        l.max_entries = 3;
        for _ in 0..3 {
            l.credit(Pubkey::new_unique(), 9).unwrap();
        }
        let mut data = Vec::new();
        l.try_serialize(&mut data).unwrap();
        assert_eq!(data.len(), Locker::space(3));
    }
}
