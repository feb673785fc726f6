use anchor_lang::prelude::*;

#[error_code]
pub enum CasierError {
    #[msg("Config is frozen")]
    ConfigFrozen,
    #[msg("Locker version changed since the batch was built")]
    StaleLockerVersion,
    #[msg("Invalid vault")]
    InvalidVault,
    #[msg("Invalid sink")]
    InvalidSink,
    #[msg("Insufficient funds")]
    InsufficientFunds,
    #[msg("Locker has no free entry")]
    LockerFull,
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,
    #[msg("Wrong remaining accounts size")]
    WrongRemainingAccountsSize,
    #[msg("Amounts and bumps must have the same length")]
    LengthMismatch,
    #[msg("pNFT count exceeds batch size")]
    InvalidPnftCount,
    #[msg("Locker cannot shrink below its entry count")]
    CannotShrinkLocker,
    #[msg("Locker exceeds the largest allocatable size")]
    LockerTooLarge,
}
