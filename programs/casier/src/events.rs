use anchor_lang::prelude::*;

#[event]
pub struct LockerUpdated {
    pub owner: Pubkey,
    pub version: u64,
    pub entries: u16,
}

#[event]
pub struct ConfigFrozenSet {
    pub admin: Pubkey,
    pub is_frozen: bool,
}
