use anchor_lang::prelude::Pubkey;

/// Who may move a collectible under its transfer-delegate plugin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelegateAuthority {
    Owner,
    UpdateAuthority,
    Address(Pubkey),
    None,
}

/// Who controls a collectible's metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateAuthority {
    None,
    Address(Pubkey),
    Collection(Pubkey),
}

/// Custody-relevant state of a programmable collectible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectibleInfo {
    pub owner: Pubkey,
    pub update_authority: UpdateAuthority,
    pub frozen: bool,
    /// `None` when the asset carries no transfer-delegate plugin
    pub transfer_delegate: Option<DelegateAuthority>,
}

impl CollectibleInfo {
    pub fn collection(&self) -> Option<Pubkey> {
        match self.update_authority {
            UpdateAuthority::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// Whether `authority` may transfer this collectible right now.
    pub fn can_transfer(&self, authority: &Pubkey) -> bool {
        if self.frozen {
            return false;
        }
        *authority == self.owner
            || matches!(self.transfer_delegate, Some(DelegateAuthority::Address(a)) if a == *authority)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetKind {
    /// Plain token custody, recorded on the ledger
    Fungible,
    /// Token-metadata NFT with a rule set; moves through the metadata
    /// program and is recorded on the ledger
    RuleEnforcedNft,
    /// Stays in the owner's wallet; custody is a freeze plus a transfer
    /// delegate, never a ledger entry
    Collectible(CollectibleInfo),
}

impl AssetKind {
    pub fn is_collectible(&self) -> bool {
        matches!(self, AssetKind::Collectible(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::Fungible => "fungible",
            AssetKind::RuleEnforcedNft => "rule-enforced-nft",
            AssetKind::Collectible(_) => "collectible",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub address: Pubkey,
    pub kind: AssetKind,
    /// Display name from metadata, when the asset has any
    pub name: Option<String>,
}

impl AssetDescriptor {
    pub fn fungible(address: Pubkey) -> Self {
        Self {
            address,
            kind: AssetKind::Fungible,
            name: None,
        }
    }

    pub fn collectible(&self) -> Option<&CollectibleInfo> {
        match &self.kind {
            AssetKind::Collectible(info) => Some(info),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionDescriptor {
    pub address: Pubkey,
    /// Signs freeze changes on member collectibles
    pub update_authority: Pubkey,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(owner: Pubkey) -> CollectibleInfo {
        CollectibleInfo {
            owner,
            update_authority: UpdateAuthority::Collection(Pubkey::new_unique()),
            frozen: false,
            transfer_delegate: None,
        }
    }

    #[test]
    fn delegate_may_transfer_until_frozen() {
        let owner = Pubkey::new_unique();
        let delegate = Pubkey::new_unique();
        let mut c = info(owner);
        assert!(c.can_transfer(&owner));
        assert!(!c.can_transfer(&delegate));

        c.transfer_delegate = Some(DelegateAuthority::Address(delegate));
        assert!(c.can_transfer(&delegate));

        c.frozen = true;
        assert!(!c.can_transfer(&delegate));
        assert!(!c.can_transfer(&owner));
    }

    #[test]
    fn collection_only_from_collection_authority() {
        let mut c = info(Pubkey::new_unique());
        assert!(c.collection().is_some());
        c.update_authority = UpdateAuthority::Address(Pubkey::new_unique());
        assert_eq!(c.collection(), None);
    }
}
