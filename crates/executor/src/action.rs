//! Action descriptors produced by a tick and consumed by the [`Signer`](crate::capability::Signer).
//!
//! These are descriptors, not serialized blobs: the Signer is responsible for turning a sequence
//! of [`Action`] into a signed transaction targeting the fungible-token contract.

/// One action inside a candidate transaction, in the order it should appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Registers `account_id` with the fungible-token contract. Always prepended before a
    /// transfer whenever the owning Item's `has_storage_deposit` is false.
    StorageDeposit { account_id: String },
    /// Debits the sender, credits `receiver_id`. `amount` is an opaque integer-as-string.
    FtTransfer {
        receiver_id: String,
        amount: String,
        memo: Option<String>,
    },
}

impl Action {
    /// Number of actions a [`StorageDeposit`](Action::StorageDeposit) plus its following transfer
    /// cost together, vs. a transfer alone when the account is already registered.
    pub const REGISTRATION_COST: usize = 2;
    pub const TRANSFER_ONLY_COST: usize = 1;
}
