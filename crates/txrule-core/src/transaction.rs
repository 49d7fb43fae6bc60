//! Chain-neutral view of a decoded account-model transaction.
//!
//! EVM decoders populate [`DecodedTransaction`] uniformly. Non-EVM engines
//! work on their own decoded structures because their parameters (UTXO
//! outputs, Cosmos messages, Solana instructions) do not fit this shape.

use alloy_primitives::{Address, B256, U256};

/// Fields every account-model transaction exposes.
pub trait DecodedTransaction {
    /// Numeric chain id committed to by the transaction.
    fn chain_id(&self) -> u64;

    /// Hash of the bytes as supplied (unsigned signing hash for unsigned input).
    fn hash(&self) -> B256;

    /// Sender, when recoverable. Unsigned transactions have none.
    fn from(&self) -> Option<Address>;

    /// Destination; `None` for contract creation.
    fn to(&self) -> Option<Address>;

    /// Native value transferred.
    fn value(&self) -> U256;

    /// Call data.
    fn data(&self) -> &[u8];

    /// Sender nonce.
    fn nonce(&self) -> u64;

    /// Effective gas price bound (max fee per gas for dynamic-fee transactions).
    fn gas_price(&self) -> U256;

    /// Gas limit.
    fn gas_limit(&self) -> u64;
}
