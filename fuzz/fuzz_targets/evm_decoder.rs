//! Fuzz target for the EIP-1559 unsigned payload decoder.
//!
//! ```bash
//! cargo +nightly fuzz run evm_decoder
//! ```
//!
//! Every input must either decode or return an error; panics are bugs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use txrule_chain::evm::{decode_erc20_call, decode_unsigned};

fuzz_target!(|data: &[u8]| {
    if let Ok(tx) = decode_unsigned(data) {
        // Calldata of a decoded transaction is itself untrusted.
        let _ = decode_erc20_call(&tx.data);
    }
});
