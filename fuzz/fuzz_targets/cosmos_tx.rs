//! Fuzz target for the Cosmos-family `Tx` decoder.
//!
//! ```bash
//! cargo +nightly fuzz run cosmos_tx
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use txrule_chain::cosmos::{decode_tx, CosmosParams};

fuzz_target!(|data: &[u8]| {
    for params in [CosmosParams::THORCHAIN, CosmosParams::MAYACHAIN, CosmosParams::GAIA] {
        let _ = decode_tx(&params, data);
    }
});
