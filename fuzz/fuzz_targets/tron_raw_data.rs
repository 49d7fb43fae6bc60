//! Fuzz target for the TRON `raw_data` protobuf reader.
//!
//! ```bash
//! cargo +nightly fuzz run tron_raw_data
//! ```

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use txrule_chain::tron::{decode_raw_data, TronChain};
use txrule_chain::Engine;
use txrule_core::{Constraint, Rule, StaticResolver};

fuzz_target!(|data: &[u8]| {
    let _ = decode_raw_data(data);

    // Full evaluation path, including contract and address decoding.
    let engine = TronChain::new(Arc::new(StaticResolver::new()));
    for protocol in ["trx", "trc20"] {
        let rule = Rule::allow(format!("tron.{protocol}.transfer"))
            .with_constraint("recipient", Constraint::any())
            .with_constraint("amount", Constraint::any());
        let _ = engine.evaluate(&rule, data);
    }
});
