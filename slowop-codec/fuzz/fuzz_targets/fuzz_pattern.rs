#![no_main]

use libfuzzer_sys::fuzz_target;
use slowop_codec::{PatternRules, StageWrapper};

fuzz_target!(|data: &[u8]| {
    let Ok(shape) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(rules) = PatternRules::new() {
        let _ = rules.apply(shape, true, Some(StageWrapper::Operator));
        let _ = rules.apply(shape, false, Some(StageWrapper::Facet));
        let _ = rules.apply(shape, false, None);
    }
});
