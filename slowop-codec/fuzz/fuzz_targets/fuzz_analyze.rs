#![no_main]

use libfuzzer_sys::fuzz_target;
use slowop_codec::{Analyzer, LogRecord};

fuzz_target!(|data: &[u8]| {
    let Ok(record) = serde_json::from_slice::<LogRecord>(data) else {
        return;
    };
    let Ok(analyzer) = Analyzer::new() else {
        return;
    };

    // Same record, same answer
    let first = analyzer.analyze(&record);
    let second = analyzer.analyze(&record);
    assert_eq!(first, second);

    if let Ok(stat) = first {
        assert_eq!(stat.namespace, record.attributes.namespace);
    }
});
