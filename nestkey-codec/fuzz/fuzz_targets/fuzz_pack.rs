#![no_main]

use libfuzzer_sys::fuzz_target;
use nestkey_codec::{pack, parse_schema, Geometry, PackContext, PackLimits};
use serde_json::json;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(schema) = parse_schema(text) else {
        return;
    };

    let store = json!({
        "rows": [{"v": 1}, {"v": "two"}, {"v": null}],
        "n": 3,
        "text": " <b>x</b> "
    });
    let limits = PackLimits {
        max_depth: 16,
        max_items: 10_000,
    };
    let context = PackContext::new(Geometry::new(16, 4).unwrap()).with_limits(limits);

    // Errors are fine; panics and runaway recursion are not
    let _ = pack(&schema, &store, &context);
});
