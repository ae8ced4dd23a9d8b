#![no_main]

use libfuzzer_sys::fuzz_target;
use nestkey_format::{Geometry, PathEncoder};

const GEOMETRIES: [(u32, u32); 4] = [(8, 2), (16, 4), (32, 5), (64, 5)];

fuzz_target!(|input: (u8, u8, &str)| {
    let (geometry_pick, prefix_depth, path) = input;
    let (architecture, levels) = GEOMETRIES[geometry_pick as usize % GEOMETRIES.len()];
    let Ok(geometry) = Geometry::new(architecture, levels) else {
        return;
    };

    if let Ok(encoder) = PathEncoder::parse_continuation(geometry, path, (prefix_depth % 4) as usize) {
        // A path that parses must materialize to a path that parses to the same state
        let rendered = encoder.to_bracketed();
        let reparsed = PathEncoder::parse_continuation(geometry, &rendered, encoder.prefix().depth())
            .expect("materialized path must parse");
        assert_eq!(reparsed.state(), encoder.state());
        assert_eq!(reparsed.names(), encoder.names());
    }
});
