#![no_main]

use libfuzzer_sys::fuzz_target;
use ngramdex::index::codec::deserialize;

fuzz_target!(|data: &[u8]| {
    // Corrupt cache files must surface as errors, never abort on allocation
    let _ = deserialize(data);
});
