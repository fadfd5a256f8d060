#![no_main]

use libfuzzer_sys::fuzz_target;
use ngramdex::index::codec::BlobReader;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode to records or a clean error, never a panic
    for record in BlobReader::new(data) {
        if record.is_err() {
            break;
        }
    }
});
