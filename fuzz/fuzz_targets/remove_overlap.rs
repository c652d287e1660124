#![no_main]

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    overlap::arbitrary::check_remove_overlap(&mut Unstructured::new(data)).unwrap();
});
