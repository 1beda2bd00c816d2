#![no_main]

use libfuzzer_sys::fuzz_target;
use parley_core::overlay::WeblateIndex;

fuzz_target!(|data: &[u8]| {
    let _ = WeblateIndex::from_csv_reader(data);
    let _ = WeblateIndex::from_json_reader(data);
});
