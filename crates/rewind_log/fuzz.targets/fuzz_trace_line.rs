#![no_main]
use libfuzzer_sys::fuzz_target;
use rewind_log::TraceLine;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Parsing must never panic; captured fields are slices of the input
    if let Some(line) = TraceLine::parse(text) {
        assert!(text.contains(line.type_code));
        assert!(text.contains(line.data));
        if let Some(subtype) = line.subtype {
            assert!(!subtype.contains(char::is_whitespace));
        }
    }
});
