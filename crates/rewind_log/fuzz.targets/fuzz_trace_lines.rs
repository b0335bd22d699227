#![no_main]
use libfuzzer_sys::fuzz_target;
use rewind_log::{TraceLine, TraceLines};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut lines = TraceLines::new(Cursor::new(data), "fuzz");
    let mut count = 0;
    while let Ok(Some((number, line))) = lines.next_line() {
        count += 1;
        assert_eq!(number, count);
        let _ = TraceLine::parse(line);
        if count > 1000 {
            break;
        }
    }
});
