#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|frame: u16| {
    if let Ok(t) = reflow_hardware::max6675::decode(frame) {
        assert!(t.is_finite() && (0.0..=1024.0).contains(&t));
    }
});
