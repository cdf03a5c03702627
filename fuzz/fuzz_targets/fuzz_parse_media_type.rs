#![no_main]

use libfuzzer_sys::fuzz_target;
use tokio_mime_flatten::{format_media_type, parse_media_type};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Formatting a parsed value and parsing it again must not panic.
        if let Ok((media_type, params)) = parse_media_type(s) {
            let formatted = format_media_type(&media_type, &params);
            if !formatted.is_empty() {
                let _ = parse_media_type(&formatted);
            }
        }
    }
});
