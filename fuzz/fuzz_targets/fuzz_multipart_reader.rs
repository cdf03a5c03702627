#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use tokio_mime_flatten::multipart::Reader;

fuzz_target!(|data: &[u8]| {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

    rt.block_on(async {
        let mut reader = Reader::new(Cursor::new(data), "boundary");

        // Bound the number of parts so a pathological input cannot spin forever.
        for _ in 0..100 {
            match reader.next_part().await {
                Ok(Some(_part)) => {}
                Ok(None) | Err(_) => break,
            }
        }
    });
});
