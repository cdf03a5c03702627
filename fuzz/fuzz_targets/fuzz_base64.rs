#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use tokio::io::AsyncReadExt;
use tokio_mime_flatten::base64::Reader;

fuzz_target!(|data: &[u8]| {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

    rt.block_on(async {
        let mut reader = Reader::new(Cursor::new(data));
        let mut output = Vec::new();
        let _ = reader.read_to_end(&mut output).await;
    });
});
