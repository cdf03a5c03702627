#![no_main]

use libfuzzer_sys::fuzz_target;
use tokio_mime_flatten::Flattener;

fuzz_target!(|data: &[u8]| {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let flattener = Flattener::new().max_depth(64).max_part_size(1 << 20);

    // Treat the input as a whole message: header block, then body.
    rt.block_on(async {
        let _ = flattener.flatten_message(data).await;
    });
});
