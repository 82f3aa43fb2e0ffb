#![no_main]
use libfuzzer_sys::fuzz_target;

use std::convert::Infallible;

use bytes::Bytes;
use form_spool::{parse, Options};
use futures_util::stream;
use http::{header, HeaderMap, HeaderValue};
use tokio::runtime;

fuzz_target!(|data: &[u8]| {
    // the first byte picks the chunk size
    let Some((&size, data)) = data.split_first() else {
        return;
    };
    let size = usize::from(size).max(1);

    let chunks: Vec<Result<Bytes, Infallible>> = data
        .chunks(size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("multipart/form-data; boundary=BOUNDARY"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(data.len()));

    let dir = std::env::temp_dir().join("form-spool-fuzz");
    let options = Options::default().temp_dir(dir).cleanup_delay(0);

    let rt = runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");

    rt.block_on(async move {
        let _ = parse(&headers, stream::iter(chunks), &options).await;
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    });
});
