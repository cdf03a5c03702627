use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;
use tokio::io::AsyncReadExt;
use tokio_mime_flatten::*;

fn multipart_message(boundary: &str, num_parts: usize, part: &str) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..num_parts {
        out.push_str(&format!(
            "--{boundary}\r\nContent-Type: text/plain\r\nX-Index: {i}\r\n\r\n{part}\r\n"
        ));
    }
    out.push_str(&format!("--{boundary}--\r\n"));
    out.into_bytes()
}

// Benchmark media type parsing
fn bench_parse_media_type(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_media_type");

    let test_cases = vec![
        ("simple", "text/plain"),
        ("with_charset", "text/plain; charset=utf-8"),
        ("multipart", "multipart/mixed; boundary=\"----=_Part_0_1234567890.1700000000000\""),
        ("rfc2231", "application/pdf; name*0*=utf-8''r%C3%A9sum%C3%A9; name*1=\".pdf\""),
    ];

    for (name, input) in test_cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, &input| {
            b.iter(|| parse_media_type(black_box(input)));
        });
    }

    group.finish();
}

// Benchmark transfer-encoding decoders
fn bench_decoders(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoders");
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

    for size in [1_024, 10_240, 102_400].iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        let qp = "caf=C3=A9 ".repeat(*size / 10);
        group.bench_with_input(BenchmarkId::new("quoted_printable", size), &qp, |b, data| {
            b.iter(|| {
                rt.block_on(async {
                    let input = Cursor::new(black_box(data.as_bytes()));
                    let mut reader = quotedprintable::Reader::new(input);
                    let mut output = Vec::new();
                    reader.read_to_end(&mut output).await.unwrap();
                    output
                })
            });
        });

        let b64 = "QUJD\r\n".repeat(*size / 6);
        group.bench_with_input(BenchmarkId::new("base64", size), &b64, |b, data| {
            b.iter(|| {
                rt.block_on(async {
                    let input = Cursor::new(black_box(data.as_bytes()));
                    let mut reader = tokio_mime_flatten::base64::Reader::new(input);
                    let mut output = Vec::new();
                    reader.read_to_end(&mut output).await.unwrap();
                    output
                })
            });
        });
    }

    group.finish();
}

// Benchmark flattening
fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");

    for num_parts in [1, 5, 50].iter() {
        let data = multipart_message("bench-boundary", *num_parts, "test data content here");
        let mut header = Header::new();
        header.set("Content-Type", "multipart/mixed; boundary=bench-boundary");

        group.bench_with_input(BenchmarkId::new("flat", num_parts), &data, |b, data| {
            b.iter(|| {
                Flattener::new()
                    .flatten_blocking(&header, Cursor::new(black_box(data)))
                    .unwrap()
                    .len()
            });
        });
    }

    let inner = String::from_utf8(multipart_message("inner", 5, "nested")).unwrap();
    let mut outer = String::new();
    for _ in 0..5 {
        outer.push_str(&format!(
            "--outer\r\nContent-Type: multipart/alternative; boundary=inner\r\n\r\n{inner}\r\n"
        ));
    }
    outer.push_str("--outer--\r\n");
    let mut header = Header::new();
    header.set("Content-Type", "multipart/mixed; boundary=outer");

    group.bench_function("nested", |b| {
        b.iter(|| {
            Flattener::new()
                .flatten_blocking(&header, Cursor::new(black_box(outer.as_bytes())))
                .unwrap()
                .len()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse_media_type, bench_decoders, bench_flatten);

criterion_main!(benches);
