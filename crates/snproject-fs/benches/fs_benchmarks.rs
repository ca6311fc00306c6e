use criterion::{Criterion, black_box, criterion_group, criterion_main};
use snproject_fs::NormalizedPath;
use snproject_fs::{compute_body_checksum, io, sanitize_segment};
use tempfile::tempdir;

fn write_atomic_benchmark(c: &mut Criterion) {
    c.bench_function("io::write_atomic", |b| {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("sn/app/test_file.js"));
        let content = "var a = 1;\n".repeat(200);

        b.iter(|| {
            io::write_atomic(black_box(&path), black_box(content.as_bytes())).unwrap();
        })
    });
}

fn checksum_benchmark(c: &mut Criterion) {
    let body = "line one\r\nline two\r\n".repeat(500);
    c.bench_function("checksum::compute_body_checksum", |b| {
        b.iter(|| compute_body_checksum(black_box(&body)))
    });
}

fn sanitize_benchmark(c: &mut Criterion) {
    c.bench_function("path::sanitize_segment", |b| {
        b.iter(|| sanitize_segment(black_box("Incident: <Close> / \"Resolve\"?.")))
    });
}

criterion_group!(
    benches,
    write_atomic_benchmark,
    checksum_benchmark,
    sanitize_benchmark
);
criterion_main!(benches);
