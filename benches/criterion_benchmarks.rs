use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use gsecm6::cm6::{self, DecodeOptions, DigitBudget, EncodeOptions};
use gsecm6::gse::{self, GseWriter, ReaderOptions, StartTime, Wid2};
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Band-limited noise with an occasional large transient, roughly shaped like
/// a broadband seismic trace.
fn gen_trace(len: usize, seed: u64, amplitude: i32) -> Vec<i32> {
    let mut s = seed;
    let mut level = 0i64;
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        let step = ((s >> 33) as i64 % 201) - 100;
        level = (level * 15 / 16) + step;
        let burst = if i % 4096 < 64 { i64::from(amplitude) } else { 0 };
        out.push((level * i64::from(amplitude) / 1000 + burst) as i32);
    }
    out
}

fn encode_with(samples: &[i32], differences: u32) -> Vec<u8> {
    cm6::encode(samples, &EncodeOptions {
        differences,
        budget: DigitBudget::Extended,
    })
    .unwrap()
}

fn write_size_snapshot() {
    let samples = gen_trace(1 << 20, 42, 20_000);
    let mut csv = String::from("differences,samples,symbols,symbols_per_sample\n");
    for differences in 0u32..=3 {
        let symbols = encode_with(&samples, differences);
        let ratio = symbols.len() as f64 / samples.len() as f64;
        csv.push_str(&format!(
            "{differences},{},{},{ratio}\n",
            samples.len(),
            symbols.len()
        ));
    }
    let out_dir = Path::new("target/criterion/custom_reports");
    let _ = fs::create_dir_all(out_dir);
    let _ = fs::write(out_dir.join("size_snapshot.csv"), csv);
}

fn bench_encoding_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("encoding_speed_samples");
    for len in [4 * 1024usize, 256 * 1024, 4 * 1024 * 1024] {
        let samples = gen_trace(len, 1, 5_000);
        g.throughput(Throughput::Elements(len as u64));
        g.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            let mut out = Vec::with_capacity(len * 3);
            b.iter(|| {
                out.clear();
                cm6::encode_into(black_box(&samples), &mut out, &EncodeOptions::default()).unwrap();
                black_box(out.len());
            });
        });
    }
    g.finish();
}

fn bench_decoding_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("decoding_speed_symbols");
    for len in [4 * 1024usize, 256 * 1024, 4 * 1024 * 1024] {
        let samples = gen_trace(len, 2, 5_000);
        let symbols = encode_with(&samples, 2);
        g.throughput(Throughput::Bytes(symbols.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                let out = cm6::decode(black_box(&symbols), &DecodeOptions::default()).unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

fn bench_known_count_decode(c: &mut Criterion) {
    let mut g = c.benchmark_group("decode_known_vs_unknown_count");
    let len = 1024 * 1024usize;
    let samples = gen_trace(len, 3, 5_000);
    let symbols = encode_with(&samples, 2);
    g.throughput(Throughput::Elements(len as u64));
    g.bench_function("all", |b| {
        b.iter(|| black_box(cm6::decode(&symbols, &DecodeOptions::default()).unwrap()));
    });
    g.bench_function("exactly", |b| {
        let opts = DecodeOptions {
            count: cm6::SampleCount::Exactly(len),
            ..Default::default()
        };
        b.iter(|| black_box(cm6::decode(&symbols, &opts).unwrap()));
    });
    g.finish();
}

fn bench_size_vs_differences(c: &mut Criterion) {
    write_size_snapshot();
    let mut g = c.benchmark_group("symbols_vs_differences");
    let samples = gen_trace(1 << 18, 4, 20_000);
    for differences in 0u32..=3u32 {
        g.bench_with_input(
            BenchmarkId::from_parameter(differences),
            &differences,
            |b, differences| {
                b.iter(|| {
                    let symbols = encode_with(&samples, *differences);
                    black_box(symbols.len() as f64 / samples.len() as f64);
                });
            },
        );
    }
    g.finish();
}

fn bench_checksum(c: &mut Criterion) {
    let mut g = c.benchmark_group("chk2_checksum");
    for len in [64 * 1024usize, 4 * 1024 * 1024] {
        let samples = gen_trace(len, 5, 1_000_000);
        g.throughput(Throughput::Elements(len as u64));
        g.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| black_box(cm6::checksum(black_box(&samples))));
        });
    }
    g.finish();
}

fn bench_gse_roundtrip(c: &mut Criterion) {
    let mut g = c.benchmark_group("gse_section_roundtrip");
    let start = StartTime::parse("2004/12/26", "00:58:53.450").unwrap();
    let channels: Vec<(Wid2, Vec<i32>)> = ["BHZ", "BHN", "BHE"]
        .iter()
        .enumerate()
        .map(|(i, ch)| {
            let samples = gen_trace(360_000, i as u64 + 6, 8_000);
            (Wid2::new(start, "PALK", ch, 40.0, samples.len()), samples)
        })
        .collect();
    let total: usize = channels.iter().map(|(_, s)| s.len()).sum();
    g.throughput(Throughput::Elements(total as u64));
    g.bench_function("three_channel_hour", |b| {
        b.iter(|| {
            let mut writer = GseWriter::new(Vec::new());
            for (header, samples) in &channels {
                writer.write_waveform(header, Some("II"), samples).unwrap();
            }
            let text = writer.finish().unwrap();
            let waveforms = gse::read_waveforms(Cursor::new(text), ReaderOptions::default()).unwrap();
            black_box(waveforms);
        });
    });
    g.finish();
}

criterion_group!(
    benches,
    bench_encoding_speed,
    bench_decoding_speed,
    bench_known_count_decode,
    bench_size_vs_differences,
    bench_checksum,
    bench_gse_roundtrip
);
criterion_main!(benches);
