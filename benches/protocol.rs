//! Frame decoding benchmark suite.
//!
//! Measures the receive path at different object counts:
//! - Reassembly of a telemetry stream delivered in fixed-size chunks
//! - Parsing a single telemetry frame
//! - Reassembly, parsing and applying to shared state end to end
//!
//! Run with: cargo bench --bench protocol
//! Results saved to: target/criterion/

use std::fmt::Write;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rover_link::{FrameDemultiplexer, SharedVehicleState, parse};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const OBJECT_COUNTS: &[usize] = &[0, 8, 64];
const FRAMES_PER_STREAM: usize = 100;
const CHUNK_SIZE: usize = 256;

// ============================================================================
// Fixtures
// ============================================================================

fn telemetry_frame(objects: usize) -> String {
    let mut frame = String::from("T 3450 aL -234.040 811.100 47.5 8.450");
    for i in 0..objects {
        let x = i as f32 * 1.5;
        match i % 4 {
            0 => write!(frame, " b {x:.3} -{x:.3} 1.250"),
            1 => write!(frame, " c -{x:.3} {x:.3} 4.000"),
            2 => write!(frame, " h 0.000 0.000 5.000"),
            _ => write!(frame, " m {x:.3} {x:.3} 270.0 10.125"),
        }
        .unwrap();
    }
    frame.push_str(" ;");
    frame
}

fn telemetry_stream(objects: usize) -> Vec<u8> {
    telemetry_frame(objects)
        .repeat(FRAMES_PER_STREAM)
        .into_bytes()
}

// ============================================================================
// Benchmark: Reassembly
// ============================================================================

fn bench_demux(c: &mut Criterion) {
    let mut group = c.benchmark_group("demux");

    for &objects in OBJECT_COUNTS {
        let stream = telemetry_stream(objects);
        group.throughput(Throughput::Bytes(stream.len() as u64));
        group.bench_with_input(BenchmarkId::new("chunked", objects), &stream, |b, stream| {
            b.iter(|| {
                let mut demux = FrameDemultiplexer::new();
                let mut frames = 0usize;
                for chunk in stream.chunks(CHUNK_SIZE) {
                    demux.push(chunk);
                    frames += demux.frames().count();
                }
                black_box(frames)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Parsing
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for &objects in OBJECT_COUNTS {
        let frame = telemetry_frame(objects);
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("telemetry", objects), &frame, |b, frame| {
            b.iter(|| parse(black_box(frame)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Receive Path
// ============================================================================

fn bench_receive_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("receive_path");
    let state = SharedVehicleState::new();

    for &objects in OBJECT_COUNTS {
        let stream = telemetry_stream(objects);
        group.throughput(Throughput::Elements(FRAMES_PER_STREAM as u64));
        group.bench_with_input(BenchmarkId::new("apply", objects), &stream, |b, stream| {
            b.iter(|| {
                let mut demux = FrameDemultiplexer::with_capacity(CHUNK_SIZE * 2);
                for chunk in stream.chunks(CHUNK_SIZE) {
                    demux.push(chunk);
                    while let Some(frame) = demux.next_frame() {
                        if let Ok(parsed) = parse(&frame) {
                            state.apply(&parsed.message);
                        }
                    }
                }
                black_box(state.current().timestamp)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_demux, bench_parse, bench_receive_path);
criterion_main!(benches);
