//! Throughput benchmarks for pad pushes and probes.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ghostline::prelude::*;
use std::hint::black_box;

fn linked_pair() -> (Element, Element, Element) {
    let src = Element::new_source("src", FakeSrc::new());
    let identity = Element::new_transform("identity", Identity::new());
    let sink = Element::new_sink("sink", FakeSink::new());
    src.link(&identity).unwrap();
    identity.link(&sink).unwrap();
    identity.set_state(State::Paused).unwrap();
    sink.set_state(State::Paused).unwrap();
    (src, identity, sink)
}

fn bench_buffer_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_creation");

    for size in [64usize, 1024, 65536].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(Buffer::zeroed(size, Metadata::with_sequence(0))));
        });
    }

    group.finish();
}

fn bench_pad_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("pad_push");
    group.throughput(Throughput::Elements(1));

    for probes in [0usize, 1, 4].iter() {
        group.bench_with_input(BenchmarkId::new("probes", probes), probes, |b, &probes| {
            let (src, _identity, _sink) = linked_pair();
            let pad = src.static_pad("src").unwrap();
            for _ in 0..probes {
                pad.add_buffer_probe(|_, buffer| {
                    black_box(buffer.len());
                    ProbeReturn::Ok
                })
                .unwrap();
            }

            let mut sequence = 0;
            b.iter(|| {
                sequence += 1;
                pad.push(Buffer::empty(sequence)).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_ghost_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("ghost_push");
    group.throughput(Throughput::Elements(1));

    group.bench_function("through_ghost", |b| {
        let (src, _identity, _sink) = linked_pair();
        let bin = Bin::new("bin");
        bin.add(&src).unwrap();
        let ghost = GhostPad::with_target("src", &src.static_pad("src").unwrap()).unwrap();
        bin.add_pad(&ghost).unwrap();

        let mut sequence = 0;
        b.iter(|| {
            sequence += 1;
            ghost.push(Buffer::empty(sequence)).unwrap();
        });
    });

    group.finish();
}

fn bench_state_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_cycle");

    group.bench_function("pipeline_null_paused_null", |b| {
        let pipeline = Pipeline::new("pipeline").unwrap();
        let src = Element::new_source("src", FakeSrc::new());
        let sink = Element::new_sink("sink", FakeSink::new());
        pipeline.add_many(&[&src, &sink]).unwrap();
        src.link(&sink).unwrap();

        b.iter(|| {
            pipeline.set_state(State::Paused).unwrap();
            pipeline.set_state(State::Null).unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_buffer_creation,
    bench_pad_push,
    bench_ghost_push,
    bench_state_cycle,
);
criterion_main!(benches);
