//! End-to-end tests: bins with ghost pads inside a pipeline, asynchronous
//! state changes, probe-driven reconfiguration and ownership counts.

use ghostline::elements::SinkStats;
use ghostline::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A bin wrapping a source, exposing its pad as ghost pad "src".
fn src_bin(name: &str, source: FakeSrc) -> (Bin, Element) {
    let bin = Bin::new(name);
    let src = Element::new_source(format!("{name}-source"), source);
    bin.add(&src).unwrap();
    let ghost = GhostPad::with_target("src", &src.static_pad("src").unwrap()).unwrap();
    bin.add_pad(&ghost).unwrap();
    (bin, src)
}

/// A bin wrapping a sink, exposing its pad as ghost pad "sink".
fn sink_bin(name: &str, sink: FakeSink) -> (Bin, Element) {
    let bin = Bin::new(name);
    let element = Element::new_sink(format!("{name}-sink"), sink);
    bin.add(&element).unwrap();
    let ghost = GhostPad::with_target("sink", &element.static_pad("sink").unwrap()).unwrap();
    bin.add_pad(&ghost).unwrap();
    (bin, element)
}

/// Poll `get_state` until the element settles in `state`.
fn poll_until(element: &Element, state: State) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let (result, current, _) = element.get_state(None);
        if result == Ok(StateChangeSuccess::Success) && current == state {
            return;
        }
        assert!(result.is_ok(), "state change failed: {result:?}");
        assert!(Instant::now() < deadline, "never reached {state}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn wait_for_buffers(stats: &SinkStats, count: u64) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while stats.buffer_count() < count {
        assert!(Instant::now() < deadline, "sink saw {} buffers", stats.buffer_count());
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_ghost_bins_play_and_stop() {
    init_tracing();
    let pipeline = Pipeline::new("pipeline").unwrap();
    let (sources, _) = src_bin("srcbin", FakeSrc::new().with_interval(Duration::from_millis(1)));
    let fakesink = FakeSink::new();
    let stats = fakesink.stats();
    let (sinks, _) = sink_bin("sinkbin", fakesink);

    pipeline
        .add_many(&[sources.as_element(), sinks.as_element()])
        .unwrap();
    sources
        .static_pad("src")
        .unwrap()
        .link(&sinks.static_pad("sink").unwrap())
        .unwrap();

    pipeline.set_state_async(State::Playing);
    poll_until(&pipeline, State::Playing);
    assert_eq!(sources.current_state(), State::Playing);
    assert_eq!(sinks.current_state(), State::Playing);
    wait_for_buffers(&stats, 5);

    pipeline.set_state_async(State::Null);
    poll_until(&pipeline, State::Null);
    assert_eq!(sources.current_state(), State::Null);
    assert_eq!(sinks.current_state(), State::Null);

    // The streaming thread is gone: no more buffers arrive.
    let seen = stats.buffer_count();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(stats.buffer_count(), seen);
}

#[test]
fn test_ghost_link_connects_concrete_pads() {
    let (sources, src) = src_bin("srcbin", FakeSrc::new());
    let (sinks, sink) = sink_bin("sinkbin", FakeSink::new());

    sources
        .static_pad("src")
        .unwrap()
        .link(&sinks.static_pad("sink").unwrap())
        .unwrap();

    let src_pad = src.static_pad("src").unwrap();
    let sink_pad = sink.static_pad("sink").unwrap();
    assert_eq!(src_pad.peer(), Some(sink_pad.clone()));
    assert_eq!(sink_pad.peer(), Some(src_pad));

    // Linking again through the ghost pads is refused.
    let err = sources
        .static_pad("src")
        .unwrap()
        .link(&sinks.static_pad("sink").unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::Link(_)));
}

#[test]
fn test_async_sink_inside_bin_prerolls_pipeline() {
    let pipeline = Pipeline::new("pipeline").unwrap();
    let (sources, _) = src_bin("srcbin", FakeSrc::new().with_interval(Duration::from_millis(1)));
    let (sinks, _) = sink_bin(
        "sinkbin",
        FakeSink::new().with_preroll_delay(Duration::from_millis(100)),
    );
    pipeline
        .add_many(&[sources.as_element(), sinks.as_element()])
        .unwrap();
    sources
        .static_pad("src")
        .unwrap()
        .link(&sinks.static_pad("sink").unwrap())
        .unwrap();

    let mut bus = pipeline.bus();
    pipeline.set_state_async(State::Playing);

    let (result, current, pending) = pipeline.get_state(Some(Duration::ZERO));
    assert_eq!(result, Ok(StateChangeSuccess::Async));
    assert_ne!(current, State::Playing);
    assert_eq!(pending, State::Playing);

    poll_until(&pipeline, State::Playing);
    let done = bus
        .drain()
        .into_iter()
        .any(|event| matches!(event, PipelineEvent::AsyncDone { ref element } if element == "pipeline"));
    assert!(done, "pipeline never posted async-done");

    pipeline.set_state(State::Null).unwrap();
    assert_eq!(pipeline.current_state(), State::Null);
}

#[test]
fn test_probe_adds_sink_bin_and_removes_itself() {
    init_tracing();
    let pipeline = Pipeline::new("pipeline").unwrap();
    let (sources, src) = src_bin("srcbin", FakeSrc::new().with_interval(Duration::from_millis(1)));
    let fakesink = FakeSink::new();
    let stats = fakesink.stats();
    let (sinks, _) = sink_bin("sinkbin", fakesink);
    pipeline.add(&sources).unwrap();

    let target = sources.static_pad("src").unwrap().ghost_target().unwrap();
    assert!(target.ptr_eq(&src.static_pad("src").unwrap()));

    let calls = Arc::new(AtomicU64::new(0));
    let probe_id = Arc::new(OnceLock::new());
    let pending = Arc::new(Mutex::new(Some(sinks.clone())));
    let id = target
        .add_buffer_probe({
            let weak = pipeline.downgrade();
            let calls = calls.clone();
            let probe_id = probe_id.clone();
            let sources = sources.downgrade();
            move |pad, _buffer| {
                calls.fetch_add(1, Ordering::SeqCst);
                let Some(sinks) = pending.lock().unwrap().take() else {
                    return ProbeReturn::Ok;
                };
                let pipeline = weak.upgrade().and_then(|p| p.as_pipeline()).unwrap();
                let sources = sources.upgrade().unwrap();

                pipeline.add(&sinks).unwrap();
                assert_eq!(sinks.set_state(State::Paused), Ok(StateChangeSuccess::Success));
                sources
                    .static_pad("src")
                    .unwrap()
                    .link(&sinks.static_pad("sink").unwrap())
                    .unwrap();
                pad.remove_buffer_probe(*probe_id.get().unwrap());
                ProbeReturn::Ok
            }
        })
        .unwrap();
    probe_id.set(id).unwrap();

    pipeline.set_state_async(State::Playing);
    poll_until(&pipeline, State::Playing);
    wait_for_buffers(&stats, 3);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(target.probe_count(), 0);
    assert_eq!(pipeline.child_count(), 2);
    assert!(sinks.parent().unwrap().ptr_eq(&pipeline));

    pipeline.set_state_async(State::Null);
    poll_until(&pipeline, State::Null);
    assert_eq!(sinks.current_state(), State::Null);
}

#[test]
fn test_ownership_counts_follow_parenting() {
    let src = Element::new_source("src", FakeSrc::new());
    assert_eq!(src.ref_count(), 1);

    let bin = Bin::new("bin");
    bin.add(&src).unwrap();
    assert_eq!(src.ref_count(), 2);
    assert_eq!(bin.ref_count(), 1);

    let pipeline = Pipeline::new("pipeline").unwrap();
    pipeline.add(&bin).unwrap();
    assert_eq!(bin.ref_count(), 2);

    drop(pipeline);
    assert_eq!(bin.ref_count(), 1);
    assert!(!bin.has_parent());
    // The bin is still alive and still owns its child.
    assert_eq!(src.ref_count(), 2);

    drop(bin);
    assert_eq!(src.ref_count(), 1);
    assert!(src.parent().is_none());
}

#[test]
fn test_streaming_does_not_own_pads() {
    let pipeline = Pipeline::new("pipeline").unwrap();
    let src = Element::new_source("src", FakeSrc::new().with_interval(Duration::from_millis(1)));
    let fakesink = FakeSink::new();
    let stats = fakesink.stats();
    let sink = Element::new_sink("sink", fakesink);
    pipeline.add_many(&[&src, &sink]).unwrap();
    src.link(&sink).unwrap();

    let srcpad = src.static_pad("src").unwrap();
    let sinkpad = sink.static_pad("sink").unwrap();
    assert_eq!(srcpad.ref_count(), 2);
    assert_eq!(sinkpad.ref_count(), 2);

    pipeline.set_state(State::Playing).unwrap();
    wait_for_buffers(&stats, 5);
    assert_eq!(srcpad.ref_count(), 2);
    assert_eq!(sinkpad.ref_count(), 2);
    assert_eq!(src.ref_count(), 2);

    pipeline.set_state(State::Null).unwrap();
    assert_eq!(srcpad.ref_count(), 2);
    assert_eq!(sinkpad.ref_count(), 2);
}

#[test]
fn test_ghost_pad_counts() {
    let sink = Element::new_sink("sink", FakeSink::new());
    let target = sink.static_pad("sink").unwrap();
    let ghost = GhostPad::with_target("sink", &target).unwrap();
    assert_eq!(ghost.ref_count(), 1);

    let bin = Bin::new("bin");
    bin.add(&sink).unwrap();
    bin.add_pad(&ghost).unwrap();
    assert_eq!(ghost.ref_count(), 2);
    assert!(ghost.parent().unwrap().ptr_eq(&bin));

    drop(bin);
    assert_eq!(ghost.ref_count(), 1);
    assert!(!ghost.has_parent());
}

#[test]
fn test_remove_keeps_element_alive() {
    let pipeline = Pipeline::new("pipeline").unwrap();
    let src = Element::new_source("src", FakeSrc::new());
    let sink = Element::new_sink("sink", FakeSink::new());
    pipeline.add_many(&[&src, &sink]).unwrap();
    src.link(&sink).unwrap();

    pipeline.remove(&sink).unwrap();
    assert_eq!(sink.ref_count(), 1);
    assert!(!src.static_pad("src").unwrap().is_linked());
    assert!(pipeline.remove(&sink).is_err());

    pipeline.set_state(State::Paused).unwrap();
    assert_eq!(src.current_state(), State::Paused);
    assert_eq!(sink.current_state(), State::Null);
    pipeline.set_state(State::Null).unwrap();
}

#[test]
fn test_eos_reaches_bus() {
    let pipeline = Pipeline::new("pipeline").unwrap();
    let src = Element::new_source("src", FakeSrc::new().with_num_buffers(10));
    let sink = FakeSink::new();
    let stats = sink.stats();
    let sink = Element::new_sink("sink", sink);
    pipeline.add_many(&[&src, &sink]).unwrap();
    src.link(&sink).unwrap();

    let mut bus = pipeline.bus();
    pipeline.set_state(State::Playing).unwrap();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let eos = runtime.block_on(async {
        tokio::time::timeout(Duration::from_secs(10), bus.wait_eos()).await
    });
    assert_eq!(eos.unwrap(), Ok("src".to_string()));
    assert_eq!(stats.buffer_count(), 10);
    assert_eq!(stats.last_sequence(), 9);

    pipeline.set_state(State::Null).unwrap();
}
