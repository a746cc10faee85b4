use criterion::{black_box, criterion_group, criterion_main, Criterion};
use patchbay::nodes::{Gain, Mixer, Sine};
use patchbay::{Engine, Graph};

const BLOCK: usize = 512;

fn sine_into_gain() -> Graph {
    let mut graph = Graph::new();
    graph.create_node("osc", Sine::new(440.0)).unwrap();
    graph.create_node("vol", Gain::new(0.5)).unwrap();
    graph.connect("osc", "out", "vol", "in").unwrap();
    graph.prepare(48_000, BLOCK);
    graph
}

/// Sixteen voices summed into one gain input, then a stereo mixer.
fn wide_fan_in() -> Graph {
    let mut graph = Graph::new();
    for i in 0..16 {
        let id = format!("v{}", i);
        graph
            .create_node(&id, Sine::new(110.0 * (i + 1) as f32).with_amplitude(0.05))
            .unwrap();
    }
    graph.create_node("bus", Gain::new(1.0)).unwrap();
    graph.create_node("mix", Mixer::stereo(2)).unwrap();
    for i in 0..16 {
        graph.connect(&format!("v{}", i), "out", "bus", "in").unwrap();
    }
    graph.connect("bus", "out", "mix", "in_0").unwrap();
    graph.connect("v0", "out", "mix", "in_1").unwrap();
    graph.prepare(48_000, BLOCK);
    graph
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Graph.process() sine -> gain", |b| {
        let mut graph = sine_into_gain();
        b.iter(|| graph.process(black_box(BLOCK)))
    });

    c.bench_function("Graph.process() 16 voice fan-in", |b| {
        let mut graph = wide_fan_in();
        b.iter(|| graph.process(black_box(BLOCK)))
    });

    c.bench_function("Engine.process() uncontended", |b| {
        let engine = Engine::from_graph(sine_into_gain());
        b.iter(|| engine.process(black_box(BLOCK)))
    });

    c.bench_function("Graph.connect() + disconnect()", |b| {
        let mut graph = wide_fan_in();
        b.iter(|| {
            graph.connect("v3", "out", "mix", "in_1").unwrap();
            graph.disconnect("v3", "out", "mix", "in_1").unwrap();
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
