use std::f64::consts::TAU;
use std::sync::Arc;

use parking_lot::Mutex;
use patchbay::nodes::{AudioInput, BlockDelay, Gain, Pan, Sine, Slider, Threshold};
use patchbay::{
    ControlValue, ControlValues, Direction, Event, EventQueues, ExecutionOrder, Graph, GraphConfig, GraphError, Node,
    NodeBase, PortKind, ProcessContext,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// What a [`Recorder`] saw on its last block.
#[derive(Default)]
struct Seen {
    audio: Option<Vec<f32>>,
    control: Option<ControlValue>,
    events: Vec<Event>,
}

/// Sink with one input of each kind: `audio`, `control`, `events`.
struct Recorder {
    base: NodeBase,
    seen: Arc<Mutex<Seen>>,
}

impl Recorder {
    fn new() -> (Self, Arc<Mutex<Seen>>) {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let node = Self {
            base: NodeBase::new()
                .with_input("audio", PortKind::Audio)
                .with_input("control", PortKind::Control)
                .with_input("events", PortKind::Event),
            seen: Arc::clone(&seen),
        };
        (node, seen)
    }
}

impl Node for Recorder {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn update_events(&mut self, inputs: &EventQueues, _outputs: &mut EventQueues) {
        self.seen.lock().events = inputs.events("events").to_vec();
    }

    fn update_control(&mut self, inputs: &ControlValues, _outputs: &mut ControlValues) {
        self.seen.lock().control = inputs.get("control").cloned();
    }

    fn render_audio(&mut self, _ctx: &ProcessContext, inputs: &[Option<&[f32]>], _outputs: &mut [&mut [f32]]) {
        self.seen.lock().audio = inputs.first().copied().flatten().map(<[f32]>::to_vec);
    }
}

/// Counts up by one per sample, starting at zero.
struct Ramp {
    base: NodeBase,
    next: f32,
}

impl Ramp {
    fn new() -> Self {
        Self {
            base: NodeBase::new()
                .with_output("out", PortKind::Audio)
                .with_fade_in_ms(0.0),
            next: 0.0,
        }
    }
}

impl Node for Ramp {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn render_audio(&mut self, _ctx: &ProcessContext, _inputs: &[Option<&[f32]>], outputs: &mut [&mut [f32]]) {
        for sample in outputs[0].iter_mut() {
            *sample = self.next;
            self.next += 1.0;
        }
    }
}

/// Publishes a fixed control value on `value` and fixed events on `events`
/// every block.
struct Publisher {
    base: NodeBase,
    value: ControlValue,
    events: Vec<Event>,
}

impl Publisher {
    fn new(value: impl Into<ControlValue>, events: Vec<Event>) -> Self {
        Self {
            base: NodeBase::new()
                .with_output("value", PortKind::Control)
                .with_output("events", PortKind::Event),
            value: value.into(),
            events,
        }
    }
}

impl Node for Publisher {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn update_events(&mut self, _inputs: &EventQueues, outputs: &mut EventQueues) {
        for event in &self.events {
            outputs.push("events", event.clone());
        }
    }

    fn update_control(&mut self, _inputs: &ControlValues, outputs: &mut ControlValues) {
        outputs.set("value", self.value.clone());
    }

    fn render_audio(&mut self, _ctx: &ProcessContext, _inputs: &[Option<&[f32]>], _outputs: &mut [&mut [f32]]) {}
}

fn sine(frequency: f32, amplitude: f32) -> Sine {
    Sine::new(frequency)
        .with_amplitude(amplitude)
        .with_fade_in_ms(0.0)
}

fn output(graph: &Graph, id: &str) -> Vec<f32> {
    graph.node_output(id, 0).map(<[f32]>::to_vec).unwrap_or_default()
}

#[test]
fn sine_through_gain_matches_closed_form() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("s", sine(440.0, 0.5)).unwrap();
    graph.create_node("g", Gain::new(0.2).with_fade_in_ms(0.0)).unwrap();
    graph.connect("s", "out", "g", "in").unwrap();

    // A quarter cycle per sample.
    graph.prepare(1760, 4);
    for block in 0..4 {
        graph.process(4);
        let out = output(&graph, "g");
        if block == 0 {
            assert_eq!(out[0], 0.0);
        }
        for (i, &sample) in out.iter().enumerate() {
            let n = (block * 4 + i) as f64;
            let expected = (TAU * 440.0 * n / 1760.0).sin() * 0.5 * 0.2;
            assert!((sample as f64 - expected).abs() < 1e-6, "sample {n}: {sample} vs {expected}");
        }
    }
}

#[test]
fn many_sources_are_summed_per_sample() {
    init_tracing();
    let mut graph = Graph::new();
    let voices = [("c", 261.63), ("e", 329.63), ("g", 392.00)];
    for (id, frequency) in voices {
        graph.create_node(id, sine(frequency as f32, 0.15)).unwrap();
    }
    let (recorder, seen) = Recorder::new();
    graph.create_node("rec", recorder).unwrap();
    for (id, _) in voices {
        graph.connect(id, "out", "rec", "audio").unwrap();
    }

    graph.prepare(48_000, 64);
    assert_eq!(graph.scratch_buffers(), 1);

    for block in 0..3 {
        graph.process(64);
        let c = output(&graph, "c");
        let e = output(&graph, "e");
        let g = output(&graph, "g");
        let summed = seen.lock().audio.clone().unwrap();

        for i in 0..64 {
            assert_eq!(summed[i], c[i] + e[i] + g[i]);

            let n = (block * 64 + i) as f64;
            let expected: f64 = voices
                .iter()
                .map(|&(_, f)| (TAU * f * n / 48_000.0).sin() * 0.15)
                .sum();
            assert!((summed[i] as f64 - expected).abs() < 1e-4);
        }
    }
}

#[test]
fn disconnect_silences_and_reconnect_resumes() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("s", sine(440.0, 1.0)).unwrap();
    graph.create_node("g", Gain::new(1.0).with_fade_in_ms(0.0)).unwrap();
    graph.connect("s", "out", "g", "in").unwrap();
    graph.prepare(1760, 4);

    graph.process(4);
    assert!(output(&graph, "g").iter().any(|&s| s != 0.0));

    graph.disconnect("s", "out", "g", "in").unwrap();
    for _ in 0..3 {
        graph.process(4);
        assert!(output(&graph, "g").iter().all(|&s| s == 0.0));
    }

    graph.connect("s", "out", "g", "in").unwrap();
    graph.process(4);
    assert!(output(&graph, "g").iter().any(|&s| s != 0.0));
}

#[test]
fn hot_add_is_not_retroactive() {
    init_tracing();
    let build = || {
        let mut graph = Graph::new();
        graph.create_node("s", sine(440.0, 0.5)).unwrap();
        graph.create_node("g", Gain::new(0.5).with_fade_in_ms(0.0)).unwrap();
        graph.connect("s", "out", "g", "in").unwrap();
        graph.prepare(48_000, 32);
        graph
    };

    let mut live = build();
    let mut reference = build();
    for _ in 0..2 {
        live.process(32);
        reference.process(32);
    }

    let before = output(&live, "g");
    live.create_node("late", sine(1000.0, 1.0)).unwrap();
    live.connect("late", "out", "g", "in").unwrap();
    assert_eq!(output(&live, "g"), before);
    assert_eq!(live.node_output("late", 0).map(<[f32]>::len), Some(32));

    // Disconnecting again leaves the original voice untouched.
    live.disconnect("late", "out", "g", "in").unwrap();
    live.process(32);
    reference.process(32);
    assert_eq!(output(&live, "g"), output(&reference, "g"));
}

#[test]
fn audio_to_control_reads_last_frame() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("ramp", Ramp::new()).unwrap();
    let (recorder, seen) = Recorder::new();
    graph.create_node("rec", recorder).unwrap();
    graph.connect("ramp", "out", "rec", "control").unwrap();
    graph.prepare(1000, 8);

    graph.process(8);
    assert_eq!(seen.lock().control, Some(ControlValue::Float(7.0)));
    graph.process(8);
    assert_eq!(seen.lock().control, Some(ControlValue::Float(15.0)));
    // A short block: the last frame rendered, not the last of the buffer.
    graph.process(5);
    assert_eq!(seen.lock().control, Some(ControlValue::Float(20.0)));
}

#[test]
fn fade_in_follows_linear_law() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("level", Slider::new(0.0, 1.0, 1.0)).unwrap();
    graph.create_node("g", Gain::new(1.0).with_fade_in_ms(10.0)).unwrap();
    graph.connect("level", "value", "g", "in").unwrap();
    graph.prepare(1000, 4);
    assert_eq!(graph.node("g").unwrap().base().fade_in().length(), 10.0);

    let mut rendered = Vec::new();
    for _ in 0..5 {
        graph.process(4);
        rendered.extend(output(&graph, "g"));
    }
    for (k, &sample) in rendered.iter().enumerate() {
        let expected = (k as f32 / 10.0).min(1.0);
        assert!((sample - expected).abs() < 1e-6, "k = {k}");
    }
    assert_eq!(&rendered[10..], &[1.0; 10]);
}

#[test]
fn reconnecting_a_silent_node_restarts_its_fade() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("level", Slider::new(0.0, 1.0, 1.0)).unwrap();
    graph.create_node("g", Gain::new(1.0).with_fade_in_ms(4.0)).unwrap();
    graph.prepare(1000, 4);

    // Unconnected blocks run the ramp out on silence.
    graph.process(4);
    graph.process(4);
    assert!(!graph.node("g").unwrap().base().fade_in().is_active());

    graph.connect("level", "value", "g", "in").unwrap();
    graph.process(4);
    assert_eq!(output(&graph, "g"), vec![0.0, 0.25, 0.5, 0.75]);
}

#[test]
fn control_to_audio_holds_float_values() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("level", Slider::new(0.0, 1.0, 0.25)).unwrap();
    graph.create_node("label", Publisher::new("loud", Vec::new())).unwrap();
    let (float_rec, float_seen) = Recorder::new();
    let (text_rec, text_seen) = Recorder::new();
    graph.create_node("float", float_rec).unwrap();
    graph.create_node("text", text_rec).unwrap();
    graph.connect("level", "value", "float", "audio").unwrap();
    graph.connect("label", "value", "text", "audio").unwrap();
    graph.prepare(1000, 4);

    graph.process(4);
    assert_eq!(float_seen.lock().audio, Some(vec![0.25; 4]));
    assert_eq!(text_seen.lock().audio, Some(vec![0.0; 4]));
}

#[test]
fn control_to_control_last_route_wins() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("a", Publisher::new(1.0f32, Vec::new())).unwrap();
    graph.create_node("b", Publisher::new(2.0f32, Vec::new())).unwrap();
    let (recorder, seen) = Recorder::new();
    graph.create_node("rec", recorder).unwrap();
    graph.connect("b", "value", "rec", "control").unwrap();
    graph.connect("a", "value", "rec", "control").unwrap();
    graph.prepare(1000, 4);

    graph.process(4);
    assert_eq!(seen.lock().control, Some(ControlValue::Float(1.0)));
}

#[test]
fn events_convert_to_control_and_concatenate() {
    init_tracing();
    let mut graph = Graph::new();
    let notes = vec![Event::new("note", 60, 0), Event::new("note", 64, 2)];
    let clock = vec![Event::new("tick", true, 3)];
    graph.create_node("notes", Publisher::new(0.0f32, notes.clone())).unwrap();
    graph.create_node("clock", Publisher::new(0.0f32, clock.clone())).unwrap();
    let (recorder, seen) = Recorder::new();
    graph.create_node("rec", recorder).unwrap();
    graph.connect("notes", "events", "rec", "control").unwrap();
    graph.connect("notes", "events", "rec", "events").unwrap();
    graph.connect("clock", "events", "rec", "events").unwrap();
    graph.prepare(1000, 4);

    graph.process(4);
    let seen = seen.lock();
    assert_eq!(seen.control, Some(ControlValue::Int(64)));
    let expected: Vec<Event> = notes.into_iter().chain(clock).collect();
    assert_eq!(seen.events, expected);
}

#[test]
fn events_live_for_one_block() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("ramp", Ramp::new()).unwrap();
    graph.create_node("gate", Threshold::new(2.5).with_fade_in_ms(0.0)).unwrap();
    let (recorder, seen) = Recorder::new();
    graph.create_node("rec", recorder).unwrap();
    graph.connect("ramp", "out", "gate", "in").unwrap();
    graph.connect("gate", "trigger", "rec", "events").unwrap();
    graph.prepare(1000, 4);

    graph.process(4);
    assert!(seen.lock().events.is_empty());
    assert_eq!(output(&graph, "gate"), vec![0.0, 1.0, 2.0, 3.0]);

    graph.process(4);
    {
        let seen = seen.lock();
        assert_eq!(seen.events.len(), 1);
        assert_eq!(&*seen.events[0].kind, "trigger");
        assert_eq!(seen.events[0].value, ControlValue::Float(3.0));
        assert_eq!(seen.events[0].offset, 3);
    }
    assert_eq!(graph.event_output("gate", "trigger").len(), 1);

    graph.process(4);
    assert!(seen.lock().events.is_empty());
    assert!(graph.event_output("gate", "trigger").is_empty());
}

#[test]
fn conversion_gaps_are_accepted_but_silent() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("s", sine(440.0, 1.0)).unwrap();
    graph
        .create_node("p", Publisher::new(1.0f32, vec![Event::new("x", 1.0f32, 0)]))
        .unwrap();
    let (recorder, seen) = Recorder::new();
    graph.create_node("rec", recorder).unwrap();

    graph.connect("s", "out", "rec", "events").unwrap();
    graph.connect("p", "value", "rec", "events").unwrap();
    graph.connect("p", "events", "rec", "audio").unwrap();
    assert_eq!(graph.connections().len(), 3);
    graph.prepare(1760, 4);

    graph.process(4);
    let seen = seen.lock();
    assert!(seen.events.is_empty());
    assert_eq!(seen.audio, None);
}

#[test]
fn structural_errors_leave_graph_unchanged() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("a", Gain::new(0.5)).unwrap();
    graph.create_node("b", Gain::new(1.0)).unwrap();
    graph.connect("a", "out", "b", "in").unwrap();

    assert_eq!(
        graph.create_node("a", Gain::new(0.9)),
        Err(GraphError::DuplicateNode("a".into()))
    );
    assert_eq!(
        graph.node("a").unwrap().base().param("gain"),
        Some(&ControlValue::Float(0.5))
    );

    assert_eq!(
        graph.connect("a", "out", "zz", "in"),
        Err(GraphError::UnknownNode("zz".into()))
    );
    assert!(matches!(
        graph.connect("a", "nope", "b", "in"),
        Err(GraphError::UnknownPort {
            direction: Direction::Output,
            ..
        })
    ));
    assert!(matches!(
        graph.connect("a", "out", "b", "nope"),
        Err(GraphError::UnknownPort {
            direction: Direction::Input,
            ..
        })
    ));
    assert_eq!(
        graph.connect("a", "out", "a", "in"),
        Err(GraphError::SelfConnection("a".into()))
    );
    assert!(matches!(
        graph.connect("a", "out", "b", "in"),
        Err(GraphError::DuplicateConnection(_))
    ));
    assert!(matches!(
        graph.disconnect("b", "out", "a", "in"),
        Err(GraphError::ConnectionNotFound(_))
    ));
    assert_eq!(
        graph.remove_node("zz"),
        Err(GraphError::UnknownNode("zz".into()))
    );

    assert_eq!(graph.len(), 2);
    assert_eq!(graph.connections().len(), 1);
}

#[test]
fn remove_node_severs_its_connections() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("s", sine(440.0, 1.0)).unwrap();
    graph.create_node("g", Gain::new(1.0).with_fade_in_ms(0.0)).unwrap();
    graph.create_node("h", Gain::new(1.0).with_fade_in_ms(0.0)).unwrap();
    graph.connect("s", "out", "g", "in").unwrap();
    graph.connect("g", "out", "h", "in").unwrap();
    graph.prepare(1760, 4);
    graph.process(4);

    graph.remove_node("g").unwrap();
    assert!(graph.connections().is_empty());
    assert!(!graph.contains("g"));
    assert_eq!(graph.node_output("g", 0), None);

    graph.process(4);
    assert!(output(&graph, "h").iter().all(|&s| s == 0.0));
    assert_eq!(graph.execution_order().collect::<Vec<_>>(), vec!["s", "h"]);
}

#[test]
fn registration_order_is_flagged_and_topological_order_fixes_it() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("g", Gain::new(0.5).with_fade_in_ms(0.0)).unwrap();
    graph.create_node("s", sine(440.0, 1.0)).unwrap();
    graph.connect("s", "out", "g", "in").unwrap();
    graph.prepare(1760, 4);

    assert_eq!(graph.execution_order().collect::<Vec<_>>(), vec!["g", "s"]);
    assert_eq!(graph.stale_connections().len(), 1);

    graph.set_order_mode(ExecutionOrder::Topological);
    assert_eq!(graph.execution_order().collect::<Vec<_>>(), vec!["s", "g"]);
    assert!(graph.stale_connections().is_empty());

    graph.process(4);
    let expected: Vec<f32> = output(&graph, "s").iter().map(|s| s * 0.5).collect();
    assert_eq!(output(&graph, "g"), expected);
}

#[test]
fn cycles_fall_back_and_block_delay_breaks_them() {
    init_tracing();
    let config = GraphConfig::default().with_order(ExecutionOrder::Topological);
    let mut graph = Graph::with_config(config);
    graph.create_node("a", Gain::new(0.5)).unwrap();
    graph.create_node("b", Gain::new(0.5)).unwrap();
    graph.connect("a", "out", "b", "in").unwrap();
    graph.connect("b", "out", "a", "in").unwrap();

    let mut cycle: Vec<&str> = graph.order_cycle().iter().map(|id| &**id).collect();
    cycle.sort_unstable();
    assert_eq!(cycle, vec!["a", "b"]);
    assert_eq!(graph.execution_order().collect::<Vec<_>>(), vec!["a", "b"]);

    graph.disconnect("b", "out", "a", "in").unwrap();
    graph.create_node("d", BlockDelay::new()).unwrap();
    graph.connect("b", "out", "d", "in").unwrap();
    graph.connect("d", "out", "a", "in").unwrap();

    assert!(graph.order_cycle().is_empty());
    assert_eq!(graph.execution_order().collect::<Vec<_>>(), vec!["d", "a", "b"]);
}

#[test]
fn feedback_through_block_delay_decays() {
    init_tracing();
    let config = GraphConfig::default().with_order(ExecutionOrder::Topological);
    let mut graph = Graph::with_config(config);
    graph.create_node("kick", Slider::new(0.0, 1.0, 1.0)).unwrap();
    graph.create_node("loop", Gain::new(0.5).with_fade_in_ms(0.0)).unwrap();
    graph.create_node("d", BlockDelay::new().with_fade_in_ms(0.0)).unwrap();
    graph.connect("kick", "value", "loop", "in").unwrap();
    graph.connect("loop", "out", "d", "in").unwrap();
    graph.connect("d", "out", "loop", "in").unwrap();
    graph.prepare(1000, 2);

    graph.process(2);
    assert_eq!(output(&graph, "loop"), vec![0.5, 0.5]);

    // Remove the impulse; the loop keeps halving.
    graph.set_param("kick", "value", 0.0f32).unwrap();
    graph.process(2);
    assert_eq!(output(&graph, "loop"), vec![0.25, 0.25]);
    graph.process(2);
    assert_eq!(output(&graph, "loop"), vec![0.125, 0.125]);
}

#[test]
fn block_delay_created_first_reads_previous_block() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("d", BlockDelay::new().with_fade_in_ms(0.0)).unwrap();
    graph.create_node("ramp", Ramp::new()).unwrap();
    graph.connect("ramp", "out", "d", "in").unwrap();
    assert!(graph.stale_connections().is_empty());
    graph.prepare(1000, 4);

    graph.process(4);
    assert_eq!(output(&graph, "d"), vec![0.0; 4]);
    graph.process(4);
    assert_eq!(output(&graph, "d"), vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn set_param_checks_name_and_type() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("g", Gain::new(1.0)).unwrap();

    graph.set_param("g", "gain", 0.25f32).unwrap();
    assert_eq!(
        graph.node("g").unwrap().base().param("gain"),
        Some(&ControlValue::Float(0.25))
    );
    assert!(matches!(
        graph.set_param("g", "gain", true),
        Err(GraphError::ParamRejected { .. })
    ));
    assert!(matches!(
        graph.set_param("g", "nope", 1.0f32),
        Err(GraphError::ParamRejected { .. })
    ));
    assert_eq!(
        graph.set_param("zz", "gain", 1.0f32),
        Err(GraphError::UnknownNode("zz".into()))
    );
}

#[test]
fn clear_keeps_timing() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("s", sine(440.0, 1.0)).unwrap();
    graph.prepare(1000, 4);
    graph.process(4);

    graph.clear();
    assert!(graph.is_empty());
    assert!(graph.connections().is_empty());
    assert!(graph.is_prepared());
    assert_eq!((graph.sample_rate(), graph.block_size()), (1000, 4));

    graph.create_node("s", sine(250.0, 1.0)).unwrap();
    graph.process(4);
    assert_eq!(output(&graph, "s").len(), 4);
    assert!((output(&graph, "s")[1] - 1.0).abs() < 1e-6);
}

#[test]
fn frames_are_clamped_to_block_size() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("ramp", Ramp::new()).unwrap();

    graph.process(4);
    assert_eq!(graph.blocks_rendered(), 0);
    assert_eq!(graph.node_output("ramp", 0), None);

    graph.prepare(1000, 4);
    graph.process(100);
    assert_eq!(output(&graph, "ramp"), vec![0.0, 1.0, 2.0, 3.0]);
    graph.process(4);
    assert_eq!(output(&graph, "ramp"), vec![4.0, 5.0, 6.0, 7.0]);
    assert_eq!(graph.blocks_rendered(), 2);
}

#[test]
fn physical_inputs_reach_audio_input_nodes() {
    init_tracing();
    let mut graph = Graph::with_config(GraphConfig::default().with_input_channels(2));
    graph.create_node("mic", AudioInput::new(1).with_fade_in_ms(0.0)).unwrap();
    graph.prepare(1000, 4);
    assert_eq!(graph.physical_input_count(), 2);

    graph.set_physical_input(1, &[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(graph.physical_input(1), Some(&[1.0, 2.0, 3.0, 0.0][..]));
    assert_eq!(
        graph.set_physical_input(2, &[1.0]),
        Err(GraphError::UnknownChannel(2))
    );

    graph.process(4);
    assert_eq!(output(&graph, "mic"), vec![1.0, 2.0, 3.0, 0.0]);
}

#[test]
fn pan_splits_with_constant_power() {
    init_tracing();
    let mut graph = Graph::new();
    graph.create_node("level", Slider::new(0.0, 1.0, 1.0)).unwrap();
    graph.create_node("pan", Pan::new(0.0).with_fade_in_ms(0.0)).unwrap();
    graph.connect("level", "value", "pan", "in").unwrap();
    graph.prepare(1000, 4);
    graph.process(4);

    let left = graph.node_output("pan", 0).unwrap()[0];
    let right = graph.node_output("pan", 1).unwrap()[0];
    assert!((left - right).abs() < 1e-6);
    assert!((left * left + right * right - 1.0).abs() < 1e-6);

    graph.set_param("pan", "pan", 1.0f32).unwrap();
    graph.process(4);
    assert!(graph.node_output("pan", 0).unwrap()[0].abs() < 1e-6);
}
