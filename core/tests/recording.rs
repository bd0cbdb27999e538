//! Recording: session lifecycle, frame counts, fixed-step timing and
//! encoder failures.

use simcx_core::{
    command::DisplayCommand,
    config::DisplayConfig,
    display::{Display, RecordingStart},
    error::{SimError, SimResult},
    frame::{FrameBuffer, Painter},
    recorder::{FrameSink, MemorySink, Recorder, RecorderState, StreamSpec},
    simulator::{shared, Shared, SimHandle, Simulator},
    types::{Seconds, SessionId, BLACK},
    visual::{NativeVisual, Visual, VisualHandle},
};

/// Counts its steps and remembers every dt it was given.
#[derive(Default)]
struct Counter {
    steps: u8,
    dts:   Vec<Seconds>,
}

impl Simulator for Counter {
    fn name(&self) -> &'static str { "counter" }

    fn step(&mut self, dt: Seconds) -> SimResult<()> {
        self.steps += 1;
        self.dts.push(dt);
        Ok(())
    }
}

/// Paints the step count into the red channel.
struct CounterSwatch {
    sim: Shared<Counter>,
}

impl Visual for CounterSwatch {
    fn name(&self) -> &'static str { "counter_swatch" }
    fn width(&self) -> u32 { 4 }
    fn height(&self) -> u32 { 4 }
}

impl NativeVisual for CounterSwatch {
    fn draw(&mut self, painter: &mut Painter<'_>) -> SimResult<()> {
        let steps = self.sim.borrow().steps;
        painter.fill_rect(0, 0, 4, 4, [steps, 0, 0, 255]);
        Ok(())
    }
}

fn setup() -> (Display, Shared<Counter>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut display = Display::new(DisplayConfig::default().with_interval(0.05)).unwrap();
    let sim = shared(Counter::default());
    let handle: SimHandle = sim.clone();
    display.add_simulator(handle);
    let swatch = shared(CounterSwatch { sim: sim.clone() });
    display.add_visual(VisualHandle::native(&swatch), 0, 0).unwrap();
    (display, sim)
}

fn started(outcome: RecordingStart) -> SessionId {
    match outcome {
        RecordingStart::Started(id) => id,
        other => panic!("expected a new session, got {other:?}"),
    }
}

#[test]
fn ten_ticks_while_recording_yield_ten_fixed_step_frames() {
    let (mut display, sim) = setup();
    let sink = MemorySink::new();
    let tape = sink.tape();
    started(display.start_recording_into("out.mp4", None, None, Box::new(sink)).unwrap());

    let spec = tape.spec().unwrap();
    assert_eq!(spec.fps, 20.0, "fps defaults to 1 / interval");
    assert_eq!((spec.width, spec.height), (4, 4));

    display.handle_command(DisplayCommand::TogglePause).unwrap();
    for _ in 0..10 {
        // Wall time is irrelevant while recording.
        display.tick(0.2).unwrap();
    }

    assert_eq!(tape.frame_count(), 10);
    assert_eq!(display.recorder().unwrap().frames_written(), 10);
    assert!(sim.borrow().dts.iter().all(|&dt| dt == 0.05), "{:?}", sim.borrow().dts);
}

#[test]
fn recorded_frame_n_is_the_frame_displayed_before_step_n() {
    let (mut display, _sim) = setup();
    let sink = MemorySink::new();
    let tape = sink.tape();
    display.start_recording_into("out.mp4", None, None, Box::new(sink)).unwrap();
    display.handle_command(DisplayCommand::TogglePause).unwrap();

    for _ in 0..3 {
        display.compose().unwrap();
        display.tick(0.05).unwrap();
    }

    for n in 0..3u8 {
        let frame = tape.frame(n as usize).unwrap();
        assert_eq!(&frame[0..4], &[n, 0, 0, 255], "frame {n}");
    }
}

#[test]
fn explicit_fps_and_bitrate_override_the_defaults() {
    let (mut display, _sim) = setup();
    let sink = MemorySink::new();
    let tape = sink.tape();
    display.start_recording_into("out.mp4", Some(30.0), Some(900), Box::new(sink)).unwrap();

    let spec = tape.spec().unwrap();
    assert_eq!(spec.fps, 30.0);
    assert_eq!(spec.bitrate, 900);
}

#[test]
fn configured_fps_is_used_when_none_is_given() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut config = DisplayConfig::default();
    config.recording.fps = Some(12.5);
    let mut display = Display::new(config).unwrap();
    let sink = MemorySink::new();
    let tape = sink.tape();
    display.start_recording_into("out.mp4", None, None, Box::new(sink)).unwrap();

    assert_eq!(tape.spec().unwrap().fps, 12.5);
    assert_eq!(tape.spec().unwrap().bitrate, 1800);
}

#[test]
fn second_start_keeps_the_active_session() {
    let (mut display, _sim) = setup();
    let first = MemorySink::new();
    let first_tape = first.tape();
    let id = started(display.start_recording_into("a.mp4", None, None, Box::new(first)).unwrap());

    let second = MemorySink::new();
    let second_tape = second.tape();
    let outcome = display.start_recording_into("b.mp4", None, None, Box::new(second)).unwrap();

    assert_eq!(outcome, RecordingStart::AlreadyRecording(id));
    assert!(second_tape.spec().is_none(), "the second sink must never be opened");

    display.handle_command(DisplayCommand::Step).unwrap();
    assert_eq!(first_tape.frame_count(), 1);
    assert_eq!(second_tape.frame_count(), 0);
}

#[test]
fn finishing_stops_grabs_and_a_new_start_opens_a_fresh_session() {
    let (mut display, _sim) = setup();
    let sink = MemorySink::new();
    let tape = sink.tape();
    let first = started(display.start_recording_into("a.mp4", None, None, Box::new(sink)).unwrap());
    display.handle_command(DisplayCommand::Step).unwrap();

    assert!(display.finish_recording().unwrap());
    assert!(tape.is_closed());
    assert!(!display.finish_recording().unwrap(), "nothing left to finish");

    display.handle_command(DisplayCommand::Step).unwrap();
    assert_eq!(tape.frame_count(), 1, "no grabs after finish");

    let second = started(
        display.start_recording_into("b.mp4", None, None, Box::new(MemorySink::new())).unwrap(),
    );
    assert_ne!(first, second);
}

#[test]
fn recorder_rejects_use_outside_the_recording_state() {
    let frame = FrameBuffer::new(4, 4, BLACK);
    let mut recorder = Recorder::new(20.0, 1800, Box::new(MemorySink::new()));
    recorder.setup(&frame, "out.mp4").unwrap();
    recorder.grab_frame(&frame).unwrap();
    recorder.finish().unwrap();

    assert_eq!(recorder.state(), RecorderState::Finished);
    assert!(matches!(recorder.grab_frame(&frame), Err(SimError::RecorderState { .. })));
    assert!(matches!(recorder.finish(), Err(SimError::RecorderState { .. })));
    assert!(matches!(recorder.setup(&frame, "again.mp4"), Err(SimError::RecorderState { .. })));
    assert_eq!(recorder.frames_written(), 1);
}

#[test]
fn missing_encoder_program_fails_to_start() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut config = DisplayConfig::default();
    config.recording.encoder.program = "simcx-no-such-encoder".into();
    let mut display = Display::new(config).unwrap();

    let err = display.start_recording("out.mp4", None, None).unwrap_err();
    assert!(matches!(err, SimError::EncoderSpawn { ref program, .. } if program == "simcx-no-such-encoder"));
    assert!(!display.is_recording());
}

#[test]
fn record_command_with_a_broken_encoder_is_reported_not_raised() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut config = DisplayConfig::default();
    config.recording.encoder.program = "simcx-no-such-encoder".into();
    let mut display = Display::new(config).unwrap();

    let applied = display
        .handle_command(DisplayCommand::StartRecording { filename: Some("out.mp4".into()) })
        .unwrap();
    assert!(!applied);
    assert!(!display.is_recording());
}

#[test]
fn closing_the_display_finishes_the_recording() {
    let (mut display, _sim) = setup();
    let sink = MemorySink::new();
    let tape = sink.tape();
    display.start_recording_into("out.mp4", None, None, Box::new(sink)).unwrap();

    display.handle_command(DisplayCommand::Quit).unwrap();

    assert!(display.is_closed());
    assert!(tape.is_closed());
    assert!(!display.is_recording());
}

/// Accepts a fixed number of frames, then fails like an encoder whose
/// pipe has closed.
struct DyingEncoder {
    accepted: usize,
    budget:   usize,
}

impl FrameSink for DyingEncoder {
    fn describe(&self) -> &'static str { "dying encoder" }

    fn open(&mut self, _spec: &StreamSpec) -> SimResult<()> { Ok(()) }

    fn write_frame(&mut self, _rgba: &[u8]) -> SimResult<()> {
        if self.accepted == self.budget {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
        }
        self.accepted += 1;
        Ok(())
    }

    fn close(&mut self) -> SimResult<()> { Ok(()) }

    fn diagnostic(&mut self) -> Option<String> {
        Some("Unknown encoder 'libx999'".into())
    }
}

#[test]
fn failed_frame_write_carries_the_encoder_output() {
    let frame = FrameBuffer::new(4, 4, BLACK);
    let mut recorder = Recorder::new(20.0, 1800, Box::new(DyingEncoder { accepted: 0, budget: 1 }));
    recorder.setup(&frame, "out.mp4").unwrap();
    recorder.grab_frame(&frame).unwrap();

    let err = recorder.grab_frame(&frame).unwrap_err();
    match &err {
        SimError::FrameGrab { diagnostic: Some(text), .. } => assert!(text.contains("libx999")),
        other => panic!("expected a frame grab error with encoder output, got {other:?}"),
    }
    assert!(err.to_string().contains("Unknown encoder 'libx999'"), "{err}");
    assert_eq!(recorder.frames_written(), 1);
}

#[test]
fn failed_frame_write_ends_the_tick_with_an_error() {
    let (mut display, sim) = setup();
    let sink = DyingEncoder { accepted: 0, budget: 0 };
    display.start_recording_into("out.mp4", None, None, Box::new(sink)).unwrap();

    let err = display.handle_command(DisplayCommand::Step).unwrap_err();

    assert!(matches!(err, SimError::FrameGrab { diagnostic: Some(_), .. }), "{err:?}");
    assert_eq!(display.recorder().unwrap().frames_written(), 0);
    assert_eq!(sim.borrow().steps, 0, "the grab happens before any simulator steps");
}
