//! The display, the heart of simcx.
//!
//! A display owns the clock, the registered simulators, the ordered
//! placements of visuals, the composited frame and the optional recorder.
//!
//! TICK ORDER (fixed, documented, never reordered):
//!   1. If recording, grab the frame presented last, before any state
//!      changes, so recorded frame n is displayed frame n.
//!   2. Resolve dt (fixed interval while recording or when real-time is
//!      off, measured wall time otherwise).
//!   3. Step every simulator, in registration order, sequentially.
//!   4. Draw and re-rasterize every raster visual.
//!
//! Native visuals are drawn later, at composition time. Composition draws
//! placements in insertion order (painter's algorithm) into a back buffer
//! and swaps only when every placement succeeded, so a failed draw never
//! leaves a half-composed frame on screen.

use crate::{
    clock::{FrameRateMeter, RunState, SimClock},
    command::DisplayCommand,
    config::DisplayConfig,
    error::{SimError, SimResult},
    frame::{FrameBuffer, Painter},
    recorder::{FfmpegSink, FrameSink, Recorder},
    simulator::{same_rc, SimHandle},
    types::{Seconds, SessionId, Tick},
    visual::VisualHandle,
};
use std::{path::Path, time::Instant};

const OVERLAY_BACKDROP: [u8; 4] = [0, 0, 0, 180];
const OVERLAY_TEXT: [u8; 4] = [255, 255, 255, 255];

/// Where a visual's output lands in the composed frame.
#[derive(Clone)]
pub struct Placement {
    pub visual: VisualHandle,
    pub x:      u32,
    pub y:      u32,
}

/// Outcome of a start-recording request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingStart {
    Started(SessionId),
    /// A session was already active and was left untouched.
    AlreadyRecording(SessionId),
}

pub struct Display {
    config:       DisplayConfig,
    clock:        SimClock,
    show_fps:     bool,
    sims:         Vec<SimHandle>,
    placements:   Vec<Placement>,
    front:        FrameBuffer,
    back:         FrameBuffer,
    recorder:     Option<Recorder>,
    fps_meter:    FrameRateMeter,
    last_compose: Option<Instant>,
    closed:       bool,
}

impl Display {
    /// A paused display whose clock is already scheduled at
    /// `config.interval`.
    pub fn new(config: DisplayConfig) -> SimResult<Self> {
        config.validate()?;
        let mut clock = SimClock::new(config.interval)?;
        clock.real_time = config.real_time;
        clock.schedule(config.interval)?;
        let front = FrameBuffer::new(config.width, config.height, config.background);
        let back = front.clone();
        log::info!(
            "display created: {}x{}, interval {}s",
            config.width,
            config.height,
            config.interval
        );
        Ok(Self {
            show_fps: config.show_fps,
            config,
            clock,
            sims: Vec::new(),
            placements: Vec::new(),
            front,
            back,
            recorder: None,
            fps_meter: FrameRateMeter::default(),
            last_compose: None,
            closed: false,
        })
    }

    pub fn config(&self) -> &DisplayConfig { &self.config }
    pub fn clock(&self) -> &SimClock { &self.clock }
    pub fn width(&self) -> u32  { self.front.width() }
    pub fn height(&self) -> u32 { self.front.height() }
    pub fn is_paused(&self) -> bool { self.clock.is_paused() }
    pub fn show_fps(&self) -> bool { self.show_fps }
    pub fn is_closed(&self) -> bool { self.closed }
    pub fn current_tick(&self) -> Tick { self.clock.current_tick }

    pub fn set_real_time(&mut self, real_time: bool) {
        self.clock.real_time = real_time;
    }

    pub fn caption(&self) -> String {
        match self.clock.run_state {
            RunState::Paused  => format!("{} (paused)", self.config.caption),
            RunState::Running => self.config.caption.clone(),
        }
    }

    pub fn simulator_count(&self) -> usize {
        self.sims.len()
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// The frame presented last.
    pub fn frame(&self) -> &FrameBuffer {
        &self.front
    }

    pub fn recorder(&self) -> Option<&Recorder> {
        self.recorder.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.as_ref().is_some_and(Recorder::is_recording)
    }

    /// Register a simulator. Returns false if this instance is already
    /// registered.
    pub fn add_simulator(&mut self, sim: SimHandle) -> bool {
        if self.sims.iter().any(|s| same_rc(s, &sim)) {
            return false;
        }
        log::debug!("simulator '{}' registered", sim.borrow().name());
        self.sims.push(sim);
        true
    }

    /// Place a visual with its bottom-left corner at (x, y). Returns false
    /// if this instance is already placed.
    pub fn add_visual(&mut self, visual: VisualHandle, x: u32, y: u32) -> SimResult<bool> {
        if self.placements.iter().any(|p| p.visual.same_instance(&visual)) {
            return Ok(false);
        }
        let (w, h) = visual.extent();
        if w == 0 || h == 0 {
            return Err(SimError::InvalidPlacement {
                name:   visual.name().to_string(),
                reason: "has zero extent",
            });
        }
        if x.checked_add(w).is_none() || y.checked_add(h).is_none() {
            return Err(SimError::InvalidPlacement {
                name:   visual.name().to_string(),
                reason: "does not fit the frame coordinate range",
            });
        }
        if let VisualHandle::Raster(v) = &visual {
            // Rasterize now so the first composed frame is not blank.
            v.borrow_mut().update_image()?;
        }
        log::debug!("visual '{}' placed at ({x}, {y}), {w}x{h}", visual.name());
        self.placements.push(Placement { visual, x, y });
        self.resize_window();
        Ok(true)
    }

    /// Window extents are the bounding box of all placements. Placements
    /// are never removed, so this only ever grows once a visual is added.
    fn resize_window(&mut self) {
        let (max_x, max_y) = self.placements.iter().fold((0u32, 0u32), |(mx, my), p| {
            let (w, h) = p.visual.extent();
            (mx.max(p.x.saturating_add(w)), my.max(p.y.saturating_add(h)))
        });
        if (max_x, max_y) == (self.front.width(), self.front.height()) {
            return;
        }
        if self.is_recording() {
            log::warn!("display resized to {max_x}x{max_y} while recording; output is undefined");
        }
        self.front.resize(max_x, max_y);
        self.back.resize(max_x, max_y);
        log::info!("display resized to {max_x}x{max_y}");
    }

    /// Start recording through the configured encoder.
    pub fn start_recording(
        &mut self,
        filename: impl AsRef<Path>,
        fps: Option<f64>,
        bitrate: Option<u32>,
    ) -> SimResult<RecordingStart> {
        if let Some(active) = self.active_session() {
            return Ok(active);
        }
        let sink = FfmpegSink::new(self.config.recording.encoder.clone());
        self.start_recording_into(filename, fps, bitrate, Box::new(sink))
    }

    /// Start recording into a caller-supplied sink. If a session is
    /// already active the sink is dropped unopened.
    pub fn start_recording_into(
        &mut self,
        filename: impl AsRef<Path>,
        fps: Option<f64>,
        bitrate: Option<u32>,
        sink: Box<dyn FrameSink>,
    ) -> SimResult<RecordingStart> {
        if let Some(active) = self.active_session() {
            return Ok(active);
        }
        let fps = fps
            .or(self.config.recording.fps)
            .unwrap_or_else(|| self.clock.rate());
        let bitrate = bitrate.unwrap_or(self.config.recording.bitrate);
        let mut recorder = Recorder::new(fps, bitrate, sink);
        recorder.setup(&self.front, filename)?;
        let session = recorder.session_id();
        self.recorder = Some(recorder);
        Ok(RecordingStart::Started(session))
    }

    fn active_session(&self) -> Option<RecordingStart> {
        let recorder = self.recorder.as_ref().filter(|r| r.is_recording())?;
        log::warn!(
            "A movie is already being recorded for this display (session {}).",
            recorder.session_id()
        );
        Some(RecordingStart::AlreadyRecording(recorder.session_id()))
    }

    /// Finish the active recording. Returns false if none was active.
    pub fn finish_recording(&mut self) -> SimResult<bool> {
        match self.recorder.as_mut() {
            Some(recorder) if recorder.is_recording() => {
                recorder.finish()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Timer callback: `elapsed` is the wall time since the previous fire.
    /// Returns true if the simulation was stepped.
    pub fn tick(&mut self, elapsed: Seconds) -> SimResult<bool> {
        let Some(dt) = self.clock.fire(elapsed, self.is_recording()) else {
            return Ok(false);
        };
        self.step_simulation(dt)?;
        Ok(true)
    }

    fn step_simulation(&mut self, dt: Seconds) -> SimResult<()> {
        if let Some(recorder) = self.recorder.as_mut().filter(|r| r.is_recording()) {
            recorder.grab_frame(&self.front)?;
        }
        let tick = self.clock.advance();
        for sim in &self.sims {
            sim.borrow_mut().step(dt)?;
        }
        self.redraw_raster_visuals()?;
        log::debug!("tick={tick} stepped {} simulators, dt={dt:.4}", self.sims.len());
        Ok(())
    }

    fn reset_simulation(&mut self) -> SimResult<()> {
        for sim in &self.sims {
            sim.borrow_mut().reset()?;
        }
        self.redraw_raster_visuals()?;
        self.clock.rewind();
        log::info!("simulation reset ({} simulators)", self.sims.len());
        Ok(())
    }

    fn redraw_raster_visuals(&mut self) -> SimResult<()> {
        for placement in &self.placements {
            if let VisualHandle::Raster(v) = &placement.visual {
                let mut v = v.borrow_mut();
                v.draw()?;
                v.update_image()?;
            }
        }
        Ok(())
    }

    /// Apply an operator command. Returns true if it had an effect;
    /// commands invalid in the current state are ignored.
    pub fn handle_command(&mut self, command: DisplayCommand) -> SimResult<bool> {
        let name = command.name();
        let applied = match command {
            DisplayCommand::TogglePause => {
                self.clock.toggle();
                log::info!("tick={} {}", self.clock.current_tick, self.caption());
                true
            }
            DisplayCommand::Step => {
                if self.is_paused() {
                    let dt = self.clock.step_dt(self.clock.interval(), self.is_recording());
                    self.step_simulation(dt)?;
                }
                self.is_paused()
            }
            DisplayCommand::Reset => {
                if self.is_paused() {
                    self.reset_simulation()?;
                }
                self.is_paused()
            }
            DisplayCommand::ToggleFps => {
                self.show_fps = !self.show_fps;
                true
            }
            DisplayCommand::StartRecording { filename } => {
                let filename = filename.unwrap_or_else(|| self.config.recording.movie_filename());
                match self.start_recording(&filename, None, None) {
                    Ok(RecordingStart::Started(_)) => true,
                    Ok(RecordingStart::AlreadyRecording(_)) => false,
                    Err(e) => {
                        log::error!("Recording not started: {e}");
                        false
                    }
                }
            }
            DisplayCommand::FinishRecording => self.finish_recording()?,
            DisplayCommand::Quit => {
                self.close()?;
                true
            }
        };
        if !applied {
            log::debug!("tick={} command '{name}' ignored", self.clock.current_tick);
        }
        Ok(applied)
    }

    /// Compose every placement into a fresh frame and present it.
    pub fn compose(&mut self) -> SimResult<()> {
        self.back.clear();
        let fps = self.fps_meter.fps();
        {
            let mut painter = Painter::new(&mut self.back);
            for placement in &self.placements {
                let (x, y) = (placement.x as i64, placement.y as i64);
                match &placement.visual {
                    VisualHandle::Raster(v) => {
                        let v = v.borrow();
                        let bridge = v.bridge();
                        painter.blit(bridge.pixels(), bridge.width(), bridge.height(), bridge.stride(), x, y);
                    }
                    VisualHandle::Native(v) => {
                        painter.push_translation(x, y);
                        let drawn = v.borrow_mut().draw(&mut painter);
                        painter.pop_translation();
                        drawn?;
                    }
                }
            }
            if self.show_fps {
                draw_fps_overlay(&mut painter, fps);
            }
        }
        std::mem::swap(&mut self.front, &mut self.back);
        for sim in &self.sims {
            sim.borrow_mut().mark_clean();
        }
        let now = Instant::now();
        if let Some(previous) = self.last_compose.replace(now) {
            self.fps_meter.record(now.duration_since(previous).as_secs_f64());
        }
        Ok(())
    }

    /// Write the presented frame to an image file (format from extension).
    pub fn snapshot_png(&self, path: impl AsRef<Path>) -> SimResult<()> {
        self.front.to_image()?.save(path.as_ref())?;
        log::info!("snapshot written to {}", path.as_ref().display());
        Ok(())
    }

    /// Finish any active recording, stop the clock and release the surface.
    pub fn close(&mut self) -> SimResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.clock.unschedule();
        let finished = self.finish_recording();
        self.front.release();
        self.back.release();
        log::info!("display closed at tick={}", self.clock.current_tick);
        finished.map(|_| ())
    }
}

fn draw_fps_overlay(painter: &mut Painter<'_>, fps: f64) {
    let text = format!("{fps:.1}");
    let scale = 2;
    let width = text.chars().count() as u32 * 4 * scale + 2 * scale;
    painter.fill_rect(0, 0, width, 7 * scale, OVERLAY_BACKDROP);
    painter.digits(scale as i64 * 2, scale as i64, &text, scale, OVERLAY_TEXT);
}
