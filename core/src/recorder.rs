//! Recording sink: streams composited frames to a video encoder.
//!
//! LIFECYCLE (one way only):
//!   Uninitialized --setup()--> Recording --finish()--> Finished
//!
//! A finished recorder is never restarted. Grabbing or finishing outside
//! the Recording state is an error, not a silent no-op.
//!
//! Frame size is fixed at setup to the display's pixel size. Resizing the
//! display mid-recording is unsupported and yields undefined output.

use crate::{
    config::EncoderConfig,
    error::{SimError, SimResult},
    frame::{FrameBuffer, BYTES_PER_PIXEL},
    types::SessionId,
};
use chrono::{DateTime, Utc};
use std::{
    cell::RefCell,
    io::Write,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    rc::Rc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Uninitialized,
    Recording,
    Finished,
}

impl RecorderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Recording     => "recording",
            Self::Finished      => "finished",
        }
    }
}

/// Everything an encoder needs to know about the stream up front.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSpec {
    pub path:    PathBuf,
    pub width:   u32,
    pub height:  u32,
    pub fps:     f64,
    pub bitrate: u32,
}

impl StreamSpec {
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

/// Where grabbed frames end up. Frames arrive as top-down RGBA rows.
pub trait FrameSink {
    fn describe(&self) -> &'static str;

    fn open(&mut self, spec: &StreamSpec) -> SimResult<()>;

    fn write_frame(&mut self, rgba: &[u8]) -> SimResult<()>;

    fn close(&mut self) -> SimResult<()>;

    /// Encoder output collected after a failure, if any.
    fn diagnostic(&mut self) -> Option<String> {
        None
    }
}

pub struct Recorder {
    session_id:     SessionId,
    started_at:     Option<DateTime<Utc>>,
    state:          RecorderState,
    fps:            f64,
    bitrate:        u32,
    spec:           Option<StreamSpec>,
    frames_written: u64,
    sink:           Box<dyn FrameSink>,
}

impl Recorder {
    pub fn new(fps: f64, bitrate: u32, sink: Box<dyn FrameSink>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4(),
            started_at: None,
            state: RecorderState::Uninitialized,
            fps,
            bitrate,
            spec: None,
            frames_written: 0,
            sink,
        }
    }

    pub fn session_id(&self) -> SessionId { self.session_id }
    pub fn started_at(&self) -> Option<DateTime<Utc>> { self.started_at }
    pub fn state(&self) -> RecorderState { self.state }
    pub fn fps(&self) -> f64 { self.fps }
    pub fn bitrate(&self) -> u32 { self.bitrate }
    pub fn frames_written(&self) -> u64 { self.frames_written }
    pub fn spec(&self) -> Option<&StreamSpec> { self.spec.as_ref() }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    fn expect_state(&self, expected: RecorderState) -> SimResult<()> {
        if self.state != expected {
            return Err(SimError::RecorderState {
                expected: expected.as_str(),
                actual:   self.state.as_str(),
            });
        }
        Ok(())
    }

    /// Bind to `frame`'s size and open the output stream.
    pub fn setup(&mut self, frame: &FrameBuffer, path: impl AsRef<Path>) -> SimResult<()> {
        self.expect_state(RecorderState::Uninitialized)?;
        let spec = StreamSpec {
            path:    path.as_ref().to_path_buf(),
            width:   frame.width(),
            height:  frame.height(),
            fps:     self.fps,
            bitrate: self.bitrate,
        };
        self.sink.open(&spec)?;
        log::info!(
            "recording {} started: {} ({}x{} @ {} fps, {} kbit/s, {})",
            self.session_id,
            spec.path.display(),
            spec.width,
            spec.height,
            spec.fps,
            spec.bitrate,
            self.sink.describe(),
        );
        self.spec = Some(spec);
        self.started_at = Some(Utc::now());
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Append the current contents of `frame` to the stream.
    pub fn grab_frame(&mut self, frame: &FrameBuffer) -> SimResult<()> {
        self.expect_state(RecorderState::Recording)?;
        let stride = -(frame.width() as isize * BYTES_PER_PIXEL as isize);
        let data = frame.read_rgba(stride)?;
        if let Some(spec) = &self.spec {
            if data.len() != spec.frame_bytes() {
                log::warn!(
                    "recording {}: frame is {}x{}, stream expects {}x{}",
                    self.session_id,
                    frame.width(),
                    frame.height(),
                    spec.width,
                    spec.height,
                );
            }
        }
        if let Err(e) = self.sink.write_frame(&data) {
            let diagnostic = self.sink.diagnostic();
            log::error!(
                "recording {}: frame {} failed: {e}\n{}",
                self.session_id,
                self.frames_written,
                diagnostic.as_deref().unwrap_or("(no encoder output)"),
            );
            return Err(match e {
                SimError::FrameGrab { reason, diagnostic: None } => {
                    SimError::FrameGrab { reason, diagnostic }
                }
                grab @ SimError::FrameGrab { .. } => grab,
                other => SimError::FrameGrab { reason: other.to_string(), diagnostic },
            });
        }
        self.frames_written += 1;
        log::debug!("recording {}: grabbed frame {}", self.session_id, self.frames_written);
        Ok(())
    }

    /// Close the stream. The recorder cannot be used afterwards.
    pub fn finish(&mut self) -> SimResult<()> {
        self.expect_state(RecorderState::Recording)?;
        self.state = RecorderState::Finished;
        self.sink.close()?;
        log::info!(
            "recording {} finished: {} frames",
            self.session_id,
            self.frames_written
        );
        Ok(())
    }
}

/// Streams raw frames into an external `ffmpeg` process over a pipe.
pub struct FfmpegSink {
    encoder: EncoderConfig,
    child:   Option<Child>,
    stdin:   Option<ChildStdin>,
}

impl FfmpegSink {
    pub fn new(encoder: EncoderConfig) -> Self {
        Self { encoder, child: None, stdin: None }
    }

    /// Full argument list for a stream, program name excluded.
    pub fn arguments(&self, spec: &StreamSpec) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-loglevel".into(), "error".into(),
            "-f".into(), "rawvideo".into(),
            "-vcodec".into(), "rawvideo".into(),
            "-s".into(), format!("{}x{}", spec.width, spec.height),
            "-pix_fmt".into(), "rgba".into(),
            "-r".into(), format!("{}", spec.fps),
            "-i".into(), "pipe:".into(),
            "-vcodec".into(), self.encoder.codec.clone(),
            "-pix_fmt".into(), self.encoder.pixel_format.clone(),
            "-b:v".into(), format!("{}k", spec.bitrate),
        ];
        args.extend(self.encoder.extra_args.iter().cloned());
        args.push(spec.path.display().to_string());
        args
    }

    fn collect_output(&mut self) -> Option<String> {
        self.stdin = None;
        let child = self.child.take()?;
        match child.wait_with_output() {
            Ok(output) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                Some(text)
            }
            Err(e) => Some(format!("could not collect encoder output: {e}")),
        }
    }
}

impl FrameSink for FfmpegSink {
    fn describe(&self) -> &'static str {
        "ffmpeg"
    }

    fn open(&mut self, spec: &StreamSpec) -> SimResult<()> {
        let mut child = Command::new(&self.encoder.program)
            .args(self.arguments(spec))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SimError::EncoderSpawn {
                program: self.encoder.program.clone(),
                source,
            })?;
        self.stdin = child.stdin.take();
        self.child = Some(child);
        Ok(())
    }

    fn write_frame(&mut self, rgba: &[u8]) -> SimResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SimError::FrameGrab {
                reason:     "encoder pipe is closed".into(),
                diagnostic: None,
            });
        };
        stdin.write_all(rgba).map_err(|e| SimError::FrameGrab {
            reason:     format!("write to encoder failed: {e}"),
            diagnostic: None,
        })
    }

    fn close(&mut self) -> SimResult<()> {
        // Dropping stdin sends EOF so the encoder can flush the file.
        self.stdin = None;
        let Some(child) = self.child.take() else { return Ok(()) };
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(SimError::Other(anyhow::anyhow!(
                "{} exited with {}: {}",
                self.encoder.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end()
            )));
        }
        Ok(())
    }

    fn diagnostic(&mut self) -> Option<String> {
        self.collect_output()
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
    }
}

#[derive(Debug, Default)]
struct TapeInner {
    spec:   Option<StreamSpec>,
    frames: Vec<Vec<u8>>,
    closed: bool,
}

/// Read side of a `MemorySink`. Cheap to clone; all clones see the same
/// frames.
#[derive(Debug, Clone, Default)]
pub struct FrameTape(Rc<RefCell<TapeInner>>);

impl FrameTape {
    pub fn frame_count(&self) -> usize {
        self.0.borrow().frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<Vec<u8>> {
        self.0.borrow().frames.get(index).cloned()
    }

    pub fn spec(&self) -> Option<StreamSpec> {
        self.0.borrow().spec.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.0.borrow().closed
    }
}

/// Keeps every frame in memory. Used for headless runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    tape: FrameTape,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tape(&self) -> FrameTape {
        self.tape.clone()
    }
}

impl FrameSink for MemorySink {
    fn describe(&self) -> &'static str {
        "memory"
    }

    fn open(&mut self, spec: &StreamSpec) -> SimResult<()> {
        let mut inner = self.tape.0.borrow_mut();
        inner.spec = Some(spec.clone());
        inner.frames.clear();
        inner.closed = false;
        Ok(())
    }

    fn write_frame(&mut self, rgba: &[u8]) -> SimResult<()> {
        let mut inner = self.tape.0.borrow_mut();
        if inner.closed {
            return Err(SimError::FrameGrab {
                reason:     "memory sink is closed".into(),
                diagnostic: None,
            });
        }
        inner.frames.push(rgba.to_vec());
        Ok(())
    }

    fn close(&mut self) -> SimResult<()> {
        self.tape.0.borrow_mut().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BLACK;

    #[test]
    fn ffmpeg_arguments_describe_the_stream() {
        let sink = FfmpegSink::new(EncoderConfig::default());
        let spec = StreamSpec {
            path:    PathBuf::from("out.mp4"),
            width:   320,
            height:  240,
            fps:     20.0,
            bitrate: 1800,
        };
        let args = sink.arguments(&spec);
        let joined = args.join(" ");
        assert!(joined.contains("-s 320x240"), "{joined}");
        assert!(joined.contains("-pix_fmt rgba"), "{joined}");
        assert!(joined.contains("-r 20"), "{joined}");
        assert!(joined.contains("-b:v 1800k"), "{joined}");
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn grab_before_setup_is_a_state_error() {
        let frame = FrameBuffer::new(4, 4, BLACK);
        let mut recorder = Recorder::new(20.0, 1800, Box::new(MemorySink::new()));
        assert!(matches!(
            recorder.grab_frame(&frame),
            Err(SimError::RecorderState { expected: "recording", actual: "uninitialized" })
        ));
    }
}
