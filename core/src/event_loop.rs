//! The owned event loop.
//!
//! There is no global loop: callers build an `EventLoop`, hand it a
//! display by reference and a command channel, and call `run`. Everything
//! happens on the calling thread. Timer fires, command handling,
//! composition and presentation run to completion one after another; a
//! slow tick only delays the next one.

use crate::{
    command::DisplayCommand,
    display::Display,
    error::SimResult,
    frame::FrameBuffer,
    types::Tick,
};
use std::{
    sync::mpsc::{Receiver, TryRecvError},
    time::{Duration, Instant},
};

/// Upper bound on how long the loop sleeps before polling for commands.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Receives every composed frame. Window backends implement this.
pub trait Presenter {
    fn present(&mut self, frame: &FrameBuffer, caption: &str) -> SimResult<()>;
}

/// Discards frames. Keeps count and the last caption for inspection.
#[derive(Debug, Default)]
pub struct NullPresenter {
    pub frames_presented: u64,
    pub last_caption:     String,
}

impl Presenter for NullPresenter {
    fn present(&mut self, _frame: &FrameBuffer, caption: &str) -> SimResult<()> {
        self.frames_presented += 1;
        if self.last_caption != caption {
            self.last_caption = caption.to_string();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A `Quit` command closed the display.
    Quit,
    /// The configured tick limit was reached.
    TickLimit,
    /// The display was closed by other means.
    Closed,
    /// Every command sender hung up while the display was paused, so
    /// nothing could ever change again.
    Disconnected,
}

pub struct EventLoop {
    presenter:  Box<dyn Presenter>,
    tick_limit: Option<Tick>,
}

impl EventLoop {
    pub fn new(presenter: Box<dyn Presenter>) -> Self {
        Self { presenter, tick_limit: None }
    }

    /// Stop once the display's tick counter reaches `limit`.
    pub fn with_tick_limit(mut self, limit: Tick) -> Self {
        self.tick_limit = Some(limit);
        self
    }

    fn limit_reached(&self, display: &Display) -> bool {
        self.tick_limit.is_some_and(|limit| display.current_tick() >= limit)
    }

    fn present(&mut self, display: &mut Display) -> SimResult<()> {
        display.compose()?;
        self.presenter.present(display.frame(), &display.caption())
    }

    /// Drive `display` until quit, close, tick limit or disconnection.
    /// Errors from simulators, visuals or the recorder end the loop.
    pub fn run(
        &mut self,
        display: &mut Display,
        commands: &Receiver<DisplayCommand>,
    ) -> SimResult<LoopExit> {
        let interval = Duration::from_secs_f64(display.clock().interval());
        let mut last_fire = Instant::now();
        let mut next_fire = last_fire + interval;
        let mut senders_gone = false;

        self.present(display)?;
        log::info!("event loop started");

        loop {
            if display.is_closed() {
                return Ok(LoopExit::Closed);
            }
            if self.limit_reached(display) {
                log::info!("tick limit reached at tick={}", display.current_tick());
                return Ok(LoopExit::TickLimit);
            }

            // Input first, so a command issued during a tick applies before
            // the next one fires.
            while !senders_gone {
                match commands.try_recv() {
                    Ok(DisplayCommand::Quit) => {
                        display.close()?;
                        return Ok(LoopExit::Quit);
                    }
                    Ok(command) => {
                        if display.handle_command(command)? {
                            self.present(display)?;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => senders_gone = true,
                }
            }
            if senders_gone && display.is_paused() {
                log::info!("command channel closed while paused; leaving event loop");
                return Ok(LoopExit::Disconnected);
            }

            let now = Instant::now();
            if now < next_fire {
                std::thread::sleep((next_fire - now).min(POLL_INTERVAL));
                continue;
            }

            let elapsed = now.duration_since(last_fire).as_secs_f64();
            last_fire = now;
            // Late fires are not made up for.
            next_fire = (next_fire + interval).max(now + interval / 2);
            if display.tick(elapsed)? {
                self.present(display)?;
            }
        }
    }
}
