// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-by-frame video capture of the engine canvas.
//!
//! Encoding lives in a [`VideoCapture`] implementation supplied by the
//! application. [`CaptureRenderer`] drives it: it seeks the animation to the
//! start of the [`Timecode`], starts recording, and keeps the animation in
//! step with the frames the capture asks for. Frames are fed through
//! [`capture_hook`], which plugs into
//! [`CompositorControl::set_capture_hook`](crate::control::CompositorControl::set_capture_hook)
//! so a frame is grabbed each time the map is idle (fully loaded).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::control::CaptureHook;
use crate::id::CanvasId;

/// Time range and rate of a recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timecode {
    /// First frame time in milliseconds.
    pub start_ms: u64,
    /// Last frame time in milliseconds.
    pub end_ms: u64,
    /// Frames per second.
    pub framerate: u32,
}

impl Default for Timecode {
    fn default() -> Self {
        Self {
            start_ms: 0,
            end_ms: 5000,
            framerate: 30,
        }
    }
}

impl Timecode {
    /// Length of the recording in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Number of frames in the recording.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.duration_ms() * u64::from(self.framerate) / 1000
    }
}

/// Recording settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Output file name, without extension.
    pub filename: String,
    /// What to record.
    pub timecode: Timecode,
    /// Keep the frames recorded so far when stopped early.
    pub save_partial: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            filename: "interlay".into(),
            timecode: Timecode::default(),
            save_partial: true,
        }
    }
}

/// A video encoder fed one canvas frame at a time.
pub trait VideoCapture {
    /// Starts a recording.
    fn render(&mut self, settings: &CaptureSettings);

    /// Stops recording. With `abort`, recorded frames are discarded.
    fn stop(&mut self, abort: bool);

    /// Grabs a frame from `canvas`. Calls `on_time` with the time, in
    /// milliseconds, the animation must show for the next frame.
    fn capture(&mut self, canvas: CanvasId, on_time: &mut dyn FnMut(u64));
}

/// Receives animation seek requests, in milliseconds.
pub type TimeChangeHook = Box<dyn FnMut(u64)>;

/// Keeps an animation and a [`VideoCapture`] in step.
pub struct CaptureRenderer<C> {
    settings: CaptureSettings,
    capture: C,
    on_time_change: Option<TimeChangeHook>,
}

impl<C: fmt::Debug> fmt::Debug for CaptureRenderer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureRenderer")
            .field("settings", &self.settings)
            .field("capture", &self.capture)
            .field("on_time_change", &self.on_time_change.is_some())
            .finish()
    }
}

impl<C: VideoCapture> CaptureRenderer<C> {
    /// Creates a renderer with default settings.
    pub fn new(capture: C) -> Self {
        Self::with_settings(capture, CaptureSettings::default())
    }

    /// Creates a renderer with the given settings.
    pub fn with_settings(capture: C, settings: CaptureSettings) -> Self {
        Self {
            settings,
            capture,
            on_time_change: None,
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Mutable access to the settings; takes effect on the next call.
    pub fn settings_mut(&mut self) -> &mut CaptureSettings {
        &mut self.settings
    }

    /// The underlying capture.
    pub fn capture_ref(&self) -> &C {
        &self.capture
    }

    /// Sets the hook that moves the animation to a given time.
    pub fn on_time_change(&mut self, hook: TimeChangeHook) {
        self.on_time_change = Some(hook);
    }

    /// Seeks to the start of the timecode and starts recording.
    pub fn render(&mut self) {
        self.seek(self.settings.timecode.start_ms);
        self.capture.render(&self.settings);
    }

    /// Stops recording, keeping partial output if the settings say so.
    pub fn stop(&mut self) {
        self.capture.stop(!self.settings.save_partial);
    }

    /// Asks the animation to show `time_ms`.
    pub fn seek(&mut self, time_ms: u64) {
        if let Some(hook) = &mut self.on_time_change {
            hook(time_ms);
        }
    }

    /// Grabs a frame and seeks to the time of the next one.
    pub fn capture(&mut self, canvas: CanvasId) {
        let hook = &mut self.on_time_change;
        self.capture.capture(canvas, &mut |time_ms| {
            if let Some(hook) = hook.as_mut() {
                hook(time_ms);
            }
        });
    }
}

/// Builds a control capture hook that feeds `renderer`.
///
/// The hook holds the renderer weakly and does nothing once it is dropped or
/// while it is already borrowed.
pub fn capture_hook<C: VideoCapture + 'static>(
    renderer: &Rc<RefCell<CaptureRenderer<C>>>,
) -> CaptureHook {
    let weak = Rc::downgrade(renderer);
    Rc::new(move |canvas: CanvasId| {
        let Some(renderer) = weak.upgrade() else {
            return;
        };
        if let Ok(mut renderer) = renderer.try_borrow_mut() {
            renderer.capture(canvas);
        }
    })
}
