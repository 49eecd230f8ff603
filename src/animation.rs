//! Scheduling per-frame callbacks.
//!
//! A [FrameScheduler] invokes one-shot callbacks with a monotonically increasing timestamp in
//! milliseconds, once per display frame. An [AnimationLoop] builds a repeating loop on top of a
//! scheduler by requesting the next frame from inside every frame callback.
//!
//! In the browser, frames come from `requestAnimationFrame` (see `WindowFrameScheduler`, only
//! available on `wasm32` targets). Elsewhere, frames are fired explicitly with a
//! [ManualFrameScheduler]:
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use web_shade::animation::{AnimationLoop, ManualFrameScheduler};
//!
//! let scheduler = ManualFrameScheduler::new();
//! let frames = Rc::new(Cell::new(0));
//! let counter = frames.clone();
//!
//! let handle = AnimationLoop::start(scheduler.clone(), move |_timestamp| {
//!     counter.set(counter.get() + 1);
//! });
//!
//! scheduler.fire(16.0).unwrap();
//! scheduler.fire(32.0).unwrap();
//! handle.cancel();
//! scheduler.fire(48.0).unwrap();
//!
//! assert_eq!(frames.get(), 2);
//! ```
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Identifies a pending frame request.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FrameRequest(u32);

impl FrameRequest {
    pub fn from_raw(id: u32) -> Self {
        FrameRequest(id)
    }

    pub fn into_raw(self) -> u32 {
        self.0
    }
}

/// Returned when the host refuses to schedule a frame callback.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("could not request an animation frame: {message}")]
pub struct FrameRequestError {
    pub message: String,
}

/// Invokes callbacks on the next display frame.
pub trait FrameScheduler {
    /// Requests that `callback` is invoked once, on the next frame, with that frame's timestamp
    /// in milliseconds.
    fn request_frame(
        &self,
        callback: Box<dyn FnOnce(f64)>,
    ) -> Result<FrameRequest, FrameRequestError>;

    /// Cancels a pending request. Cancelling a request that already fired has no effect.
    fn cancel_frame(&self, request: FrameRequest);
}

impl<S> FrameScheduler for Rc<S>
where
    S: FrameScheduler + ?Sized,
{
    fn request_frame(
        &self,
        callback: Box<dyn FnOnce(f64)>,
    ) -> Result<FrameRequest, FrameRequestError> {
        (**self).request_frame(callback)
    }

    fn cancel_frame(&self, request: FrameRequest) {
        (**self).cancel_frame(request)
    }
}

/// Returned when a frame is fired with a timestamp that precedes the previous frame's.
#[derive(Clone, Copy, PartialEq, Debug, Error)]
#[error("frame timestamp {timestamp} precedes the previous frame's timestamp {previous}")]
pub struct NonMonotonicTimestamp {
    pub timestamp: f64,
    pub previous: f64,
}

#[derive(Default)]
struct ManualState {
    next_id: u32,
    pending: Vec<(FrameRequest, Box<dyn FnOnce(f64)>)>,
    last_timestamp: Option<f64>,
}

/// A [FrameScheduler] whose frames are fired explicitly.
///
/// Clones share the same pending requests.
#[derive(Clone, Default)]
pub struct ManualFrameScheduler {
    state: Rc<RefCell<ManualState>>,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        ManualFrameScheduler::default()
    }

    /// The number of requests waiting for the next frame.
    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Fires one frame, invoking every request that was pending when the frame started.
    ///
    /// Requests made by the callbacks themselves wait for the next frame. Returns the number of
    /// callbacks that were invoked.
    pub fn fire(&self, timestamp: f64) -> Result<usize, NonMonotonicTimestamp> {
        let due: Vec<FrameRequest> = {
            let mut state = self.state.borrow_mut();

            if let Some(previous) = state.last_timestamp {
                if timestamp < previous {
                    return Err(NonMonotonicTimestamp {
                        timestamp,
                        previous,
                    });
                }
            }

            state.last_timestamp = Some(timestamp);
            state.pending.iter().map(|(request, _)| *request).collect()
        };

        let mut fired = 0;

        for request in due {
            // Taken out one at a time: an earlier callback may cancel a later request.
            let callback = {
                let mut state = self.state.borrow_mut();

                state
                    .pending
                    .iter()
                    .position(|(pending, _)| *pending == request)
                    .map(|index| state.pending.remove(index).1)
            };

            if let Some(callback) = callback {
                callback(timestamp);

                fired += 1;
            }
        }

        log::trace!("fired frame at {} ms with {} callback(s)", timestamp, fired);

        Ok(fired)
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn request_frame(
        &self,
        callback: Box<dyn FnOnce(f64)>,
    ) -> Result<FrameRequest, FrameRequestError> {
        let mut state = self.state.borrow_mut();
        let request = FrameRequest(state.next_id);

        state.next_id = state.next_id.wrapping_add(1);
        state.pending.push((request, callback));

        Ok(request)
    }

    fn cancel_frame(&self, request: FrameRequest) {
        let removed = {
            let mut state = self.state.borrow_mut();

            state
                .pending
                .iter()
                .position(|(pending, _)| *pending == request)
                .map(|index| state.pending.remove(index))
        };

        // The callback may own handles that touch the scheduler when dropped.
        drop(removed);
    }
}

impl fmt::Debug for ManualFrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.state.borrow();

        f.debug_struct("ManualFrameScheduler")
            .field("pending", &state.pending.len())
            .field("last_timestamp", &state.last_timestamp)
            .finish()
    }
}

struct LoopState<S> {
    scheduler: S,
    callback: RefCell<Box<dyn FnMut(f64)>>,
    pending: Cell<Option<FrameRequest>>,
    cancelled: Cell<bool>,
    frame_count: Cell<u64>,
}

trait LoopControl {
    fn cancel(&self);

    fn is_cancelled(&self) -> bool;

    fn frame_count(&self) -> u64;
}

impl<S> LoopControl for LoopState<S>
where
    S: FrameScheduler,
{
    fn cancel(&self) {
        if self.cancelled.replace(true) {
            return;
        }

        if let Some(request) = self.pending.take() {
            self.scheduler.cancel_frame(request);
        }

        log::debug!("animation loop cancelled after {} frame(s)", self.frame_count.get());
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    fn frame_count(&self) -> u64 {
        self.frame_count.get()
    }
}

/// Runs a callback on every frame until cancelled.
pub struct AnimationLoop;

impl AnimationLoop {
    /// Starts invoking `callback` on every frame of `scheduler`, beginning with the next frame.
    ///
    /// The loop runs until the returned handle is cancelled or dropped. If the scheduler fails to
    /// request a frame, the loop stops and the handle reports itself as cancelled.
    pub fn start<S, F>(scheduler: S, callback: F) -> AnimationHandle
    where
        S: FrameScheduler + 'static,
        F: FnMut(f64) + 'static,
    {
        let state = Rc::new(LoopState {
            scheduler,
            callback: RefCell::new(Box::new(callback)),
            pending: Cell::new(None),
            cancelled: Cell::new(false),
            frame_count: Cell::new(0),
        });

        schedule_next(&state);

        AnimationHandle { state }
    }
}

fn schedule_next<S>(state: &Rc<LoopState<S>>)
where
    S: FrameScheduler + 'static,
{
    let next = state.clone();

    let requested = state.scheduler.request_frame(Box::new(move |timestamp| {
        next.pending.set(None);

        if next.cancelled.get() {
            return;
        }

        {
            let mut callback = next.callback.borrow_mut();

            (&mut *callback)(timestamp);
        }

        next.frame_count.set(next.frame_count.get() + 1);

        if !next.cancelled.get() {
            schedule_next(&next);
        }
    }));

    match requested {
        Ok(request) => state.pending.set(Some(request)),
        Err(err) => {
            log::error!(
                "animation loop stopped after {} frame(s): {}",
                state.frame_count.get(),
                err
            );

            state.cancelled.set(true);
        }
    }
}

/// Controls a running [AnimationLoop].
///
/// Dropping the handle cancels the loop.
pub struct AnimationHandle {
    state: Rc<dyn LoopControl>,
}

impl AnimationHandle {
    /// Stops the loop; the callback is not invoked again.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// The number of frames the callback was invoked for.
    pub fn frame_count(&self) -> u64 {
        self.state.frame_count()
    }
}

impl fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("cancelled", &self.is_cancelled())
            .field("frame_count", &self.frame_count())
            .finish()
    }
}

impl Drop for AnimationHandle {
    fn drop(&mut self) {
        self.state.cancel();
    }
}

#[cfg(target_arch = "wasm32")]
pub use self::window::WindowFrameScheduler;

#[cfg(target_arch = "wasm32")]
mod window {
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;
    use web_sys::Window;

    use super::{FrameRequest, FrameRequestError, FrameScheduler};

    /// A [FrameScheduler] backed by the browser's `requestAnimationFrame`.
    #[derive(Clone)]
    pub struct WindowFrameScheduler {
        window: Window,
    }

    impl WindowFrameScheduler {
        /// Returns `None` outside of a browser window context (e.g. in a worker).
        pub fn new() -> Option<Self> {
            web_sys::window().map(|window| WindowFrameScheduler { window })
        }
    }

    impl FrameScheduler for WindowFrameScheduler {
        fn request_frame(
            &self,
            callback: Box<dyn FnOnce(f64)>,
        ) -> Result<FrameRequest, FrameRequestError> {
            let closure = Closure::once_into_js(move |timestamp: f64| callback(timestamp));

            self.window
                .request_animation_frame(closure.unchecked_ref())
                .map(|id| FrameRequest::from_raw(id as u32))
                .map_err(|err| FrameRequestError {
                    message: format!("{:?}", err),
                })
        }

        fn cancel_frame(&self, request: FrameRequest) {
            if let Err(err) = self
                .window
                .cancel_animation_frame(request.into_raw() as i32)
            {
                log::error!("cancelAnimationFrame failed: {:?}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_made_during_a_frame_wait_for_the_next_frame() {
        let scheduler = ManualFrameScheduler::new();
        let inner = scheduler.clone();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();

        scheduler.request_frame(Box::new(move |_| {
            let counter = counter.clone();

            inner
                .request_frame(Box::new(move |_| counter.set(counter.get() + 1)))
                .unwrap();
        }))
        .unwrap();

        assert_eq!(scheduler.fire(1.0), Ok(1));
        assert_eq!(fired.get(), 0);
        assert_eq!(scheduler.fire(2.0), Ok(1));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_timestamps_must_not_decrease() {
        let scheduler = ManualFrameScheduler::new();

        scheduler.fire(10.0).unwrap();
        scheduler.fire(10.0).unwrap();

        assert_eq!(
            scheduler.fire(5.0),
            Err(NonMonotonicTimestamp {
                timestamp: 5.0,
                previous: 10.0
            })
        );
    }

    #[test]
    fn test_cancelled_request_does_not_fire() {
        let scheduler = ManualFrameScheduler::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();

        let request = scheduler
            .request_frame(Box::new(move |_| flag.set(true)))
            .unwrap();

        scheduler.cancel_frame(request);

        assert_eq!(scheduler.fire(1.0), Ok(0));
        assert!(!fired.get());
    }

    #[test]
    fn test_loop_receives_timestamps_and_stops_when_dropped() {
        let scheduler = ManualFrameScheduler::new();
        let timestamps = Rc::new(RefCell::new(Vec::new()));
        let sink = timestamps.clone();

        let handle = AnimationLoop::start(scheduler.clone(), move |timestamp| {
            sink.borrow_mut().push(timestamp);
        });

        scheduler.fire(16.5).unwrap();
        scheduler.fire(33.0).unwrap();

        assert_eq!(handle.frame_count(), 2);

        drop(handle);

        assert_eq!(scheduler.pending_count(), 0);

        scheduler.fire(49.5).unwrap();

        assert_eq!(*timestamps.borrow(), vec![16.5, 33.0]);
    }

    /// Accepts `remaining` requests, then refuses every request after that.
    struct LimitedScheduler {
        inner: ManualFrameScheduler,
        remaining: Cell<u32>,
    }

    impl FrameScheduler for LimitedScheduler {
        fn request_frame(
            &self,
            callback: Box<dyn FnOnce(f64)>,
        ) -> Result<FrameRequest, FrameRequestError> {
            match self.remaining.get() {
                0 => Err(FrameRequestError {
                    message: "no more frames".to_string(),
                }),
                remaining => {
                    self.remaining.set(remaining - 1);
                    self.inner.request_frame(callback)
                }
            }
        }

        fn cancel_frame(&self, request: FrameRequest) {
            self.inner.cancel_frame(request)
        }
    }

    #[test]
    fn test_loop_stops_when_a_frame_cannot_be_requested() {
        let inner = ManualFrameScheduler::new();
        let scheduler = LimitedScheduler {
            inner: inner.clone(),
            remaining: Cell::new(2),
        };

        let handle = AnimationLoop::start(scheduler, |_| ());

        assert!(!handle.is_cancelled());

        inner.fire(16.0).unwrap();

        assert!(!handle.is_cancelled());

        inner.fire(32.0).unwrap();

        assert!(handle.is_cancelled());
        assert_eq!(handle.frame_count(), 2);
        assert_eq!(inner.pending_count(), 0);
    }

    #[test]
    fn test_loop_that_cannot_start_is_cancelled() {
        let scheduler = LimitedScheduler {
            inner: ManualFrameScheduler::new(),
            remaining: Cell::new(0),
        };

        let handle = AnimationLoop::start(scheduler, |_| ());

        assert!(handle.is_cancelled());
        assert_eq!(handle.frame_count(), 0);
    }
}
