//! `extern "C"` callbacks registered with the core.
//!
//! libretro callbacks carry no user pointer, so the session that is currently calling into
//! the core is published in a thread-local for the duration of each lifecycle call
//! ([`activate`]). Every trampoline goes through [`with_bridge`]:
//! - no active session: the callback answers its default;
//! - the bridge is already borrowed (a callback re-entered another one): default;
//! - a panic inside the handler is caught, logged and turned into the default.

use core::ffi::{c_uint, c_void};
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{error, info, warn};

use crate::abi::SystemAvInfo;
use crate::audio::AudioBridge;
use crate::environment::{self, EnvState};
use crate::input::InputProvider;
use crate::loader::CoreApi;
use crate::video::FrameBridge;

/// Everything the core's callbacks can reach.
pub struct Bridge {
    pub env: EnvState,
    pub video: FrameBridge,
    pub audio: AudioBridge,
    pub input: InputProvider,
}

impl Default for Bridge {
    fn default() -> Self {
        Self {
            env: EnvState::with_defaults(),
            video: FrameBridge::default(),
            audio: AudioBridge::default(),
            input: InputProvider::default(),
        }
    }
}

impl Bridge {
    /// Record new AV info and forward geometry and sample rate to the bridges.
    pub(crate) fn apply_av_info(&mut self, av: SystemAvInfo) {
        info!(
            width = av.geometry.base_width,
            height = av.geometry.base_height,
            fps = av.timing.fps,
            sample_rate = av.timing.sample_rate,
            "system AV info changed"
        );
        self.env.av_info = Some(av);
        self.video.geometry_changed(&av.geometry);
        self.audio.set_sample_rate(av.timing.sample_rate);
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<Rc<RefCell<Bridge>>>> = const { RefCell::new(None) };
}

/// Restores the previously active bridge on drop.
pub(crate) struct Activation {
    previous: Option<Rc<RefCell<Bridge>>>,
}

/// Route callbacks on this thread to `bridge` until the returned guard is dropped.
pub(crate) fn activate(bridge: &Rc<RefCell<Bridge>>) -> Activation {
    let previous = ACTIVE.with(|active| active.replace(Some(bridge.clone())));
    Activation { previous }
}

impl Drop for Activation {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|active| *active.borrow_mut() = previous);
    }
}

/// Run `f` against the active bridge, or return `default`.
pub(crate) fn with_bridge<R>(default: R, f: impl FnOnce(&mut Bridge) -> R) -> R {
    let Some(bridge) = ACTIVE.with(|active| active.borrow().clone()) else {
        return default;
    };
    let Ok(mut bridge) = bridge.try_borrow_mut() else {
        warn!("core re-entered a host callback");
        return default;
    };
    match catch_unwind(AssertUnwindSafe(|| f(&mut bridge))) {
        Ok(result) => result,
        Err(_) => {
            error!("panic inside a host callback was contained");
            default
        }
    }
}

unsafe extern "C" fn environment(cmd: c_uint, data: *mut c_void) -> bool {
    with_bridge(false, |b| unsafe { environment::dispatch(b, cmd, data) })
}

unsafe extern "C" fn video_refresh(
    data: *const c_void,
    width: c_uint,
    height: c_uint,
    pitch: usize,
) {
    with_bridge((), |b| unsafe { b.video.on_frame(data.cast(), width, height, pitch) })
}

unsafe extern "C" fn audio_sample(left: i16, right: i16) {
    with_bridge((), |b| b.audio.on_sample(left, right))
}

unsafe extern "C" fn audio_sample_batch(data: *const i16, frames: usize) -> usize {
    with_bridge(frames, |b| unsafe { b.audio.on_batch(data, frames) })
}

unsafe extern "C" fn input_poll() {
    with_bridge((), |b| b.input.poll())
}

unsafe extern "C" fn input_state(port: c_uint, device: c_uint, index: c_uint, id: c_uint) -> i16 {
    with_bridge(0, |b| b.input.state(port, device, index, id))
}

/// Hand the six host callbacks to the core. Call with the session activated: cores may
/// issue environment calls from inside `retro_set_environment`.
pub(crate) fn register(api: &CoreApi) {
    unsafe {
        (api.set_environment)(environment);
        (api.set_video_refresh)(video_refresh);
        (api.set_audio_sample)(audio_sample);
        (api.set_audio_sample_batch)(audio_sample_batch);
        (api.set_input_poll)(input_poll);
        (api.set_input_state)(input_state);
    }
}
