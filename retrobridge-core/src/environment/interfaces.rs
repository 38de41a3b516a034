//! Host interfaces handed to the core through the environment.
//!
//! Log and perf are stateless. Rumble, LED and the hardware render hooks reach the active
//! session through [`crate::host::callbacks::with_bridge`], so they answer `false` / zero
//! when called outside a lifecycle call.

use core::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::time::Instant;

use lazy_static::lazy_static;
use tracing::{debug, error, info, trace, warn};

use crate::abi::{
    simd, LogLevel, LogPrintfFn, PerfCallback, PerfCounter, ProcAddress, RumbleEffect,
};
use crate::host::callbacks::with_bridge;

lazy_static! {
    static ref EPOCH: Instant = Instant::now();
}

const CORE_LOG: &str = "retrobridge::core_log";

unsafe extern "C" fn core_log(level: c_int, fmt: *const c_char) {
    if fmt.is_null() {
        return;
    }
    let text = unsafe { CStr::from_ptr(fmt) }.to_string_lossy();
    let text = text.trim_end();
    match LogLevel::try_from(level) {
        Ok(LogLevel::Debug) => debug!(target: CORE_LOG, "{text}"),
        Ok(LogLevel::Info) | Err(_) => info!(target: CORE_LOG, "{text}"),
        Ok(LogLevel::Warn) => warn!(target: CORE_LOG, "{text}"),
        Ok(LogLevel::Error) => error!(target: CORE_LOG, "{text}"),
    }
}

/// The `retro_log_printf_t` served by GET_LOG_INTERFACE.
///
/// Stable Rust cannot define C-variadic functions, so the host side takes only the two
/// fixed arguments and logs the format string as is; format arguments are not expanded.
pub fn log_printf() -> LogPrintfFn {
    // SAFETY: with the C calling convention the fixed arguments of a variadic call are
    // passed exactly as for a non-variadic callee with the same fixed parameters.
    unsafe {
        core::mem::transmute::<unsafe extern "C" fn(c_int, *const c_char), LogPrintfFn>(core_log)
    }
}

fn now_usec() -> i64 {
    EPOCH.elapsed().as_micros() as i64
}

fn now_ticks() -> u64 {
    EPOCH.elapsed().as_nanos() as u64
}

unsafe extern "C" fn perf_get_time_usec() -> i64 {
    now_usec()
}

unsafe extern "C" fn perf_get_counter() -> u64 {
    now_ticks()
}

unsafe extern "C" fn perf_get_cpu_features() -> u64 {
    cpu_features()
}

unsafe extern "C" fn perf_register(counter: *mut PerfCounter) {
    if let Some(counter) = unsafe { counter.as_mut() } {
        counter.registered = true;
    }
}

unsafe extern "C" fn perf_start(counter: *mut PerfCounter) {
    if let Some(counter) = unsafe { counter.as_mut() } {
        counter.call_cnt += 1;
        counter.start = now_ticks();
    }
}

unsafe extern "C" fn perf_stop(counter: *mut PerfCounter) {
    if let Some(counter) = unsafe { counter.as_mut() } {
        counter.total += now_ticks().saturating_sub(counter.start);
    }
}

unsafe extern "C" fn perf_log() {
    debug!("core requested a perf log");
}

/// The table served by GET_PERF_INTERFACE. Counter ticks are nanoseconds.
pub fn perf_callback() -> PerfCallback {
    PerfCallback {
        get_time_usec: Some(perf_get_time_usec),
        get_cpu_features: Some(perf_get_cpu_features),
        get_perf_counter: Some(perf_get_counter),
        perf_register: Some(perf_register),
        perf_start: Some(perf_start),
        perf_stop: Some(perf_stop),
        perf_log: Some(perf_log),
    }
}

/// SIMD capabilities of this CPU as `RETRO_SIMD_*` bits.
pub fn cpu_features() -> u64 {
    #[allow(unused_mut)]
    let mut features = 0;
    #[cfg(target_arch = "x86_64")]
    {
        // Baseline on x86_64.
        features |= simd::MMX | simd::SSE | simd::SSE2 | simd::CMOV;
        let detected = [
            (is_x86_feature_detected!("sse3"), simd::SSE3),
            (is_x86_feature_detected!("ssse3"), simd::SSSE3),
            (is_x86_feature_detected!("sse4.1"), simd::SSE4),
            (is_x86_feature_detected!("sse4.2"), simd::SSE42),
            (is_x86_feature_detected!("avx"), simd::AVX),
            (is_x86_feature_detected!("avx2"), simd::AVX2),
            (is_x86_feature_detected!("aes"), simd::AES),
            (is_x86_feature_detected!("popcnt"), simd::POPCNT),
            (is_x86_feature_detected!("movbe"), simd::MOVBE),
        ];
        for (present, bit) in detected {
            if present {
                features |= bit;
            }
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            features |= simd::NEON | simd::ASIMD;
        }
        if std::arch::is_aarch64_feature_detected!("aes") {
            features |= simd::AES;
        }
    }
    features
}

pub(crate) unsafe extern "C" fn set_rumble_state(
    port: c_uint,
    effect: c_int,
    strength: u16,
) -> bool {
    let Ok(effect) = RumbleEffect::try_from(effect) else {
        return false;
    };
    with_bridge(false, |b| b.input.set_rumble(port, effect, strength))
}

pub(crate) unsafe extern "C" fn set_led_state(led: c_int, state: c_int) {
    with_bridge((), |b| {
        trace!(led, state, "led");
        b.env.leds.insert(led, state);
    })
}

pub(crate) unsafe extern "C" fn hw_current_framebuffer() -> usize {
    with_bridge(0, |b| b.video.context().map_or(0, |c| c.current_framebuffer()))
}

pub(crate) unsafe extern "C" fn hw_proc_address(sym: *const c_char) -> ProcAddress {
    if sym.is_null() {
        return None;
    }
    let sym = unsafe { CStr::from_ptr(sym) };
    with_bridge(None, |b| b.video.context().and_then(|c| c.proc_address(sym)))
}

/// RetroArch's thread-wait release hook. The host never blocks core threads.
pub(crate) unsafe extern "C" fn clear_all_thread_waits(
    _clear_threads: c_uint,
    _data: *mut c_void,
) -> bool {
    true
}
