//! A libretro core written in Rust, assembled into a `CoreApi` table.
//!
//! State is thread-local: every test runs on its own thread and gets a fresh core.

#![allow(dead_code)]

use core::ffi::{c_char, c_uint, c_void, CStr};
use std::cell::{Cell, RefCell};
use std::ptr;

use retrobridge_core::abi::{
    self, device, EnvCommand, FrameTimeCallback, GameGeometry, GameInfo, GameInfoExt, JoypadButton,
    KeyboardCallback, MemoryKind, Message, PixelFormat, SystemAvInfo, SystemInfo, SystemTiming,
    Variable,
};
use retrobridge_core::abi::{
    AudioSampleBatchFn, AudioSampleFn, EnvironmentFn, InputPollFn, InputStateFn, VideoRefreshFn,
};
use retrobridge_core::CoreApi;

pub const WIDTH: u32 = 4;
pub const HEIGHT: u32 = 2;
pub const SAMPLE_RATE: f64 = 44_100.0;
pub const AUDIO_FRAMES: usize = 4;
pub const STATE_SIZE: usize = 8;
pub const FRAME_TIME_REFERENCE: i64 = 16_666;
pub const SRAM_SIZE: usize = 16;

#[derive(Default)]
struct Callbacks {
    env: Option<EnvironmentFn>,
    video: Option<VideoRefreshFn>,
    sample: Option<AudioSampleFn>,
    batch: Option<AudioSampleBatchFn>,
    poll: Option<InputPollFn>,
    state: Option<InputStateFn>,
}

/// What the core observed.
#[derive(Debug, Default, Clone)]
pub struct Record {
    pub inits: u32,
    pub deinits: u32,
    pub loaded: bool,
    pub content_path: Option<String>,
    pub content_len: usize,
    pub content_ext: Option<String>,
    pub persistent_data: bool,
    pub counter: u32,
    pub last_button: i16,
    pub frame_times: Vec<i64>,
    pub keys: Vec<(bool, u32)>,
    pub port_devices: Vec<(u32, u32)>,
    pub cheats: Vec<(u32, bool, String)>,
    pub resets: u32,
}

thread_local! {
    static CALLBACKS: RefCell<Callbacks> = RefCell::new(Callbacks::default());
    static RECORD: RefCell<Record> = RefCell::new(Record::default());
    static QUIRKS: Cell<u64> = const { Cell::new(0) };
    static MESSAGE_AT: Cell<u32> = const { Cell::new(0) };
    static SRAM: RefCell<[u8; SRAM_SIZE]> = const { RefCell::new([0; SRAM_SIZE]) };
}

pub fn record() -> Record {
    RECORD.with(|r| r.borrow().clone())
}

fn update(f: impl FnOnce(&mut Record)) {
    RECORD.with(|r| f(&mut r.borrow_mut()));
}

/// Quirks declared from `retro_set_environment`. Set before creating the host.
pub fn declare_quirks(quirks: u64) {
    QUIRKS.with(|q| q.set(quirks));
}

/// Post SET_MESSAGE when the counter reaches `counter`.
pub fn message_at(counter: u32) {
    MESSAGE_AT.with(|m| m.set(counter));
}

fn env<T>(cmd: EnvCommand, data: *mut T) -> bool {
    let Some(cb) = CALLBACKS.with(|c| c.borrow().env) else {
        return false;
    };
    unsafe { cb(cmd.id(), data.cast()) }
}

fn speed() -> u32 {
    let mut var = Variable {
        key: c"fake_speed".as_ptr(),
        value: ptr::null(),
    };
    if !env(EnvCommand::GetVariable, &mut var) || var.value.is_null() {
        return 1;
    }
    unsafe { CStr::from_ptr(var.value) }
        .to_str()
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1)
}

/// Deterministic pixel for `counter`.
pub fn pixel(counter: u32, i: usize) -> u32 {
    counter.wrapping_mul(2_654_435_761).wrapping_add(i as u32) & 0x00ff_ffff
}

/// Deterministic sample for `counter`.
pub fn sample(counter: u32, i: usize) -> i16 {
    (counter as i16).wrapping_mul(7).wrapping_add(i as i16)
}

unsafe extern "C" fn set_environment(cb: EnvironmentFn) {
    CALLBACKS.with(|c| c.borrow_mut().env = Some(cb));
    let mut no_game = true;
    env(EnvCommand::SetSupportNoGame, &mut no_game);
    let mut vars = [
        Variable {
            key: c"fake_speed".as_ptr(),
            value: c"Speed; 1|2|3".as_ptr(),
        },
        Variable {
            key: ptr::null(),
            value: ptr::null(),
        },
    ];
    env(EnvCommand::SetVariables, vars.as_mut_ptr());
    let mut quirks = QUIRKS.with(Cell::get);
    if quirks != 0 {
        env(EnvCommand::SetSerializationQuirks, &mut quirks);
    }
}

unsafe extern "C" fn set_video_refresh(cb: VideoRefreshFn) {
    CALLBACKS.with(|c| c.borrow_mut().video = Some(cb));
}

unsafe extern "C" fn set_audio_sample(cb: AudioSampleFn) {
    CALLBACKS.with(|c| c.borrow_mut().sample = Some(cb));
}

unsafe extern "C" fn set_audio_sample_batch(cb: AudioSampleBatchFn) {
    CALLBACKS.with(|c| c.borrow_mut().batch = Some(cb));
}

unsafe extern "C" fn set_input_poll(cb: InputPollFn) {
    CALLBACKS.with(|c| c.borrow_mut().poll = Some(cb));
}

unsafe extern "C" fn set_input_state(cb: InputStateFn) {
    CALLBACKS.with(|c| c.borrow_mut().state = Some(cb));
}

unsafe extern "C" fn init() {
    update(|r| r.inits += 1);
}

unsafe extern "C" fn deinit() {
    update(|r| r.deinits += 1);
}

unsafe extern "C" fn api_version() -> c_uint {
    abi::API_VERSION
}

unsafe extern "C" fn get_system_info(info: *mut SystemInfo) {
    unsafe {
        *info = SystemInfo {
            library_name: c"fake".as_ptr(),
            library_version: c"1.0".as_ptr(),
            valid_extensions: c"bin|rom".as_ptr(),
            need_fullpath: false,
            block_extract: false,
        };
    }
}

unsafe extern "C" fn get_system_av_info(info: *mut SystemAvInfo) {
    unsafe {
        *info = SystemAvInfo {
            geometry: GameGeometry {
                base_width: WIDTH,
                base_height: HEIGHT,
                max_width: WIDTH,
                max_height: HEIGHT,
                aspect_ratio: 0.0,
            },
            timing: SystemTiming {
                fps: 60.0,
                sample_rate: SAMPLE_RATE,
            },
        };
    }
}

unsafe extern "C" fn set_controller_port_device(port: c_uint, device: c_uint) {
    update(|r| r.port_devices.push((port, device)));
}

unsafe extern "C" fn reset() {
    update(|r| {
        r.resets += 1;
        r.counter = 0;
    });
}

unsafe extern "C" fn run() {
    let (poll, state, video, batch) = CALLBACKS.with(|c| {
        let c = c.borrow();
        (c.poll, c.state, c.video, c.batch)
    });
    let button = unsafe {
        if let Some(poll) = poll {
            poll();
        }
        state.map_or(0, |s| s(0, device::JOYPAD, 0, JoypadButton::B as c_uint))
    };
    let step = speed() + if button != 0 { 100 } else { 0 };
    let counter = RECORD.with(|r| {
        let mut r = r.borrow_mut();
        r.counter = r.counter.wrapping_add(step);
        r.last_button = button;
        r.counter
    });

    if MESSAGE_AT.with(Cell::get) == counter {
        let mut msg = Message {
            msg: c"halfway there".as_ptr(),
            frames: 120,
        };
        env(EnvCommand::SetMessage, &mut msg);
    }

    let mut pixels = [0u32; (WIDTH * HEIGHT) as usize];
    for (i, p) in pixels.iter_mut().enumerate() {
        *p = pixel(counter, i);
    }
    let mut samples = [0i16; AUDIO_FRAMES * 2];
    for (i, s) in samples.iter_mut().enumerate() {
        *s = sample(counter, i);
    }
    unsafe {
        if let Some(video) = video {
            video(pixels.as_ptr().cast(), WIDTH, HEIGHT, WIDTH as usize * 4);
        }
        if let Some(batch) = batch {
            batch(samples.as_ptr(), AUDIO_FRAMES);
        }
    }
}

unsafe extern "C" fn serialize_size() -> usize {
    STATE_SIZE
}

unsafe extern "C" fn serialize(data: *mut c_void, size: usize) -> bool {
    if size < STATE_SIZE {
        return false;
    }
    let r = record();
    let out = unsafe { std::slice::from_raw_parts_mut(data.cast::<u8>(), size) };
    out[..4].copy_from_slice(&r.counter.to_le_bytes());
    out[4..8].copy_from_slice(&(r.last_button as i32).to_le_bytes());
    true
}

unsafe extern "C" fn unserialize(data: *const c_void, size: usize) -> bool {
    if size < STATE_SIZE {
        return false;
    }
    let bytes = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), size) };
    let counter = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let button = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    update(|r| {
        r.counter = counter;
        r.last_button = button as i16;
    });
    true
}

unsafe extern "C" fn cheat_reset() {
    update(|r| r.cheats.clear());
}

unsafe extern "C" fn cheat_set(index: c_uint, enabled: bool, code: *const c_char) {
    let code = unsafe { CStr::from_ptr(code) }.to_string_lossy().into_owned();
    update(|r| r.cheats.push((index, enabled, code)));
}

unsafe extern "C" fn on_frame_time(usec: i64) {
    update(|r| r.frame_times.push(usec));
}

unsafe extern "C" fn on_key(down: bool, keycode: c_uint, _character: u32, _modifiers: u16) {
    update(|r| r.keys.push((down, keycode)));
}

unsafe extern "C" fn load_game(info: *const GameInfo) -> bool {
    let mut format = PixelFormat::Xrgb8888 as i32;
    env(EnvCommand::SetPixelFormat, &mut format);
    let mut frame_time = FrameTimeCallback {
        callback: Some(on_frame_time),
        reference: FRAME_TIME_REFERENCE,
    };
    env(EnvCommand::SetFrameTimeCallback, &mut frame_time);
    let mut keyboard = KeyboardCallback {
        callback: Some(on_key),
    };
    env(EnvCommand::SetKeyboardCallback, &mut keyboard);

    let Some(info) = (unsafe { info.as_ref() }) else {
        update(|r| r.loaded = true);
        return true;
    };
    if info.size == 0 {
        return false;
    }
    let path = unsafe { CStr::from_ptr(info.path) }.to_string_lossy().into_owned();

    let mut ext_info: *const GameInfoExt = ptr::null();
    let served = env(EnvCommand::GetGameInfoExt, &mut ext_info);
    let (ext, persistent) = if served && !ext_info.is_null() {
        let ext_info = unsafe { &*ext_info };
        let ext = unsafe { CStr::from_ptr(ext_info.ext) }.to_string_lossy().into_owned();
        (Some(ext), ext_info.persistent_data)
    } else {
        (None, false)
    };

    update(|r| {
        r.loaded = true;
        r.content_path = Some(path);
        r.content_len = info.size;
        r.content_ext = ext;
        r.persistent_data = persistent;
    });
    true
}

unsafe extern "C" fn load_game_special(
    _game_type: c_uint,
    _info: *const GameInfo,
    _num: usize,
) -> bool {
    false
}

unsafe extern "C" fn unload_game() {
    update(|r| r.loaded = false);
}

unsafe extern "C" fn get_region() -> c_uint {
    1
}

unsafe extern "C" fn get_memory_data(id: c_uint) -> *mut c_void {
    if id == MemoryKind::SaveRam as c_uint {
        SRAM.with(|s| s.as_ptr().cast())
    } else {
        ptr::null_mut()
    }
}

unsafe extern "C" fn get_memory_size(id: c_uint) -> usize {
    if id == MemoryKind::SaveRam as c_uint { SRAM_SIZE } else { 0 }
}

pub fn api() -> CoreApi {
    CoreApi {
        set_environment,
        set_video_refresh,
        set_audio_sample,
        set_audio_sample_batch,
        set_input_poll,
        set_input_state,
        init,
        deinit,
        api_version,
        get_system_info,
        get_system_av_info,
        set_controller_port_device,
        reset,
        run,
        serialize_size,
        serialize,
        unserialize,
        cheat_reset,
        cheat_set,
        load_game,
        load_game_special,
        unload_game,
        get_region,
        get_memory_data,
        get_memory_size,
    }
}
