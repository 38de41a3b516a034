//! Host session: one core driven through its lifecycle.
//!
//! [`Host`] owns the [`CoreModule`] and the [`Bridge`] its callbacks reach. Every call into
//! the core goes through [`Host::call`], which activates the bridge for the calling thread and
//! holds no borrow of it while the core runs, so callbacks issued from inside the call can
//! take the bridge themselves.

pub mod callbacks;

use core::ffi::{c_char, c_uint, c_void, CStr};
use std::cell::{Ref, RefCell, RefMut};
use std::ffi::CString;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

pub use callbacks::Bridge;

use crate::abi::{
    DiskControlExtCallback, GameInfo, GameInfoExt, MemoryKind, ProcAddress, Region, SystemAvInfo,
};
use crate::audio::{AudioBridge, AudioSink};
use crate::config::{HostConfig, RotationMode};
use crate::environment::{EnvState, HostMessage};
use crate::error::HostError;
use crate::input::{InputProvider, InputSource};
use crate::loader::{CoreApi, CoreInfo, CoreModule};
use crate::options::{CoreOptions, OptionTable};
use crate::state::{self, SaveState, StateContext};
use crate::video::{FrameBridge, FrameSink, HwContext};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Buffer fill (percent) below which the core is told an underrun is likely.
const UNDERRUN_THRESHOLD: u32 = 25;

/// Capacity of the buffer handed to the disk control path / label getters.
const DISK_STRING_LEN: usize = 4096;

fn cstring(text: String, path: &Path) -> Result<CString, HostError> {
    CString::new(text).map_err(|_| HostError::InvalidPath(path.to_path_buf()))
}

/// One content file and the strings the core sees for it.
struct ContentFile {
    path: CString,
    dir: CString,
    name: CString,
    ext: CString,
    /// `None` when the core loads the file itself.
    data: Option<Vec<u8>>,
}

impl ContentFile {
    fn open(path: &Path, need_fullpath: bool) -> Result<Self, HostError> {
        let lossy = |s: Option<&std::ffi::OsStr>| {
            s.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
        };
        let data = if need_fullpath {
            None
        } else {
            let bytes = fs::read(path).map_err(|source| HostError::ContentIo {
                path: path.to_path_buf(),
                source,
            })?;
            Some(bytes)
        };
        Ok(Self {
            path: cstring(path.to_string_lossy().into_owned(), path)?,
            dir: cstring(lossy(path.parent().map(Path::as_os_str)), path)?,
            name: cstring(lossy(path.file_stem()), path)?,
            ext: cstring(lossy(path.extension()).to_ascii_lowercase(), path)?,
            data,
        })
    }

    fn data(&self) -> (*const c_void, usize) {
        match &self.data {
            Some(bytes) => (bytes.as_ptr().cast(), bytes.len()),
            None => (core::ptr::null(), 0),
        }
    }

    fn game_info(&self) -> GameInfo {
        let (data, size) = self.data();
        GameInfo {
            path: self.path.as_ptr(),
            data,
            size,
            meta: core::ptr::null(),
        }
    }

    fn game_info_ext(&self) -> GameInfoExt {
        let (data, size) = self.data();
        GameInfoExt {
            full_path: self.path.as_ptr(),
            archive_path: core::ptr::null(),
            archive_file: core::ptr::null(),
            dir: self.dir.as_ptr(),
            name: self.name.as_ptr(),
            ext: self.ext.as_ptr(),
            meta: core::ptr::null(),
            data,
            size,
            file_in_archive: false,
            // Buffers stay alive until the game is unloaded.
            persistent_data: self.data.is_some(),
        }
    }
}

/// Everything passed to `retro_load_game*`, kept alive until unload.
struct LoadedContent {
    files: Vec<ContentFile>,
    info: Vec<GameInfo>,
    ext: Vec<GameInfoExt>,
    /// Images handed over through disk control.
    disk_images: Vec<ContentFile>,
}

impl LoadedContent {
    fn new(files: Vec<ContentFile>) -> Self {
        let info = files.iter().map(ContentFile::game_info).collect();
        let ext = files.iter().map(ContentFile::game_info_ext).collect();
        Self {
            files,
            info,
            ext,
            disk_images: Vec::new(),
        }
    }

    fn first_info(&self) -> *const GameInfo {
        self.info.first().map_or(core::ptr::null(), core::ptr::from_ref)
    }

    fn ext_ptr(&self) -> *const GameInfoExt {
        if self.ext.is_empty() {
            core::ptr::null()
        } else {
            self.ext.as_ptr()
        }
    }
}

/// A running core session.
pub struct Host {
    core: CoreModule,
    info: CoreInfo,
    bridge: Rc<RefCell<Bridge>>,
    content: Option<LoadedContent>,
    assets_from_content: bool,
    session: u64,
    frames: u64,
    last_run: Option<Instant>,
}

impl Host {
    /// Register the host callbacks and initialize the core. Core options start from the
    /// values preseeded in `config`.
    pub fn new(core: CoreModule, config: &HostConfig) -> Self {
        let options = OptionTable::with_selections(config.core_options.clone());
        Self::with_options(core, config, Box::new(options))
    }

    /// Like [`Host::new`] with a caller-supplied option store.
    pub fn with_options(
        core: CoreModule,
        config: &HostConfig,
        options: Box<dyn CoreOptions>,
    ) -> Self {
        for dir in [config.system_dir(), config.save_dir()].into_iter().flatten() {
            if let Err(e) = fs::create_dir_all(&dir) {
                warn!(dir = %dir.display(), error = %e, "failed to create directory");
            }
        }

        let info = core.system_info();
        let mut input = InputProvider::default();
        input.set_bitmasks(config.input.bitmasks);
        let bridge = Rc::new(RefCell::new(Bridge {
            env: EnvState::new(config, options, core.path()),
            video: FrameBridge::new(config.video.rotation == RotationMode::Apply),
            audio: AudioBridge::default(),
            input,
        }));

        {
            let _active = callbacks::activate(&bridge);
            callbacks::register(core.api());
            unsafe { (core.api().init)() };
        }
        info!(
            core = %info.library_name,
            version = %info.library_version,
            extensions = ?info.valid_extensions,
            "core initialized"
        );

        Self {
            core,
            info,
            bridge,
            content: None,
            assets_from_content: config.paths.core_assets_dir.is_none(),
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            frames: 0,
            last_run: None,
        }
    }

    /// Call into the core with callbacks routed to this session.
    fn call<R>(&self, f: impl FnOnce(&CoreApi) -> R) -> R {
        let _active = callbacks::activate(&self.bridge);
        f(self.core.api())
    }

    pub fn info(&self) -> &CoreInfo {
        &self.info
    }

    /// Identifies this session in save states (SINGLE_SESSION quirk).
    pub fn session_id(&self) -> u64 {
        self.session
    }

    /// Frames run since the current game was loaded.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn game_loaded(&self) -> bool {
        self.content.is_some()
    }

    pub fn av_info(&self) -> Option<SystemAvInfo> {
        self.bridge.borrow().env.av_info()
    }

    /// The callback state. Not reachable while a core call is in progress.
    pub fn bridge(&self) -> Ref<'_, Bridge> {
        self.bridge.borrow()
    }

    pub fn bridge_mut(&mut self) -> RefMut<'_, Bridge> {
        self.bridge.borrow_mut()
    }

    pub fn set_frame_sink(&mut self, sink: Option<Box<dyn FrameSink>>) {
        self.bridge.borrow_mut().video.set_sink(sink);
    }

    pub fn set_audio_sink(&mut self, sink: Option<Box<dyn AudioSink>>) {
        self.bridge.borrow_mut().audio.set_sink(sink);
    }

    pub fn set_input_source(&mut self, source: Option<Box<dyn InputSource>>) {
        self.bridge.borrow_mut().input.set_source(source);
    }

    /// Graphics context for hardware rendering. Attach before loading content.
    pub fn set_hw_context(&mut self, context: Option<Box<dyn HwContext>>) {
        self.bridge.borrow_mut().video.set_context(context);
    }

    /// Run `f` against the core option store.
    pub fn with_options_mut<R>(&mut self, f: impl FnOnce(&mut dyn CoreOptions) -> R) -> R {
        f(self.bridge.borrow_mut().env.options_mut())
    }

    pub fn set_option(&mut self, key: &str, value: &str) -> bool {
        self.with_options_mut(|options| options.set(key, value))
    }

    pub fn set_fastforwarding(&mut self, enabled: bool) {
        self.bridge.borrow_mut().env.set_fastforwarding(enabled);
    }

    pub fn drain_messages(&mut self) -> Vec<HostMessage> {
        self.bridge.borrow_mut().env.drain_messages()
    }

    /// Whether the core asked to be shut down (SHUTDOWN).
    pub fn shutdown_requested(&self) -> bool {
        self.bridge.borrow().env.shutdown_requested()
    }

    /// Load `path`, or start the core without content when `None` and the core allows it.
    pub fn load_game(&mut self, path: Option<&Path>) -> Result<(), HostError> {
        if self.content.is_some() {
            return Err(HostError::GameAlreadyLoaded);
        }
        let files = match path {
            None => {
                if !self.bridge.borrow().env.support_no_game() {
                    return Err(HostError::NoGameUnsupported);
                }
                Vec::new()
            }
            Some(path) => {
                if !self.info.accepts(path) {
                    warn!(path = %path.display(), "extension not listed by the core");
                }
                let need_fullpath =
                    self.bridge.borrow().env.need_fullpath_for(path, self.info.need_fullpath);
                vec![ContentFile::open(path, need_fullpath)?]
            }
        };

        let content = LoadedContent::new(files);
        self.expose_content(&content);
        let game = content.first_info();
        let loaded = self.call(|api| unsafe { (api.load_game)(game) });
        self.finish_load(content, loaded)
    }

    /// `retro_load_game_special` for a subsystem the core declared.
    pub fn load_game_special(
        &mut self,
        game_type: u32,
        paths: &[PathBuf],
    ) -> Result<(), HostError> {
        if self.content.is_some() {
            return Err(HostError::GameAlreadyLoaded);
        }
        let subsystem = self
            .bridge
            .borrow()
            .env
            .subsystems()
            .iter()
            .find(|s| s.id == game_type)
            .cloned();
        let roms = match subsystem {
            Some(subsystem) => {
                debug!(ident = %subsystem.ident, "loading subsystem content");
                subsystem.roms
            }
            None => {
                warn!(game_type, "core did not declare this subsystem");
                Vec::new()
            }
        };
        if roms.iter().enumerate().any(|(i, rom)| rom.required && i >= paths.len()) {
            return Err(HostError::ContentRequired);
        }

        let files = paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let need_fullpath =
                    roms.get(i).map_or(self.info.need_fullpath, |r| r.need_fullpath);
                ContentFile::open(path, need_fullpath)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let content = LoadedContent::new(files);
        self.expose_content(&content);
        let (info, count) = (content.info.as_ptr(), content.info.len());
        let loaded = self.call(|api| unsafe { (api.load_game_special)(game_type, info, count) });
        self.finish_load(content, loaded)
    }

    fn expose_content(&self, content: &LoadedContent) {
        let mut bridge = self.bridge.borrow_mut();
        bridge.env.game_info_ext = content.ext_ptr();
        if self.assets_from_content {
            if let Some(file) = content.files.first() {
                bridge.env.core_assets_dir = Some(file.dir.clone());
            }
        }
    }

    fn finish_load(&mut self, content: LoadedContent, loaded: bool) -> Result<(), HostError> {
        if !loaded {
            self.bridge.borrow_mut().env.clear_game();
            return Err(HostError::ContentRejected);
        }

        let mut av = SystemAvInfo::default();
        self.call(|api| unsafe { (api.get_system_av_info)(&mut av) });
        self.bridge.borrow_mut().apply_av_info(av);
        self.content = Some(content);
        self.frames = 0;
        self.last_run = None;

        let (hw_render, audio_callback) = {
            let bridge = self.bridge.borrow();
            (bridge.video.hw_render(), bridge.env.audio_callback)
        };
        if let Some(reset) = hw_render.and_then(|h| h.context_reset) {
            debug!("hardware context reset");
            self.call(|_| unsafe { reset() });
        }
        if let Some(set_state) = audio_callback.and_then(|a| a.set_state) {
            self.call(|_| unsafe { set_state(true) });
        }
        info!(
            width = av.geometry.base_width,
            height = av.geometry.base_height,
            fps = av.timing.fps,
            "game loaded"
        );
        Ok(())
    }

    /// Unload the current game and release its content buffers.
    pub fn unload_game(&mut self) -> Result<(), HostError> {
        let Some(content) = self.content.take() else {
            return Err(HostError::NoGame);
        };
        let (hw_render, audio_callback) = {
            let bridge = self.bridge.borrow();
            (bridge.video.hw_render(), bridge.env.audio_callback)
        };
        if let Some(destroy) = hw_render.and_then(|h| h.context_destroy) {
            debug!("hardware context destroyed");
            self.call(|_| unsafe { destroy() });
        }
        if let Some(set_state) = audio_callback.and_then(|a| a.set_state) {
            self.call(|_| unsafe { set_state(false) });
        }
        self.call(|api| unsafe { (api.unload_game)() });

        let mut bridge = self.bridge.borrow_mut();
        bridge.env.clear_game();
        bridge.video.clear_hw_render();
        drop(bridge);
        drop(content);
        info!(frames = self.frames, "game unloaded");
        Ok(())
    }

    /// Run one frame. The frame time, audio and audio buffer status callbacks the core
    /// registered are invoked first.
    pub fn run(&mut self) -> Result<(), HostError> {
        if self.content.is_none() {
            return Err(HostError::NoGame);
        }
        let (frame_time, audio_callback, buffer_status, occupancy, fastforwarding) = {
            let bridge = self.bridge.borrow();
            (
                bridge.env.frame_time,
                bridge.env.audio_callback,
                bridge.env.audio_buffer_status,
                bridge.audio.occupancy(),
                bridge.env.fastforwarding,
            )
        };

        let now = Instant::now();
        let elapsed = self.last_run.map(|prev| now.duration_since(prev).as_micros() as i64);
        self.last_run = Some(now);

        self.call(|api| unsafe {
            if let Some(frame_time) = frame_time {
                if let Some(callback) = frame_time.callback {
                    let usec = match elapsed {
                        Some(usec) if !fastforwarding => usec,
                        _ => frame_time.reference,
                    };
                    callback(usec);
                }
            }
            if let Some(callback) = audio_callback.and_then(|a| a.callback) {
                callback();
            }
            if let Some(callback) = buffer_status {
                let fill = occupancy.unwrap_or(0);
                callback(occupancy.is_some(), fill, fill < UNDERRUN_THRESHOLD);
            }
            (api.run)();
        });
        self.frames += 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        debug!("core reset");
        self.call(|api| unsafe { (api.reset)() });
    }

    pub fn set_controller_port_device(&mut self, port: u32, device: u32) {
        self.bridge.borrow_mut().input.set_port_device(port, device);
        self.call(|api| unsafe { (api.set_controller_port_device)(port, device) });
    }

    pub fn cheat_reset(&mut self) {
        self.call(|api| unsafe { (api.cheat_reset)() });
    }

    pub fn cheat_set(&mut self, index: u32, enabled: bool, code: &str) {
        let code = CString::new(code.replace('\0', "")).unwrap_or_default();
        self.call(|api| unsafe { (api.cheat_set)(index, enabled, code.as_ptr()) });
    }

    pub fn region(&self) -> Option<Region> {
        let raw = self.call(|api| unsafe { (api.get_region)() });
        Region::try_from(raw).ok()
    }

    fn memory_raw(&self, kind: MemoryKind) -> Option<(*mut u8, usize)> {
        let id = kind as c_uint;
        let (data, size) =
            self.call(|api| unsafe { ((api.get_memory_data)(id), (api.get_memory_size)(id)) });
        if data.is_null() || size == 0 {
            None
        } else {
            Some((data.cast(), size))
        }
    }

    /// A memory region exposed by the core (`retro_get_memory_data`).
    pub fn memory(&self, kind: MemoryKind) -> Option<&[u8]> {
        let (data, size) = self.memory_raw(kind)?;
        // SAFETY: the core keeps the region alive while the game is loaded.
        Some(unsafe { core::slice::from_raw_parts(data, size) })
    }

    pub fn memory_mut(&mut self, kind: MemoryKind) -> Option<&mut [u8]> {
        let (data, size) = self.memory_raw(kind)?;
        // SAFETY: as above, and `&mut self` excludes other host views.
        Some(unsafe { core::slice::from_raw_parts_mut(data, size) })
    }

    /// Forward a key event to the core's keyboard callback, if it registered one.
    pub fn key_event(&mut self, down: bool, keycode: u32, character: u32, modifiers: u16) -> bool {
        let Some(callback) = self.bridge.borrow().env.keyboard else {
            return false;
        };
        self.call(|_| unsafe { callback(down, keycode, character, modifiers) });
        true
    }

    /// Resolve a symbol through the core's proc-address interface.
    pub fn proc_address(&self, name: &str) -> ProcAddress {
        let lookup = self.bridge.borrow().env.proc_address?;
        let name = CString::new(name).ok()?;
        self.call(|_| unsafe { lookup(name.as_ptr()) })
    }

    fn disk(&self) -> Result<DiskControlExtCallback, HostError> {
        self.bridge
            .borrow()
            .env
            .disk_control
            .ok_or(HostError::MissingInterface("disk control"))
    }

    pub fn disk_image_count(&self) -> Result<u32, HostError> {
        let f = self.disk()?.get_num_images.ok_or(HostError::MissingInterface("get_num_images"))?;
        Ok(self.call(|_| unsafe { f() }))
    }

    pub fn disk_image_index(&self) -> Result<u32, HostError> {
        let f = self.disk()?.get_image_index.ok_or(HostError::MissingInterface("get_image_index"))?;
        Ok(self.call(|_| unsafe { f() }))
    }

    pub fn set_disk_image_index(&mut self, index: u32) -> Result<bool, HostError> {
        let f = self.disk()?.set_image_index.ok_or(HostError::MissingInterface("set_image_index"))?;
        Ok(self.call(|_| unsafe { f(index) }))
    }

    pub fn disk_ejected(&self) -> Result<bool, HostError> {
        let f = self.disk()?.get_eject_state.ok_or(HostError::MissingInterface("get_eject_state"))?;
        Ok(self.call(|_| unsafe { f() }))
    }

    pub fn set_disk_ejected(&mut self, ejected: bool) -> Result<bool, HostError> {
        let f = self.disk()?.set_eject_state.ok_or(HostError::MissingInterface("set_eject_state"))?;
        Ok(self.call(|_| unsafe { f(ejected) }))
    }

    /// Append an empty image slot.
    pub fn add_disk_image(&mut self) -> Result<bool, HostError> {
        let f = self.disk()?.add_image_index.ok_or(HostError::MissingInterface("add_image_index"))?;
        Ok(self.call(|_| unsafe { f() }))
    }

    /// Put `path` into slot `index`, or remove the slot when `path` is `None`.
    pub fn replace_disk_image(
        &mut self,
        index: u32,
        path: Option<&Path>,
    ) -> Result<bool, HostError> {
        let f = self
            .disk()?
            .replace_image_index
            .ok_or(HostError::MissingInterface("replace_image_index"))?;
        if self.content.is_none() {
            return Err(HostError::NoGame);
        }
        let file = match path {
            Some(path) => {
                let need_fullpath =
                    self.bridge.borrow().env.need_fullpath_for(path, self.info.need_fullpath);
                Some(ContentFile::open(path, need_fullpath)?)
            }
            None => None,
        };
        let info = file.as_ref().map(ContentFile::game_info);
        let info_ptr = info.as_ref().map_or(core::ptr::null(), core::ptr::from_ref);
        let replaced = self.call(|_| unsafe { f(index, info_ptr) });
        if let (Some(file), Some(content)) = (file, self.content.as_mut()) {
            content.disk_images.push(file);
        }
        Ok(replaced)
    }

    /// Select the image to insert on the next load (SET_DISK_CONTROL_EXT_INTERFACE v1).
    pub fn set_initial_disk_image(&mut self, index: u32, path: &Path) -> Result<bool, HostError> {
        let f = self
            .disk()?
            .set_initial_image
            .ok_or(HostError::MissingInterface("set_initial_image"))?;
        let path = cstring(path.to_string_lossy().into_owned(), path)?;
        Ok(self.call(|_| unsafe { f(index, path.as_ptr()) }))
    }

    pub fn disk_image_path(&self, index: u32) -> Result<Option<String>, HostError> {
        let f = self.disk()?.get_image_path.ok_or(HostError::MissingInterface("get_image_path"))?;
        Ok(self.read_disk_string(|buf, len| unsafe { f(index, buf, len) }))
    }

    pub fn disk_image_label(&self, index: u32) -> Result<Option<String>, HostError> {
        let f = self.disk()?.get_image_label.ok_or(HostError::MissingInterface("get_image_label"))?;
        Ok(self.read_disk_string(|buf, len| unsafe { f(index, buf, len) }))
    }

    fn read_disk_string(&self, get: impl FnOnce(*mut c_char, usize) -> bool) -> Option<String> {
        let mut buf = [0 as c_char; DISK_STRING_LEN];
        let ok = self.call(|_| get(buf.as_mut_ptr(), buf.len()));
        buf[DISK_STRING_LEN - 1] = 0;
        if !ok {
            return None;
        }
        // SAFETY: terminated above.
        let text = unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy().into_owned();
        (!text.is_empty()).then_some(text)
    }

    fn state_context(&self) -> StateContext {
        StateContext {
            quirks: self.bridge.borrow().env.quirks(),
            frames: self.frames,
            session: self.session,
        }
    }

    /// `retro_serialize_size`; 0 when the core has no save states.
    pub fn serialize_size(&self) -> usize {
        self.call(|api| unsafe { state::size(api) })
    }

    /// Whether `save_state`/`load_state` can succeed now. False before the first frame for
    /// cores that must run once before serializing.
    pub fn states_ready(&self) -> bool {
        self.content.is_some() && self.state_context().check_initialized().is_ok()
    }

    pub fn save_state(&mut self) -> Result<SaveState, HostError> {
        if self.content.is_none() {
            return Err(HostError::NoGame);
        }
        let ctx = self.state_context();
        Ok(self.call(|api| unsafe { state::save(api, ctx) })?)
    }

    pub fn load_state(&mut self, saved: &SaveState) -> Result<(), HostError> {
        if self.content.is_none() {
            return Err(HostError::NoGame);
        }
        let ctx = self.state_context();
        Ok(self.call(|api| unsafe { state::restore(api, ctx, saved) })?)
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        if let Ok(mut bridge) = self.bridge.try_borrow_mut() {
            bridge.video.set_sink(None);
            bridge.audio.set_sink(None);
            bridge.input.set_source(None);
        }
        if self.content.is_some() {
            if let Err(e) = self.unload_game() {
                warn!(error = %e, "unload during teardown failed");
            }
        }
        self.call(|api| unsafe { (api.deinit)() });
        debug!(session = self.session, "core deinitialized");
    }
}
