//! Core library loading.
//!
//! Responsibilities:
//! - Resolve the 25 libretro entry points from a dynamic library (`libloading`).
//! - Refuse cores that report an API version other than [`abi::API_VERSION`].
//! - Keep a process-wide registry so the same library is never loaded twice at once
//!   (libretro cores keep global state; two sessions on one library would share it).
//! - Accept a prebuilt [`CoreApi`] table for statically linked cores and tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lazy_static::lazy_static;
use libloading::Library;
use tracing::{debug, info};

use crate::abi::{self, callbacks::*, ptr};
use crate::error::{AbiError, LoadError};

lazy_static! {
    static ref LOADED: Mutex<HashSet<PathBuf>> = Mutex::new(HashSet::new());
}

/// Lifecycle and registration entry points of a core.
#[derive(Debug, Clone, Copy)]
pub struct CoreApi {
    pub set_environment: SetEnvironmentFn,
    pub set_video_refresh: SetVideoRefreshFn,
    pub set_audio_sample: SetAudioSampleFn,
    pub set_audio_sample_batch: SetAudioSampleBatchFn,
    pub set_input_poll: SetInputPollFn,
    pub set_input_state: SetInputStateFn,
    pub init: InitFn,
    pub deinit: DeinitFn,
    pub api_version: ApiVersionFn,
    pub get_system_info: GetSystemInfoFn,
    pub get_system_av_info: GetSystemAvInfoFn,
    pub set_controller_port_device: SetControllerPortDeviceFn,
    pub reset: ResetFn,
    pub run: RunFn,
    pub serialize_size: SerializeSizeFn,
    pub serialize: SerializeFn,
    pub unserialize: UnserializeFn,
    pub cheat_reset: CheatResetFn,
    pub cheat_set: CheatSetFn,
    pub load_game: LoadGameFn,
    pub load_game_special: LoadGameSpecialFn,
    pub unload_game: UnloadGameFn,
    pub get_region: GetRegionFn,
    pub get_memory_data: GetMemoryDataFn,
    pub get_memory_size: GetMemorySizeFn,
}

impl CoreApi {
    /// Resolve every entry point from `lib`.
    ///
    /// # Safety
    /// `lib` must be a libretro core: each exported symbol must have the libretro signature.
    unsafe fn resolve(lib: &Library, path: &Path) -> Result<Self, LoadError> {
        macro_rules! get_fn {
            ($name:literal, $ty:ty) => {
                *unsafe { lib.get::<$ty>(concat!($name, "\0").as_bytes()) }.map_err(|_| {
                    LoadError::MissingSymbol {
                        path: path.to_path_buf(),
                        symbol: $name,
                    }
                })?
            };
        }

        Ok(CoreApi {
            set_environment: get_fn!("retro_set_environment", SetEnvironmentFn),
            set_video_refresh: get_fn!("retro_set_video_refresh", SetVideoRefreshFn),
            set_audio_sample: get_fn!("retro_set_audio_sample", SetAudioSampleFn),
            set_audio_sample_batch: get_fn!("retro_set_audio_sample_batch", SetAudioSampleBatchFn),
            set_input_poll: get_fn!("retro_set_input_poll", SetInputPollFn),
            set_input_state: get_fn!("retro_set_input_state", SetInputStateFn),
            init: get_fn!("retro_init", InitFn),
            deinit: get_fn!("retro_deinit", DeinitFn),
            api_version: get_fn!("retro_api_version", ApiVersionFn),
            get_system_info: get_fn!("retro_get_system_info", GetSystemInfoFn),
            get_system_av_info: get_fn!("retro_get_system_av_info", GetSystemAvInfoFn),
            set_controller_port_device: get_fn!(
                "retro_set_controller_port_device",
                SetControllerPortDeviceFn
            ),
            reset: get_fn!("retro_reset", ResetFn),
            run: get_fn!("retro_run", RunFn),
            serialize_size: get_fn!("retro_serialize_size", SerializeSizeFn),
            serialize: get_fn!("retro_serialize", SerializeFn),
            unserialize: get_fn!("retro_unserialize", UnserializeFn),
            cheat_reset: get_fn!("retro_cheat_reset", CheatResetFn),
            cheat_set: get_fn!("retro_cheat_set", CheatSetFn),
            load_game: get_fn!("retro_load_game", LoadGameFn),
            load_game_special: get_fn!("retro_load_game_special", LoadGameSpecialFn),
            unload_game: get_fn!("retro_unload_game", UnloadGameFn),
            get_region: get_fn!("retro_get_region", GetRegionFn),
            get_memory_data: get_fn!("retro_get_memory_data", GetMemoryDataFn),
            get_memory_size: get_fn!("retro_get_memory_size", GetMemorySizeFn),
        })
    }
}

/// Owned copy of `retro_system_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreInfo {
    pub library_name: String,
    pub library_version: String,
    pub valid_extensions: Vec<String>,
    pub need_fullpath: bool,
    pub block_extract: bool,
}

impl CoreInfo {
    pub fn from_raw(raw: &abi::SystemInfo) -> Self {
        let text = |p| unsafe { ptr::c_string(p) }.unwrap_or_default();
        Self {
            library_name: text(raw.library_name),
            library_version: text(raw.library_version),
            valid_extensions: text(raw.valid_extensions)
                .split('|')
                .filter(|e| !e.is_empty())
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            need_fullpath: raw.need_fullpath,
            block_extract: raw.block_extract,
        }
    }

    /// Whether `path` has one of the core's extensions. Cores listing none accept anything.
    pub fn accepts(&self, path: &Path) -> bool {
        if self.valid_extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.valid_extensions.iter().any(|v| v.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

/// A loaded core. Loaded once, run repeatedly, dropped once.
pub struct CoreModule {
    api: CoreApi,
    path: Option<PathBuf>,
    // Dropped after `api` is no longer reachable.
    _lib: Option<Library>,
}

impl std::fmt::Debug for CoreModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreModule").field("path", &self.path).finish()
    }
}

impl CoreModule {
    /// Open a core library.
    ///
    /// # Safety
    /// Loading a library runs its initializers; `path` must point to a trusted libretro core.
    pub unsafe fn load(path: &Path) -> Result<Self, LoadError> {
        abi::validate::check_layouts()?;

        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !register(&key) {
            return Err(LoadError::AlreadyLoaded(key));
        }

        let loaded = unsafe { Self::open(path) };
        match loaded {
            Ok((lib, api)) => {
                info!(path = %path.display(), "core loaded");
                Ok(Self {
                    api,
                    path: Some(key),
                    _lib: Some(lib),
                })
            }
            Err(e) => {
                unregister(&key);
                Err(e)
            }
        }
    }

    unsafe fn open(path: &Path) -> Result<(Library, CoreApi), LoadError> {
        let lib = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let api = unsafe { CoreApi::resolve(&lib, path) }?;
        check_version(&api)?;
        Ok((lib, api))
    }

    /// Wrap an entry-point table that is already in the process.
    pub fn from_api(api: CoreApi) -> Result<Self, LoadError> {
        abi::validate::check_layouts()?;
        check_version(&api)?;
        Ok(Self {
            api,
            path: None,
            _lib: None,
        })
    }

    pub fn api(&self) -> &CoreApi {
        &self.api
    }

    /// Canonical library path, `None` for [`Self::from_api`] cores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// `retro_get_system_info`. Safe to call before `retro_init`.
    pub fn system_info(&self) -> CoreInfo {
        let mut raw = abi::SystemInfo::default();
        unsafe { (self.api.get_system_info)(&mut raw) };
        CoreInfo::from_raw(&raw)
    }
}

impl Drop for CoreModule {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            debug!(path = %path.display(), "core unloaded");
            unregister(path);
        }
    }
}

fn check_version(api: &CoreApi) -> Result<(), AbiError> {
    let found = unsafe { (api.api_version)() };
    if found != abi::API_VERSION {
        return Err(AbiError::ApiVersion {
            expected: abi::API_VERSION,
            found,
        });
    }
    Ok(())
}

fn register(path: &Path) -> bool {
    match LOADED.lock() {
        Ok(mut set) => set.insert(path.to_path_buf()),
        Err(poisoned) => poisoned.into_inner().insert(path.to_path_buf()),
    }
}

fn unregister(path: &Path) {
    match LOADED.lock() {
        Ok(mut set) => set.remove(path),
        Err(poisoned) => poisoned.into_inner().remove(path),
    };
}
