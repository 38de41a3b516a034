//! Environment command handling.
//!
//! Responsibilities:
//! - Resolve raw command ids ([`crate::abi::EnvCommand::resolve`]) and run the matching
//!   handler in [`dispatch`].
//! - Keep everything the core declares or registers through the environment:
//!   directories and user settings it queries, callbacks it registers, AV info, subsystem
//!   and memory map declarations, serialization quirks, on-screen messages.
//! - Serve the host interfaces (log, perf, rumble, LED, VFS) from [`interfaces`].
//!
//! The pixel format, rotation and hardware render registration are not stored here; they
//! live in [`crate::video::FrameBridge`] and the dispatcher forwards to it.

mod dispatch;
pub mod interfaces;

use std::collections::{BTreeMap, VecDeque};
use std::ffi::CString;
use std::path::Path;

use tracing::{debug, info};

use crate::abi::{
    AudioBufferStatusFn, AudioCallback, DiskControlExtCallback, FastforwardingOverride,
    FrameTimeCallback, GameInfoExt, GetProcAddressFn, KeyboardEventFn, Language, LogLevel,
    MessageTarget, MessageType, SystemAvInfo,
};
use crate::config::HostConfig;
use crate::options::{CoreOptions, OptionTable};

pub use dispatch::dispatch;

/// How long a message should stay on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDuration {
    /// SET_MESSAGE: counted in video frames.
    Frames(u32),
    /// SET_MESSAGE_EXT: milliseconds.
    Millis(u32),
}

/// A message the core asked the host to show or log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMessage {
    pub text: String,
    pub duration: MessageDuration,
    pub priority: u32,
    pub level: LogLevel,
    pub target: MessageTarget,
    pub kind: MessageType,
    /// Percent complete for progress messages, `None` for indeterminate.
    pub progress: Option<u8>,
}

impl HostMessage {
    pub(crate) fn legacy(text: String, frames: u32) -> Self {
        Self {
            text,
            duration: MessageDuration::Frames(frames),
            priority: 0,
            level: LogLevel::Info,
            target: MessageTarget::All,
            kind: MessageType::Notification,
            progress: None,
        }
    }
}

/// One ROM slot of a subsystem (SET_SUBSYSTEM_INFO).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemRom {
    pub description: String,
    pub extensions: Vec<String>,
    pub need_fullpath: bool,
    pub block_extract: bool,
    pub required: bool,
    /// `(extension, memory type)` pairs for save files of this slot.
    pub memory: Vec<(String, u32)>,
}

/// A special content type the core can load through `retro_load_game_special`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsystem {
    pub description: String,
    pub ident: String,
    pub id: u32,
    pub roms: Vec<SubsystemRom>,
}

/// Owned copy of a `retro_memory_descriptor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub flags: u64,
    /// Host address of the region inside the core.
    pub ptr: usize,
    pub offset: usize,
    pub start: usize,
    pub select: usize,
    pub disconnect: usize,
    pub len: usize,
    pub addrspace: Option<String>,
}

/// Per-extension override of the core's content loading flags (SET_CONTENT_INFO_OVERRIDE).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentOverride {
    pub extensions: Vec<String>,
    pub need_fullpath: bool,
    pub persistent_data: bool,
}

/// Environment state shared by the dispatcher and the host session.
pub struct EnvState {
    pub(crate) system_dir: Option<CString>,
    pub(crate) save_dir: Option<CString>,
    pub(crate) core_assets_dir: Option<CString>,
    pub(crate) libretro_path: Option<CString>,
    pub(crate) username: CString,
    pub(crate) language: Language,
    pub(crate) overscan: bool,
    pub(crate) target_refresh_rate: f32,
    pub(crate) max_users: u32,
    pub(crate) options: Box<dyn CoreOptions>,

    pub(crate) av_info: Option<SystemAvInfo>,
    pub(crate) quirks: u64,
    pub(crate) support_no_game: bool,
    pub(crate) support_achievements: bool,
    pub(crate) performance_level: u32,
    pub(crate) shutdown_requested: bool,
    pub(crate) fastforwarding: bool,
    pub(crate) fastforward_override: Option<FastforwardingOverride>,
    pub(crate) minimum_audio_latency_ms: u32,
    pub(crate) save_state_in_background: bool,
    pub(crate) poll_type_override: u32,
    pub(crate) messages: VecDeque<HostMessage>,
    pub(crate) leds: BTreeMap<i32, i32>,

    pub(crate) keyboard: Option<KeyboardEventFn>,
    pub(crate) disk_control: Option<DiskControlExtCallback>,
    pub(crate) frame_time: Option<FrameTimeCallback>,
    pub(crate) audio_callback: Option<AudioCallback>,
    pub(crate) audio_buffer_status: Option<AudioBufferStatusFn>,
    pub(crate) proc_address: Option<GetProcAddressFn>,

    pub(crate) subsystems: Vec<Subsystem>,
    pub(crate) memory_maps: Vec<MemoryRegion>,
    pub(crate) content_overrides: Vec<ContentOverride>,
    /// Points into the content buffers owned by the session; null when nothing is loaded.
    pub(crate) game_info_ext: *const GameInfoExt,
}

/// Messages kept before the oldest is discarded.
const MAX_QUEUED_MESSAGES: usize = 64;

fn path_cstring(path: &Path) -> Option<CString> {
    CString::new(path.to_string_lossy().into_owned()).ok()
}

impl EnvState {
    pub fn new(
        config: &HostConfig,
        options: Box<dyn CoreOptions>,
        core_path: Option<&Path>,
    ) -> Self {
        Self {
            system_dir: config.system_dir().as_deref().and_then(path_cstring),
            save_dir: config.save_dir().as_deref().and_then(path_cstring),
            core_assets_dir: config.paths.core_assets_dir.as_deref().and_then(path_cstring),
            libretro_path: core_path.and_then(path_cstring),
            username: CString::new(config.user.username.replace('\0', "")).unwrap_or_default(),
            language: config.user.language,
            overscan: config.video.overscan,
            target_refresh_rate: config.video.target_refresh_rate,
            max_users: config.max_users(),
            options,
            av_info: None,
            quirks: 0,
            support_no_game: false,
            support_achievements: false,
            performance_level: 0,
            shutdown_requested: false,
            fastforwarding: false,
            fastforward_override: None,
            minimum_audio_latency_ms: 0,
            save_state_in_background: false,
            poll_type_override: 0,
            messages: VecDeque::new(),
            leds: BTreeMap::new(),
            keyboard: None,
            disk_control: None,
            frame_time: None,
            audio_callback: None,
            audio_buffer_status: None,
            proc_address: None,
            subsystems: Vec::new(),
            memory_maps: Vec::new(),
            content_overrides: Vec::new(),
            game_info_ext: std::ptr::null(),
        }
    }

    /// State with default configuration and an empty option table.
    pub fn with_defaults() -> Self {
        Self::new(&HostConfig::default(), Box::new(OptionTable::new()), None)
    }

    pub fn options(&self) -> &dyn CoreOptions {
        self.options.as_ref()
    }

    pub fn options_mut(&mut self) -> &mut dyn CoreOptions {
        self.options.as_mut()
    }

    pub fn av_info(&self) -> Option<SystemAvInfo> {
        self.av_info
    }

    pub fn quirks(&self) -> u64 {
        self.quirks
    }

    pub fn support_no_game(&self) -> bool {
        self.support_no_game
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    pub fn set_fastforwarding(&mut self, enabled: bool) {
        self.fastforwarding = enabled;
    }

    pub fn fastforward_override(&self) -> Option<FastforwardingOverride> {
        self.fastforward_override
    }

    pub fn minimum_audio_latency_ms(&self) -> u32 {
        self.minimum_audio_latency_ms
    }

    pub fn subsystems(&self) -> &[Subsystem] {
        &self.subsystems
    }

    pub fn memory_maps(&self) -> &[MemoryRegion] {
        &self.memory_maps
    }

    pub fn content_overrides(&self) -> &[ContentOverride] {
        &self.content_overrides
    }

    /// LED states reported through the LED interface.
    pub fn leds(&self) -> &BTreeMap<i32, i32> {
        &self.leds
    }

    /// Whether `path` must be passed by path only, after content overrides.
    pub fn need_fullpath_for(&self, path: &Path, core_default: bool) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return core_default;
        };
        self.content_overrides
            .iter()
            .find(|o| o.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
            .map_or(core_default, |o| o.need_fullpath)
    }

    pub(crate) fn push_message(&mut self, message: HostMessage) {
        match message.level {
            LogLevel::Error => tracing::error!(target: "retrobridge::core_log", "{}", message.text),
            LogLevel::Warn => tracing::warn!(target: "retrobridge::core_log", "{}", message.text),
            _ => info!(target: "retrobridge::core_log", "{}", message.text),
        }
        if self.messages.len() == MAX_QUEUED_MESSAGES {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Take every queued message, oldest first.
    pub fn drain_messages(&mut self) -> Vec<HostMessage> {
        self.messages.drain(..).collect()
    }

    /// Forget everything registered for the loaded game.
    pub(crate) fn clear_game(&mut self) {
        debug!("environment game state cleared");
        self.game_info_ext = std::ptr::null();
        self.memory_maps.clear();
        self.av_info = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_override_changes_fullpath_per_extension() {
        let mut env = EnvState::with_defaults();
        env.content_overrides.push(ContentOverride {
            extensions: vec!["cue".into(), "chd".into()],
            need_fullpath: true,
            persistent_data: false,
        });
        assert!(env.need_fullpath_for(Path::new("disc.CUE"), false));
        assert!(!env.need_fullpath_for(Path::new("cart.bin"), false));
        assert!(env.need_fullpath_for(Path::new("noext"), true));
    }

    #[test]
    fn message_queue_is_bounded() {
        let mut env = EnvState::with_defaults();
        for i in 0..MAX_QUEUED_MESSAGES + 3 {
            env.push_message(HostMessage::legacy(format!("m{i}"), 60));
        }
        let drained = env.drain_messages();
        assert_eq!(drained.len(), MAX_QUEUED_MESSAGES);
        assert_eq!(drained[0].text, "m3");
        assert!(env.drain_messages().is_empty());
    }

    #[test]
    fn directories_follow_configuration() {
        let mut config = HostConfig::default();
        config.paths.system_dir = Some("/bios".into());
        config.user.username = "ada".into();
        let env = EnvState::new(&config, Box::new(OptionTable::new()), Some(Path::new("/c.so")));
        assert_eq!(env.system_dir.as_deref(), Some(c"/bios"));
        assert_eq!(env.username.as_c_str(), c"ada");
        assert_eq!(env.libretro_path.as_deref(), Some(c"/c.so"));
        assert!(env.core_assets_dir.is_none());
    }
}
