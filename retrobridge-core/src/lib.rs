//! retrobridge-core: host-side adapter for libretro cores.
//!
//! This crate hosts a dynamically loaded libretro core (API version 1) and bridges its
//! synchronous callbacks to host consumers:
//! - The host calls the core's lifecycle entry points through a [`Host`] session.
//! - Inside those calls the core invokes the callbacks the host registered: environment
//!   requests, video frames, audio samples and input queries.
//! - Frames reach a presentation thread through a latest-wins mailbox, audio through an
//!   SPSC ring. Input is read from the snapshot taken at the last poll.
//!
//! Host-side collaborators are traits: [`FrameSink`], [`AudioSink`], [`InputSource`],
//! [`CoreOptions`] and [`HwContext`]. The VFS table served to the core is backed by `std::fs`.
//!
//! The binary layout of the libretro structs lives in [`abi`] and is checked at startup.

pub mod abi;
pub mod audio;
pub mod capture;
pub mod config;
pub mod environment;
pub mod error;
pub mod host;
pub mod input;
pub mod loader;
pub mod options;
pub mod state;
pub mod vfs;
pub mod video;

pub use audio::{audio_ring, AudioBridge, AudioReceiver, AudioSink, RingSink};
pub use config::HostConfig;
pub use error::{AbiError, CaptureError, ConfigError, HostError, LoadError, StateError};
pub use host::{Bridge, Host};
pub use input::{InputProvider, InputSnapshot, InputSource, SharedInput};
pub use loader::{CoreApi, CoreInfo, CoreModule};
pub use options::{CoreOptions, OptionTable};
pub use state::SaveState;
pub use video::{frame_mailbox, Frame, FrameBridge, FrameReceiver, FrameSink, HwContext};
