//! Environment command ids.
//!
//! A raw command id is a base id optionally OR-ed with [`ENVIRONMENT_EXPERIMENTAL`] and/or
//! [`ENVIRONMENT_PRIVATE`]. [`EnvCommand::resolve`] strips both flags to find the command,
//! and keeps them in [`EnvFlags`] so handlers can gate on the variant. Base id 44 is the
//! one place where the experimental bit selects a different command.

/// Marks commands whose payload shape may still change.
pub const ENVIRONMENT_EXPERIMENTAL: u32 = 0x10000;
/// Marks frontend-private commands.
pub const ENVIRONMENT_PRIVATE: u32 = 0x20000;
/// First id of the RetroArch extension block.
pub const ENVIRONMENT_RETROARCH_START_BLOCK: u32 = 0x800000;

const FLAG_MASK: u32 = ENVIRONMENT_EXPERIMENTAL | ENVIRONMENT_PRIVATE;

/// Flag bits carried by a raw command id.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EnvFlags {
    pub experimental: bool,
    pub private: bool,
}

impl EnvFlags {
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            experimental: raw & ENVIRONMENT_EXPERIMENTAL != 0,
            private: raw & ENVIRONMENT_PRIVATE != 0,
        }
    }
}

/// Strip the flag bits from a raw command id.
pub const fn base_id(raw: u32) -> u32 {
    raw & !FLAG_MASK
}

macro_rules! env_commands {
    ($( $name:ident = $id:expr ),* $(,)?) => {
        /// Every environment command known to the host.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum EnvCommand {
            $( $name, )*
        }

        impl EnvCommand {
            /// All commands, in id order.
            pub const ALL: &'static [EnvCommand] = &[ $( EnvCommand::$name, )* ];

            /// The id as published in `libretro.h`, including the experimental bit where the
            /// header defines one.
            pub const fn id(self) -> u32 {
                match self {
                    $( EnvCommand::$name => $id, )*
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $( EnvCommand::$name => stringify!($name), )*
                }
            }
        }
    };
}

const EXP: u32 = ENVIRONMENT_EXPERIMENTAL;
const RA: u32 = ENVIRONMENT_RETROARCH_START_BLOCK;

env_commands! {
    SetRotation = 1,
    GetOverscan = 2,
    GetCanDupe = 3,
    SetMessage = 6,
    Shutdown = 7,
    SetPerformanceLevel = 8,
    GetSystemDirectory = 9,
    SetPixelFormat = 10,
    SetInputDescriptors = 11,
    SetKeyboardCallback = 12,
    SetDiskControlInterface = 13,
    SetHwRender = 14,
    GetVariable = 15,
    SetVariables = 16,
    GetVariableUpdate = 17,
    SetSupportNoGame = 18,
    GetLibretroPath = 19,
    SetFrameTimeCallback = 21,
    SetAudioCallback = 22,
    GetRumbleInterface = 23,
    GetInputDeviceCapabilities = 24,
    GetSensorInterface = 25 | EXP,
    GetCameraInterface = 26 | EXP,
    GetLogInterface = 27,
    GetPerfInterface = 28,
    GetLocationInterface = 29,
    // Also published as GET_CONTENT_DIRECTORY.
    GetCoreAssetsDirectory = 30,
    GetSaveDirectory = 31,
    SetSystemAvInfo = 32,
    SetProcAddressCallback = 33,
    SetSubsystemInfo = 34,
    SetControllerInfo = 35,
    SetMemoryMaps = 36 | EXP,
    SetGeometry = 37,
    GetUsername = 38,
    GetLanguage = 39,
    GetCurrentSoftwareFramebuffer = 40 | EXP,
    GetHwRenderInterface = 41 | EXP,
    SetSupportAchievements = 42 | EXP,
    SetHwRenderContextNegotiationInterface = 43 | EXP,
    SetSerializationQuirks = 44,
    SetHwSharedContext = 44 | EXP,
    GetVfsInterface = 45 | EXP,
    GetLedInterface = 46 | EXP,
    GetAudioVideoEnable = 47 | EXP,
    GetMidiInterface = 48 | EXP,
    GetFastforwarding = 49 | EXP,
    GetTargetRefreshRate = 50 | EXP,
    GetInputBitmasks = 51 | EXP,
    GetCoreOptionsVersion = 52,
    SetCoreOptions = 53,
    SetCoreOptionsIntl = 54,
    SetCoreOptionsDisplay = 55,
    GetPreferredHwRender = 56,
    GetDiskControlInterfaceVersion = 57,
    SetDiskControlExtInterface = 58,
    GetMessageInterfaceVersion = 59,
    SetMessageExt = 60,
    GetInputMaxUsers = 61,
    SetAudioBufferStatusCallback = 62,
    SetMinimumAudioLatency = 63,
    SetFastforwardingOverride = 64,
    SetContentInfoOverride = 65,
    GetGameInfoExt = 66,
    SetSaveStateInBackground = RA | 2,
    GetClearAllThreadWaitsCb = RA | 3,
    PollTypeOverride = RA | 4,
}

impl EnvCommand {
    /// Resolve a raw id coming from the core.
    ///
    /// Returns `None` for ids the host does not know.
    pub fn resolve(raw: u32) -> Option<(EnvCommand, EnvFlags)> {
        let flags = EnvFlags::from_raw(raw);
        let base = base_id(raw);

        let cmd = match base {
            44 if flags.experimental => EnvCommand::SetHwSharedContext,
            44 => EnvCommand::SetSerializationQuirks,
            _ => *Self::ALL.iter().find(|c| base_id(c.id()) == base)?,
        };
        Some((cmd, flags))
    }
}
