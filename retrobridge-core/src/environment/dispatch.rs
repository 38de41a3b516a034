use core::ffi::{c_char, c_int, c_uint, c_void, CStr};

use tracing::{debug, info, trace, warn};

use super::{
    interfaces, ContentOverride, HostMessage, MemoryRegion, MessageDuration, Subsystem,
    SubsystemRom,
};
use crate::abi::options::{CoreOptionDefinition, CoreOptionsIntl};
use crate::abi::{
    av_enable, ptr, quirks, vfs, AudioBufferStatusCallback, AudioCallback, ClearAllThreadWaitsFn,
    ControllerInfo, CoreOptionDisplay, DiskControlCallback, DiskControlExtCallback, EnvCommand,
    FastforwardingOverride, FrameTimeCallback, GameGeometry, GetProcAddressInterface,
    HwRenderCallback, InputDescriptor, KeyboardCallback, LedInterface, LogCallback, LogLevel,
    MemoryMap, Message, MessageExt, MessageTarget, MessageType, RumbleInterface, SubsystemInfo,
    SystemAvInfo, SystemContentInfoOverride, Variable, VfsInterfaceInfo,
    CORE_OPTIONS_VERSION, DISK_CONTROL_INTERFACE_VERSION, MESSAGE_INTERFACE_VERSION,
};
use crate::host::Bridge;
use crate::input::{ControllerType, InputDescriptorInfo, InputProvider};
use crate::options::{parse_definitions, parse_intl, parse_variables};

/// Handle one `retro_environment_t` call.
///
/// Unknown ids return `false` without touching `data`. Recognized ids return `true` unless
/// the payload is null where one is required, or the host cannot serve the request.
///
/// # Safety
/// `data` must be null or point to the payload type libretro defines for `cmd`, valid for
/// the duration of the call.
pub unsafe fn dispatch(bridge: &mut Bridge, cmd: u32, data: *mut c_void) -> bool {
    let Some((command, flags)) = EnvCommand::resolve(cmd) else {
        debug!(cmd, "unknown environment command");
        return false;
    };
    let handled = unsafe { handle(bridge, command, data) };
    trace!(
        command = command.name(),
        experimental = flags.experimental,
        private = flags.private,
        handled,
        "environment"
    );
    handled
}

unsafe fn handle(b: &mut Bridge, command: EnvCommand, data: *mut c_void) -> bool {
    use EnvCommand as C;

    match command {
        C::SetRotation => match unsafe { ptr::read::<c_uint>(data) } {
            Some(quarter_turns) => b.video.set_rotation(quarter_turns),
            None => false,
        },
        C::GetOverscan => unsafe { ptr::write(data, b.env.overscan) },
        C::GetCanDupe => unsafe { ptr::write(data, true) },
        C::SetMessage => {
            let Some(msg) = (unsafe { ptr::read::<Message>(data) }) else {
                return false;
            };
            let text = unsafe { ptr::c_string(msg.msg) }.unwrap_or_default();
            b.env.push_message(HostMessage::legacy(text, msg.frames));
            true
        }
        C::Shutdown => {
            info!("core requested shutdown");
            b.env.shutdown_requested = true;
            true
        }
        C::SetPerformanceLevel => match unsafe { ptr::read::<c_uint>(data) } {
            Some(level) => {
                debug!(level, "performance level");
                b.env.performance_level = level;
                true
            }
            None => false,
        },
        C::GetSystemDirectory => unsafe { write_str(data, b.env.system_dir.as_deref()) },
        C::SetPixelFormat => match unsafe { ptr::read::<c_int>(data) } {
            Some(raw) => b.video.set_pixel_format(raw),
            None => false,
        },
        C::SetInputDescriptors => {
            if data.is_null() {
                return false;
            }
            let raw = unsafe {
                ptr::terminated(data as *const InputDescriptor, |d| d.description.is_null())
            };
            let descriptors = raw
                .iter()
                .map(|d| InputDescriptorInfo {
                    port: d.port,
                    device: d.device,
                    index: d.index,
                    id: d.id,
                    description: unsafe { ptr::c_string(d.description) }.unwrap_or_default(),
                })
                .collect();
            b.input.set_descriptors(descriptors);
            true
        }
        C::SetKeyboardCallback => match unsafe { ptr::read::<KeyboardCallback>(data) } {
            Some(cb) => {
                b.env.keyboard = cb.callback;
                true
            }
            None => false,
        },
        C::SetDiskControlInterface => match unsafe { ptr::read::<DiskControlCallback>(data) } {
            Some(cb) => {
                b.env.disk_control = Some(cb.into());
                true
            }
            None => false,
        },
        C::SetDiskControlExtInterface => {
            match unsafe { ptr::read::<DiskControlExtCallback>(data) } {
                Some(cb) => {
                    b.env.disk_control = Some(cb);
                    true
                }
                None => false,
            }
        }
        C::SetHwRender => {
            let Some(cb) = (unsafe { ptr::as_mut::<HwRenderCallback>(data) }) else {
                return false;
            };
            let mut filled = *cb;
            filled.get_current_framebuffer = Some(interfaces::hw_current_framebuffer);
            filled.get_proc_address = Some(interfaces::hw_proc_address);
            if !b.video.register_hw_render(filled) {
                return false;
            }
            *cb = filled;
            true
        }
        C::GetVariable => {
            let Some(var) = (unsafe { ptr::as_mut::<Variable>(data) }) else {
                return false;
            };
            let Some(key) = (unsafe { ptr::c_str(var.key) }) else {
                return false;
            };
            var.value = b
                .env
                .options
                .value(&key)
                .map_or(core::ptr::null(), CStr::as_ptr);
            true
        }
        C::SetVariables => {
            if data.is_null() {
                return false;
            }
            let options = unsafe { parse_variables(data as *const Variable) };
            b.env.options.declare(options);
            true
        }
        C::GetVariableUpdate => {
            if data.is_null() {
                return false;
            }
            let updated = b.env.options.take_updated();
            unsafe { ptr::write(data, updated) }
        }
        C::SetSupportNoGame => match unsafe { ptr::read::<bool>(data) } {
            Some(support) => {
                b.env.support_no_game = support;
                true
            }
            None => false,
        },
        C::GetLibretroPath => unsafe { write_str(data, b.env.libretro_path.as_deref()) },
        C::SetFrameTimeCallback => match unsafe { ptr::read::<FrameTimeCallback>(data) } {
            Some(cb) => {
                b.env.frame_time = cb.callback.is_some().then_some(cb);
                true
            }
            None => false,
        },
        C::SetAudioCallback => match unsafe { ptr::read::<AudioCallback>(data) } {
            Some(cb) => {
                b.env.audio_callback = cb.callback.is_some().then_some(cb);
                true
            }
            None => false,
        },
        C::GetRumbleInterface => unsafe {
            ptr::write(
                data,
                RumbleInterface {
                    set_rumble_state: Some(interfaces::set_rumble_state),
                },
            )
        },
        C::GetInputDeviceCapabilities => unsafe {
            ptr::write(data, InputProvider::capabilities())
        },
        C::GetSensorInterface
        | C::GetCameraInterface
        | C::GetLocationInterface
        | C::GetMidiInterface
        | C::GetCurrentSoftwareFramebuffer
        | C::GetHwRenderInterface
        | C::SetHwRenderContextNegotiationInterface => false,
        C::GetLogInterface => unsafe {
            ptr::write(
                data,
                LogCallback {
                    log: Some(interfaces::log_printf()),
                },
            )
        },
        C::GetPerfInterface => unsafe { ptr::write(data, interfaces::perf_callback()) },
        C::GetCoreAssetsDirectory => unsafe { write_str(data, b.env.core_assets_dir.as_deref()) },
        C::GetSaveDirectory => unsafe { write_str(data, b.env.save_dir.as_deref()) },
        C::SetSystemAvInfo => match unsafe { ptr::read::<SystemAvInfo>(data) } {
            Some(av) => {
                b.apply_av_info(av);
                true
            }
            None => false,
        },
        C::SetProcAddressCallback => {
            match unsafe { ptr::read::<GetProcAddressInterface>(data) } {
                Some(iface) => {
                    b.env.proc_address = iface.get_proc_address;
                    true
                }
                None => false,
            }
        }
        C::SetSubsystemInfo => {
            if data.is_null() {
                return false;
            }
            b.env.subsystems = unsafe { read_subsystems(data as *const SubsystemInfo) };
            debug!(count = b.env.subsystems.len(), "subsystems declared");
            true
        }
        C::SetControllerInfo => {
            if data.is_null() {
                return false;
            }
            let controllers = unsafe { read_controllers(data as *const ControllerInfo) };
            b.input.set_controllers(controllers);
            true
        }
        C::SetMemoryMaps => match unsafe { ptr::read::<MemoryMap>(data) } {
            Some(map) => {
                b.env.memory_maps = unsafe { read_memory_map(&map) };
                debug!(count = b.env.memory_maps.len(), "memory map declared");
                true
            }
            None => false,
        },
        C::SetGeometry => match unsafe { ptr::read::<GameGeometry>(data) } {
            Some(geometry) => {
                if let Some(av) = b.env.av_info.as_mut() {
                    av.geometry = geometry;
                }
                b.video.geometry_changed(&geometry);
                true
            }
            None => false,
        },
        C::GetUsername => unsafe { write_str(data, Some(b.env.username.as_c_str())) },
        C::GetLanguage => unsafe { ptr::write(data, b.env.language as c_uint) },
        C::SetSupportAchievements => match unsafe { ptr::read::<bool>(data) } {
            Some(support) => {
                b.env.support_achievements = support;
                true
            }
            None => false,
        },
        C::SetSerializationQuirks => {
            let Some(q) = (unsafe { ptr::as_mut::<u64>(data) }) else {
                return false;
            };
            b.env.quirks = *q;
            debug!(quirks = *q, "serialization quirks");
            *q |= quirks::FRONT_VARIABLE_SIZE;
            true
        }
        C::SetHwSharedContext => b.video.context().is_some(),
        C::GetVfsInterface => {
            let Some(info) = (unsafe { ptr::as_mut::<VfsInterfaceInfo>(data) }) else {
                return false;
            };
            if info.required_interface_version > vfs::INTERFACE_VERSION {
                warn!(
                    required = info.required_interface_version,
                    "core requires a newer VFS interface"
                );
                return false;
            }
            info.required_interface_version = vfs::INTERFACE_VERSION;
            info.iface = crate::vfs::interface();
            true
        }
        C::GetLedInterface => unsafe {
            ptr::write(
                data,
                LedInterface {
                    set_led_state: Some(interfaces::set_led_state),
                },
            )
        },
        C::GetAudioVideoEnable => {
            let mut mask = 0;
            if b.video.enabled() {
                mask |= av_enable::VIDEO;
            }
            if b.audio.enabled() {
                mask |= av_enable::AUDIO;
            }
            unsafe { ptr::write::<c_int>(data, mask) }
        }
        C::GetFastforwarding => unsafe { ptr::write(data, b.env.fastforwarding) },
        C::GetTargetRefreshRate => unsafe { ptr::write(data, b.env.target_refresh_rate) },
        C::GetInputBitmasks => b.input.bitmasks(),
        C::GetCoreOptionsVersion => unsafe { ptr::write::<c_uint>(data, CORE_OPTIONS_VERSION) },
        C::SetCoreOptions => {
            if data.is_null() {
                return false;
            }
            let options = unsafe { parse_definitions(data as *const CoreOptionDefinition) };
            b.env.options.declare(options);
            true
        }
        C::SetCoreOptionsIntl => match unsafe { ptr::read::<CoreOptionsIntl>(data) } {
            Some(intl) => {
                let options = unsafe { parse_intl(&intl) };
                b.env.options.declare(options);
                true
            }
            None => false,
        },
        C::SetCoreOptionsDisplay => {
            let Some(display) = (unsafe { ptr::read::<CoreOptionDisplay>(data) }) else {
                return false;
            };
            let Some(key) = (unsafe { ptr::c_str(display.key) }) else {
                return false;
            };
            b.env.options.set_visible(&key, display.visible);
            true
        }
        C::GetPreferredHwRender => match b.video.context() {
            Some(context) => unsafe { ptr::write(data, context.preferred() as c_uint) },
            None => false,
        },
        C::GetDiskControlInterfaceVersion => unsafe {
            ptr::write::<c_uint>(data, DISK_CONTROL_INTERFACE_VERSION)
        },
        C::GetMessageInterfaceVersion => unsafe {
            ptr::write::<c_uint>(data, MESSAGE_INTERFACE_VERSION)
        },
        C::SetMessageExt => match unsafe { ptr::read::<MessageExt>(data) } {
            Some(msg) => {
                let message = unsafe { message_ext(&msg) };
                b.env.push_message(message);
                true
            }
            None => false,
        },
        C::GetInputMaxUsers => unsafe { ptr::write::<c_uint>(data, b.env.max_users) },
        C::SetAudioBufferStatusCallback => {
            // A null payload unregisters.
            b.env.audio_buffer_status =
                unsafe { ptr::read::<AudioBufferStatusCallback>(data) }.and_then(|cb| cb.callback);
            true
        }
        C::SetMinimumAudioLatency => match unsafe { ptr::read::<c_uint>(data) } {
            Some(ms) => {
                b.env.minimum_audio_latency_ms = ms;
                true
            }
            None => false,
        },
        C::SetFastforwardingOverride => {
            // A null payload asks whether the override is supported.
            if let Some(value) = unsafe { ptr::read::<FastforwardingOverride>(data) } {
                debug!(?value, "fast-forward override");
                b.env.fastforwarding = value.fastforward;
                b.env.fastforward_override = Some(value);
            }
            true
        }
        C::SetContentInfoOverride => {
            // A null payload asks whether overrides are supported.
            if !data.is_null() {
                b.env.content_overrides =
                    unsafe { read_content_overrides(data as *const SystemContentInfoOverride) };
            }
            true
        }
        C::GetGameInfoExt => {
            if b.env.game_info_ext.is_null() {
                return false;
            }
            unsafe { ptr::write(data, b.env.game_info_ext) }
        }
        C::SetSaveStateInBackground => match unsafe { ptr::read::<bool>(data) } {
            Some(enabled) => {
                b.env.save_state_in_background = enabled;
                true
            }
            None => false,
        },
        C::GetClearAllThreadWaitsCb => unsafe {
            ptr::write::<Option<ClearAllThreadWaitsFn>>(
                data,
                Some(interfaces::clear_all_thread_waits),
            )
        },
        C::PollTypeOverride => match unsafe { ptr::read::<c_uint>(data) } {
            Some(kind) => {
                b.env.poll_type_override = kind;
                true
            }
            None => false,
        },
    }
}

/// Write a host-owned string pointer (or null when unset) into the payload.
unsafe fn write_str(data: *mut c_void, value: Option<&CStr>) -> bool {
    let p: *const c_char = value.map_or(core::ptr::null(), CStr::as_ptr);
    unsafe { ptr::write(data, p) }
}

unsafe fn message_ext(msg: &MessageExt) -> HostMessage {
    let level = LogLevel::try_from(msg.level).unwrap_or(LogLevel::Info);
    let target = match msg.target {
        1 => MessageTarget::Osd,
        2 => MessageTarget::Log,
        _ => MessageTarget::All,
    };
    let kind = match msg.type_ {
        1 => MessageType::NotificationAlt,
        2 => MessageType::Status,
        3 => MessageType::Progress,
        _ => MessageType::Notification,
    };
    HostMessage {
        text: unsafe { ptr::c_string(msg.msg) }.unwrap_or_default(),
        duration: MessageDuration::Millis(msg.duration),
        priority: msg.priority,
        level,
        target,
        kind,
        progress: u8::try_from(msg.progress).ok().map(|p| p.min(100)),
    }
}

fn split_extensions(list: Option<String>) -> Vec<String> {
    list.unwrap_or_default()
        .split('|')
        .filter(|e| !e.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

unsafe fn read_subsystems(data: *const SubsystemInfo) -> Vec<Subsystem> {
    let raw = unsafe { ptr::terminated(data, |s| s.ident.is_null()) };
    raw.iter()
        .map(|s| {
            let roms = unsafe { ptr::slice(s.roms, s.num_roms as usize) };
            Subsystem {
                description: unsafe { ptr::c_string(s.desc) }.unwrap_or_default(),
                ident: unsafe { ptr::c_string(s.ident) }.unwrap_or_default(),
                id: s.id,
                roms: roms
                    .iter()
                    .map(|r| {
                        let memory = unsafe { ptr::slice(r.memory, r.num_memory as usize) };
                        SubsystemRom {
                            description: unsafe { ptr::c_string(r.desc) }.unwrap_or_default(),
                            extensions: split_extensions(unsafe {
                                ptr::c_string(r.valid_extensions)
                            }),
                            need_fullpath: r.need_fullpath,
                            block_extract: r.block_extract,
                            required: r.required,
                            memory: memory
                                .iter()
                                .map(|m| {
                                    let ext = unsafe { ptr::c_string(m.extension) };
                                    (ext.unwrap_or_default(), m.type_)
                                })
                                .collect(),
                        }
                    })
                    .collect(),
            }
        })
        .collect()
}

unsafe fn read_controllers(data: *const ControllerInfo) -> Vec<Vec<ControllerType>> {
    let ports = unsafe { ptr::terminated(data, |c| c.types.is_null()) };
    ports
        .iter()
        .map(|port| {
            unsafe { ptr::slice(port.types, port.num_types as usize) }
                .iter()
                .map(|t| ControllerType {
                    description: unsafe { ptr::c_string(t.desc) }.unwrap_or_default(),
                    device: t.id,
                })
                .collect()
        })
        .collect()
}

unsafe fn read_memory_map(map: &MemoryMap) -> Vec<MemoryRegion> {
    unsafe { ptr::slice(map.descriptors, map.num_descriptors as usize) }
        .iter()
        .map(|d| MemoryRegion {
            flags: d.flags,
            ptr: d.ptr as usize,
            offset: d.offset,
            start: d.start,
            select: d.select,
            disconnect: d.disconnect,
            len: d.len,
            addrspace: unsafe { ptr::c_string(d.addrspace) },
        })
        .collect()
}

unsafe fn read_content_overrides(data: *const SystemContentInfoOverride) -> Vec<ContentOverride> {
    unsafe { ptr::terminated(data, |o| o.extensions.is_null()) }
        .iter()
        .map(|o| ContentOverride {
            extensions: split_extensions(unsafe { ptr::c_string(o.extensions) }),
            need_fullpath: o.need_fullpath,
            persistent_data: o.persistent_data,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{HwContextType, PixelFormat, ProcAddress, ENVIRONMENT_PRIVATE};
    use crate::video::HwContext;

    /// Zeroed, 8-byte aligned scratch payload large enough for every command.
    fn zeroed() -> Box<[u64; 512]> {
        Box::new([0; 512])
    }

    fn run(bridge: &mut Bridge, cmd: u32, payload: &mut [u64; 512]) -> bool {
        unsafe { dispatch(bridge, cmd, payload.as_mut_ptr().cast()) }
    }

    /// Commands that answer `false` with a zeroed payload on a host without a graphics
    /// context and without loaded content.
    const REFUSED: &[EnvCommand] = &[
        EnvCommand::SetHwRender,
        EnvCommand::GetVariable,
        EnvCommand::GetSensorInterface,
        EnvCommand::GetCameraInterface,
        EnvCommand::GetLocationInterface,
        EnvCommand::GetCurrentSoftwareFramebuffer,
        EnvCommand::GetHwRenderInterface,
        EnvCommand::SetHwRenderContextNegotiationInterface,
        EnvCommand::SetHwSharedContext,
        EnvCommand::GetMidiInterface,
        EnvCommand::SetCoreOptionsDisplay,
        EnvCommand::GetPreferredHwRender,
        EnvCommand::GetGameInfoExt,
    ];

    #[test]
    fn every_command_answers_the_same_with_the_private_flag() {
        for &cmd in EnvCommand::ALL {
            let expected = !REFUSED.contains(&cmd);

            let mut plain = Bridge::default();
            let mut payload = zeroed();
            assert_eq!(run(&mut plain, cmd.id(), &mut payload), expected, "{}", cmd.name());

            let mut private = Bridge::default();
            let mut payload = zeroed();
            let result = run(&mut private, cmd.id() | ENVIRONMENT_PRIVATE, &mut payload);
            assert_eq!(result, expected, "{} | PRIVATE", cmd.name());
        }
    }

    #[test]
    fn unknown_command_is_refused_and_payload_untouched() {
        let mut bridge = Bridge::default();
        let mut payload = zeroed();
        payload[0] = 0xdead_beef;
        assert!(!run(&mut bridge, 9999, &mut payload));
        assert_eq!(payload[0], 0xdead_beef);
    }

    #[test]
    fn null_payload_is_refused_where_required() {
        let mut bridge = Bridge::default();
        let null = core::ptr::null_mut();
        unsafe {
            assert!(!dispatch(&mut bridge, EnvCommand::GetOverscan.id(), null));
            assert!(!dispatch(&mut bridge, EnvCommand::SetPixelFormat.id(), null));
            assert!(!dispatch(&mut bridge, EnvCommand::GetVariable.id(), null));
            assert!(!dispatch(&mut bridge, EnvCommand::GetSystemDirectory.id(), null));
            assert!(dispatch(&mut bridge, EnvCommand::Shutdown.id(), null));
            assert!(dispatch(&mut bridge, EnvCommand::GetInputBitmasks.id(), null));
            assert!(dispatch(&mut bridge, EnvCommand::SetFastforwardingOverride.id(), null));
        }
        assert!(bridge.env.shutdown_requested());
    }

    #[test]
    fn pixel_format_is_stored_once_in_the_frame_bridge() {
        let mut bridge = Bridge::default();
        let mut format: c_int = PixelFormat::Rgb565 as c_int;
        let ok = unsafe {
            dispatch(
                &mut bridge,
                EnvCommand::SetPixelFormat.id(),
                (&mut format as *mut c_int).cast(),
            )
        };
        assert!(ok);
        assert_eq!(bridge.video.pixel_format(), PixelFormat::Rgb565);

        let mut bad: c_int = 9;
        let ok = unsafe {
            dispatch(&mut bridge, EnvCommand::SetPixelFormat.id(), (&mut bad as *mut c_int).cast())
        };
        assert!(!ok);
        assert_eq!(bridge.video.pixel_format(), PixelFormat::Rgb565);
    }

    #[test]
    fn variables_round_trip_through_get_variable() {
        let mut bridge = Bridge::default();
        let vars = [
            Variable {
                key: c"fake_speed".as_ptr(),
                value: c"Speed; normal|fast".as_ptr(),
            },
            Variable {
                key: core::ptr::null(),
                value: core::ptr::null(),
            },
        ];
        assert!(unsafe {
            dispatch(&mut bridge, EnvCommand::SetVariables.id(), vars.as_ptr() as *mut c_void)
        });

        let mut query = Variable {
            key: c"fake_speed".as_ptr(),
            value: core::ptr::null(),
        };
        let p = (&mut query as *mut Variable).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::GetVariable.id(), p) });
        assert_eq!(unsafe { ptr::c_str(query.value) }.as_deref(), Some("normal"));

        let mut missing = Variable {
            key: c"not_declared".as_ptr(),
            value: c"stale".as_ptr(),
        };
        let p = (&mut missing as *mut Variable).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::GetVariable.id(), p) });
        assert!(missing.value.is_null());
    }

    #[test]
    fn variable_update_flag_is_consumed() {
        let mut bridge = Bridge::default();
        bridge.env.options_mut().declare(vec![
            crate::options::CoreOption::parse_legacy("k", "K; a|b").unwrap(),
        ]);
        let mut flag = false;
        let p = (&mut flag as *mut bool).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::GetVariableUpdate.id(), p) });
        assert!(flag);
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::GetVariableUpdate.id(), p) });
        assert!(!flag);

        bridge.env.options_mut().set("k", "b");
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::GetVariableUpdate.id(), p) });
        assert!(flag);
    }

    #[test]
    fn serialization_quirks_are_recorded_and_answered() {
        let mut bridge = Bridge::default();
        let mut q = quirks::SINGLE_SESSION | quirks::MUST_INITIALIZE;
        let p = (&mut q as *mut u64).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::SetSerializationQuirks.id(), p) });
        assert_eq!(bridge.env.quirks(), quirks::SINGLE_SESSION | quirks::MUST_INITIALIZE);
        assert_ne!(q & quirks::FRONT_VARIABLE_SIZE, 0);
    }

    #[test]
    fn geometry_updates_av_info() {
        let mut bridge = Bridge::default();
        let mut av = SystemAvInfo::default();
        av.geometry.base_width = 256;
        av.timing.sample_rate = 32_000.0;
        let p = (&mut av as *mut SystemAvInfo).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::SetSystemAvInfo.id(), p) });
        assert_eq!(bridge.audio.sample_rate(), 32_000.0);

        let mut geometry = GameGeometry {
            base_width: 320,
            base_height: 240,
            max_width: 320,
            max_height: 240,
            aspect_ratio: 4.0 / 3.0,
        };
        let p = (&mut geometry as *mut GameGeometry).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::SetGeometry.id(), p) });
        let stored = bridge.env.av_info().unwrap();
        assert_eq!(stored.geometry, geometry);
        assert_eq!(stored.timing.sample_rate, 32_000.0);
    }

    #[test]
    fn vfs_version_is_negotiated() {
        let mut bridge = Bridge::default();
        let mut info = VfsInterfaceInfo {
            required_interface_version: 4,
            iface: core::ptr::null(),
        };
        let p = (&mut info as *mut VfsInterfaceInfo).cast();
        assert!(!unsafe { dispatch(&mut bridge, EnvCommand::GetVfsInterface.id(), p) });
        assert!(info.iface.is_null());

        info.required_interface_version = 2;
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::GetVfsInterface.id(), p) });
        assert_eq!(info.required_interface_version, vfs::INTERFACE_VERSION);
        assert!(!info.iface.is_null());
    }

    #[test]
    fn audio_video_enable_reflects_bridges() {
        let mut bridge = Bridge::default();
        bridge.audio.set_enabled(false);
        let mut mask: c_int = 0;
        let p = (&mut mask as *mut c_int).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::GetAudioVideoEnable.id(), p) });
        assert_eq!(mask, av_enable::VIDEO);
    }

    #[test]
    fn message_ext_is_queued_with_its_metadata() {
        let mut bridge = Bridge::default();
        let mut msg = MessageExt {
            msg: c"Loading".as_ptr(),
            duration: 1500,
            priority: 3,
            level: LogLevel::Warn as i32,
            target: MessageTarget::Osd as i32,
            type_: MessageType::Progress as i32,
            progress: 42,
        };
        let p = (&mut msg as *mut MessageExt).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::SetMessageExt.id(), p) });
        let queued = bridge.env.drain_messages();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].text, "Loading");
        assert_eq!(queued[0].duration, MessageDuration::Millis(1500));
        assert_eq!(queued[0].level, LogLevel::Warn);
        assert_eq!(queued[0].kind, MessageType::Progress);
        assert_eq!(queued[0].progress, Some(42));
    }

    #[test]
    fn input_descriptors_and_controllers_are_copied() {
        let mut bridge = Bridge::default();
        let descriptors = [
            InputDescriptor {
                port: 0,
                device: 1,
                index: 0,
                id: 8,
                description: c"Jump".as_ptr(),
            },
            InputDescriptor {
                port: 0,
                device: 0,
                index: 0,
                id: 0,
                description: core::ptr::null(),
            },
        ];
        let p = descriptors.as_ptr() as *mut c_void;
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::SetInputDescriptors.id(), p) });
        assert_eq!(bridge.input.descriptors().len(), 1);
        assert_eq!(bridge.input.descriptors()[0].description, "Jump");

        let pad = [crate::abi::ControllerDescription {
            desc: c"Pad".as_ptr(),
            id: 1,
        }];
        let ports = [
            ControllerInfo {
                types: pad.as_ptr(),
                num_types: 1,
            },
            ControllerInfo {
                types: core::ptr::null(),
                num_types: 0,
            },
        ];
        let p = ports.as_ptr() as *mut c_void;
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::SetControllerInfo.id(), p) });
        assert_eq!(bridge.input.controllers()[0][0].description, "Pad");
    }

    #[test]
    fn content_overrides_are_parsed() {
        let mut bridge = Bridge::default();
        let overrides = [
            SystemContentInfoOverride {
                extensions: c"cue|CHD".as_ptr(),
                need_fullpath: true,
                persistent_data: false,
            },
            SystemContentInfoOverride {
                extensions: core::ptr::null(),
                need_fullpath: false,
                persistent_data: false,
            },
        ];
        let p = overrides.as_ptr() as *mut c_void;
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::SetContentInfoOverride.id(), p) });
        assert_eq!(bridge.env.content_overrides()[0].extensions, vec!["cue", "chd"]);
    }

    struct FakeContext;

    impl HwContext for FakeContext {
        fn supports(&self, kind: HwContextType, _major: u32, _minor: u32) -> bool {
            kind == HwContextType::OpenGlCore
        }
        fn preferred(&self) -> HwContextType {
            HwContextType::OpenGlCore
        }
        fn read_pixels(&mut self, _w: u32, _h: u32, _out: &mut [u8]) -> bool {
            true
        }
        fn swap_buffers(&mut self) {}
        fn current_framebuffer(&self) -> usize {
            7
        }
        fn proc_address(&self, _symbol: &CStr) -> ProcAddress {
            None
        }
    }

    #[test]
    fn hw_render_is_accepted_with_a_context_and_gets_host_hooks() {
        let mut bridge = Bridge::default();
        bridge.video.set_context(Some(Box::new(FakeContext)));
        let mut cb: HwRenderCallback = unsafe { core::mem::zeroed() };
        cb.context_type = HwContextType::OpenGlCore as i32;
        cb.version_major = 3;
        let p = (&mut cb as *mut HwRenderCallback).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::SetHwRender.id(), p) });
        assert!(cb.get_current_framebuffer.is_some());
        assert!(cb.get_proc_address.is_some());
        assert!(bridge.video.hw_accelerated());

        let mut preferred: c_uint = 0;
        let p = (&mut preferred as *mut c_uint).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::GetPreferredHwRender.id(), p) });
        assert_eq!(preferred, HwContextType::OpenGlCore as c_uint);
        assert!(unsafe {
            dispatch(&mut bridge, EnvCommand::SetHwSharedContext.id(), core::ptr::null_mut())
        });
    }

    #[test]
    fn log_interface_accepts_messages() {
        let mut bridge = Bridge::default();
        let mut cb = LogCallback { log: None };
        let p = (&mut cb as *mut LogCallback).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::GetLogInterface.id(), p) });
        let log = cb.log.unwrap();
        unsafe { log(LogLevel::Info as c_int, c"hello from the core\n".as_ptr()) };
    }

    #[test]
    fn option_display_hides_a_declared_option() {
        let mut bridge = Bridge::default();
        let mut vars = [
            Variable {
                key: c"fake_region".as_ptr(),
                value: c"Region; auto|ntsc|pal".as_ptr(),
            },
            Variable {
                key: core::ptr::null(),
                value: core::ptr::null(),
            },
        ];
        let p = vars.as_mut_ptr().cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::SetVariables.id(), p) });

        let mut display = CoreOptionDisplay {
            key: c"fake_region".as_ptr(),
            visible: false,
        };
        let p = (&mut display as *mut CoreOptionDisplay).cast();
        assert!(unsafe { dispatch(&mut bridge, EnvCommand::SetCoreOptionsDisplay.id(), p) });
        let options = bridge.env.options.options();
        let region = options.iter().find(|o| o.key == "fake_region").unwrap();
        assert!(!region.visible);
    }
}
