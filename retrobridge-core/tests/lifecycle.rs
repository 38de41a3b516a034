mod common;

use std::collections::BTreeMap;

use retrobridge_core::abi::{device, quirks, MemoryKind, Region};
use retrobridge_core::config::PathsConfig;
use retrobridge_core::{CoreModule, Host, HostConfig, HostError, SaveState, StateError};

fn host() -> Host {
    host_with(&HostConfig::default())
}

fn host_with(config: &HostConfig) -> Host {
    let core = CoreModule::from_api(common::api()).unwrap();
    Host::new(core, config)
}

#[test]
fn init_and_deinit_bracket_the_session() {
    {
        let host = host();
        assert_eq!(common::record().inits, 1);
        assert_eq!(host.info().library_name, "fake");
        assert_eq!(host.info().valid_extensions, vec!["bin", "rom"]);
        assert!(host.bridge().env.support_no_game());
    }
    let record = common::record();
    assert_eq!(record.deinits, 1);
    assert!(!record.loaded);
}

#[test]
fn dropping_a_loaded_session_unloads_first() {
    {
        let mut host = host();
        host.load_game(None).unwrap();
        assert!(common::record().loaded);
    }
    let record = common::record();
    assert!(!record.loaded);
    assert_eq!(record.deinits, 1);
}

#[test]
fn content_is_served_with_extended_info() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.BIN");
    std::fs::write(&path, [1u8, 2, 3]).unwrap();

    let mut host = host();
    host.load_game(Some(&path)).unwrap();
    let record = common::record();
    assert_eq!(record.content_len, 3);
    assert_eq!(record.content_ext.as_deref(), Some("bin"));
    assert!(record.persistent_data);
    assert_eq!(record.content_path.as_deref(), path.to_str());

    let av = host.av_info().unwrap();
    assert_eq!(av.geometry.base_width, common::WIDTH);
    assert_eq!(av.timing.sample_rate, common::SAMPLE_RATE);

    assert!(matches!(host.load_game(Some(&path)), Err(HostError::GameAlreadyLoaded)));
    host.unload_game().unwrap();
    assert!(host.av_info().is_none());
    assert!(matches!(host.unload_game(), Err(HostError::NoGame)));
}

#[test]
fn rejected_content_leaves_no_game() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.bin");
    std::fs::write(&empty, []).unwrap();

    let mut host = host();
    assert!(matches!(host.load_game(Some(&empty)), Err(HostError::ContentRejected)));
    assert!(!host.game_loaded());
    assert!(matches!(host.run(), Err(HostError::NoGame)));

    let missing = dir.path().join("missing.bin");
    assert!(matches!(host.load_game(Some(&missing)), Err(HostError::ContentIo { .. })));
    host.load_game(None).unwrap();
    host.run().unwrap();
}

#[test]
fn undeclared_subsystem_with_paths_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.bin");
    std::fs::write(&path, [9u8]).unwrap();
    let mut host = host();
    let err = host.load_game_special(7, &[path]).unwrap_err();
    assert!(matches!(err, HostError::ContentRejected));
}

#[test]
fn directories_are_created_from_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let config = HostConfig {
        paths: PathsConfig {
            system_dir: Some(dir.path().join("system")),
            save_dir: Some(dir.path().join("saves")),
            core_assets_dir: None,
        },
        ..HostConfig::default()
    };
    let _host = host_with(&config);
    assert!(dir.path().join("system").is_dir());
    assert!(dir.path().join("saves").is_dir());
}

#[test]
fn core_options_follow_configuration_and_updates() {
    let config = HostConfig {
        core_options: BTreeMap::from([("fake_speed".to_string(), "3".to_string())]),
        ..HostConfig::default()
    };
    let mut host = host_with(&config);
    host.load_game(None).unwrap();
    host.run().unwrap();
    assert_eq!(common::record().counter, 3);

    assert!(host.set_option("fake_speed", "2"));
    assert!(!host.set_option("fake_speed", "9"));
    host.run().unwrap();
    assert_eq!(common::record().counter, 5);
}

#[test]
fn controls_reach_the_core() {
    let mut host = host();
    host.load_game(None).unwrap();

    host.set_controller_port_device(1, device::ANALOG);
    assert_eq!(common::record().port_devices, vec![(1, device::ANALOG)]);
    assert_eq!(host.bridge().input.port_device(1), Some(device::ANALOG));

    host.cheat_set(0, true, "ABCD-1234");
    assert_eq!(common::record().cheats, vec![(0, true, "ABCD-1234".to_string())]);
    host.cheat_reset();
    assert!(common::record().cheats.is_empty());

    assert!(host.key_event(true, 97, 'a' as u32, 0));
    assert_eq!(common::record().keys, vec![(true, 97)]);

    assert_eq!(host.region(), Some(Region::Pal));

    host.run().unwrap();
    host.reset();
    let record = common::record();
    assert_eq!((record.resets, record.counter), (1, 0));
}

#[test]
fn save_ram_is_exposed_in_place() {
    let mut host = host();
    host.load_game(None).unwrap();
    assert!(host.memory(MemoryKind::Rtc).is_none());
    host.memory_mut(MemoryKind::SaveRam).unwrap()[3] = 0xab;
    let sram = host.memory(MemoryKind::SaveRam).unwrap();
    assert_eq!(sram.len(), common::SRAM_SIZE);
    assert_eq!(sram[3], 0xab);
}

#[test]
fn frame_time_starts_from_the_reference() {
    let mut host = host();
    host.load_game(None).unwrap();
    host.run().unwrap();
    host.set_fastforwarding(true);
    host.run().unwrap();
    assert_eq!(
        common::record().frame_times,
        vec![common::FRAME_TIME_REFERENCE, common::FRAME_TIME_REFERENCE]
    );
    host.set_fastforwarding(false);
    host.run().unwrap();
    assert_eq!(common::record().frame_times.len(), 3);
    assert_eq!(host.frame_count(), 3);
}

#[test]
fn messages_are_queued_for_the_host() {
    common::message_at(2);
    let mut host = host();
    host.load_game(None).unwrap();
    host.run().unwrap();
    assert!(host.drain_messages().is_empty());
    host.run().unwrap();
    let messages = host.drain_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "halfway there");
}

#[test]
fn disk_control_is_missing_unless_registered() {
    let mut host = host();
    assert!(matches!(host.disk_image_count(), Err(HostError::MissingInterface(_))));
    assert!(matches!(host.set_disk_ejected(true), Err(HostError::MissingInterface(_))));
    assert!(host.proc_address("fake_symbol").is_none());
}

#[test]
fn state_round_trip_and_quirk_checks() {
    common::declare_quirks(quirks::MUST_INITIALIZE | quirks::SINGLE_SESSION);
    let mut host = host();
    assert!(matches!(host.save_state(), Err(HostError::NoGame)));
    host.load_game(None).unwrap();
    assert!(matches!(
        host.save_state(),
        Err(HostError::State(StateError::NotInitialized))
    ));

    host.run().unwrap();
    let saved = host.save_state().unwrap();
    assert_eq!(saved.len(), common::STATE_SIZE);
    assert_eq!(saved.session, Some(host.session_id()));

    host.run().unwrap();
    host.load_state(&saved).unwrap();
    assert_eq!(common::record().counter, 1);

    let foreign = SaveState {
        session: Some(host.session_id() + 1),
        ..saved.clone()
    };
    assert!(matches!(
        host.load_state(&foreign),
        Err(HostError::State(StateError::ForeignSession))
    ));

    let short = SaveState::from_bytes(vec![0; 3]);
    assert!(matches!(
        host.load_state(&short),
        Err(HostError::State(StateError::SizeMismatch { expected: 8, actual: 3 }))
    ));

    // Provenance is unknown once the blob went through a file.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slot.state");
    saved.write(&path).unwrap();
    host.load_state(&SaveState::read(&path).unwrap()).unwrap();
}

#[test]
fn platform_dependent_states_check_their_origin() {
    common::declare_quirks(quirks::PLATFORM_DEPENDENT);
    let mut host = host();
    host.load_game(None).unwrap();
    host.run().unwrap();
    let saved = host.save_state().unwrap();
    let moved = SaveState {
        platform: Some("sparc-solaris-be".to_string()),
        ..saved.clone()
    };
    assert!(matches!(
        host.load_state(&moved),
        Err(HostError::State(StateError::PlatformMismatch { .. }))
    ));
    host.load_state(&saved).unwrap();
}

#[test]
fn states_become_ready_after_the_first_frame() {
    common::declare_quirks(quirks::MUST_INITIALIZE);
    let mut host = host();
    assert!(!host.states_ready());
    host.load_game(None).unwrap();
    assert!(!host.states_ready());
    host.run().unwrap();
    assert!(host.states_ready());
    let saved = host.save_state().unwrap();
    host.load_state(&saved).unwrap();
}

#[test]
fn states_are_ready_at_once_without_quirks() {
    let mut host = host();
    host.load_game(None).unwrap();
    assert!(host.states_ready());
}
