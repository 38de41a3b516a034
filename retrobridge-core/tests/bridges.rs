mod common;

use std::cell::RefCell;
use std::rc::Rc;

use retrobridge_core::abi::JoypadButton;
use retrobridge_core::video::{convert, FrameView};
use retrobridge_core::{
    audio_ring, frame_mailbox, CoreModule, FrameSink, Host, HostConfig, SharedInput,
};

fn host() -> Host {
    let core = CoreModule::from_api(common::api()).unwrap();
    Host::new(core, &HostConfig::default())
}

fn loaded_host() -> Host {
    let mut host = host();
    host.load_game(None).unwrap();
    host
}

/// Keeps an RGBA copy of every presented frame.
#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<Vec<u8>>>>);

impl FrameSink for Recorder {
    fn present(&mut self, frame: &FrameView<'_>) {
        let mut rgba = Vec::new();
        convert::to_rgba(frame, &mut rgba);
        self.0.borrow_mut().push(rgba);
    }
}

fn expected_rgba(counter: u32) -> Vec<u8> {
    (0..(common::WIDTH * common::HEIGHT) as usize)
        .flat_map(|i| convert::xrgb8888(common::pixel(counter, i)))
        .collect()
}

#[test]
fn frames_reach_the_mailbox_in_the_selected_format() {
    let mut host = host();
    let (sender, receiver) = frame_mailbox();
    host.set_frame_sink(Some(Box::new(sender)));
    host.load_game(None).unwrap();

    host.run().unwrap();
    host.run().unwrap();

    let frame = receiver.take().unwrap();
    assert_eq!((frame.width, frame.height), (common::WIDTH, common::HEIGHT));
    assert_eq!(frame.rgba, expected_rgba(2));
    assert_eq!(frame.sequence, 2);
    assert_eq!(receiver.posted(), 2);
    assert_eq!(receiver.dropped(), 1);
    assert!(receiver.take().is_none());
    assert_eq!(receiver.geometry().map(|g| g.base_width), Some(common::WIDTH));
    assert_eq!(host.bridge().video.stats().presented, 2);
}

#[test]
fn audio_arrives_in_order_with_the_sample_rate() {
    let mut host = loaded_host();
    let (ring, mut receiver) = audio_ring(1024);
    host.set_audio_sink(Some(Box::new(ring)));
    assert_eq!(receiver.poll_events(), Some(common::SAMPLE_RATE));

    for _ in 0..3 {
        host.run().unwrap();
    }
    let per_run = common::AUDIO_FRAMES * 2;
    assert_eq!(receiver.available(), 3 * per_run);

    let mut out = vec![0i16; 3 * per_run];
    assert_eq!(receiver.pull_i16(&mut out), out.len());
    let expected: Vec<i16> = (1..=3u32)
        .flat_map(|counter| (0..per_run).map(move |i| common::sample(counter, i)))
        .collect();
    assert_eq!(out, expected);
    assert_eq!(receiver.dropped(), 0);
    assert_eq!(host.bridge().audio.stats().frames_in, 3 * common::AUDIO_FRAMES as u64);
}

#[test]
fn the_core_reads_the_snapshot_taken_at_its_poll() {
    let mut host = loaded_host();
    let input = SharedInput::new();
    host.set_input_source(Some(Box::new(input.clone())));

    input.update(|s| s.set_button(0, JoypadButton::B, true));
    host.run().unwrap();
    assert_eq!(common::record().last_button, 1);
    assert_eq!(common::record().counter, 101);

    input.update(|s| s.set_button(0, JoypadButton::B, false));
    // Not visible until the core polls again.
    assert!(host.bridge().input.snapshot().button(0, JoypadButton::B));
    host.run().unwrap();
    assert_eq!(common::record().last_button, 0);
    assert_eq!(host.bridge().input.polls(), 2);
}

#[test]
fn restoring_a_state_reproduces_the_following_frames() {
    let mut host = loaded_host();
    let frames = Recorder::default();
    host.set_frame_sink(Some(Box::new(frames.clone())));
    let (ring, mut audio) = audio_ring(4096);
    host.set_audio_sink(Some(Box::new(ring)));
    let input = SharedInput::new();
    host.set_input_source(Some(Box::new(input.clone())));

    for i in 0..10 {
        input.update(|s| s.set_button(0, JoypadButton::B, i % 3 == 0));
        host.run().unwrap();
    }
    let saved = host.save_state().unwrap();
    frames.0.borrow_mut().clear();
    let mut scratch = vec![0i16; audio.available()];
    audio.pull_i16(&mut scratch);

    let script = [true, false, false, true, true];
    let run_script = |host: &mut Host| {
        for pressed in script {
            input.update(|s| s.set_button(0, JoypadButton::B, pressed));
            host.run().unwrap();
        }
    };

    run_script(&mut host);
    let first_video = std::mem::take(&mut *frames.0.borrow_mut());
    let mut first_audio = vec![0i16; audio.available()];
    audio.pull_i16(&mut first_audio);

    host.load_state(&saved).unwrap();
    run_script(&mut host);
    let second_video = std::mem::take(&mut *frames.0.borrow_mut());
    let mut second_audio = vec![0i16; audio.available()];
    audio.pull_i16(&mut second_audio);

    assert_eq!(first_video.len(), script.len());
    assert_eq!(first_video, second_video);
    assert!(!first_audio.is_empty());
    assert_eq!(first_audio, second_audio);
}

#[test]
fn detached_consumers_are_silent_no_ops() {
    let mut host = loaded_host();
    host.run().unwrap();
    let bridge = host.bridge();
    assert_eq!(bridge.video.stats().presented, 0);
    assert_eq!(bridge.audio.stats().frames_in, 0);
    assert_eq!(bridge.input.polls(), 1);
}
