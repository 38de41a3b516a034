//! Input provider.
//!
//! Responsibilities:
//! - Capture controller state into an [`InputSnapshot`] when the core calls
//!   `retro_input_poll_t`.
//! - Answer every `retro_input_state_t` query from the snapshot taken by the most recent
//!   poll, so all reads between two polls agree.
//! - Map libretro devices (joypad, analog, mouse, keyboard, lightgun, pointer) onto the
//!   snapshot layout.
//! - Remember what the core declared about its controls (input descriptors, controller
//!   types, port devices) and forward rumble requests to the [`InputSource`].
//!
//! The snapshot is a fixed-size value; polling copies into it without allocating.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::abi::{analog, device, keys, lightgun, mouse, pointer, JoypadButton, RumbleEffect};
use crate::abi::DEVICE_ID_JOYPAD_MASK;

/// Ports tracked by the snapshot.
pub const MAX_PORTS: usize = 16;
/// Simultaneous touches tracked for the pointer device.
pub const MAX_TOUCHES: usize = 4;

const KEY_WORDS: usize = (keys::LAST as usize).div_ceil(64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Touch {
    /// Screen coordinates scaled to `[-0x7fff, 0x7fff]`.
    pub x: i16,
    pub y: i16,
}

/// Per-port controller state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortState {
    /// Joypad buttons, bit `n` is button id `n`.
    pub buttons: u16,
    /// `[left, right]` sticks, each `[x, y]`.
    pub sticks: [[i16; 2]; 2],
    /// Analog button pressure by joypad id; 0 falls back to the digital state.
    pub pressure: [i16; JoypadButton::COUNT],
    /// Relative mouse motion since the previous poll.
    pub mouse_dx: i16,
    pub mouse_dy: i16,
    /// Mouse buttons, bit `n` is mouse id `n`.
    pub mouse_buttons: u16,
    /// Lightgun position scaled to `[-0x7fff, 0x7fff]`.
    pub gun_x: i16,
    pub gun_y: i16,
    pub gun_offscreen: bool,
    /// Lightgun buttons, bit `n` is lightgun id `n`.
    pub gun_buttons: u32,
    pub touches: [Touch; MAX_TOUCHES],
    pub touch_count: u8,
}

/// Controller state captured at one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSnapshot {
    pub ports: [PortState; MAX_PORTS],
    keyboard: [u64; KEY_WORDS],
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self {
            ports: [PortState::default(); MAX_PORTS],
            keyboard: [0; KEY_WORDS],
        }
    }
}

impl InputSnapshot {
    pub fn port(&self, port: u32) -> Option<&PortState> {
        self.ports.get(port as usize)
    }

    pub fn port_mut(&mut self, port: u32) -> Option<&mut PortState> {
        self.ports.get_mut(port as usize)
    }

    pub fn set_button(&mut self, port: u32, button: JoypadButton, pressed: bool) {
        if let Some(p) = self.port_mut(port) {
            if pressed {
                p.buttons |= button.bit();
            } else {
                p.buttons &= !button.bit();
            }
        }
    }

    pub fn button(&self, port: u32, button: JoypadButton) -> bool {
        self.port(port).is_some_and(|p| p.buttons & button.bit() != 0)
    }

    pub fn set_stick(&mut self, port: u32, stick: u32, x: i16, y: i16) {
        if let Some(s) = self.port_mut(port).and_then(|p| p.sticks.get_mut(stick as usize)) {
            *s = [x, y];
        }
    }

    pub fn set_key(&mut self, key: u32, down: bool) {
        if key >= keys::LAST {
            return;
        }
        let (word, bit) = (key as usize / 64, key % 64);
        if down {
            self.keyboard[word] |= 1 << bit;
        } else {
            self.keyboard[word] &= !(1 << bit);
        }
    }

    pub fn key(&self, key: u32) -> bool {
        key < keys::LAST && self.keyboard[key as usize / 64] & (1 << (key % 64)) != 0
    }

    /// Answer a `retro_input_state_t` query.
    pub fn state(&self, port: u32, device: u32, index: u32, id: u32, bitmasks: bool) -> i16 {
        let base = device::base(device);
        if base == device::KEYBOARD {
            return self.key(id) as i16;
        }
        let Some(p) = self.port(port) else {
            return 0;
        };
        match base {
            device::JOYPAD => {
                if id == DEVICE_ID_JOYPAD_MASK {
                    if bitmasks { p.buttons as i16 } else { 0 }
                } else if id < JoypadButton::COUNT as u32 {
                    ((p.buttons >> id) & 1) as i16
                } else {
                    0
                }
            }
            device::ANALOG => analog_state(p, index, id),
            device::MOUSE => mouse_state(p, id),
            device::LIGHTGUN => lightgun_state(p, id),
            device::POINTER => pointer_state(p, index, id),
            _ => 0,
        }
    }
}

fn analog_state(p: &PortState, index: u32, id: u32) -> i16 {
    match index {
        analog::INDEX_LEFT | analog::INDEX_RIGHT => p.sticks[index as usize]
            .get(id as usize)
            .copied()
            .unwrap_or(0),
        analog::INDEX_BUTTON => {
            let Some(&pressure) = p.pressure.get(id as usize) else {
                return 0;
            };
            if pressure != 0 {
                pressure
            } else if (p.buttons >> id) & 1 != 0 {
                i16::MAX
            } else {
                0
            }
        }
        _ => 0,
    }
}

fn mouse_state(p: &PortState, id: u32) -> i16 {
    match id {
        mouse::ID_X => p.mouse_dx,
        mouse::ID_Y => p.mouse_dy,
        id if (id as usize) < mouse::ID_COUNT => ((p.mouse_buttons >> id) & 1) as i16,
        _ => 0,
    }
}

fn lightgun_state(p: &PortState, id: u32) -> i16 {
    match id {
        lightgun::ID_SCREEN_X => p.gun_x,
        lightgun::ID_SCREEN_Y => p.gun_y,
        lightgun::ID_IS_OFFSCREEN => p.gun_offscreen as i16,
        id if (id as usize) < lightgun::ID_COUNT => ((p.gun_buttons >> id) & 1) as i16,
        _ => 0,
    }
}

fn pointer_state(p: &PortState, index: u32, id: u32) -> i16 {
    if id == pointer::ID_COUNT {
        return p.touch_count as i16;
    }
    if index >= p.touch_count as u32 {
        return 0;
    }
    let Some(touch) = p.touches.get(index as usize) else {
        return 0;
    };
    match id {
        pointer::ID_X => touch.x,
        pointer::ID_Y => touch.y,
        pointer::ID_PRESSED => 1,
        _ => 0,
    }
}

/// Host-side source of controller state.
pub trait InputSource {
    /// Overwrite `snapshot` with the current controller state.
    fn poll(&mut self, snapshot: &mut InputSnapshot);

    /// Rumble request from the core. Returns whether it was honored.
    fn set_rumble(&mut self, _port: u32, _effect: RumbleEffect, _strength: u16) -> bool {
        false
    }
}

/// An [`InputSource`] backed by a snapshot shared with another thread (UI, network, script).
#[derive(Debug, Clone, Default)]
pub struct SharedInput {
    state: Arc<Mutex<InputSnapshot>>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the live state. Takes effect at the core's next poll.
    pub fn update<R>(&self, f: impl FnOnce(&mut InputSnapshot) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut state)
    }
}

impl InputSource for SharedInput {
    fn poll(&mut self, snapshot: &mut InputSnapshot) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        snapshot.clone_from(&state);
        // Mouse motion is relative: consumed by the poll.
        for port in state.ports.iter_mut() {
            port.mouse_dx = 0;
            port.mouse_dy = 0;
        }
    }
}

/// A control the core declared with SET_INPUT_DESCRIPTORS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescriptorInfo {
    pub port: u32,
    pub device: u32,
    pub index: u32,
    pub id: u32,
    pub description: String,
}

/// A controller type the core offers for a port (SET_CONTROLLER_INFO).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerType {
    pub description: String,
    pub device: u32,
}

/// Host-side input state.
pub struct InputProvider {
    source: Option<Box<dyn InputSource>>,
    snapshot: InputSnapshot,
    bitmasks: bool,
    polls: u64,
    port_devices: [u32; MAX_PORTS],
    descriptors: Vec<InputDescriptorInfo>,
    controllers: Vec<Vec<ControllerType>>,
}

impl Default for InputProvider {
    fn default() -> Self {
        Self {
            source: None,
            snapshot: InputSnapshot::default(),
            bitmasks: true,
            polls: 0,
            port_devices: [device::JOYPAD; MAX_PORTS],
            descriptors: Vec::new(),
            controllers: Vec::new(),
        }
    }
}

impl InputProvider {
    pub fn set_source(&mut self, source: Option<Box<dyn InputSource>>) {
        self.source = source;
    }

    pub fn set_bitmasks(&mut self, enabled: bool) {
        self.bitmasks = enabled;
    }

    pub fn bitmasks(&self) -> bool {
        self.bitmasks
    }

    /// `retro_input_poll_t`.
    pub fn poll(&mut self) {
        self.polls += 1;
        if let Some(source) = self.source.as_mut() {
            source.poll(&mut self.snapshot);
        }
    }

    /// `retro_input_state_t`.
    pub fn state(&self, port: u32, device: u32, index: u32, id: u32) -> i16 {
        self.snapshot.state(port, device, index, id, self.bitmasks)
    }

    pub fn snapshot(&self) -> &InputSnapshot {
        &self.snapshot
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn set_rumble(&mut self, port: u32, effect: RumbleEffect, strength: u16) -> bool {
        match self.source.as_mut() {
            Some(source) => source.set_rumble(port, effect, strength),
            None => false,
        }
    }

    /// Record the device the host plugged into `port`.
    pub fn set_port_device(&mut self, port: u32, device: u32) {
        if let Some(slot) = self.port_devices.get_mut(port as usize) {
            *slot = device;
        }
    }

    pub fn port_device(&self, port: u32) -> Option<u32> {
        self.port_devices.get(port as usize).copied()
    }

    pub fn set_descriptors(&mut self, descriptors: Vec<InputDescriptorInfo>) {
        debug!(count = descriptors.len(), "input descriptors");
        self.descriptors = descriptors;
    }

    pub fn descriptors(&self) -> &[InputDescriptorInfo] {
        &self.descriptors
    }

    pub fn set_controllers(&mut self, controllers: Vec<Vec<ControllerType>>) {
        self.controllers = controllers;
    }

    /// Controller types offered per port.
    pub fn controllers(&self) -> &[Vec<ControllerType>] {
        &self.controllers
    }

    /// Devices the host can emulate, as a GET_INPUT_DEVICE_CAPABILITIES bitmask.
    pub fn capabilities() -> u64 {
        [
            device::JOYPAD,
            device::MOUSE,
            device::KEYBOARD,
            device::LIGHTGUN,
            device::ANALOG,
            device::POINTER,
        ]
        .iter()
        .fold(0, |mask, d| mask | (1 << d))
    }
}
