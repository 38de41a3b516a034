//! Latest-wins frame hand-off to a presentation thread.
//!
//! The emulation thread converts each frame into a recycled RGBA buffer and posts it. If
//! the presenter has not picked up the previous frame, that frame is replaced and counted
//! as dropped. Buffers travel back through [`FrameReceiver::recycle`], so after warm-up no
//! frame allocates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use super::{convert, FrameSink, FrameView};
use crate::abi::GameGeometry;

/// A converted frame, top-down RGBA8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    /// Monotonic frame number assigned by the sender.
    pub sequence: u64,
    /// Clockwise quarter turns requested by the core.
    pub rotation: u32,
}

#[derive(Default)]
struct Slot {
    pending: Option<Frame>,
    spare: Vec<Vec<u8>>,
    geometry: Option<GameGeometry>,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    posted: AtomicU64,
    dropped: AtomicU64,
}

/// Emulation-side half; implements [`FrameSink`].
pub struct MailboxSender {
    shared: Arc<Shared>,
    sequence: u64,
    rotation: u32,
}

/// Presentation-side half.
#[derive(Clone)]
pub struct FrameReceiver {
    shared: Arc<Shared>,
}

/// Create a connected sender / receiver pair.
pub fn frame_mailbox() -> (MailboxSender, FrameReceiver) {
    let shared = Arc::new(Shared::default());
    (
        MailboxSender {
            shared: shared.clone(),
            sequence: 0,
            rotation: 0,
        },
        FrameReceiver { shared },
    )
}

const MAX_SPARE: usize = 3;

fn lock(shared: &Shared) -> std::sync::MutexGuard<'_, Slot> {
    shared.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FrameSink for MailboxSender {
    fn present(&mut self, frame: &FrameView<'_>) {
        let mut rgba = lock(&self.shared).spare.pop().unwrap_or_default();
        // Conversion runs outside the lock.
        convert::to_rgba(frame, &mut rgba);

        self.sequence += 1;
        let next = Frame {
            width: frame.width,
            height: frame.height,
            rgba,
            sequence: self.sequence,
            rotation: self.rotation,
        };

        let mut slot = lock(&self.shared);
        if let Some(old) = slot.pending.replace(next) {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(sequence = old.sequence, "frame replaced before presentation");
            if slot.spare.len() < MAX_SPARE {
                slot.spare.push(old.rgba);
            }
        }
        self.shared.posted.fetch_add(1, Ordering::Relaxed);
    }

    fn geometry_changed(&mut self, geometry: &GameGeometry) {
        lock(&self.shared).geometry = Some(*geometry);
    }

    fn rotation_changed(&mut self, quarter_turns: u32) {
        self.rotation = quarter_turns;
    }
}

impl FrameReceiver {
    /// Take the newest frame, if one arrived since the last call.
    pub fn take(&self) -> Option<Frame> {
        lock(&self.shared).pending.take()
    }

    /// Hand a presented frame's buffer back for reuse.
    pub fn recycle(&self, frame: Frame) {
        let mut slot = lock(&self.shared);
        if slot.spare.len() < MAX_SPARE {
            slot.spare.push(frame.rgba);
        }
    }

    /// Latest geometry announced by the core.
    pub fn geometry(&self) -> Option<GameGeometry> {
        lock(&self.shared).geometry
    }

    pub fn posted(&self) -> u64 {
        self.shared.posted.load(Ordering::Relaxed)
    }

    /// Frames replaced before the presenter took them.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::PixelFormat;

    fn solid(value: u8) -> Vec<u8> {
        vec![value; 4 * 4]
    }

    fn post(sender: &mut MailboxSender, data: &[u8]) {
        sender.present(&FrameView {
            data,
            width: 2,
            height: 2,
            pitch: 8,
            format: PixelFormat::Xrgb8888,
            flipped: false,
        });
    }

    #[test]
    fn newest_frame_wins() {
        let (mut tx, rx) = frame_mailbox();
        post(&mut tx, &solid(0x10));
        post(&mut tx, &solid(0x20));

        let frame = rx.take().unwrap();
        assert_eq!(frame.sequence, 2);
        assert_eq!(frame.rgba[0], 0x20);
        assert_eq!(rx.dropped(), 1);
        assert_eq!(rx.posted(), 2);
        assert!(rx.take().is_none());
    }

    #[test]
    fn recycled_buffers_are_reused() {
        let (mut tx, rx) = frame_mailbox();
        post(&mut tx, &solid(1));
        let frame = rx.take().unwrap();
        let ptr = frame.rgba.as_ptr();
        rx.recycle(frame);

        post(&mut tx, &solid(2));
        assert_eq!(rx.take().unwrap().rgba.as_ptr(), ptr);
    }

    #[test]
    fn receiver_works_across_threads() {
        let (mut tx, rx) = frame_mailbox();
        let presenter = std::thread::spawn(move || {
            loop {
                if let Some(frame) = rx.take() {
                    return frame.width;
                }
                std::thread::yield_now();
            }
        });
        post(&mut tx, &solid(3));
        assert_eq!(presenter.join().unwrap(), 2);
    }
}
