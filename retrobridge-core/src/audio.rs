//! Audio bridge: sample batches from the core toward an audio consumer.
//!
//! The core pushes interleaved stereo `i16` samples on the emulation thread, either one
//! frame at a time or in batches. [`AudioBridge`] forwards them to an [`AudioSink`]. The
//! bundled sink, [`RingSink`], writes into a bounded SPSC ring (`ringbuf`) drained by an
//! [`AudioReceiver`] on the device thread at its own cadence:
//! - a push that does not fit keeps what fits and drops the excess (counted);
//! - a pull that finds too little pads with silence (counted as an underrun);
//! - nothing is duplicated.
//!
//! Sample-rate changes travel to the receiver through a channel so the device can be
//! reconfigured on its own thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, trace};

/// Audio consumer.
pub trait AudioSink {
    /// Accept interleaved stereo samples. Returns how many samples were kept.
    fn push(&mut self, samples: &[i16]) -> usize;

    /// The core announced a new sample rate.
    fn configure(&mut self, _sample_rate: f64) {}

    /// Buffer fill level in percent, if the sink can tell.
    fn occupancy(&self) -> Option<u32> {
        None
    }
}

/// Counters kept by [`AudioBridge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStats {
    /// Stereo frames received from the core.
    pub frames_in: u64,
    /// Samples the sink did not keep.
    pub samples_dropped: u64,
}

/// Host-side audio state.
pub struct AudioBridge {
    enabled: bool,
    sample_rate: f64,
    sink: Option<Box<dyn AudioSink>>,
    stats: AudioStats,
}

impl Default for AudioBridge {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: 0.0,
            sink: None,
            stats: AudioStats::default(),
        }
    }
}

impl AudioBridge {
    pub fn set_sink(&mut self, sink: Option<Box<dyn AudioSink>>) {
        self.sink = sink;
        if self.sample_rate > 0.0 {
            let rate = self.sample_rate;
            if let Some(sink) = self.sink.as_mut() {
                sink.configure(rate);
            }
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Forward a (new) sample rate to the sink. Repeats of the current rate are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        if sample_rate == self.sample_rate || sample_rate <= 0.0 {
            return;
        }
        debug!(sample_rate, "audio sample rate");
        self.sample_rate = sample_rate;
        if let Some(sink) = self.sink.as_mut() {
            sink.configure(sample_rate);
        }
    }

    pub fn stats(&self) -> AudioStats {
        self.stats
    }

    /// Fill level for the audio buffer status callback.
    pub fn occupancy(&self) -> Option<u32> {
        self.sink.as_ref().and_then(|s| s.occupancy())
    }

    /// `retro_audio_sample_t`.
    pub fn on_sample(&mut self, left: i16, right: i16) {
        self.forward(&[left, right]);
    }

    /// `retro_audio_sample_batch_t`. Always reports every frame as consumed.
    ///
    /// # Safety
    /// `data` must be null or valid for `frames * 2` samples.
    pub unsafe fn on_batch(&mut self, data: *const i16, frames: usize) -> usize {
        let samples = unsafe { crate::abi::ptr::slice(data, frames * 2) };
        self.forward(samples);
        frames
    }

    fn forward(&mut self, samples: &[i16]) {
        if !self.enabled || samples.is_empty() {
            return;
        }
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        self.stats.frames_in += (samples.len() / 2) as u64;
        let kept = sink.push(samples);
        self.stats.samples_dropped += (samples.len() - kept.min(samples.len())) as u64;
    }
}

/// Messages from the emulation thread to the audio device thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioEvent {
    SampleRate(f64),
}

#[derive(Default)]
struct RingCounters {
    dropped: AtomicU64,
    underruns: AtomicU64,
}

/// Producer half of the audio ring; implements [`AudioSink`].
pub struct RingSink {
    producer: HeapProd<i16>,
    events: Sender<AudioEvent>,
    counters: Arc<RingCounters>,
}

/// Consumer half of the audio ring, owned by the audio device thread.
pub struct AudioReceiver {
    consumer: HeapCons<i16>,
    events: Receiver<AudioEvent>,
    counters: Arc<RingCounters>,
    sample_rate: Option<f64>,
    scratch: Vec<i16>,
}

/// Create a ring holding `capacity_frames` stereo frames.
pub fn audio_ring(capacity_frames: usize) -> (RingSink, AudioReceiver) {
    let ring = HeapRb::<i16>::new(capacity_frames.max(1) * 2);
    let (producer, consumer) = ring.split();
    let (tx, rx) = mpsc::channel();
    let counters = Arc::new(RingCounters::default());
    (
        RingSink {
            producer,
            events: tx,
            counters: counters.clone(),
        },
        AudioReceiver {
            consumer,
            events: rx,
            counters,
            sample_rate: None,
            scratch: Vec::new(),
        },
    )
}

impl AudioSink for RingSink {
    fn push(&mut self, samples: &[i16]) -> usize {
        // Whole frames only, so channels never swap.
        let room = self.producer.vacant_len() & !1;
        let take = samples.len().min(room) & !1;
        let pushed = self.producer.push_slice(&samples[..take]);
        let dropped = samples.len() - pushed;
        if dropped > 0 {
            self.counters.dropped.fetch_add(dropped as u64, Ordering::Relaxed);
            trace!(dropped, "audio ring full");
        }
        pushed
    }

    fn configure(&mut self, sample_rate: f64) {
        // A closed receiver only means nobody is listening any more.
        let _ = self.events.send(AudioEvent::SampleRate(sample_rate));
    }

    fn occupancy(&self) -> Option<u32> {
        let capacity = self.producer.capacity().get();
        Some((self.producer.occupied_len() * 100 / capacity) as u32)
    }
}

impl AudioReceiver {
    /// Drain pending events, returning the newest sample rate if it changed.
    pub fn poll_events(&mut self) -> Option<f64> {
        let mut changed = None;
        loop {
            match self.events.try_recv() {
                Ok(AudioEvent::SampleRate(rate)) => {
                    self.sample_rate = Some(rate);
                    changed = Some(rate);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    /// Last sample rate seen by [`Self::poll_events`].
    pub fn sample_rate(&self) -> Option<f64> {
        self.sample_rate
    }

    /// Samples currently buffered.
    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Fill `out` with buffered samples, padding with silence. Returns the real count.
    pub fn pull_i16(&mut self, out: &mut [i16]) -> usize {
        let popped = self.consumer.pop_slice(out);
        if popped < out.len() {
            out[popped..].fill(0);
            self.counters.underruns.fetch_add(1, Ordering::Relaxed);
        }
        popped
    }

    /// Like [`Self::pull_i16`], converted to `[-1.0, 1.0)`.
    pub fn pull_f32(&mut self, out: &mut [f32]) -> usize {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.resize(out.len(), 0);
        let popped = self.pull_i16(&mut scratch);
        for (o, s) in out.iter_mut().zip(&scratch) {
            *o = *s as f32 / 32768.0;
        }
        self.scratch = scratch;
        popped
    }

    /// Samples dropped by the producer because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    /// Pulls that had to be padded with silence.
    pub fn underruns(&self) -> u64 {
        self.counters.underruns.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_arrive_in_order_without_loss_or_duplication() {
        let (sink, mut rx) = audio_ring(1024);
        let mut bridge = AudioBridge::default();
        bridge.set_sink(Some(Box::new(sink)));

        let batch: Vec<i16> = (0..200).collect();
        unsafe {
            assert_eq!(bridge.on_batch(batch.as_ptr(), 100), 100);
        }
        bridge.on_sample(200, 201);

        let mut out = vec![0i16; 150];
        assert_eq!(rx.pull_i16(&mut out), 150);
        let mut rest = vec![0i16; 52];
        assert_eq!(rx.pull_i16(&mut rest), 52);

        let all: Vec<i16> = out.into_iter().chain(rest).collect();
        assert_eq!(all, (0..202).collect::<Vec<i16>>());
        assert_eq!(rx.dropped(), 0);
        assert_eq!(bridge.stats().frames_in, 101);
    }

    #[test]
    fn producer_and_consumer_threads_at_different_rates() {
        use std::sync::atomic::AtomicUsize;

        const TOTAL: usize = 200_000;
        const BATCH_FRAMES: usize = 1601;
        const PULL: usize = 333;
        const CAPACITY_FRAMES: usize = 4096;

        let (sink, mut rx) = audio_ring(CAPACITY_FRAMES);
        let mut bridge = AudioBridge::default();
        bridge.set_sink(Some(Box::new(sink)));
        let consumed = Arc::new(AtomicUsize::new(0));

        let reader = {
            let consumed = consumed.clone();
            std::thread::spawn(move || {
                let mut out = Vec::with_capacity(TOTAL);
                let mut chunk = [0i16; PULL];
                while out.len() < TOTAL {
                    let want = PULL.min(TOTAL - out.len());
                    let got = rx.pull_i16(&mut chunk[..want]);
                    if got == 0 {
                        std::thread::yield_now();
                        continue;
                    }
                    out.extend_from_slice(&chunk[..got]);
                    consumed.fetch_add(got, Ordering::Release);
                }
                (out, rx.dropped())
            })
        };

        let input: Vec<i16> = (0..TOTAL).map(|i| i as u16 as i16).collect();
        let mut sent = 0;
        for batch in input.chunks(BATCH_FRAMES * 2) {
            // Hold off while the batch would not fit.
            while sent + batch.len() - consumed.load(Ordering::Acquire) > CAPACITY_FRAMES * 2 {
                std::thread::yield_now();
            }
            unsafe { bridge.on_batch(batch.as_ptr(), batch.len() / 2) };
            sent += batch.len();
        }

        let (output, dropped) = reader.join().unwrap();
        assert_eq!(dropped, 0);
        assert_eq!(bridge.stats().samples_dropped, 0);
        assert_eq!(bridge.stats().frames_in, (TOTAL / 2) as u64);
        assert_eq!(output.len(), input.len());
        assert!(output == input);
    }

    #[test]
    fn overflow_drops_excess_whole_frames() {
        let (mut sink, mut rx) = audio_ring(4);
        assert_eq!(sink.push(&[1, 2, 3, 4, 5, 6]), 6);
        assert_eq!(sink.push(&[7, 8, 9, 10]), 2);
        assert_eq!(rx.dropped(), 2);

        let mut out = [0i16; 8];
        assert_eq!(rx.pull_i16(&mut out), 8);
        assert_eq!(out, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn underrun_pads_with_silence() {
        let (mut sink, mut rx) = audio_ring(16);
        sink.push(&[5, -5]);
        let mut out = [9i16; 6];
        assert_eq!(rx.pull_i16(&mut out), 2);
        assert_eq!(out, [5, -5, 0, 0, 0, 0]);
        assert_eq!(rx.underruns(), 1);
    }

    #[test]
    fn f32_pull_scales_samples() {
        let (mut sink, mut rx) = audio_ring(16);
        sink.push(&[i16::MIN, 16384]);
        let mut out = [1.0f32; 2];
        rx.pull_f32(&mut out);
        assert_eq!(out, [-1.0, 0.5]);
    }

    #[test]
    fn sample_rate_is_marshalled_to_receiver() {
        let (sink, mut rx) = audio_ring(16);
        let mut bridge = AudioBridge::default();
        bridge.set_sink(Some(Box::new(sink)));
        bridge.set_sample_rate(44_100.0);
        bridge.set_sample_rate(44_100.0);
        bridge.set_sample_rate(48_000.0);

        let handle = std::thread::spawn(move || {
            let rate = rx.poll_events();
            (rate, rx.sample_rate())
        });
        assert_eq!(handle.join().unwrap(), (Some(48_000.0), Some(48_000.0)));
    }

    #[test]
    fn occupancy_reports_fill_level() {
        let (mut sink, _rx) = audio_ring(4);
        assert_eq!(sink.occupancy(), Some(0));
        sink.push(&[0; 4]);
        assert_eq!(sink.occupancy(), Some(50));
    }

    #[test]
    fn detached_or_disabled_bridge_drops_silently() {
        let mut bridge = AudioBridge::default();
        bridge.on_sample(1, 1);
        assert_eq!(bridge.stats(), AudioStats::default());

        let (sink, rx) = audio_ring(16);
        bridge.set_sink(Some(Box::new(sink)));
        bridge.set_enabled(false);
        bridge.on_sample(1, 1);
        assert_eq!(rx.available(), 0);
    }
}
