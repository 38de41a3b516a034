//! Screenshot and audio capture.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, info, warn};

use crate::audio::AudioSink;
use crate::error::CaptureError;
use crate::video::Frame;

/// Write a mailbox frame as an 8-bit RGBA PNG.
pub fn write_png(path: &Path, frame: &Frame) -> Result<(), CaptureError> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.rgba.len() != expected || expected == 0 {
        return Err(CaptureError::FrameSize {
            width: frame.width,
            height: frame.height,
            expected,
            actual: frame.rgba.len(),
        });
    }
    let file = File::create(path).map_err(|source| CaptureError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    let mut encoder = png::Encoder::new(BufWriter::new(file), frame.width, frame.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&frame.rgba)?;
    writer.finish()?;
    info!(path = %path.display(), width = frame.width, height = frame.height, "screenshot written");
    Ok(())
}

type Writer = WavWriter<BufWriter<File>>;

/// [`AudioSink`] that records 16-bit stereo PCM to a WAV file.
///
/// The file is created once the sample rate is known. Samples pushed before that are
/// dropped. The recording keeps its first rate; later rate changes are logged and ignored.
pub struct WavRecorder {
    path: PathBuf,
    writer: Option<Writer>,
    sample_rate: u32,
    frames: u64,
    failed: bool,
}

impl WavRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            sample_rate: 0,
            frames: 0,
            failed: false,
        }
    }

    /// Stereo frames written so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Finalize the file header. Also done on drop, with errors only logged.
    pub fn finish(mut self) -> Result<u64, CaptureError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(self.frames)
    }

    fn open(&mut self, sample_rate: u32) -> Result<(), CaptureError> {
        let spec = WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let file = File::create(&self.path).map_err(|source| CaptureError::Create {
            path: self.path.clone(),
            source,
        })?;
        self.writer = Some(WavWriter::new(BufWriter::new(file), spec)?);
        self.sample_rate = sample_rate;
        debug!(path = %self.path.display(), sample_rate, "WAV recording started");
        Ok(())
    }
}

impl AudioSink for WavRecorder {
    fn push(&mut self, samples: &[i16]) -> usize {
        let Some(writer) = self.writer.as_mut() else {
            return 0;
        };
        for &sample in samples {
            if let Err(e) = writer.write_sample(sample) {
                warn!(error = %e, "WAV write failed, recording stopped");
                self.writer = None;
                self.failed = true;
                return 0;
            }
        }
        self.frames += (samples.len() / 2) as u64;
        samples.len()
    }

    fn configure(&mut self, sample_rate: f64) {
        let rate = sample_rate.round() as u32;
        if self.failed || rate == 0 {
            return;
        }
        if self.writer.is_some() {
            if rate != self.sample_rate {
                warn!(
                    recording = self.sample_rate,
                    requested = rate,
                    "sample rate changed mid-recording"
                );
            }
            return;
        }
        if let Err(e) = self.open(rate) {
            warn!(error = %e, "WAV recording unavailable");
            self.failed = true;
        }
    }
}

impl Drop for WavRecorder {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            match writer.finalize() {
                Ok(()) => info!(
                    path = %self.path.display(),
                    frames = self.frames,
                    "WAV recording finished"
                ),
                Err(e) => warn!(path = %self.path.display(), error = %e, "failed to finalize WAV"),
            }
        }
    }
}
