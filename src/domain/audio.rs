/// Linear PCM audio buffer.
///
/// Samples are 32-bit floats conceptually in `[-1, 1]`; transient overshoot
/// is tolerated until a normalization pass runs. Buffers are ephemeral:
/// produced by extraction, consumed once by transcription, never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// PCM samples. Mono unless `channels > 1`, in which case interleaved.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
}

impl PcmBuffer {
    /// Create a mono buffer from raw samples.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    /// A single-sample silent mono buffer.
    ///
    /// Returned wherever a trim configuration leaves nothing audible, so
    /// extraction stays total instead of failing.
    pub fn silent(sample_rate: u32) -> Self {
        Self::mono(vec![0.0], sample_rate)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds, per channel.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels.max(1) as f64)
    }

    /// Maximum absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}
