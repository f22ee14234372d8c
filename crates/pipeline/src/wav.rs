//! WAV inspection and encoding

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::PipelineError;

/// Header facts of a WAV clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Samples per channel
    pub frames: u32,
}

impl WavInfo {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        u64::from(self.frames) * 1000 / u64::from(self.sample_rate)
    }
}

/// Read the header of an in-memory WAV clip
pub fn inspect_wav(bytes: &[u8]) -> Result<WavInfo, PipelineError> {
    let reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::Audio(format!("Invalid WAV data: {}", e)))?;
    let spec = reader.spec();
    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        frames: reader.duration(),
    })
}

/// Encode mono 16-bit PCM samples as WAV
pub fn encode_pcm16(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, PipelineError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| PipelineError::Audio(format!("Failed to create WAV writer: {}", e)))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| PipelineError::Audio(format!("Failed to write sample: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| PipelineError::Audio(format!("Failed to finalize WAV: {}", e)))?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_then_inspect() {
        let samples = vec![0i16; 8000];
        let bytes = encode_pcm16(&samples, 16000).unwrap();
        let info = inspect_wav(&bytes).unwrap();
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.frames, 8000);
        assert_eq!(info.duration_ms(), 500);
    }

    #[test]
    fn test_rejects_non_wav() {
        assert!(matches!(
            inspect_wav(b"definitely not audio"),
            Err(PipelineError::Audio(_))
        ));
    }
}
