use std::io::{self, Write};

const HEADER_LEN: usize = 44;
const FORMAT_PCM: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WavHeader {
    pub format_type: u16,
    pub number_of_channels: u16,
    pub sample_rate: u32,
    pub bytes_per_second: u32,
    pub bytes_per_frame: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    pub fn pcm16(number_of_channels: u16, sample_rate: u32, data_size: u32) -> WavHeader {
        let bytes_per_frame = number_of_channels * BITS_PER_SAMPLE / 8;
        WavHeader {
            format_type: FORMAT_PCM,
            number_of_channels,
            sample_rate,
            bytes_per_second: sample_rate * bytes_per_frame as u32,
            bytes_per_frame,
            bits_per_sample: BITS_PER_SAMPLE,
            data_size,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&(36 + self.data_size).to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&self.format_type.to_le_bytes());
        header[22..24].copy_from_slice(&self.number_of_channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.bytes_per_second.to_le_bytes());
        header[32..34].copy_from_slice(&self.bytes_per_frame.to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_size.to_le_bytes());
        header
    }
}

fn data_size(samples: usize) -> io::Result<u32> {
    samples
        .checked_mul(2)
        .and_then(|bytes| u32::try_from(bytes).ok())
        .filter(|bytes| bytes.checked_add(36).is_some())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} samples do not fit in a WAV file", samples),
            )
        })
}

/// Writes interleaved `f32` samples as a 16-bit PCM WAV stream.
pub fn write_pcm16<W: Write>(
    mut writer: W,
    channels: u16,
    sample_rate: u32,
    samples: &[f32],
) -> io::Result<()> {
    let data_size = data_size(samples.len())?;
    writer.write_all(&WavHeader::pcm16(channels, sample_rate, data_size).to_bytes())?;
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_canonical_pcm_header() {
        let header = WavHeader::pcm16(1, 44100, 328982).to_bytes();
        let expected: [u8; 44] = [
            82, 73, 70, 70, 58, 5, 5, 0, 87, 65, 86, 69, 102, 109, 116, 32, 16, 0, 0, 0, 1, 0, 1,
            0, 68, 172, 0, 0, 136, 88, 1, 0, 2, 0, 16, 0, 100, 97, 116, 97, 22, 5, 5, 0,
        ];
        assert_eq!(header, expected);
    }

    #[test]
    fn writes_stereo_samples() {
        let mut out = Vec::new();
        write_pcm16(&mut out, 2, 48000, &[0.0, 1.0, -1.0, 2.0]).unwrap();
        assert_eq!(out.len(), 44 + 8);
        assert_eq!(&out[40..44], &8u32.to_le_bytes());
        assert_eq!(&out[44..46], &0i16.to_le_bytes());
        assert_eq!(&out[46..48], &i16::MAX.to_le_bytes());
        assert_eq!(&out[48..50], &(-i16::MAX).to_le_bytes());
        assert_eq!(&out[50..52], &i16::MAX.to_le_bytes());
    }

    #[test]
    fn data_size_must_fit_the_header() {
        assert_eq!(data_size(4).unwrap(), 8);
        assert_eq!(data_size(0x7fff_ffe0).unwrap(), 0xffff_ffc0);
        let err = data_size(0x8000_0000).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(data_size(0x7fff_fff0).is_err());
    }
}
