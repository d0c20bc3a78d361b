use serde::Serialize;

use crate::error::{AdapterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleWidth {
    I8,
    I16,
    I32,
    F32,
}

impl SampleWidth {
    pub fn bytes(self) -> usize {
        match self {
            SampleWidth::I8 => 1,
            SampleWidth::I16 => 2,
            SampleWidth::I32 | SampleWidth::F32 => 4,
        }
    }

    /// Reads one little-endian sample and rescales it to `-1.0..=1.0`.
    fn read(self, bytes: &[u8]) -> f32 {
        match self {
            SampleWidth::I8 => bytes[0] as i8 as f32 / 128.0,
            SampleWidth::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32768.0,
            SampleWidth::I32 => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32
                    / 2_147_483_648.0
            }
            SampleWidth::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }
}

/// Sample width and interleaved channel count an adapter declares for its
/// decoder. Fixed for the lifetime of the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferLayout {
    pub width: SampleWidth,
    pub channels: u16,
}

impl BufferLayout {
    pub const fn new(width: SampleWidth, channels: u16) -> Self {
        BufferLayout { width, channels }
    }

    /// Converts a raw decoder quantity, counted in `native_word`-byte words,
    /// into sample units. Anything that does not land on a unit boundary is a
    /// decoder contract violation and is reported, never truncated.
    pub fn to_units(&self, what: &'static str, raw: usize, native_word: usize) -> Result<usize> {
        let unit = self.width.bytes();
        let misaligned = || AdapterError::Misaligned { what, raw, unit };
        let bytes = raw.checked_mul(native_word).ok_or_else(misaligned)?;
        if native_word == 0 || bytes % unit != 0 {
            return Err(misaligned());
        }
        Ok(bytes / unit)
    }

    /// Resolves a raw `(offset, length)` pair into `(unit_offset, unit_count)`.
    pub fn resolve(
        &self,
        raw_offset: usize,
        raw_length: usize,
        native_word: usize,
    ) -> Result<(usize, usize)> {
        let base = self.to_units("offset", raw_offset, native_word)?;
        let len = self.to_units("length", raw_length, native_word)?;
        if self.channels == 0 || len % self.channels as usize != 0 {
            return Err(AdapterError::PartialFrame {
                len,
                channels: self.channels,
            });
        }
        Ok((base, len))
    }
}

/// Non-owning view of the current frame in decoder memory.
///
/// Borrowing the decoder's memory means the view cannot outlive the next
/// call that produces a frame.
#[derive(Debug, Clone, Copy)]
pub struct SampleBufferView<'a> {
    memory: &'a [u8],
    base: usize,
    len: usize,
    layout: BufferLayout,
}

impl<'a> SampleBufferView<'a> {
    /// `base` and `len` are in sample units of `layout.width`.
    pub fn new(memory: &'a [u8], base: usize, len: usize, layout: BufferLayout) -> Result<Self> {
        let unit = layout.width.bytes();
        let start = base.saturating_mul(unit);
        let end = start.saturating_add(len.saturating_mul(unit));
        if end > memory.len() {
            return Err(AdapterError::OutOfBounds {
                start,
                end,
                size: memory.len(),
            });
        }
        if layout.channels == 0 || len % layout.channels as usize != 0 {
            return Err(AdapterError::PartialFrame {
                len,
                channels: layout.channels,
            });
        }
        Ok(SampleBufferView {
            memory,
            base,
            len,
            layout,
        })
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// Number of sample units, all channels included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn frames(&self) -> usize {
        self.len / self.layout.channels as usize
    }

    pub fn channels(&self) -> u16 {
        self.layout.channels
    }

    pub fn width(&self) -> SampleWidth {
        self.layout.width
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        let unit = self.layout.width.bytes();
        &self.memory[self.base * unit..(self.base + self.len) * unit]
    }

    /// Sample `index` (interleaved order), rescaled to `f32`.
    pub fn sample(&self, index: usize) -> Option<f32> {
        if index >= self.len {
            return None;
        }
        let unit = self.layout.width.bytes();
        let start = (self.base + index) * unit;
        Some(self.layout.width.read(&self.memory[start..start + unit]))
    }

    pub fn frame_sample(&self, frame: usize, channel: u16) -> Option<f32> {
        if channel >= self.layout.channels {
            return None;
        }
        self.sample(frame * self.layout.channels as usize + channel as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        let width = self.layout.width;
        self.as_bytes()
            .chunks_exact(width.bytes())
            .map(move |bytes| width.read(bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleRates {
    pub output: u32,
    pub input: u32,
}

impl SampleRates {
    pub fn new(output: u32, input: u32) -> Self {
        SampleRates { output, input }
    }

    /// Input samples consumed per output sample.
    pub fn ratio(&self) -> f64 {
        if self.output == 0 {
            return 1.0;
        }
        self.input as f64 / self.output as f64
    }

    pub fn needs_resampling(&self) -> bool {
        self.output != self.input
    }
}
