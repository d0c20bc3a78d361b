use std::f32::consts::PI;

use log::{debug, warn};

use crate::engine::{DecoderEngine, STATUS_OK};
use crate::vfs::{join_path, FileRegistry, MemoryFs};

const HEAP_SIZE: usize = 0x4000;
const INFO_TABLE: usize = 0x100;
const INFO_TEXT: usize = 0x200;
const TEXT_MAX: usize = 255;
const BUFFER_OFFSET: usize = 0x1000;

pub const BUFFER_FRAMES: usize = 1024;

const AMPLITUDE: f32 = 0.1;
const PLAYER_NAME: &str = "Tone Generator";
const STATUS_ERROR: i32 = -1;
const STATUS_ENDED: i32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Tone {
    pub freq: f32,
    pub duration_ms: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToneSong {
    pub title: String,
    pub author: String,
    pub desc: String,
    pub tones: Vec<Tone>,
}

impl ToneSong {
    /// Returns `None` for malformed input or a file with no tones.
    pub fn parse(text: &str) -> Option<ToneSong> {
        let mut song = ToneSong::default();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(comment) = line.strip_prefix('#') {
                if let Some((key, value)) = comment.split_once(':') {
                    let value = value.trim().to_string();
                    match key.trim() {
                        "title" => song.title = value,
                        "author" => song.author = value,
                        "desc" => song.desc = value,
                        _ => {}
                    }
                }
                continue;
            }
            let mut parts = line.split_whitespace();
            let freq = parts.next()?.parse().ok()?;
            let duration_ms: u32 = parts.next()?.parse().ok()?;
            // Positions are reported as i32 milliseconds.
            if i32::try_from(duration_ms).is_err() {
                return None;
            }
            song.tones.push(Tone { freq, duration_ms });
        }
        if song.tones.is_empty() {
            None
        } else {
            Some(song)
        }
    }
}

pub struct ToneEngine {
    heap: Vec<u8>,
    fs: MemoryFs,
    song: Option<ToneSong>,
    sample_rate: u32,
    subsong: usize,
    play_frames: u64,
    total_frames: u64,
    buffer_bytes: usize,
}

impl Default for ToneEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ToneEngine {
    pub fn new() -> Self {
        let mut heap = vec![0u8; HEAP_SIZE];
        for slot in 0..6 {
            let ptr = (INFO_TEXT + slot * (TEXT_MAX + 1)) as u32;
            let at = INFO_TABLE + slot * 4;
            heap[at..at + 4].copy_from_slice(&ptr.to_le_bytes());
        }
        ToneEngine {
            heap,
            fs: MemoryFs::new(),
            song: None,
            sample_rate: 44100,
            subsong: 0,
            play_frames: 0,
            total_frames: 0,
            buffer_bytes: 0,
        }
    }

    fn tone(&self) -> Option<&Tone> {
        self.song.as_ref()?.tones.get(self.subsong)
    }

    fn frames_for_ms(&self, ms: u64) -> u64 {
        ms.saturating_mul(self.sample_rate as u64) / 1000
    }

    fn write_text(&mut self, slot: usize, text: &str) {
        let at = INFO_TEXT + slot * (TEXT_MAX + 1);
        let bytes = &text.as_bytes()[..text.len().min(TEXT_MAX - 1)];
        self.heap[at..at + bytes.len()].copy_from_slice(bytes);
        self.heap[at + bytes.len()] = 0;
    }

    fn fill_buffer(&mut self, frames: usize) {
        let freq = self.tone().map(|t| t.freq).unwrap_or(0.0);
        let rate = self.sample_rate as f32;
        for i in 0..frames {
            let t = (self.play_frames + i as u64) as f32 / rate;
            let value = (AMPLITUDE * (2.0 * PI * freq * t).sin() * i16::MAX as f32) as i16;
            let at = BUFFER_OFFSET + i * 4;
            self.heap[at..at + 2].copy_from_slice(&value.to_le_bytes());
            self.heap[at + 2..at + 4].copy_from_slice(&value.to_le_bytes());
        }
        self.buffer_bytes = frames * 4;
    }
}

impl DecoderEngine for ToneEngine {
    fn memory(&self) -> &[u8] {
        &self.heap
    }

    fn files(&mut self) -> &mut dyn FileRegistry {
        &mut self.fs
    }

    fn init(&mut self, sample_rate: u32, path: &str, filename: &str) -> i32 {
        self.teardown();
        let full = join_path(path, filename);
        let song = self
            .fs
            .read(&full)
            .and_then(|data| std::str::from_utf8(data).ok())
            .and_then(ToneSong::parse);
        let Some(song) = song else {
            warn!("error loading: {}", full);
            return STATUS_ERROR;
        };
        if sample_rate == 0 {
            return STATUS_ERROR;
        }
        debug!("{} holds {} tones", full, song.tones.len());
        self.sample_rate = sample_rate;
        self.song = Some(song);
        self.set_subsong(0)
    }

    fn get_audio_buffer(&self) -> usize {
        BUFFER_OFFSET
    }

    fn get_audio_buffer_length(&self) -> usize {
        self.buffer_bytes
    }

    fn compute_audio_samples(&mut self) -> i32 {
        if self.song.is_none() {
            return STATUS_ERROR;
        }
        let remaining = self.total_frames.saturating_sub(self.play_frames);
        if remaining == 0 {
            self.buffer_bytes = 0;
            return STATUS_ENDED;
        }
        let frames = remaining.min(BUFFER_FRAMES as u64) as usize;
        self.fill_buffer(frames);
        self.play_frames += frames as u64;
        STATUS_OK
    }

    fn get_max_position(&self) -> i32 {
        self.tone()
            .map(|t| i32::try_from(t.duration_ms).unwrap_or(i32::MAX))
            .unwrap_or(0)
    }

    fn get_current_position(&self) -> i32 {
        (self.play_frames * 1000 / self.sample_rate as u64) as i32
    }

    fn seek_position(&mut self, pos: i32) {
        let max = self.get_max_position();
        let ms = pos.clamp(0, max.max(0)) as u64;
        self.play_frames = self.frames_for_ms(ms).min(self.total_frames);
    }

    fn set_subsong(&mut self, index: i32) -> i32 {
        let count = self.song.as_ref().map(|s| s.tones.len()).unwrap_or(0);
        if index < 0 || index as usize >= count {
            return STATUS_ERROR;
        }
        self.subsong = index as usize;
        self.play_frames = 0;
        self.buffer_bytes = 0;
        let duration = self.get_max_position() as u64;
        self.total_frames = self.frames_for_ms(duration);
        STATUS_OK
    }

    fn get_track_info(&mut self) -> usize {
        if let Some(song) = self.song.clone() {
            self.write_text(0, &song.title);
            self.write_text(1, &song.author);
            self.write_text(2, &song.desc);
            self.write_text(3, PLAYER_NAME);
            self.write_text(4, "1");
            self.write_text(5, &song.tones.len().to_string());
        }
        INFO_TABLE
    }

    fn teardown(&mut self) {
        self.song = None;
        self.subsong = 0;
        self.play_frames = 0;
        self.total_frames = 0;
        self.buffer_bytes = 0;
        self.heap[BUFFER_OFFSET..BUFFER_OFFSET + BUFFER_FRAMES * 4].fill(0);
    }
}
