use std::cell::RefCell;
use std::collections::VecDeque;

use crate::engine::{DecoderEngine, STATUS_OK};
use crate::vfs::{FileRegistry, MemoryFs};

pub const BUFFER_OFFSET: usize = 0x1000;
const INFO_TABLE: usize = 0x2000;
const INFO_STRINGS: usize = 0x2100;
const MEMORY_SIZE: usize = 0x4000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init(u32, String, String),
    GetAudioBuffer,
    GetAudioBufferLength,
    Compute,
    GetMaxPosition,
    GetCurrentPosition,
    Seek(i32),
    SetSubsong(i32),
    GetTrackInfo,
    Teardown,
}

pub struct ScriptedEngine {
    memory: Vec<u8>,
    fs: MemoryFs,
    calls: RefCell<Vec<Call>>,
    init_status: i32,
    subsong_status: i32,
    compute_statuses: VecDeque<i32>,
    buffer_offset: usize,
    buffer_bytes: usize,
    position: i32,
    max_position: i32,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        ScriptedEngine {
            memory: vec![0; MEMORY_SIZE],
            fs: MemoryFs::new(),
            calls: RefCell::new(Vec::new()),
            init_status: STATUS_OK,
            subsong_status: STATUS_OK,
            compute_statuses: VecDeque::new(),
            buffer_offset: BUFFER_OFFSET,
            buffer_bytes: 16,
            position: 0,
            max_position: 1000,
        }
    }

    pub fn with_init_status(mut self, status: i32) -> Self {
        self.init_status = status;
        self
    }

    pub fn with_subsong_status(mut self, status: i32) -> Self {
        self.subsong_status = status;
        self
    }

    /// Statuses returned by successive computes; `0` once exhausted.
    pub fn with_compute_statuses(mut self, statuses: &[i32]) -> Self {
        self.compute_statuses = statuses.iter().copied().collect();
        self
    }

    pub fn with_buffer_bytes(mut self, bytes: usize) -> Self {
        self.buffer_bytes = bytes;
        self
    }

    pub fn with_buffer_at(mut self, offset: usize) -> Self {
        self.buffer_offset = offset;
        self
    }

    pub fn with_max_position(mut self, max: i32) -> Self {
        self.max_position = max;
        self
    }

    /// Writes `texts` as C strings and points the info table at them.
    pub fn with_track_info(mut self, texts: &[&str]) -> Self {
        let mut cursor = INFO_STRINGS;
        for (i, text) in texts.iter().enumerate() {
            let slot = INFO_TABLE + i * 4;
            self.memory[slot..slot + 4].copy_from_slice(&(cursor as u32).to_le_bytes());
            self.memory[cursor..cursor + text.len()].copy_from_slice(text.as_bytes());
            self.memory[cursor + text.len()] = 0;
            cursor += text.len() + 1;
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.fs.read(path)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl DecoderEngine for ScriptedEngine {
    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn files(&mut self) -> &mut dyn FileRegistry {
        &mut self.fs
    }

    fn init(&mut self, sample_rate: u32, path: &str, filename: &str) -> i32 {
        self.record(Call::Init(sample_rate, path.into(), filename.into()));
        self.init_status
    }

    fn get_audio_buffer(&self) -> usize {
        self.record(Call::GetAudioBuffer);
        self.buffer_offset
    }

    fn get_audio_buffer_length(&self) -> usize {
        self.record(Call::GetAudioBufferLength);
        self.buffer_bytes
    }

    fn compute_audio_samples(&mut self) -> i32 {
        self.record(Call::Compute);
        let start = self.buffer_offset;
        let end = (start + self.buffer_bytes).min(MEMORY_SIZE);
        for (i, byte) in self.memory[start..end].iter_mut().enumerate() {
            *byte = (i as u8).wrapping_add(self.position as u8);
        }
        self.position = (self.position + 10).min(self.max_position);
        self.compute_statuses.pop_front().unwrap_or(STATUS_OK)
    }

    fn get_max_position(&self) -> i32 {
        self.record(Call::GetMaxPosition);
        self.max_position
    }

    fn get_current_position(&self) -> i32 {
        self.record(Call::GetCurrentPosition);
        self.position
    }

    fn seek_position(&mut self, pos: i32) {
        self.record(Call::Seek(pos));
        self.position = pos.clamp(0, self.max_position);
    }

    fn set_subsong(&mut self, index: i32) -> i32 {
        self.record(Call::SetSubsong(index));
        self.subsong_status
    }

    fn get_track_info(&mut self) -> usize {
        self.record(Call::GetTrackInfo);
        INFO_TABLE
    }

    fn teardown(&mut self) {
        self.record(Call::Teardown);
    }
}
