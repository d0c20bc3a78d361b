use log::{debug, info, warn};
use serde::Serialize;

use crate::buffer::{BufferLayout, SampleBufferView, SampleRates};
use crate::engine::STATUS_OK;
use crate::error::{AdapterError, Result};
use crate::options::{PlaybackScheduler, TrackOptions};
use crate::song_info::{FieldSpec, SongInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterState {
    Unloaded,
    Loading,
    Ready,
    Playing,
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Produced,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderHandle {
    pub sample_rate: u32,
    pub path: String,
    pub filename: String,
}

#[derive(Debug)]
pub struct AdapterCore {
    state: AdapterState,
    handle: Option<DecoderHandle>,
    rates: Option<SampleRates>,
}

impl Default for AdapterCore {
    fn default() -> Self {
        AdapterCore {
            state: AdapterState::Unloaded,
            handle: None,
            rates: None,
        }
    }
}

impl AdapterCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn handle(&self) -> Option<&DecoderHandle> {
        self.handle.as_ref()
    }

    pub fn sample_rates(&self) -> Option<SampleRates> {
        self.rates
    }

    /// Fails unless a decoder session is live.
    pub fn require_live(&self) -> Result<()> {
        match self.state {
            AdapterState::Ready | AdapterState::Playing => Ok(()),
            AdapterState::TornDown => Err(AdapterError::TornDown),
            AdapterState::Unloaded | AdapterState::Loading => Err(AdapterError::NotReady),
        }
    }

    pub fn begin_load(&mut self) -> Result<()> {
        if self.state == AdapterState::TornDown {
            return Err(AdapterError::TornDown);
        }
        self.handle = None;
        self.rates = None;
        self.state = AdapterState::Loading;
        Ok(())
    }

    pub fn finish_load(
        &mut self,
        status: i32,
        sample_rate: u32,
        path: &str,
        filename: &str,
    ) -> Result<()> {
        if status != STATUS_OK {
            self.state = AdapterState::Unloaded;
            return Err(AdapterError::LoadFailed {
                status,
                path: path.to_string(),
                filename: filename.to_string(),
            });
        }
        self.handle = Some(DecoderHandle {
            sample_rate,
            path: path.to_string(),
            filename: filename.to_string(),
        });
        self.state = AdapterState::Ready;
        Ok(())
    }

    pub fn mark_playing(&mut self) {
        if self.state == AdapterState::Ready {
            self.state = AdapterState::Playing;
        }
    }

    pub fn reset_sample_rate(&mut self, output: u32, input: u32) {
        self.rates = Some(SampleRates::new(output, input));
    }

    /// Moves to `TornDown`. Returns `true` only the first time, when the
    /// decoder's own teardown still has to run.
    pub fn teardown(&mut self) -> bool {
        if self.state == AdapterState::TornDown {
            return false;
        }
        self.state = AdapterState::TornDown;
        self.handle = None;
        true
    }
}

pub trait BackendAdapter {
    fn layout(&self) -> BufferLayout;

    fn core(&self) -> &AdapterCore;

    fn core_mut(&mut self) -> &mut AdapterCore;

    fn init_decoder(&mut self, sample_rate: u32, path: &str, filename: &str) -> i32;

    fn release_decoder(&mut self);

    fn select_subsong(&mut self, index: i32) -> Result<()>;

    /// View of the current frame. Contents change on the next
    /// [`compute_audio_samples`](Self::compute_audio_samples).
    fn audio_buffer(&self) -> Result<SampleBufferView<'_>>;

    fn compute_audio_samples(&mut self) -> Result<FrameStatus>;

    fn max_playback_position(&self) -> Result<i32>;

    fn playback_position(&self) -> Result<i32>;

    /// Passes `pos` to the decoder unchanged; range handling is the
    /// decoder's.
    fn seek_playback_position(&mut self, pos: i32) -> Result<()>;

    fn path_and_filename(&self, input: &str) -> (String, String);

    fn register_file_data(&mut self, path: &str, filename: &str, data: &[u8]) -> Result<()>;

    fn song_info_meta(&self) -> &'static [FieldSpec];

    fn update_song_info(&mut self, filename: &str, result: &mut SongInfo) -> Result<()>;

    /// Rate the decoder produces at when asked for `output_rate`.
    fn native_sample_rate(&self, output_rate: u32) -> u32 {
        output_rate
    }

    fn state(&self) -> AdapterState {
        self.core().state()
    }

    fn sample_rates(&self) -> Option<SampleRates> {
        self.core().sample_rates()
    }

    fn audio_buffer_length(&self) -> Result<usize> {
        Ok(self.audio_buffer()?.len())
    }

    /// Initializes the decoder on a file already registered at
    /// `path`/`filename`. A failed load leaves the adapter unloaded.
    fn load_music_data(
        &mut self,
        sample_rate: u32,
        path: &str,
        filename: &str,
        data: &[u8],
        _options: &TrackOptions,
    ) -> Result<()> {
        self.core_mut().begin_load()?;
        debug!("loading {}{} ({} bytes)", path, filename, data.len());
        let status = self.init_decoder(sample_rate, path, filename);
        if let Err(err) = self.core_mut().finish_load(status, sample_rate, path, filename) {
            warn!("{}", err);
            return Err(err);
        }
        let input = self.native_sample_rate(sample_rate);
        self.core_mut().reset_sample_rate(sample_rate, input);
        info!("loaded {}{} at {} Hz", path, filename, sample_rate);
        Ok(())
    }

    /// Applies per-track options. `timeout` goes to `scheduler`; `track`
    /// goes to the decoder and its status comes back unchanged. An empty bag
    /// is a successful no-op.
    fn eval_track_options(
        &mut self,
        options: &TrackOptions,
        scheduler: &mut dyn PlaybackScheduler,
    ) -> Result<()> {
        self.core().require_live()?;
        if let Some(timeout) = options.timeout_duration() {
            debug!("playback timeout {:?}", timeout);
            scheduler.set_playback_timeout(timeout);
        }
        match options.track {
            Some(track) => {
                debug!("selecting subsong {}", track);
                self.select_subsong(track)
            }
            None => Ok(()),
        }
    }

    /// Releases the decoder. Safe in any state; only the first call reaches
    /// the decoder.
    fn teardown(&mut self) {
        if self.core_mut().teardown() {
            debug!("tearing down decoder");
            self.release_decoder();
        }
    }
}
