use std::time::Duration;

use log::{error, info, warn};
use serde::Serialize;

use crate::backend::{BackendAdapter, FrameStatus};
use crate::error::{AdapterError, Result};
use crate::options::{PlaybackScheduler, TrackOptions};
use crate::song_info::SongInfo;
use crate::storage::PlayerConfig;

pub const OUTPUT_CHANNELS: usize = 2;

/// Consecutive empty frames tolerated before a track is treated as ended.
const MAX_EMPTY_FRAMES: usize = 64;

pub type BackendFactory = Box<dyn Fn() -> Box<dyn BackendAdapter>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

pub struct PlaylistItem {
    pub input: String,
    data: Vec<u8>,
    pub options: TrackOptions,
    pub info: Option<SongInfo>,
}

#[derive(Debug, Default)]
struct PlaybackClock {
    sample_rate: u32,
    timeout: Option<Duration>,
    elapsed_frames: u64,
}

impl PlaybackClock {
    fn restart(&mut self, sample_rate: u32, timeout: Option<Duration>) {
        self.sample_rate = sample_rate;
        self.timeout = timeout;
        self.elapsed_frames = 0;
    }

    fn elapsed(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.elapsed_frames * 1000 / self.sample_rate as u64)
    }

    /// Frames left before the forced stop, if one is set.
    fn remaining_frames(&self) -> Option<usize> {
        let timeout = self.timeout?;
        let limit = timeout.as_millis() as u64 * self.sample_rate as u64 / 1000;
        Some(limit.saturating_sub(self.elapsed_frames) as usize)
    }

    fn expired(&self) -> bool {
        self.remaining_frames() == Some(0)
    }
}

impl PlaybackScheduler for PlaybackClock {
    fn set_playback_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }
}

#[derive(Serialize)]
pub struct PlaylistEntry<'a> {
    pub input: &'a str,
    pub info: Option<&'a SongInfo>,
}

#[derive(Serialize)]
pub struct PlayerStatus<'a> {
    pub state: PlaybackState,
    pub current_item: usize,
    pub position: Option<i32>,
    pub max_position: Option<i32>,
    pub elapsed_ms: u64,
    pub playlist: Vec<PlaylistEntry<'a>>,
}

enum Step {
    Copied(usize),
    Computed,
    TrackOver,
}

pub struct Player {
    config: PlayerConfig,
    factory: BackendFactory,
    state: PlaybackState,
    playlist: Vec<PlaylistItem>,
    current_item: usize,
    backend: Option<Box<dyn BackendAdapter>>,
    cursor: usize,
    empty_frames: usize,
    clock: PlaybackClock,
}

impl Player {
    pub fn new(config: PlayerConfig, factory: BackendFactory) -> Self {
        Player {
            config,
            factory,
            state: PlaybackState::Paused,
            playlist: vec![],
            current_item: 0,
            backend: None,
            cursor: 0,
            empty_frames: 0,
            clock: PlaybackClock::default(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_item(&self) -> usize {
        self.current_item
    }

    pub fn playlist(&self) -> &[PlaylistItem] {
        &self.playlist
    }

    pub fn add_track(
        &mut self,
        input: impl Into<String>,
        data: Vec<u8>,
        options: TrackOptions,
    ) -> &mut Self {
        self.playlist.push(PlaylistItem {
            input: input.into(),
            data,
            options,
            info: None,
        });
        self
    }

    pub fn next(&mut self) -> &mut Self {
        self.stop_backend();
        if !self.playlist.is_empty() {
            self.current_item = (self.current_item + 1) % self.playlist.len();
        }
        self
    }

    pub fn pause(&mut self) -> &mut Self {
        self.state = PlaybackState::Paused;
        self
    }

    pub fn play(&mut self) -> &mut Self {
        self.state = PlaybackState::Playing;
        self
    }

    pub fn toggle(&mut self) -> &mut Self {
        match self.state {
            PlaybackState::Paused => self.play(),
            PlaybackState::Playing => self.pause(),
        }
    }

    pub fn seek(&mut self, pos: i32) -> Result<()> {
        let backend = self.backend.as_mut().ok_or(AdapterError::NotReady)?;
        backend.seek_playback_position(pos)?;
        // Whatever is left of the old frame is stale.
        self.cursor = usize::MAX;
        Ok(())
    }

    pub fn status(&self) -> PlayerStatus<'_> {
        let backend = self.backend.as_ref();
        PlayerStatus {
            state: self.state,
            current_item: self.current_item,
            position: backend.and_then(|b| b.playback_position().ok()),
            max_position: backend.and_then(|b| b.max_playback_position().ok()),
            elapsed_ms: self.clock.elapsed().as_millis() as u64,
            playlist: self
                .playlist
                .iter()
                .map(|item| PlaylistEntry {
                    input: &item.input,
                    info: item.info.as_ref(),
                })
                .collect(),
        }
    }

    /// Fills `out` with interleaved stereo and returns the number of frames
    /// that came from a track. Paused playback renders silence.
    ///
    /// Fails only when every track in the playlist fails in a row; playback
    /// is paused in that case.
    pub fn render(&mut self, out: &mut [f32]) -> Result<usize> {
        out.fill(0.0);
        if self.state == PlaybackState::Paused || self.playlist.is_empty() {
            return Ok(0);
        }
        let wanted = out.len() / OUTPUT_CHANNELS;
        let mut written = 0;
        let mut failures = 0;
        let mut idle_tracks = 0;

        while written < wanted {
            if self.backend.is_none() {
                if let Err(err) = self.start_track() {
                    failures += 1;
                    if failures >= self.playlist.len() {
                        error!("no playable track: {}", err);
                        self.pause();
                        return Err(err);
                    }
                    self.next();
                    continue;
                }
            }
            let step = if self.clock.expired() {
                info!("track {} reached its timeout", self.current_item);
                Ok(Step::TrackOver)
            } else {
                self.step(&mut out[written * OUTPUT_CHANNELS..])
            };

            match step {
                Ok(Step::Copied(frames)) => {
                    written += frames;
                    failures = 0;
                    idle_tracks = 0;
                }
                Ok(Step::Computed) => {}
                Ok(Step::TrackOver) => {
                    idle_tracks += 1;
                    self.next();
                    if idle_tracks > self.playlist.len() {
                        warn!("no track produced audio");
                        self.pause();
                        break;
                    }
                }
                Err(err) => {
                    warn!("track {} failed: {}", self.current_item, err);
                    failures += 1;
                    if failures >= self.playlist.len() {
                        self.stop_backend();
                        self.pause();
                        return Err(err);
                    }
                    self.next();
                }
            }
        }
        Ok(written)
    }

    fn step(&mut self, out: &mut [f32]) -> Result<Step> {
        let backend = self.backend.as_mut().ok_or(AdapterError::NotReady)?;
        let view = backend.audio_buffer()?;
        let available = view.frames().saturating_sub(self.cursor);
        if available == 0 {
            if self.empty_frames >= MAX_EMPTY_FRAMES {
                return Ok(Step::TrackOver);
            }
            return match backend.compute_audio_samples()? {
                FrameStatus::Produced => {
                    self.cursor = 0;
                    self.empty_frames += 1;
                    Ok(Step::Computed)
                }
                FrameStatus::Ended => Ok(Step::TrackOver),
            };
        }

        let frames = available
            .min(out.len() / OUTPUT_CHANNELS)
            .min(self.clock.remaining_frames().unwrap_or(usize::MAX));
        let channels = view.channels();
        for frame in 0..frames {
            for ch in 0..OUTPUT_CHANNELS {
                let source = ch as u16 % channels;
                out[frame * OUTPUT_CHANNELS + ch] =
                    view.frame_sample(self.cursor + frame, source).unwrap_or(0.0);
            }
        }
        self.cursor += frames;
        self.empty_frames = 0;
        self.clock.elapsed_frames += frames as u64;
        Ok(Step::Copied(frames))
    }

    fn start_track(&mut self) -> Result<()> {
        let mut backend = (self.factory)();
        let item = &self.playlist[self.current_item];
        let mut options = item.options.clone();
        if options.track.is_none() {
            options.track = self.config.default_track;
        }
        self.clock
            .restart(self.config.sample_rate, self.config.default_timeout());

        match open_track(
            &mut *backend,
            item,
            &options,
            self.config.sample_rate,
            &mut self.clock,
        ) {
            Ok(info) => {
                info!("playing {} ({})", item.input, info.title);
                self.playlist[self.current_item].info = Some(info);
                self.backend = Some(backend);
                self.cursor = 0;
                self.empty_frames = 0;
                Ok(())
            }
            Err(err) => {
                warn!("could not start {}: {}", item.input, err);
                backend.teardown();
                Err(err)
            }
        }
    }

    fn stop_backend(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.teardown();
        }
        self.cursor = 0;
        self.empty_frames = 0;
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop_backend();
    }
}

fn open_track(
    backend: &mut dyn BackendAdapter,
    item: &PlaylistItem,
    options: &TrackOptions,
    sample_rate: u32,
    scheduler: &mut dyn PlaybackScheduler,
) -> Result<SongInfo> {
    let (path, filename) = backend.path_and_filename(&item.input);
    backend.register_file_data(&path, &filename, &item.data)?;
    backend.load_music_data(sample_rate, &path, &filename, &item.data, options)?;
    backend.eval_track_options(options, scheduler)?;
    let mut info = SongInfo::default();
    backend.update_song_info(&filename, &mut info)?;
    Ok(info)
}
