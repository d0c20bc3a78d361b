pub mod adplug;
pub mod backend;
pub mod buffer;
pub mod engine;
pub mod error;
pub mod options;
pub mod player;
pub mod song_info;
pub mod storage;
pub mod tone;
pub mod vfs;
pub mod wav_header;

#[cfg(test)]
mod testing;

pub use adplug::AdPlugAdapter;
pub use backend::{AdapterState, BackendAdapter, FrameStatus};
pub use buffer::{BufferLayout, SampleBufferView, SampleRates, SampleWidth};
pub use engine::DecoderEngine;
pub use error::{AdapterError, Result};
pub use options::{PlaybackScheduler, TrackOptions};
pub use player::Player;
pub use song_info::SongInfo;
