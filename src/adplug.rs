use crate::backend::{AdapterCore, AdapterState, BackendAdapter, FrameStatus};
use crate::buffer::{BufferLayout, SampleBufferView, SampleWidth};
use crate::engine::{DecoderEngine, STATUS_OK};
use crate::error::{AdapterError, Result};
use crate::song_info::{decode_song_info, FieldSpec, SongInfo, SONG_INFO_FIELDS};

pub const ADPLUG_LAYOUT: BufferLayout = BufferLayout::new(SampleWidth::I16, 2);

const NATIVE_WORD: usize = 1;

/// The track-info table holds wasm32 pointers.
const POINTER_SIZE: usize = 4;

const ROOT_DIR: &str = "/";

pub struct AdPlugAdapter<E> {
    engine: E,
    core: AdapterCore,
}

impl<E: DecoderEngine> AdPlugAdapter<E> {
    pub fn new(engine: E) -> Self {
        AdPlugAdapter {
            engine,
            core: AdapterCore::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: DecoderEngine> BackendAdapter for AdPlugAdapter<E> {
    fn layout(&self) -> BufferLayout {
        ADPLUG_LAYOUT
    }

    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AdapterCore {
        &mut self.core
    }

    fn init_decoder(&mut self, sample_rate: u32, path: &str, filename: &str) -> i32 {
        self.engine.init(sample_rate, path, filename)
    }

    fn release_decoder(&mut self) {
        self.engine.teardown();
    }

    fn select_subsong(&mut self, index: i32) -> Result<()> {
        self.core.require_live()?;
        match self.engine.set_subsong(index) {
            STATUS_OK => Ok(()),
            status => Err(AdapterError::InvalidSubsong { index, status }),
        }
    }

    fn audio_buffer(&self) -> Result<SampleBufferView<'_>> {
        self.core.require_live()?;
        let raw_offset = self.engine.get_audio_buffer();
        let raw_length = self.engine.get_audio_buffer_length();
        let (base, len) = ADPLUG_LAYOUT.resolve(raw_offset, raw_length, NATIVE_WORD)?;
        SampleBufferView::new(self.engine.memory(), base, len, ADPLUG_LAYOUT)
    }

    fn compute_audio_samples(&mut self) -> Result<FrameStatus> {
        self.core.require_live()?;
        let status = self.engine.compute_audio_samples();
        self.core.mark_playing();
        match status {
            STATUS_OK => Ok(FrameStatus::Produced),
            s if s > 0 => Ok(FrameStatus::Ended),
            s => Err(AdapterError::DecodeFailed(s)),
        }
    }

    fn max_playback_position(&self) -> Result<i32> {
        self.core.require_live()?;
        Ok(self.engine.get_max_position())
    }

    fn playback_position(&self) -> Result<i32> {
        self.core.require_live()?;
        Ok(self.engine.get_current_position())
    }

    fn seek_playback_position(&mut self, pos: i32) -> Result<()> {
        self.core.require_live()?;
        self.engine.seek_position(pos);
        Ok(())
    }

    fn path_and_filename(&self, input: &str) -> (String, String) {
        let filename = input.rsplit('/').next().unwrap_or(input);
        (ROOT_DIR.to_string(), filename.to_string())
    }

    fn register_file_data(&mut self, path: &str, filename: &str, data: &[u8]) -> Result<()> {
        if self.core.state() == AdapterState::TornDown {
            return Err(AdapterError::TornDown);
        }
        self.engine.files().register_file(path, filename, data)
    }

    fn song_info_meta(&self) -> &'static [FieldSpec] {
        &SONG_INFO_FIELDS
    }

    fn update_song_info(&mut self, filename: &str, result: &mut SongInfo) -> Result<()> {
        self.core.require_live()?;
        let base = self.engine.get_track_info();
        *result = decode_song_info(self.engine.memory(), base, POINTER_SIZE, filename)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{NoTimeout, PlaybackScheduler, TrackOptions};
    use crate::testing::{Call, ScriptedEngine, BUFFER_OFFSET};
    use std::time::Duration;

    fn loaded(engine: ScriptedEngine) -> AdPlugAdapter<ScriptedEngine> {
        let mut adapter = AdPlugAdapter::new(engine);
        adapter
            .load_music_data(44100, "/", "song.d00", &[], &TrackOptions::default())
            .unwrap();
        adapter
    }

    #[derive(Default)]
    struct RecordingScheduler(Option<Duration>);

    impl PlaybackScheduler for RecordingScheduler {
        fn set_playback_timeout(&mut self, timeout: Duration) {
            self.0 = Some(timeout);
        }
    }

    #[test]
    fn buffer_matches_known_decoder_buffer() {
        // 1024 stereo frames of 16-bit samples: 4096 bytes.
        let mut adapter = loaded(ScriptedEngine::new().with_buffer_bytes(4096));
        adapter.compute_audio_samples().unwrap();
        let view = adapter.audio_buffer().unwrap();
        assert_eq!(view.base(), BUFFER_OFFSET / 2);
        assert_eq!(view.len(), 2048);
        assert_eq!(view.frames(), 1024);
        assert_eq!(adapter.audio_buffer_length().unwrap(), 2048);
    }

    #[test]
    fn buffer_reads_decoder_memory() {
        let mut adapter = loaded(ScriptedEngine::new().with_buffer_bytes(8));
        adapter.compute_audio_samples().unwrap();
        let view = adapter.audio_buffer().unwrap();
        let expected = &adapter.engine().memory()[BUFFER_OFFSET..BUFFER_OFFSET + 8];
        assert_eq!(view.as_bytes(), expected);
    }

    #[test]
    fn odd_decoder_offset_is_flagged() {
        let adapter = loaded(ScriptedEngine::new().with_buffer_at(BUFFER_OFFSET + 1));
        assert!(matches!(
            adapter.audio_buffer(),
            Err(AdapterError::Misaligned { what: "offset", .. })
        ));
    }

    #[test]
    fn compute_maps_status() {
        let mut adapter = loaded(ScriptedEngine::new().with_compute_statuses(&[0, 1, -3]));
        assert_eq!(adapter.compute_audio_samples(), Ok(FrameStatus::Produced));
        assert_eq!(adapter.state(), AdapterState::Playing);
        assert_eq!(adapter.compute_audio_samples(), Ok(FrameStatus::Ended));
        assert_eq!(
            adapter.compute_audio_samples(),
            Err(AdapterError::DecodeFailed(-3))
        );
    }

    #[test]
    fn load_sets_equal_rates() {
        let adapter = loaded(ScriptedEngine::new());
        let rates = adapter.sample_rates().unwrap();
        assert_eq!((rates.output, rates.input), (44100, 44100));
        assert_eq!(
            adapter.engine().calls(),
            vec![Call::Init(44100, "/".into(), "song.d00".into())]
        );
    }

    #[test]
    fn failed_load_never_reaches_ready() {
        let mut adapter = AdPlugAdapter::new(ScriptedEngine::new().with_init_status(-1));
        let err = adapter
            .load_music_data(44100, "/", "bad.d00", &[], &TrackOptions::default())
            .unwrap_err();
        assert!(matches!(err, AdapterError::LoadFailed { status: -1, .. }));
        assert_eq!(adapter.state(), AdapterState::Unloaded);
        assert!(adapter.sample_rates().is_none());

        assert_eq!(adapter.compute_audio_samples(), Err(AdapterError::NotReady));
        assert_eq!(adapter.seek_playback_position(10), Err(AdapterError::NotReady));
        let mut info = SongInfo::default();
        assert_eq!(
            adapter.update_song_info("bad.d00", &mut info),
            Err(AdapterError::NotReady)
        );
        // Only the init call reached the decoder.
        assert_eq!(adapter.engine().calls().len(), 1);
    }

    #[test]
    fn repeated_teardown_calls_decoder_once() {
        let mut adapter = loaded(ScriptedEngine::new());
        adapter.teardown();
        adapter.teardown();
        adapter.teardown();
        assert_eq!(adapter.engine().count(|c| *c == Call::Teardown), 1);
        assert_eq!(adapter.state(), AdapterState::TornDown);
        assert_eq!(adapter.seek_playback_position(0), Err(AdapterError::TornDown));
        assert_eq!(adapter.engine().count(|c| matches!(c, Call::Seek(_))), 0);
    }

    #[test]
    fn teardown_without_load_is_safe() {
        let mut adapter = AdPlugAdapter::new(ScriptedEngine::new());
        adapter.teardown();
        adapter.teardown();
        assert_eq!(adapter.engine().calls(), vec![Call::Teardown]);
    }

    #[test]
    fn torn_down_adapter_refuses_to_load() {
        let mut adapter = loaded(ScriptedEngine::new());
        adapter.teardown();
        assert_eq!(
            adapter.load_music_data(44100, "/", "song.d00", &[], &TrackOptions::default()),
            Err(AdapterError::TornDown)
        );
        assert_eq!(adapter.engine().count(|c| matches!(c, Call::Init(..))), 1);
    }

    #[test]
    fn track_option_is_forwarded_verbatim() {
        let mut adapter = loaded(ScriptedEngine::new().with_subsong_status(0));
        let opts = TrackOptions::from_json(r#"{"track": 2}"#).unwrap();
        assert_eq!(adapter.eval_track_options(&opts, &mut NoTimeout), Ok(()));
        assert_eq!(adapter.engine().count(|c| *c == Call::SetSubsong(2)), 1);
    }

    #[test]
    fn subsong_status_is_returned_unchanged() {
        let mut adapter = loaded(ScriptedEngine::new().with_subsong_status(-1));
        let err = adapter
            .eval_track_options(&TrackOptions::with_track(9), &mut NoTimeout)
            .unwrap_err();
        assert_eq!(err, AdapterError::InvalidSubsong { index: 9, status: -1 });
        // No fallback to subsong 0.
        assert_eq!(
            adapter.engine().count(|c| matches!(c, Call::SetSubsong(_))),
            1
        );
    }

    #[test]
    fn empty_options_make_no_subsong_call() {
        let mut adapter = loaded(ScriptedEngine::new());
        let opts = TrackOptions::from_json("{}").unwrap();
        assert_eq!(adapter.eval_track_options(&opts, &mut NoTimeout), Ok(()));
        assert_eq!(
            adapter.engine().count(|c| matches!(c, Call::SetSubsong(_))),
            0
        );
    }

    #[test]
    fn timeout_goes_to_scheduler_not_decoder() {
        let mut adapter = loaded(ScriptedEngine::new());
        let mut scheduler = RecordingScheduler::default();
        let opts = TrackOptions::from_json(r#"{"timeout": 90000}"#).unwrap();
        adapter.eval_track_options(&opts, &mut scheduler).unwrap();
        assert_eq!(scheduler.0, Some(Duration::from_secs(90)));
        assert_eq!(adapter.engine().calls().len(), 1);
    }

    #[test]
    fn seek_is_passed_through_and_deterministic() {
        let mut adapter = loaded(ScriptedEngine::new().with_max_position(5000));
        let max = adapter.max_playback_position().unwrap();
        for pos in [0, 1200, 4999, 7000, -5] {
            adapter.seek_playback_position(pos).unwrap();
            let first = adapter.playback_position().unwrap();
            adapter.seek_playback_position(pos).unwrap();
            let second = adapter.playback_position().unwrap();
            assert_eq!(first, second);
            assert!((0..=max).contains(&first));
            assert_eq!(adapter.engine().count(|c| *c == Call::Seek(pos)), 2);
        }
    }

    #[test]
    fn song_info_uses_filename_for_empty_title() {
        let engine = ScriptedEngine::new().with_track_info(&["", "", "", "AdPlug", "6", "4"]);
        let mut adapter = loaded(engine);
        let mut info = SongInfo::default();
        adapter.update_song_info("song.mod", &mut info).unwrap();
        assert_eq!(info.title, "song.mod");
        assert_eq!(info.tracks, Some(4));
        assert_eq!(info.speed, Some(6));
        assert_eq!(info.player, "AdPlug");
    }

    #[test]
    fn splits_path_into_root_and_name() {
        let adapter = AdPlugAdapter::new(ScriptedEngine::new());
        assert_eq!(
            adapter.path_and_filename("music/adlib/intro.d00"),
            ("/".to_string(), "intro.d00".to_string())
        );
        assert_eq!(
            adapter.path_and_filename("intro.d00"),
            ("/".to_string(), "intro.d00".to_string())
        );
    }

    #[test]
    fn registers_into_engine_filesystem() {
        let mut adapter = AdPlugAdapter::new(ScriptedEngine::new());
        let (path, filename) = adapter.path_and_filename("a/b/c.rad");
        adapter.register_file_data(&path, &filename, b"RAD").unwrap();
        assert_eq!(adapter.engine().file("/c.rad"), Some(&b"RAD"[..]));
    }
}
