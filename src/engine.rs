use crate::vfs::FileRegistry;

/// Status returned by `init` and `set_subsong` on success.
pub const STATUS_OK: i32 = 0;

/// The C-style surface exported by a decoder engine.
pub trait DecoderEngine {
    fn memory(&self) -> &[u8];

    fn files(&mut self) -> &mut dyn FileRegistry;

    fn init(&mut self, sample_rate: u32, path: &str, filename: &str) -> i32;

    fn get_audio_buffer(&self) -> usize;

    fn get_audio_buffer_length(&self) -> usize;

    /// `0` when a frame was produced, positive once the track has ended,
    /// negative on a decode failure.
    fn compute_audio_samples(&mut self) -> i32;

    fn get_max_position(&self) -> i32;

    fn get_current_position(&self) -> i32;

    fn seek_position(&mut self, pos: i32);

    fn set_subsong(&mut self, index: i32) -> i32;

    /// Refreshes the track-info scratch area and returns the offset of its
    /// pointer table.
    fn get_track_info(&mut self) -> usize;

    fn teardown(&mut self);
}
