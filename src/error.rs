use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("decoder failed to load {path}{filename} (status {status})")]
    LoadFailed {
        status: i32,
        path: String,
        filename: String,
    },

    #[error("decoder failed to produce a frame (status {0})")]
    DecodeFailed(i32),

    #[error("decoder rejected subsong {index} (status {status})")]
    InvalidSubsong { index: i32, status: i32 },

    #[error("no song is loaded")]
    NotReady,

    #[error("adapter has been torn down")]
    TornDown,

    #[error("raw {what} {raw} is not aligned to the {unit}-byte sample unit")]
    Misaligned {
        what: &'static str,
        raw: usize,
        unit: usize,
    },

    #[error("buffer of {len} samples does not split into {channels} channels")]
    PartialFrame { len: usize, channels: u16 },

    #[error("region {start}..{end} lies outside decoder memory of {size} bytes")]
    OutOfBounds { start: usize, end: usize, size: usize },

    #[error("string at {0:#x} is not NUL-terminated")]
    UnterminatedString(usize),

    #[error("unsupported pointer width {0}")]
    PointerWidth(usize),

    #[error("could not register {0}")]
    Registration(String),
}

pub type Result<T> = std::result::Result<T, AdapterError>;
