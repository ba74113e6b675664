use thiserror::Error;

use crate::types::Rect;

#[derive(Error, Debug)]
pub enum ShapeBlurError {
    #[error(
        "input buffer must be a {height}x{width}x3 byte array; got {channels} channels and {len} bytes"
    )]
    InvalidInputShape {
        height: u32,
        width: u32,
        channels: u32,
        len: usize,
    },

    #[error("rectangle {rect:?} is out of bounds for a {width}x{height} image")]
    InvalidRectangle { rect: Rect, width: u32, height: u32 },

    #[error("blur kernel size must be an odd positive integer, got {0}")]
    InvalidBlurKernel(u32),

    #[error("no compatible GPU device available: {0}")]
    DeviceUnavailable(String),
}

pub type Result<T> = std::result::Result<T, ShapeBlurError>;
