pub mod default;
pub mod error;
pub mod hls_extractor;
pub mod platforms;
mod utils;
