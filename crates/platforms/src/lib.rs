//! Platform extraction for rekoda.
//!
//! Turns a channel handle into a playlist URL the recorder can poll directly.

pub mod extractor;
pub mod media;

pub use extractor::default::default_client;
pub use extractor::error::ExtractorError;
pub use extractor::platforms::twitch::Twitch;
pub use media::quality::Quality;
