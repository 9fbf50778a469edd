mod builder;
mod models;

pub use builder::{CHANNEL_REGEX, Twitch};
