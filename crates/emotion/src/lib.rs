pub mod bits;
pub mod bytes;
pub mod config;
pub mod emotion_engine;
