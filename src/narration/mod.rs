pub mod chunk;
pub mod controller;
pub mod rate;

pub use chunk::split_into_chunks;
pub use controller::{NarrationController, NarrationSnapshot, PlaybackState, SkipDirection};
pub use rate::Rate;
