//! Mood categories and their combined one-hot encoding.

mod categories;
mod encoder;

pub use categories::{Emotion, Event, Genre, UnknownCategory};
pub use encoder::{combine, CombinedEncoding, MoodSelection, CURATED_PAIRINGS, JOINT_SPACE_SIZE};
