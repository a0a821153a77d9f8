//! One-hot encoding of a mood selection into the joint category space.
//!
//! Joint slot layout:
//! - `0`: nothing selected
//! - one slot per named emotion, then per named event, then per named genre
//! - one slot per curated emotion + event pairing
//!
//! Selections that are not one of those canonical shapes fall back to a
//! single dimension by precedence emotion > event > genre. The genre still
//! reaches the recommendation query as its seed, so it is not lost.

use super::categories::{Emotion, Event, Genre};
use ndarray::Array1;
use std::fmt;

/// Emotion + event pairings that get a slot of their own.
pub const CURATED_PAIRINGS: [(Emotion, Event); 10] = [
    (Emotion::Happy, Event::Vacation),
    (Emotion::Sad, Event::Relaxation),
    (Emotion::Angry, Event::Workout),
    (Emotion::Calm, Event::Meditation),
    (Emotion::Excited, Event::Party),
    (Emotion::Calm, Event::BeachDay),
    (Emotion::Love, Event::Date),
    (Emotion::Excited, Event::Running),
    (Emotion::Calm, Event::Study),
    (Emotion::Nostalgic, Event::Roadtrip),
];

const EMOTION_OFFSET: usize = 1;
const EVENT_OFFSET: usize = EMOTION_OFFSET + Emotion::COUNT;
const GENRE_OFFSET: usize = EVENT_OFFSET + Event::COUNT;
const CURATED_OFFSET: usize = GENRE_OFFSET + Genre::COUNT;

/// Width of every [`CombinedEncoding`].
pub const JOINT_SPACE_SIZE: usize = CURATED_OFFSET + CURATED_PAIRINGS.len();

/// The (emotion, event, genre) triple picked by the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MoodSelection {
    pub emotion: Emotion,
    pub event: Event,
    pub genre: Genre,
}

impl MoodSelection {
    pub fn new(emotion: Emotion, event: Event, genre: Genre) -> Self {
        Self {
            emotion,
            event,
            genre,
        }
    }

    /// Slot of this selection in the joint category space.
    pub fn joint_index(&self) -> usize {
        if let Some(pos) = CURATED_PAIRINGS
            .iter()
            .position(|&(e, v)| e == self.emotion && v == self.event)
        {
            return CURATED_OFFSET + pos;
        }
        if !self.emotion.is_none() {
            EMOTION_OFFSET + self.emotion.code() - 1
        } else if !self.event.is_none() {
            EVENT_OFFSET + self.event.code() - 1
        } else if !self.genre.is_none() {
            GENRE_OFFSET + self.genre.code() - 1
        } else {
            0
        }
    }

    /// Canonical selection owning `slot`, or `None` when out of range.
    pub fn from_index(slot: usize) -> Option<Self> {
        let selection = match slot {
            0 => Self::default(),
            s if s < EVENT_OFFSET => Self {
                emotion: Emotion::from_code(s - EMOTION_OFFSET + 1)?,
                ..Self::default()
            },
            s if s < GENRE_OFFSET => Self {
                event: Event::from_code(s - EVENT_OFFSET + 1)?,
                ..Self::default()
            },
            s if s < CURATED_OFFSET => Self {
                genre: Genre::from_code(s - GENRE_OFFSET + 1)?,
                ..Self::default()
            },
            s if s < JOINT_SPACE_SIZE => {
                let (emotion, event) = CURATED_PAIRINGS[s - CURATED_OFFSET];
                Self {
                    emotion,
                    event,
                    genre: Genre::None,
                }
            }
            _ => return None,
        };
        Some(selection)
    }

    /// The curated pairings as selections, in slot order.
    pub fn curated() -> impl Iterator<Item = MoodSelection> {
        CURATED_PAIRINGS
            .iter()
            .map(|&(emotion, event)| MoodSelection::new(emotion, event, Genre::None))
    }

    pub fn encode(&self) -> CombinedEncoding {
        CombinedEncoding {
            slot: self.joint_index(),
        }
    }
}

impl fmt::Display for MoodSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "emotion={} event={} genre={}",
            self.emotion, self.event, self.genre
        )
    }
}

/// One-hot vector over the joint category space.
///
/// Only the hot slot is stored; the dense form is produced on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CombinedEncoding {
    slot: usize,
}

impl CombinedEncoding {
    /// Encoding with `slot` hot, or `None` when `slot` is outside the space.
    pub fn identity(slot: usize) -> Option<Self> {
        (slot < JOINT_SPACE_SIZE).then_some(Self { slot })
    }

    /// One identity encoding per slot, in slot order.
    pub fn all_identities() -> impl Iterator<Item = CombinedEncoding> {
        (0..JOINT_SPACE_SIZE).map(|slot| CombinedEncoding { slot })
    }

    pub fn hot_index(&self) -> usize {
        self.slot
    }

    pub fn len(&self) -> usize {
        JOINT_SPACE_SIZE
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn to_vec(&self) -> Vec<f32> {
        let mut values = vec![0.0; JOINT_SPACE_SIZE];
        values[self.slot] = 1.0;
        values
    }

    pub fn to_array(&self) -> Array1<f32> {
        let mut values = Array1::zeros(JOINT_SPACE_SIZE);
        values[self.slot] = 1.0;
        values
    }
}

/// Encode a triple. Total: every combination, `None`s included, has a slot.
pub fn combine(emotion: Emotion, event: Event, genre: Genre) -> CombinedEncoding {
    MoodSelection::new(emotion, event, genre).encode()
}
