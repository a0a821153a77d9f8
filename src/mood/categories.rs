//! Closed category sets for the three mood dimensions.
//!
//! Every set has a `None` sentinel at code 0 meaning "dimension unused".
//! Codes are the declaration order, so `ALL[code] == variant` always holds.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a category name does not match any variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind} '{value}'")]
pub struct UnknownCategory {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! category_set {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $slug:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            #[default]
            None,
            $($variant),+
        }

        impl $name {
            /// Every variant, `None` first, in code order.
            pub const ALL: &'static [$name] = &[$name::None, $($name::$variant),+];

            /// Number of named variants (the `None` sentinel excluded).
            pub const COUNT: usize = Self::ALL.len() - 1;

            pub fn code(self) -> usize {
                self as usize
            }

            pub fn from_code(code: usize) -> Option<Self> {
                Self::ALL.get(code).copied()
            }

            pub fn is_none(self) -> bool {
                self == $name::None
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $name::None => "none",
                    $($name::$variant => $slug),+
                }
            }

            /// Named variants only, in code order.
            pub fn named() -> impl Iterator<Item = $name> {
                Self::ALL[1..].iter().copied()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownCategory;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| UnknownCategory {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

category_set! {
    /// How the listener feels.
    Emotion, "emotion" {
        Happy => "happy",
        Sad => "sad",
        Angry => "angry",
        Calm => "calm",
        Excited => "excited",
        Love => "love",
        Nostalgic => "nostalgic",
        Guilty => "guilty",
        Anxious => "anxious",
        Bored => "bored",
        Confident => "confident",
        Content => "content",
        Energetic => "energetic",
        Fearful => "fearful",
        Grateful => "grateful",
        Hopeful => "hopeful",
        Lonely => "lonely",
        Melancholy => "melancholy",
        Motivated => "motivated",
        Relaxed => "relaxed",
    }
}

category_set! {
    /// What the listener is doing.
    Event, "event" {
        Vacation => "vacation",
        Relaxation => "relaxation",
        Workout => "workout",
        Meditation => "meditation",
        Party => "party",
        BeachDay => "beach-day",
        Date => "date",
        Running => "running",
        Study => "study",
        Roadtrip => "roadtrip",
        Birthday => "birthday",
        Breakup => "breakup",
        Commute => "commute",
        Cooking => "cooking",
        Dinner => "dinner",
        Gaming => "gaming",
        Graduation => "graduation",
        Sleep => "sleep",
        Wedding => "wedding",
        Work => "work",
    }
}

category_set! {
    /// Musical genre. Names double as recommendation seed genres.
    Genre, "genre" {
        Acoustic => "acoustic",
        Afrobeat => "afrobeat",
        AltRock => "alt-rock",
        Ambient => "ambient",
        Blues => "blues",
        Bossanova => "bossanova",
        Chill => "chill",
        Classical => "classical",
        Country => "country",
        Dance => "dance",
        DeepHouse => "deep-house",
        Disco => "disco",
        DrumAndBass => "drum-and-bass",
        Dubstep => "dubstep",
        Edm => "edm",
        Electronic => "electronic",
        Emo => "emo",
        Folk => "folk",
        Funk => "funk",
        Gospel => "gospel",
        Grunge => "grunge",
        HardRock => "hard-rock",
        HeavyMetal => "heavy-metal",
        HipHop => "hip-hop",
        House => "house",
        Indie => "indie",
        JPop => "j-pop",
        Jazz => "jazz",
        KPop => "k-pop",
        Latin => "latin",
        Metal => "metal",
        Opera => "opera",
        Piano => "piano",
        Pop => "pop",
        Punk => "punk",
        RnB => "r-n-b",
        Reggae => "reggae",
        Reggaeton => "reggaeton",
        Rock => "rock",
        Salsa => "salsa",
        Samba => "samba",
        SingerSongwriter => "singer-songwriter",
        Ska => "ska",
        Soul => "soul",
        Soundtracks => "soundtracks",
        SynthPop => "synth-pop",
        Tango => "tango",
        Techno => "techno",
        Trance => "trance",
        WorldMusic => "world-music",
    }
}

impl Genre {
    /// Seed genre slug understood by the recommendation endpoint.
    pub fn seed(self) -> Option<&'static str> {
        if self.is_none() {
            None
        } else {
            Some(self.as_str())
        }
    }
}
