//! Shared constants for end-to-end tests

#![allow(dead_code)]

/// Header of every fixture training table.
pub const TABLE_HEADER: &str = "label,acousticness,danceability,energy,instrumentalness,key,liveness,loudness,mode,speechiness,tempo,time_signature,valence";

/// Features of the single-row Happy + Vacation fixture.
pub const HAPPY_VACATION_FEATURES: [f64; 12] =
    [0.5, 0.5, 0.5, 0.5, 5.0, 0.5, -30.0, 1.0, 0.5, 150.0, 4.0, 0.5];

/// File name fixture tables are written under.
pub const TABLE_FILE: &str = "items.csv";

pub const STUB_CLIENT_ID: &str = "test-client";
pub const STUB_CLIENT_SECRET: &str = "test-secret";
pub const STUB_ACCESS_TOKEN: &str = "stub-access-token";
