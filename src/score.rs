pub mod client;
pub mod model;

pub use client::{ScoreClient, ScoreError};
pub use model::{NormalizedScore, RawScore, Tier};
