#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod assets;
pub mod badge;
pub mod config;
pub mod dom;
pub mod encode;
pub mod engine;
pub mod observability;
pub(crate) mod page;
pub mod score;

pub use assets::{AssetError, AssetLoader, DependencyState, RenderAssets};
pub use badge::{BadgeController, ClickTarget, OverlayVisibility, Phase};
pub use config::{ChartStyle, ConfigError, EmbedConfig, IconSet, OverlayMode};
pub use dom::{HostPage, PageReady};
pub use encode::{ArcPair, Metric, MetricSegment, SCALE_MAX, VisualEncoding, encode};
pub use engine::EmbedEngine;
pub use score::client::{ScoreClient, ScoreError};
pub use score::model::{NormalizedScore, RawScore, Tier};
