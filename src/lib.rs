//! Resolves detector proposals and OCR fragments into canonical licence plate strings.
//!
//! The detector and text reader are collaborators behind the [`Detector`] and
//! [`TextReader`] traits; everything in between (overlap suppression, fragment
//! filtering and text normalization) lives here as plain functions over
//! owned collections.

pub mod config;
pub mod dedup;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod replay;
pub mod resolve;
pub mod utils;
#[cfg(feature = "tensorflow-backend")]
pub mod tf;

pub use config::Settings;
pub use dedup::{ deduplicate, Deduplicator, RankKey, DEFAULT_IOU_THRESHOLD };
pub use error::{ LprError, LprErrorKind };
pub use geometry::{ iou, BBox };
pub use pipeline::{ Detector, Pipeline, PlateReading, TextReader };
pub use replay::Recording;
pub use resolve::{ normalize, resolve, Fragment, PlateTextResolver, NO_TEXT_DETECTED };
