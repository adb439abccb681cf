//! Recorded collaborator output.
//!
//! A recording holds what a detector proposed for one image and what a text
//! reader returned for each region, so the pipeline can run without models.

use image::{ DynamicImage, GrayImage };
use serde::{ Deserialize, Serialize };

use std::fs::File;
use std::io::{ BufReader, Read };
use std::path::Path;
use std::sync::atomic::{ AtomicUsize, Ordering };

use crate::error::LprError;
use crate::geometry::BBox;
use crate::pipeline::{ Detector, TextReader };
use crate::resolve::Fragment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub width: u32,
    pub height: u32,
    pub proposals: Vec<BBox>,
    /// one fragment set per kept box, in deduplication order
    #[serde(default)]
    pub regions: Vec<Vec<Fragment>>,
}

impl Recording {

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LprError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, LprError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn blank_image(&self) -> DynamicImage {
        DynamicImage::new_luma8(self.width, self.height)
    }

    pub fn into_collaborators(self) -> (ReplayDetector, ReplayReader) {
        let detector = ReplayDetector { proposals: self.proposals };
        let reader = ReplayReader { regions: self.regions, next: AtomicUsize::new(0) };
        (detector, reader)
    }
}

pub struct ReplayDetector {
    proposals: Vec<BBox>,
}

impl Detector for ReplayDetector {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn detect(&self, _img: &DynamicImage) -> Result<Vec<BBox>, LprError> {
        Ok(self.proposals.clone())
    }
}

/// Hands out the recorded regions one call at a time.
pub struct ReplayReader {
    regions: Vec<Vec<Fragment>>,
    next: AtomicUsize,
}

impl TextReader for ReplayReader {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn read(&self, _plate: &GrayImage) -> Result<Vec<Fragment>, LprError> {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(self.regions.get(i).cloned().unwrap_or_default())
    }
}
