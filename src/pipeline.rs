use image::{ DynamicImage, GenericImageView, GrayImage };
use log::{ debug, warn };
use serde::Serialize;

use crate::dedup::Deduplicator;
use crate::error::LprError;
use crate::geometry::BBox;
use crate::resolve::{ Fragment, PlateTextResolver };
use crate::utils;

/// Proposes plate regions in a whole image.
pub trait Detector {
    fn name(&self) -> &'static str;

    fn detect(&self, img: &DynamicImage) -> Result<Vec<BBox>, LprError>;
}

/// Reads text fragments out of one grayscale plate crop.
pub trait TextReader {
    fn name(&self) -> &'static str;

    fn read(&self, plate: &GrayImage) -> Result<Vec<Fragment>, LprError>;
}

/// One kept box and the text resolved inside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateReading {
    pub bbox: BBox,
    pub text: String,
    detected: bool,
}

impl PlateReading {
    /// false when `text` is the no-text sentinel
    pub fn is_detected(&self) -> bool {
        self.detected
    }
}

pub struct Pipeline<D, R> {
    detector: D,
    reader: R,
    dedup: Deduplicator,
    resolver: PlateTextResolver,
}

impl<D: Detector, R: TextReader> Pipeline<D, R> {

    pub fn new(detector: D, reader: R) -> Self {
        Self::with_parts(detector, reader, Deduplicator::default(), PlateTextResolver::default())
    }

    pub fn with_parts(detector: D, reader: R, dedup: Deduplicator, resolver: PlateTextResolver) -> Self {
        Self { detector, reader, dedup, resolver }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Recognize one image
    ///
    /// Readings come back in the order the deduplicator kept the boxes.
    pub fn recognize(&self, img: &DynamicImage) -> Result<Vec<PlateReading>, LprError> {
        let proposals = self.detector.detect(img)?;
        debug!("{} proposed {} boxes", self.detector.name(), proposals.len());
        let kept = self.dedup.deduplicate(&proposals);

        let mut readings = Vec::with_capacity(kept.len());
        for a_box in kept {
            let resolved = match utils::crop_gray(img, &a_box) {
                Some(plate) => {
                    let fragments = self.reader.read(&plate)?;
                    debug!("{} read {} fragments in {:?}", self.reader.name(), fragments.len(), plate.dimensions());
                    self.resolver.try_resolve(&fragments)
                }
                None => {
                    warn!("box {:?} lies outside the {:?} image, skipping text", a_box, img.dimensions());
                    None
                }
            };
            let reading = match resolved {
                Some(text) => PlateReading { bbox: a_box, text, detected: true },
                None => PlateReading { bbox: a_box, text: self.resolver.no_text().to_string(), detected: false },
            };
            readings.push(reading);
        }
        Ok(readings)
    }
}
