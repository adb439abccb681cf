use log::debug;
use regex::Regex;
use serde::{ Deserialize, Serialize };

use crate::error::LprError;
use crate::geometry::{ polygon_height, polygon_left };

/// Returned when a region holds no usable text.
///
/// Lowercase on purpose, a canonical plate only ever holds `A-Z`, `0-9` and spaces.
pub const NO_TEXT_DETECTED: &str = "no text detected";
pub const DEFAULT_MIN_HEIGHT_RATIO: f32 = 0.5;
/// Inspection/expiry stamps printed on plates, e.g. `12.34`.
pub const EXPIRY_STAMP_PATTERN: &str = r"^\d{2}\.\d{2}$";

/// One span of text reported by the OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    /// quadrilateral in crop coordinates
    pub polygon: Vec<(f32, f32)>,
    #[serde(default)]
    pub confidence: f32,
}

impl Fragment {

    pub fn new(text: impl Into<String>, polygon: Vec<(f32, f32)>, confidence: f32) -> Self {
        Self { text: text.into(), polygon, confidence }
    }

    pub fn height(&self) -> f32 {
        polygon_height(&self.polygon)
    }
}

/// Turns the fragments of one plate region into a single canonical string.
#[derive(Debug, Clone)]
pub struct PlateTextResolver {
    min_height_ratio: f32,
    exclude: Vec<Regex>,
    reading_order: bool,
    no_text: String,
}

impl Default for PlateTextResolver {
    fn default() -> Self {
        Self {
            min_height_ratio: DEFAULT_MIN_HEIGHT_RATIO,
            exclude: Regex::new(EXPIRY_STAMP_PATTERN).into_iter().collect(),
            reading_order: false,
            no_text: NO_TEXT_DETECTED.to_string(),
        }
    }
}

impl PlateTextResolver {

    pub fn new(min_height_ratio: f32, exclude_patterns: &[String], reading_order: bool, no_text: impl Into<String>) -> Result<Self, LprError> {
        let exclude = exclude_patterns.iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { min_height_ratio, exclude, reading_order, no_text: no_text.into() })
    }

    pub fn no_text(&self) -> &str {
        &self.no_text
    }

    /// Canonical plate text, or the no-text sentinel.
    pub fn resolve(&self, fragments: &[Fragment]) -> String {
        self.try_resolve(fragments).unwrap_or_else(|| self.no_text.clone())
    }

    /// Canonical plate text, `None` when nothing usable survives.
    pub fn try_resolve(&self, fragments: &[Fragment]) -> Option<String> {
        let mut kept = self.filter(fragments);
        if kept.is_empty() {
            debug!("no fragment survived filtering ({} in)", fragments.len());
            return None;
        }
        if self.reading_order {
            kept.sort_by(|a, b| {
                polygon_left(&a.polygon)
                    .partial_cmp(&polygon_left(&b.polygon))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        let joined = kept.iter().map(|f| f.text.as_str()).collect::<Vec<_>>().join(" ");
        let canonical = normalize(&joined);
        debug!("resolved {:?} -> {:?}", joined, canonical);
        if canonical.is_empty() {
            None
        } else {
            Some(canonical)
        }
    }

    /// Height filter followed by the exclusion patterns, engine order kept.
    pub fn filter<'a>(&self, fragments: &'a [Fragment]) -> Vec<&'a Fragment> {
        let heights: Vec<f32> = fragments.iter().map(Fragment::height).collect();
        let max_height = heights.iter().copied().fold(0.0, f32::max);
        let min_height = self.min_height_ratio * max_height;
        fragments.iter()
            .zip(heights)
            .filter(|(_, h)| *h >= min_height)
            .map(|(f, _)| f)
            .filter(|f| !self.is_excluded(&f.text))
            .collect()
    }

    /// `$` also accepts one trailing newline, as OCR engines sometimes leave one.
    fn is_excluded(&self, text: &str) -> bool {
        let trimmed = text.strip_suffix('\n').unwrap_or(text);
        self.exclude.iter().any(|re| re.is_match(text) || re.is_match(trimmed))
    }
}

/// Uppercases, keeps only `A-Z0-9` and puts one space between letter and digit runs.
pub fn normalize(text: &str) -> String {
    let cleaned: Vec<char> = text.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect();

    let mut out = String::with_capacity(cleaned.len() * 2);
    for (i, c) in cleaned.iter().enumerate() {
        if i > 0 && cleaned[i - 1].is_ascii_digit() != c.is_ascii_digit() {
            out.push(' ');
        }
        out.push(*c);
    }
    out
}

/// Resolves with the default thresholds.
pub fn resolve(fragments: &[Fragment]) -> String {
    PlateTextResolver::default().resolve(fragments)
}
