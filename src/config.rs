use serde::Deserialize;

use std::fs;
use std::path::Path;

use crate::dedup::{ Deduplicator, RankKey, DEFAULT_IOU_THRESHOLD };
use crate::error::LprError;
use crate::resolve::{ normalize, PlateTextResolver, DEFAULT_MIN_HEIGHT_RATIO, EXPIRY_STAMP_PATTERN, NO_TEXT_DETECTED };

pub const CONFIG_ENV: &str = "PLATE_RESOLVER_CONFIG";
pub const IOU_THRESHOLD_ENV: &str = "PLATE_IOU_THRESHOLD";
pub const RANK_ENV: &str = "PLATE_RANK";

const DEFAULT_CONFIDENCE_WEIGHT: f32 = 0.5;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    dedup: Option<DedupFile>,
    resolver: Option<ResolverFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DedupFile {
    iou_threshold: Option<f32>,
    rank: Option<String>,
    confidence_weight: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ResolverFile {
    min_height_ratio: Option<f32>,
    exclude_patterns: Option<Vec<String>>,
    reading_order: Option<bool>,
    no_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub dedup: DedupSettings,
    pub resolver: ResolverSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DedupSettings {
    pub iou_threshold: f32,
    pub rank: String,
    pub confidence_weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    pub min_height_ratio: f32,
    pub exclude_patterns: Vec<String>,
    pub reading_order: bool,
    pub no_text: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_file(SettingsFile::default())
    }
}

impl Settings {

    /// Explicit path first, then `PLATE_RESOLVER_CONFIG`, then built-in defaults.
    /// Environment overrides are applied on top and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, LprError> {
        let env_path = std::env::var(CONFIG_ENV).ok();
        let path = path.or_else(|| env_path.as_deref().map(Path::new));
        let file = match path {
            Some(path) => read_config_file(path)?,
            None => SettingsFile::default(),
        };
        let mut settings = Self::from_file(file);
        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self, LprError> {
        let file: SettingsFile = toml::from_str(text)?;
        let settings = Self::from_file(file);
        settings.validate()?;
        Ok(settings)
    }

    fn from_file(file: SettingsFile) -> Self {
        let dedup = file.dedup.unwrap_or_default();
        let resolver = file.resolver.unwrap_or_default();
        Self {
            dedup: DedupSettings {
                iou_threshold: dedup.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
                rank: dedup.rank.unwrap_or_else(|| "area".to_string()),
                confidence_weight: dedup.confidence_weight.unwrap_or(DEFAULT_CONFIDENCE_WEIGHT),
            },
            resolver: ResolverSettings {
                min_height_ratio: resolver.min_height_ratio.unwrap_or(DEFAULT_MIN_HEIGHT_RATIO),
                exclude_patterns: resolver
                    .exclude_patterns
                    .unwrap_or_else(|| vec![EXPIRY_STAMP_PATTERN.to_string()]),
                reading_order: resolver.reading_order.unwrap_or(false),
                no_text: resolver.no_text.unwrap_or_else(|| NO_TEXT_DETECTED.to_string()),
            },
        }
    }

    fn apply_env(&mut self) -> Result<(), LprError> {
        if let Ok(raw) = std::env::var(IOU_THRESHOLD_ENV) {
            self.dedup.iou_threshold = raw
                .trim()
                .parse()
                .map_err(|_| LprError::config(format!("{} is not a number: {:?}", IOU_THRESHOLD_ENV, raw)))?;
        }
        if let Ok(raw) = std::env::var(RANK_ENV) {
            self.dedup.rank = raw.trim().to_string();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), LprError> {
        let iou = self.dedup.iou_threshold;
        if !(iou > 0.0 && iou <= 1.0) {
            return Err(LprError::config(format!("dedup.iou_threshold must be in (0, 1], got {}", iou)));
        }
        self.rank_key()?;
        let weight = self.dedup.confidence_weight;
        if !(0.0..=1.0).contains(&weight) {
            return Err(LprError::config(format!("dedup.confidence_weight must be in [0, 1], got {}", weight)));
        }
        let ratio = self.resolver.min_height_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(LprError::config(format!("resolver.min_height_ratio must be in [0, 1], got {}", ratio)));
        }
        // a sentinel that survives normalization unchanged could be mistaken for a plate
        let no_text = &self.resolver.no_text;
        if no_text.is_empty() || normalize(no_text) == *no_text {
            return Err(LprError::config(format!("resolver.no_text {:?} looks like a plate", no_text)));
        }
        self.resolver()?;
        Ok(())
    }

    pub fn rank_key(&self) -> Result<RankKey, LprError> {
        match self.dedup.rank.to_ascii_lowercase().as_str() {
            "area" => Ok(RankKey::Area),
            "confidence" => Ok(RankKey::Confidence),
            "weighted" => Ok(RankKey::Weighted { confidence_weight: self.dedup.confidence_weight }),
            other => Err(LprError::config(format!(
                "dedup.rank must be one of area, confidence, weighted; got {:?}",
                other
            ))),
        }
    }

    pub fn deduplicator(&self) -> Result<Deduplicator, LprError> {
        Ok(Deduplicator::new(self.dedup.iou_threshold, self.rank_key()?))
    }

    pub fn resolver(&self) -> Result<PlateTextResolver, LprError> {
        let r = &self.resolver;
        PlateTextResolver::new(r.min_height_ratio, &r.exclude_patterns, r.reading_order, r.no_text.clone())
    }
}

fn read_config_file(path: &Path) -> Result<SettingsFile, LprError> {
    let raw = fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}
