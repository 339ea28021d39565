//! "Unavailable" screen detection
//!
//! The playback monitor only depends on [`UnavailableDetector`]; the
//! reference-pattern matcher below is one implementation of it.

use crate::config::DetectorConfig;
use crate::error::{Error, Result};
use crate::playback::matcher::{self, PreparedTemplate};
use image::GrayImage;
use std::path::Path;
use tracing::{debug, info, warn};

/// A detected unplayable state
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Reference pattern that matched
    pub pattern: String,
    pub score: f32,
}

/// Decides whether a region of interest shows an unplayable state
pub trait UnavailableDetector: Send + Sync {
    fn detect(&self, roi: &GrayImage) -> Result<Option<Detection>>;
}

/// A grayscale image of one known failure banner
#[derive(Debug, Clone)]
pub struct ReferencePattern {
    pub name: String,
    pub image: GrayImage,
}

impl ReferencePattern {
    pub fn new(name: impl Into<String>, image: GrayImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    /// Load a pattern image from disk, converting it to grayscale
    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self> {
        let image = image::open(path)
            .map_err(|e| Error::Config(format!("failed to load pattern {}: {}", path.display(), e)))?
            .to_luma8();
        Ok(Self::new(name, image))
    }
}

struct PreparedPattern {
    name: String,
    template: PreparedTemplate,
}

/// Template matcher over a fixed, read-only pattern set
pub struct TemplateDetector {
    patterns: Vec<PreparedPattern>,
    threshold: f32,
    match_scale: f32,
}

impl TemplateDetector {
    /// Build from in-memory patterns
    ///
    /// Patterns are downscaled by `match_scale` once here; ROIs are scaled the
    /// same way on every tick. Untextured patterns are dropped with a warning.
    pub fn new(patterns: Vec<ReferencePattern>, threshold: f32, match_scale: f32) -> Self {
        let patterns = patterns
            .into_iter()
            .filter_map(|pattern| {
                let scaled = matcher::downscale(&pattern.image, match_scale);
                match PreparedTemplate::new(&scaled) {
                    Some(template) => Some(PreparedPattern {
                        name: pattern.name,
                        template,
                    }),
                    None => {
                        warn!("Pattern '{}' is empty or flat, ignoring it", pattern.name);
                        None
                    }
                }
            })
            .collect();

        Self {
            patterns,
            threshold,
            match_scale,
        }
    }

    /// Load every configured pattern from disk
    ///
    /// Missing files are fatal at startup: running without the reference
    /// set would never detect anything.
    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        let patterns = config
            .patterns
            .iter()
            .map(|p| ReferencePattern::load(p.name.clone(), &p.path))
            .collect::<Result<Vec<_>>>()?;

        let detector = Self::new(patterns, config.threshold, config.match_scale);
        info!(
            "Loaded {} reference patterns (threshold {:.2}, scale {:.2})",
            detector.pattern_count(),
            config.threshold,
            config.match_scale
        );
        Ok(detector)
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

impl UnavailableDetector for TemplateDetector {
    fn detect(&self, roi: &GrayImage) -> Result<Option<Detection>> {
        let roi = matcher::downscale(roi, self.match_scale);

        for pattern in &self.patterns {
            let Some(score) = matcher::best_match(&roi, &pattern.template) else {
                debug!("Pattern '{}' larger than ROI, skipped", pattern.name);
                continue;
            };

            if score >= self.threshold {
                return Ok(Some(Detection {
                    pattern: pattern.name.clone(),
                    score,
                }));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternConfig;
    use image::{imageops, Luma};

    fn banner(seed: u32) -> GrayImage {
        GrayImage::from_fn(40, 16, |x, y| {
            let v = (x.wrapping_mul(73) ^ y.wrapping_mul(151) ^ seed.wrapping_mul(7919))
                .wrapping_mul(2_654_435_761)
                >> 24;
            Luma([v as u8])
        })
    }

    fn screen_with(patch: Option<&GrayImage>) -> GrayImage {
        let mut screen = GrayImage::from_fn(160, 120, |x, y| Luma([((x / 20 + y / 20) % 2 * 40) as u8]));
        if let Some(patch) = patch {
            imageops::replace(&mut screen, patch, 60, 50);
        }
        screen
    }

    #[test]
    fn test_detects_pattern_present() {
        let detector = TemplateDetector::new(
            vec![
                ReferencePattern::new("not_available", banner(1)),
                ReferencePattern::new("not_old_enough", banner(2)),
            ],
            0.8,
            1.0,
        );

        let roi = screen_with(Some(&banner(2)));
        let detection = detector.detect(&roi).unwrap().unwrap();
        assert_eq!(detection.pattern, "not_old_enough");
        assert!(detection.score >= 0.8);
    }

    #[test]
    fn test_clean_screen_not_detected() {
        let detector =
            TemplateDetector::new(vec![ReferencePattern::new("not_available", banner(1))], 0.8, 1.0);
        assert!(detector.detect(&screen_with(None)).unwrap().is_none());
    }

    #[test]
    fn test_flat_pattern_dropped() {
        let detector = TemplateDetector::new(
            vec![
                ReferencePattern::new("flat", GrayImage::from_pixel(10, 10, Luma([9]))),
                ReferencePattern::new("banner", banner(3)),
            ],
            0.8,
            1.0,
        );
        assert_eq!(detector.pattern_count(), 1);
    }

    #[test]
    fn test_pattern_larger_than_roi_is_skipped() {
        let detector =
            TemplateDetector::new(vec![ReferencePattern::new("big", banner(4))], 0.8, 1.0);
        let tiny = GrayImage::new(8, 8);
        assert!(detector.detect(&tiny).unwrap().is_none());
    }

    #[test]
    fn test_from_config_loads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_available.png");
        banner(5).save(&path).unwrap();

        let config = DetectorConfig {
            patterns: vec![PatternConfig {
                name: "not_available".to_string(),
                path,
            }],
            match_scale: 1.0,
            ..DetectorConfig::default()
        };

        let detector = TemplateDetector::from_config(&config).unwrap();
        assert_eq!(detector.pattern_count(), 1);
        assert!(detector.detect(&screen_with(Some(&banner(5)))).unwrap().is_some());
    }

    #[test]
    fn test_from_config_missing_file_is_error() {
        let config = DetectorConfig {
            patterns: vec![PatternConfig {
                name: "missing".to_string(),
                path: "/nonexistent/missing.png".into(),
            }],
            ..DetectorConfig::default()
        };
        assert!(matches!(TemplateDetector::from_config(&config), Err(Error::Config(_))));
    }
}
