// src/config.rs
// Viewer tuning parameters shared by draping, picking and the overlay store
// RELEVANT FILES: src/picking/resolver.rs, src/picking/view_bounds.rs, src/drape/mod.rs

use serde::{Deserialize, Serialize};

use crate::budget::AllocationBudget;
use crate::error::{OverlayError, OverlayResult};

/// Tunable constants for one viewer world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Number of id tiles per axis encoded in one colour channel
    #[serde(default = "ViewerConfig::default_pick_division")]
    pub pick_division: u32,
    /// Target grid dimension for low resolution passes
    #[serde(default = "ViewerConfig::default_lorez_dimension")]
    pub lorez_dimension: usize,
    /// Target grid dimension for high resolution passes
    #[serde(default = "ViewerConfig::default_hirez_dimension")]
    pub hirez_dimension: usize,
    /// Base display offset applied to draped samples
    #[serde(default = "ViewerConfig::default_contour_offset")]
    pub contour_offset: f64,
    /// Multiplier on the contour offset for drape lines
    #[serde(default = "ViewerConfig::default_drape_offset_factor")]
    pub drape_offset_factor: f64,
    /// Growth chunk for entity storage
    #[serde(default = "ViewerConfig::default_alloc_chunk")]
    pub alloc_chunk: usize,
    /// Plots between view bounds refreshes
    #[serde(default = "ViewerConfig::default_bounds_frequency")]
    pub bounds_frequency: usize,
    /// Rows between interrupt polls during a draw pass
    #[serde(default = "ViewerConfig::default_event_check_coarseness")]
    pub event_check_coarseness: usize,
    /// Upper bound on samples in one drape polyline
    #[serde(default = "ViewerConfig::default_max_drape_samples")]
    pub max_drape_samples: usize,
    /// Upper bound on points per entity and entities per collection
    #[serde(default = "ViewerConfig::default_max_collection_points")]
    pub max_collection_points: usize,
}

impl ViewerConfig {
    const fn default_pick_division() -> u32 {
        15
    }

    const fn default_lorez_dimension() -> usize {
        100
    }

    const fn default_hirez_dimension() -> usize {
        500
    }

    const fn default_contour_offset() -> f64 {
        0.001
    }

    const fn default_drape_offset_factor() -> f64 {
        10.0
    }

    const fn default_alloc_chunk() -> usize {
        128
    }

    const fn default_bounds_frequency() -> usize {
        25
    }

    const fn default_event_check_coarseness() -> usize {
        5
    }

    const fn default_max_drape_samples() -> usize {
        1 << 20
    }

    const fn default_max_collection_points() -> usize {
        1 << 24
    }

    /// Allocation limits derived from this configuration.
    pub fn budget(&self) -> AllocationBudget {
        AllocationBudget {
            max_drape_samples: self.max_drape_samples,
            max_collection_points: self.max_collection_points,
        }
    }

    /// Parse a JSON document, filling absent fields with defaults.
    pub fn from_json_str(json: &str) -> OverlayResult<Self> {
        let config: ViewerConfig =
            serde_json::from_str(json).map_err(|e| OverlayError::config(e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> OverlayResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| OverlayError::config(e))
    }

    pub fn validate(&self) -> OverlayResult<()> {
        if self.pick_division == 0 || self.pick_division > 254 {
            return Err(OverlayError::config(format!(
                "pick_division must be in 1..=254, got {}",
                self.pick_division
            )));
        }
        if self.lorez_dimension == 0 || self.hirez_dimension == 0 {
            return Err(OverlayError::config(
                "lorez_dimension and hirez_dimension must be positive",
            ));
        }
        if self.lorez_dimension > self.hirez_dimension {
            return Err(OverlayError::config(format!(
                "lorez_dimension {} exceeds hirez_dimension {}",
                self.lorez_dimension, self.hirez_dimension
            )));
        }
        if self.alloc_chunk == 0 {
            return Err(OverlayError::config("alloc_chunk must be positive"));
        }
        if self.event_check_coarseness == 0 || self.bounds_frequency == 0 {
            return Err(OverlayError::config(
                "event_check_coarseness and bounds_frequency must be positive",
            ));
        }
        if self.max_drape_samples < 2 {
            return Err(OverlayError::config("max_drape_samples must be at least 2"));
        }
        if self.max_collection_points == 0 {
            return Err(OverlayError::config("max_collection_points must be positive"));
        }
        Ok(())
    }

    /// Offset added to every drape sample's display position.
    pub fn drape_offset(&self) -> f64 {
        self.drape_offset_factor * self.contour_offset
    }

    /// Number of quantisation steps per colour channel (`N + 1`).
    pub fn pick_levels(&self) -> f64 {
        f64::from(self.pick_division) + 1.0
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            pick_division: Self::default_pick_division(),
            lorez_dimension: Self::default_lorez_dimension(),
            hirez_dimension: Self::default_hirez_dimension(),
            contour_offset: Self::default_contour_offset(),
            drape_offset_factor: Self::default_drape_offset_factor(),
            alloc_chunk: Self::default_alloc_chunk(),
            bounds_frequency: Self::default_bounds_frequency(),
            event_check_coarseness: Self::default_event_check_coarseness(),
            max_drape_samples: Self::default_max_drape_samples(),
            max_collection_points: Self::default_max_collection_points(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pick_division, 15);
        assert!((config.drape_offset() - 0.01).abs() < 1e-12);
        assert!((config.pick_levels() - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ViewerConfig::from_json_str(r#"{ "hirez_dimension": 250 }"#).unwrap();
        assert_eq!(config.hirez_dimension, 250);
        assert_eq!(config.lorez_dimension, 100);
        assert_eq!(config.alloc_chunk, 128);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = ViewerConfig::from_json_str(r#"{ "pick_division": 0 }"#).unwrap_err();
        assert_eq!(err.category(), "Config");

        let config = ViewerConfig {
            lorez_dimension: 600,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_budget_mirrors_limits() {
        let config = ViewerConfig {
            max_drape_samples: 64,
            max_collection_points: 8,
            ..Default::default()
        };
        let budget = config.budget();
        assert_eq!(budget.max_drape_samples, 64);
        assert_eq!(budget.max_collection_points, 8);
    }
}
