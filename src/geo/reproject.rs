// src/geo/reproject.rs
// PROJ-backed map projections (feature-gated)
// RELEVANT FILES: src/geo/mod.rs, src/geo/projection.rs

use thiserror::Error;

/// Error type for geographic operations
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    #[error("PROJ feature not enabled")]
    ProjNotAvailable,
}

/// Map projection between WGS84 lon/lat and a projected CRS.
#[cfg(feature = "proj")]
pub struct ProjTransform {
    crs: String,
    to_projected: proj::Proj,
    to_geographic: proj::Proj,
}

#[cfg(feature = "proj")]
impl ProjTransform {
    /// Build forward and inverse transforms for `crs` (EPSG code or PROJ string).
    pub fn new(crs: &str) -> Result<Self, GeoError> {
        use proj::Proj;

        let to_projected = Proj::new_known_crs("EPSG:4326", crs, None)
            .map_err(|e| GeoError::InvalidCrs(format!("{}: {}", crs, e)))?;
        let to_geographic = Proj::new_known_crs(crs, "EPSG:4326", None)
            .map_err(|e| GeoError::InvalidCrs(format!("{}: {}", crs, e)))?;
        Ok(Self {
            crs: crs.to_string(),
            to_projected,
            to_geographic,
        })
    }
}

#[cfg(feature = "proj")]
impl std::fmt::Debug for ProjTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjTransform").field("crs", &self.crs).finish()
    }
}

#[cfg(feature = "proj")]
impl super::projection::MapProjection for ProjTransform {
    fn id(&self) -> &str {
        &self.crs
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), GeoError> {
        if lat > 90.0 {
            log::warn!("forward projection with invalid latitude: lon {} lat {}", lon, lat);
        }
        self.to_projected
            .convert((lon, lat))
            .map_err(|e| GeoError::Projection(format!("Transform failed at ({}, {}): {}", lon, lat, e)))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), GeoError> {
        self.to_geographic
            .convert((x, y))
            .map_err(|e| GeoError::Projection(format!("Transform failed at ({}, {}): {}", x, y, e)))
    }
}

/// Stub for when proj feature is disabled
#[cfg(not(feature = "proj"))]
#[derive(Debug)]
pub struct ProjTransform {
    _private: (),
}

#[cfg(not(feature = "proj"))]
impl ProjTransform {
    pub fn new(_crs: &str) -> Result<Self, GeoError> {
        Err(GeoError::ProjNotAvailable)
    }
}
