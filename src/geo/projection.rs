// src/geo/projection.rs
// Grid <-> geographic <-> display coordinate conversions for one window
// RELEVANT FILES: src/geo/great_circle.rs, src/geo/reproject.rs, src/overlay/window.rs

use std::fmt;
use std::rc::Rc;

use glam::{DMat3, DVec3};

use super::great_circle::{self, SPHEROID_RADIUS};
use super::reproject::GeoError;
use crate::grid::TerrainGrid;

/// Half-width of the canonical display volume.
pub const DISPLAY_WIDTH: f64 = 3.0;

const DTR: f64 = std::f64::consts::PI / 180.0;
const RTD: f64 = 180.0 / std::f64::consts::PI;

/// Result type for projection operations
pub type GeoResult<T> = Result<T, GeoError>;

/// A planar map projection between lon/lat degrees and metres.
pub trait MapProjection: fmt::Debug {
    /// Identifier used to detect grids already in the display projection.
    fn id(&self) -> &str;
    fn forward(&self, lon: f64, lat: f64) -> GeoResult<(f64, f64)>;
    fn inverse(&self, x: f64, y: f64) -> GeoResult<(f64, f64)>;
}

/// Equirectangular metres around a reference position.
#[derive(Debug, Clone)]
pub struct LocalProjection {
    id: String,
    lon0: f64,
    lat0: f64,
    deg_per_m_lon: f64,
    deg_per_m_lat: f64,
}

impl LocalProjection {
    pub fn new(lon0: f64, lat0: f64) -> Self {
        let (deg_per_m_lon, deg_per_m_lat) = great_circle::degrees_per_metre(lat0);
        Self {
            id: format!("local:{:.6},{:.6}", lon0, lat0),
            lon0,
            lat0,
            deg_per_m_lon,
            deg_per_m_lat,
        }
    }
}

impl MapProjection for LocalProjection {
    fn id(&self) -> &str {
        &self.id
    }

    fn forward(&self, lon: f64, lat: f64) -> GeoResult<(f64, f64)> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::Projection(format!("latitude {} out of range", lat)));
        }
        Ok((
            (lon - self.lon0) / self.deg_per_m_lon,
            (lat - self.lat0) / self.deg_per_m_lat,
        ))
    }

    fn inverse(&self, x: f64, y: f64) -> GeoResult<(f64, f64)> {
        Ok((
            self.lon0 + x * self.deg_per_m_lon,
            self.lat0 + y * self.deg_per_m_lat,
        ))
    }
}

/// How grid coordinates relate to lon/lat.
#[derive(Debug, Clone)]
pub enum GridProjection {
    /// Grid x/y are longitude/latitude degrees
    Geographic,
    /// Grid x/y are metres in a map projection
    Projected(Rc<dyn MapProjection>),
}

/// How a window maps lon/lat to its display space.
#[derive(Debug, Clone)]
pub enum DisplayProjection {
    /// Longitude/latitude scaled to metres at the grid centre
    Geographic,
    /// Map projection metres
    Projected(Rc<dyn MapProjection>),
    /// Display directly in the (projected) grid coordinates
    AlreadyProjected,
    /// Rotated sphere with the grid centre on the +z axis
    Spheroid,
}

impl DisplayProjection {
    pub fn is_spheroid(&self) -> bool {
        matches!(self, DisplayProjection::Spheroid)
    }
}

/// Projector construction settings.
#[derive(Debug, Clone, Copy)]
pub struct ProjectorConfig {
    /// Vertical exaggeration
    pub exaggeration: f64,
    /// Viewport width / height
    pub aspect_ratio: f64,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            exaggeration: 1.0,
            aspect_ratio: 1.0,
        }
    }
}

/// Rotation frame placing a reference position on the +z axis.
#[derive(Debug, Clone, Copy)]
struct SphereFrame {
    forward: DMat3,
    reverse: DMat3,
    reference: DVec3,
}

impl SphereFrame {
    fn identity() -> Self {
        Self {
            forward: DMat3::IDENTITY,
            reverse: DMat3::IDENTITY,
            reference: DVec3::ZERO,
        }
    }

    /// Euler z-x-z rotation taking (lon, lat) to the +z axis.
    fn new(lon: f64, lat: f64, earth_centered: bool) -> Self {
        let phi = DTR * lon - 0.5 * std::f64::consts::PI;
        let theta = DTR * lat - 0.5 * std::f64::consts::PI;
        let psi = std::f64::consts::PI;
        let (sphi, cphi) = phi.sin_cos();
        let (stheta, ctheta) = theta.sin_cos();
        let (spsi, cpsi) = psi.sin_cos();
        let rows = [
            cphi * cpsi - sphi * ctheta * spsi,
            sphi * cpsi + cphi * ctheta * spsi,
            stheta * spsi,
            -cphi * spsi - sphi * ctheta * cpsi,
            -sphi * spsi + cphi * ctheta * cpsi,
            stheta * cpsi,
            sphi * stheta,
            -cphi * stheta,
            ctheta,
        ];
        // rows are stored row-major; glam wants columns
        let forward = DMat3::from_cols_array(&rows).transpose();
        let mut frame = Self {
            forward,
            reverse: forward.transpose(),
            reference: DVec3::ZERO,
        };
        if !earth_centered {
            frame.reference = frame.to_cartesian(lon, lat);
        }
        frame
    }

    fn to_cartesian(&self, lon: f64, lat: f64) -> DVec3 {
        let (slon, clon) = (DTR * lon).sin_cos();
        let (slat, clat) = (DTR * lat).sin_cos();
        let unrotated = DVec3::new(
            SPHEROID_RADIUS * clon * clat,
            SPHEROID_RADIUS * slon * clat,
            SPHEROID_RADIUS * slat,
        );
        self.forward * unrotated
    }

    fn to_lonlat(&self, v: DVec3) -> (f64, f64) {
        let u = self.reverse * v;
        let lon = RTD * u.y.atan2(u.x);
        let lat = 90.0 - RTD * (u.x * u.x + u.y * u.y).sqrt().atan2(u.z);
        (lon, lat)
    }
}

/// A grid position projected into lon/lat and display space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub lon: f64,
    pub lat: f64,
    pub display: DVec3,
}

/// Lateral distance, distance over ground and slope between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistanceInfo {
    pub lateral: f64,
    pub over_ground: f64,
    pub slope: f64,
}

/// Per-window coordinate projector.
#[derive(Debug, Clone)]
pub struct Projector {
    grid: GridProjection,
    display: DisplayProjection,
    grid_xmin: f64,
    grid_xmax: f64,
    exaggeration: f64,
    zmid: f64,
    scale: f64,
    origin: DVec3,
    deg_per_m: (f64, f64),
    sphere: SphereFrame,
    earth_centered: bool,
    extent: [f64; 4],
}

impl Projector {
    /// Set up scale, origin and any spheroid frame so `terrain` fills the display volume.
    pub fn new(
        grid: GridProjection,
        display: DisplayProjection,
        terrain: &TerrainGrid,
        config: &ProjectorConfig,
    ) -> GeoResult<Self> {
        if matches!(display, DisplayProjection::AlreadyProjected)
            && matches!(grid, GridProjection::Geographic)
        {
            return Err(GeoError::InvalidCrs(
                "already-projected display requires a projected grid".into(),
            ));
        }
        if !(config.aspect_ratio > 0.0) {
            return Err(GeoError::Projection(format!(
                "aspect ratio must be positive, got {}",
                config.aspect_ratio
            )));
        }

        let (zlo, zhi) = terrain.z_range();
        let zmid = 0.5 * (f64::from(zlo) + f64::from(zhi));
        let exaggeration = config.exaggeration;

        let mut projector = Self {
            grid,
            display,
            grid_xmin: terrain.xmin(),
            grid_xmax: terrain.xmax(),
            exaggeration,
            zmid,
            scale: 1.0,
            origin: DVec3::ZERO,
            deg_per_m: (1.0, 1.0),
            sphere: SphereFrame::identity(),
            earth_centered: false,
            extent: [0.0; 4],
        };

        let (lonmin, latmin) = projector.grid_to_lonlat(terrain.xmin(), terrain.ymin())?;
        let (lonmax, latmax) = projector.grid_to_lonlat(terrain.xmax(), terrain.ymax())?;
        let lonmid = 0.5 * (lonmin + lonmax);
        let latmid = 0.5 * (latmin + latmax);

        let extent = match &projector.display {
            DisplayProjection::AlreadyProjected => {
                projector.origin = DVec3::new(
                    0.5 * (terrain.xmin() + terrain.xmax()),
                    0.5 * (terrain.ymin() + terrain.ymax()),
                    exaggeration * zmid,
                );
                [terrain.xmin(), terrain.xmax(), terrain.ymin(), terrain.ymax()]
            }
            DisplayProjection::Projected(proj) => {
                let (x0, y0) = proj.forward(lonmin, latmin)?;
                let (x1, y1) = proj.forward(lonmax, latmax)?;
                projector.origin =
                    DVec3::new(0.5 * (x0 + x1), 0.5 * (y0 + y1), exaggeration * zmid);
                [x0, x1, y0, y1]
            }
            DisplayProjection::Geographic => {
                projector.deg_per_m = great_circle::degrees_per_metre(latmid);
                let (dlon, dlat) = projector.deg_per_m;
                let ext = [lonmin / dlon, lonmax / dlon, latmin / dlat, latmax / dlat];
                projector.origin = DVec3::new(
                    0.5 * (ext[0] + ext[1]),
                    0.5 * (ext[2] + ext[3]),
                    exaggeration * zmid,
                );
                ext
            }
            DisplayProjection::Spheroid => {
                if lonmax - lonmin >= 180.0 || latmax - latmin >= 90.0 {
                    projector.sphere = SphereFrame::new(lonmid, latmid, true);
                    projector.earth_centered = true;
                    projector.origin = DVec3::ZERO;
                    [-SPHEROID_RADIUS, SPHEROID_RADIUS, -SPHEROID_RADIUS, SPHEROID_RADIUS]
                } else {
                    projector.sphere = SphereFrame::new(lonmid, latmid, false);
                    let reference = projector.sphere.reference;
                    let lo = projector.sphere.to_cartesian(lonmin, latmin) - reference;
                    let hi = projector.sphere.to_cartesian(lonmax, latmax) - reference;
                    let centre = projector.sphere.to_cartesian(lonmid, latmid) - reference;
                    projector.origin = DVec3::new(centre.x, centre.y, centre.z + zmid);
                    [lo.x, hi.x, lo.y, hi.y]
                }
            }
        };

        let xspan = (extent[1] - extent[0]).abs();
        let yspan = (extent[3] - extent[2]).abs();
        let sx = if xspan > 0.0 {
            1.75 * DISPLAY_WIDTH / xspan
        } else {
            f64::INFINITY
        };
        let sy = if yspan > 0.0 {
            1.75 * DISPLAY_WIDTH / config.aspect_ratio / yspan
        } else {
            f64::INFINITY
        };
        projector.scale = if sx.is_finite() || sy.is_finite() {
            sx.min(sy)
        } else {
            1.0
        };
        projector.extent = extent;
        Ok(projector)
    }

    pub fn grid_projection(&self) -> &GridProjection {
        &self.grid
    }

    pub fn display_projection(&self) -> &DisplayProjection {
        &self.display
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn exaggeration(&self) -> f64 {
        self.exaggeration
    }

    /// Unscaled display extent `[xmin, xmax, ymin, ymax]`.
    pub fn extent(&self) -> [f64; 4] {
        self.extent
    }

    pub fn is_spheroid(&self) -> bool {
        self.display.is_spheroid()
    }

    /// Whole-globe spheroid view centred on the earth's centre.
    pub fn is_global(&self) -> bool {
        self.is_spheroid() && self.earth_centered
    }

    /// Grid coordinates to lon/lat degrees.
    pub fn grid_to_lonlat(&self, x: f64, y: f64) -> GeoResult<(f64, f64)> {
        match &self.grid {
            GridProjection::Geographic => Ok((x, y)),
            GridProjection::Projected(proj) => proj.inverse(x, y),
        }
    }

    /// Lon/lat degrees to grid coordinates, wrapping longitude into the grid's range.
    pub fn lonlat_to_grid(&self, lon: f64, lat: f64) -> GeoResult<(f64, f64)> {
        match &self.grid {
            GridProjection::Projected(proj) => proj.forward(lon, lat),
            GridProjection::Geographic => {
                let mut lon = lon;
                if self.grid_xmin < -180.0 && lon > 0.0 {
                    lon -= 360.0;
                }
                if self.grid_xmax > 180.0 && lon < 0.0 {
                    lon += 360.0;
                }
                Ok((lon, lat))
            }
        }
    }

    /// Lon/lat to grid coordinates plus the mean elevation of the enclosing cell.
    ///
    /// `Ok(None)` when the cell lies off the grid or has no valid corners.
    pub fn lonlat_to_grid_z(
        &self,
        terrain: &TerrainGrid,
        lon: f64,
        lat: f64,
    ) -> GeoResult<Option<(f64, f64, f64)>> {
        let (x, y) = self.lonlat_to_grid(lon, lat)?;
        Ok(terrain.cell_mean(x, y).map(|z| (x, y, z)))
    }

    fn scaled(&self, raw: DVec3) -> DVec3 {
        self.scale * (raw - self.origin)
    }

    /// Lon/lat/elevation to display coordinates.
    pub fn lonlat_to_display(&self, lon: f64, lat: f64, z: f64) -> GeoResult<DVec3> {
        let raw = match &self.display {
            DisplayProjection::Projected(proj) => {
                let (xx, yy) = proj.forward(lon, lat)?;
                DVec3::new(xx, yy, self.exaggeration * z)
            }
            DisplayProjection::AlreadyProjected => {
                let (xx, yy) = self.lonlat_to_grid(lon, lat)?;
                DVec3::new(xx, yy, self.exaggeration * z)
            }
            DisplayProjection::Geographic => DVec3::new(
                lon / self.deg_per_m.0,
                lat / self.deg_per_m.1,
                self.exaggeration * z,
            ),
            DisplayProjection::Spheroid => {
                let v = self.sphere.to_cartesian(lon, lat);
                let effective = self.exaggeration * (z - self.zmid) + self.zmid;
                v + v * (effective / SPHEROID_RADIUS) - self.sphere.reference
            }
        };
        Ok(self.scaled(raw))
    }

    /// Display coordinates back to lon/lat.
    pub fn display_to_lonlat(&self, display: DVec3) -> GeoResult<(f64, f64)> {
        let raw = display / self.scale + self.origin;
        match &self.display {
            DisplayProjection::Projected(proj) => proj.inverse(raw.x, raw.y),
            DisplayProjection::AlreadyProjected => self.grid_to_lonlat(raw.x, raw.y),
            DisplayProjection::Geographic => {
                Ok((raw.x * self.deg_per_m.0, raw.y * self.deg_per_m.1))
            }
            DisplayProjection::Spheroid => Ok(self.sphere.to_lonlat(raw + self.sphere.reference)),
        }
    }

    /// Grid position and elevation to lon/lat and display coordinates.
    pub fn forward(&self, x: f64, y: f64, z: f64) -> GeoResult<ProjectedPoint> {
        let (lon, lat) = self.grid_to_lonlat(x, y)?;
        let display = match &self.display {
            DisplayProjection::AlreadyProjected => {
                self.scaled(DVec3::new(x, y, self.exaggeration * z))
            }
            _ => self.lonlat_to_display(lon, lat, z)?,
        };
        Ok(ProjectedPoint { lon, lat, display })
    }

    /// Display coordinates to `(lon, lat, xgrid, ygrid)`.
    pub fn inverse(&self, display: DVec3) -> GeoResult<(f64, f64, f64, f64)> {
        if let DisplayProjection::AlreadyProjected = self.display {
            let raw = display / self.scale + self.origin;
            let (lon, lat) = self.grid_to_lonlat(raw.x, raw.y)?;
            return Ok((lon, lat, raw.x, raw.y));
        }
        let (lon, lat) = self.display_to_lonlat(display)?;
        let (x, y) = self.lonlat_to_grid(lon, lat)?;
        Ok((lon, lat, x, y))
    }

    /// Display offset that lifts a drape sample clear of the terrain surface.
    ///
    /// `offset` is the configured vertical lift in display units; on a
    /// whole-globe view it is applied radially instead.
    pub fn lift(&self, display: DVec3, offset: f64) -> DVec3 {
        if self.is_global() {
            display + display * (offset / (self.scale * SPHEROID_RADIUS))
        } else {
            display + DVec3::new(0.0, 0.0, offset)
        }
    }

    /// Lateral distance, distance over ground and slope between two lon/lat/z
    /// positions, measured without display scaling or exaggeration.
    pub fn project_distance(
        &self,
        a: (f64, f64, f64),
        b: (f64, f64, f64),
    ) -> GeoResult<DistanceInfo> {
        let planar = |p1: (f64, f64), p2: (f64, f64)| {
            let dx = p2.0 - p1.0;
            let dy = p2.1 - p1.1;
            let dz = b.2 - a.2;
            let lateral = (dx * dx + dy * dy).sqrt();
            DistanceInfo {
                lateral,
                over_ground: (dx * dx + dy * dy + dz * dz).sqrt(),
                slope: if lateral > 0.0 { dz / lateral } else { 0.0 },
            }
        };

        match &self.display {
            DisplayProjection::Projected(proj) => {
                Ok(planar(proj.forward(a.0, a.1)?, proj.forward(b.0, b.1)?))
            }
            DisplayProjection::AlreadyProjected => Ok(planar(
                self.lonlat_to_grid(a.0, a.1)?,
                self.lonlat_to_grid(b.0, b.1)?,
            )),
            DisplayProjection::Geographic => {
                let (dlon, dlat) = self.deg_per_m;
                Ok(planar((a.0 / dlon, a.1 / dlat), (b.0 / dlon, b.1 / dlat)))
            }
            DisplayProjection::Spheroid => {
                let p1 = self.sphere.to_cartesian(a.0, a.1);
                let p2 = self.sphere.to_cartesian(b.0, b.1);
                let lateral = great_circle::distance(a.0, a.1, b.0, b.1);
                let p1 = p1 + p1 * (a.2 / SPHEROID_RADIUS);
                let p2 = p2 + p2 * (b.2 / SPHEROID_RADIUS);
                Ok(DistanceInfo {
                    lateral,
                    over_ground: (p2 - p1).length(),
                    slope: if lateral > 0.0 {
                        (b.2 - a.2) / lateral
                    } else {
                        0.0
                    },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geographic_grid() -> TerrainGrid {
        TerrainGrid::filled(11, 11, [-122.0, 36.0], [0.01, 0.01], -100.0).unwrap()
    }

    #[test]
    fn test_geographic_round_trip() {
        let grid = geographic_grid();
        let projector = Projector::new(
            GridProjection::Geographic,
            DisplayProjection::Geographic,
            &grid,
            &ProjectorConfig::default(),
        )
        .unwrap();

        let p = projector.forward(-121.95, 36.03, -100.0).unwrap();
        assert!((p.lon + 121.95).abs() < 1e-12);
        let (lon, lat, x, y) = projector.inverse(p.display).unwrap();
        assert!((lon + 121.95).abs() < 1e-9);
        assert!((lat - 36.03).abs() < 1e-9);
        assert!((x - lon).abs() < 1e-12 && (y - lat).abs() < 1e-12);
    }

    #[test]
    fn test_grid_centre_maps_to_display_origin() {
        let grid = geographic_grid();
        let projector = Projector::new(
            GridProjection::Geographic,
            DisplayProjection::Geographic,
            &grid,
            &ProjectorConfig::default(),
        )
        .unwrap();
        let p = projector.forward(-121.95, 36.05, -100.0).unwrap();
        assert!(p.display.length() < 1e-6, "{:?}", p.display);
    }

    #[test]
    fn test_spheroid_reference_on_axis() {
        let grid = geographic_grid();
        let projector = Projector::new(
            GridProjection::Geographic,
            DisplayProjection::Spheroid,
            &grid,
            &ProjectorConfig::default(),
        )
        .unwrap();
        assert!(!projector.is_global());
        let centre = projector.forward(-121.95, 36.05, -100.0).unwrap();
        assert!(centre.display.length() < 1e-6, "{:?}", centre.display);

        let p = projector.forward(-121.92, 36.08, -100.0).unwrap();
        let (lon, lat) = projector.display_to_lonlat(p.display).unwrap();
        assert!((lon + 121.92).abs() < 1e-6);
        assert!((lat - 36.08).abs() < 1e-6);
    }

    #[test]
    fn test_global_spheroid_lifts_radially() {
        let grid = TerrainGrid::filled(5, 5, [-180.0, -80.0], [90.0, 40.0], 0.0).unwrap();
        let projector = Projector::new(
            GridProjection::Geographic,
            DisplayProjection::Spheroid,
            &grid,
            &ProjectorConfig::default(),
        )
        .unwrap();
        assert!(projector.is_global());
        let d = DVec3::new(1.0, 0.0, 0.0);
        let lifted = projector.lift(d, 0.01);
        assert!(lifted.y.abs() < 1e-15 && lifted.z.abs() < 1e-15);
        assert!(lifted.x > 1.0);
    }

    #[test]
    fn test_already_projected_requires_projected_grid() {
        let grid = geographic_grid();
        let result = Projector::new(
            GridProjection::Geographic,
            DisplayProjection::AlreadyProjected,
            &grid,
            &ProjectorConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_projected_grid_already_projected_display() {
        let local: Rc<dyn MapProjection> = Rc::new(LocalProjection::new(-122.0, 36.0));
        let grid = TerrainGrid::filled(11, 11, [0.0, 0.0], [100.0, 100.0], -50.0).unwrap();
        let projector = Projector::new(
            GridProjection::Projected(local),
            DisplayProjection::AlreadyProjected,
            &grid,
            &ProjectorConfig::default(),
        )
        .unwrap();
        let p = projector.forward(500.0, 500.0, -50.0).unwrap();
        assert!(p.display.length() < 1e-9);
        let (_, _, x, y) = projector.inverse(DVec3::new(0.1, -0.1, 0.0)).unwrap();
        assert!((x - (500.0 + 0.1 / projector.scale())).abs() < 1e-6);
        assert!((y - (500.0 - 0.1 / projector.scale())).abs() < 1e-6);
    }

    #[test]
    fn test_project_distance_geographic() {
        let grid = geographic_grid();
        let projector = Projector::new(
            GridProjection::Geographic,
            DisplayProjection::Geographic,
            &grid,
            &ProjectorConfig::default(),
        )
        .unwrap();
        let info = projector
            .project_distance((-122.0, 36.05, 0.0), (-122.0, 36.06, 10.0))
            .unwrap();
        assert!(info.lateral > 1000.0 && info.lateral < 1200.0);
        assert!(info.over_ground > info.lateral);
        assert!((info.slope - 10.0 / info.lateral).abs() < 1e-12);
    }
}
