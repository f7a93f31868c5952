// src/overlay/entity.rs
// Overlay entities: point/segment storage plus the nav, route, site and vector kinds
// RELEVANT FILES: src/overlay/collection.rs, src/overlay/segment.rs, src/overlay/point.rs

use std::fmt;

use crate::drape::SurfacePoint;
use crate::error::OverlayResult;
use crate::geo::Projector;
use crate::overlay::collection::{Collection, Collections};
use crate::overlay::point::OverlayPoint;
use crate::overlay::segment::{DrapeContext, LineSegment};

/// Palette index of an overlay, as understood by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayColor {
    #[default]
    Black,
    White,
    Red,
    Yellow,
    Green,
    BlueGreen,
    Blue,
    Purple,
}

/// Per-point payload that may carry extra positions of its own.
pub trait PointExtras {
    /// Positions projected into every window alongside the main point.
    fn extra_points_mut(&mut self) -> &mut [OverlayPoint] {
        &mut []
    }
}

impl PointExtras for () {}

impl PointExtras for f64 {}

/// Behaviour shared by every overlay kind.
pub trait EntityKind: Clone + fmt::Debug + Sized {
    /// Per-point payload stored alongside each point
    type PointData: PointExtras + Clone + fmt::Debug + Default;

    /// Name used in diagnostics
    const LABEL: &'static str;

    /// Points an entity of this kind may hold
    const MAX_POINTS: Option<usize> = None;

    fn collection(all: &Collections) -> &Collection<Self>;

    fn collection_mut(all: &mut Collections) -> &mut Collection<Self>;

    /// Whether this entity accepts structural edits.
    fn editable(&self) -> bool {
        true
    }

    /// Recompute derived attributes after the entity changed.
    fn refresh(_entity: &mut Entity<Self>, _projector: &Projector) -> OverlayResult<()> {
        Ok(())
    }

    /// Entity started by an interactive add; `None` for kinds that are only loaded.
    fn create(_index: usize) -> Option<Self> {
        None
    }
}

/// One overlay entity: insertion ordered points, one segment per
/// consecutive pair, and the kind's attributes.
#[derive(Debug, Clone)]
pub struct Entity<K: EntityKind> {
    pub attributes: K,
    /// Inactive entities are ignored by picking
    pub active: bool,
    pub(crate) points: Vec<OverlayPoint>,
    pub(crate) data: Vec<K::PointData>,
    pub(crate) selected: Vec<bool>,
    pub(crate) segments: Vec<LineSegment>,
    pub(crate) nselected: usize,
}

impl<K: EntityKind> Entity<K> {
    pub(crate) fn empty(attributes: K) -> Self {
        Self {
            attributes,
            active: true,
            points: Vec::new(),
            data: Vec::new(),
            selected: Vec::new(),
            segments: Vec::new(),
            nselected: 0,
        }
    }

    pub fn points(&self) -> &[OverlayPoint] {
        &self.points
    }

    pub fn point_data(&self) -> &[K::PointData] {
        &self.data
    }

    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_selected(&self, point: usize) -> bool {
        self.selected.get(point).copied().unwrap_or(false)
    }

    /// Number of points flagged selected.
    pub fn selected_count(&self) -> usize {
        self.nselected
    }

    pub(crate) fn recount_selected(&mut self) {
        self.nselected = self.selected.iter().filter(|&&s| s).count();
    }

    /// Project point `j` and its payload positions into every window.
    pub(crate) fn project_point(&mut self, ctx: &DrapeContext<'_>, j: usize) -> OverlayResult<()> {
        ctx.project_point(&mut self.points[j])?;
        for extra in self.data[j].extra_points_mut() {
            ctx.project_point(extra)?;
        }
        Ok(())
    }

    /// Re-drape segment `s` from its current endpoints.
    pub(crate) fn drape(&mut self, ctx: &DrapeContext<'_>, s: usize) -> bool {
        ctx.drape(&mut self.segments[s], &self.points[s], &self.points[s + 1])
    }
}

/// Per-point navigation record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavSample {
    /// Epoch seconds
    pub time_d: f64,
    /// Degrees clockwise from north
    pub heading: f64,
    /// km/h
    pub speed: f64,
    /// Port and starboard swath edges
    pub swath: [OverlayPoint; 2],
    pub shot: Option<u32>,
    pub cdp: Option<u32>,
}

impl NavSample {
    pub fn new(
        time_d: f64,
        heading: f64,
        speed: f64,
        port: SurfacePoint,
        starboard: SurfacePoint,
    ) -> Self {
        Self {
            time_d,
            heading,
            speed,
            swath: [OverlayPoint::new(port), OverlayPoint::new(starboard)],
            shot: None,
            cdp: None,
        }
    }

    pub fn port(&self) -> &OverlayPoint {
        &self.swath[0]
    }

    pub fn starboard(&self) -> &OverlayPoint {
        &self.swath[1]
    }
}

impl PointExtras for NavSample {
    fn extra_points_mut(&mut self) -> &mut [OverlayPoint] {
        &mut self.swath
    }
}

/// A navigation track loaded from survey data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavTrack {
    pub name: String,
    pub color: OverlayColor,
    pub size: u32,
    pub line: Option<u32>,
}

impl EntityKind for NavTrack {
    type PointData = NavSample;
    const LABEL: &'static str = "nav";

    fn collection(all: &Collections) -> &Collection<Self> {
        &all.navs
    }

    fn collection_mut(all: &mut Collections) -> &mut Collection<Self> {
        &mut all.navs
    }
}

/// Role of a route waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaypointKind {
    #[default]
    Simple,
    Transit,
    /// Start of survey line `n`
    StartLine(u32),
    /// End of survey line `n`
    EndLine(u32),
}

impl PointExtras for WaypointKind {}

/// Cumulative distances at one waypoint, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RouteDistance {
    pub lateral: f64,
    pub over_topography: f64,
}

/// A planned route.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub name: String,
    pub color: OverlayColor,
    pub size: u32,
    /// Routes with edit mode off reject structural edits
    pub editable: bool,
    distances: Vec<RouteDistance>,
    total: RouteDistance,
    route_points: usize,
}

impl Route {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: OverlayColor::Black,
            size: 1,
            editable: true,
            distances: Vec::new(),
            total: RouteDistance::default(),
            route_points: 0,
        }
    }

    /// Cumulative distance at each waypoint.
    pub fn distances(&self) -> &[RouteDistance] {
        &self.distances
    }

    /// Length of the whole route.
    pub fn total_distance(&self) -> RouteDistance {
        self.total
    }

    /// Waypoints plus interior drape samples walked by the distance pass.
    pub fn route_points(&self) -> usize {
        self.route_points
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    if lon < -180.0 {
        lon + 360.0
    } else if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

/// Running sums along a route.
#[derive(Default)]
struct DistanceWalk {
    previous: Option<(f64, f64, f64)>,
    total: RouteDistance,
    steps: usize,
}

impl DistanceWalk {
    fn step(&mut self, projector: &Projector, point: &OverlayPoint) -> OverlayResult<()> {
        let s = &point.surface;
        let here = (wrap_longitude(s.lon), s.lat, s.zdata);
        if let Some(previous) = self.previous {
            let d = projector.project_distance(previous, here)?;
            self.total.lateral += d.lateral;
            self.total.over_topography += d.over_ground;
        }
        self.previous = Some(here);
        self.steps += 1;
        Ok(())
    }
}

impl EntityKind for Route {
    type PointData = WaypointKind;
    const LABEL: &'static str = "route";

    fn collection(all: &Collections) -> &Collection<Self> {
        &all.routes
    }

    fn collection_mut(all: &mut Collections) -> &mut Collection<Self> {
        &mut all.routes
    }

    fn editable(&self) -> bool {
        self.editable
    }

    /// Walk waypoints and interior drape samples accumulating distances.
    fn refresh(entity: &mut Entity<Self>, projector: &Projector) -> OverlayResult<()> {
        let mut walk = DistanceWalk::default();
        let mut distances = Vec::with_capacity(entity.points.len());
        for (i, point) in entity.points.iter().enumerate() {
            walk.step(projector, point)?;
            distances.push(walk.total);
            if let Some(segment) = entity.segments.get(i) {
                let samples = segment.samples();
                if samples.len() > 2 {
                    for sample in &samples[1..samples.len() - 1] {
                        walk.step(projector, sample)?;
                    }
                }
            }
        }
        let route = &mut entity.attributes;
        route.distances = distances;
        route.total = walk.total;
        route.route_points = walk.steps;
        Ok(())
    }

    fn create(index: usize) -> Option<Self> {
        Some(Route::named(format!("Route:{}", index + 1)))
    }
}

/// A labelled point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub name: String,
    pub color: OverlayColor,
    pub size: u32,
}

impl Site {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: OverlayColor::Green,
            size: 1,
        }
    }
}

impl EntityKind for Site {
    type PointData = ();
    const LABEL: &'static str = "site";
    const MAX_POINTS: Option<usize> = Some(1);

    fn collection(all: &Collections) -> &Collection<Self> {
        &all.sites
    }

    fn collection_mut(all: &mut Collections) -> &mut Collection<Self> {
        &mut all.sites
    }

    fn create(index: usize) -> Option<Self> {
        Some(Site::named(format!("Site:{}", index + 1)))
    }
}

/// A track carrying one scalar value per point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vector {
    pub name: String,
    pub color: OverlayColor,
    pub size: u32,
    pub datamin: f64,
    pub datamax: f64,
}

impl EntityKind for Vector {
    type PointData = f64;
    const LABEL: &'static str = "vector";

    fn collection(all: &Collections) -> &Collection<Self> {
        &all.vectors
    }

    fn collection_mut(all: &mut Collections) -> &mut Collection<Self> {
        &mut all.vectors
    }

    fn refresh(entity: &mut Entity<Self>, _projector: &Projector) -> OverlayResult<()> {
        let (min, max) = entity
            .data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min <= max {
            entity.attributes.datamin = min;
            entity.attributes.datamax = max;
        }
        Ok(())
    }
}
