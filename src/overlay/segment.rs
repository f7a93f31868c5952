// src/overlay/segment.rs
// Line segments between consecutive entity points and their drape polylines
// RELEVANT FILES: src/overlay/point.rs, src/overlay/collection.rs, src/drape/mod.rs

use glam::DVec3;
use log::{debug, warn};

use crate::budget::AllocationBudget;
use crate::drape::{drape_segment, DrapeMode};
use crate::error::OverlayResult;
use crate::geo::Projector;
use crate::grid::TerrainGrid;
use crate::overlay::point::{DrapePoint, OverlayPoint, WindowId};

/// Segment `i` of an entity joins its points `i` and `i + 1`.
///
/// The drape polyline is empty until the segment is draped, and stays empty
/// when draping failed; renderers then draw the straight endpoint line.
#[derive(Debug, Clone, Default)]
pub struct LineSegment {
    samples: Vec<DrapePoint>,
    drapes: u64,
}

impl LineSegment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drape samples, first and last equal to the segment endpoints.
    pub fn samples(&self) -> &[DrapePoint] {
        &self.samples
    }

    /// Allocated sample capacity; zero after a failed drape.
    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    /// How many times this segment has been draped.
    pub fn drape_count(&self) -> u64 {
        self.drapes
    }

    pub fn is_draped(&self) -> bool {
        !self.samples.is_empty()
    }

    /// Display polyline for `window`, falling back to the endpoints.
    pub fn polyline(
        &self,
        window: WindowId,
        start: &OverlayPoint,
        end: &OverlayPoint,
    ) -> Vec<DVec3> {
        let draped: Option<Vec<DVec3>> = self.samples.iter().map(|s| s.display(window)).collect();
        match draped {
            Some(line) if line.len() >= 2 => line,
            _ => start.display(window).into_iter().chain(end.display(window)).collect(),
        }
    }

    pub(crate) fn forget_window(&mut self, window: WindowId) {
        for sample in &mut self.samples {
            sample.forget_window(window);
        }
    }

    /// Project the existing samples into one more window.
    pub(crate) fn project_samples(
        &mut self,
        window: WindowId,
        projector: &Projector,
        offset: f64,
    ) -> OverlayResult<()> {
        for sample in &mut self.samples {
            let display = sample.surface.draped_display(projector, offset)?;
            sample.set_display(window, display);
        }
        Ok(())
    }
}

/// Terrain, projectors and limits used while draping and projecting.
pub(crate) struct DrapeContext<'a> {
    pub terrain: &'a TerrainGrid,
    /// Projector whose display mode chooses the subdivision
    pub source: &'a Projector,
    /// Every open window that caches display positions
    pub targets: Vec<(WindowId, &'a Projector)>,
    pub offset: f64,
    pub budget: AllocationBudget,
}

impl<'a> DrapeContext<'a> {
    /// Fill the point's display cache for every open window.
    pub fn project_point(&self, point: &mut OverlayPoint) -> OverlayResult<()> {
        for &(window, projector) in &self.targets {
            let display = point.surface.display(projector)?;
            point.set_display(window, display);
        }
        Ok(())
    }

    /// Recompute the segment's polyline between `start` and `end`.
    ///
    /// Returns false when the polyline could not be built; the segment is
    /// then left empty with no capacity.
    pub fn drape(&self, segment: &mut LineSegment, start: &OverlayPoint, end: &OverlayPoint) -> bool {
        segment.drapes += 1;
        match self.build_samples(start, end) {
            Ok(samples) => {
                debug!("Draped segment with {} samples", samples.len());
                segment.samples = samples;
                true
            }
            Err(err) => {
                warn!("Segment drape failed, drawing endpoints only: {}", err);
                segment.samples = Vec::new();
                false
            }
        }
    }

    fn build_samples(&self, start: &OverlayPoint, end: &OverlayPoint) -> OverlayResult<Vec<DrapePoint>> {
        let mode = DrapeMode::for_projector(self.source);
        let line = drape_segment(
            self.terrain,
            self.source,
            &start.surface,
            &end.surface,
            mode,
            &self.budget,
        )?;
        let mut samples = Vec::new();
        self.budget.reserve_samples(&mut samples, line.len())?;
        for surface in line {
            let mut sample = DrapePoint::new(surface);
            for &(window, projector) in &self.targets {
                sample.set_display(window, surface.draped_display(projector, self.offset)?);
            }
            samples.push(sample);
        }
        Ok(samples)
    }
}
