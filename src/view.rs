// src/view.rs
// Per-window view transform: 2D orthographic and 3D perspective cameras
// RELEVANT FILES: src/picking/resolver.rs, src/picking/view_bounds.rs, src/overlay/window.rs

use glam::{DMat4, DVec2, DVec3, DVec4};

use crate::geo::projection::DISPLAY_WIDTH;

/// Whether a window shows a plan view or a perspective scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    TwoD,
    ThreeD,
}

/// Camera state of one window.
///
/// Pixel coordinates have their origin at the bottom-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewTransform {
    pub mode: DisplayMode,
    pub width: u32,
    pub height: u32,
    /// 2D zoom factor
    pub size_2d: f64,
    /// 2D pan in display units
    pub offset_2d: DVec2,
    /// 3D model tilt in degrees (90 looks straight down)
    pub model_elevation: f64,
    pub model_azimuth: f64,
    /// 3D viewer tilt in degrees
    pub view_elevation: f64,
    pub view_azimuth: f64,
    /// 3D model pan
    pub offset_3d: DVec3,
    /// 3D viewer dolly
    pub view_offset_z: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            mode: DisplayMode::TwoD,
            width: 600,
            height: 600,
            size_2d: 1.0,
            offset_2d: DVec2::ZERO,
            model_elevation: 90.0,
            model_azimuth: 0.0,
            view_elevation: 90.0,
            view_azimuth: 0.0,
            offset_3d: DVec3::ZERO,
            view_offset_z: 0.0,
        }
    }
}

impl ViewTransform {
    pub fn new(mode: DisplayMode, width: u32, height: u32) -> Self {
        Self {
            mode,
            width: width.max(1),
            height: height.max(1),
            ..Default::default()
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width.max(1)) / f64::from(self.height.max(1))
    }

    /// Orthographic `[left, right, bottom, top]` of the 2D view.
    pub fn ortho_bounds(&self) -> [f64; 4] {
        let right = DISPLAY_WIDTH / self.size_2d;
        let top = DISPLAY_WIDTH / self.aspect_ratio() / self.size_2d;
        [-right, right, -top, top]
    }

    /// Display-space rectangle `[xmin, xmax, ymin, ymax]` visible in 2D.
    pub fn visible_rect_2d(&self) -> [f64; 4] {
        let [left, right, bottom, top] = self.ortho_bounds();
        let (offx, offy) = (self.offset_2d.x, self.offset_2d.y);
        [left - offx, right - offx, bottom - offy, top - offy]
    }

    /// Display position under a 2D pixel, on the z = 0 plane.
    pub fn pixel_to_display_2d(&self, px: f64, py: f64) -> DVec3 {
        let [left, _, bottom, _] = self.ortho_bounds();
        let span_x = 2.0 * DISPLAY_WIDTH / self.size_2d;
        let span_y = 2.0 * DISPLAY_WIDTH / self.aspect_ratio() / self.size_2d;
        DVec3::new(
            left - self.offset_2d.x + span_x * px / f64::from(self.width),
            bottom - self.offset_2d.y + span_y * py / f64::from(self.height),
            0.0,
        )
    }

    fn view_distance(&self) -> f64 {
        0.48 * DISPLAY_WIDTH * DISPLAY_WIDTH / self.aspect_ratio()
    }

    /// Combined projection and modelview matrix (GL clip conventions).
    pub fn view_projection(&self) -> DMat4 {
        match self.mode {
            DisplayMode::TwoD => {
                let [left, right, bottom, top] = self.ortho_bounds();
                DMat4::orthographic_rh_gl(left, right, bottom, top, -5.0, 1000.0)
                    * DMat4::from_translation(DVec3::new(
                        self.offset_2d.x,
                        self.offset_2d.y,
                        -5.0,
                    ))
            }
            DisplayMode::ThreeD => {
                let projection = DMat4::perspective_rh_gl(
                    40f64.to_radians(),
                    self.aspect_ratio(),
                    0.01 * DISPLAY_WIDTH,
                    1000.0 * DISPLAY_WIDTH,
                );
                let vd = self.view_distance();
                let modelview = DMat4::from_translation(DVec3::new(0.0, 0.0, -vd + self.view_offset_z))
                    * DMat4::from_rotation_x((self.view_elevation - 90.0).to_radians())
                    * DMat4::from_axis_angle(
                        DVec3::new(0.0, 1.0, 1.0).normalize(),
                        self.view_azimuth.to_radians(),
                    )
                    * DMat4::from_translation(DVec3::new(
                        self.offset_3d.x,
                        self.offset_3d.y,
                        -vd + self.offset_3d.z,
                    ))
                    * DMat4::from_rotation_x((self.model_elevation - 90.0).to_radians())
                    * DMat4::from_rotation_z(self.model_azimuth.to_radians());
                projection * modelview
            }
        }
    }

    /// Window coordinates `(px, py, depth)` of a display position, `None`
    /// when it is behind the camera.
    pub fn display_to_pixel(&self, display: DVec3) -> Option<(f64, f64, f64)> {
        let clip = self.view_projection() * DVec4::new(display.x, display.y, display.z, 1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some((
            0.5 * (ndc.x + 1.0) * f64::from(self.width),
            0.5 * (ndc.y + 1.0) * f64::from(self.height),
            0.5 * (ndc.z + 1.0),
        ))
    }
}
