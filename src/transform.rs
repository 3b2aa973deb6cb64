//! Screen <-> world coordinate mapping for the pannable, zoomable canvas.
//!
//! Node positions are stored in world space. Pointer input arrives in screen
//! space:
//!
//! ```text
//! world  = (screen - origin - pan) / zoom
//! screen = world * zoom + pan            (surface-local)
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, o: Point) -> Point {
        Point::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, o: Point) -> Point {
        Point::new(self.x - o.x, self.y - o.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, k: f32) -> Point {
        Point::new(self.x * k, self.y * k)
    }
}

impl Div<f32> for Point {
    type Output = Point;
    fn div(self, k: f32) -> Point {
        Point::new(self.x / k, self.y / k)
    }
}

/// Direction of a zoom gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// Wheel convention: scrolling up (negative delta) zooms in.
    pub fn from_wheel_delta(delta_y: f32) -> Self {
        if -delta_y > 0.0 {
            ZoomDirection::In
        } else {
            ZoomDirection::Out
        }
    }
}

/// Zoom range and per-gesture step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportLimits {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_in_factor: f32,
    pub zoom_out_factor: f32,
}

impl Default for ViewportLimits {
    fn default() -> Self {
        Self {
            min_zoom: 0.3,
            max_zoom: 2.5,
            zoom_in_factor: 1.05,
            zoom_out_factor: 0.95,
        }
    }
}

/// Pan offset used by [`Viewport::reset`].
pub const DEFAULT_PAN: Point = Point::new(120.0, 120.0);

/// Pan offset, zoom factor and the canvas origin on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pan: Point,
    zoom: f32,
    origin: Point,
    limits: ViewportLimits,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportLimits::default())
    }
}

impl Viewport {
    pub fn new(limits: ViewportLimits) -> Self {
        Self {
            pan: DEFAULT_PAN,
            zoom: 1.0,
            origin: Point::default(),
            limits,
        }
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn limits(&self) -> ViewportLimits {
        self.limits
    }

    /// Top-left corner of the drawing surface in screen coordinates.
    pub fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
    }

    pub fn pan_to(&mut self, pan: Point) {
        self.pan = pan;
    }

    /// Set zoom directly (e.g. from a slider), clamped to the limits.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = self.clamp_zoom(zoom);
    }

    pub fn reset(&mut self) {
        self.pan = DEFAULT_PAN;
        self.zoom = 1.0;
    }

    fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.limits.min_zoom, self.limits.max_zoom)
    }

    pub fn to_world(&self, screen: Point) -> Point {
        let z = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        (screen - self.origin - self.pan) / z
    }

    /// Surface-local screen position of `world` at an arbitrary zoom.
    pub fn to_screen_at(&self, world: Point, zoom: f32) -> Point {
        world * zoom + self.pan
    }

    pub fn to_screen(&self, world: Point) -> Point {
        self.to_screen_at(world, self.zoom)
    }

    /// Zoom one step around `screen`, keeping the world point under it fixed.
    ///
    /// Returns the new zoom.
    pub fn zoom_at(&mut self, screen: Point, direction: ZoomDirection) -> f32 {
        let factor = match direction {
            ZoomDirection::In => self.limits.zoom_in_factor,
            ZoomDirection::Out => self.limits.zoom_out_factor,
        };
        self.zoom_to_at(screen, self.zoom * factor)
    }

    /// Zoom to `zoom` (clamped) around `screen`.
    pub fn zoom_to_at(&mut self, screen: Point, zoom: f32) -> f32 {
        let anchor = self.to_world(screen);
        let old_zoom = self.zoom;
        let new_zoom = self.clamp_zoom(zoom);
        let before = self.to_screen_at(anchor, old_zoom);
        let after = self.to_screen_at(anchor, new_zoom);
        self.pan = self.pan + (before - after);
        self.zoom = new_zoom;
        new_zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn test_defaults() {
        let vp = Viewport::default();
        assert_eq!(vp.zoom(), 1.0);
        assert_eq!(vp.pan(), Point::new(120.0, 120.0));
    }

    #[test]
    fn test_to_world_subtracts_origin_and_pan() {
        let mut vp = Viewport::default();
        vp.set_origin(Point::new(10.0, 20.0));
        vp.pan_to(Point::new(100.0, 50.0));
        vp.set_zoom(2.0);
        assert_eq!(vp.to_world(Point::new(310.0, 170.0)), Point::new(100.0, 50.0));
    }

    #[test]
    fn test_to_screen_inverts_to_world_without_origin() {
        let mut vp = Viewport::default();
        vp.pan_to(Point::new(-40.0, 75.0));
        vp.set_zoom(1.7);
        let world = Point::new(12.5, -80.0);
        assert!(close(vp.to_world(vp.to_screen(world)), world));
    }

    #[test]
    fn test_zoom_at_keeps_pointer_anchored() {
        let mut vp = Viewport::default();
        vp.set_origin(Point::new(33.0, 11.0));
        let pointer = Point::new(400.0, 260.0);
        for direction in [ZoomDirection::In, ZoomDirection::In, ZoomDirection::Out] {
            let before = vp.to_world(pointer);
            vp.zoom_at(pointer, direction);
            assert!(close(vp.to_world(pointer), before));
        }
    }

    #[test]
    fn test_zoom_at_steps_by_factor() {
        let mut vp = Viewport::default();
        let z = vp.zoom_at(Point::new(0.0, 0.0), ZoomDirection::In);
        assert!((z - 1.05).abs() < 1e-6);
        let z = vp.zoom_at(Point::new(0.0, 0.0), ZoomDirection::Out);
        assert!((z - 1.05 * 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut vp = Viewport::default();
        for _ in 0..200 {
            vp.zoom_at(Point::new(50.0, 50.0), ZoomDirection::In);
        }
        assert_eq!(vp.zoom(), 2.5);
        for _ in 0..200 {
            vp.zoom_at(Point::new(50.0, 50.0), ZoomDirection::Out);
        }
        assert_eq!(vp.zoom(), 0.3);
        vp.set_zoom(10.0);
        assert_eq!(vp.zoom(), 2.5);
    }

    #[test]
    fn test_clamped_zoom_keeps_anchor() {
        let mut vp = Viewport::default();
        vp.set_zoom(2.5);
        let pointer = Point::new(321.0, 123.0);
        let before = vp.to_world(pointer);
        vp.zoom_at(pointer, ZoomDirection::In);
        assert!(close(vp.to_world(pointer), before));
        assert_eq!(vp.zoom(), 2.5);
    }

    #[test]
    fn test_wheel_direction() {
        assert_eq!(ZoomDirection::from_wheel_delta(-3.0), ZoomDirection::In);
        assert_eq!(ZoomDirection::from_wheel_delta(3.0), ZoomDirection::Out);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut vp = Viewport::default();
        vp.pan_to(Point::new(1.0, 2.0));
        vp.set_zoom(2.0);
        vp.reset();
        assert_eq!(vp, Viewport::default());
    }
}
