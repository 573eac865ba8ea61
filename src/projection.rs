//! Web Mercator projection of station coordinates into screen pixels.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Pixel size of one tile at zoom 0.
const TILE_SIZE: f64 = 512.0;

/// Latitude limit of the Web Mercator square.
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// The visible map area: centre, zoom and container size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// `[lon, lat]`
    pub center: [f64; 2],
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: [-71.09415, 42.36027],
            zoom: 12.0,
            width: 1024.0,
            height: 768.0,
        }
    }
}

impl Viewport {
    fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    /// Projects `(lon, lat)` to container pixels, origin at the top-left.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let world = self.world_size();
        let (x, y) = mercator(lon, lat);
        let (cx, cy) = mercator(self.center[0], self.center[1]);
        (
            (x - cx) * world + self.width / 2.0,
            (y - cy) * world + self.height / 2.0,
        )
    }

    pub fn contains(&self, (x, y): (f64, f64)) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}

// Unit square coordinates, y growing southwards.
fn mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (lon + 180.0) / 360.0;
    let y = 0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI);
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_center_projects_to_middle() {
        let vp = Viewport::default();
        let (x, y) = vp.project(vp.center[0], vp.center[1]);
        assert!(close(x, 512.0));
        assert!(close(y, 384.0));
    }

    #[test]
    fn test_origin_at_zoom_zero() {
        let vp = Viewport {
            center: [0.0, 0.0],
            zoom: 0.0,
            width: 512.0,
            height: 512.0,
        };
        let (x, y) = vp.project(0.0, 0.0);
        assert!(close(x, 256.0));
        assert!(close(y, 256.0));
        let (x, _) = vp.project(-180.0, 0.0);
        assert!(close(x, 0.0));
    }

    #[test]
    fn test_east_and_north_directions() {
        let vp = Viewport::default();
        let (cx, cy) = vp.project(vp.center[0], vp.center[1]);
        let (ex, _) = vp.project(vp.center[0] + 0.01, vp.center[1]);
        let (_, ny) = vp.project(vp.center[0], vp.center[1] + 0.01);
        assert!(ex > cx);
        assert!(ny < cy);
    }

    #[test]
    fn test_zoom_doubles_offsets() {
        let vp = Viewport::default();
        let zoomed = Viewport {
            zoom: vp.zoom + 1.0,
            ..vp
        };
        let (x1, _) = vp.project(vp.center[0] + 0.01, vp.center[1]);
        let (x2, _) = zoomed.project(vp.center[0] + 0.01, vp.center[1]);
        assert!(close(x2 - 512.0, 2.0 * (x1 - 512.0)));
    }

    #[test]
    fn test_contains() {
        let vp = Viewport::default();
        assert!(vp.contains((10.0, 10.0)));
        assert!(!vp.contains((-1.0, 10.0)));
        assert!(!vp.contains((10.0, 769.0)));
    }
}
