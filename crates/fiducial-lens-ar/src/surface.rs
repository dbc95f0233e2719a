use nalgebra::{Isometry3, Point3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a tracked surface, stable for as long as it is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A planar reference pattern located by the tracking session.
///
/// The pose origin is the centre of the pattern. In surface-local
/// coordinates `+x` points to the right edge, `+z` to the bottom edge and
/// `+y` along the plane normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedSurface {
    pub id: SurfaceId,
    pub pose: Isometry3<f64>,
    /// Physical width in meters.
    pub width: f64,
    /// Physical height in meters.
    pub height: f64,
    /// Whether the tracker currently sees the surface.
    #[serde(default = "default_tracked")]
    pub is_tracked: bool,
}

fn default_tracked() -> bool {
    true
}

impl TrackedSurface {
    pub fn new(id: SurfaceId, pose: Isometry3<f64>, width: f64, height: f64) -> Self {
        Self {
            id,
            pose,
            width,
            height,
            is_tracked: true,
        }
    }

    /// World-space centre of the surface.
    pub fn center(&self) -> Point3<f64> {
        self.pose * Point3::origin()
    }

    /// World-space corners in the order top-left, top-right, bottom-left,
    /// bottom-right.
    pub fn world_corners(&self) -> [Point3<f64>; 4] {
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        [
            Point3::new(-hw, 0.0, -hh),
            Point3::new(hw, 0.0, -hh),
            Point3::new(-hw, 0.0, hh),
            Point3::new(hw, 0.0, hh),
        ]
        .map(|p| self.pose * p)
    }
}
