//! Constraint types consumed by the transform solvers.
//!
//! A [`PointConstraint`] records an absolute correspondence between a point
//! in the image frame and a point in the world frame. A [`DeltaConstraint`]
//! records a measured single-axis difference between the world-frame
//! displacements of two image points, for the case where absolute world
//! coordinates are unknown but a relative offset is.

/// An absolute image-to-world point correspondence.
#[derive(Debug, Clone, PartialEq)]
pub struct PointConstraint {
    /// X coordinate of the point in the image frame.
    pub image_x: f64,
    /// Y coordinate of the point in the image frame.
    pub image_y: f64,
    /// X coordinate of the matching point in the world frame.
    pub world_x: f64,
    /// Y coordinate of the matching point in the world frame.
    pub world_y: f64,
    /// Positive row weight applied to this correspondence.
    pub weight: f64,
}

impl PointConstraint {
    /// Create a constraint with an explicit weight.
    pub fn new(image_x: f64, image_y: f64, world_x: f64, world_y: f64, weight: f64) -> Self {
        Self {
            image_x,
            image_y,
            world_x,
            world_y,
            weight,
        }
    }

    /// Create a constraint with unit weight.
    pub fn with_unit_weight(image_x: f64, image_y: f64, world_x: f64, world_y: f64) -> Self {
        Self::new(image_x, image_y, world_x, world_y, 1.0)
    }
}

/// Axis along which a delta constraint measures its offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaAxis {
    /// The measured offset is along the world X axis.
    X,
    /// The measured offset is along the world Y axis.
    Y,
}

/// A measured single-axis offset between the world-frame displacements of
/// two image points.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaConstraint {
    /// Axis of the measured offset.
    pub axis: DeltaAxis,
    /// X coordinate of the first point in the image frame.
    pub image_x1: f64,
    /// Y coordinate of the first point in the image frame.
    pub image_y1: f64,
    /// X coordinate of the second point in the image frame.
    pub image_x2: f64,
    /// Y coordinate of the second point in the image frame.
    pub image_y2: f64,
    /// Measured offset between the two points along `axis`.
    pub world_delta: f64,
    /// Positive weight for this measurement.
    pub weight: f64,
}

impl DeltaConstraint {
    /// Create a delta constraint with an explicit weight.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        axis: DeltaAxis,
        image_x1: f64,
        image_y1: f64,
        image_x2: f64,
        image_y2: f64,
        world_delta: f64,
        weight: f64,
    ) -> Self {
        Self {
            axis,
            image_x1,
            image_y1,
            image_x2,
            image_y2,
            world_delta,
            weight,
        }
    }

    /// Create a delta constraint with unit weight.
    pub fn with_unit_weight(
        axis: DeltaAxis,
        image_x1: f64,
        image_y1: f64,
        image_x2: f64,
        image_y2: f64,
        world_delta: f64,
    ) -> Self {
        Self::new(axis, image_x1, image_y1, image_x2, image_y2, world_delta, 1.0)
    }
}
