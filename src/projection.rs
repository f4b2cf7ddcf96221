//! Projection state and the pure world-to-viewport coordinate transforms.

use bevy::prelude::*;

use crate::markers::max_category_clamp_inset;

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum BoundaryShape {
    Circle,
    Square,
}

/// Process-wide projection configuration. One instance is owned by the
/// minimap subsystem; it is created from validated preferences at startup
/// and mutated in place by the preference systems only.
#[derive(Resource, Clone, Copy, Debug)]
pub struct ProjectionState {
    /// Base linear scale, world units to viewport units.
    pub world_to_viewport_scale: f32,
    /// User-adjustable multiplier on the base scale.
    pub zoom_level: f32,
    pub boundary_shape: BoundaryShape,
    /// Visible-area extent used for clamping, viewport units.
    pub boundary_radius: f32,
    /// Keeps clamped markers just inside the boundary rather than on it.
    pub edge_inset: f32,
    /// UI-space centering correction applied after projection.
    pub reference_offset: Vec2,
}

impl Default for ProjectionState {
    fn default() -> Self {
        Self {
            world_to_viewport_scale: 1.0,
            zoom_level: 1.0,
            boundary_shape: BoundaryShape::Circle,
            boundary_radius: 90.0,
            edge_inset: 4.0,
            reference_offset: Vec2::ZERO,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigurationError {
    #[error("world-to-viewport scale must be positive, got {0}")]
    NonPositiveScale(f32),
    #[error("zoom level must be positive, got {0}")]
    NonPositiveZoom(f32),
    #[error("boundary radius must be positive, got {0}")]
    NonPositiveRadius(f32),
    #[error("edge inset must be positive, got {0}")]
    NonPositiveInset(f32),
    #[error(
        "effective edge inset {inset} (including category tuning) must be smaller than boundary radius {radius}"
    )]
    InsetExceedsRadius { inset: f32, radius: f32 },
}

impl ProjectionState {
    /// Rejects degenerate configurations up front. An inset at or beyond the
    /// boundary radius would collapse every clamped marker onto a point, so
    /// it aborts initialization instead of being silently clamped.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.world_to_viewport_scale <= 0.0 {
            return Err(ConfigurationError::NonPositiveScale(
                self.world_to_viewport_scale,
            ));
        }
        if self.zoom_level <= 0.0 {
            return Err(ConfigurationError::NonPositiveZoom(self.zoom_level));
        }
        if self.boundary_radius <= 0.0 {
            return Err(ConfigurationError::NonPositiveRadius(self.boundary_radius));
        }
        if self.edge_inset <= 0.0 {
            return Err(ConfigurationError::NonPositiveInset(self.edge_inset));
        }
        // The clamp adds a per-category inset on top of the global one, so
        // the bound covers the worst case in the category table.
        let effective_inset = self.edge_inset + max_category_clamp_inset();
        if effective_inset >= self.boundary_radius {
            return Err(ConfigurationError::InsetExceedsRadius {
                inset: effective_inset,
                radius: self.boundary_radius,
            });
        }
        Ok(())
    }

    /// The single combined scale every other transform routes through, so
    /// scale and zoom always compose identically everywhere.
    pub fn combined_scale(&self) -> f32 {
        self.world_to_viewport_scale * self.zoom_level
    }

    /// Top-down projection of a 3D position: the (x, z) plane scaled into
    /// map space. The vertical axis is discarded.
    pub fn world_to_map_space(&self, world: Vec3) -> Vec2 {
        Vec2::new(world.x, world.z) * self.combined_scale()
    }

    /// Viewport translation for the content layer. The negation is the
    /// centering trick: the content moves opposite to world movement beneath
    /// a fixed reference marker.
    pub fn reference_viewport_position(&self, reference_world: Vec3) -> Vec2 {
        -self.world_to_map_space(reference_world) + self.reference_offset
    }

    /// Marker position relative to the content layer's local origin, before
    /// clamping and before the content layer's own translation.
    pub fn relative_marker_position(&self, marker_world: Vec3, reference_world: Vec3) -> Vec2 {
        self.world_to_map_space(marker_world) - self.world_to_map_space(reference_world)
    }
}
