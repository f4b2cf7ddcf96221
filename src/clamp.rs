//! Boundary clamping: pins off-screen markers to the visible edge while
//! preserving the bearing toward the real position.

use bevy::prelude::*;

use crate::projection::{BoundaryShape, ProjectionState};

/// Strict inside test. A marker exactly at the boundary distance counts as
/// outside, so nothing ever sits ambiguously on the ring itself.
pub fn is_inside_boundary(delta: Vec2, state: &ProjectionState) -> bool {
    match state.boundary_shape {
        BoundaryShape::Circle => delta.length() < state.boundary_radius,
        BoundaryShape::Square => {
            delta.x.abs().max(delta.y.abs()) < state.boundary_radius
        }
    }
}

/// Computes the displayed position for a marker, in content-layer-local
/// space.
///
/// `marker_relative` is the unclamped content-local position,
/// `content_translation` the content layer's own viewport offset, and
/// `reference_viewport` the reference point's viewport position.
/// `extra_inset` is the per-category tuning value added to the global edge
/// inset; configuration validation bounds the sum below the boundary
/// radius.
pub fn clamp_to_boundary(
    marker_relative: Vec2,
    content_translation: Vec2,
    reference_viewport: Vec2,
    state: &ProjectionState,
    extra_inset: f32,
) -> Vec2 {
    let inset = state.edge_inset + extra_inset;

    let marker_abs = content_translation + marker_relative;
    let delta = marker_abs - reference_viewport;

    let clamped_abs = if is_inside_boundary(delta, state) {
        marker_abs
    } else {
        reference_viewport + pin_to_edge(delta, state, inset)
    };

    clamped_abs - content_translation
}

/// Scales an outside delta back onto the inner edge of the boundary along
/// its own bearing. Only called for deltas at or beyond the boundary, so
/// the delta is never zero.
fn pin_to_edge(delta: Vec2, state: &ProjectionState, inset: f32) -> Vec2 {
    // Validation keeps the effective inset below the radius; the floor
    // covers direct calls with unvalidated state, collapsing the marker
    // onto the reference instead of flipping its bearing.
    let reach = (state.boundary_radius - inset).max(0.0);
    match state.boundary_shape {
        BoundaryShape::Circle => delta.normalize() * reach,
        BoundaryShape::Square => {
            let max_component = delta.x.abs().max(delta.y.abs());
            delta * (reach / max_component)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(radius: f32, inset: f32, shape: BoundaryShape) -> ProjectionState {
        ProjectionState {
            boundary_radius: radius,
            edge_inset: inset,
            boundary_shape: shape,
            ..Default::default()
        }
    }

    #[test]
    fn reference_at_origin_scenario_clamps_to_47() {
        // Reference at world origin, scale 1, zoom 1, marker at (200, 0, 0),
        // radius 50, inset 3: expected clamped position (47, 0).
        let state = state(50.0, 3.0, BoundaryShape::Circle);
        let relative = state.relative_marker_position(Vec3::new(200.0, 0.0, 0.0), Vec3::ZERO);
        let clamped = clamp_to_boundary(relative, Vec2::ZERO, Vec2::ZERO, &state, 0.0);

        assert!((clamped - Vec2::new(47.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn inside_marker_passes_through_unchanged() {
        let state = state(50.0, 3.0, BoundaryShape::Circle);
        let relative = Vec2::new(10.0, 0.0);
        let clamped = clamp_to_boundary(relative, Vec2::ZERO, Vec2::ZERO, &state, 0.0);

        assert_eq!(clamped, relative);
    }

    #[test]
    fn marker_exactly_on_boundary_is_clamped() {
        let state = state(50.0, 3.0, BoundaryShape::Circle);
        let relative = Vec2::new(50.0, 0.0);
        let clamped = clamp_to_boundary(relative, Vec2::ZERO, Vec2::ZERO, &state, 0.0);

        assert!((clamped - Vec2::new(47.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn clamping_is_idempotent() {
        let state = state(50.0, 3.0, BoundaryShape::Circle);
        let relative = Vec2::new(140.0, -90.0);

        let once = clamp_to_boundary(relative, Vec2::ZERO, Vec2::ZERO, &state, 0.0);
        let twice = clamp_to_boundary(once, Vec2::ZERO, Vec2::ZERO, &state, 0.0);

        assert!((once - twice).length() < 1e-5);
    }

    #[test]
    fn clamping_preserves_bearing() {
        let state = state(50.0, 3.0, BoundaryShape::Circle);
        let relative = Vec2::new(120.0, 75.0);
        let clamped = clamp_to_boundary(relative, Vec2::ZERO, Vec2::ZERO, &state, 0.0);

        let original_bearing = relative.y.atan2(relative.x);
        let clamped_bearing = clamped.y.atan2(clamped.x);

        assert!((original_bearing - clamped_bearing).abs() < 1e-5);
    }

    #[test]
    fn clamp_accounts_for_content_translation() {
        let state = state(50.0, 3.0, BoundaryShape::Circle);
        let content = Vec2::new(-30.0, 10.0);
        let reference = Vec2::new(-30.0, 10.0);
        let relative = Vec2::new(200.0, 0.0);

        let clamped = clamp_to_boundary(relative, content, reference, &state, 0.0);

        // With the content layer and reference sharing a translation, the
        // local result matches the origin-centered case.
        assert!((clamped - Vec2::new(47.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn square_boundary_pins_to_inner_square_edge() {
        let state = state(50.0, 3.0, BoundaryShape::Square);
        let relative = Vec2::new(200.0, 100.0);
        let clamped = clamp_to_boundary(relative, Vec2::ZERO, Vec2::ZERO, &state, 0.0);

        // Dominant axis lands on the inner edge, bearing preserved.
        assert!((clamped.x - 47.0).abs() < 1e-4);
        assert!((clamped.y - 23.5).abs() < 1e-4);
    }

    #[test]
    fn square_boundary_keeps_corner_markers_inside() {
        let state = state(50.0, 3.0, BoundaryShape::Square);
        let relative = Vec2::new(300.0, 300.0);
        let clamped = clamp_to_boundary(relative, Vec2::ZERO, Vec2::ZERO, &state, 0.0);

        assert!(clamped.x.abs() <= 47.0 + 1e-4);
        assert!(clamped.y.abs() <= 47.0 + 1e-4);
    }

    #[test]
    fn square_marker_inside_passes_through() {
        let state = state(50.0, 3.0, BoundaryShape::Square);
        // Farther than the radius along the diagonal, but inside the square.
        let relative = Vec2::new(45.0, 45.0);
        let clamped = clamp_to_boundary(relative, Vec2::ZERO, Vec2::ZERO, &state, 0.0);

        assert_eq!(clamped, relative);
    }

    #[test]
    fn extra_inset_shrinks_the_pin_distance() {
        let state = state(50.0, 3.0, BoundaryShape::Circle);
        let relative = Vec2::new(200.0, 0.0);
        let clamped = clamp_to_boundary(relative, Vec2::ZERO, Vec2::ZERO, &state, 2.0);

        assert!((clamped - Vec2::new(45.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn oversized_inset_never_flips_the_bearing() {
        // radius 30, global inset 29, plus 2.0 of category tuning: the
        // effective inset crosses the radius. Validation rejects this
        // configuration, and the clamp itself degrades to the reference
        // point rather than a negative reach.
        let state = state(30.0, 29.0, BoundaryShape::Circle);
        let clamped = clamp_to_boundary(Vec2::new(200.0, 0.0), Vec2::ZERO, Vec2::ZERO, &state, 2.0);

        assert!(clamped.x >= 0.0);
        assert_eq!(clamped, Vec2::ZERO);
    }

    #[test]
    fn point_at_inner_edge_is_a_fixed_point() {
        let state = state(50.0, 3.0, BoundaryShape::Circle);
        let at_inner_edge = Vec2::new(0.0, 47.0);
        let clamped = clamp_to_boundary(at_inner_edge, Vec2::ZERO, Vec2::ZERO, &state, 0.0);

        assert_eq!(clamped, at_inner_edge);
    }
}
