//! Minimap display sync: consumes registry events, drives the rendering
//! collaborator, and re-clamps every presented marker each frame.

pub mod renderer;

use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::clamp::clamp_to_boundary;
use crate::markers::{category_clamp_inset, MarkerRecord};
use crate::plugins::core::{connect_lifecycle_log, FrameStage, InputBindings};
use crate::plugins::player::{current_reference_position, PlayerControl, WorldPosition};
use crate::projection::ProjectionState;
use crate::registry::{MarkerEvent, MarkerRegistry};

use renderer::{MarkerRenderer, VisualHandle};

pub struct MinimapPlugin;

// =============================================================================
// Frame context
// =============================================================================

/// Per-frame snapshot taken once before any marker is positioned, so every
/// marker in a frame sees the same projection state and reference point.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    pub projection: ProjectionState,
    pub reference_world: Vec3,
    pub content_translation: Vec2,
    pub reference_viewport: Vec2,
}

impl FrameContext {
    pub fn new(projection: ProjectionState, reference_world: Vec3) -> Self {
        let reference_viewport = projection.reference_viewport_position(reference_world);
        Self {
            projection,
            reference_world,
            // The marker layer shares the content layer's translation, so
            // clamped positions come back center-relative.
            content_translation: reference_viewport,
            reference_viewport,
        }
    }
}

#[derive(Resource, Clone, Copy, Debug)]
pub struct CurrentFrame(pub FrameContext);

impl Default for CurrentFrame {
    fn default() -> Self {
        Self(FrameContext::new(ProjectionState::default(), Vec3::ZERO))
    }
}

/// Unclamped relative projection, then the boundary clamp with the
/// per-category inset. The one path every displayed position goes through.
pub fn marker_display_position(record: &MarkerRecord, frame: &FrameContext) -> Vec2 {
    let relative = frame
        .projection
        .relative_marker_position(record.nudged_position(), frame.reference_world);

    clamp_to_boundary(
        relative,
        frame.content_translation,
        frame.reference_viewport,
        &frame.projection,
        category_clamp_inset(record.category),
    )
}

// =============================================================================
// Display sync
// =============================================================================

/// Per-marker presentation state machine: an id is either absent or
/// presenting with a live visual handle.
#[derive(Resource, Default)]
pub struct DisplaySync {
    presenting: HashMap<String, VisualHandle>,
}

impl DisplaySync {
    pub fn apply_event(
        &mut self,
        event: &MarkerEvent,
        renderer: &mut dyn MarkerRenderer,
        frame: &FrameContext,
    ) {
        match event {
            MarkerEvent::Added(record) | MarkerEvent::Updated(record) => {
                self.present(record, renderer, frame);
            }
            MarkerEvent::Removed(id) => {
                if let Some(handle) = self.presenting.remove(id) {
                    renderer.destroy_visual(handle);
                }
            }
        }
    }

    /// Presents a record: repositions the existing visual, or creates one if
    /// the id is absent (which also makes a later `Updated` the natural
    /// retry after a missing asset). Never recreates a live visual.
    fn present(
        &mut self,
        record: &MarkerRecord,
        renderer: &mut dyn MarkerRenderer,
        frame: &FrameContext,
    ) {
        let position = marker_display_position(record, frame);

        if let Some(&handle) = self.presenting.get(&record.id) {
            renderer.set_position(handle, position);
            renderer.set_visible(handle, record.visible_on_minimap);
            return;
        }

        match renderer.create_visual(&record.asset, position) {
            Ok(handle) => {
                if !record.visible_on_minimap {
                    renderer.set_visible(handle, false);
                }
                self.presenting.insert(record.id.clone(), handle);
            }
            Err(error) => {
                warn!("minimap visual for {} unavailable: {}", record.id, error);
            }
        }
    }

    /// The always-on per-frame pass: re-clamps every presenting marker from
    /// the latest reference position, no registry event required. Ids that
    /// are not presenting are skipped.
    pub fn reposition_all<'a>(
        &mut self,
        records: impl Iterator<Item = &'a MarkerRecord>,
        renderer: &mut dyn MarkerRenderer,
        frame: &FrameContext,
    ) {
        for record in records {
            let Some(&handle) = self.presenting.get(&record.id) else {
                continue;
            };
            renderer.set_position(handle, marker_display_position(record, frame));
            renderer.set_visible(handle, record.visible_on_minimap);
        }
    }

    pub fn is_presenting(&self, id: &str) -> bool {
        self.presenting.contains_key(id)
    }

    pub fn presenting_count(&self) -> usize {
        self.presenting.len()
    }
}

// =============================================================================
// Registry hookup
// =============================================================================

/// Event queue owned by the minimap consumer. The registry callback only
/// enqueues; mutation-side effects run from this plugin's own systems.
#[derive(Resource, Clone, Default)]
pub struct PendingMarkerEvents(Arc<Mutex<VecDeque<MarkerEvent>>>);

fn connect_display_sync(mut registry: ResMut<MarkerRegistry>, pending: Res<PendingMarkerEvents>) {
    let queue = pending.0.clone();
    registry.subscribe(Box::new(move |event| {
        match queue.lock() {
            Ok(mut queue) => {
                queue.push_back(event.clone());
                Ok(())
            }
            Err(_) => Err(crate::registry::SubscriberError(
                "minimap event queue mutex poisoned".to_string(),
            )),
        }
    }));
}

// =============================================================================
// Plugin
// =============================================================================

impl Plugin for MinimapPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DisplaySync>()
            .init_resource::<PendingMarkerEvents>()
            .init_resource::<CurrentFrame>()
            .init_resource::<renderer::UiMarkerRenderer>()
            .init_resource::<renderer::MarkerDotIndex>()
            .add_systems(Startup, renderer::setup_minimap_frame)
            .add_systems(Startup, connect_display_sync.after(connect_lifecycle_log))
            .add_systems(
                Update,
                (snapshot_frame, drain_marker_events, reposition_markers)
                    .chain()
                    .in_set(FrameStage::Sync),
            )
            .add_systems(
                Update,
                (renderer::apply_render_ops, handle_minimap_toggle).in_set(FrameStage::Render),
            );
    }
}

// =============================================================================
// Systems
// =============================================================================

fn snapshot_frame(
    projection: Res<ProjectionState>,
    players: Query<&WorldPosition, With<PlayerControl>>,
    mut frame: ResMut<CurrentFrame>,
) {
    frame.0 = FrameContext::new(*projection, current_reference_position(&players));
}

fn drain_marker_events(
    pending: Res<PendingMarkerEvents>,
    frame: Res<CurrentFrame>,
    mut sync: ResMut<DisplaySync>,
    mut ui_renderer: ResMut<renderer::UiMarkerRenderer>,
) {
    let Ok(mut queue) = pending.0.lock() else {
        return;
    };

    while let Some(event) = queue.pop_front() {
        sync.apply_event(&event, &mut *ui_renderer, &frame.0);
    }
}

fn reposition_markers(
    registry: Res<MarkerRegistry>,
    frame: Res<CurrentFrame>,
    mut sync: ResMut<DisplaySync>,
    mut ui_renderer: ResMut<renderer::UiMarkerRenderer>,
) {
    sync.reposition_all(registry.records(), &mut *ui_renderer, &frame.0);
}

fn handle_minimap_toggle(
    input: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    mut frames: Query<&mut Visibility, With<renderer::MinimapRoot>>,
) {
    if !input.just_pressed(bindings.toggle_minimap) {
        return;
    }

    for mut visibility in frames.iter_mut() {
        *visibility = match *visibility {
            Visibility::Hidden => Visibility::Inherited,
            _ => Visibility::Hidden,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::renderer::{RecordedOp, RecordingRenderer};
    use super::*;
    use crate::markers::MarkerCategory;

    fn frame_at_origin(radius: f32, inset: f32) -> FrameContext {
        let projection = ProjectionState {
            boundary_radius: radius,
            edge_inset: inset,
            ..Default::default()
        };
        FrameContext::new(projection, Vec3::ZERO)
    }

    // Category without offsets or extra clamp inset, so positions are exact.
    fn plain_record(source: &str, x: f32, z: f32) -> MarkerRecord {
        MarkerRecord::new(MarkerCategory::Other, source, Vec3::new(x, 0.0, z))
    }

    #[test]
    fn added_creates_visual_at_clamped_position() {
        let mut sync = DisplaySync::default();
        let mut renderer = RecordingRenderer::default();
        let frame = frame_at_origin(50.0, 3.0);
        let record = plain_record("A", 200.0, 0.0);

        sync.apply_event(&MarkerEvent::Added(record.clone()), &mut renderer, &frame);

        assert!(sync.is_presenting(&record.id));
        match &renderer.ops[0] {
            RecordedOp::Create(_, asset, position) => {
                assert_eq!(asset, "dot/misc");
                assert!((*position - Vec2::new(47.0, 0.0)).length() < 1e-4);
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn inside_marker_created_at_unclamped_position() {
        let mut sync = DisplaySync::default();
        let mut renderer = RecordingRenderer::default();
        let frame = frame_at_origin(50.0, 3.0);
        let record = plain_record("A", 10.0, 0.0);

        sync.apply_event(&MarkerEvent::Added(record), &mut renderer, &frame);

        match &renderer.ops[0] {
            RecordedOp::Create(_, _, position) => {
                assert_eq!(*position, Vec2::new(10.0, 0.0));
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn updated_repositions_without_recreating() {
        let mut sync = DisplaySync::default();
        let mut renderer = RecordingRenderer::default();
        let frame = frame_at_origin(50.0, 3.0);

        sync.apply_event(
            &MarkerEvent::Added(plain_record("A", 10.0, 0.0)),
            &mut renderer,
            &frame,
        );
        sync.apply_event(
            &MarkerEvent::Updated(plain_record("A", 20.0, 0.0)),
            &mut renderer,
            &frame,
        );

        let creates = renderer
            .ops
            .iter()
            .filter(|op| matches!(op, RecordedOp::Create(..)))
            .count();
        assert_eq!(creates, 1);
        assert!(renderer
            .ops
            .iter()
            .any(|op| matches!(op, RecordedOp::SetPosition(_, p) if *p == Vec2::new(20.0, 0.0))));
        assert_eq!(sync.presenting_count(), 1);
    }

    #[test]
    fn updated_for_unknown_id_presents_like_added() {
        let mut sync = DisplaySync::default();
        let mut renderer = RecordingRenderer::default();
        let frame = frame_at_origin(50.0, 3.0);

        sync.apply_event(
            &MarkerEvent::Updated(plain_record("ghost", 5.0, 5.0)),
            &mut renderer,
            &frame,
        );

        assert!(sync.is_presenting("Misc_Marker_ghost"));
        assert!(matches!(renderer.ops[0], RecordedOp::Create(..)));
    }

    #[test]
    fn removed_destroys_visual_and_stops_repositioning() {
        let mut sync = DisplaySync::default();
        let mut renderer = RecordingRenderer::default();
        let frame = frame_at_origin(50.0, 3.0);
        let record = plain_record("A", 10.0, 0.0);

        sync.apply_event(&MarkerEvent::Added(record.clone()), &mut renderer, &frame);
        sync.apply_event(
            &MarkerEvent::Removed(record.id.clone()),
            &mut renderer,
            &frame,
        );

        assert!(!sync.is_presenting(&record.id));
        assert!(matches!(
            renderer.ops.last(),
            Some(RecordedOp::Destroy(_))
        ));

        renderer.ops.clear();
        sync.reposition_all([&record].into_iter(), &mut renderer, &frame);
        assert!(renderer.ops.is_empty());
    }

    #[test]
    fn removed_for_absent_id_is_a_no_op() {
        let mut sync = DisplaySync::default();
        let mut renderer = RecordingRenderer::default();
        let frame = frame_at_origin(50.0, 3.0);

        sync.apply_event(
            &MarkerEvent::Removed("Misc_Marker_none".to_string()),
            &mut renderer,
            &frame,
        );

        assert!(renderer.ops.is_empty());
    }

    #[test]
    fn missing_asset_leaves_marker_absent_and_update_retries() {
        let mut sync = DisplaySync::default();
        let mut renderer = RecordingRenderer::default();
        renderer.rejected_assets.insert("dot/misc".to_string());
        let frame = frame_at_origin(50.0, 3.0);
        let record = plain_record("A", 10.0, 0.0);

        sync.apply_event(&MarkerEvent::Added(record.clone()), &mut renderer, &frame);
        assert!(!sync.is_presenting(&record.id));
        assert!(renderer.ops.is_empty());

        // The asset becomes available; the next update is the retry path.
        renderer.rejected_assets.clear();
        sync.apply_event(&MarkerEvent::Updated(record.clone()), &mut renderer, &frame);
        assert!(sync.is_presenting(&record.id));
    }

    #[test]
    fn reposition_pass_follows_the_moving_reference() {
        let mut sync = DisplaySync::default();
        let mut renderer = RecordingRenderer::default();
        let record = plain_record("A", 10.0, 0.0);

        let frame = frame_at_origin(50.0, 3.0);
        sync.apply_event(&MarkerEvent::Added(record.clone()), &mut renderer, &frame);
        renderer.ops.clear();

        // The reference moves; no registry event fires, the pass re-clamps.
        let moved = FrameContext::new(frame.projection, Vec3::new(5.0, 0.0, 0.0));
        sync.reposition_all([&record].into_iter(), &mut renderer, &moved);

        assert!(renderer
            .ops
            .iter()
            .any(|op| matches!(op, RecordedOp::SetPosition(_, p) if *p == Vec2::new(5.0, 0.0))));
    }

    #[test]
    fn minimap_visibility_flag_reaches_the_renderer() {
        let mut sync = DisplaySync::default();
        let mut renderer = RecordingRenderer::default();
        let frame = frame_at_origin(50.0, 3.0);
        let record = plain_record("A", 10.0, 0.0).with_visibility(false, true);

        sync.apply_event(&MarkerEvent::Added(record), &mut renderer, &frame);

        assert!(renderer
            .ops
            .iter()
            .any(|op| matches!(op, RecordedOp::SetVisible(_, false))));
    }

    #[test]
    fn frame_context_snapshot_keeps_reference_and_content_consistent() {
        let projection = ProjectionState::default();
        let frame = FrameContext::new(projection, Vec3::new(30.0, 0.0, -10.0));

        assert_eq!(frame.content_translation, frame.reference_viewport);
        assert_eq!(
            frame.reference_viewport,
            projection.reference_viewport_position(Vec3::new(30.0, 0.0, -10.0))
        );
    }
}
