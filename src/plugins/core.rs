//! Core configuration: preferences, input bindings, event log, and the
//! frame-stage ordering every other plugin hangs off.

use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::prelude::*;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::projection::{BoundaryShape, ProjectionState};
use crate::registry::{MarkerEvent, MarkerRegistry};

pub struct CorePlugin;

// =============================================================================
// Frame stages
// =============================================================================

/// Per-frame order: providers report, the minimap syncs and repositions,
/// the renderer flushes. One registry mutation pass, then one display pass.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStage {
    Report,
    Sync,
    Render,
}

// =============================================================================
// Preferences
// =============================================================================

const PREFS_PATH: &str = "prefs/overmap.ron";

/// Persisted user preferences. Missing fields fall back to defaults via the
/// container-level serde default.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MinimapPreferences {
    pub world_to_viewport_scale: f32,
    pub zoom_level: f32,
    pub boundary_shape: BoundaryShape,
    pub boundary_radius: f32,
    pub edge_inset: f32,
}

impl Default for MinimapPreferences {
    fn default() -> Self {
        let state = ProjectionState::default();
        Self {
            world_to_viewport_scale: state.world_to_viewport_scale,
            zoom_level: state.zoom_level,
            boundary_shape: state.boundary_shape,
            boundary_radius: state.boundary_radius,
            edge_inset: state.edge_inset,
        }
    }
}

impl MinimapPreferences {
    pub fn to_projection_state(self) -> ProjectionState {
        ProjectionState {
            world_to_viewport_scale: self.world_to_viewport_scale,
            zoom_level: self.zoom_level,
            boundary_shape: self.boundary_shape,
            boundary_radius: self.boundary_radius,
            edge_inset: self.edge_inset,
            reference_offset: Vec2::ZERO,
        }
    }

    pub fn from_projection_state(state: &ProjectionState) -> Self {
        Self {
            world_to_viewport_scale: state.world_to_viewport_scale,
            zoom_level: state.zoom_level,
            boundary_shape: state.boundary_shape,
            boundary_radius: state.boundary_radius,
            edge_inset: state.edge_inset,
        }
    }
}

/// Reads preferences from disk. A missing file yields defaults silently; a
/// malformed file is reported and replaced by defaults.
pub fn load_preferences() -> MinimapPreferences {
    match fs::read_to_string(PREFS_PATH) {
        Ok(contents) => match ron::de::from_str::<MinimapPreferences>(&contents) {
            Ok(prefs) => prefs,
            Err(error) => {
                eprintln!("failed to parse {}: {}", PREFS_PATH, error);
                MinimapPreferences::default()
            }
        },
        Err(_) => MinimapPreferences::default(),
    }
}

fn save_preferences(state: &ProjectionState) {
    let prefs = MinimapPreferences::from_projection_state(state);
    let config = ron::ser::PrettyConfig::default();

    let serialized = match ron::ser::to_string_pretty(&prefs, config) {
        Ok(serialized) => serialized,
        Err(error) => {
            error!("preference serialization failed: {}", error);
            return;
        }
    };

    if let Some(dir) = Path::new(PREFS_PATH).parent() {
        if let Err(error) = fs::create_dir_all(dir) {
            error!("preference directory creation failed: {}", error);
            return;
        }
    }

    if let Err(error) = fs::write(PREFS_PATH, serialized) {
        error!("preference write failed: {}", error);
    }
}

// =============================================================================
// Resources
// =============================================================================

#[derive(Resource, Debug)]
pub struct EventLog {
    entries: Vec<String>,
    max_entries: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: 8,
        }
    }
}

impl EventLog {
    pub fn push(&mut self, entry: String) {
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let overflow = self.entries.len() - self.max_entries;
            self.entries.drain(0..overflow);
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Lifecycle lines produced by the registry subscriber, drained into the
/// on-screen log from the frame loop.
#[derive(Resource, Clone, Default)]
pub struct LifecycleLog(Arc<Mutex<VecDeque<String>>>);

#[derive(Resource, Debug, Clone)]
pub struct InputBindings {
    pub move_up: KeyCode,
    pub move_down: KeyCode,
    pub move_left: KeyCode,
    pub move_right: KeyCode,
    pub zoom_in: KeyCode,
    pub zoom_out: KeyCode,
    pub radius_up: KeyCode,
    pub radius_down: KeyCode,
    pub toggle_shape: KeyCode,
    pub toggle_minimap: KeyCode,
    pub spawn_contract: KeyCode,
    pub clear_contracts: KeyCode,
    pub toggle_supplier: KeyCode,
}

impl Default for InputBindings {
    fn default() -> Self {
        Self {
            move_up: KeyCode::KeyW,
            move_down: KeyCode::KeyS,
            move_left: KeyCode::KeyA,
            move_right: KeyCode::KeyD,
            zoom_in: KeyCode::Equal,
            zoom_out: KeyCode::Minus,
            radius_up: KeyCode::BracketRight,
            radius_down: KeyCode::BracketLeft,
            toggle_shape: KeyCode::KeyB,
            toggle_minimap: KeyCode::KeyM,
            spawn_contract: KeyCode::KeyC,
            clear_contracts: KeyCode::KeyX,
            toggle_supplier: KeyCode::KeyT,
        }
    }
}

// =============================================================================
// Plugin
// =============================================================================

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MarkerRegistry>()
            .init_resource::<EventLog>()
            .init_resource::<LifecycleLog>()
            .init_resource::<InputBindings>()
            .configure_sets(
                Update,
                (FrameStage::Report, FrameStage::Sync, FrameStage::Render).chain(),
            )
            .add_systems(Startup, connect_lifecycle_log)
            .add_systems(
                Update,
                (handle_zoom_input, handle_boundary_input).in_set(FrameStage::Report),
            )
            .add_systems(Update, drain_lifecycle_log.in_set(FrameStage::Render));
    }
}

// =============================================================================
// Systems
// =============================================================================

/// First registry subscriber: feeds marker lifecycle lines to the event log.
/// Runs in `Startup` before the minimap subscribes its own queue.
pub fn connect_lifecycle_log(mut registry: ResMut<MarkerRegistry>, lifecycle: Res<LifecycleLog>) {
    let queue = lifecycle.0.clone();
    registry.subscribe(Box::new(move |event| {
        let line = match event {
            MarkerEvent::Added(record) => {
                format!("Marker added: {}", record.display_name)
            }
            MarkerEvent::Updated(_) => return Ok(()),
            MarkerEvent::Removed(id) => format!("Marker removed: {}", id),
        };
        match queue.lock() {
            Ok(mut queue) => {
                queue.push_back(line);
                Ok(())
            }
            Err(_) => Err(crate::registry::SubscriberError(
                "lifecycle log mutex poisoned".to_string(),
            )),
        }
    }));
}

fn drain_lifecycle_log(lifecycle: Res<LifecycleLog>, mut log: ResMut<EventLog>) {
    let Ok(mut queue) = lifecycle.0.lock() else {
        return;
    };

    while let Some(line) = queue.pop_front() {
        info!("{}", line);
        log.push(line);
    }
}

fn handle_zoom_input(
    input: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    mut projection: ResMut<ProjectionState>,
    mut log: ResMut<EventLog>,
) {
    let mut updated = false;

    if input.just_pressed(bindings.zoom_in) {
        projection.zoom_level = (projection.zoom_level * 1.25).min(4.0);
        updated = true;
    }

    if input.just_pressed(bindings.zoom_out) {
        projection.zoom_level = (projection.zoom_level / 1.25).max(0.25);
        updated = true;
    }

    if updated {
        log.push(format!("Zoom: {:.2}", projection.zoom_level));
        save_preferences(&projection);
    }
}

fn handle_boundary_input(
    input: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    mut projection: ResMut<ProjectionState>,
    mut log: ResMut<EventLog>,
) {
    let mut updated = false;

    // Bounds keep the boundary inside the rendered frame.
    if input.just_pressed(bindings.radius_up) {
        projection.boundary_radius = (projection.boundary_radius + 10.0).min(100.0);
        updated = true;
    }

    if input.just_pressed(bindings.radius_down) {
        projection.boundary_radius = (projection.boundary_radius - 10.0).max(30.0);
        updated = true;
    }

    if input.just_pressed(bindings.toggle_shape) {
        projection.boundary_shape = match projection.boundary_shape {
            BoundaryShape::Circle => BoundaryShape::Square,
            BoundaryShape::Square => BoundaryShape::Circle,
        };
        updated = true;
    }

    if updated {
        log.push(format!(
            "Boundary: {:?} r{:.0}",
            projection.boundary_shape, projection.boundary_radius
        ));
        save_preferences(&projection);
    }
}
