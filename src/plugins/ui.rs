//! HUD: projection readout, key help, and the scrolling event log panel.

use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::prelude::*;
use bevy::ui::Node as UiNode;

use crate::compat::{TextBundle, TextStyle};
use crate::plugins::core::{EventLog, FrameStage};
use crate::projection::ProjectionState;
use crate::registry::MarkerRegistry;

pub struct UiPlugin;

#[derive(Component)]
pub struct StatusText;

#[derive(Component)]
pub struct LogText;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_hud)
            .add_systems(
                Update,
                (update_status_text, update_log_text).in_set(FrameStage::Render),
            );
    }
}

// =============================================================================
// Systems
// =============================================================================

fn setup_hud(mut commands: Commands) {
    // Status line (top-left).
    commands.spawn((
        StatusText,
        TextBundle::from_section(
            "Zoom: -- | Radius: -- | Shape: -- | Markers: --",
            TextStyle {
                font_size: 16.0,
                color: Color::srgb(0.9, 0.9, 0.95),
                ..default()
            },
        )
        .with_node(UiNode {
            position_type: PositionType::Absolute,
            left: Val::Px(14.0),
            top: Val::Px(10.0),
            ..default()
        }),
    ));

    // Key help (bottom-right).
    commands.spawn((TextBundle::from_section(
        "WASD move | +/- zoom | [ ] radius | B shape | M minimap | C contract | X clear | T supplier",
        TextStyle {
            font_size: 12.0,
            color: Color::srgb(0.55, 0.6, 0.65),
            ..default()
        },
    )
    .with_node(UiNode {
        position_type: PositionType::Absolute,
        right: Val::Px(14.0),
        bottom: Val::Px(10.0),
        ..default()
    }),));

    // Event log (bottom-left).
    commands.spawn((
        LogText,
        TextBundle::from_section(
            "",
            TextStyle {
                font_size: 13.0,
                color: Color::srgb(0.7, 0.8, 0.75),
                ..default()
            },
        )
        .with_node(UiNode {
            position_type: PositionType::Absolute,
            left: Val::Px(14.0),
            bottom: Val::Px(10.0),
            ..default()
        }),
    ));
}

fn update_status_text(
    projection: Res<ProjectionState>,
    registry: Res<MarkerRegistry>,
    mut texts: Query<&mut Text, With<StatusText>>,
) {
    for mut text in texts.iter_mut() {
        text.0 = format!(
            "Zoom: {:.2} | Radius: {:.0} | Shape: {:?} | Markers: {}",
            projection.zoom_level,
            projection.boundary_radius,
            projection.boundary_shape,
            registry.len()
        );
    }
}

fn update_log_text(log: Res<EventLog>, mut texts: Query<&mut Text, With<LogText>>) {
    if !log.is_changed() {
        return;
    }

    for mut text in texts.iter_mut() {
        text.0 = log.entries().join("\n");
    }
}
