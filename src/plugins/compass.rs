//! Compass strip: the second registry consumer. Lists compass-visible
//! markers by bearing from the player.

use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::prelude::*;
use bevy::ui::Node as UiNode;

use crate::compat::{TextBundle, TextStyle};
use crate::plugins::core::FrameStage;
use crate::plugins::player::{current_reference_position, PlayerControl, WorldPosition};
use crate::registry::MarkerRegistry;

pub struct CompassPlugin;

#[derive(Component)]
pub struct CompassText;

impl Plugin for CompassPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_compass)
            .add_systems(Update, update_compass_text.in_set(FrameStage::Render));
    }
}

// =============================================================================
// Bearing math and formatting
// =============================================================================

/// Bearing from the reference to a marker on the ground plane, in degrees.
/// 0 is north (negative z), 90 east, measured clockwise.
pub fn bearing_degrees(reference: Vec3, marker: Vec3) -> f32 {
    let dx = marker.x - reference.x;
    let dz = marker.z - reference.z;
    let degrees = dx.atan2(-dz).to_degrees();
    if degrees < 0.0 {
        degrees + 360.0
    } else {
        degrees
    }
}

pub fn cardinal_label(bearing: f32) -> &'static str {
    // 8-way, each sector 45 degrees wide centered on the cardinal.
    let sector = ((bearing + 22.5) / 45.0).floor() as i32 % 8;
    match sector {
        0 => "N",
        1 => "NE",
        2 => "E",
        3 => "SE",
        4 => "S",
        5 => "SW",
        6 => "W",
        _ => "NW",
    }
}

pub fn format_compass_line(entries: &[(String, f32)]) -> String {
    if entries.is_empty() {
        return "Compass: (no contacts)".to_string();
    }

    let mut sorted: Vec<&(String, f32)> = entries.iter().collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let formatted: Vec<String> = sorted
        .iter()
        .map(|(name, bearing)| {
            format!("{} {:03.0}\u{b0} {}", cardinal_label(*bearing), bearing, name)
        })
        .collect();

    format!("Compass: {}", formatted.join(" | "))
}

// =============================================================================
// Systems
// =============================================================================

fn setup_compass(mut commands: Commands) {
    commands.spawn((
        CompassText,
        TextBundle::from_section(
            "Compass: (no contacts)",
            TextStyle {
                font_size: 14.0,
                color: Color::srgb(0.85, 0.9, 0.95),
                ..default()
            },
        )
        .with_node(UiNode {
            position_type: PositionType::Absolute,
            left: Val::Px(14.0),
            top: Val::Px(34.0),
            ..default()
        }),
    ));
}

fn update_compass_text(
    registry: Res<MarkerRegistry>,
    players: Query<&WorldPosition, With<PlayerControl>>,
    mut texts: Query<&mut Text, With<CompassText>>,
) {
    let reference = current_reference_position(&players);

    let entries: Vec<(String, f32)> = registry
        .records()
        .filter(|record| record.visible_on_compass)
        .map(|record| {
            (
                record.display_name.clone(),
                bearing_degrees(reference, record.nudged_position()),
            )
        })
        .collect();

    let line = format_compass_line(&entries);
    for mut text in texts.iter_mut() {
        text.0 = line.clone();
    }
}
