//! The moving reference point the minimap stays centered on.

use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::prelude::*;

use crate::plugins::core::{FrameStage, InputBindings};

pub struct PlayerPlugin;

const PLAYER_SPEED: f32 = 60.0; // world units per second

/// Position on the 3D world grid. The demo keeps everything on the ground
/// plane; the vertical axis exists so the projection can discard it.
#[derive(Component, Debug, Clone, Copy)]
pub struct WorldPosition(pub Vec3);

#[derive(Component, Debug, Default)]
pub struct PlayerControl;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_player)
            .add_systems(Update, player_movement.in_set(FrameStage::Report));
    }
}

fn spawn_player(mut commands: Commands) {
    commands.spawn((
        PlayerControl,
        WorldPosition(Vec3::ZERO),
        Name::new("Player"),
    ));
}

/// WASD drives the player across the x/z plane. North on the minimap is
/// negative z, so "up" decreases z.
fn player_movement(
    time: Res<Time>,
    input: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    mut players: Query<&mut WorldPosition, With<PlayerControl>>,
) {
    let mut direction = Vec2::ZERO;

    if input.pressed(bindings.move_up) {
        direction.y -= 1.0;
    }
    if input.pressed(bindings.move_down) {
        direction.y += 1.0;
    }
    if input.pressed(bindings.move_left) {
        direction.x -= 1.0;
    }
    if input.pressed(bindings.move_right) {
        direction.x += 1.0;
    }

    if direction == Vec2::ZERO {
        return;
    }

    let step = direction.normalize() * PLAYER_SPEED * time.delta_secs();

    for mut position in players.iter_mut() {
        position.0.x += step.x;
        position.0.z += step.y;
    }
}

/// Reference world position polled once per frame. Returns the origin until
/// the player exists, so startup-order races degrade gracefully.
pub fn current_reference_position(
    players: &Query<&WorldPosition, With<PlayerControl>>,
) -> Vec3 {
    players.single().map(|position| position.0).unwrap_or(Vec3::ZERO)
}
