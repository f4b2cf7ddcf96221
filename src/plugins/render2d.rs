//! Demo world view: a 2D top-down rendering of the player and the tracked
//! sites, so marker movement on the minimap has something to correspond to.

use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::prelude::*;
use std::collections::HashMap;

use crate::compat::{Camera2dBundle, SpriteBundle};
use crate::markers::{category_display_scale, MarkerCategory};
use crate::plugins::core::FrameStage;
use crate::plugins::player::{PlayerControl, WorldPosition};
use crate::plugins::providers::TrackedSite;

pub struct Render2DPlugin;

// =============================================================================
// Components
// =============================================================================

#[derive(Component)]
pub struct SiteVisual {
    pub target: Entity,
}

/// Prevents duplicate visual spawning, one per site entity.
#[derive(Component)]
pub struct SiteVisualMarker;

#[derive(Component)]
pub struct PlayerVisual;

// =============================================================================
// Plugin
// =============================================================================

impl Plugin for Render2DPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                (
                    spawn_site_visuals,
                    sync_site_visuals,
                    spawn_player_visual,
                    sync_player_visual,
                    track_player_camera,
                )
                    .in_set(FrameStage::Render),
            );
    }
}

// =============================================================================
// Systems
// =============================================================================

fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2dBundle::default());
}

/// World (x, z) onto the screen plane; north (negative z) points up.
fn world_to_screen(position: Vec3, layer: f32) -> Vec3 {
    Vec3::new(position.x, -position.z, layer)
}

fn site_color(category: MarkerCategory) -> Color {
    match category {
        MarkerCategory::RegularQuest => Color::srgb(0.95, 0.85, 0.3),
        MarkerCategory::DeadDrop => Color::srgb(0.6, 0.4, 0.9),
        MarkerCategory::Contract => Color::srgb(0.3, 0.85, 0.5),
        MarkerCategory::Property => Color::srgb(0.35, 0.7, 0.95),
        MarkerCategory::Vehicle => Color::srgb(0.9, 0.55, 0.25),
        MarkerCategory::Supplier => Color::srgb(0.9, 0.3, 0.35),
        MarkerCategory::Other => Color::srgb(0.7, 0.7, 0.7),
    }
}

fn spawn_site_visuals(
    mut commands: Commands,
    sites: Query<(Entity, &TrackedSite, &WorldPosition), Without<SiteVisualMarker>>,
) {
    for (entity, site, position) in sites.iter() {
        commands.entity(entity).insert(SiteVisualMarker);

        commands.spawn((
            SiteVisual { target: entity },
            SpriteBundle {
                sprite: Sprite {
                    color: site_color(site.category),
                    custom_size: Some(Vec2::splat(12.0 * category_display_scale(site.category))),
                    ..default()
                },
                transform: Transform::from_translation(world_to_screen(position.0, 0.0)),
                ..default()
            },
            Name::new(format!("Visual-{}", site.source_id)),
        ));
    }
}

fn sync_site_visuals(
    mut commands: Commands,
    mut params: ParamSet<(
        Query<(Entity, &SiteVisual, &mut Transform)>,
        Query<(Entity, &WorldPosition), With<TrackedSite>>,
    )>,
) {
    let site_positions = {
        let sites = params.p1();
        let mut map = HashMap::new();

        for (entity, position) in sites.iter() {
            map.insert(entity, position.0);
        }

        map
    };

    let mut visuals = params.p0();

    for (visual_entity, visual, mut transform) in visuals.iter_mut() {
        if let Some(position) = site_positions.get(&visual.target) {
            transform.translation = world_to_screen(*position, 0.0);
        } else {
            commands.entity(visual_entity).despawn();
        }
    }
}

fn spawn_player_visual(
    mut commands: Commands,
    players: Query<&WorldPosition, With<PlayerControl>>,
    visuals: Query<(), With<PlayerVisual>>,
) {
    if !visuals.is_empty() {
        return;
    }

    let Ok(position) = players.single() else {
        return;
    };

    commands.spawn((
        PlayerVisual,
        SpriteBundle {
            sprite: Sprite {
                color: Color::WHITE,
                custom_size: Some(Vec2::new(14.0, 14.0)),
                ..default()
            },
            transform: Transform::from_translation(world_to_screen(position.0, 1.0)),
            ..default()
        },
        Name::new("Visual-Player"),
    ));
}

fn sync_player_visual(
    players: Query<&WorldPosition, With<PlayerControl>>,
    mut visuals: Query<&mut Transform, With<PlayerVisual>>,
) {
    let Ok(position) = players.single() else {
        return;
    };

    for mut transform in visuals.iter_mut() {
        transform.translation = world_to_screen(position.0, 1.0);
    }
}

fn track_player_camera(
    players: Query<&WorldPosition, With<PlayerControl>>,
    mut cameras: Query<&mut Transform, With<Camera>>,
) {
    let Ok(position) = players.single() else {
        return;
    };

    let screen = world_to_screen(position.0, 0.0);
    for mut transform in cameras.iter_mut() {
        transform.translation.x = screen.x;
        transform.translation.y = screen.y;
    }
}
