//! Demo data sources standing in for the quest/contract/property/vehicle
//! trackers that feed the registry in a real deployment.

use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::prelude::*;

use crate::markers::{category_asset_key, category_default_offset, MarkerCategory, VisualAssetRef};
use crate::plugins::core::{EventLog, FrameStage, InputBindings};
use crate::plugins::player::{current_reference_position, PlayerControl, WorldPosition};
use crate::registry::{report_entity, MarkerRegistry};

pub struct ProvidersPlugin;

// =============================================================================
// Components and resources
// =============================================================================

/// A world entity some provider tracks. Reports flow to the registry
/// whenever the tracked state or position changes.
#[derive(Component, Debug)]
pub struct TrackedSite {
    pub category: MarkerCategory,
    pub source_id: String,
    pub tracking_enabled: bool,
}

/// Circular patrol path for the demo vehicle; produces a continuous stream
/// of position updates.
#[derive(Component, Debug)]
pub struct Patrol {
    pub center: Vec2,
    pub radius: f32,
    pub angular_speed: f32,
    pub angle: f32,
}

#[derive(Resource, Default)]
pub struct ContractCounter(u32);

// =============================================================================
// Plugin
// =============================================================================

impl Plugin for ProvidersPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ContractCounter>()
            .add_systems(Startup, spawn_demo_sites)
            .add_systems(
                Update,
                (
                    patrol_vehicles,
                    handle_contract_input,
                    handle_supplier_toggle,
                    report_changed_sites,
                )
                    .chain()
                    .in_set(FrameStage::Report),
            );
    }
}

// =============================================================================
// Systems
// =============================================================================

fn spawn_demo_sites(mut commands: Commands, mut counter: ResMut<ContractCounter>) {
    let sites = [
        (MarkerCategory::RegularQuest, "Courier", 120.0, -80.0),
        (MarkerCategory::DeadDrop, "Canal", -200.0, 150.0),
        (MarkerCategory::Property, "Safehouse", 60.0, 300.0),
        (MarkerCategory::Supplier, "Docks", -320.0, -60.0),
    ];

    for (category, source_id, x, z) in sites {
        commands.spawn((
            TrackedSite {
                category,
                source_id: source_id.to_string(),
                tracking_enabled: true,
            },
            WorldPosition(Vec3::new(x, 0.0, z)),
            Name::new(format!("Site-{source_id}")),
        ));
    }

    for (x, z) in [(260.0, 40.0), (-150.0, -220.0)] {
        spawn_contract(&mut commands, &mut counter, Vec3::new(x, 0.0, z));
    }

    commands.spawn((
        TrackedSite {
            category: MarkerCategory::Vehicle,
            source_id: "Patrol-1".to_string(),
            tracking_enabled: true,
        },
        WorldPosition(patrol_position(Vec2::ZERO, 180.0, 0.0)),
        Patrol {
            center: Vec2::ZERO,
            radius: 180.0,
            angular_speed: 0.4,
            angle: 0.0,
        },
        Name::new("Site-Patrol-1"),
    ));
}

fn spawn_contract(commands: &mut Commands, counter: &mut ContractCounter, position: Vec3) {
    counter.0 += 1;
    let source_id = format!("C{}", counter.0);

    commands.spawn((
        TrackedSite {
            category: MarkerCategory::Contract,
            source_id: source_id.clone(),
            tracking_enabled: true,
        },
        WorldPosition(position),
        Name::new(format!("Site-{source_id}")),
    ));
}

pub fn patrol_position(center: Vec2, radius: f32, angle: f32) -> Vec3 {
    Vec3::new(
        center.x + radius * angle.cos(),
        0.0,
        center.y + radius * angle.sin(),
    )
}

fn patrol_vehicles(time: Res<Time>, mut patrols: Query<(&mut Patrol, &mut WorldPosition)>) {
    for (mut patrol, mut position) in patrols.iter_mut() {
        patrol.angle += patrol.angular_speed * time.delta_secs();
        position.0 = patrol_position(patrol.center, patrol.radius, patrol.angle);
    }
}

/// Pushes every new or changed site into the registry. Change detection
/// covers first-frame spawns, position updates, and tracking toggles; the
/// registry diffs them into added/updated/removed events.
fn report_changed_sites(
    mut registry: ResMut<MarkerRegistry>,
    sites: Query<
        (&TrackedSite, &WorldPosition),
        Or<(Changed<TrackedSite>, Changed<WorldPosition>)>,
    >,
) {
    for (site, position) in sites.iter() {
        report_entity(
            &mut registry,
            site.category,
            &site.source_id,
            position.0,
            VisualAssetRef::new(category_asset_key(site.category)),
            category_default_offset(site.category),
            site.tracking_enabled,
        );
    }
}

/// C drops a new contract near the player; X tears the whole category down
/// through the prefix removal path.
fn handle_contract_input(
    mut commands: Commands,
    input: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    mut counter: ResMut<ContractCounter>,
    mut registry: ResMut<MarkerRegistry>,
    mut log: ResMut<EventLog>,
    players: Query<&WorldPosition, With<PlayerControl>>,
    contracts: Query<(Entity, &TrackedSite)>,
) {
    if input.just_pressed(bindings.spawn_contract) {
        let anchor = current_reference_position(&players);
        spawn_contract(
            &mut commands,
            &mut counter,
            anchor + Vec3::new(40.0, 0.0, -30.0),
        );
    }

    if input.just_pressed(bindings.clear_contracts) {
        registry.remove_by_prefix("Contract_Marker");

        let mut removed = 0;
        for (entity, site) in contracts.iter() {
            if site.category == MarkerCategory::Contract {
                commands.entity(entity).despawn();
                removed += 1;
            }
        }
        log.push(format!("Contracts cleared ({removed})"));
    }
}

fn handle_supplier_toggle(
    input: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    mut log: ResMut<EventLog>,
    mut sites: Query<&mut TrackedSite>,
) {
    if !input.just_pressed(bindings.toggle_supplier) {
        return;
    }

    for mut site in sites.iter_mut() {
        if site.category == MarkerCategory::Supplier {
            site.tracking_enabled = !site.tracking_enabled;
            log.push(format!(
                "Supplier {} tracking: {}",
                site.source_id, site.tracking_enabled
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patrol_position_starts_east_of_center() {
        let position = patrol_position(Vec2::new(10.0, 20.0), 5.0, 0.0);
        assert_eq!(position, Vec3::new(15.0, 0.0, 20.0));
    }

    #[test]
    fn patrol_position_stays_on_the_circle() {
        let center = Vec2::new(-30.0, 40.0);
        for step in 0..16 {
            let angle = step as f32 * std::f32::consts::TAU / 16.0;
            let position = patrol_position(center, 180.0, angle);
            let distance = Vec2::new(position.x - center.x, position.z - center.y).length();
            assert!((distance - 180.0).abs() < 1e-3);
        }
    }

    #[test]
    fn patrol_position_is_on_the_ground_plane() {
        let position = patrol_position(Vec2::ZERO, 100.0, 1.3);
        assert_eq!(position.y, 0.0);
    }
}
