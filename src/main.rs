use bevy::prelude::*;

mod clamp;
mod compat;
mod markers;
mod plugins;
mod projection;
mod registry;

fn main() {
    let projection = plugins::core::load_preferences().to_projection_state();
    if let Err(err) = projection.validate() {
        eprintln!("invalid minimap preferences: {err}");
        std::process::exit(1);
    }

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.05, 0.07, 0.1)))
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Overmap".to_string(),
                resolution: (1280, 720).into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(projection)
        .add_plugins((
            plugins::core::CorePlugin,
            plugins::player::PlayerPlugin,
            plugins::providers::ProvidersPlugin,
            plugins::render2d::Render2DPlugin,
            plugins::minimap::MinimapPlugin,
            plugins::compass::CompassPlugin,
            plugins::ui::UiPlugin,
        ))
        .run();
}
