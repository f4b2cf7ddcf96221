pub mod compass;
pub mod core;
pub mod minimap;
pub mod player;
pub mod providers;
pub mod render2d;
pub mod ui;
