//! Marker data model: categories, records, and per-category tuning tables.

use bevy::prelude::*;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MarkerCategory {
    RegularQuest,
    DeadDrop,
    Contract,
    Property,
    Vehicle,
    Supplier,
    Other,
}

/// Opaque asset key consumed only by the rendering collaborator. The engine
/// passes it through without interpreting its contents.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VisualAssetRef(pub String);

impl VisualAssetRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn key(&self) -> &str {
        &self.0
    }
}

/// One entry per trackable entity. Updates are full replacements: callers
/// supply the complete desired state, never a field-level patch.
#[derive(Clone, Debug)]
pub struct MarkerRecord {
    /// Stable unique key: category prefix + source id. Immutable after creation.
    pub id: String,
    /// Last known 3D location. The vertical axis is discarded at projection.
    pub world_position: Vec3,
    pub category: MarkerCategory,
    /// Diagnostics only; never drives behavior.
    pub display_name: String,
    /// Tracked state as reported by the data source.
    pub tracking_enabled: bool,
    pub visible_on_minimap: bool,
    pub visible_on_compass: bool,
    /// World-space (x, z) nudge applied before projection.
    pub offset: Vec2,
    pub asset: VisualAssetRef,
}

impl MarkerRecord {
    pub fn new(category: MarkerCategory, source_id: &str, world_position: Vec3) -> Self {
        Self {
            id: marker_key(category, source_id),
            world_position,
            category,
            display_name: source_id.to_string(),
            tracking_enabled: true,
            visible_on_minimap: true,
            visible_on_compass: true,
            offset: category_default_offset(category),
            asset: VisualAssetRef::new(category_asset_key(category)),
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = name.to_string();
        self
    }

    pub fn with_asset(mut self, asset: VisualAssetRef) -> Self {
        self.asset = asset;
        self
    }

    pub fn with_visibility(mut self, minimap: bool, compass: bool) -> Self {
        self.visible_on_minimap = minimap;
        self.visible_on_compass = compass;
        self
    }

    /// World position with the per-category nudge applied, the value every
    /// projection call should consume.
    pub fn nudged_position(&self) -> Vec3 {
        Vec3::new(
            self.world_position.x + self.offset.x,
            self.world_position.y,
            self.world_position.z + self.offset.y,
        )
    }
}

pub const ALL_CATEGORIES: [MarkerCategory; 7] = [
    MarkerCategory::RegularQuest,
    MarkerCategory::DeadDrop,
    MarkerCategory::Contract,
    MarkerCategory::Property,
    MarkerCategory::Vehicle,
    MarkerCategory::Supplier,
    MarkerCategory::Other,
];

/// Key prefix per category. Keys are derived once at registration time by an
/// explicit strategy, never by looking up fields on the source entity.
pub fn category_key_prefix(category: MarkerCategory) -> &'static str {
    match category {
        MarkerCategory::RegularQuest => "Quest_Marker",
        MarkerCategory::DeadDrop => "DeadDrop_Marker",
        MarkerCategory::Contract => "Contract_Marker",
        MarkerCategory::Property => "Property_Marker",
        MarkerCategory::Vehicle => "Vehicle_Marker",
        MarkerCategory::Supplier => "Supplier_Marker",
        MarkerCategory::Other => "Misc_Marker",
    }
}

pub fn marker_key(category: MarkerCategory, source_id: &str) -> String {
    format!("{}_{}", category_key_prefix(category), source_id)
}

/// Fixed world-space nudge keeping a category's markers off their anchor
/// point (contracts would otherwise sit exactly on the contact giver).
pub fn category_default_offset(category: MarkerCategory) -> Vec2 {
    match category {
        MarkerCategory::Contract => Vec2::new(2.0, 2.0),
        MarkerCategory::Supplier => Vec2::new(-2.0, 0.0),
        MarkerCategory::RegularQuest
        | MarkerCategory::DeadDrop
        | MarkerCategory::Property
        | MarkerCategory::Vehicle
        | MarkerCategory::Other => Vec2::ZERO,
    }
}

/// Relative size of the rendered dot.
pub fn category_display_scale(category: MarkerCategory) -> f32 {
    match category {
        MarkerCategory::RegularQuest => 1.0,
        MarkerCategory::DeadDrop => 0.8,
        MarkerCategory::Contract => 1.0,
        MarkerCategory::Property => 1.2,
        MarkerCategory::Vehicle => 0.8,
        MarkerCategory::Supplier => 1.0,
        MarkerCategory::Other => 0.7,
    }
}

/// Extra clamp inset per category, added to the global edge inset. Tuned to
/// compensate per-asset visual centering; data, not clamp logic.
pub fn category_clamp_inset(category: MarkerCategory) -> f32 {
    match category {
        MarkerCategory::Property => 2.0,
        MarkerCategory::Vehicle => 1.0,
        MarkerCategory::RegularQuest
        | MarkerCategory::DeadDrop
        | MarkerCategory::Contract
        | MarkerCategory::Supplier
        | MarkerCategory::Other => 0.0,
    }
}

/// Largest clamp inset across the category table. Configuration validation
/// bounds the effective inset (`edge_inset` plus this) below the boundary
/// radius, so no category can pin a marker past the reference point.
pub fn max_category_clamp_inset() -> f32 {
    ALL_CATEGORIES
        .iter()
        .map(|category| category_clamp_inset(*category))
        .fold(0.0, f32::max)
}

/// Default asset key per category, resolvable by the shipped renderer.
pub fn category_asset_key(category: MarkerCategory) -> &'static str {
    match category {
        MarkerCategory::RegularQuest => "dot/quest",
        MarkerCategory::DeadDrop => "dot/deaddrop",
        MarkerCategory::Contract => "dot/contract",
        MarkerCategory::Property => "dot/property",
        MarkerCategory::Vehicle => "dot/vehicle",
        MarkerCategory::Supplier => "dot/supplier",
        MarkerCategory::Other => "dot/misc",
    }
}
