//! Rendering collaborator boundary: opaque visual handles, the renderer
//! trait, and the shipped UI-node implementation.

use bevy::prelude::*;
use bevy::ui::Node as UiNode;
use std::collections::HashMap;

use crate::compat::NodeBundle;
use crate::markers::VisualAssetRef;

pub const MINIMAP_SIZE: f32 = 220.0;
pub const MINIMAP_MARGIN: f32 = 14.0;

/// Opaque reference to an on-screen marker visual. The display sync stores
/// and passes these through; only the renderer knows what they point at.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct VisualHandle(u64);

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no renderable asset for key \"{0}\"")]
    MissingAsset(String),
}

/// The four operations the engine issues to its rendering collaborator.
/// Positions are content-layer-local (the clamp's output space).
pub trait MarkerRenderer {
    fn create_visual(
        &mut self,
        asset: &VisualAssetRef,
        position: Vec2,
    ) -> Result<VisualHandle, RenderError>;
    fn set_position(&mut self, handle: VisualHandle, position: Vec2);
    fn set_visible(&mut self, handle: VisualHandle, visible: bool);
    fn destroy_visual(&mut self, handle: VisualHandle);
}

// =============================================================================
// UI renderer
// =============================================================================

#[derive(Clone, Copy, Debug)]
struct DotStyle {
    color: Color,
    size: f32,
}

/// Resolves an asset key to a dot style. Unknown keys have no renderable
/// representation and surface as `MissingAsset`.
fn resolve_dot_style(key: &str) -> Option<DotStyle> {
    let style = match key {
        "dot/quest" => DotStyle {
            color: Color::srgb(0.95, 0.85, 0.3),
            size: 8.0,
        },
        "dot/deaddrop" => DotStyle {
            color: Color::srgb(0.6, 0.4, 0.9),
            size: 7.0,
        },
        "dot/contract" => DotStyle {
            color: Color::srgb(0.3, 0.85, 0.5),
            size: 8.0,
        },
        "dot/property" => DotStyle {
            color: Color::srgb(0.35, 0.7, 0.95),
            size: 9.0,
        },
        "dot/vehicle" => DotStyle {
            color: Color::srgb(0.9, 0.55, 0.25),
            size: 7.0,
        },
        "dot/supplier" => DotStyle {
            color: Color::srgb(0.9, 0.3, 0.35),
            size: 8.0,
        },
        "dot/misc" => DotStyle {
            color: Color::srgb(0.7, 0.7, 0.7),
            size: 6.0,
        },
        _ => return None,
    };
    Some(style)
}

enum RenderOp {
    Create {
        handle: VisualHandle,
        style: DotStyle,
        position: Vec2,
    },
    SetPosition {
        handle: VisualHandle,
        position: Vec2,
    },
    SetVisible {
        handle: VisualHandle,
        visible: bool,
    },
    Destroy {
        handle: VisualHandle,
    },
}

/// Buffered renderer: trait calls queue operations, `apply_render_ops`
/// flushes them with `Commands` at the end of the frame.
#[derive(Resource, Default)]
pub struct UiMarkerRenderer {
    next_handle: u64,
    ops: Vec<RenderOp>,
}

impl MarkerRenderer for UiMarkerRenderer {
    fn create_visual(
        &mut self,
        asset: &VisualAssetRef,
        position: Vec2,
    ) -> Result<VisualHandle, RenderError> {
        let style = resolve_dot_style(asset.key())
            .ok_or_else(|| RenderError::MissingAsset(asset.key().to_string()))?;

        let handle = VisualHandle(self.next_handle);
        self.next_handle += 1;
        self.ops.push(RenderOp::Create {
            handle,
            style,
            position,
        });
        Ok(handle)
    }

    fn set_position(&mut self, handle: VisualHandle, position: Vec2) {
        self.ops.push(RenderOp::SetPosition { handle, position });
    }

    fn set_visible(&mut self, handle: VisualHandle, visible: bool) {
        self.ops.push(RenderOp::SetVisible { handle, visible });
    }

    fn destroy_visual(&mut self, handle: VisualHandle) {
        self.ops.push(RenderOp::Destroy { handle });
    }
}

// =============================================================================
// Components and resources
// =============================================================================

/// Root node of the minimap frame. Dots are children, so hiding the root
/// hides the whole overlay.
#[derive(Component)]
pub struct MinimapRoot;

#[derive(Resource)]
pub struct MinimapFrame(pub Entity);

#[derive(Component)]
pub struct MarkerDot {
    #[allow(dead_code)]
    pub handle: VisualHandle,
}

#[derive(Resource, Default)]
pub struct MarkerDotIndex(HashMap<VisualHandle, Entity>);

// =============================================================================
// Systems
// =============================================================================

pub fn setup_minimap_frame(mut commands: Commands) {
    let frame = commands
        .spawn((
            MinimapRoot,
            NodeBundle {
                node: UiNode {
                    position_type: PositionType::Absolute,
                    right: Val::Px(MINIMAP_MARGIN),
                    top: Val::Px(MINIMAP_MARGIN),
                    width: Val::Px(MINIMAP_SIZE),
                    height: Val::Px(MINIMAP_SIZE),
                    border: UiRect::all(Val::Px(2.0)),
                    ..default()
                },
                background_color: Color::srgba(0.02, 0.05, 0.08, 0.85).into(),
                border_color: Color::srgb(0.25, 0.45, 0.55).into(),
                ..default()
            },
            Name::new("Minimap-Frame"),
        ))
        .with_children(|parent| {
            // Fixed reference dot at the frame center. The world moves
            // beneath it.
            let reference_size = 6.0;
            parent.spawn((
                NodeBundle {
                    node: dot_node(Vec2::ZERO, reference_size),
                    background_color: Color::WHITE.into(),
                    ..default()
                },
                ZIndex(2),
                Name::new("Minimap-Reference"),
            ));
        })
        .id();

    commands.insert_resource(MinimapFrame(frame));
}

/// Flushes buffered render operations into UI entities. Operations on a
/// handle created earlier in the same flush fold into its spawn.
pub fn apply_render_ops(
    mut commands: Commands,
    frame: Option<Res<MinimapFrame>>,
    mut renderer: ResMut<UiMarkerRenderer>,
    mut index: ResMut<MarkerDotIndex>,
    mut dots: Query<(&mut UiNode, &mut Visibility), With<MarkerDot>>,
) {
    let Some(frame) = frame else {
        return;
    };
    struct PendingDot {
        style: DotStyle,
        position: Vec2,
        visible: bool,
    }

    let ops = std::mem::take(&mut renderer.ops);
    let mut pending: Vec<(VisualHandle, PendingDot)> = Vec::new();

    for op in ops {
        match op {
            RenderOp::Create {
                handle,
                style,
                position,
            } => {
                pending.push((
                    handle,
                    PendingDot {
                        style,
                        position,
                        visible: true,
                    },
                ));
            }
            RenderOp::SetPosition { handle, position } => {
                if let Some((_, dot)) = pending.iter_mut().find(|(h, _)| *h == handle) {
                    dot.position = position;
                } else if let Some(&entity) = index.0.get(&handle) {
                    if let Ok((mut node, _)) = dots.get_mut(entity) {
                        let size = node_size(&node);
                        apply_dot_position(&mut node, position, size);
                    }
                }
            }
            RenderOp::SetVisible { handle, visible } => {
                if let Some((_, dot)) = pending.iter_mut().find(|(h, _)| *h == handle) {
                    dot.visible = visible;
                } else if let Some(&entity) = index.0.get(&handle) {
                    if let Ok((_, mut visibility)) = dots.get_mut(entity) {
                        *visibility = if visible {
                            Visibility::Inherited
                        } else {
                            Visibility::Hidden
                        };
                    }
                }
            }
            RenderOp::Destroy { handle } => {
                if let Some(slot) = pending.iter().position(|(h, _)| *h == handle) {
                    pending.remove(slot);
                } else if let Some(entity) = index.0.remove(&handle) {
                    commands.entity(entity).despawn();
                }
            }
        }
    }

    commands.entity(frame.0).with_children(|parent| {
        for (handle, dot) in pending {
            let entity = parent
                .spawn((
                    MarkerDot { handle },
                    NodeBundle {
                        node: dot_node(dot.position, dot.style.size),
                        background_color: dot.style.color.into(),
                        visibility: if dot.visible {
                            Visibility::Inherited
                        } else {
                            Visibility::Hidden
                        },
                        ..default()
                    },
                    ZIndex(1),
                ))
                .id();
            index.0.insert(handle, entity);
        }
    });
}

/// Absolute UI node for a dot at a content-local position, placed within
/// the frame. Content x grows toward screen right, content y toward screen
/// bottom.
fn dot_node(position: Vec2, size: f32) -> UiNode {
    let center = MINIMAP_SIZE / 2.0;
    UiNode {
        position_type: PositionType::Absolute,
        left: Val::Px(center + position.x - size / 2.0),
        top: Val::Px(center + position.y - size / 2.0),
        width: Val::Px(size),
        height: Val::Px(size),
        ..default()
    }
}

fn apply_dot_position(node: &mut UiNode, position: Vec2, size: f32) {
    let center = MINIMAP_SIZE / 2.0;
    node.left = Val::Px(center + position.x - size / 2.0);
    node.top = Val::Px(center + position.y - size / 2.0);
}

fn node_size(node: &UiNode) -> f32 {
    match node.width {
        Val::Px(size) => size,
        _ => 0.0,
    }
}

// =============================================================================
// Test renderer
// =============================================================================

#[cfg(test)]
#[derive(Debug, PartialEq)]
pub enum RecordedOp {
    Create(VisualHandle, String, Vec2),
    SetPosition(VisualHandle, Vec2),
    SetVisible(VisualHandle, bool),
    Destroy(VisualHandle),
}

/// In-memory renderer used by display-sync tests: records every operation
/// and can be told to reject asset keys.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingRenderer {
    next_handle: u64,
    pub ops: Vec<RecordedOp>,
    pub rejected_assets: std::collections::HashSet<String>,
}

#[cfg(test)]
impl MarkerRenderer for RecordingRenderer {
    fn create_visual(
        &mut self,
        asset: &VisualAssetRef,
        position: Vec2,
    ) -> Result<VisualHandle, RenderError> {
        if self.rejected_assets.contains(asset.key()) {
            return Err(RenderError::MissingAsset(asset.key().to_string()));
        }
        let handle = VisualHandle(self.next_handle);
        self.next_handle += 1;
        self.ops
            .push(RecordedOp::Create(handle, asset.key().to_string(), position));
        Ok(handle)
    }

    fn set_position(&mut self, handle: VisualHandle, position: Vec2) {
        self.ops.push(RecordedOp::SetPosition(handle, position));
    }

    fn set_visible(&mut self, handle: VisualHandle, visible: bool) {
        self.ops.push(RecordedOp::SetVisible(handle, visible));
    }

    fn destroy_visual(&mut self, handle: VisualHandle) {
        self.ops.push(RecordedOp::Destroy(handle));
    }
}
