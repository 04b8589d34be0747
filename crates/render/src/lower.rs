//! Lowering: scene tree → ordered IR instructions in world coordinates.
//!
//! Only the desktop's root-filtered drawable layer is lowered; workspace
//! and system subtrees stay parsed-but-unrendered. The parser has already
//! accumulated every ancestor's position into `local_position`, so the
//! recursion passes the external subtree offset down unchanged — the
//! desktop lowers with offset `(0, 0)`.

use swen_scene::{Bounds, Node, NodeId, SceneTree, Vector};

use crate::ir::{IRBuffer, IRError, PaintKey};

/// Lower the desktop into `ir`, starting a new frame.
///
/// Exactly one `draw_rect` is emitted per backgrounded rect and one
/// `draw_text` per text node, in lowering order. Transform nodes bracket
/// their children with `push_state`/`set_transform`/`pop_state` and emit no
/// geometry themselves.
///
/// # Errors
/// Fatal for the frame: buffer overflow or unbalanced state bracketing.
pub fn lower_desktop(tree: &SceneTree, ir: &mut IRBuffer) -> Result<(), IRError> {
    ir.next_frame();
    for &id in &tree.root.desktop.nodes {
        lower_node(tree, id, Vector::ZERO, ir)?;
    }
    Ok(())
}

fn lower_node(
    tree: &SceneTree,
    id: NodeId,
    offset: Vector,
    ir: &mut IRBuffer,
) -> Result<(), IRError> {
    let Some(node) = tree.node(id) else {
        log::debug!(target: "swen_render", "skipping unresolved node {id}");
        return Ok(());
    };
    match node {
        Node::Rect(rect) => {
            let world = rect.local_position + rect.position + offset;
            if let Some(background) = rect.background {
                ir.draw_rect(
                    rect.node_id,
                    Bounds::new(world.x, world.y, rect.size.x, rect.size.y),
                    PaintKey::solid(background),
                    0,
                )?;
            }
            for &child in &rect.children {
                lower_node(tree, child, offset, ir)?;
            }
        }
        Node::Text(text) => {
            let world = text.local_position + text.position + offset;
            // Estimated until font metrics arrive.
            let width = text.body.len() as i32 * i32::from(text.text_size) / 2;
            let bounds = Bounds::new(world.x, world.y, width, i32::from(text.text_size));
            ir.draw_text(
                text.node_id,
                bounds,
                &text.body,
                PaintKey::solid(text.color),
                text.text_size,
            )?;
        }
        Node::Transform(transform) => {
            let pushed = transform.matrix.is_some();
            if let Some(matrix) = transform.matrix {
                ir.push_state()?;
                ir.set_transform(matrix)?;
            }
            for &child in &transform.children {
                lower_node(tree, child, offset, ir)?;
            }
            if pushed {
                ir.pop_state()?;
            }
        }
    }
    Ok(())
}
