//! Growing binary-tree rectangle packer.
//!
//! The root starts at the size of the first block and grows right or down when
//! a block does not fit, preferring the direction that keeps the packing
//! roughly square.

use cadtex_core::{CadtexError, Result};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    pub struct PackNodeId;
}

#[derive(Debug, Clone, Copy)]
struct PackNode {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    used: bool,
    right: Option<PackNodeId>,
    down: Option<PackNodeId>,
}

impl PackNode {
    fn free(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            used: false,
            right: None,
            down: None,
        }
    }
}

/// Top-left corner assigned to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Default)]
pub struct GrowingPacker {
    nodes: SlotMap<PackNodeId, PackNode>,
    root: Option<PackNodeId>,
}

impl GrowingPacker {
    /// A packer whose root is seeded by the first block added.
    pub fn new() -> Self {
        Self::default()
    }

    /// A packer with an explicit starting size.
    pub fn with_size(w: u32, h: u32) -> Self {
        let mut packer = Self::new();
        packer.root = Some(packer.nodes.insert(PackNode::free(0, 0, w, h)));
        packer
    }

    pub fn width(&self) -> u32 {
        self.root.map_or(0, |r| self.nodes[r].w)
    }

    pub fn height(&self) -> u32 {
        self.root.map_or(0, |r| self.nodes[r].h)
    }

    /// Place a `w x h` block, growing the packing when needed.
    pub fn add_block(&mut self, w: u32, h: u32) -> Result<Placement> {
        if w == 0 || h == 0 {
            return Err(CadtexError::Packing(format!("cannot pack empty block {w}x{h}")));
        }
        let root = match self.root {
            Some(root) => root,
            None => {
                let root = self.nodes.insert(PackNode::free(0, 0, w, h));
                self.root = Some(root);
                root
            }
        };
        match self.find_node(root, w, h) {
            Some(node) => Ok(self.split_node(node, w, h)),
            None => self.grow_node(w, h),
        }
    }

    /// First free node, right subtree before down, that fits the block.
    fn find_node(&self, id: PackNodeId, w: u32, h: u32) -> Option<PackNodeId> {
        let node = self.nodes[id];
        if node.used {
            node.right
                .and_then(|r| self.find_node(r, w, h))
                .or_else(|| node.down.and_then(|d| self.find_node(d, w, h)))
        } else if w <= node.w && h <= node.h {
            Some(id)
        } else {
            None
        }
    }

    fn split_node(&mut self, id: PackNodeId, w: u32, h: u32) -> Placement {
        let node = self.nodes[id];
        let down = self.nodes.insert(PackNode::free(node.x, node.y + h, node.w, node.h - h));
        let right = self.nodes.insert(PackNode::free(node.x + w, node.y, node.w - w, h));
        let n = &mut self.nodes[id];
        n.used = true;
        n.down = Some(down);
        n.right = Some(right);
        Placement { x: node.x, y: node.y }
    }

    fn grow_node(&mut self, w: u32, h: u32) -> Result<Placement> {
        let root = self.root.ok_or_else(|| CadtexError::Packing("packer has no root".into()))?;
        let r = self.nodes[root];

        let can_grow_down = w <= r.w;
        let can_grow_right = h <= r.h;
        let should_grow_right = can_grow_right && r.h >= r.w + w;
        let should_grow_down = can_grow_down && r.w >= r.h + h;

        if should_grow_right {
            self.grow_right(w, h)
        } else if should_grow_down {
            self.grow_down(w, h)
        } else if can_grow_right {
            self.grow_right(w, h)
        } else if can_grow_down {
            self.grow_down(w, h)
        } else {
            Err(CadtexError::Packing(format!(
                "block {w}x{h} cannot grow a {}x{} packing",
                r.w, r.h
            )))
        }
    }

    fn grow_right(&mut self, w: u32, h: u32) -> Result<Placement> {
        let old = self.root.ok_or_else(|| CadtexError::Packing("packer has no root".into()))?;
        let r = self.nodes[old];
        let right = self.nodes.insert(PackNode::free(r.w, 0, w, r.h));
        let new_root = self.nodes.insert(PackNode {
            x: 0,
            y: 0,
            w: r.w + w,
            h: r.h,
            used: true,
            right: Some(right),
            down: Some(old),
        });
        self.place_in_new_root(new_root, w, h)
    }

    fn grow_down(&mut self, w: u32, h: u32) -> Result<Placement> {
        let old = self.root.ok_or_else(|| CadtexError::Packing("packer has no root".into()))?;
        let r = self.nodes[old];
        let down = self.nodes.insert(PackNode::free(0, r.h, r.w, h));
        let new_root = self.nodes.insert(PackNode {
            x: 0,
            y: 0,
            w: r.w,
            h: r.h + h,
            used: true,
            right: Some(old),
            down: Some(down),
        });
        self.place_in_new_root(new_root, w, h)
    }

    fn place_in_new_root(&mut self, root: PackNodeId, w: u32, h: u32) -> Result<Placement> {
        self.root = Some(root);
        let node = self
            .find_node(root, w, h)
            .ok_or_else(|| CadtexError::Packing(format!("grown packing has no room for {w}x{h}")))?;
        Ok(self.split_node(node, w, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlaps(a: (Placement, u32, u32), b: (Placement, u32, u32)) -> bool {
        let (pa, wa, ha) = a;
        let (pb, wb, hb) = b;
        pa.x < pb.x + wb && pb.x < pa.x + wa && pa.y < pb.y + hb && pb.y < pa.y + ha
    }

    #[test]
    fn test_three_blocks_grow_once() {
        let mut packer = GrowingPacker::with_size(8, 8);
        let a = packer.add_block(8, 8).unwrap();
        let b = packer.add_block(4, 4).unwrap();
        let c = packer.add_block(4, 4).unwrap();
        assert_eq!(a, Placement { x: 0, y: 0 });
        assert_eq!(b, Placement { x: 8, y: 0 });
        assert_eq!(c, Placement { x: 8, y: 4 });
        assert_eq!((packer.width(), packer.height()), (12, 8));
    }

    #[test]
    fn test_no_overlap_and_monotonic_growth() {
        let mut packer = GrowingPacker::new();
        let mut placed = Vec::new();
        let (mut last_w, mut last_h) = (0, 0);
        // deterministic pseudo-random sizes, largest first as the layout feeds them
        let mut sizes: Vec<(u32, u32)> = (0..60u32)
            .map(|i| (1 + (i * 7919) % 13, 1 + (i * 104_729) % 11))
            .collect();
        sizes.sort_by_key(|&(w, h)| std::cmp::Reverse(w.max(h)));
        for (w, h) in sizes {
            let p = packer.add_block(w, h).unwrap();
            assert!(p.x + w <= packer.width() && p.y + h <= packer.height());
            for &other in &placed {
                assert!(!overlaps((p, w, h), other), "{:?} overlaps {:?}", (p, w, h), other);
            }
            placed.push((p, w, h));
            assert!(packer.width() >= last_w && packer.height() >= last_h);
            last_w = packer.width();
            last_h = packer.height();
        }
    }

    #[test]
    fn test_block_larger_in_both_axes_fails() {
        let mut packer = GrowingPacker::with_size(2, 2);
        assert!(matches!(packer.add_block(3, 3), Err(CadtexError::Packing(_))));
        assert!(packer.add_block(0, 1).is_err());
    }

    #[test]
    fn test_prefers_square_growth() {
        let mut packer = GrowingPacker::new();
        packer.add_block(4, 4).unwrap();
        packer.add_block(4, 4).unwrap();
        assert_eq!((packer.width(), packer.height()), (8, 4));
        // wider than tall: grow down next
        packer.add_block(4, 4).unwrap();
        assert_eq!((packer.width(), packer.height()), (8, 8));
    }
}
