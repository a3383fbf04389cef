//! Size-class atlas packing.
//!
//! Items are grouped by exact texel footprint. Each size class becomes one
//! rectangular bin holding a near-square grid of its items, and the bins are
//! fed to a [`GrowingPacker`] largest first.

use std::collections::BTreeMap;

use cadtex_core::Result;
use serde::{Deserialize, Serialize};

use crate::packer::{GrowingPacker, Placement};

/// Grid `(cols, rows)` for `count` cells of `w x h` texels whose pixel extent
/// is closest to square. Rows are rounded up to cover every cell.
pub fn calc_container_size(count: usize, w: u32, h: u32) -> (u32, u32) {
    if count == 0 {
        return (0, 0);
    }
    let ideal = (count as f64 * h as f64 / w.max(1) as f64).sqrt();
    let cols = (ideal.round() as usize).clamp(1, count);
    let rows = count.div_ceil(cols);
    (cols as u32, rows as u32)
}

/// Packed rectangles for one atlas, indexed like the input items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtlasLayout {
    pub width: u32,
    pub height: u32,
    /// `[x, y, w, h]` per item; items that were not laid out are all zero.
    pub records: Vec<[f32; 4]>,
}

impl AtlasLayout {
    pub fn rect(&self, index: usize) -> Option<[f32; 4]> {
        self.records.get(index).copied().filter(|r| r[2] > 0.0)
    }

    pub fn laid_out(&self) -> usize {
        self.records.iter().filter(|r| r[2] > 0.0).count()
    }

    /// Records as a flat slice, ready for a texture or buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }
}

/// Lay out `sizes[i] = Some((w, h))`; `None` entries are skipped.
pub fn pack_size_classes(sizes: &[Option<(u32, u32)>]) -> Result<AtlasLayout> {
    let mut classes: BTreeMap<(u32, u32), Vec<usize>> = BTreeMap::new();
    for (index, size) in sizes.iter().enumerate() {
        if let Some(size) = size {
            classes.entry(*size).or_default().push(index);
        }
    }

    let mut bins: Vec<((u32, u32), Vec<usize>, (u32, u32))> = classes
        .into_iter()
        .map(|(size, items)| {
            let grid = calc_container_size(items.len(), size.0, size.1);
            (size, items, grid)
        })
        .collect();
    // largest first; stable on the size key for determinism
    bins.sort_by_key(|&((w, h), _, (cols, rows))| std::cmp::Reverse((cols * w).max(rows * h)));

    let mut records = vec![[0.0f32; 4]; sizes.len()];
    let mut packer = GrowingPacker::new();
    for ((w, h), items, (cols, rows)) in &bins {
        let Placement { x, y } = packer.add_block(cols * w, rows * h)?;
        for (k, &index) in items.iter().enumerate() {
            let k = k as u32;
            records[index] = [
                (x + (k % cols) * w) as f32,
                (y + (k / cols) * h) as f32,
                *w as f32,
                *h as f32,
            ];
        }
    }
    log::debug!(
        "packed {} size classes into {}x{}",
        bins.len(),
        packer.width(),
        packer.height()
    );

    Ok(AtlasLayout {
        width: packer.width(),
        height: packer.height(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_size() {
        assert_eq!(calc_container_size(1, 5, 5), (1, 1));
        assert_eq!(calc_container_size(4, 3, 3), (2, 2));
        assert_eq!(calc_container_size(5, 3, 3), (2, 3));
        // long thin curve rows stack vertically into a squarish block
        assert_eq!(calc_container_size(16, 17, 1), (1, 16));
        assert_eq!(calc_container_size(0, 2, 2), (0, 0));
    }

    #[test]
    fn test_pack_covers_items_without_overlap() {
        let sizes: Vec<Option<(u32, u32)>> = (0..40)
            .map(|i| match i % 5 {
                0 => None,
                1 => Some((9, 5)),
                2 => Some((3, 3)),
                3 => Some((17, 2)),
                _ => Some((2, 2)),
            })
            .collect();
        let layout = pack_size_classes(&sizes).unwrap();
        assert_eq!(layout.records.len(), 40);
        assert_eq!(layout.laid_out(), 32);

        let rects: Vec<[f32; 4]> = layout.records.iter().copied().filter(|r| r[2] > 0.0).collect();
        for (i, a) in rects.iter().enumerate() {
            assert!(a[0] + a[2] <= layout.width as f32 && a[1] + a[3] <= layout.height as f32);
            for b in &rects[i + 1..] {
                let disjoint = a[0] + a[2] <= b[0] || b[0] + b[2] <= a[0] || a[1] + a[3] <= b[1] || b[1] + b[3] <= a[1];
                assert!(disjoint, "{a:?} overlaps {b:?}");
            }
        }
        for (i, size) in sizes.iter().enumerate() {
            match size {
                None => assert_eq!(layout.records[i], [0.0; 4]),
                Some((w, h)) => assert_eq!((layout.records[i][2], layout.records[i][3]), (*w as f32, *h as f32)),
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let layout = pack_size_classes(&[None, None]).unwrap();
        assert_eq!((layout.width, layout.height), (0, 0));
        assert_eq!(layout.rect(0), None);
    }
}
