//! Axis-aligned region geometry shared by every draw operation.
//!
//! All bounds are inclusive. Volume helpers are exact for boxes and shells
//! so that pre-flight limits match what the iterators actually visit.

use super::position::BlockPos;

/// An inclusive, normalised box between two marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cuboid {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl Cuboid {
    /// Normalise two arbitrary corners into min/max on each axis.
    pub fn from_corners(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Cell count along x, y and z, saturating at `u32::MAX`.
    pub fn size(&self) -> (u32, u32, u32) {
        (
            self.max.x.abs_diff(self.min.x).saturating_add(1),
            self.max.y.abs_diff(self.min.y).saturating_add(1),
            self.max.z.abs_diff(self.min.z).saturating_add(1),
        )
    }

    fn spans(&self) -> (u64, u64, u64) {
        (
            self.max.x.abs_diff(self.min.x) as u64 + 1,
            self.max.y.abs_diff(self.min.y) as u64 + 1,
            self.max.z.abs_diff(self.min.z) as u64 + 1,
        )
    }

    pub fn volume(&self) -> u64 {
        let (sx, sy, sz) = self.spans();
        sx.saturating_mul(sy).saturating_mul(sz)
    }

    /// Cells on the six faces: the box minus its interior.
    pub fn shell_volume(&self) -> u64 {
        let (sx, sy, sz) = self.spans();
        let inner = sx
            .saturating_sub(2)
            .saturating_mul(sy.saturating_sub(2))
            .saturating_mul(sz.saturating_sub(2));
        self.volume().saturating_sub(inner)
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// Every cell, walked in `stride`-wide horizontal columns so consecutive
    /// writes stay within the same chunk.
    pub fn iter_strided(self, stride: u32) -> impl Iterator<Item = BlockPos> {
        let stride = stride.max(1);
        let step = stride as usize;
        let Cuboid { min, max } = self;
        (min.x..=max.x).step_by(step).flat_map(move |cx| {
            let x_end = cx.saturating_add(stride as i32 - 1).min(max.x);
            (min.z..=max.z).step_by(step).flat_map(move |cz| {
                let z_end = cz.saturating_add(stride as i32 - 1).min(max.z);
                (min.y..=max.y).flat_map(move |y| {
                    (cx..=x_end).flat_map(move |x| (cz..=z_end).map(move |z| BlockPos::new(x, y, z)))
                })
            })
        })
    }

    /// Only the cells on the six faces, each exactly once. Interior rows
    /// jump straight from the near face to the far face.
    pub fn shell(self) -> ShellIter {
        ShellIter {
            region: self,
            cursor: Some(self.min),
        }
    }

    /// Half-extents of the ellipsoid inscribed in this box. The quarter-cell
    /// padding keeps single-cell and two-cell spans from rounding to nothing.
    pub fn ellipsoid_radii(&self) -> (f64, f64, f64) {
        (
            (self.max.x as f64 - self.min.x as f64) / 2.0 + 0.25,
            (self.max.y as f64 - self.min.y as f64) / 2.0 + 0.25,
            (self.max.z as f64 - self.min.z as f64) / 2.0 + 0.25,
        )
    }

    /// Analytic `4/3 * pi * rx * ry * rz`, rounded up. Thin boxes can hold
    /// more lattice cells than this; count [`Cuboid::ellipsoid`] when exact
    /// numbers matter.
    pub fn ellipsoid_volume(&self) -> u64 {
        let (rx, ry, rz) = self.ellipsoid_radii();
        (4.0 / 3.0 * std::f64::consts::PI * rx * ry * rz).ceil() as u64
    }

    /// Cells of the bounding box that fall inside the inscribed ellipsoid.
    pub fn ellipsoid(self, stride: u32) -> impl Iterator<Item = BlockPos> {
        let (rx, ry, rz) = self.ellipsoid_radii();
        let (ix, iy, iz) = (1.0 / (rx * rx), 1.0 / (ry * ry), 1.0 / (rz * rz));
        let cx = (self.min.x as f64 + self.max.x as f64) / 2.0;
        let cy = (self.min.y as f64 + self.max.y as f64) / 2.0;
        let cz = (self.min.z as f64 + self.max.z as f64) / 2.0;
        self.iter_strided(stride).filter(move |p| {
            let dx = p.x as f64 - cx;
            let dy = p.y as f64 - cy;
            let dz = p.z as f64 - cz;
            dx * dx * ix + dy * dy * iy + dz * dz * iz <= 1.0
        })
    }
}

/// Iterator over the faces of a [`Cuboid`], in y, x, z order.
pub struct ShellIter {
    region: Cuboid,
    cursor: Option<BlockPos>,
}

impl Iterator for ShellIter {
    type Item = BlockPos;

    fn next(&mut self) -> Option<BlockPos> {
        let current = self.cursor?;
        self.cursor = self.advance(current);
        Some(current)
    }
}

impl ShellIter {
    fn advance(&self, p: BlockPos) -> Option<BlockPos> {
        let Cuboid { min, max } = self.region;
        let full_row = p.y == min.y || p.y == max.y || p.x == min.x || p.x == max.x;
        if full_row && p.z < max.z {
            return Some(BlockPos::new(p.x, p.y, p.z + 1));
        }
        if !full_row && p.z == min.z && max.z > min.z {
            return Some(BlockPos::new(p.x, p.y, max.z));
        }
        if p.x < max.x {
            return Some(BlockPos::new(p.x + 1, p.y, min.z));
        }
        if p.y < max.y {
            return Some(BlockPos::new(min.x, p.y + 1, min.z));
        }
        None
    }
}
