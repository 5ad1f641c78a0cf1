//! Pure transforms of a [`CopyBuffer`]. Integer-only, so repeating a
//! transform to a full cycle restores the buffer exactly.

use blockforge_engine::world::block::BlockId;

use super::clipboard::CopyBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Quarter turns for an angle in degrees, or `None` if it is not a multiple
/// of 90. Negative angles turn the other way.
pub fn quarter_turns(degrees: i32) -> Option<u8> {
    (degrees % 90 == 0).then(|| (degrees / 90).rem_euclid(4) as u8)
}

type Matrix = [[i32; 3]; 3];

const IDENTITY: Matrix = [[1, 0, 0], [0, 1, 0], [0, 0, 1]];

/// One counter-clockwise quarter turn about `axis`.
fn quarter(axis: Axis) -> Matrix {
    match axis {
        Axis::X => [[1, 0, 0], [0, 0, -1], [0, 1, 0]],
        Axis::Y => [[0, 0, 1], [0, 1, 0], [-1, 0, 0]],
        Axis::Z => [[0, -1, 0], [1, 0, 0], [0, 0, 1]],
    }
}

fn mul(a: &Matrix, b: &Matrix) -> Matrix {
    let mut out = [[0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

impl CopyBuffer {
    /// Reverse the contents along every axis flagged in `axes`. Extents
    /// are left as they are.
    pub fn mirror(&mut self, axes: [bool; 3]) {
        let size = self.size;
        let flip = |c: [u32; 3]| -> [u32; 3] { std::array::from_fn(|i| if axes[i] { size[i] - 1 - c[i] } else { c[i] }) };
        let old = std::mem::take(&mut self.blocks);
        let mut blocks = Vec::with_capacity(old.len());
        for y in 0..size[1] {
            for z in 0..size[2] {
                for x in 0..size[0] {
                    blocks.push(old[Self::index(size, flip([x, y, z]))]);
                }
            }
        }
        self.blocks = blocks;
    }

    /// Rotate by `turns` quarter turns about `axis`. The two axes in the
    /// plane of rotation swap sizes and signed extents on odd turns.
    pub fn rotate(&mut self, axis: Axis, turns: u8) {
        let mut m = IDENTITY;
        for _ in 0..turns % 4 {
            m = mul(&quarter(axis), &m);
        }
        if m == IDENTITY {
            return;
        }
        debug_assert!(m.iter().all(|row| row.iter().filter(|v| **v != 0).count() == 1));

        // Each output axis i is fed by exactly one input axis src[i].
        let src: [usize; 3] = std::array::from_fn(|i| (0..3).find(|j| m[i][*j] != 0).unwrap_or(i));
        let new_size: [u32; 3] = std::array::from_fn(|i| self.size[src[i]]);
        let new_extents: [i32; 3] = std::array::from_fn(|i| self.extents[src[i]]);
        let offset: [i64; 3] = std::array::from_fn(|i| {
            if m[i][src[i]] < 0 {
                self.size[src[i]] as i64 - 1
            } else {
                0
            }
        });

        let size = self.size;
        let mut blocks = vec![BlockId::AIR; self.blocks.len()];
        for y in 0..size[1] {
            for z in 0..size[2] {
                for x in 0..size[0] {
                    let p = [x as i64, y as i64, z as i64];
                    let q: [u32; 3] = std::array::from_fn(|i| {
                        (m[i][0] as i64 * p[0] + m[i][1] as i64 * p[1] + m[i][2] as i64 * p[2] + offset[i]) as u32
                    });
                    blocks[Self::index(new_size, q)] = self.blocks[Self::index(size, [x, y, z])];
                }
            }
        }
        self.size = new_size;
        self.extents = new_extents;
        self.blocks = blocks;
    }

    /// Mirror across a single axis.
    pub fn flip(&mut self, axis: Axis) {
        let mut axes = [false; 3];
        axes[axis.index()] = true;
        self.mirror(axes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turn_parsing() {
        assert_eq!(quarter_turns(90), Some(1));
        assert_eq!(quarter_turns(180), Some(2));
        assert_eq!(quarter_turns(-90), Some(3));
        assert_eq!(quarter_turns(360), Some(0));
        assert_eq!(quarter_turns(45), None);
    }

    #[test]
    fn four_quarter_turns_compose_to_identity() {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let mut m = IDENTITY;
            for _ in 0..4 {
                m = mul(&quarter(axis), &m);
            }
            assert_eq!(m, IDENTITY);
        }
    }
}
