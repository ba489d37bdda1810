use serde::{Deserialize, Serialize};

/// Kind of a body module.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Core,
    Brick,
    ActiveHinge,
}

/// Absolute grid direction. `Front` is +y, `Right` is +x, `Up` is +z.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    Front,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::Front,
        Direction::Right,
        Direction::Back,
        Direction::Left,
    ];

    #[must_use]
    pub fn offset(self) -> [i32; 3] {
        match self {
            Direction::Front => [0, 1, 0],
            Direction::Back => [0, -1, 0],
            Direction::Left => [-1, 0, 0],
            Direction::Right => [1, 0, 0],
            Direction::Up => [0, 0, 1],
            Direction::Down => [0, 0, -1],
        }
    }

    #[must_use]
    pub fn turn_left(self) -> Self {
        match self {
            Direction::Front => Direction::Left,
            Direction::Left => Direction::Back,
            Direction::Back => Direction::Right,
            Direction::Right => Direction::Front,
            vertical => vertical,
        }
    }

    #[must_use]
    pub fn turn_right(self) -> Self {
        match self {
            Direction::Front => Direction::Right,
            Direction::Right => Direction::Back,
            Direction::Back => Direction::Left,
            Direction::Left => Direction::Front,
            vertical => vertical,
        }
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Front => Direction::Back,
            Direction::Back => Direction::Front,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    #[must_use]
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

/// A module placed on the body grid.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Module {
    pub kind: ModuleKind,
    /// Index of the parent module; `None` only for the core.
    pub parent: Option<usize>,
    /// Direction from the parent to this module.
    pub facing: Direction,
    /// Integer grid cell occupied by the module.
    pub grid: [i32; 3],
    /// Quarter-turn about the facing axis; flips a hinge's joint axis.
    pub rotated: bool,
    /// Number of modules between this one and the core.
    pub chain_length: u32,
}

/// Developed body: a tree of modules rooted at the core (index 0).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Body {
    pub modules: Vec<Module>,
}

impl Body {
    /// A body consisting of the core only.
    #[must_use]
    pub fn core_only() -> Self {
        Self {
            modules: vec![Module {
                kind: ModuleKind::Core,
                parent: None,
                facing: Direction::Front,
                grid: [0, 0, 0],
                rotated: false,
                chain_length: 0,
            }],
        }
    }

    #[must_use]
    pub fn count(&self, kind: ModuleKind) -> usize {
        self.modules.iter().filter(|m| m.kind == kind).count()
    }

    /// Indices of active hinges in module order.
    #[must_use]
    pub fn hinge_indices(&self) -> Vec<usize> {
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.kind == ModuleKind::ActiveHinge)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Indices of the direct children of `idx`.
    #[must_use]
    pub fn children(&self, idx: usize) -> Vec<usize> {
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.parent == Some(idx))
            .map(|(child, _)| child)
            .collect()
    }

    /// Inclusive grid extents as `(min, max)` per axis.
    #[must_use]
    pub fn grid_extents(&self) -> ([i32; 3], [i32; 3]) {
        let mut min = [i32::MAX; 3];
        let mut max = [i32::MIN; 3];
        for module in &self.modules {
            for axis in 0..3 {
                min[axis] = min[axis].min(module.grid[axis]);
                max[axis] = max[axis].max(module.grid[axis]);
            }
        }
        (min, max)
    }
}
