//! Body development from the body CPPN.
//!
//! Growth is breadth-first from the core. Every free attachment slot is
//! offered to the CPPN with the candidate cell `(x, y, z)` and its chain
//! length; the strongest of the `empty`, `brick` and `active hinge` outputs
//! decides what is placed, and the `rotation` output turns the module a
//! quarter about its facing axis. Cells are never shared and nothing grows
//! below the ground plane.

use crate::cppn::CppnLogic;
use evorobo_data::{Body, Cppn, Direction, Module, ModuleKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Inputs of the body CPPN: x, y, z, chain length.
pub const BODY_CPPN_INPUTS: usize = 4;
/// Outputs of the body CPPN: empty, brick, active hinge, rotation.
pub const BODY_CPPN_OUTPUTS: usize = 4;

/// Whether bodies grow in the ground plane only or also upward.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubstrateDimensions {
    #[default]
    #[serde(rename = "2d")]
    Planar,
    #[serde(rename = "3d")]
    Spatial,
}

impl fmt::Display for SubstrateDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstrateDimensions::Planar => write!(f, "2d"),
            SubstrateDimensions::Spatial => write!(f, "3d"),
        }
    }
}

impl FromStr for SubstrateDimensions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "2d" => Ok(SubstrateDimensions::Planar),
            "3d" => Ok(SubstrateDimensions::Spatial),
            other => Err(format!(
                "unknown body substrate '{other}', expected '2d' or '3d'"
            )),
        }
    }
}

fn attachment_slots(module: &Module, substrate: SubstrateDimensions) -> Vec<Direction> {
    let mut slots = match module.kind {
        ModuleKind::Core => Direction::HORIZONTAL.to_vec(),
        ModuleKind::Brick if module.facing.is_vertical() => vec![module.facing],
        ModuleKind::Brick => vec![
            module.facing,
            module.facing.turn_left(),
            module.facing.turn_right(),
        ],
        ModuleKind::ActiveHinge => vec![module.facing],
    };
    if substrate == SubstrateDimensions::Spatial
        && module.kind != ModuleKind::ActiveHinge
        && !module.facing.is_vertical()
    {
        slots.push(Direction::Up);
    }
    slots
}

/// Grows a body from the CPPN, stopping at `max_modules` modules (core included).
#[must_use]
pub fn develop_body(cppn: &Cppn, max_modules: usize, substrate: SubstrateDimensions) -> Body {
    let net = cppn.compile();
    let mut body = Body::core_only();
    let mut occupied: HashSet<[i32; 3]> = HashSet::from([[0, 0, 0]]);
    let mut queue = VecDeque::from([0usize]);

    while let Some(parent_idx) = queue.pop_front() {
        let parent = body.modules[parent_idx].clone();
        for dir in attachment_slots(&parent, substrate) {
            if body.modules.len() >= max_modules {
                return body;
            }
            let offset = dir.offset();
            let grid = [
                parent.grid[0] + offset[0],
                parent.grid[1] + offset[1],
                parent.grid[2] + offset[2],
            ];
            if grid[2] < 0 || occupied.contains(&grid) {
                continue;
            }

            let chain_length = parent.chain_length + 1;
            let out = net.activate(&[
                f64::from(grid[0]),
                f64::from(grid[1]),
                f64::from(grid[2]),
                f64::from(chain_length),
            ]);
            let kind = match argmax(&out[..3]) {
                1 => ModuleKind::Brick,
                2 => ModuleKind::ActiveHinge,
                _ => continue,
            };

            occupied.insert(grid);
            queue.push_back(body.modules.len());
            body.modules.push(Module {
                kind,
                parent: Some(parent_idx),
                facing: dir,
                grid,
                rotated: out[3] > 0.0,
                chain_length,
            });
        }
    }
    body
}

/// Index of the first maximum.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = idx;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use evorobo_data::{Activation, Connection, Node, NodeType};

    /// CPPN whose outputs are constant: bias feeds every output with `bias_w`.
    fn constant_cppn(bias_w: [f64; 4]) -> Cppn {
        let mut nodes: Vec<Node> = (0..4)
            .map(|id| Node {
                id,
                node_type: NodeType::Input,
                activation: Activation::Linear,
            })
            .collect();
        nodes.push(Node {
            id: 4,
            node_type: NodeType::Bias,
            activation: Activation::Linear,
        });
        let mut connections = Vec::new();
        for (o, w) in bias_w.iter().enumerate() {
            nodes.push(Node {
                id: 5 + o as u64,
                node_type: NodeType::Output,
                activation: Activation::Linear,
            });
            connections.push(Connection {
                from: 4,
                to: 5 + o as u64,
                weight: *w,
                enabled: true,
                innovation: o as u64,
            });
        }
        Cppn {
            num_inputs: 4,
            num_outputs: 4,
            nodes,
            connections,
        }
    }

    #[test]
    fn test_empty_output_gives_core_only() {
        let body = develop_body(
            &constant_cppn([1.0, 0.0, 0.0, 0.0]),
            20,
            SubstrateDimensions::Planar,
        );
        assert_eq!(body.modules.len(), 1);
    }

    #[test]
    fn test_growth_respects_max_modules() {
        let cppn = constant_cppn([0.0, 1.0, 0.0, 0.0]);
        for max in [1, 2, 7, 30] {
            let body = develop_body(&cppn, max, SubstrateDimensions::Planar);
            assert_eq!(body.modules.len(), max);
        }
    }

    #[test]
    fn test_no_overlap_and_planar() {
        let cppn = constant_cppn([0.0, 1.0, 0.0, 0.0]);
        let body = develop_body(&cppn, 40, SubstrateDimensions::Planar);
        let cells: HashSet<[i32; 3]> = body.modules.iter().map(|m| m.grid).collect();
        assert_eq!(cells.len(), body.modules.len());
        assert!(body.modules.iter().all(|m| m.grid[2] == 0));
    }

    #[test]
    fn test_spatial_grows_upward() {
        let cppn = constant_cppn([0.0, 1.0, 0.0, 0.0]);
        let body = develop_body(&cppn, 40, SubstrateDimensions::Spatial);
        assert!(body.modules.iter().any(|m| m.grid[2] > 0));
        assert!(body.modules.iter().all(|m| m.grid[2] >= 0));
    }

    #[test]
    fn test_hinges_have_single_child_slot() {
        let cppn = constant_cppn([0.0, 0.0, 1.0, 1.0]);
        let body = develop_body(&cppn, 9, SubstrateDimensions::Planar);
        // Core has four slots, then each hinge extends a straight chain.
        assert_eq!(body.count(ModuleKind::ActiveHinge), 8);
        for idx in body.hinge_indices() {
            assert!(body.children(idx).len() <= 1);
            assert!(body.modules[idx].rotated);
        }
    }

    #[test]
    fn test_substrate_parse() {
        assert_eq!("2d".parse::<SubstrateDimensions>(), Ok(SubstrateDimensions::Planar));
        assert_eq!("3D".parse::<SubstrateDimensions>(), Ok(SubstrateDimensions::Spatial));
        assert!("4d".parse::<SubstrateDimensions>().is_err());
        assert_eq!(SubstrateDimensions::Spatial.to_string(), "3d");
    }
}
