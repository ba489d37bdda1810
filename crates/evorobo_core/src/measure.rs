//! Morphological and behavioural measures of a phenotype.

use crate::genotype::ModularRobot;
use evorobo_data::{BatchState, Measures, ModuleKind, Vector3};
use std::collections::HashSet;

/// Inputs for measuring one individual of an evaluated batch.
pub struct Measure<'a> {
    /// Simulation samples of the whole batch, absent when not simulated.
    pub states: Option<&'a [BatchState]>,
    /// Environment index of this individual in the batch.
    pub genotype_idx: usize,
    pub phenotype: &'a ModularRobot,
    pub generation: usize,
    pub simulation_time: u32,
}

impl<'a> Measure<'a> {
    /// Every measure name this module can produce.
    pub const NAMES: [&'static str; 21] = [
        "birth",
        "modules_count",
        "hinge_count",
        "brick_count",
        "hinge_prop",
        "brick_prop",
        "branching_count",
        "branching_prop",
        "extremities",
        "extremities_prop",
        "length_of_limbs",
        "coverage",
        "proportion",
        "symmetry",
        "width",
        "depth",
        "height",
        "displacement_xy",
        "speed_x",
        "speed_y",
        "average_speed",
    ];

    #[must_use]
    pub fn is_known(name: &str) -> bool {
        Self::NAMES.iter().any(|known| *known == name)
    }

    /// All measures that depend on this individual alone.
    #[must_use]
    pub fn measure_all_non_relative(&self) -> Measures {
        let mut measures = Measures::new();
        measures.insert("birth", self.generation as f64);
        self.morphology(&mut measures);
        if let Some(states) = self.states {
            self.behaviour(states, &mut measures);
        }
        measures
    }

    fn morphology(&self, m: &mut Measures) {
        let body = &self.phenotype.body;
        let modules = body.modules.len();
        let hinges = body.count(ModuleKind::ActiveHinge);
        let bricks = body.count(ModuleKind::Brick);
        let n = modules as f64;

        let children: Vec<usize> = (0..modules).map(|idx| body.children(idx).len()).collect();
        let branching = body
            .modules
            .iter()
            .zip(&children)
            .filter(|&(module, &c)| match module.kind {
                ModuleKind::Core => c == 4,
                ModuleKind::Brick => c == 3,
                ModuleKind::ActiveHinge => false,
            })
            .count();
        let extremities = body
            .modules
            .iter()
            .zip(&children)
            .filter(|&(module, &c)| module.kind != ModuleKind::Core && c == 0)
            .count();
        let limb_links = body
            .modules
            .iter()
            .zip(&children)
            .filter(|&(module, &c)| module.kind != ModuleKind::Core && c == 1)
            .count();

        let (min, max) = body.grid_extents();
        let width = f64::from(max[0] - min[0] + 1);
        let depth = f64::from(max[1] - min[1] + 1);
        let height = f64::from(max[2] - min[2] + 1);

        m.insert("modules_count", n);
        m.insert("hinge_count", hinges as f64);
        m.insert("brick_count", bricks as f64);
        m.insert("hinge_prop", ratio(hinges as f64, n));
        m.insert("brick_prop", ratio(bricks as f64, n));
        m.insert("branching_count", branching as f64);
        m.insert(
            "branching_prop",
            ratio(branching as f64, ((modules.saturating_sub(2)) / 3) as f64),
        );
        m.insert("extremities", extremities as f64);
        m.insert("extremities_prop", ratio(extremities as f64, n - 1.0));
        m.insert("length_of_limbs", ratio(limb_links as f64, n - 2.0));
        m.insert("coverage", ratio(n, width * depth * height));
        m.insert("proportion", ratio(width.min(depth), width.max(depth)));
        m.insert("symmetry", symmetry(self.phenotype));
        m.insert("width", width);
        m.insert("depth", depth);
        m.insert("height", height);
    }

    fn behaviour(&self, states: &[BatchState], m: &mut Measures) {
        let positions: Vec<Vector3> = states
            .iter()
            .filter_map(|s| s.envs.get(self.genotype_idx))
            .filter_map(|env| env.actor_states.first())
            .map(|actor| actor.position)
            .collect();
        let (Some(first), Some(last)) = (positions.first(), positions.last()) else {
            return;
        };
        let time = f64::from(self.simulation_time.max(1));
        let path: f64 = positions
            .windows(2)
            .map(|w| w[1].sub(w[0]).length_xy())
            .sum();

        m.insert("displacement_xy", last.sub(*first).length_xy());
        m.insert("speed_x", (last.x - first.x) / time);
        m.insert("speed_y", (last.y - first.y) / time);
        m.insert("average_speed", path / time);
    }
}

fn ratio(a: f64, b: f64) -> f64 {
    if b > 0.0 {
        a / b
    } else {
        0.0
    }
}

/// Best share of non-core modules mirrored across the x or y axis of the core.
///
/// A module lying on the mirror axis maps onto itself and never counts as
/// mirrored.
fn symmetry(robot: &ModularRobot) -> f64 {
    let cells: HashSet<[i32; 3]> = robot.body.modules.iter().map(|m| m.grid).collect();
    let others = cells.len().saturating_sub(1);
    if others == 0 {
        return 0.0;
    }
    let mirrored = |flip: fn([i32; 3]) -> [i32; 3]| {
        cells
            .iter()
            .filter(|&&c| {
                let image = flip(c);
                image != c && cells.contains(&image)
            })
            .count()
    };
    let across_x = mirrored(|c| [-c[0], c[1], c[2]]);
    let across_y = mirrored(|c| [c[0], -c[1], c[2]]);
    across_x.max(across_y) as f64 / others as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::CpgNetwork;
    use evorobo_data::{
        ActorState, Body, Direction, EnvironmentState, Module, Quaternion,
    };

    fn robot(body: Body) -> ModularRobot {
        ModularRobot {
            body,
            brain: CpgNetwork {
                hinges: Vec::new(),
                internal_weights: Vec::new(),
                connections: Vec::new(),
            },
        }
    }

    fn cross_body() -> Body {
        let mut body = Body::core_only();
        for (dir, kind) in [
            (Direction::Left, ModuleKind::Brick),
            (Direction::Right, ModuleKind::Brick),
            (Direction::Front, ModuleKind::ActiveHinge),
        ] {
            let o = dir.offset();
            body.modules.push(Module {
                kind,
                parent: Some(0),
                facing: dir,
                grid: o,
                rotated: false,
                chain_length: 1,
            });
        }
        body
    }

    fn state(y: f64) -> BatchState {
        BatchState {
            time_seconds: 0.0,
            envs: vec![EnvironmentState {
                actor_states: vec![ActorState {
                    position: Vector3::new(0.0, y, 0.05),
                    orientation: Quaternion::identity(),
                    dof_state: Vec::new(),
                }],
            }],
        }
    }

    #[test]
    fn test_morphology_of_cross() {
        let phenotype = robot(cross_body());
        let m = Measure {
            states: None,
            genotype_idx: 0,
            phenotype: &phenotype,
            generation: 3,
            simulation_time: 10,
        }
        .measure_all_non_relative();
        assert_eq!(m.get("birth"), Some(3.0));
        assert_eq!(m.get("modules_count"), Some(4.0));
        assert_eq!(m.get("hinge_count"), Some(1.0));
        assert_eq!(m.get("brick_count"), Some(2.0));
        assert_eq!(m.get("extremities"), Some(3.0));
        assert_eq!(m.get("width"), Some(3.0));
        assert_eq!(m.get("depth"), Some(2.0));
        assert_eq!(m.get("height"), Some(1.0));
        // Left and right bricks mirror each other, the hinge does not.
        assert!((m.get("symmetry").unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.get("speed_y"), None);
        for (name, _) in m.iter() {
            assert!(Measure::is_known(name), "{name} missing from NAMES");
        }
    }

    #[test]
    fn test_behaviour_from_states() {
        let phenotype = robot(Body::core_only());
        let states = vec![state(0.0), state(0.5), state(1.0)];
        let m = Measure {
            states: Some(&states),
            genotype_idx: 0,
            phenotype: &phenotype,
            generation: 0,
            simulation_time: 4,
        }
        .measure_all_non_relative();
        assert_eq!(m.get("displacement_xy"), Some(1.0));
        assert_eq!(m.get("speed_y"), Some(0.25));
        assert_eq!(m.get("speed_x"), Some(0.0));
        assert_eq!(m.get("average_speed"), Some(0.25));
        assert_eq!(m.get("symmetry"), Some(0.0));
    }

    #[test]
    fn test_module_on_axis_is_not_mirrored() {
        let mut body = Body::core_only();
        body.modules.push(Module {
            kind: ModuleKind::Brick,
            parent: Some(0),
            facing: Direction::Front,
            grid: Direction::Front.offset(),
            rotated: false,
            chain_length: 1,
        });
        let phenotype = robot(body);
        let m = Measure {
            states: None,
            genotype_idx: 0,
            phenotype: &phenotype,
            generation: 0,
            simulation_time: 1,
        }
        .measure_all_non_relative();
        assert_eq!(m.get("symmetry"), Some(0.0));
    }
}
