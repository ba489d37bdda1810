//! Physics runner contract and the types a batch is described with.
//!
//! A [`Batch`] holds one or more [`Environment`]s, each with posed actors, the
//! timing parameters and a control callback. A [`Runner`] executes the whole
//! batch and returns the sampled [`BatchState`]s.

pub mod local;

pub use evorobo_data::{ActorState, BatchState, EnvConditions, EnvironmentState, Quaternion, Vector3};
pub use local::{LocalRunner, SimParams};

use evorobo_data::{Body, ModuleKind};
use thiserror::Error;

/// Edge length of one body grid cell in metres.
pub const MODULE_SIZE: f64 = 0.1;

#[derive(Error, Debug, PartialEq)]
pub enum RunnerError {
    /// The batch description cannot be simulated.
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// The control callback addressed an actor that does not exist or sent
    /// the wrong number of targets.
    #[error("Control mismatch for env {env} actor {actor}: expected {expected} targets, got {got}")]
    ControlMismatch {
        env: usize,
        actor: usize,
        expected: usize,
        got: usize,
    },
}

/// One rigid box of an actor, in the actor frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidPart {
    pub kind: ModuleKind,
    pub position: Vector3,
    pub size: Vector3,
}

/// One actuated degree of freedom.
#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    /// Index of the hinge part.
    pub part: usize,
    pub position: Vector3,
    /// Unit direction from the hinge's parent towards the hinge.
    pub facing: Vector3,
    /// True when the joint swings about the vertical axis.
    pub vertical_axis: bool,
}

/// Simulatable geometry of a robot.
#[derive(Clone, Debug, PartialEq)]
pub struct Actor {
    pub parts: Vec<RigidPart>,
    pub joints: Vec<Joint>,
}

/// Axis-aligned bounding box: `size` and the centre `offset` in the actor frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub size: Vector3,
    pub offset: Vector3,
}

impl Actor {
    /// Builds one box per module; every active hinge becomes a joint.
    #[must_use]
    pub fn from_body(body: &Body) -> Self {
        let mut parts = Vec::with_capacity(body.modules.len());
        let mut joints = Vec::new();
        for module in &body.modules {
            let position = Vector3::new(
                f64::from(module.grid[0]) * MODULE_SIZE,
                f64::from(module.grid[1]) * MODULE_SIZE,
                f64::from(module.grid[2]) * MODULE_SIZE,
            );
            let edge = match module.kind {
                ModuleKind::Core => 1.0,
                ModuleKind::Brick => 0.8,
                ModuleKind::ActiveHinge => 0.6,
            } * MODULE_SIZE;
            if module.kind == ModuleKind::ActiveHinge {
                let o = module.facing.offset();
                joints.push(Joint {
                    part: parts.len(),
                    position,
                    facing: Vector3::new(f64::from(o[0]), f64::from(o[1]), f64::from(o[2])),
                    vertical_axis: module.rotated,
                });
            }
            parts.push(RigidPart {
                kind: module.kind,
                position,
                size: Vector3::new(edge, edge, edge),
            });
        }
        Self { parts, joints }
    }

    #[must_use]
    pub fn dof_count(&self) -> usize {
        self.joints.len()
    }

    #[must_use]
    pub fn calc_aabb(&self) -> Aabb {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for part in &self.parts {
            let p = [part.position.x, part.position.y, part.position.z];
            let s = [part.size.x, part.size.y, part.size.z];
            for k in 0..3 {
                min[k] = min[k].min(p[k] - s[k] / 2.0);
                max[k] = max[k].max(p[k] + s[k] / 2.0);
            }
        }
        if self.parts.is_empty() {
            return Aabb {
                size: Vector3::default(),
                offset: Vector3::default(),
            };
        }
        Aabb {
            size: Vector3::new(max[0] - min[0], max[1] - min[1], max[2] - min[2]),
            offset: Vector3::new(
                (max[0] + min[0]) / 2.0,
                (max[1] + min[1]) / 2.0,
                (max[2] + min[2]) / 2.0,
            ),
        }
    }
}

/// An actor with its initial pose and joint positions.
#[derive(Clone, Debug)]
pub struct PosedActor {
    pub actor: Actor,
    pub position: Vector3,
    pub orientation: Quaternion,
    pub dof_states: Vec<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct Environment {
    pub actors: Vec<PosedActor>,
    pub conditions: EnvConditions,
}

impl Environment {
    #[must_use]
    pub fn new(conditions: EnvConditions) -> Self {
        Self {
            actors: Vec::new(),
            conditions,
        }
    }
}

/// Joint targets written by the control callback.
#[derive(Clone, Debug)]
pub struct ActorControl {
    targets: Vec<Vec<Option<Vec<f64>>>>,
    invalid: Vec<(usize, usize, usize)>,
}

impl ActorControl {
    #[must_use]
    pub fn new(environments: &[Environment]) -> Self {
        Self {
            targets: environments
                .iter()
                .map(|env| vec![None; env.actors.len()])
                .collect(),
            invalid: Vec::new(),
        }
    }

    pub fn set_dof_targets(&mut self, env_index: usize, actor_index: usize, targets: Vec<f64>) {
        match self
            .targets
            .get_mut(env_index)
            .and_then(|env| env.get_mut(actor_index))
        {
            Some(slot) => *slot = Some(targets),
            None => self.invalid.push((env_index, actor_index, targets.len())),
        }
    }

    /// Takes the targets set since the last call.
    pub(crate) fn take(&mut self) -> Vec<Vec<Option<Vec<f64>>>> {
        self.targets
            .iter_mut()
            .map(|env| env.iter_mut().map(Option::take).collect())
            .collect()
    }

    pub(crate) fn invalid(&self) -> Option<(usize, usize, usize)> {
        self.invalid.first().copied()
    }
}

/// Control callback: receives the control period and the target sink.
pub type ControlFn<'a> = Box<dyn FnMut(f64, &mut ActorControl) + 'a>;

/// Environments simulated together under shared timing parameters.
pub struct Batch<'a> {
    /// Simulated duration in seconds.
    pub simulation_time: u32,
    /// Samples per second recorded into the returned states.
    pub sampling_frequency: f64,
    /// Control callback invocations per second.
    pub control_frequency: f64,
    pub control: ControlFn<'a>,
    pub environments: Vec<Environment>,
}

impl<'a> Batch<'a> {
    #[must_use]
    pub fn new(
        simulation_time: u32,
        sampling_frequency: f64,
        control_frequency: f64,
        control: ControlFn<'a>,
    ) -> Self {
        Self {
            simulation_time,
            sampling_frequency,
            control_frequency,
            control,
            environments: Vec::new(),
        }
    }
}

/// Executes batches of environments.
pub trait Runner {
    fn run_batch(&mut self, batch: Batch<'_>) -> Result<Vec<BatchState>, RunnerError>;
}
