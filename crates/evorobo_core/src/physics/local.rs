//! Deterministic kinematic runner.
//!
//! Joints move toward their targets under a velocity limit. Each joint
//! pushes against the ground: strokes that press the limb down grip with
//! static friction, return strokes slip with dynamic friction, and the
//! difference propels the actor in the plane. Environments are integrated
//! in parallel between control ticks.

use super::{ActorControl, Batch, Environment, Joint, Runner, RunnerError};
use evorobo_data::{ActorState, BatchState, EnvironmentState, Quaternion, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimParams {
    /// Integration step in seconds.
    pub dt: f64,
    /// Joint velocity limit in rad/s.
    pub max_joint_speed: f64,
    /// Metres travelled per radian of gripping stroke.
    pub thrust_gain: f64,
    /// Yaw change per unit of lateral torque.
    pub turn_gain: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            dt: 0.01,
            max_joint_speed: 3.0,
            thrust_gain: 0.05,
            turn_gain: 0.5,
        }
    }
}

impl SimParams {
    pub fn validate(&self) -> Result<(), RunnerError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(RunnerError::InvalidBatch(format!(
                "integration step must be positive, got {}",
                self.dt
            )));
        }
        if !(self.max_joint_speed.is_finite() && self.max_joint_speed > 0.0) {
            return Err(RunnerError::InvalidBatch(format!(
                "joint speed limit must be positive, got {}",
                self.max_joint_speed
            )));
        }
        Ok(())
    }
}

struct SimActor {
    joints: Vec<Joint>,
    num_parts: usize,
    position: Vector3,
    roll: f64,
    yaw: f64,
    dof: Vec<f64>,
    targets: Vec<f64>,
}

impl SimActor {
    fn state(&self) -> ActorState {
        ActorState {
            position: self.position,
            orientation: Quaternion::from_eulers(self.roll, 0.0, self.yaw),
            dof_state: self.dof.clone(),
        }
    }

    fn integrate(&mut self, dt: f64, params: &SimParams, static_mu: f64, dynamic_mu: f64) {
        let max_delta = params.max_joint_speed * dt;
        let mut push = Vector3::default();
        let mut torque = 0.0;

        for (j, joint) in self.joints.iter().enumerate() {
            let delta = (self.targets[j] - self.dof[j]).clamp(-max_delta, max_delta);
            self.dof[j] += delta;

            let mu = if delta < 0.0 { static_mu } else { dynamic_mu };
            let stroke = -delta * mu * params.thrust_gain;
            let dir = if joint.vertical_axis {
                Vector3::new(-joint.facing.y, joint.facing.x, 0.0)
            } else {
                Vector3::new(joint.facing.x, joint.facing.y, 0.0)
            };
            let force = dir.scale(stroke);
            push = push.add(force);
            torque += joint.position.x * force.y - joint.position.y * force.x;
        }

        let mass = self.num_parts.max(1) as f64;
        let local = push.scale(1.0 / mass);
        let (s, c) = self.yaw.sin_cos();
        let world = Vector3::new(c * local.x - s * local.y, s * local.x + c * local.y, 0.0);
        self.position = self.position.add(world);
        self.yaw += torque * params.turn_gain / mass;
    }
}

struct SimEnvironment {
    actors: Vec<SimActor>,
    static_friction: f64,
    dynamic_friction: f64,
}

impl SimEnvironment {
    fn from_environment(env: Environment) -> Self {
        let actors = env
            .actors
            .into_iter()
            .map(|posed| SimActor {
                num_parts: posed.actor.parts.len(),
                joints: posed.actor.joints,
                position: posed.position,
                roll: posed.orientation.roll(),
                yaw: posed.orientation.yaw(),
                targets: posed.dof_states.clone(),
                dof: posed.dof_states,
            })
            .collect();
        Self {
            actors,
            static_friction: env.conditions.static_friction,
            dynamic_friction: env.conditions.dynamic_friction,
        }
    }

    fn state(&self) -> EnvironmentState {
        EnvironmentState {
            actor_states: self.actors.iter().map(SimActor::state).collect(),
        }
    }

    fn integrate(&mut self, dt: f64, params: &SimParams) {
        let (s, d) = (self.static_friction, self.dynamic_friction);
        for actor in &mut self.actors {
            actor.integrate(dt, params, s, d);
        }
    }
}

pub struct LocalRunner {
    params: SimParams,
    headless: bool,
}

impl LocalRunner {
    #[must_use]
    pub fn new(headless: bool) -> Self {
        Self::with_params(SimParams::default(), headless)
    }

    #[must_use]
    pub fn with_params(params: SimParams, headless: bool) -> Self {
        Self { params, headless }
    }

    #[must_use]
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    fn validate(&self, batch: &Batch<'_>) -> Result<(), RunnerError> {
        self.params.validate()?;
        if batch.simulation_time == 0 {
            return Err(RunnerError::InvalidBatch(
                "simulation time must be at least one second".to_string(),
            ));
        }
        for (name, value) in [
            ("sampling frequency", batch.sampling_frequency),
            ("control frequency", batch.control_frequency),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(RunnerError::InvalidBatch(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        for (e, env) in batch.environments.iter().enumerate() {
            for (a, posed) in env.actors.iter().enumerate() {
                if posed.dof_states.len() != posed.actor.dof_count() {
                    return Err(RunnerError::InvalidBatch(format!(
                        "env {e} actor {a}: {} initial dof states for {} joints",
                        posed.dof_states.len(),
                        posed.actor.dof_count()
                    )));
                }
            }
        }
        Ok(())
    }

    fn sample(&self, time_seconds: f64, envs: &[SimEnvironment]) -> BatchState {
        let state = BatchState {
            time_seconds,
            envs: envs.iter().map(SimEnvironment::state).collect(),
        };
        if !self.headless {
            for (e, env) in state.envs.iter().enumerate() {
                for (a, actor) in env.actor_states.iter().enumerate() {
                    tracing::info!(
                        time = time_seconds,
                        env = e,
                        actor = a,
                        x = actor.position.x,
                        y = actor.position.y,
                        yaw = actor.orientation.yaw(),
                        "Sample"
                    );
                }
            }
        }
        state
    }
}

fn steps(duration: f64, dt: f64) -> u64 {
    ((duration / dt).round() as u64).max(1)
}

fn apply_targets(
    envs: &mut [SimEnvironment],
    control: &mut ActorControl,
) -> Result<(), RunnerError> {
    if let Some((env, actor, got)) = control.invalid() {
        return Err(RunnerError::ControlMismatch {
            env,
            actor,
            expected: 0,
            got,
        });
    }
    for (e, env_targets) in control.take().into_iter().enumerate() {
        for (a, targets) in env_targets.into_iter().enumerate() {
            let Some(targets) = targets else { continue };
            let actor = &mut envs[e].actors[a];
            if targets.len() != actor.joints.len() {
                return Err(RunnerError::ControlMismatch {
                    env: e,
                    actor: a,
                    expected: actor.joints.len(),
                    got: targets.len(),
                });
            }
            actor.targets = targets;
        }
    }
    Ok(())
}

impl Runner for LocalRunner {
    fn run_batch(&mut self, batch: Batch<'_>) -> Result<Vec<BatchState>, RunnerError> {
        self.validate(&batch)?;
        let Batch {
            simulation_time,
            sampling_frequency,
            control_frequency,
            mut control,
            environments,
        } = batch;

        let dt = self.params.dt;
        let control_period = 1.0 / control_frequency;
        let total_steps = steps(f64::from(simulation_time), dt);
        let steps_per_control = steps(control_period, dt);
        let steps_per_sample = steps(1.0 / sampling_frequency, dt);

        let mut actor_control = ActorControl::new(&environments);
        let mut envs: Vec<SimEnvironment> = environments
            .into_iter()
            .map(SimEnvironment::from_environment)
            .collect();

        let mut states = vec![self.sample(0.0, &envs)];
        for step in 0..total_steps {
            if step % steps_per_control == 0 {
                control(control_period, &mut actor_control);
                apply_targets(&mut envs, &mut actor_control)?;
            }

            let params = &self.params;
            envs.par_iter_mut().for_each(|env| env.integrate(dt, params));

            if (step + 1) % steps_per_sample == 0 {
                states.push(self.sample((step + 1) as f64 * dt, &envs));
            }
        }

        tracing::debug!(
            environments = envs.len(),
            steps = total_steps,
            samples = states.len(),
            "Batch finished"
        );
        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{Actor, PosedActor};
    use evorobo_data::{Body, Direction, EnvConditions, Module, ModuleKind};

    fn hinge_body(rotated: bool) -> Body {
        let mut body = Body::core_only();
        body.modules.push(Module {
            kind: ModuleKind::ActiveHinge,
            parent: Some(0),
            facing: Direction::Front,
            grid: [0, 1, 0],
            rotated,
            chain_length: 1,
        });
        body
    }

    fn environment(body: &Body) -> Environment {
        let actor = Actor::from_body(body);
        let dofs = actor.dof_count();
        Environment {
            actors: vec![PosedActor {
                actor,
                position: Vector3::new(0.0, 0.0, 0.05),
                orientation: Quaternion::identity(),
                dof_states: vec![0.0; dofs],
            }],
            conditions: EnvConditions::default(),
        }
    }

    fn oscillating(envs: Vec<Environment>) -> Batch<'static> {
        let mut t = 0.0_f64;
        let n = envs.len();
        let mut batch = Batch::new(
            2,
            5.0,
            10.0,
            Box::new(move |dt: f64, control: &mut ActorControl| {
                t += dt;
                for e in 0..n {
                    control.set_dof_targets(e, 0, vec![(t * 6.0).sin()]);
                }
            }),
        );
        batch.environments = envs;
        batch
    }

    #[test]
    fn test_sampling_schedule() {
        let mut runner = LocalRunner::new(true);
        let states = runner
            .run_batch(oscillating(vec![environment(&hinge_body(false))]))
            .unwrap();
        assert_eq!(states.len(), 11);
        assert_eq!(states[0].time_seconds, 0.0);
        assert!((states[10].time_seconds - 2.0).abs() < 1e-9);
        assert_eq!(states[0].envs[0].actor_states[0].dof_state, vec![0.0]);
    }

    #[test]
    fn test_control_callback_frequency() {
        let mut calls = 0;
        let mut batch = Batch::new(
            2,
            1.0,
            10.0,
            Box::new(|_: f64, _: &mut ActorControl| calls += 1),
        );
        batch.environments = vec![environment(&Body::core_only())];
        LocalRunner::new(true).run_batch(batch).unwrap();
        assert_eq!(calls, 20);
    }

    #[test]
    fn test_oscillating_hinge_moves_actor() {
        let mut runner = LocalRunner::new(true);
        let states = runner
            .run_batch(oscillating(vec![environment(&hinge_body(false))]))
            .unwrap();
        let first = states[0].envs[0].actor_states[0].position;
        let last = states.last().unwrap().envs[0].actor_states[0].position;
        assert!(last.sub(first).length_xy() > 1e-4);
        assert_eq!(last.z, first.z);
    }

    #[test]
    fn test_parallel_environments_are_independent() {
        let body = hinge_body(true);
        let mut runner = LocalRunner::new(true);
        let single = runner.run_batch(oscillating(vec![environment(&body)])).unwrap();
        let many = runner
            .run_batch(oscillating(vec![environment(&body); 6]))
            .unwrap();
        for (a, b) in single.iter().zip(&many) {
            for env in &b.envs {
                assert_eq!(env.actor_states[0], a.envs[0].actor_states[0]);
            }
        }
    }

    #[test]
    fn test_invalid_batches() {
        let mut runner = LocalRunner::new(true);
        let batch = Batch::new(0, 5.0, 10.0, Box::new(|_: f64, _: &mut ActorControl| {}));
        assert!(matches!(
            runner.run_batch(batch),
            Err(RunnerError::InvalidBatch(_))
        ));
        let batch = Batch::new(1, 0.0, 10.0, Box::new(|_: f64, _: &mut ActorControl| {}));
        assert!(matches!(
            runner.run_batch(batch),
            Err(RunnerError::InvalidBatch(_))
        ));
    }

    #[test]
    fn test_wrong_target_count_is_rejected() {
        let mut batch = Batch::new(
            1,
            5.0,
            10.0,
            Box::new(|_: f64, control: &mut ActorControl| {
                control.set_dof_targets(0, 0, vec![0.1, 0.2]);
            }),
        );
        batch.environments = vec![environment(&hinge_body(false))];
        assert_eq!(
            LocalRunner::new(true).run_batch(batch).unwrap_err(),
            RunnerError::ControlMismatch {
                env: 0,
                actor: 0,
                expected: 1,
                got: 2
            }
        );
    }
}
