//! Central pattern generator brains.
//!
//! Every active hinge owns one oscillator made of two neurons `(x, y)`.
//! The internal weight couples `x` and `y` of the same hinge; connection
//! weights couple the `x` neurons of hinges at most two grid cells apart.
//! All couplings are antisymmetric, so the network oscillates instead of
//! diverging. Joint targets are the `x` neurons scaled to the joint range.

use crate::cppn::CppnLogic;
use evorobo_data::{Body, Cppn};
use serde::{Deserialize, Serialize};

/// Maximum joint excursion in radians.
pub const DOF_RANGE: f64 = 1.0;

/// Chebyshev grid distance within which two hinges are coupled.
const NEIGHBOUR_DISTANCE: i32 = 2;

/// Anything that turns simulated time into joint targets.
pub trait ActorController {
    fn step(&mut self, dt: f64);

    #[must_use]
    fn dof_targets(&self) -> Vec<f64>;
}

/// Weights of a developed CPG, queried once from the brain CPPN.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CpgNetwork {
    /// Module index of every hinge, in the order of the actor's joints.
    pub hinges: Vec<usize>,
    pub internal_weights: Vec<f64>,
    /// `(hinge_a, hinge_b, weight)` with `hinge_a < hinge_b`.
    pub connections: Vec<(usize, usize, f64)>,
}

impl CpgNetwork {
    /// Queries the brain CPPN for every hinge and neighbouring hinge pair.
    #[must_use]
    pub fn develop(brain: &Cppn, body: &Body) -> Self {
        let net = brain.compile();
        let hinges = body.hinge_indices();
        let pos = |idx: usize| body.modules[idx].grid.map(f64::from);

        let internal_weights = hinges
            .iter()
            .map(|&h| {
                let p = pos(h);
                net.activate(&[p[0], p[1], p[2], p[0], p[1], p[2]])[0]
            })
            .collect();

        let mut connections = Vec::new();
        for (a, &ha) in hinges.iter().enumerate() {
            for (b, &hb) in hinges.iter().enumerate().skip(a + 1) {
                let ga = body.modules[ha].grid;
                let gb = body.modules[hb].grid;
                let dist = (0..3).map(|k| (ga[k] - gb[k]).abs()).max().unwrap_or(0);
                if dist > NEIGHBOUR_DISTANCE {
                    continue;
                }
                let (pa, pb) = (pos(ha), pos(hb));
                let w = net.activate(&[pa[0], pa[1], pa[2], pb[0], pb[1], pb[2]])[0];
                connections.push((a, b, w));
            }
        }

        Self {
            hinges,
            internal_weights,
            connections,
        }
    }

    #[must_use]
    pub fn num_oscillators(&self) -> usize {
        self.hinges.len()
    }
}

/// Runtime state of a [`CpgNetwork`].
#[derive(Clone, Debug)]
pub struct CpgController {
    network: CpgNetwork,
    /// `x` neurons in `0..n`, `y` neurons in `n..2n`.
    state: Vec<f64>,
}

impl CpgController {
    #[must_use]
    pub fn new(network: CpgNetwork) -> Self {
        let n = network.num_oscillators();
        Self {
            network,
            state: vec![std::f64::consts::FRAC_1_SQRT_2; 2 * n],
        }
    }

    #[must_use]
    pub fn state(&self) -> &[f64] {
        &self.state
    }

    fn derivative(&self, state: &[f64]) -> Vec<f64> {
        let n = self.network.num_oscillators();
        let mut d = vec![0.0; 2 * n];
        for (i, &w) in self.network.internal_weights.iter().enumerate() {
            d[i] += w * state[n + i];
            d[n + i] -= w * state[i];
        }
        for &(a, b, w) in &self.network.connections {
            d[a] += w * state[b];
            d[b] -= w * state[a];
        }
        d
    }
}

impl ActorController for CpgController {
    /// Fourth-order Runge-Kutta step, then clamps neurons to `[-1, 1]`.
    fn step(&mut self, dt: f64) {
        if self.state.is_empty() {
            return;
        }
        let axpy = |x: &[f64], k: &[f64], h: f64| -> Vec<f64> {
            x.iter().zip(k).map(|(xi, ki)| xi + h * ki).collect()
        };
        let k1 = self.derivative(&self.state);
        let k2 = self.derivative(&axpy(&self.state, &k1, dt / 2.0));
        let k3 = self.derivative(&axpy(&self.state, &k2, dt / 2.0));
        let k4 = self.derivative(&axpy(&self.state, &k3, dt));
        for i in 0..self.state.len() {
            let next = self.state[i] + dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
            self.state[i] = next.clamp(-1.0, 1.0);
        }
    }

    fn dof_targets(&self) -> Vec<f64> {
        let n = self.network.num_oscillators();
        self.state[..n].iter().map(|x| x * DOF_RANGE).collect()
    }
}
