use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    #[must_use]
    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    #[must_use]
    pub fn length_xy(self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Unit quaternion, `w` first.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotation from roll/pitch/yaw angles in radians.
    #[must_use]
    pub fn from_eulers(roll: f64, pitch: f64, yaw: f64) -> Self {
        let (sr, cr) = (roll * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sy, cy) = (yaw * 0.5).sin_cos();
        Self {
            w: cr * cp * cy + sr * sp * sy,
            x: sr * cp * cy - cr * sp * sy,
            y: cr * sp * cy + sr * cp * sy,
            z: cr * cp * sy - sr * sp * cy,
        }
    }

    /// Heading angle about +z in radians.
    #[must_use]
    pub fn yaw(&self) -> f64 {
        (2.0 * (self.w * self.z + self.x * self.y))
            .atan2(1.0 - 2.0 * (self.y * self.y + self.z * self.z))
    }

    /// Roll angle about +x in radians.
    #[must_use]
    pub fn roll(&self) -> f64 {
        (2.0 * (self.w * self.x + self.y * self.z))
            .atan2(1.0 - 2.0 * (self.x * self.x + self.y * self.y))
    }
}

/// State of one actor at a sample instant.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActorState {
    pub position: Vector3,
    pub orientation: Quaternion,
    /// Joint angles in radians, one per active hinge.
    pub dof_state: Vec<f64>,
}

impl ActorState {
    /// Serialize to the stored JSON form.
    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentState {
    pub actor_states: Vec<ActorState>,
}

/// All environments of a batch at one sample instant.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BatchState {
    pub time_seconds: f64,
    pub envs: Vec<EnvironmentState>,
}
