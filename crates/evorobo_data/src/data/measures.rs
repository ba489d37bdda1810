use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named scalar measures of one individual.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Measures(pub BTreeMap<String, f64>);

impl Measures {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for Measures {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Physical conditions an environment is simulated under.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct EnvConditions {
    pub static_friction: f64,
    pub dynamic_friction: f64,
    /// Tilt of the robot about the x axis when posed, in degrees.
    pub x_rotation_degrees: f64,
}

impl Default for EnvConditions {
    fn default() -> Self {
        Self {
            static_friction: 1.0,
            dynamic_friction: 0.2,
            x_rotation_degrees: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measures_serialize_as_map() {
        let mut m = Measures::new();
        m.insert("speed_y", 1.5);
        m.insert("birth", 2.0);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"birth":2.0,"speed_y":1.5}"#);
        let back: Measures = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("speed_y"), Some(1.5));
        assert_eq!(back.get("missing"), None);
    }
}
