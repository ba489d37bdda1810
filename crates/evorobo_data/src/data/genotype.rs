use crate::data::cppn::Cppn;
use serde::{Deserialize, Serialize};

/// Complete genetic blueprint of a modular robot.
///
/// The body CPPN is queried over grid positions to grow the morphology; the
/// brain CPPN is queried over pairs of joint positions to weight the CPG.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Genotype {
    pub body: Cppn,
    pub brain: Cppn,
}

impl Genotype {
    /// Serialize genotype to its stored JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialize genotype from its stored JSON form.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let genotype = serde_json::from_str(json)?;
        Ok(genotype)
    }
}
