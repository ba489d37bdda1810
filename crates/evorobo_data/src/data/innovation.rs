use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// First id handed out to hidden nodes; fixed input/bias/output ids stay below.
pub const HIDDEN_NODE_ID_BASE: u64 = 1024;

/// A registered `from -> to` connection.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionInnovation {
    pub from: u64,
    pub to: u64,
    pub innovation: u64,
}

/// A registered split of an existing connection into two through a new node.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SplitInnovation {
    /// Innovation number of the connection that was split.
    pub split: u64,
    pub node_id: u64,
    /// Innovation of `from -> node_id`.
    pub in_innovation: u64,
    /// Innovation of `node_id -> to`.
    pub out_innovation: u64,
}

/// Registry assigning stable innovation numbers to structural mutations.
///
/// One database exists per genome kind (body, brain) per run. Every genotype
/// in the run registers its structural changes here, so identical structure
/// always carries identical innovation numbers and crossover can align genes.
///
/// The registry is persisted as a JSON string. The lookup indexes are not
/// serialized and are rebuilt by [`InnovationDatabase::deserialize`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InnovationDatabase {
    next_innovation: u64,
    next_node_id: u64,
    connections: Vec<ConnectionInnovation>,
    splits: Vec<SplitInnovation>,
    #[serde(skip)]
    connection_index: HashMap<(u64, u64), u64>,
    #[serde(skip)]
    split_index: HashMap<u64, usize>,
}

impl Default for InnovationDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for InnovationDatabase {
    fn eq(&self, other: &Self) -> bool {
        self.next_innovation == other.next_innovation
            && self.next_node_id == other.next_node_id
            && self.connections == other.connections
            && self.splits == other.splits
    }
}

impl InnovationDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_innovation: 0,
            next_node_id: HIDDEN_NODE_ID_BASE,
            connections: Vec::new(),
            splits: Vec::new(),
            connection_index: HashMap::new(),
            split_index: HashMap::new(),
        }
    }

    /// Returns the innovation number of `from -> to`, registering it if new.
    pub fn connection_innovation(&mut self, from: u64, to: u64) -> u64 {
        if let Some(&innovation) = self.connection_index.get(&(from, to)) {
            return innovation;
        }
        let innovation = self.next_innovation;
        self.next_innovation += 1;
        self.connections.push(ConnectionInnovation {
            from,
            to,
            innovation,
        });
        self.connection_index.insert((from, to), innovation);
        innovation
    }

    /// Returns the node and connection innovations for splitting the
    /// connection `from -> to` carrying innovation `split`.
    pub fn split_innovation(&mut self, split: u64, from: u64, to: u64) -> SplitInnovation {
        if let Some(&idx) = self.split_index.get(&split) {
            return self.splits[idx];
        }
        let node_id = self.next_node_id;
        self.next_node_id += 1;
        let record = SplitInnovation {
            split,
            node_id,
            in_innovation: self.connection_innovation(from, node_id),
            out_innovation: self.connection_innovation(node_id, to),
        };
        self.split_index.insert(split, self.splits.len());
        self.splits.push(record);
        record
    }

    /// Number of registered connection innovations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    #[must_use]
    pub fn split_count(&self) -> usize {
        self.splits.len()
    }

    /// Serializes the registry to its stored string form.
    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Restores a registry from its stored string form.
    pub fn deserialize(serialized: &str) -> anyhow::Result<Self> {
        let mut db: Self = serde_json::from_str(serialized)?;
        db.rebuild_index()?;
        Ok(db)
    }

    /// Replaces this registry with the one stored in `serialized`.
    ///
    /// On error the registry is left unchanged.
    pub fn restore(&mut self, serialized: &str) -> anyhow::Result<()> {
        *self = Self::deserialize(serialized)?;
        Ok(())
    }

    fn rebuild_index(&mut self) -> anyhow::Result<()> {
        self.connection_index = self
            .connections
            .iter()
            .map(|c| ((c.from, c.to), c.innovation))
            .collect();
        self.split_index = self
            .splits
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.split, idx))
            .collect();
        anyhow::ensure!(
            self.connection_index.len() == self.connections.len(),
            "innovation database contains duplicate connections"
        );
        anyhow::ensure!(
            self.connections
                .iter()
                .all(|c| c.innovation < self.next_innovation),
            "innovation database counter is behind its records"
        );
        anyhow::ensure!(
            self.next_node_id >= HIDDEN_NODE_ID_BASE,
            "innovation database node counter below hidden id base"
        );
        Ok(())
    }
}
