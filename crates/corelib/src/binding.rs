//! Material binding: assign material descriptors to named top-level nodes.
//!
//! All names are resolved through a [`NodeIndex`] before anything is
//! written, so a failed bind leaves the scene exactly as it was.

use std::collections::HashMap;
use std::sync::Arc;

use asset::{MaterialDescriptor, MaterialSlot, NodeId, SceneGraph};
use thiserror::Error;

/// Cyan used for the accent strips.
pub const ACCENT_CYAN: u32 = 0x2AF8FF;
/// Red used for the engine glow.
pub const ENGINE_RED: u32 = 0xFF0500;

const BAKED_NODE: &str = "BASE002";
const ACCENT_NODES: [&str; 3] = ["Motif_toit", "Contour_ailes", "Milieu_porte"];
const ENGINE_NODES: [&str; 2] = ["Reacteur_arriere", "Reacteur_coté"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("no top-level node named '{name}'")]
    MissingNode { name: String },
    #[error("{count} top-level nodes are named '{name}'")]
    AmbiguousNode { name: String, count: usize },
}

/// Ordered node name -> material table.
#[derive(Clone, Debug, Default)]
pub struct BindingTable {
    entries: Vec<(String, Arc<MaterialDescriptor>)>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the material for `name`.
    pub fn insert(&mut self, name: impl Into<String>, material: Arc<MaterialDescriptor>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = material,
            None => self.entries.push((name, material)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, material: Arc<MaterialDescriptor>) -> Self {
        self.insert(name, material);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<MaterialDescriptor>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<MaterialDescriptor>)> {
        self.entries.iter().map(|(n, m)| (n.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The viewer's fixed table: hull gets the baked material, accent strips
    /// glow cyan, engines glow red.
    pub fn baked_ship(baked: Arc<MaterialDescriptor>) -> Self {
        let accent = MaterialDescriptor::emissive(ACCENT_CYAN);
        let engine = MaterialDescriptor::emissive(ENGINE_RED);

        let mut table = Self::new().with(BAKED_NODE, baked);
        for name in ACCENT_NODES {
            table.insert(name, accent.clone());
        }
        for name in ENGINE_NODES {
            table.insert(name, engine.clone());
        }
        table
    }
}

/// Name -> top-level node ids, built once per scene.
#[derive(Clone, Debug, Default)]
pub struct NodeIndex {
    by_name: HashMap<String, Vec<NodeId>>,
}

impl NodeIndex {
    pub fn build(scene: &SceneGraph) -> Self {
        let mut by_name: HashMap<String, Vec<NodeId>> = HashMap::new();
        for &id in scene.roots() {
            if let Some(node) = scene.node(id) {
                by_name.entry(node.name.clone()).or_default().push(id);
            }
        }
        Self { by_name }
    }

    /// The single top-level node called `name` (exact, case-sensitive).
    pub fn resolve(&self, name: &str) -> Result<NodeId, BindError> {
        match self.by_name.get(name).map(Vec::as_slice) {
            Some([id]) => Ok(*id),
            Some(ids) if ids.len() > 1 => Err(BindError::AmbiguousNode {
                name: name.to_owned(),
                count: ids.len(),
            }),
            _ => Err(BindError::MissingNode {
                name: name.to_owned(),
            }),
        }
    }

    /// Number of distinct top-level names.
    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }
}

/// Assign every table entry to its node. Either all entries are applied or,
/// on the first unresolved name, none are.
pub fn bind(scene: &mut SceneGraph, table: &BindingTable) -> Result<(), BindError> {
    let index = NodeIndex::build(scene);
    let resolved = table
        .iter()
        .map(|(name, material)| index.resolve(name).map(|id| (id, material)))
        .collect::<Result<Vec<_>, _>>()?;

    for (id, material) in resolved {
        if let Some(node) = scene.node_mut(id) {
            node.material = MaterialSlot::Assigned(Arc::clone(material));
        }
    }

    log::info!("Bound {} materials ({} named nodes indexed)", table.len(), index.name_count());
    Ok(())
}
