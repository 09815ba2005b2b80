//! Scene graph: arena of named nodes, each with an optional mesh and a
//! material slot. Top-level nodes are the graph's roots.

use std::sync::Arc;

use glam::Mat4;

use crate::material::MaterialSlot;
use crate::mesh::MeshData;

/// Node id (dense, index into the node arena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    /// Transform relative to the parent node.
    pub local: Mat4,
    pub mesh: Option<Arc<MeshData>>,
    pub material: MaterialSlot,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local: Mat4::IDENTITY,
            mesh: None,
            material: MaterialSlot::default(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_mesh(mut self, mesh: MeshData) -> Self {
        self.mesh = Some(Arc::new(mesh));
        self
    }

    pub fn with_local(mut self, local: Mat4) -> Self {
        self.local = local;
        self
    }

    pub fn with_material(mut self, material: MaterialSlot) -> Self {
        self.material = material;
        self
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A node that has geometry, with its resolved world transform.
#[derive(Clone, Copy, Debug)]
pub struct Renderable<'a> {
    pub id: NodeId,
    pub world: Mat4,
    pub mesh: &'a MeshData,
    pub material: &'a MaterialSlot,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node.
    pub fn add_root(&mut self, node: Node) -> NodeId {
        let id = self.push(node, None);
        self.roots.push(id);
        id
    }

    /// Add a node under `parent`. Returns `None` if `parent` does not exist.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> Option<NodeId> {
        if parent.index() >= self.nodes.len() {
            return None;
        }
        let id = self.push(node, Some(parent));
        self.nodes[parent.index()].children.push(id);
        Some(id)
    }

    fn push(&mut self, mut node: Node, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = parent;
        node.children.clear();
        self.nodes.push(node);
        id
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    #[inline]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// First top-level node with the given name.
    pub fn find_root(&self, name: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|id| self.nodes[id.index()].name == name)
    }

    /// Move every node of `other` into this graph; its roots become roots here.
    pub fn append(&mut self, other: SceneGraph) {
        let offset = self.nodes.len() as u32;
        let shift = |id: NodeId| NodeId(id.0 + offset);

        self.nodes.extend(other.nodes.into_iter().map(|mut node| {
            node.parent = node.parent.map(shift);
            for child in &mut node.children {
                *child = shift(*child);
            }
            node
        }));
        self.roots.extend(other.roots.into_iter().map(shift));
    }

    /// Product of local transforms from the root down to `id`.
    pub fn world_transform(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.node(id)?;
        let mut world = node.local;
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            world = node.local * world;
        }
        Some(world)
    }

    /// Nodes carrying a mesh, with world transforms resolved.
    pub fn iter_renderables(&self) -> impl Iterator<Item = Renderable<'_>> {
        self.iter().filter_map(move |(id, node)| {
            let mesh = node.mesh.as_deref()?;
            Some(Renderable {
                id,
                world: self.world_transform(id)?,
                mesh,
                material: &node.material,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn children_are_linked_both_ways() {
        let mut g = SceneGraph::new();
        let root = g.add_root(Node::new("ship"));
        let child = g.add_child(root, Node::new("wing")).unwrap();
        assert_eq!(g.roots(), &[root]);
        assert_eq!(g.node(root).unwrap().children(), &[child]);
        assert_eq!(g.node(child).unwrap().parent(), Some(root));
        assert!(g.add_child(NodeId(99), Node::new("orphan")).is_none());
    }

    #[test]
    fn world_transform_composes_parents() {
        let mut g = SceneGraph::new();
        let root = g.add_root(
            Node::new("root").with_local(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))),
        );
        let child = g
            .add_child(
                root,
                Node::new("child")
                    .with_local(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)))
                    .with_mesh(MeshData::triangle()),
            )
            .unwrap();
        let world = g.world_transform(child).unwrap();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 0.0));

        let renderables: Vec<_> = g.iter_renderables().collect();
        assert_eq!(renderables.len(), 1);
        assert_eq!(renderables[0].id, child);
    }

    #[test]
    fn append_shifts_ids() {
        let mut root = SceneGraph::new();
        root.add_root(Node::new("existing"));

        let mut loaded = SceneGraph::new();
        let a = loaded.add_root(Node::new("A"));
        loaded.add_child(a, Node::new("A.child")).unwrap();
        loaded.add_root(Node::new("B"));

        root.append(loaded);
        assert_eq!(root.len(), 4);
        assert_eq!(root.roots(), &[NodeId(0), NodeId(1), NodeId(3)]);
        let a = root.find_root("A").unwrap();
        let child = root.node(a).unwrap().children()[0];
        assert_eq!(root.node(child).unwrap().name, "A.child");
        assert_eq!(root.node(child).unwrap().parent(), Some(a));
    }

    #[test]
    fn find_root_ignores_nested_nodes() {
        let mut g = SceneGraph::new();
        let root = g.add_root(Node::new("outer"));
        g.add_child(root, Node::new("inner")).unwrap();
        assert_eq!(g.find_root("outer"), Some(root));
        assert_eq!(g.find_root("inner"), None);
    }
}
