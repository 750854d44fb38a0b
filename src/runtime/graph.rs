//! In-memory arena of states and their owning containers.

use crate::core::{ContainerId, StateId, StateNode};
use std::collections::HashMap;

#[derive(Clone)]
struct Container {
    parent: Option<ContainerId>,
    enabled: bool,
}

/// The object tree states live on.
///
/// This is the runtime's view of the host scene graph: states are
/// arranged in a tree, each owned by a container whose enabled flag
/// the cascade toggles. Iteration order over states is insertion
/// order, which keeps cascades and dispatch deterministic.
#[derive(Clone)]
pub struct StateGraph {
    nodes: HashMap<StateId, StateNode>,
    order: Vec<StateId>,
    containers: HashMap<ContainerId, Container>,
    container_order: Vec<ContainerId>,
    root: ContainerId,
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl StateGraph {
    pub fn new() -> Self {
        let root = ContainerId::new();
        let mut containers = HashMap::new();
        containers.insert(
            root,
            Container {
                parent: None,
                enabled: true,
            },
        );
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            containers,
            container_order: vec![root],
            root,
        }
    }

    /// The machine's own container. Always enabled, never disabled by
    /// a cascade.
    pub fn root(&self) -> ContainerId {
        self.root
    }

    /// Create a container under `parent` (the root when `None`).
    pub fn add_container(&mut self, parent: Option<ContainerId>) -> ContainerId {
        let id = ContainerId::new();
        self.containers.insert(
            id,
            Container {
                parent: Some(parent.unwrap_or(self.root)),
                enabled: false,
            },
        );
        self.container_order.push(id);
        id
    }

    pub fn container_enabled(&self, id: ContainerId) -> bool {
        self.containers
            .get(&id)
            .map(|container| container.enabled)
            .unwrap_or(false)
    }

    pub fn set_container_enabled(&mut self, id: ContainerId, enabled: bool) {
        if let Some(container) = self.containers.get_mut(&id) {
            container.enabled = enabled;
        }
    }

    /// Whether `container` lies within the subtree rooted at `scope`.
    pub fn container_in_scope(&self, scope: ContainerId, container: ContainerId) -> bool {
        let mut cursor = Some(container);
        while let Some(id) = cursor {
            if id == scope {
                return true;
            }
            cursor = self.containers.get(&id).and_then(|c| c.parent);
        }
        false
    }

    pub fn containers(&self) -> Vec<ContainerId> {
        self.container_order.clone()
    }

    /// Insert a node, wiring up the parent's child list.
    pub fn add_node(&mut self, node: StateNode) -> StateId {
        let id = node.id;
        if let Some(parent) = node.parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.push(id);
            }
        }
        self.nodes.insert(id, node);
        self.order.push(id);
        id
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: StateId) -> Option<&StateNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: StateId) -> Option<&mut StateNode> {
        self.nodes.get_mut(&id)
    }

    /// Every state id in insertion order.
    pub fn states(&self) -> Vec<StateId> {
        self.order.clone()
    }

    /// Ancestor chain of a state, outermost first, excluding the state
    /// itself.
    pub fn ancestors(&self, id: StateId) -> Vec<StateId> {
        let mut chain = Vec::new();
        let mut cursor = self.nodes.get(&id).and_then(|node| node.parent);
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.nodes.get(&parent).and_then(|node| node.parent);
        }
        chain.reverse();
        chain
    }

    /// The set of states that must be enabled while `id` is current:
    /// its ancestors (outermost first) followed by the state itself.
    pub fn active_path(&self, id: StateId) -> Vec<StateId> {
        let mut path = self.ancestors(id);
        path.push(id);
        path
    }

    /// Nesting depth, zero for a top-level state.
    pub fn depth(&self, id: StateId) -> usize {
        self.ancestors(id).len()
    }

    /// Destroy a state and its nested states, severing every edge and
    /// default transition that targeted them.
    pub fn remove_state(&mut self, id: StateId) {
        let mut doomed = vec![id];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let next = doomed[cursor];
            if let Some(node) = self.nodes.get(&next) {
                doomed.extend(node.children.iter().copied());
            }
            cursor += 1;
        }

        if let Some(parent) = self.nodes.get(&id).and_then(|node| node.parent) {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|child| *child != id);
            }
        }

        for gone in &doomed {
            self.nodes.remove(gone);
        }
        self.order.retain(|state| !doomed.contains(state));

        for node in self.nodes.values_mut() {
            node.edges.retain(|edge| !doomed.contains(&edge.target));
            if node
                .default_next
                .is_some_and(|target| doomed.contains(&target))
            {
                node.default_next = None;
                node.default_duration = 0.0;
            }
        }
    }
}
