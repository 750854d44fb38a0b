//! Builder for constructing state machines.

use super::error::BuildError;
use super::transition::TransitionBuilder;
use crate::core::{StateId, StateNode, TransitionEdge};
use crate::runtime::{Machine, Role, StateGraph};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Builder for constructing machines with a fluent API.
///
/// States are declared up front and referenced by the [`StateId`]s the
/// builder hands back; transitions and the initial state are validated
/// against the declared set when [`Self::build`] runs.
pub struct MachineBuilder {
    graph: StateGraph,
    role: Role,
    initial: Option<StateId>,
    fixed_delta: f32,
    seed: Option<u64>,
    edges: Vec<(StateId, TransitionEdge)>,
    defaults: Vec<(StateId, StateId, f32)>,
}

impl MachineBuilder {
    /// Create a builder for an authority machine ticking at 60 steps
    /// per second.
    pub fn new() -> Self {
        Self {
            graph: StateGraph::new(),
            role: Role::Authority,
            initial: None,
            fixed_delta: 1.0 / 60.0,
            seed: None,
            edges: Vec::new(),
            defaults: Vec::new(),
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Seconds of simulation time per tick.
    pub fn tick_delta(mut self, seconds: f32) -> Self {
        self.fixed_delta = seconds;
        self
    }

    /// Seed the weighted-selection RNG for deterministic runs.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Declare a top-level state on its own container.
    pub fn state(&mut self, name: impl Into<String>) -> StateId {
        let container = self.graph.add_container(None);
        self.graph.add_node(StateNode::new(name, container))
    }

    /// Declare a state nested inside `parent`, on a container under
    /// the parent's container.
    pub fn child_state(&mut self, name: impl Into<String>, parent: StateId) -> StateId {
        let parent_container = self.graph.node(parent).map(|node| node.container);
        let container = self.graph.add_container(parent_container);
        let mut node = StateNode::new(name, container);
        node.parent = Some(parent);
        self.graph.add_node(node)
    }

    /// Declare a state sharing `sibling`'s container and parent, for
    /// states that live on the same object.
    pub fn shared_state(&mut self, name: impl Into<String>, sibling: StateId) -> StateId {
        let (container, parent) = match self.graph.node(sibling) {
            Some(node) => (node.container, node.parent),
            None => (self.graph.add_container(None), None),
        };
        let mut node = StateNode::new(name, container);
        node.parent = parent;
        self.graph.add_node(node)
    }

    /// Give `from` a self-describing timeout: transition to `to` once
    /// `duration` seconds have been spent in it.
    pub fn default_transition(&mut self, from: StateId, to: StateId, duration: f32) {
        self.defaults.push((from, to, duration));
    }

    /// Add a transition from its builder.
    /// Returns an error if the builder fails validation.
    pub fn transition(mut self, builder: TransitionBuilder) -> Result<Self, BuildError> {
        let (source, edge) = builder.build()?;
        self.edges.push((source, edge));
        Ok(self)
    }

    /// Add a pre-built transition edge out of `source`.
    pub fn add_edge(mut self, source: StateId, edge: TransitionEdge) -> Self {
        self.edges.push((source, edge));
        self
    }

    /// Set the state activated by [`Machine::start`].
    pub fn initial(mut self, state: StateId) -> Self {
        self.initial = Some(state);
        self
    }

    /// Build the machine, validating every state reference.
    pub fn build(mut self) -> Result<Machine, BuildError> {
        if let Some(initial) = self.initial {
            if !self.graph.contains(initial) {
                return Err(BuildError::UnknownInitialState(initial));
            }
        }

        for (source, edge) in &self.edges {
            if !self.graph.contains(*source) {
                return Err(BuildError::UnknownState(*source));
            }
            if !self.graph.contains(edge.target) {
                return Err(BuildError::UnknownState(edge.target));
            }
        }
        for (from, to, _) in &self.defaults {
            if !self.graph.contains(*from) {
                return Err(BuildError::UnknownState(*from));
            }
            if !self.graph.contains(*to) {
                return Err(BuildError::UnknownState(*to));
            }
        }

        for (source, edge) in self.edges {
            if let Some(node) = self.graph.node_mut(source) {
                node.edges.push(edge);
            }
        }
        for (from, to, duration) in self.defaults {
            if let Some(node) = self.graph.node_mut(from) {
                node.default_next = Some(to);
                node.default_duration = duration;
            }
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Machine::from_parts(
            self.graph,
            self.role,
            self.initial,
            self.fixed_delta,
            rng,
        ))
    }
}

impl Default for MachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fluent_api_builds_a_machine() {
        let mut builder = MachineBuilder::new();
        let a = builder.state("a");
        let b = builder.state("b");

        let machine = builder
            .transition(TransitionBuilder::new().from(a).to(b).when(|| false))
            .unwrap()
            .initial(a)
            .build();

        assert!(machine.is_ok());
        let machine = machine.unwrap();
        assert_eq!(machine.initial_state(), Some(a));
        assert_eq!(machine.current_state(), None);
    }

    #[test]
    fn initial_state_is_optional() {
        let mut builder = MachineBuilder::new();
        builder.state("only");
        assert!(builder.build().is_ok());
    }

    #[test]
    fn unknown_initial_state_is_rejected() {
        let mut builder = MachineBuilder::new();
        builder.state("a");

        let foreign = StateId::new();
        let result = builder.initial(foreign).build();
        assert_eq!(result.err(), Some(BuildError::UnknownInitialState(foreign)));
    }

    #[test]
    fn transitions_must_reference_declared_states() {
        let mut builder = MachineBuilder::new();
        let a = builder.state("a");

        let foreign = StateId::new();
        let result = builder
            .transition(TransitionBuilder::new().from(a).to(foreign))
            .unwrap()
            .build();

        assert_eq!(result.err(), Some(BuildError::UnknownState(foreign)));
    }

    #[test]
    fn default_transitions_must_reference_declared_states() {
        let mut builder = MachineBuilder::new();
        let a = builder.state("a");

        let foreign = StateId::new();
        builder.default_transition(a, foreign, 1.0);

        assert_eq!(
            builder.build().err(),
            Some(BuildError::UnknownState(foreign))
        );
    }

    #[test]
    fn child_states_nest_under_their_parent() {
        let mut builder = MachineBuilder::new();
        let parent = builder.state("parent");
        let child = builder.child_state("child", parent);

        let machine = builder.build().unwrap();
        assert_eq!(machine.graph().ancestors(child), vec![parent]);
        assert_eq!(
            machine.graph().node(parent).unwrap().children,
            vec![child]
        );
    }

    #[test]
    fn shared_states_reuse_the_sibling_container() {
        let mut builder = MachineBuilder::new();
        let a = builder.state("a");
        let b = builder.shared_state("b", a);

        let machine = builder.build().unwrap();
        let graph = machine.graph();
        assert_eq!(
            graph.node(a).unwrap().container,
            graph.node(b).unwrap().container
        );
    }

    #[test]
    fn edges_attach_in_declaration_order() {
        let mut builder = MachineBuilder::new();
        let a = builder.state("a");
        let b = builder.state("b");
        let c = builder.state("c");

        let machine = builder
            .transition(TransitionBuilder::new().from(a).to(b).when(|| false))
            .unwrap()
            .transition(TransitionBuilder::new().from(a).to(c).when(|| false))
            .unwrap()
            .build()
            .unwrap();

        let targets: Vec<StateId> = machine
            .graph()
            .node(a)
            .unwrap()
            .edges
            .iter()
            .map(|edge| edge.target)
            .collect();
        assert_eq!(targets, vec![b, c]);
    }
}
