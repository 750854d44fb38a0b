//! The tick-driven state machine.

use super::error::RuntimeError;
use super::graph::StateGraph;
use crate::core::{EdgeId, EdgePhase, ObserverId, StateId, TransitionKind};
use crate::events::{EnterStateEvent, Event, EventRouter, LeaveStateEvent, UpdateStateEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::any::{Any, TypeId};
use std::collections::HashSet;
use tracing::{debug, error};

/// How many consecutive instant transitions a single tick may apply
/// before the runtime assumes a transition cycle that never settles.
pub const MAX_INSTANT_TRANSITIONS: usize = 16;

/// Whether this machine instance decides transitions or replays them.
///
/// Exactly one instance of a machine is the authority; it evaluates
/// conditions and timers and owns the current-state identity. Replicas
/// receive that identity as a fact and reproduce the same active path
/// without evaluating anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Authority,
    Replica,
}

#[derive(Clone, Copy)]
struct PendingTransition {
    target: StateId,
    due: f32,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CascadeMode {
    /// Full dispatch: observers, events, and transition evaluation.
    Authority,
    /// Observers and events fire so replicated cosmetic state stays
    /// consistent, but no condition or timer is ever evaluated.
    Replica,
}

#[derive(Clone, Copy)]
struct ImmediateCandidate {
    edge: EdgeId,
    target: StateId,
    priority: i32,
    weight: f32,
    delay: f32,
}

/// A hierarchical state machine over a [`StateGraph`].
///
/// One `tick()` on the authority updates the current state, resolves
/// at most a bounded chain of pending transitions, and applies the
/// enter/leave cascade atomically: by the time `tick()` returns, the
/// set of enabled states is exactly the current state plus its
/// ancestors.
///
/// # Example
///
/// ```
/// use cascade::{MachineBuilder, TransitionBuilder};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// let ready = Arc::new(AtomicBool::new(false));
/// let gate = ready.clone();
///
/// let mut builder = MachineBuilder::new().rng_seed(7);
/// let idle = builder.state("idle");
/// let busy = builder.state("busy");
///
/// let builder = builder
///     .transition(
///         TransitionBuilder::new()
///             .from(idle)
///             .to(busy)
///             .when(move || gate.load(Ordering::Relaxed)),
///     )
///     .unwrap();
///
/// let mut machine = builder.initial(idle).build().unwrap();
/// machine.start().unwrap();
/// assert_eq!(machine.current_state(), Some(idle));
///
/// ready.store(true, Ordering::Relaxed);
/// machine.tick().unwrap();
/// assert_eq!(machine.current_state(), Some(busy));
/// ```
pub struct Machine {
    graph: StateGraph,
    router: EventRouter,
    role: Role,
    current: Option<StateId>,
    pending: Option<PendingTransition>,
    initial: Option<StateId>,
    now: f32,
    fixed_delta: f32,
    rng: StdRng,
    sync_dirty: bool,
}

impl Machine {
    pub fn builder() -> crate::builder::MachineBuilder {
        crate::builder::MachineBuilder::new()
    }

    /// Create an authority machine over `graph` with a default tick
    /// rate of 60 per second and an entropy-seeded RNG.
    pub fn new(graph: StateGraph, role: Role) -> Self {
        Self::from_parts(graph, role, None, 1.0 / 60.0, StdRng::from_entropy())
    }

    pub(crate) fn from_parts(
        graph: StateGraph,
        role: Role,
        initial: Option<StateId>,
        fixed_delta: f32,
        rng: StdRng,
    ) -> Self {
        Self {
            graph,
            router: EventRouter::new(),
            role,
            current: None,
            pending: None,
            initial,
            now: 0.0,
            fixed_delta,
            rng,
            sync_dirty: false,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_authority(&self) -> bool {
        self.role == Role::Authority
    }

    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut StateGraph {
        &mut self.graph
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut EventRouter {
        &mut self.router
    }

    pub fn current_state(&self) -> Option<StateId> {
        self.current
    }

    pub fn initial_state(&self) -> Option<StateId> {
        self.initial
    }

    /// Set the state activated by [`Machine::start`]. Authority only.
    pub fn set_initial_state(&mut self, state: StateId) -> Result<(), RuntimeError> {
        self.require_authority()?;
        if !self.graph.contains(state) {
            return Err(RuntimeError::UnknownState(state));
        }
        self.initial = Some(state);
        Ok(())
    }

    /// Simulation-time seconds elapsed since construction.
    pub fn now(&self) -> f32 {
        self.now
    }

    /// Seconds spent in the given state, zero while it is inactive.
    pub fn time_in_state(&self, state: StateId) -> Option<f32> {
        self.graph.node(state).map(|node| node.time_in_state(self.now))
    }

    /// Ids of every currently enabled state.
    pub fn enabled_states(&self) -> HashSet<StateId> {
        self.graph
            .states()
            .into_iter()
            .filter(|id| {
                self.graph
                    .node(*id)
                    .map(|node| node.is_enabled())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Reset every state to disabled, then on the authority activate
    /// the initial state (applying any instant transitions it chains
    /// into). Replicas stay empty until a replicated change arrives.
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        let root = self.graph.root();
        for id in self.graph.states() {
            if let Some(node) = self.graph.node_mut(id) {
                node.enabled = false;
                node.chosen = None;
                node.reset_edges();
            }
        }
        for container in self.graph.containers() {
            if container != root {
                self.graph.set_container_enabled(container, false);
            }
        }
        self.current = None;
        self.pending = None;

        if self.role == Role::Authority {
            if let Some(initial) = self.initial {
                self.pending = Some(PendingTransition {
                    target: initial,
                    due: self.now,
                });
                self.run_transition_loop()?;
            }
        }
        Ok(())
    }

    /// Advance one fixed simulation step.
    ///
    /// On the authority: update the current state, then apply any due
    /// pending transition, following chains of instant transitions up
    /// to [`MAX_INSTANT_TRANSITIONS`]. Replicas only advance their
    /// clock; they never evaluate conditions or timers.
    pub fn tick(&mut self) -> Result<(), RuntimeError> {
        self.now += self.fixed_delta;

        if self.role == Role::Replica {
            return Ok(());
        }

        let Some(current) = self.current else {
            return Ok(());
        };

        self.node_update(current);
        self.run_transition_loop()
    }

    /// Queue a transition to `target`, applied once `delay_seconds`
    /// of simulation time have elapsed (at the end of the current
    /// tick's resolution when zero). Authority only.
    pub fn request_transition(
        &mut self,
        target: StateId,
        delay_seconds: f32,
    ) -> Result<(), RuntimeError> {
        self.require_authority()?;
        if !self.graph.contains(target) {
            return Err(RuntimeError::UnknownState(target));
        }
        self.pending = Some(PendingTransition {
            target,
            due: self.now + delay_seconds.max(0.0),
        });
        Ok(())
    }

    /// Drop any pending transition that has not begun applying.
    /// Authority only.
    ///
    /// The current node's recorded edge choice is dropped with it, so
    /// the cancelled edge's action never runs on a later exit. The
    /// edge's phase stays `Fired` for this activation; otherwise the
    /// next evaluation would re-arm it and stomp whatever the caller
    /// requests next.
    pub fn clear_transition(&mut self) -> Result<(), RuntimeError> {
        self.require_authority()?;
        self.pending = None;
        if let Some(node) = self.current.and_then(|id| self.graph.node_mut(id)) {
            node.chosen = None;
        }
        Ok(())
    }

    /// Apply a replicated current-state change on a replica.
    ///
    /// The transition choice arrives as a fact: the cascade replays
    /// with observers and events, but nothing is recomputed.
    pub fn sync_current_state(&mut self, target: StateId) -> Result<(), RuntimeError> {
        if self.role != Role::Replica {
            return Err(RuntimeError::NotReplica);
        }
        if !self.graph.contains(target) {
            return Err(RuntimeError::UnknownState(target));
        }
        if self.current == Some(target) {
            return Ok(());
        }
        self.current = Some(target);
        self.apply_cascade(target, CascadeMode::Replica);
        Ok(())
    }

    /// The current-state change to replicate, if one happened since
    /// the last call. This is what a transport ships to replicas.
    pub fn drain_sync(&mut self) -> Option<StateId> {
        if self.sync_dirty {
            self.sync_dirty = false;
            self.current
        } else {
            None
        }
    }

    /// Raise an event: dispatch it through the router to the whole
    /// machine scope, then (authority only) resolve any event-triggered
    /// transition out of the current state.
    pub fn raise_event<E: Event>(&mut self, event: &E) {
        let scope = self.graph.root();
        self.router.dispatch(&self.graph, scope, event);

        if self.role == Role::Authority {
            self.resolve_event_transition(event);
        }
    }

    /// Subscribe to a state's enter notifications.
    pub fn on_enter<F>(&mut self, state: StateId, observer: F) -> Result<ObserverId, RuntimeError>
    where
        F: Fn(StateId) + Send + Sync + 'static,
    {
        let node = self
            .graph
            .node_mut(state)
            .ok_or(RuntimeError::UnknownState(state))?;
        Ok(node.on_enter.add(observer))
    }

    /// Subscribe to a state's per-tick update notifications.
    pub fn on_update<F>(&mut self, state: StateId, observer: F) -> Result<ObserverId, RuntimeError>
    where
        F: Fn(StateId) + Send + Sync + 'static,
    {
        let node = self
            .graph
            .node_mut(state)
            .ok_or(RuntimeError::UnknownState(state))?;
        Ok(node.on_update.add(observer))
    }

    /// Subscribe to a state's leave notifications.
    pub fn on_leave<F>(&mut self, state: StateId, observer: F) -> Result<ObserverId, RuntimeError>
    where
        F: Fn(StateId) + Send + Sync + 'static,
    {
        let node = self
            .graph
            .node_mut(state)
            .ok_or(RuntimeError::UnknownState(state))?;
        Ok(node.on_leave.add(observer))
    }

    /// Remove an observer from any of a state's notification lists.
    pub fn remove_observer(
        &mut self,
        state: StateId,
        observer: ObserverId,
    ) -> Result<bool, RuntimeError> {
        let node = self
            .graph
            .node_mut(state)
            .ok_or(RuntimeError::UnknownState(state))?;
        Ok(node.on_enter.remove(observer)
            || node.on_update.remove(observer)
            || node.on_leave.remove(observer))
    }

    /// Produce a replica of this machine: same graph and handler
    /// registrations (closures are shared through `Arc`), reset to the
    /// inactive starting point.
    pub fn replicate(&self) -> Machine {
        let mut replica = Machine {
            graph: self.graph.clone(),
            router: self.router.clone(),
            role: Role::Replica,
            current: None,
            pending: None,
            initial: self.initial,
            now: 0.0,
            fixed_delta: self.fixed_delta,
            rng: StdRng::seed_from_u64(0),
            sync_dirty: false,
        };
        let root = replica.graph.root();
        for id in replica.graph.states() {
            if let Some(node) = replica.graph.node_mut(id) {
                node.enabled = false;
                node.chosen = None;
                node.reset_edges();
            }
        }
        for container in replica.graph.containers() {
            if container != root {
                replica.graph.set_container_enabled(container, false);
            }
        }
        replica
    }

    fn require_authority(&self) -> Result<(), RuntimeError> {
        if self.role == Role::Authority {
            Ok(())
        } else {
            Err(RuntimeError::NotAuthority)
        }
    }

    /// Apply pending transitions until none are due, bounded by the
    /// instant-transition guard.
    fn run_transition_loop(&mut self) -> Result<(), RuntimeError> {
        let mut transitions = 0usize;

        loop {
            let target = match &self.pending {
                Some(pending) if self.now >= pending.due => pending.target,
                _ => return Ok(()),
            };

            transitions += 1;
            if transitions > MAX_INSTANT_TRANSITIONS {
                error!(
                    %target,
                    limit = MAX_INSTANT_TRANSITIONS,
                    "instant transition limit exceeded, holding current state"
                );
                self.pending = None;
                return Err(RuntimeError::InstantTransitionLimit);
            }

            self.pending = None;

            // A target destroyed while the transition was pending is
            // dropped silently.
            if !self.graph.contains(target) {
                return Ok(());
            }

            debug!(%target, "applying transition");
            self.current = Some(target);
            self.sync_dirty = true;
            self.apply_cascade(target, CascadeMode::Authority);
        }
    }

    /// Leave every enabled state not on the new active path (deepest
    /// first), then enter the new path's missing states (shallowest
    /// first). A container is only disabled once no leaving or
    /// entering state still shares it.
    fn apply_cascade(&mut self, target: StateId, mode: CascadeMode) {
        let new_path = self.graph.active_path(target);
        let new_set: HashSet<StateId> = new_path.iter().copied().collect();

        let mut to_leave: Vec<StateId> = self
            .graph
            .states()
            .into_iter()
            .filter(|id| {
                !new_set.contains(id)
                    && self
                        .graph
                        .node(*id)
                        .map(|node| node.is_enabled())
                        .unwrap_or(false)
            })
            .collect();
        to_leave.sort_by_key(|id| std::cmp::Reverse(self.graph.depth(*id)));

        let to_enter: Vec<StateId> = new_path
            .into_iter()
            .filter(|id| {
                !self
                    .graph
                    .node(*id)
                    .map(|node| node.is_enabled())
                    .unwrap_or(true)
            })
            .collect();

        let root = self.graph.root();

        for index in 0..to_leave.len() {
            let leaving = to_leave[index];
            self.node_leave(leaving, mode);

            let Some(container) = self.graph.node(leaving).map(|node| node.container) else {
                continue;
            };
            let still_needed = to_leave[index + 1..]
                .iter()
                .chain(to_enter.iter())
                .any(|other| {
                    self.graph
                        .node(*other)
                        .map(|node| node.container == container)
                        .unwrap_or(false)
                });
            if !still_needed && container != root {
                self.graph.set_container_enabled(container, false);
            }
        }

        for entering in to_enter {
            if let Some(container) = self.graph.node(entering).map(|node| node.container) {
                self.graph.set_container_enabled(container, true);
            }
            self.node_enter(entering, mode);
        }
    }

    fn node_enter(&mut self, id: StateId, mode: CascadeMode) {
        let (container, observers) = {
            let Some(node) = self.graph.node_mut(id) else {
                return;
            };
            node.enabled = true;
            node.entered_at = self.now;
            node.chosen = None;
            node.reset_edges();
            (node.container, node.on_enter.handlers())
        };

        for observer in observers {
            observer(id);
        }
        self.router
            .dispatch(&self.graph, container, &EnterStateEvent { state: id });

        if mode == CascadeMode::Authority {
            // Only the cascade's target arms its default timeout; an
            // ancestor's default would otherwise override the leaf's.
            if self.current == Some(id) {
                self.queue_default_transition(id);
            }
            // Evaluate immediately so zero-duration and always-true
            // transitions resolve within the same logical step.
            self.evaluate_transitions(id);
        }
    }

    fn node_update(&mut self, id: StateId) {
        let observers = {
            let Some(node) = self.graph.node(id) else {
                return;
            };
            node.on_update.handlers()
        };

        for observer in observers {
            observer(id);
        }
        let scope = self.graph.root();
        self.router
            .dispatch(&self.graph, scope, &UpdateStateEvent { state: id });

        self.evaluate_transitions(id);
    }

    fn node_leave(&mut self, id: StateId, mode: CascadeMode) {
        let (container, observers, action) = {
            let Some(node) = self.graph.node(id) else {
                return;
            };
            let action = node
                .chosen
                .and_then(|edge_id| node.edge(edge_id))
                .and_then(|edge| edge.action.clone());
            (node.container, node.on_leave.handlers(), action)
        };

        for observer in observers {
            observer(id);
        }
        self.router
            .dispatch(&self.graph, container, &LeaveStateEvent { state: id });

        // The exit action is part of the authoritative transition
        // decision; replicas replay the state change only.
        if mode == CascadeMode::Authority {
            if let Some(action) = action {
                action();
            }
        }

        // Disable last so leave observers saw the state enabled.
        if let Some(node) = self.graph.node_mut(id) {
            node.enabled = false;
            node.chosen = None;
        }
    }

    fn queue_default_transition(&mut self, id: StateId) {
        let Some(node) = self.graph.node(id) else {
            return;
        };
        let Some(next) = node.default_next else {
            return;
        };
        let due = self.now + node.default_duration.max(0.0);
        self.pending = Some(PendingTransition {
            target: next,
            due,
        });
    }

    /// Gather the state's live immediate edges, find the highest
    /// priority tier with a satisfied edge, and pick within the tier
    /// by weighted random draw. The selected edge is recorded as the
    /// node's pending choice.
    fn evaluate_transitions(&mut self, id: StateId) {
        let candidates: Vec<ImmediateCandidate> = {
            let Some(node) = self.graph.node(id) else {
                return;
            };
            if !node.is_enabled() {
                return;
            }

            let mut candidates = Vec::new();

            for edge in &node.edges {
                if edge.phase() == EdgePhase::Fired {
                    continue;
                }
                let TransitionKind::Immediate {
                    priority, weight, ..
                } = &edge.kind
                else {
                    continue;
                };
                let (priority, weight) = (*priority, *weight);
                // An edge whose target was destroyed is dead, not an
                // error.
                if !self.graph.contains(edge.target) {
                    continue;
                }
                if !edge.is_satisfied() {
                    continue;
                }
                candidates.push(ImmediateCandidate {
                    edge: edge.id,
                    target: edge.target,
                    priority,
                    weight,
                    delay: edge.delay,
                });
            }

            candidates
        };

        if let Some(node) = self.graph.node_mut(id) {
            for candidate in &candidates {
                node.set_phase(candidate.edge, EdgePhase::Eligible);
            }
        }

        // The winning tier is the highest priority with any satisfied
        // edge; a tier whose weights sum to zero yields no transition
        // rather than ceding to a lower tier.
        let Some(top_priority) = candidates.iter().map(|c| c.priority).max() else {
            return;
        };
        let tier: Vec<ImmediateCandidate> = candidates
            .into_iter()
            .filter(|c| c.priority == top_priority)
            .collect();

        let weights: Vec<f32> = tier.iter().map(|c| c.weight).collect();
        let Some(winner) = weighted_pick(&mut self.rng, &weights) else {
            return;
        };
        let chosen = tier[winner];

        if let Some(node) = self.graph.node_mut(id) {
            node.chosen = Some(chosen.edge);
            node.set_phase(chosen.edge, EdgePhase::Fired);
        }
        self.pending = Some(PendingTransition {
            target: chosen.target,
            due: self.now + chosen.delay,
        });
    }

    /// Authority-only resolution of event-triggered edges: the first
    /// declared live edge matching the event type and accepting the
    /// payload wins.
    fn resolve_event_transition<E: Event>(&mut self, event: &E) {
        let Some(current) = self.current else {
            return;
        };
        let payload: &dyn Any = event;

        let selected = {
            let Some(node) = self.graph.node(current) else {
                return;
            };
            node.edges
                .iter()
                .filter(|edge| edge.phase() != EdgePhase::Fired)
                .filter(|edge| self.graph.contains(edge.target))
                .find(|edge| edge.matches_event(TypeId::of::<E>(), payload))
                .map(|edge| (edge.id, edge.target, edge.delay))
        };

        let Some((edge_id, target, delay)) = selected else {
            return;
        };

        if let Some(node) = self.graph.node_mut(current) {
            node.chosen = Some(edge_id);
            node.set_phase(edge_id, EdgePhase::Fired);
        }
        self.pending = Some(PendingTransition {
            target,
            due: self.now + delay,
        });
    }
}

/// Weighted random selection: draw uniformly in `[0, total)` and
/// subtract weights in declaration order; the entry that drives the
/// remainder to or below zero wins. Entries with non-positive weight
/// never win; a non-positive total yields no winner.
fn weighted_pick<R: Rng>(rng: &mut R, weights: &[f32]) -> Option<usize> {
    let total: f32 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 {
        return None;
    }

    let mut remainder = rng.gen_range(0.0..total);
    for (index, weight) in weights.iter().enumerate() {
        if *weight <= 0.0 {
            continue;
        }
        remainder -= weight;
        if remainder <= 0.0 {
            return Some(index);
        }
    }

    // Floating point spill: land on the last positive weight.
    weights.iter().rposition(|w| *w > 0.0)
}
