//! Ordered, scoped event dispatch.

use super::registry::{constraints_for, HandlerRegistry, OrderingRule};
use super::Event;
use crate::core::ContainerId;
use crate::ordering::solve;
use crate::runtime::StateGraph;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};

type ErasedHandler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

#[derive(Clone)]
struct Participant {
    type_name: String,
    container: ContainerId,
    handler: Option<ErasedHandler>,
}

/// Collects handler participants per event type and dispatches to them
/// in constraint-solved order.
///
/// The solved order is memoized per event type and invalidated when the
/// participant set or the ordering registry changes, so the solver runs
/// once per distinct payload type rather than once per dispatch. On an
/// ordering conflict the router logs an error naming the two handler
/// types involved and falls back to registration order; dispatch never
/// fails outright.
#[derive(Clone, Default)]
pub struct EventRouter {
    registry: HandlerRegistry,
    participants: HashMap<TypeId, Vec<Participant>>,
    rank_cache: HashMap<TypeId, HashMap<String, usize>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Declare ordering rules for a handler type.
    ///
    /// Replaces any previous rules for that type and invalidates every
    /// memoized order, since a type may handle several event types.
    pub fn declare_ordering(&mut self, type_name: impl Into<String>, rules: Vec<OrderingRule>) {
        self.registry.declare(type_name, rules);
        self.invalidate_all();
    }

    /// Subscribe a handler for events of type `E`.
    ///
    /// `type_name` identifies the implementing type for ordering
    /// purposes; `container` scopes which dispatches reach it.
    pub fn subscribe<E, F>(
        &mut self,
        type_name: impl Into<String>,
        container: ContainerId,
        handler: F,
    ) where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let erased: ErasedHandler = Arc::new(move |payload: &dyn Any| {
            if let Some(event) = payload.downcast_ref::<E>() {
                handler(event);
            }
        });
        self.insert::<E>(Participant {
            type_name: type_name.into(),
            container,
            handler: Some(erased),
        });
    }

    /// Register a participant that declares the handler capability for
    /// `E` without supplying an implementation.
    ///
    /// Such participants take part in nothing: dispatch skips them with
    /// a logged warning. This models a discovered implementing type
    /// whose handler method could not be resolved.
    pub fn subscribe_marker<E: Event>(
        &mut self,
        type_name: impl Into<String>,
        container: ContainerId,
    ) {
        self.insert::<E>(Participant {
            type_name: type_name.into(),
            container,
            handler: None,
        });
    }

    /// Remove every participant of the named type for events of `E`.
    pub fn unsubscribe<E: Event>(&mut self, type_name: &str) -> bool {
        let key = TypeId::of::<E>();
        let mut removed = false;
        if let Some(list) = self.participants.get_mut(&key) {
            let before = list.len();
            list.retain(|participant| participant.type_name != type_name);
            removed = list.len() != before;
        }
        if removed {
            self.invalidate::<E>();
        }
        removed
    }

    /// Drop the memoized order for events of type `E`.
    pub fn invalidate<E: Event>(&mut self) {
        self.rank_cache.remove(&TypeId::of::<E>());
    }

    /// Drop every memoized order.
    pub fn invalidate_all(&mut self) {
        self.rank_cache.clear();
    }

    /// Dispatch `event` to every participant within the `scope`
    /// container subtree, synchronously and in solved order.
    pub fn dispatch<E: Event>(&mut self, graph: &StateGraph, scope: ContainerId, event: &E) {
        let key = TypeId::of::<E>();
        let Some(participants) = self.participants.get(&key) else {
            return;
        };
        if participants.is_empty() {
            return;
        }

        let ranks = self.rank_cache.entry(key).or_insert_with(|| {
            solve_ranks(&self.registry, participants, std::any::type_name::<E>())
        });

        let mut order: Vec<usize> = (0..participants.len()).collect();
        order.sort_by_key(|&index| {
            ranks
                .get(&participants[index].type_name)
                .copied()
                .unwrap_or(usize::MAX)
        });

        let payload: &dyn Any = event;

        for index in order {
            let participant = &participants[index];
            if !graph.container_in_scope(scope, participant.container) {
                continue;
            }
            match &participant.handler {
                Some(handler) => handler(payload),
                None => warn!(
                    handler = %participant.type_name,
                    event = std::any::type_name::<E>(),
                    "handler capability declared without an implementation, skipping"
                ),
            }
        }
    }

    fn insert<E: Event>(&mut self, participant: Participant) {
        self.participants
            .entry(TypeId::of::<E>())
            .or_default()
            .push(participant);
        self.invalidate::<E>();
    }
}

/// Solve the dispatch order for one event type, returning a rank per
/// implementing type name. Falls back to registration order when the
/// constraints conflict.
fn solve_ranks(
    registry: &HandlerRegistry,
    participants: &[Participant],
    event_name: &str,
) -> HashMap<String, usize> {
    let mut types: Vec<String> = Vec::new();
    for participant in participants {
        if !types.contains(&participant.type_name) {
            types.push(participant.type_name.clone());
        }
    }

    let constraints = constraints_for(&types, registry);

    match solve(types.len(), &constraints) {
        Ok(order) => order
            .iter()
            .enumerate()
            .map(|(rank, &index)| (types[index].clone(), rank))
            .collect(),
        Err(conflict) => {
            error!(
                earlier = %types[conflict.earlier],
                later = %types[conflict.later],
                event = event_name,
                "conflicting ordering constraints, falling back to registration order"
            );
            types
                .into_iter()
                .enumerate()
                .map(|(index, name)| (name, index))
                .collect()
        }
    }
}
