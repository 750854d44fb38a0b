//! Builder for constructing transition edges.

use super::error::BuildError;
use crate::core::{
    Condition, EdgeAction, EventCondition, StateId, TransitionEdge, TransitionKind,
};
use crate::events::Event;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Builder for constructing transitions with a fluent API.
///
/// A transition is immediate by default; calling [`Self::on_event`] or
/// [`Self::on_event_when`] turns it into an event-triggered edge.
pub struct TransitionBuilder {
    from: Option<StateId>,
    to: Option<StateId>,
    condition: Option<Condition>,
    priority: i32,
    weight: f32,
    delay: f32,
    action: Option<EdgeAction>,
    event: Option<(TypeId, Option<EventCondition>)>,
}

impl TransitionBuilder {
    pub fn new() -> Self {
        Self {
            from: None,
            to: None,
            condition: None,
            priority: 0,
            weight: 1.0,
            delay: 0.0,
            action: None,
            event: None,
        }
    }

    /// Set the source state (required).
    pub fn from(mut self, state: StateId) -> Self {
        self.from = Some(state);
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: StateId) -> Self {
        self.to = Some(state);
        self
    }

    /// Gate an immediate transition on a predicate. Without one the
    /// edge is always satisfied while its source is active.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Priority tier for immediate edges; higher tiers are considered
    /// first. Defaults to zero.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Relative chance of this edge winning against other satisfied
    /// edges in the same priority tier. Defaults to one; edges with a
    /// non-positive weight never win.
    pub fn weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Seconds between this edge being chosen and the transition being
    /// applied. Defaults to zero (end of the current tick).
    pub fn delay(mut self, seconds: f32) -> Self {
        self.delay = seconds;
        self
    }

    /// Side effect run while the source state leaves, if this edge
    /// caused the exit.
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Fire on any observed event of type `E`.
    pub fn on_event<E: Event>(mut self) -> Self {
        self.event = Some((TypeId::of::<E>(), None));
        self
    }

    /// Fire on observed events of type `E` accepted by the predicate.
    pub fn on_event_when<E, F>(mut self, condition: F) -> Self
    where
        E: Event,
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let erased: EventCondition = Arc::new(move |payload: &dyn Any| {
            payload
                .downcast_ref::<E>()
                .map(&condition)
                .unwrap_or(false)
        });
        self.event = Some((TypeId::of::<E>(), Some(erased)));
        self
    }

    /// Build the edge, returning it with its source state.
    pub fn build(self) -> Result<(StateId, TransitionEdge), BuildError> {
        let from = self.from.ok_or(BuildError::MissingSource)?;
        let to = self.to.ok_or(BuildError::MissingTarget)?;

        let kind = match self.event {
            Some((event, event_condition)) => {
                if self.condition.is_some() {
                    return Err(BuildError::ConflictingKinds);
                }
                TransitionKind::EventTriggered {
                    event,
                    condition: event_condition,
                }
            }
            None => TransitionKind::Immediate {
                condition: self.condition,
                priority: self.priority,
                weight: self.weight,
            },
        };

        let mut edge = TransitionEdge::new(to, kind);
        edge.delay = self.delay;
        edge.action = self.action;

        Ok((from, edge))
    }
}

impl Default for TransitionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    impl Event for Ping {}

    #[test]
    fn builder_validates_missing_source() {
        let result = TransitionBuilder::new().to(StateId::new()).build();
        assert!(matches!(result, Err(BuildError::MissingSource)));
    }

    #[test]
    fn builder_validates_missing_target() {
        let result = TransitionBuilder::new().from(StateId::new()).build();
        assert!(matches!(result, Err(BuildError::MissingTarget)));
    }

    #[test]
    fn immediate_edge_carries_priority_and_weight() {
        let (_, edge) = TransitionBuilder::new()
            .from(StateId::new())
            .to(StateId::new())
            .priority(3)
            .weight(2.5)
            .delay(1.0)
            .build()
            .unwrap();

        assert_eq!(edge.delay, 1.0);
        match edge.kind {
            TransitionKind::Immediate {
                priority, weight, ..
            } => {
                assert_eq!(priority, 3);
                assert_eq!(weight, 2.5);
            }
            TransitionKind::EventTriggered { .. } => panic!("expected an immediate edge"),
        }
    }

    #[test]
    fn event_edge_matches_its_payload_type() {
        let (_, edge) = TransitionBuilder::new()
            .from(StateId::new())
            .to(StateId::new())
            .on_event::<Ping>()
            .build()
            .unwrap();

        let ping = Ping;
        assert!(edge.matches_event(TypeId::of::<Ping>(), &ping));
    }

    #[test]
    fn mixing_condition_kinds_is_rejected() {
        let result = TransitionBuilder::new()
            .from(StateId::new())
            .to(StateId::new())
            .when(|| true)
            .on_event::<Ping>()
            .build();

        assert!(matches!(result, Err(BuildError::ConflictingKinds)));
    }

    #[test]
    fn typed_event_condition_filters_payloads() {
        #[derive(Clone, Copy)]
        struct Hit {
            damage: u32,
        }
        impl Event for Hit {}

        let (_, edge) = TransitionBuilder::new()
            .from(StateId::new())
            .to(StateId::new())
            .on_event_when(|hit: &Hit| hit.damage > 50)
            .build()
            .unwrap();

        assert!(edge.matches_event(TypeId::of::<Hit>(), &Hit { damage: 80 }));
        assert!(!edge.matches_event(TypeId::of::<Hit>(), &Hit { damage: 10 }));
    }
}
