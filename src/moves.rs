//! The layered move state machine.
//!
//! A [`Move`] is a small policy object: three predicates the manager polls and
//! four callbacks it runs. A [`MoveSet`] holds the moves of one character in
//! registration order and keeps at most one move active per [`MoveLayer`].
//!
//! Moves may change the body's [`MotionParams`](crate::state::MotionParams)
//! while active; the resolver reads them fresh every pass.

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::events::PhysicsObserver;
use crate::intent::ControlIntent;
use crate::state::CharacterBody;

/// Mutual-exclusion group of a move.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveLayer {
    /// Unconstrained; any number of these may be active.
    None,
    /// Basic locomotion.
    Control,
    /// Rolling and other shape changes.
    Roll,
    /// One-shot actions such as jumping.
    Action,
}

impl MoveLayer {
    /// Slot of an exclusive layer, `None` for the unconstrained layer.
    fn slot(self) -> Option<usize> {
        match self {
            MoveLayer::None => None,
            MoveLayer::Control => Some(0),
            MoveLayer::Roll => Some(1),
            MoveLayer::Action => Some(2),
        }
    }
}

/// Polling state of a registered move.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MoveState {
    /// Cannot be triggered right now.
    #[default]
    Unavailable,
    /// Could be triggered.
    Available,
    /// Running.
    Active,
}

/// Everything a move may read or change during a tick.
pub struct MoveContext<'a> {
    /// The character.
    pub body: &'a mut CharacterBody,
    /// Immutable tuning.
    pub config: &'a ControllerConfig,
    /// This tick's latched input.
    pub intent: &'a ControlIntent,
    /// Receives attach / detach notifications caused by moves.
    pub observer: &'a mut dyn PhysicsObserver,
    /// Length of this tick in reference ticks.
    pub scale: f32,
}

/// A character behaviour polled by a [`MoveSet`].
///
/// # Example
///
/// ```rust
/// use hedgehog_physics::prelude::*;
///
/// /// Look up while standing still.
/// struct LookUp;
///
/// impl Move for LookUp {
///     fn name(&self) -> &'static str {
///         "look_up"
///     }
///
///     fn layer(&self) -> MoveLayer {
///         MoveLayer::Action
///     }
///
///     fn should_perform(&self, ctx: &MoveContext) -> bool {
///         ctx.body.grounded && ctx.intent.up() && ctx.body.ground_velocity == 0.0
///     }
///
///     fn should_end(&self, ctx: &MoveContext) -> bool {
///         !ctx.intent.up() || ctx.body.ground_velocity != 0.0
///     }
/// }
///
/// let mut moves = MoveSet::new();
/// moves.register(LookUp);
/// ```
pub trait Move: Send + Sync + 'static {
    /// Stable identifier, used for lookups.
    fn name(&self) -> &'static str;

    /// Exclusion layer.
    fn layer(&self) -> MoveLayer;

    /// Whether the move could be triggered now.
    fn available(&self, _ctx: &MoveContext) -> bool {
        true
    }

    /// Whether an available move should start now.
    fn should_perform(&self, ctx: &MoveContext) -> bool;

    /// Whether an active move should stop now.
    fn should_end(&self, ctx: &MoveContext) -> bool;

    /// Called once when the move becomes active.
    fn on_active_enter(&mut self, _ctx: &mut MoveContext) {}

    /// Called every tick while active, before physics.
    fn on_active_update(&mut self, _ctx: &mut MoveContext) {}

    /// Called every fixed tick while active, before the stagger loop.
    fn on_active_fixed_update(&mut self, _ctx: &mut MoveContext) {}

    /// Called once when the move stops, for any reason.
    fn on_active_exit(&mut self, _ctx: &mut MoveContext) {}
}

struct MoveSlot {
    behaviour: Box<dyn Move>,
    state: MoveState,
}

/// The moves of one character.
#[derive(Component, Default)]
pub struct MoveSet {
    slots: Vec<MoveSlot>,
    active_by_layer: [Option<usize>; 3],
}

impl MoveSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The classic moveset: ground and air control, jump, roll, spindash.
    pub fn standard() -> Self {
        let mut moves = Self::new();
        moves.register(crate::abilities::GroundControl);
        moves.register(crate::abilities::AirControl);
        moves.register(crate::abilities::Jump);
        moves.register(crate::abilities::Roll);
        moves.register(crate::abilities::Spindash::default());
        moves
    }

    /// Add a move at the end of the polling order.
    pub fn register(&mut self, behaviour: impl Move) -> &mut Self {
        self.slots.push(MoveSlot {
            behaviour: Box::new(behaviour),
            state: MoveState::Unavailable,
        });
        self
    }

    /// Remove a move by name, ending it first if it is active.
    ///
    /// Returns whether a move was removed.
    pub fn remove(&mut self, name: &str, ctx: &mut MoveContext) -> bool {
        let Some(index) = self.index_of(name) else {
            return false;
        };
        if self.slots[index].state == MoveState::Active {
            self.end(index, ctx);
        }
        self.slots.remove(index);
        for active in self.active_by_layer.iter_mut().flatten() {
            if *active > index {
                *active -= 1;
            }
        }
        true
    }

    /// Number of registered moves.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no moves are registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.behaviour.name() == name)
    }

    /// Polling state of a move, if registered.
    pub fn state(&self, name: &str) -> Option<MoveState> {
        self.index_of(name).map(|i| self.slots[i].state)
    }

    /// Whether the named move is active.
    pub fn is_active(&self, name: &str) -> bool {
        self.state(name) == Some(MoveState::Active)
    }

    /// Name of the move active on `layer`, if any.
    pub fn active_on(&self, layer: MoveLayer) -> Option<&'static str> {
        let index = self.active_by_layer[layer.slot()?]?;
        Some(self.slots[index].behaviour.name())
    }

    /// Names of every active move, in registration order.
    pub fn active(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots
            .iter()
            .filter(|s| s.state == MoveState::Active)
            .map(|s| s.behaviour.name())
    }

    /// Poll every move once, then run the update callback of active moves.
    pub fn update(&mut self, ctx: &mut MoveContext) {
        for index in 0..self.slots.len() {
            if self.slots[index].state == MoveState::Active {
                if !self.slots[index].behaviour.should_end(ctx) {
                    continue;
                }
                self.end(index, ctx);
            }

            let slot = &mut self.slots[index];
            if !slot.behaviour.available(ctx) {
                slot.state = MoveState::Unavailable;
                continue;
            }
            slot.state = MoveState::Available;
            if slot.behaviour.should_perform(ctx) {
                self.activate(index, ctx);
            }
        }

        for slot in &mut self.slots {
            if slot.state == MoveState::Active {
                slot.behaviour.on_active_update(ctx);
            }
        }
    }

    /// Run the fixed-update callback of active moves.
    pub fn fixed_update(&mut self, ctx: &mut MoveContext) {
        for slot in &mut self.slots {
            if slot.state == MoveState::Active {
                slot.behaviour.on_active_fixed_update(ctx);
            }
        }
    }

    /// End every active move.
    pub fn end_all(&mut self, ctx: &mut MoveContext) {
        for index in 0..self.slots.len() {
            if self.slots[index].state == MoveState::Active {
                self.end(index, ctx);
            }
        }
    }

    fn activate(&mut self, index: usize, ctx: &mut MoveContext) {
        let layer = self.slots[index].behaviour.layer();
        if let Some(slot) = layer.slot() {
            if let Some(previous) = self.active_by_layer[slot] {
                self.end(previous, ctx);
            }
            self.active_by_layer[slot] = Some(index);
        }
        let slot = &mut self.slots[index];
        trace!("move {} active", slot.behaviour.name());
        slot.state = MoveState::Active;
        slot.behaviour.on_active_enter(ctx);
    }

    fn end(&mut self, index: usize, ctx: &mut MoveContext) {
        let slot = &mut self.slots[index];
        slot.state = MoveState::Available;
        if let Some(layer) = slot.behaviour.layer().slot() {
            if self.active_by_layer[layer] == Some(index) {
                self.active_by_layer[layer] = None;
            }
        }
        trace!("move {} ended", slot.behaviour.name());
        slot.behaviour.on_active_exit(ctx);
    }
}

impl std::fmt::Debug for MoveSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|s| (s.behaviour.name(), s.state)))
            .finish()
    }
}
