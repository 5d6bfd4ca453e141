//! Contracts for the simulation systems an AI controller talks to.
//!
//! Production, the resource ledger and combat are owned by the simulation
//! and shared between every controller in the match, so controllers hold
//! them as [`Shared`] handles (`Rc<RefCell<_>>`): everything runs on one
//! thread inside a single tick.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use crate::entity::{EntityId, EntityKind, PlayerSlot};
use crate::geometry::Vec2;

/// Shared, single-threaded handle to a simulation system.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wraps a value into a [`Shared`] handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// A unit on offer at the starport market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOffer {
    pub type_name: String,
    pub price: f32,
}

/// Gatekeeper for everything that gets built or trained.
pub trait ProductionAuthority {
    /// Whether `owner` currently satisfies the prerequisites for `type_name`.
    fn can_build(&self, owner: PlayerSlot, type_name: &str, is_building: bool) -> bool;

    /// Queues production. Buildings are placed at `site`; units appear at a
    /// production building. Returns false when the request is refused.
    fn start_production(
        &mut self,
        owner: PlayerSlot,
        type_name: &str,
        is_building: bool,
        site: Option<Vec2>,
    ) -> bool;

    /// Items currently queued for `owner` on the building or unit queue.
    fn queue_len(&self, owner: PlayerSlot, is_building: bool) -> usize;

    /// Number of completed buildings of `type_name` owned by `owner`.
    fn owned_count(&self, owner: PlayerSlot, type_name: &str) -> usize;

    fn can_upgrade(&self, _owner: PlayerSlot, _building_type: &str) -> bool {
        false
    }

    fn start_upgrade(&mut self, _owner: PlayerSlot, _building_type: &str) -> bool {
        false
    }

    /// Multiplier applied to catalog prices for `owner`.
    fn cost_multiplier(&self, _owner: PlayerSlot) -> f32 {
        1.0
    }

    /// Generated power divided by consumed power; below 1.0 production slows.
    fn power_ratio(&self, _owner: PlayerSlot) -> f32 {
        1.0
    }

    fn market_offers(&self, _owner: PlayerSlot) -> Vec<MarketOffer> {
        Vec::new()
    }

    fn purchase_offer(&mut self, _owner: PlayerSlot, _type_name: &str) -> bool {
        false
    }
}

/// Per-player credits.
pub trait ResourceLedger {
    fn balance(&self, owner: PlayerSlot) -> f64;

    /// Deducts `amount` if affordable. Returns false and leaves the balance
    /// untouched otherwise.
    fn spend(&mut self, owner: PlayerSlot, amount: f64) -> bool;

    fn credit(&mut self, owner: PlayerSlot, amount: f64);
}

/// Attack-move tagging: tagged units engage anything hostile on their way.
pub trait CombatAuthority {
    fn tag_for_attack_move(&mut self, ids: &[EntityId]);
    fn clear_attack_move(&mut self, ids: &[EntityId]);
}

/// Direct spawn request, used when no production authority is wired in.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub owner: PlayerSlot,
    pub type_name: String,
    pub kind: EntityKind,
    pub position: Vec2,
}

/// Callback that materializes a [`SpawnRequest`].
pub type SpawnCallback = Box<dyn FnMut(SpawnRequest) -> Option<EntityId>>;

/// Notification that a building was destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingDestroyed {
    pub owner: PlayerSlot,
    pub position: Vec2,
}
