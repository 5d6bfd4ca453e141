//! Unit training against the composition goal.

use rts_world::{Capabilities, EntityKind, UnitCategory, UnitDef, Vec2};

use crate::composition::{most_underrepresented, CompositionGoal, RoleCounts};
use crate::context::TickContext;
use crate::duties::{Duty, DutyMap};
use crate::error::AiError;
use crate::roles::Role;

/// Units queued at once before training waits.
const MAX_UNIT_QUEUE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainOutcome {
    Queued { unit: String, role: Option<Role> },
    Purchased { unit: String, role: Role },
    Idle,
}

/// Role counts over the fighting force, defenders included: scouts,
/// specials, harvesters and support units don't count.
pub fn army_role_counts(ctx: &TickContext<'_>, duties: &DutyMap) -> RoleCounts {
    ctx.census
        .own_units
        .iter()
        .filter(|u| !duties.is(u.id, Duty::Scout) && !duties.is(u.id, Duty::Special))
        .filter(|u| !u.caps.intersects(Capabilities::HARVESTER | Capabilities::SUPPORT))
        .filter_map(|u| ctx.type_name(u))
        .filter_map(|name| ctx.roster.role_of(name))
        .collect()
}

/// Trains (or buys) one unit of the most under-represented role, falling
/// back to a cost-based infantry/vehicle pick when that role can't be made.
pub fn train_next(
    ctx: &mut TickContext<'_>,
    goal: &CompositionGoal,
    duties: &DutyMap,
    rally: Vec2,
) -> Result<TrainOutcome, AiError> {
    let slot = ctx.slot();
    if ctx.services.queue_len(slot, false) >= MAX_UNIT_QUEUE {
        return Ok(TrainOutcome::Idle);
    }
    let (roster, rules, config) = (ctx.roster, ctx.rules, ctx.config);
    let counts = army_role_counts(ctx, duties);
    let wanted = most_underrepresented(goal, &counts);

    if let Some(role) = wanted {
        if config.composition.use_market {
            if let Some(unit) = buy_from_market(ctx, role)? {
                return Ok(TrainOutcome::Purchased { unit, role });
            }
        }

        // Strongest affordable unit of the role.
        let mut options: Vec<&UnitDef> = roster
            .units_with_role(role)
            .filter_map(|name| rules.unit(name))
            .filter(|u| !u.non_combat)
            .filter(|u| affordable(ctx, u))
            .collect();
        options.sort_by(|a, b| b.cost.total_cmp(&a.cost).then(a.name.cmp(&b.name)));
        for unit in options {
            if ctx.services.produce(slot, &unit.name, EntityKind::Unit, rally)? {
                tracing::debug!("{}: training {} for {}", slot, unit.name, role);
                return Ok(TrainOutcome::Queued {
                    unit: unit.name.clone(),
                    role: Some(role),
                });
            }
        }
    }

    let balance = ctx.services.balance(slot).unwrap_or(f64::INFINITY);
    let category = if balance >= config.composition.vehicle_min_balance {
        UnitCategory::Vehicle
    } else {
        UnitCategory::Infantry
    };
    let mut fallback: Vec<&UnitDef> = roster
        .pools()
        .get(category)
        .iter()
        .filter_map(|name| rules.unit(name))
        .filter(|u| !u.non_combat && roster.role_of(&u.name) != Some(Role::Scout))
        .filter(|u| affordable(ctx, u))
        .collect();
    fallback.sort_by(|a, b| a.cost.total_cmp(&b.cost).then(a.name.cmp(&b.name)));
    for unit in fallback {
        if ctx.services.produce(slot, &unit.name, EntityKind::Unit, rally)? {
            return Ok(TrainOutcome::Queued {
                unit: unit.name.clone(),
                role: roster.role_of(&unit.name),
            });
        }
    }
    Ok(TrainOutcome::Idle)
}

fn affordable(ctx: &TickContext<'_>, unit: &UnitDef) -> bool {
    let price = (unit.cost * ctx.services.cost_multiplier(ctx.slot())) as f64;
    ctx.services.can_afford(ctx.slot(), price)
        && ctx.services.can_build(ctx.slot(), &unit.name, false)
}

/// Buys a market offer for `role` priced at or below its catalog cost.
fn buy_from_market(ctx: &mut TickContext<'_>, role: Role) -> Result<Option<String>, AiError> {
    let Some(production) = ctx.services.production.clone() else {
        return Ok(None);
    };
    let slot = ctx.slot();
    let (roster, rules) = (ctx.roster, ctx.rules);
    let offers = match production.try_borrow() {
        Ok(p) => p.market_offers(slot),
        Err(_) => return Err(AiError::Busy("production authority")),
    };
    let bargain = offers.into_iter().find(|offer| {
        roster.role_of(&offer.type_name) == Some(role)
            && rules
                .unit(&offer.type_name)
                .is_some_and(|u| offer.price <= u.cost)
            && ctx.services.can_afford(slot, offer.price as f64)
    });
    let Some(offer) = bargain else {
        return Ok(None);
    };
    let bought = production
        .try_borrow_mut()
        .map_err(|_| AiError::Busy("production authority"))?
        .purchase_offer(slot, &offer.type_name);
    if bought {
        tracing::info!("{}: bought {} at market for {:.0}", slot, offer.type_name, offer.price);
        Ok(Some(offer.type_name))
    } else {
        Ok(None)
    }
}
