//! Board-space targeting: pattern projection and tile targetability.
//!
//! The battlefield is two opposing `height x width` half-grids. Row 0 of
//! each half is the frontier row; rows grow toward that side's rear. All
//! functions here are pure reads over [`BattleState`] occupancy.

use crate::ability::{AttackProfile, LineOfFire, LineOfFireModifier, Pattern, PatternAnchor};
use crate::config::BattleConfig;
use crate::state::{BattleState, CombatantId, Side, StateFlags, TileCoord};

/// One legal tile-selection target, with its presentation warning flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileTarget {
    pub tile: TileCoord,
    /// The occupant's terrain is outside the attack's targetable terrains;
    /// the tile stays selectable but presentation should warn.
    pub terrain_warning: bool,
}

/// Projects a weighted pattern onto the board around an anchor cell and
/// collects `(occupant, weight)` pairs for every occupied, in-bounds,
/// non-zero-weight cell. A pattern that reaches nobody yields an empty
/// list, never an error.
pub fn evaluate_attack_pattern(
    state: &BattleState,
    config: &BattleConfig,
    pattern: &Pattern,
    anchor: PatternAnchor,
    side: Side,
    anchor_row: i32,
    anchor_col: i32,
) -> Vec<(CombatantId, f32)> {
    let mut targets = Vec::new();

    for row in 0..pattern.height() {
        for col in 0..pattern.width() {
            let weight = pattern.weight(row, col);
            if weight <= 0.0 {
                continue;
            }

            let projected_row = anchor_row + row - anchor.row;
            let projected_col = anchor_col + col - anchor.col;
            if !config.in_bounds(projected_row, projected_col) {
                continue;
            }

            if let Some(occupant) = state.occupant_at(side, projected_row, projected_col) {
                targets.push((occupant, weight));
            }
        }
    }

    targets
}

/// Computes every legal tile-selection target on the side opposing the
/// attacker, applying range, line-of-fire, and taunt-absorption rules.
pub fn targetable_tiles(
    state: &BattleState,
    config: &BattleConfig,
    attacker: CombatantId,
    profile: &AttackProfile,
) -> Vec<TileTarget> {
    let Some(unit) = state.combatant(attacker) else {
        return Vec::new();
    };
    let target_side = unit.side.opponent();

    // First pass: range + line-of-fire, ignoring taunts.
    let mut reachable = Vec::new();
    for row in 0..config.grid_height {
        for col in 0..config.grid_width {
            if !in_reach(state, config, unit.row, unit.col, target_side, row, col, profile) {
                continue;
            }
            reachable.push(TileCoord {
                side: target_side,
                row,
                col,
            });
        }
    }

    // Taunting units in reach absorb every attack: while one is reachable,
    // only tiles occupied by taunting units remain legal.
    let taunt_in_reach = reachable.iter().any(|tile| is_taunting_tile(state, tile));
    reachable
        .into_iter()
        .filter(|tile| !taunt_in_reach || is_taunting_tile(state, tile))
        .map(|tile| TileTarget {
            terrain_warning: terrain_warning(state, &tile, profile),
            tile,
        })
        .collect()
}

fn is_taunting_tile(state: &BattleState, tile: &TileCoord) -> bool {
    state
        .occupant_at(tile.side, tile.row, tile.col)
        .is_some_and(|id| state.current_state(id).contains(StateFlags::TAUNTING))
}

fn terrain_warning(state: &BattleState, tile: &TileCoord, profile: &AttackProfile) -> bool {
    state
        .occupant_at(tile.side, tile.row, tile.col)
        .is_some_and(|id| {
            state
                .combatant(id)
                .is_some_and(|c| !profile.targetable_terrains.contains(&c.definition.terrain))
        })
}

/// Range and line-of-fire check for one candidate tile.
#[allow(clippy::too_many_arguments)]
fn in_reach(
    state: &BattleState,
    config: &BattleConfig,
    attacker_row: i32,
    attacker_col: i32,
    target_side: Side,
    target_row: i32,
    target_col: i32,
    profile: &AttackProfile,
) -> bool {
    // Fixed locks the shot to the attacker's own column.
    if profile.has_modifier(LineOfFireModifier::Fixed) && target_col != attacker_col {
        return false;
    }

    // Distance counts rows crossed, frontier-to-frontier; Rear measures the
    // target-side term from the far edge of the target half-grid.
    let target_depth = if profile.has_modifier(LineOfFireModifier::Rear) {
        config.grid_height - 1 - target_row
    } else {
        target_row
    };
    if attacker_row + target_depth + 1 > profile.range {
        return false;
    }

    match profile.line_of_fire {
        LineOfFire::Indirect => true,
        LineOfFire::Contact => !lane_blocked(state, attacker_row, attacker_col, target_side, target_row, target_col, false),
        LineOfFire::Direct => !lane_blocked(state, attacker_row, attacker_col, target_side, target_row, target_col, true),
    }
}

/// Checks the fire lane for blockers: attacker-side cells in the attacker's
/// column in front of the attacker, then target-side cells in the target's
/// column in front of the target. With `cover_only`, only units providing
/// cover block.
fn lane_blocked(
    state: &BattleState,
    attacker_row: i32,
    attacker_col: i32,
    target_side: Side,
    target_row: i32,
    target_col: i32,
    cover_only: bool,
) -> bool {
    let attacker_side = target_side.opponent();

    let blocks = |id: CombatantId| {
        !cover_only
            || state
                .combatant(id)
                .is_some_and(|c| c.definition.cover)
    };

    for row in 0..attacker_row {
        if let Some(id) = state.occupant_at(attacker_side, row, attacker_col)
            && blocks(id)
        {
            return true;
        }
    }
    for row in 0..target_row {
        if let Some(id) = state.occupant_at(target_side, row, target_col)
            && blocks(id)
        {
            return true;
        }
    }
    false
}
