//! Pure XP odometer over (tier, division)
//!
//! A win or loss moves a bounded 0–99 XP counter; overflow rolls into a
//! division (or tier) promotion and underflow into a demotion, with a
//! protected floor tier and a hard ceiling. Kept as a pure function so the
//! result-resolution path stays trivially testable.

use crate::ladder::rank::{Division, LadderRank, Tier};

/// XP awarded for a win
pub const XP_PER_WIN: i32 = 30;

/// XP removed for a loss
pub const XP_PER_LOSS: i32 = 30;

const XP_PER_DIVISION: i32 = 100;

/// Apply one match result to a ladder rank.
///
/// Overflow promotes one ladder position per 100 XP; at the ceiling
/// (Desafiante I) XP clamps to 99. Underflow at or below the floor tier
/// parks the player at (floor, IV, 0); above it, each missing 100 XP
/// demotes one position, clamping at the floor.
pub fn apply_delta(rank: LadderRank, won: bool) -> LadderRank {
    let mut position = rank.position();
    let mut xp = rank.xp as i32 + if won { XP_PER_WIN } else { -XP_PER_LOSS };

    if won {
        let ceiling = LadderRank::ceiling_position();
        while xp >= XP_PER_DIVISION {
            if position >= ceiling {
                xp = 99;
                break;
            }
            xp -= XP_PER_DIVISION;
            position += 1;
        }
    } else if xp < 0 {
        if rank.tier <= Tier::FLOOR {
            return LadderRank::new(Tier::FLOOR, Division::IV, 0);
        }
        let floor = LadderRank::floor_position();
        while xp < 0 {
            xp += XP_PER_DIVISION;
            position -= 1;
            if position <= floor {
                position = floor;
                if xp < 0 {
                    xp = 0;
                }
                break;
            }
        }
    }

    LadderRank::from_position(position, xp as u8)
}
