//! Tier and division ordering for the ranked ladder

use serde::{Deserialize, Serialize};

/// Ladder tiers, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Ferro,
    Bronze,
    Prata,
    Ouro,
    Platina,
    Esmeralda,
    Diamante,
    Mestre,
    #[serde(rename = "Grão-Mestre", alias = "GraoMestre", alias = "Grao-Mestre")]
    GraoMestre,
    Desafiante,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 10] = [
        Tier::Ferro,
        Tier::Bronze,
        Tier::Prata,
        Tier::Ouro,
        Tier::Platina,
        Tier::Esmeralda,
        Tier::Diamante,
        Tier::Mestre,
        Tier::GraoMestre,
        Tier::Desafiante,
    ];

    /// Demotions never drop a player below this tier.
    pub const FLOOR: Tier = Tier::Prata;

    pub fn index(&self) -> usize {
        Tier::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Tier {
        Tier::ALL[index.min(Tier::ALL.len() - 1)]
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tier::Ferro => "Ferro",
            Tier::Bronze => "Bronze",
            Tier::Prata => "Prata",
            Tier::Ouro => "Ouro",
            Tier::Platina => "Platina",
            Tier::Esmeralda => "Esmeralda",
            Tier::Diamante => "Diamante",
            Tier::Mestre => "Mestre",
            Tier::GraoMestre => "Grão-Mestre",
            Tier::Desafiante => "Desafiante",
        };
        write!(f, "{}", name)
    }
}

/// Divisions inside a tier, `I` highest through `IV` lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Division {
    I,
    II,
    III,
    IV,
}

impl Division {
    /// All divisions, highest first (index 0 = `I`).
    pub const ALL: [Division; 4] = [Division::I, Division::II, Division::III, Division::IV];

    pub fn index(&self) -> usize {
        Division::ALL.iter().position(|d| d == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Division {
        Division::ALL[index.min(Division::ALL.len() - 1)]
    }
}

impl std::fmt::Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let numeral = match self {
            Division::I => "I",
            Division::II => "II",
            Division::III => "III",
            Division::IV => "IV",
        };
        write!(f, "{}", numeral)
    }
}

/// A position on the ladder: tier, division and XP within the division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderRank {
    pub tier: Tier,
    pub division: Division,
    /// 0–99 within the current division
    pub xp: u8,
}

impl LadderRank {
    pub fn new(tier: Tier, division: Division, xp: u8) -> Self {
        Self { tier, division, xp }
    }

    /// Linear ladder position: 0 = (Ferro, IV), one step per division.
    ///
    /// Division `I` is the top of a tier, so stepping up from `I` lands on
    /// the next tier's `IV` and stepping down from `IV` lands on the
    /// previous tier's `I`.
    pub fn position(&self) -> usize {
        self.tier.index() * Division::ALL.len() + (Division::ALL.len() - 1 - self.division.index())
    }

    pub fn from_position(position: usize, xp: u8) -> Self {
        let per_tier = Division::ALL.len();
        let tier = Tier::from_index(position / per_tier);
        let division = Division::from_index(per_tier - 1 - (position % per_tier));
        Self { tier, division, xp }
    }

    /// Highest reachable position (promotions clamp here).
    pub fn ceiling_position() -> usize {
        LadderRank::new(Tier::Desafiante, Division::I, 0).position()
    }

    /// Lowest position demotions may reach.
    pub fn floor_position() -> usize {
        LadderRank::new(Tier::FLOOR, Division::IV, 0).position()
    }
}

impl std::fmt::Display for LadderRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({} XP)", self.tier, self.division, self.xp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Ferro < Tier::Bronze);
        assert!(Tier::GraoMestre < Tier::Desafiante);
        assert_eq!(Tier::ALL.len(), 10);
    }

    #[test]
    fn test_position_round_trip() {
        for tier in Tier::ALL {
            for division in Division::ALL {
                let rank = LadderRank::new(tier, division, 42);
                let back = LadderRank::from_position(rank.position(), rank.xp);
                assert_eq!(back, rank);
            }
        }
    }

    #[test]
    fn test_division_steps_within_and_across_tiers() {
        let ferro_iv = LadderRank::new(Tier::Ferro, Division::IV, 0);
        let ferro_iii = LadderRank::new(Tier::Ferro, Division::III, 0);
        assert_eq!(ferro_iv.position() + 1, ferro_iii.position());

        let ferro_i = LadderRank::new(Tier::Ferro, Division::I, 0);
        let bronze_iv = LadderRank::new(Tier::Bronze, Division::IV, 0);
        assert_eq!(ferro_i.position() + 1, bronze_iv.position());
    }

    #[test]
    fn test_grao_mestre_serde_aliases() {
        let tier: Tier = serde_json::from_str("\"Grão-Mestre\"").unwrap();
        assert_eq!(tier, Tier::GraoMestre);
        let tier: Tier = serde_json::from_str("\"GraoMestre\"").unwrap();
        assert_eq!(tier, Tier::GraoMestre);
        assert_eq!(serde_json::to_string(&tier).unwrap(), "\"Grão-Mestre\"");
    }

    #[test]
    fn test_floor_and_ceiling_positions() {
        assert_eq!(LadderRank::ceiling_position(), 39);
        assert_eq!(
            LadderRank::floor_position(),
            LadderRank::new(Tier::Prata, Division::IV, 0).position()
        );
    }
}
