use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::consts::*;

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum RigType {
    Basic = 0,
    Advanced,
    Elite,
}

/// Purchase terms of a rig contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RigTerms {
    pub duration_days: u64,
    pub hp: u64,
    /// Price in whole XNT.
    pub cost_xnt: u64,
}

impl RigType {
    pub const ALL: [RigType; 3] = [RigType::Basic, RigType::Advanced, RigType::Elite];

    pub fn terms(self) -> RigTerms {
        match self {
            RigType::Basic => RigTerms { duration_days: 7, hp: 1, cost_xnt: 1 },
            RigType::Advanced => RigTerms { duration_days: 14, hp: 5, cost_xnt: 10 },
            RigType::Elite => RigTerms { duration_days: 28, hp: 7, cost_xnt: 20 },
        }
    }

    /// Renewal buff per level 0..=3.
    pub fn buff_steps(self) -> [u16; 4] {
        match self {
            RigType::Basic => [0, 250, 500, 750],
            RigType::Advanced => [0, 300, 600, 900],
            RigType::Elite => [0, 400, 800, 1_200],
        }
    }

    pub fn buff_cap_bps(self) -> u16 {
        match self {
            RigType::Basic => 750,
            RigType::Advanced => 1_000,
            RigType::Elite => 1_500,
        }
    }

    /// Buff for a renewal level, saturating at the rig cap past the last step.
    pub fn buff_bps(self, buff_level: u8) -> u16 {
        let steps = self.buff_steps();
        let bps = if buff_level > MAX_BUFF_LEVEL {
            self.buff_cap_bps()
        } else {
            steps[buff_level as usize]
        };
        bps.min(self.buff_cap_bps())
    }

    /// Infer the rig class from a contract duration.
    ///
    /// Rounds to whole days. Unknown durations fall back to `Basic`, which is
    /// how older clients treated them; a 10-day contract is therefore Basic.
    pub fn infer(start_ts: i64, end_ts: i64, seconds_per_day: u64) -> RigType {
        let day = if seconds_per_day == 0 { SECONDS_PER_DAY_DEFAULT } else { seconds_per_day };
        let duration = end_ts.saturating_sub(start_ts).max(0) as u64;
        let days = duration.saturating_add(day / 2) / day;

        match days {
            7 => RigType::Basic,
            14 => RigType::Advanced,
            28 => RigType::Elite,
            // TODO: surface unknown durations as a distinct class once the
            // program starts issuing non-catalogue contracts.
            _ => RigType::Basic,
        }
    }
}

/// Account-level bonus in bps. Levels past the table saturate at the top entry.
pub fn level_bonus_bps(level: u8) -> u16 {
    let bps = match level {
        0 | 1 => 0,
        2 => 160,
        3 => 340,
        4 => 550,
        5 => 780,
        _ => 1_000,
    };
    bps.min(LEVEL_BONUS_CAP_BPS)
}

/// XP required to reach `level`. Levels 0 and 1 need none.
pub fn level_threshold(level: u8) -> Option<u64> {
    match level {
        0 | 1 => Some(0),
        2 => Some(1),
        3 => Some(2_000),
        4 => Some(5_000),
        5 => Some(10_000),
        6 => Some(16_000),
        _ => None,
    }
}

/// Whole-MIND cost of leaving `level` for the next one.
pub fn level_up_cost_mind(level: u8) -> Option<u64> {
    match level {
        1 => Some(150),
        2 => Some(350),
        3 => Some(900),
        4 => Some(2_000),
        5 => Some(4_000),
        _ => None,
    }
}

/// Next level and the XP it requires, or `None` at max level.
pub fn next_level(level: u8) -> Option<(u8, u64)> {
    if level >= MAX_LEVEL {
        return None;
    }
    let next = level.max(1) + 1;
    level_threshold(next).map(|xp| (next, xp))
}

/// Highest level whose threshold `xp` satisfies.
pub fn level_for_xp(xp: u64) -> u8 {
    (1..=MAX_LEVEL)
        .rev()
        .find(|level| level_threshold(*level).is_some_and(|t| xp >= t))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    #[test]
    fn test_rig_inference() {
        assert_eq!(RigType::infer(0, 7 * DAY, 86_400), RigType::Basic);
        assert_eq!(RigType::infer(0, 14 * DAY, 86_400), RigType::Advanced);
        assert_eq!(RigType::infer(0, 28 * DAY, 86_400), RigType::Elite);
        assert_eq!(RigType::infer(0, 10 * DAY, 86_400), RigType::Basic);
    }

    #[test]
    fn test_rig_inference_rounds_and_defaults_day() {
        assert_eq!(RigType::infer(0, 14 * DAY - 3_600, 86_400), RigType::Advanced);
        assert_eq!(RigType::infer(0, 14 * DAY, 0), RigType::Advanced);
        assert_eq!(RigType::infer(0, 28 * 60, 60), RigType::Elite);
        assert_eq!(RigType::infer(100, 0, 86_400), RigType::Basic);
    }

    #[test]
    fn test_buff_table_saturates() {
        assert_eq!(RigType::Basic.buff_bps(3), 750);
        assert_eq!(RigType::Basic.buff_bps(9), 750);
        assert_eq!(RigType::Advanced.buff_bps(3), 900);
        assert_eq!(RigType::Advanced.buff_bps(4), 1_000);
        assert_eq!(RigType::Elite.buff_bps(1), 400);
        assert_eq!(RigType::Elite.buff_bps(u8::MAX), 1_500);
    }

    #[test]
    fn test_level_tables() {
        assert_eq!(level_bonus_bps(1), 0);
        assert_eq!(level_bonus_bps(5), 780);
        assert_eq!(level_bonus_bps(42), 1_000);

        assert_eq!(next_level(1), Some((2, 1)));
        assert_eq!(next_level(5), Some((6, 16_000)));
        assert_eq!(next_level(6), None);
        assert_eq!(next_level(0), Some((2, 1)));

        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(1_999), 2);
        assert_eq!(level_for_xp(16_000), 6);

        assert_eq!(level_up_cost_mind(3), Some(900));
        assert_eq!(level_up_cost_mind(6), None);
    }

    #[test]
    fn test_rig_catalogue() {
        let elite = RigType::Elite.terms();
        assert_eq!(elite.duration_days, 28);
        assert_eq!(elite.hp, 7);
        assert_eq!(RigType::try_from(1u8).ok(), Some(RigType::Advanced));
        assert!(RigType::try_from(3u8).is_err());
    }
}
