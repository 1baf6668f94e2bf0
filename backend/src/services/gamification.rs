//! XP, levels, daily streaks and achievements.

use chrono::NaiveDate;

use crate::models::gamification::StudentProgress;

pub const PERFECT_BONUS_XP: i64 = 50;
pub const STREAK_BONUS_XP: i64 = 10;
pub const MAX_STREAK_BONUS_DAYS: i32 = 7;
pub const XP_PER_LEVEL_UNIT: i64 = 100;

/// Static catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub code: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        code: "first_quiz",
        title: "First Steps",
        description: "Complete your first quiz",
    },
    Achievement {
        code: "perfect_score",
        title: "Flawless",
        description: "Answer every question of a quiz correctly",
    },
    Achievement {
        code: "streak_3",
        title: "On a Roll",
        description: "Practice three days in a row",
    },
    Achievement {
        code: "streak_7",
        title: "Unstoppable",
        description: "Practice seven days in a row",
    },
    Achievement {
        code: "quiz_10",
        title: "Dedicated",
        description: "Complete ten quizzes",
    },
    Achievement {
        code: "xp_1000",
        title: "Physicist",
        description: "Earn 1000 XP",
    },
];

pub fn find_achievement(code: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.code == code)
}

/// Streak state after an activity on `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streak {
    pub current: i32,
    pub longest: i32,
}

/// Same day keeps the streak, the next day extends it, any gap restarts at 1.
pub fn update_streak(
    last_activity: Option<NaiveDate>,
    current: i32,
    longest: i32,
    today: NaiveDate,
) -> Streak {
    let current = match last_activity {
        Some(last) if last == today => current.max(1),
        Some(last) if last.succ_opt() == Some(today) => current + 1,
        _ => 1,
    };
    Streak {
        current,
        longest: longest.max(current),
    }
}

/// XP for one attempt: rounded percentage, a perfect-score bonus and a
/// streak bonus capped at seven days.
pub fn xp_for_attempt(percentage: f64, perfect: bool, streak: i32) -> i64 {
    let base = percentage.clamp(0.0, 100.0).round() as i64;
    let perfect_bonus = if perfect { PERFECT_BONUS_XP } else { 0 };
    let streak_bonus = STREAK_BONUS_XP * i64::from(streak.clamp(0, MAX_STREAK_BONUS_DAYS));
    base + perfect_bonus + streak_bonus
}

/// Level = floor(sqrt(xp / 100)) + 1.
pub fn level_for_xp(xp: i64) -> i64 {
    let units = xp.max(0) / XP_PER_LEVEL_UNIT;
    let mut level = (units as f64).sqrt() as i64;
    // guard against float rounding at perfect squares
    while (level + 1) * (level + 1) <= units {
        level += 1;
    }
    while level * level > units {
        level -= 1;
    }
    level + 1
}

/// XP needed to reach the level after the current one.
pub fn xp_to_next_level(xp: i64) -> i64 {
    let level = level_for_xp(xp);
    level * level * XP_PER_LEVEL_UNIT - xp.max(0)
}

/// Codes of every achievement the student qualifies for.
pub fn qualifying_achievements(
    progress: StudentProgress,
    streak: i32,
    xp: i64,
) -> Vec<&'static str> {
    let mut codes = Vec::new();
    if progress.quiz_count >= 1 {
        codes.push("first_quiz");
    }
    if progress.perfect_count >= 1 {
        codes.push("perfect_score");
    }
    if streak >= 3 {
        codes.push("streak_3");
    }
    if streak >= 7 {
        codes.push("streak_7");
    }
    if progress.quiz_count >= 10 {
        codes.push("quiz_10");
    }
    if xp >= 1000 {
        codes.push("xp_1000");
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn streak_rules() {
        assert_eq!(update_streak(None, 0, 0, day(10)), Streak { current: 1, longest: 1 });
        assert_eq!(update_streak(Some(day(9)), 4, 6, day(10)), Streak { current: 5, longest: 6 });
        assert_eq!(update_streak(Some(day(10)), 5, 6, day(10)), Streak { current: 5, longest: 6 });
        assert_eq!(update_streak(Some(day(7)), 5, 6, day(10)), Streak { current: 1, longest: 6 });
        assert_eq!(update_streak(Some(day(9)), 6, 6, day(10)), Streak { current: 7, longest: 7 });
    }

    #[test]
    fn streak_crosses_month_boundary() {
        let last = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        assert_eq!(update_streak(Some(last), 2, 2, day(1)).current, 3);
    }

    #[test]
    fn xp_formula() {
        assert_eq!(xp_for_attempt(66.67, false, 1), 67 + 10);
        assert_eq!(xp_for_attempt(100.0, true, 12), 100 + 50 + 70);
        assert_eq!(xp_for_attempt(0.0, false, 0), 0);
    }

    #[test]
    fn levels_grow_with_square_root() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(399), 2);
        assert_eq!(level_for_xp(400), 3);
        assert_eq!(level_for_xp(900), 4);
        assert_eq!(xp_to_next_level(0), 100);
        assert_eq!(xp_to_next_level(150), 250);
    }

    #[test]
    fn achievements_follow_progress() {
        let progress = StudentProgress {
            quiz_count: 10,
            perfect_count: 0,
        };
        assert_eq!(
            qualifying_achievements(progress, 3, 200),
            vec!["first_quiz", "streak_3", "quiz_10"]
        );
        for code in qualifying_achievements(
            StudentProgress {
                quiz_count: 10,
                perfect_count: 1,
            },
            7,
            1000,
        ) {
            assert!(find_achievement(code).is_some());
        }
    }
}
