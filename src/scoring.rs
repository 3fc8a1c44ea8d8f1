//! Points awarded for a solved battle problem.

/// Flat award per solved problem.
pub const BASE_PROBLEM_POINTS: i32 = 100;

/// Ceiling on the speed bonus; one point is lost per full minute taken.
pub const MAX_TIME_BONUS: i32 = 50;

/// Points for a solve. A missing or negative elapsed time earns the base
/// award with no bonus.
pub fn solve_points(time_taken_seconds: Option<i32>) -> i32 {
    let bonus = match time_taken_seconds {
        Some(secs) if secs >= 0 => (MAX_TIME_BONUS - secs / 60).max(0),
        _ => 0,
    };
    BASE_PROBLEM_POINTS + bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_solve_gets_full_bonus() {
        assert_eq!(solve_points(Some(0)), 150);
        assert_eq!(solve_points(Some(59)), 150);
    }

    #[test]
    fn bonus_decays_per_minute() {
        assert_eq!(solve_points(Some(60)), 149);
        assert_eq!(solve_points(Some(10 * 60)), 140);
    }

    #[test]
    fn bonus_never_goes_negative() {
        assert_eq!(solve_points(Some(50 * 60)), 100);
        assert_eq!(solve_points(Some(3 * 60 * 60)), 100);
    }

    #[test]
    fn missing_time_earns_no_bonus() {
        assert_eq!(solve_points(None), 100);
        assert_eq!(solve_points(Some(-5)), 100);
    }
}
