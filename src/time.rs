use std::time::{Duration, Instant};

// Search parameters supplied by the protocol front end. Everything is
// optional: no clock at all means an unbounded search.
#[derive(Debug, Clone, Copy)]
pub struct BudgetParams {
    pub move_time_ms: Option<u64>,
    pub color_time_ms: Option<u64>,
    pub inc_ms: Option<u64>,
    pub moves_to_go: Option<u32>,
    pub ply: Option<u32>,
    pub overhead_ms: u64,
}

impl Default for BudgetParams {
    fn default() -> Self {
        Self {
            move_time_ms: None,
            color_time_ms: None,
            inc_ms: None,
            moves_to_go: None,
            ply: None,
            overhead_ms: 5,
        }
    }
}

// Converts clock parameters into a deadline and predicts whether another
// deepening iteration fits the remaining budget.
#[derive(Debug, Clone, Copy)]
pub struct TimeManager {
    start: Instant,
    started: bool,
    deadline: Option<Instant>,
    ema_growth: f64,
}

impl TimeManager {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            started: false,
            deadline: None,
            ema_growth: 0.0,
        }
    }

    pub fn mark_start(&mut self) {
        self.start = Instant::now();
        self.started = true;
    }

    #[inline(always)]
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[inline(always)]
    pub fn out_of_time(&self) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    // None means unbounded; otherwise non-increasing over wall-clock time
    // and floored at zero.
    pub fn remaining_ms(&self) -> Option<u64> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()).as_millis() as u64)
    }

    // Exponential moving average of the per-iteration node growth ratio.
    pub fn on_iteration_finished(&mut self, iter_nodes: u64, prev_iter_nodes: u64) {
        if prev_iter_nodes == 0 {
            return;
        }
        let ratio = iter_nodes as f64 / prev_iter_nodes as f64;
        self.ema_growth = if self.ema_growth != 0.0 {
            0.7 * self.ema_growth + 0.3 * ratio
        } else {
            ratio
        };
    }

    // Predicts the next iteration's cost as last duration times the clamped
    // growth average with a 20% safety margin.
    pub fn enough_time_for_next_iteration(&self, last_iter_ms: u64) -> bool {
        let remaining = match self.remaining_ms() {
            Some(remaining) => remaining,
            None => return true,
        };
        let growth = if self.ema_growth != 0.0 {
            self.ema_growth.clamp(2.0, 10.0)
        } else {
            6.0
        };
        let safety = 1.20;
        let need = (last_iter_ms as f64 * growth * safety).ceil() as u64 + 2;
        remaining > need
    }

    pub fn allocate_budget(&mut self, params: &BudgetParams) {
        if !self.started {
            self.mark_start();
        }

        if params.color_time_ms.is_none() && params.move_time_ms.is_none() {
            self.deadline = None;
        } else if let Some(move_time) = params.move_time_ms {
            let budget = move_time.saturating_sub(params.overhead_ms);
            self.deadline = Some(Instant::now() + Duration::from_millis(budget));
        } else {
            let remain = params.color_time_ms.unwrap_or(0);
            let moves_to_go = match params.moves_to_go {
                Some(mtg) if mtg > 0 => mtg,
                _ => predict_moves_to_go(params.ply.unwrap_or(0), remain, params.inc_ms),
            } as u64;

            let mut budget = remain / moves_to_go + params.inc_ms.unwrap_or(0);

            // keep a reserve unless the game is nearly over; with 1-2 moves
            // left aggressive cuts hurt more than they protect
            let reserve = (params.overhead_ms * 2).max(50);
            if moves_to_go > 2 && budget > remain.saturating_sub(reserve) {
                budget = remain.saturating_sub(reserve);
            }
            budget = budget.saturating_sub(params.overhead_ms);
            self.deadline = Some(Instant::now() + Duration::from_millis(budget));
        }
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        Self::new()
    }
}

// Remaining-move estimate: starts near 35 and decreases with game length,
// corrected for time pressure and a usable increment.
fn predict_moves_to_go(ply: u32, remain_ms: u64, inc_ms: Option<u64>) -> u32 {
    let base = (35 - ply as i32 / 2).clamp(8, 50);
    let mut adjust = if remain_ms < 10_000 {
        12
    } else if remain_ms < 30_000 {
        8
    } else if remain_ms < 120_000 {
        4
    } else if remain_ms < 300_000 {
        2
    } else if remain_ms < 600_000 {
        0
    } else {
        -2
    };
    if inc_ms.map_or(false, |inc| inc >= 1000) {
        adjust -= 4;
    }
    (base + adjust).clamp(6, 60) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_clock_means_unbounded() {
        let mut tm = TimeManager::new();
        tm.allocate_budget(&BudgetParams::default());
        assert_eq!(tm.remaining_ms(), None);
        assert!(!tm.out_of_time());
        assert!(tm.enough_time_for_next_iteration(u64::MAX / 2));
    }

    #[test]
    fn test_movetime_sets_deadline_minus_overhead() {
        let mut tm = TimeManager::new();
        tm.allocate_budget(&BudgetParams {
            move_time_ms: Some(1_000),
            ..Default::default()
        });
        let remaining = tm.remaining_ms().unwrap();
        assert!(remaining <= 995);
        assert!(remaining > 900);
    }

    #[test]
    fn test_tiny_movetime_floors_at_zero() {
        let mut tm = TimeManager::new();
        tm.allocate_budget(&BudgetParams {
            move_time_ms: Some(1),
            ..Default::default()
        });
        assert!(tm.out_of_time());
        assert_eq!(tm.remaining_ms(), Some(0));
    }

    #[test]
    fn test_remaining_is_non_increasing() {
        let mut tm = TimeManager::new();
        tm.allocate_budget(&BudgetParams {
            move_time_ms: Some(10_000),
            ..Default::default()
        });
        let mut previous = tm.remaining_ms().unwrap();
        for _ in 0..100 {
            let now = tm.remaining_ms().unwrap();
            assert!(now <= previous);
            previous = now;
        }
    }

    #[test]
    fn test_clock_budget_respects_reserve() {
        let mut tm = TimeManager::new();
        tm.allocate_budget(&BudgetParams {
            color_time_ms: Some(60_000),
            inc_ms: Some(0),
            moves_to_go: Some(30),
            ..Default::default()
        });
        // 60s / 30 moves = 2s slice, under remain - reserve; overhead off
        let remaining = tm.remaining_ms().unwrap();
        assert!(remaining <= 1_995);
        assert!(remaining > 1_800);

        // one huge slice gets capped below the full remaining time
        let mut tm = TimeManager::new();
        tm.allocate_budget(&BudgetParams {
            color_time_ms: Some(1_000),
            inc_ms: Some(5_000),
            moves_to_go: Some(10),
            ..Default::default()
        });
        assert!(tm.remaining_ms().unwrap() < 1_000);
    }

    #[test]
    fn test_iteration_forecast() {
        let mut tm = TimeManager::new();
        tm.allocate_budget(&BudgetParams {
            move_time_ms: Some(10_000),
            ..Default::default()
        });
        // default growth guess 6.0 * 1.2: a 100ms iteration needs ~722ms
        assert!(tm.enough_time_for_next_iteration(100));
        // a 5s iteration cannot fit another one
        assert!(!tm.enough_time_for_next_iteration(5_000));

        // a calm growth history relaxes the forecast but stays >= 2x
        for _ in 0..10 {
            tm.on_iteration_finished(1_000, 1_000);
        }
        assert!(tm.enough_time_for_next_iteration(3_000));
        assert!(!tm.enough_time_for_next_iteration(4_500));
    }

    #[test]
    fn test_predict_moves_to_go_bounds() {
        for ply in (0..400).step_by(7) {
            for remain in [500, 20_000, 90_000, 200_000, 900_000] {
                let mtg = predict_moves_to_go(ply, remain, Some(2_000));
                assert!((6..=60).contains(&mtg));
            }
        }
        // early game with lots of time: close to the base estimate
        assert!(predict_moves_to_go(0, 700_000, None) >= 30);
        // deep endgame under pressure still stays bounded
        assert!(predict_moves_to_go(300, 1_000, None) >= 6);
    }
}
