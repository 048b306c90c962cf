//! Admission gate for AI calls: a sliding 60-second request window plus a
//! calendar-day cost budget. Calls over either limit are rejected before they
//! are issued; nothing is queued.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::llm_client::AiServiceError;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyUsage {
    pub tokens: u64,
    pub cost_usd: f64,
    pub requests: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub day: NaiveDate,
    pub today: DailyUsage,
    pub minute_requests: usize,
    pub requests_per_minute: usize,
    pub daily_budget_usd: f64,
}

struct GateState {
    admitted: VecDeque<Instant>,
    day: NaiveDate,
    usage: DailyUsage,
}

pub struct RateGate {
    requests_per_minute: usize,
    daily_budget_usd: f64,
    state: Mutex<GateState>,
}

impl RateGate {
    pub fn new(requests_per_minute: usize, daily_budget_usd: f64) -> Self {
        Self {
            requests_per_minute,
            daily_budget_usd,
            state: Mutex::new(GateState {
                admitted: VecDeque::new(),
                day: Local::now().date_naive(),
                usage: DailyUsage::default(),
            }),
        }
    }

    /// Admits one request or rejects it. An admitted request occupies a
    /// window slot whether or not it later succeeds.
    pub fn try_acquire(&self) -> Result<(), AiServiceError> {
        self.try_acquire_at(Instant::now(), Local::now().date_naive())
    }

    /// Adds the tokens and estimated cost of a completed call to today's total.
    pub fn record_usage(&self, tokens: u64, cost_usd: f64) {
        self.record_usage_on(Local::now().date_naive(), tokens, cost_usd);
    }

    pub fn stats(&self) -> UsageStats {
        let mut state = self.state.lock();
        prune(&mut state.admitted, Instant::now());
        UsageStats {
            day: state.day,
            today: state.usage.clone(),
            minute_requests: state.admitted.len(),
            requests_per_minute: self.requests_per_minute,
            daily_budget_usd: self.daily_budget_usd,
        }
    }

    fn try_acquire_at(&self, now: Instant, today: NaiveDate) -> Result<(), AiServiceError> {
        let mut state = self.state.lock();
        roll_day(&mut state, today);
        prune(&mut state.admitted, now);

        if state.admitted.len() >= self.requests_per_minute {
            return Err(AiServiceError::RateLimited(format!(
                "{} requests in the last minute (limit {})",
                state.admitted.len(),
                self.requests_per_minute
            )));
        }
        if state.usage.cost_usd >= self.daily_budget_usd {
            return Err(AiServiceError::BudgetExhausted {
                spent: state.usage.cost_usd,
                budget: self.daily_budget_usd,
            });
        }

        state.admitted.push_back(now);
        Ok(())
    }

    fn record_usage_on(&self, today: NaiveDate, tokens: u64, cost_usd: f64) {
        let mut state = self.state.lock();
        roll_day(&mut state, today);
        state.usage.tokens += tokens;
        state.usage.cost_usd += cost_usd;
        state.usage.requests += 1;
    }
}

fn roll_day(state: &mut GateState, today: NaiveDate) {
    if state.day != today {
        state.day = today;
        state.usage = DailyUsage::default();
    }
}

fn prune(admitted: &mut VecDeque<Instant>, now: Instant) {
    while let Some(oldest) = admitted.front() {
        if now.duration_since(*oldest) >= WINDOW {
            admitted.pop_front();
        } else {
            break;
        }
    }
}
