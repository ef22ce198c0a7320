//! Client-side request rate limiting.
//!
//! A sliding window remembers when the most recent permits were handed out.
//! Once the window is full the next caller sleeps until the oldest permit
//! leaves the window. Waiters are served in arrival order.

use std::{collections::VecDeque, time::Duration};

use tokio::{
    sync::Mutex,
    time::{sleep_until, Instant},
};

use crate::logging;

pub struct RateLimiter {
    permits: usize,
    period: Duration,
    /// 最近一個統計視窗內已發出的配額時間點。
    issued: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Allows `permits` acquisitions per `period`. A zero permit count is treated as one.
    pub fn new(permits: usize, period: Duration) -> Self {
        let permits = permits.max(1);
        RateLimiter {
            permits,
            period,
            issued: Mutex::new(VecDeque::with_capacity(permits)),
        }
    }

    pub fn permits(&self) -> usize {
        self.permits
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits until a permit is free and consumes it.
    ///
    /// The queue lock is held while sleeping, so a later caller can never take a
    /// permit ahead of an earlier one.
    pub async fn acquire(&self) {
        let mut issued = self.issued.lock().await;

        loop {
            let now = Instant::now();
            self.cleanup(&mut issued, now);

            if issued.len() < self.permits {
                issued.push_back(now);
                return;
            }

            let next_free = issued
                .front()
                .map(|oldest| *oldest + self.period)
                .unwrap_or(now);

            logging::debug_file_async(format!(
                "Rate limiter full ({}/{:?}), waiting {:?}",
                self.permits,
                self.period,
                next_free.saturating_duration_since(now)
            ));

            sleep_until(next_free).await;
        }
    }

    /// Takes a permit only if one is free right now and nobody is queued.
    pub fn try_acquire(&self) -> bool {
        let Ok(mut issued) = self.issued.try_lock() else {
            return false;
        };

        let now = Instant::now();
        self.cleanup(&mut issued, now);

        if issued.len() < self.permits {
            issued.push_back(now);
            true
        } else {
            false
        }
    }

    /// Permits that could be taken immediately.
    pub async fn available(&self) -> usize {
        let mut issued = self.issued.lock().await;
        self.cleanup(&mut issued, Instant::now());
        self.permits - issued.len()
    }

    /// 清掉視窗外的舊紀錄
    fn cleanup(&self, issued: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = issued.front() {
            if now.saturating_duration_since(*oldest) >= self.period {
                issued.pop_front();
            } else {
                break;
            }
        }
    }
}
