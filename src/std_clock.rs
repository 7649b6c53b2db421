//! 气象站报告的时间来源
//!
//! `Station` 只依赖 `embedded_timers` 的 `Clock` 接口，在树莓派上由标准库时钟实现，
//! 用来记录最近一次成功周期的时间并计算报告的新鲜度。

use std::time::{Duration, Instant};

use embedded_timers::clock::Clock;

/// 基于标准库单调时钟的 `Clock` 实现
#[derive(Debug, Default)]
pub struct StdClock {}

impl StdClock {
    pub fn new() -> Self {
        Self {}
    }
}

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, instant: Instant) -> Duration {
        instant.elapsed()
    }
}
