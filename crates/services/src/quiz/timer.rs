use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// One countdown tick, tagged with the timer run that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    generation: u64,
}

/// Repeating one-second tick source for a running quiz.
///
/// At most one interval task exists at a time. Ticks travel over a channel to
/// the task that owns the session; `stop` bumps the generation so ticks
/// already queued from an earlier run are rejected by [`QuizTimer::accepts`].
#[derive(Debug)]
pub struct QuizTimer {
    period: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<TimerTick>,
}

impl QuizTimer {
    /// Create a stopped timer and the receiver its ticks arrive on.
    #[must_use]
    pub fn new(period: Duration) -> (Self, mpsc::UnboundedReceiver<TimerTick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timer = Self {
            period,
            generation: 0,
            task: None,
            tx,
        };
        (timer, rx)
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Start ticking, replacing any run in progress. Must be called inside a
    /// tokio runtime.
    pub fn start(&mut self) {
        self.stop();
        let tick = TimerTick {
            generation: self.generation,
        };
        let tx = self.tx.clone();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(tick).is_err() {
                    break;
                }
            }
        }));
    }

    /// Stop ticking immediately. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// True if `tick` came from the current run.
    #[must_use]
    pub fn accepts(&self, tick: TimerTick) -> bool {
        self.is_running() && tick.generation == self.generation
    }

    #[cfg(test)]
    pub(crate) fn current_tick(&self) -> TimerTick {
        TimerTick {
            generation: self.generation,
        }
    }
}

impl Drop for QuizTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let (mut timer, mut rx) = QuizTimer::new(Duration::from_secs(1));
        timer.start();

        let started = Instant::now();
        for _ in 0..3 {
            let tick = rx.recv().await.unwrap();
            assert!(timer.accepts(tick));
        }
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn queued_ticks_are_rejected_after_stop() {
        let (mut timer, mut rx) = QuizTimer::new(Duration::from_secs(1));
        timer.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        timer.stop();
        assert!(!timer.is_running());

        let mut queued = 0;
        while let Ok(tick) = rx.try_recv() {
            assert!(!timer.accepts(tick));
            queued += 1;
        }
        assert_eq!(queued, 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_run() {
        let (mut timer, mut rx) = QuizTimer::new(Duration::from_secs(1));
        timer.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let stale = rx.try_recv().unwrap();

        timer.start();
        assert!(!timer.accepts(stale));
        let fresh = rx.recv().await.unwrap();
        assert!(timer.accepts(fresh));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }
}
