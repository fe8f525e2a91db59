// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Periodic animations that run on their own thread while the console waits for the operator.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::{debug, error, span, Level};

use crate::{
    dmx::{FixtureSink, SinkError},
    lifecycle::{LifecycleError, Worker},
};

mod chase;
mod cycle;
mod highlight;
mod pulse;

pub use chase::{SceneChase, MAX_CHASE_DELAY, MIN_CHASE_DELAY};
pub use cycle::ColorCycle;
pub use highlight::Highlight;
pub use pulse::RawDmxPulse;

/// Dimmer oscillation shared by the highlight and raw DMX loops.
pub const PULSE_STEP: i16 = 5;
pub const PULSE_HIGH: i16 = 255;
pub const PULSE_LOW: i16 = 25;
pub const PULSE_TICK: Duration = Duration::from_millis(30);

/// One animation. The loop calls `tick` every `interval`, and calls `restore` once after it has
/// been cancelled.
pub trait Effect: Send + 'static {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    fn tick(&mut self, sink: &dyn FixtureSink);

    /// Puts back anything the effect changed temporarily.
    fn restore(&mut self, _sink: &dyn FixtureSink) {}
}

/// A bounded triangle wave, starting at the top and heading down.
#[derive(Debug, Clone)]
pub struct Triangle {
    value: i16,
    step: i16,
}

impl Triangle {
    pub fn new() -> Triangle {
        Triangle {
            value: PULSE_HIGH,
            step: -PULSE_STEP,
        }
    }

    pub fn advance(&mut self) -> u8 {
        self.value += self.step;
        if self.value <= PULSE_LOW {
            self.value = PULSE_LOW;
            self.step = PULSE_STEP;
        } else if self.value >= PULSE_HIGH {
            self.value = PULSE_HIGH;
            self.step = -PULSE_STEP;
        }
        self.value as u8
    }
}

impl Default for Triangle {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs a failed write and carries on.
pub(crate) fn report(result: Result<(), SinkError>) {
    if let Err(e) = result {
        error!(err = e.to_string(), "Error writing to fixture sink");
    }
}

/// A running effect. The effect is shared with its thread behind a single lock, so anything done
/// through `with` is serialized against ticks.
pub struct EffectLoop<E: Effect> {
    effect: Arc<Mutex<E>>,
    worker: Worker,
}

impl<E: Effect> EffectLoop<E> {
    pub fn start(effect: E, sink: Arc<dyn FixtureSink>) -> Result<EffectLoop<E>, LifecycleError> {
        let name = effect.name();
        let effect = Arc::new(Mutex::new(effect));

        let worker = {
            let effect = effect.clone();
            Worker::spawn(&format!("effect-{}", name), move |cancel_handle| {
                let span = span!(Level::INFO, "effect", effect = name);
                let _enter = span.enter();
                debug!("Effect started");

                let mut last_tick: Option<Instant> = None;
                loop {
                    let wait = {
                        let mut effect = effect.lock();
                        let interval = effect.interval();
                        match last_tick.map(|tick| tick.elapsed()) {
                            Some(elapsed) if elapsed < interval => interval - elapsed,
                            _ => {
                                effect.tick(sink.as_ref());
                                last_tick = Some(Instant::now());
                                interval
                            }
                        }
                    };
                    if cancel_handle.wait_timeout(wait) {
                        break;
                    }
                }

                effect.lock().restore(sink.as_ref());
                debug!("Effect stopped");
            })?
        };

        Ok(EffectLoop { effect, worker })
    }

    /// Runs the closure against the effect while no tick is in progress. The loop wakes up
    /// afterwards, so a shorter interval applies to the current sleep.
    pub fn with<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        let result = f(&mut self.effect.lock());
        self.worker.wake();
        result
    }

    /// Cancels the loop and blocks until it has exited and restored the fixtures.
    pub fn stop(mut self, timeout: Duration) -> Result<(), LifecycleError> {
        self.worker.stop(timeout)
    }
}
