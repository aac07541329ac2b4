//! Thread-safe handle shared between a periodic ticker and UI code.
//!
//! Every operation takes the same lock, so a step always sees either the old
//! or the new settings in full, and a `stop` that has returned is never
//! followed by another ticked step.

use crate::field::FieldData;
use crate::simulation::{EngineStatus, PhysarumSimulation};
use log::{debug, error, info};
use physarum_common::{AgentPosition, SimulationSettings};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct SharedSimulation {
    inner: Arc<Mutex<PhysarumSimulation>>,
}

impl SharedSimulation {
    pub fn new(sim: PhysarumSimulation) -> Self {
        Self { inner: Arc::new(Mutex::new(sim)) }
    }

    fn lock(&self) -> MutexGuard<'_, PhysarumSimulation> {
        // A panic inside `step` leaves no half-written state behind the lock.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut PhysarumSimulation) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn start(&self) {
        self.lock().start();
    }

    pub fn stop(&self) {
        self.lock().stop();
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_running()
    }

    pub fn update_settings(&self, settings: SimulationSettings) {
        self.lock().update_settings(settings);
    }

    /// Steps unconditionally.
    pub fn step(&self) {
        self.lock().step();
    }

    /// Steps once if the engine is running. Returns whether a step happened.
    pub fn tick(&self) -> bool {
        let mut sim = self.lock();
        if sim.is_running() {
            sim.step();
            true
        } else {
            false
        }
    }

    pub fn status(&self) -> EngineStatus {
        self.lock().status()
    }

    pub fn subscribe(&self) -> Receiver<EngineStatus> {
        self.lock().subscribe()
    }

    pub fn pheromone_field_data(&self) -> FieldData {
        self.lock().pheromone_field_data()
    }

    pub fn agent_positions(&self) -> Vec<AgentPosition> {
        self.lock().agent_positions()
    }

    /// Spawns a background thread calling [`tick`](Self::tick) every `interval`.
    pub fn spawn_ticker(&self, interval: Duration) -> Ticker {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let sim = self.clone();

        let handle = thread::spawn(move || {
            let mut steps = 0u64;
            let mut next_tick = Instant::now() + interval;
            while !flag.load(Ordering::Acquire) {
                if sim.tick() {
                    steps += 1;
                }
                let now = Instant::now();
                if next_tick > now {
                    thread::sleep(next_tick - now);
                    next_tick += interval;
                } else {
                    // Fell behind; don't try to catch up with a burst of steps.
                    next_tick = now + interval;
                }
            }
            steps
        });

        info!("Ticker started ({} ms interval).", interval.as_millis());
        Ticker { shutdown, handle: Some(handle) }
    }
}

/// Background stepping thread. Stops on [`shutdown`](Ticker::shutdown) or drop.
pub struct Ticker {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl Ticker {
    /// Stops the thread and returns how many steps it performed.
    pub fn shutdown(mut self) -> u64 {
        self.finish()
    }

    fn finish(&mut self) -> u64 {
        self.shutdown.store(true, Ordering::Release);
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(steps)) => {
                debug!("Ticker stopped after {} steps.", steps);
                steps
            }
            Some(Err(_)) => {
                error!("Ticker thread panicked.");
                0
            }
            None => 0,
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.finish();
    }
}
