//! The monitor's event loop: a dedicated consumer thread reads triggers and
//! measurements off a `crossbeam-channel`, the idiomatic shape for a
//! single-consumer/multi-producer queue where producers must never block on
//! verification logic.

use crate::binding::BindingState;
use crate::config::{HostingMode, RuntimeConfig};
use crate::errors::{MonitorError, MonitorResult};
use crate::logging::initialize_logger;
use ahash::AHashMap;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use icftl_spec::{AtomicConstraint, Configuration, Specification};
use icftl_utils::Id;
use slog::Logger;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

#[derive(Debug)]
enum Event {
    Trigger {
        map_index: usize,
        variable: Id,
    },
    Measurement {
        map_index: usize,
        atom_index: usize,
        subatom_index: usize,
        measurement: f64,
    },
    Stop,
}

/// The timestamp sequence and settled (or still-pending) formula
/// configuration for one binding, handed back once monitoring ends.
#[derive(Clone, Debug)]
pub struct Verdict {
    pub map_index: usize,
    pub timestamps: Vec<Instant>,
    pub configuration: Configuration,
}

impl Verdict {
    /// `Some(true)`/`Some(false)` once the formula has settled, `None`
    /// while it is still pending further measurements.
    pub fn result(&self) -> Option<bool> {
        match self.configuration {
            Configuration::True => Some(true),
            Configuration::False => Some(false),
            _ => None,
        }
    }
}

/// A host-facing, serializable snapshot of one binding's verdict at the
/// moment [`Monitor::snapshot`] was called: a `clone`d read rather than a
/// reference into the monitor thread's live state, so a host can emit it
/// (e.g. as JSON, behind the `serialize` feature) without synchronizing
/// with the monitor thread any further.
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct VerdictSnapshot {
    pub map_index: usize,
    pub binding_length: usize,
    pub result: Option<bool>,
}

#[cfg(feature = "serialize")]
impl VerdictSnapshot {
    /// Render this snapshot as a JSON verdict record, for hosts that write
    /// verdicts to a sink rather than inspecting them in-process.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&Verdict> for VerdictSnapshot {
    fn from(verdict: &Verdict) -> Self {
        VerdictSnapshot {
            map_index: verdict.map_index,
            binding_length: verdict.timestamps.len(),
            result: verdict.result(),
        }
    }
}

/// A running monitor for one specification. Instruments call
/// [`Monitor::send_trigger`]/[`Monitor::send_measurement`] from wherever
/// they fire in the monitored program; [`Monitor::end_monitoring`] stops
/// the consumer thread and collects a verdict per binding discovered.
/// [`Monitor::snapshot`] can be called concurrently, at any time, to read
/// the verdicts observed so far without waiting for monitoring to end.
pub struct Monitor {
    sender: Sender<Event>,
    handle: Option<JoinHandle<Vec<Verdict>>>,
    snapshot: Arc<Mutex<Vec<Verdict>>>,
}

impl Monitor {
    pub fn start(specification: Specification, config: RuntimeConfig) -> Self {
        let logger = initialize_logger(config.get_logging_config());
        // Whole-process hosting keeps one monitor alive for the program's
        // entire run, so its event queue is unbounded; per-request hosting
        // spins up a fresh monitor per inbound request and bounds the
        // queue so a burst of requests can't grow it unboundedly.
        let (sender, receiver) = match config.hosting_mode {
            HostingMode::WholeProcess => unbounded(),
            HostingMode::PerRequest => bounded(config.channel_capacity),
        };
        let snapshot = Arc::new(Mutex::new(Vec::new()));
        let handle = {
            let snapshot = Arc::clone(&snapshot);
            std::thread::spawn(move || monitoring_loop(specification, receiver, logger, snapshot))
        };
        Monitor {
            sender,
            handle: Some(handle),
            snapshot,
        }
    }

    /// A clone-on-read snapshot of every binding's verdict observed so
    /// far, safe to call while monitoring is still running.
    pub fn snapshot(&self) -> Vec<VerdictSnapshot> {
        self.snapshot
            .lock()
            .expect("monitor snapshot lock poisoned")
            .iter()
            .map(VerdictSnapshot::from)
            .collect()
    }

    /// Signal that `variable`'s binding site was reached for the quantifier
    /// tuple identified by `map_index`. `map_index` is the instrumentation
    /// plan's way of telling apart concurrently-live bindings of the same
    /// specification (e.g. separate calls on separate threads).
    pub fn send_trigger(&self, map_index: usize, variable: Id) -> MonitorResult<()> {
        self.sender
            .send(Event::Trigger { map_index, variable })
            .map_err(|_| MonitorError::TriggerChannelClosed.into())
    }

    pub fn send_measurement(
        &self,
        map_index: usize,
        atom_index: usize,
        subatom_index: usize,
        measurement: f64,
    ) -> MonitorResult<()> {
        self.sender
            .send(Event::Measurement {
                map_index,
                atom_index,
                subatom_index,
                measurement,
            })
            .map_err(|_| MonitorError::MeasurementChannelClosed.into())
    }

    /// Stop the consumer thread and collect the final verdict for every
    /// binding it ever constructed, in map-index order.
    pub fn end_monitoring(mut self) -> MonitorResult<Vec<Verdict>> {
        self.sender
            .send(Event::Stop)
            .map_err(|_| MonitorError::ControlChannelClosed)?;
        let handle = self.handle.take().expect("end_monitoring called twice");
        Ok(handle.join().expect("monitor thread panicked"))
    }
}

fn monitoring_loop(
    specification: Specification,
    receiver: Receiver<Event>,
    logger: Logger,
    snapshot: Arc<Mutex<Vec<Verdict>>>,
) -> Vec<Verdict> {
    let constraint = specification.constraint().clone();
    let variable_order: Vec<Id> = specification
        .quantifier_sequence()
        .into_iter()
        .map(|(variable, _)| variable)
        .collect();
    let atoms: Vec<AtomicConstraint> = constraint.get_atomic_constraints().into_iter().cloned().collect();
    let mut bindings: AHashMap<usize, Vec<BindingState>> = AHashMap::default();

    slog::info!(logger, "monitor started"; "quantifiers" => variable_order.len());

    while let Ok(event) = receiver.recv() {
        match event {
            Event::Stop => break,
            Event::Trigger { map_index, variable } => {
                let Some(variable_index) = variable_order.iter().position(|v| *v == variable) else {
                    slog::warn!(logger, "trigger for unknown variable"; "variable" => variable.as_str());
                    continue;
                };
                let entry = bindings.entry(map_index).or_default();
                if variable_index == 0 {
                    entry.push(BindingState::new(Instant::now(), &constraint));
                } else {
                    // Fork every binding under this map index whose
                    // sequence length matches the quantifier we just
                    // triggered; it is the one waiting on this variable
                    // next. The parent is retained as-is, since a partial
                    // binding may be extended by more than one future
                    // site (fan-out).
                    let now = Instant::now();
                    let is_relevant = |atom_index: usize, subatom_index: usize| -> bool {
                        subatom_is_bound(&atoms, &variable_order, atom_index, subatom_index, variable_index)
                    };
                    let forks: Vec<BindingState> = entry
                        .iter()
                        .filter(|binding| binding.len() == variable_index)
                        .map(|binding| binding.fork(now, &is_relevant))
                        .collect();
                    entry.extend(forks);
                }
            }
            Event::Measurement {
                map_index,
                atom_index,
                subatom_index,
                measurement,
            } => match bindings.get_mut(&map_index) {
                Some(entry) => {
                    for binding in entry.iter_mut() {
                        // A retained partial binding hasn't bound every
                        // variable a sibling forked off it has; a
                        // measurement whose subatom belongs to a variable
                        // this binding hasn't reached yet must not be
                        // applied to it, or it would resolve against data
                        // that isn't actually its own.
                        if subatom_is_bound(&atoms, &variable_order, atom_index, subatom_index, binding.len()) {
                            binding.update_with_measurement(measurement, atom_index, subatom_index);
                        }
                    }
                }
                None => {
                    slog::warn!(logger, "measurement for unknown map index"; "map_index" => map_index);
                }
            },
        }

        let mut guard = snapshot.lock().expect("monitor snapshot lock poisoned");
        *guard = verdicts_from(&bindings, variable_order.len());
    }

    let binding_count: usize = bindings.values().map(|v| v.len()).sum();
    slog::info!(logger, "monitor stopping"; "bindings" => binding_count);

    verdicts_from(&bindings, variable_order.len())
}

/// Whether `(atom_index, subatom_index)`'s base variable is among the first
/// `bound_count` quantifiers, i.e. already bound by a binding of that
/// length. An atom whose base variable can't be resolved (or that has none,
/// as with `timeBetween`'s own expressions once decomposed) is treated as
/// relevant, matching the fork's original fallback.
fn subatom_is_bound(
    atoms: &[AtomicConstraint],
    variable_order: &[Id],
    atom_index: usize,
    subatom_index: usize,
    bound_count: usize,
) -> bool {
    atoms
        .get(atom_index)
        .and_then(|a| a.expressions.get(subatom_index))
        .and_then(|e| e.base_variable())
        .and_then(|(name, _)| variable_order.iter().position(|v| *v == name))
        .map(|position| position < bound_count)
        .unwrap_or(true)
}

/// Only bindings whose timestamp tuple covers every quantifier are complete
/// enough to report; a partial binding retained after forking (so a later
/// future site can still extend a sibling) is not yet a verdict.
fn verdicts_from(bindings: &AHashMap<usize, Vec<BindingState>>, expected_len: usize) -> Vec<Verdict> {
    let mut verdicts: Vec<Verdict> = bindings
        .iter()
        .flat_map(|(&map_index, states)| {
            states
                .iter()
                .filter(|state| state.len() == expected_len)
                .map(move |state| Verdict {
                    map_index,
                    timestamps: state.timestamps().to_vec(),
                    configuration: state.configuration().clone(),
                })
        })
        .collect();
    verdicts.sort_by_key(|v| v.map_index);
    verdicts
}
