//! Scripted scenarios over a chaos bus

use causa_clock::LogicalClock;
use causa_core::{CausalResult, EventKind, ProcessId};
use causa_runtime::{MessageBus, System, SystemConfig};

use crate::{ChaosBus, ChaosConfig};

/// System whose transits go through a [`ChaosBus`]
pub type ChaosSystem<C, T> = System<C, T, ChaosBus<<C as LogicalClock>::Timestamp, T>>;

/// One scripted step
#[derive(Clone, Debug)]
pub enum Action<T> {
    Broadcast { from: ProcessId, payload: T },
    Send { from: ProcessId, to: ProcessId, payload: T },
    Local { id: ProcessId, payload: T },
    /// Pump up to n transits
    Step(usize),
    /// Pump until the bus is idle
    Drain,
}

/// Builder for a process set, bus conditions and a script
#[derive(Clone, Debug)]
pub struct ScenarioBuilder<T> {
    processes: Vec<ProcessId>,
    config: SystemConfig,
    chaos: ChaosConfig,
    actions: Vec<Action<T>>,
}

impl<T> ScenarioBuilder<T> {
    pub fn new() -> Self {
        ScenarioBuilder {
            processes: Vec::new(),
            config: SystemConfig::default(),
            chaos: ChaosConfig::default(),
            actions: Vec::new(),
        }
    }

    /// Add processes `P1..=Pcount`
    pub fn with_processes(mut self, count: usize) -> Self {
        self.processes
            .extend((1..=count).map(|i| ProcessId::new(format!("P{}", i))));
        self
    }

    pub fn with_process(mut self, id: impl Into<ProcessId>) -> Self {
        self.processes.push(id.into());
        self
    }

    pub fn with_config(mut self, config: SystemConfig) -> Self {
        self.config = config;
        self
    }

    /// Set bus conditions
    pub fn with_chaos(mut self, chaos: ChaosConfig) -> Self {
        self.chaos = chaos;
        self
    }

    pub fn broadcast(mut self, from: impl Into<ProcessId>, payload: T) -> Self {
        self.actions.push(Action::Broadcast {
            from: from.into(),
            payload,
        });
        self
    }

    pub fn send(mut self, from: impl Into<ProcessId>, to: impl Into<ProcessId>, payload: T) -> Self {
        self.actions.push(Action::Send {
            from: from.into(),
            to: to.into(),
            payload,
        });
        self
    }

    pub fn local(mut self, id: impl Into<ProcessId>, payload: T) -> Self {
        self.actions.push(Action::Local {
            id: id.into(),
            payload,
        });
        self
    }

    pub fn step(mut self, transits: usize) -> Self {
        self.actions.push(Action::Step(transits));
        self
    }

    pub fn drain(mut self) -> Self {
        self.actions.push(Action::Drain);
        self
    }

    pub fn processes(&self) -> &[ProcessId] {
        &self.processes
    }
}

impl<T: Clone> ScenarioBuilder<T> {
    /// Register every process on a fresh system
    pub fn build<C: LogicalClock>(self) -> CausalResult<Scenario<C, T>> {
        let mut system = System::with_bus(self.config, ChaosBus::new(self.chaos));
        for id in self.processes {
            system.create_process(id)?;
        }
        Ok(Scenario {
            system,
            actions: self.actions,
        })
    }

    /// Build and run to completion
    pub fn run<C: LogicalClock>(self) -> CausalResult<ChaosSystem<C, T>> {
        self.build()?.run()
    }
}

impl<T> Default for ScenarioBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A built scenario, ready to run
pub struct Scenario<C: LogicalClock, T> {
    system: ChaosSystem<C, T>,
    actions: Vec<Action<T>>,
}

impl<C: LogicalClock, T: Clone> Scenario<C, T> {
    pub fn system(&self) -> &ChaosSystem<C, T> {
        &self.system
    }

    /// Play the script, then drain whatever is still in flight
    pub fn run(mut self) -> CausalResult<ChaosSystem<C, T>> {
        let actions = std::mem::take(&mut self.actions);
        tracing::debug!(actions = actions.len(), "scenario started");

        for action in actions {
            match action {
                Action::Broadcast { from, payload } => {
                    self.system.broadcast_message(&from, payload)?;
                }
                Action::Send { from, to, payload } => {
                    self.system.send_message(&from, &to, payload)?;
                }
                Action::Local { id, payload } => {
                    self.system.local_event(&id, payload)?;
                }
                Action::Step(transits) => {
                    for _ in 0..transits {
                        if !self.system.step()? {
                            break;
                        }
                    }
                }
                Action::Drain => {
                    self.system.run_until_idle()?;
                }
            }
        }

        let steps = self.system.run_until_idle()?;
        tracing::debug!(
            trailing_steps = steps,
            stats = ?self.system.bus().stats(),
            "scenario finished"
        );
        Ok(self.system)
    }
}

/// Payloads `receiver` delivered from `sender`, in delivery order
pub fn deliveries<C, T, B>(
    system: &System<C, T, B>,
    receiver: &ProcessId,
    sender: &ProcessId,
) -> CausalResult<Vec<T>>
where
    C: LogicalClock,
    T: Clone,
    B: MessageBus<C::Timestamp, T>,
{
    Ok(system
        .history(receiver)?
        .of_kind(EventKind::Deliver)
        .filter(|e| e.peer.as_ref() == Some(sender))
        .map(|e| e.payload.clone())
        .collect())
}
