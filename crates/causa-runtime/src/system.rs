//! Deterministic single-threaded simulation driver

use std::collections::HashMap;

use causa_clock::{sort_events, LogicalClock, ProcessRegistry, ScalarClock, VectorClock};
use causa_core::{CausalError, CausalResult, Event, Packet, ProcessId, Sequence};

use crate::{History, InMemoryBus, MessageBus, Observers, Process, Receipt, SystemConfig, Transit};

/// System of Lamport-clock processes
pub type ScalarSystem<T> = System<ScalarClock, T>;

/// System of vector-clock processes
pub type VectorSystem<T> = System<VectorClock, T>;

/// Simulated distributed system.
///
/// Every state transition is a synchronous call. Sends only enqueue packets
/// on the bus; nothing is received until the driver calls [`System::step`],
/// [`System::run_until_idle`] or feeds a packet directly with
/// [`System::receive`].
pub struct System<C: LogicalClock, T, B = InMemoryBus<<C as LogicalClock>::Timestamp, T>> {
    config: SystemConfig,
    registry: ProcessRegistry,
    processes: HashMap<ProcessId, Process<C, T>>,
    bus: B,
    observers: Observers<C::Timestamp, T>,
}

impl<C, T> System<C, T>
where
    C: LogicalClock,
    T: Clone,
{
    /// Create an empty system with default configuration
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    /// Create an empty system with custom configuration
    pub fn with_config(config: SystemConfig) -> Self {
        Self::with_bus(config, InMemoryBus::new())
    }
}

impl<C, T> Default for System<C, T>
where
    C: LogicalClock,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, T, B> System<C, T, B>
where
    C: LogicalClock,
    T: Clone,
    B: MessageBus<C::Timestamp, T>,
{
    /// Create an empty system delivering through a custom bus
    pub fn with_bus(config: SystemConfig, bus: B) -> Self {
        System {
            config,
            registry: ProcessRegistry::new(),
            processes: HashMap::new(),
            bus,
            observers: Observers::new(),
        }
    }

    /// Register a process. Existing vector clocks gain a zero entry for it.
    pub fn create_process(&mut self, id: impl Into<ProcessId>) -> CausalResult<()> {
        let id = id.into();
        self.registry.register(id.clone())?;

        for process in self.processes.values_mut() {
            process.observe_process(&id);
        }

        let process = Process::new(id.clone(), &self.registry, &self.config, self.observers.clone());
        self.processes.insert(id, process);
        Ok(())
    }

    /// Point-to-point send. Returns the sender's Send event; the receiver
    /// records its Receive event when the bus hands the message over.
    pub fn send_message(
        &mut self,
        sender: &ProcessId,
        receiver: &ProcessId,
        payload: T,
    ) -> CausalResult<Event<C::Timestamp, T>> {
        self.registry.ensure(receiver)?;
        let (event, message) = self.process_mut(sender)?.send(receiver.clone(), payload);

        self.bus.post(message.into(), std::slice::from_ref(receiver));
        Ok(event)
    }

    /// FIFO broadcast to every other registered process. Returns the
    /// assigned sequence number.
    pub fn broadcast_message(&mut self, sender: &ProcessId, payload: T) -> CausalResult<Sequence> {
        let envelope = self.process_mut(sender)?.broadcast(payload);
        let sequence = envelope.sequence;

        let targets: Vec<ProcessId> = self.registry.others(sender).cloned().collect();
        tracing::debug!(
            sender = %sender,
            seq = sequence.value(),
            receivers = targets.len(),
            "broadcast posted"
        );
        self.bus.post(envelope.into(), &targets);
        Ok(sequence)
    }

    /// Internal step of a process
    pub fn local_event(&mut self, id: &ProcessId, payload: T) -> CausalResult<Event<C::Timestamp, T>> {
        Ok(self.process_mut(id)?.local_event(payload))
    }

    /// Hand a packet straight to a receiver, bypassing the bus.
    ///
    /// Duplicate, stale and overflowing envelopes come back as recoverable
    /// errors and leave the receiver unchanged.
    pub fn receive(&mut self, receiver: &ProcessId, packet: Packet<C::Timestamp, T>) -> CausalResult<Receipt> {
        self.registry.ensure(packet.sender())?;
        self.process_mut(receiver)?.handle(packet)
    }

    /// Pump one transit off the bus. Returns `false` once the bus is idle.
    /// Recoverable delivery errors are logged and the transit discarded.
    pub fn step(&mut self) -> CausalResult<bool> {
        let Some(Transit { to, packet }) = self.bus.next() else {
            return Ok(false);
        };

        match self.receive(&to, packet) {
            Ok(receipt) => {
                tracing::trace!(receiver = %to, ?receipt, "transit handled");
                Ok(true)
            }
            Err(err) if err.is_recoverable() => {
                tracing::debug!(receiver = %to, error = %err, "transit discarded");
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    /// Pump until the bus is idle (or `max_steps` transits were handled).
    /// Returns the number of transits handled.
    pub fn run_until_idle(&mut self) -> CausalResult<usize> {
        let mut steps = 0;
        while steps < self.config.max_steps && self.step()? {
            steps += 1;
        }
        if !self.bus.is_idle() {
            tracing::warn!(
                steps,
                in_flight = self.bus.in_flight(),
                "step limit reached with transits still in flight"
            );
        }
        Ok(steps)
    }

    /// Current clock snapshot of a process
    pub fn timestamp(&self, id: &ProcessId) -> CausalResult<C::Timestamp> {
        Ok(self.process(id)?.timestamp())
    }

    /// History of a process in local order
    pub fn history(&self, id: &ProcessId) -> CausalResult<History<'_, C::Timestamp, T>> {
        Ok(self.process(id)?.history())
    }

    /// Register a listener invoked with `(process, event)` for every event
    /// appended to any history
    pub fn on_deliver<F>(&self, listener: F)
    where
        F: Fn(&ProcessId, &Event<C::Timestamp, T>) + Send + Sync + 'static,
    {
        self.observers.register(listener);
    }

    /// Every event of every process, in a total order consistent with
    /// happened-before
    pub fn ordered_events(&self) -> Vec<Event<C::Timestamp, T>> {
        let mut events: Vec<_> = self
            .registry
            .ids()
            .filter_map(|id| self.processes.get(id))
            .flat_map(|p| p.history().iter().cloned())
            .collect();
        sort_events(&mut events);
        events
    }

    pub fn process(&self, id: &ProcessId) -> CausalResult<&Process<C, T>> {
        self.processes
            .get(id)
            .ok_or_else(|| CausalError::UnknownProcess(id.clone()))
    }

    fn process_mut(&mut self, id: &ProcessId) -> CausalResult<&mut Process<C, T>> {
        self.processes
            .get_mut(id)
            .ok_or_else(|| CausalError::UnknownProcess(id.clone()))
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable bus access, for drivers that schedule transits themselves
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }
}
