//! Concurrent execution: one tokio task per process
//!
//! Each task exclusively owns its [`Process`]. Tasks talk only through
//! unbounded inboxes carrying owned copies of packets, so no clock, buffer
//! or history is ever shared.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use causa_clock::{LogicalClock, ProcessRegistry};
use causa_core::{CausalError, CausalResult, Event, Packet, ProcessId, Sequence};
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;

use crate::{Observers, Process, SystemConfig};

type Reply<V> = oneshot::Sender<V>;

/// Inbox message for a process task
enum Command<C: LogicalClock, T> {
    Broadcast {
        payload: T,
        reply: Reply<Sequence>,
    },
    Send {
        to: ProcessId,
        payload: T,
        reply: Reply<Event<C::Timestamp, T>>,
    },
    Local {
        payload: T,
        reply: Reply<Event<C::Timestamp, T>>,
    },
    Timestamp {
        reply: Reply<C::Timestamp>,
    },
    /// Copy of the history so far
    History {
        reply: Reply<Vec<Event<C::Timestamp, T>>>,
    },
    /// A process joined after this one was spawned
    Observe(ProcessId),
    /// A packet from another process
    Deliver(Packet<C::Timestamp, T>),
    Shutdown,
}

type Router<C, T> = RwLock<HashMap<ProcessId, mpsc::UnboundedSender<Command<C, T>>>>;

/// Counts packets routed but not yet handled
#[derive(Debug, Default)]
struct Tracker {
    in_flight: AtomicUsize,
    idle: Notify,
}

impl Tracker {
    fn posted(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn handled(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn settled(&self) {
        loop {
            // Register before checking so a concurrent wakeup is not lost
            let idle = self.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }
}

struct Worker<C: LogicalClock, T> {
    process: Process<C, T>,
    peers: Vec<ProcessId>,
    router: Weak<Router<C, T>>,
    tracker: Arc<Tracker>,
}

impl<C, T> Worker<C, T>
where
    C: LogicalClock,
    T: Clone + Send + 'static,
{
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Command<C, T>>) -> Process<C, T> {
        tracing::debug!(process = %self.process.id(), "process task started");

        while let Some(command) = inbox.recv().await {
            match command {
                Command::Broadcast { payload, reply } => {
                    let envelope = self.process.broadcast(payload);
                    let sequence = envelope.sequence;
                    let packet = Packet::from(envelope);
                    for peer in &self.peers {
                        self.route(peer, packet.clone());
                    }
                    let _ = reply.send(sequence);
                }
                Command::Send { to, payload, reply } => {
                    let (event, message) = self.process.send(to.clone(), payload);
                    self.route(&to, message.into());
                    let _ = reply.send(event);
                }
                Command::Local { payload, reply } => {
                    let _ = reply.send(self.process.local_event(payload));
                }
                Command::Timestamp { reply } => {
                    let _ = reply.send(self.process.timestamp());
                }
                Command::History { reply } => {
                    let _ = reply.send(self.process.history().iter().cloned().collect());
                }
                Command::Observe(id) => {
                    if id != *self.process.id() && !self.peers.contains(&id) {
                        self.process.observe_process(&id);
                        self.peers.push(id);
                    }
                }
                Command::Deliver(packet) => {
                    if let Err(err) = self.process.handle(packet) {
                        if err.is_recoverable() {
                            tracing::debug!(process = %self.process.id(), error = %err, "packet discarded");
                        } else {
                            tracing::warn!(process = %self.process.id(), error = %err, "packet rejected");
                        }
                    }
                    self.tracker.handled();
                }
                Command::Shutdown => break,
            }
        }

        tracing::debug!(
            process = %self.process.id(),
            events = self.process.history().len(),
            "process task stopped"
        );
        self.process
    }

    fn route(&self, to: &ProcessId, packet: Packet<C::Timestamp, T>) {
        // Cluster handle dropped: nobody is left to observe the result
        let Some(router) = self.router.upgrade() else {
            return;
        };
        let inboxes = router.read();
        let Some(inbox) = inboxes.get(to) else {
            tracing::warn!(sender = %self.process.id(), receiver = %to, "no route to process");
            return;
        };

        self.tracker.posted();
        if inbox.send(Command::Deliver(packet)).is_err() {
            self.tracker.handled();
            tracing::debug!(receiver = %to, "receiver already stopped");
        }
    }
}

/// A running set of process tasks.
///
/// Must be started from within a tokio runtime. Processes may join later
/// with [`Cluster::create_process`]; existing vector clocks gain a zero
/// entry for them before any of their packets can arrive. Call
/// [`Cluster::settle`] before [`Cluster::shutdown`] to let every routed
/// packet land.
pub struct Cluster<C: LogicalClock, T> {
    config: SystemConfig,
    registry: ProcessRegistry,
    router: Arc<Router<C, T>>,
    tracker: Arc<Tracker>,
    observers: Observers<C::Timestamp, T>,
    handles: Vec<(ProcessId, JoinHandle<Process<C, T>>)>,
}

impl<C, T> Cluster<C, T>
where
    C: LogicalClock,
    T: Clone + Send + 'static,
{
    /// Spawn one task per process id
    pub fn start<I, P>(ids: I, config: SystemConfig) -> CausalResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<ProcessId>,
    {
        let mut cluster = Cluster {
            config,
            registry: ProcessRegistry::new(),
            router: Arc::new(RwLock::new(HashMap::new())),
            tracker: Arc::new(Tracker::default()),
            observers: Observers::new(),
            handles: Vec::new(),
        };
        for id in ids {
            cluster.create_process(id)?;
        }

        tracing::info!(processes = cluster.registry.len(), "cluster started");
        Ok(cluster)
    }

    /// Register and spawn a process. Running processes learn about it
    /// through their inboxes, ahead of any packet it sends them.
    pub fn create_process(&mut self, id: impl Into<ProcessId>) -> CausalResult<()> {
        let id = id.into();
        self.registry.register(id.clone())?;

        let (tx, inbox) = mpsc::unbounded_channel();
        let existing = {
            let mut router = self.router.write();
            let existing: Vec<_> = router.values().cloned().collect();
            router.insert(id.clone(), tx);
            existing
        };
        for peer in existing {
            let _ = peer.send(Command::Observe(id.clone()));
        }

        let worker = Worker {
            process: Process::new(id.clone(), &self.registry, &self.config, self.observers.clone()),
            peers: self.registry.others(&id).cloned().collect(),
            router: Arc::downgrade(&self.router),
            tracker: Arc::clone(&self.tracker),
        };
        self.handles.push((id, tokio::spawn(worker.run(inbox))));
        Ok(())
    }

    /// FIFO broadcast from `sender` to every other process
    pub async fn broadcast(&self, sender: &ProcessId, payload: T) -> CausalResult<Sequence> {
        self.request(sender, |reply| Command::Broadcast { payload, reply })
            .await
    }

    /// Point-to-point send. Returns the sender's Send event.
    pub async fn send(
        &self,
        sender: &ProcessId,
        receiver: &ProcessId,
        payload: T,
    ) -> CausalResult<Event<C::Timestamp, T>> {
        self.registry.ensure(receiver)?;
        let to = receiver.clone();
        self.request(sender, |reply| Command::Send { to, payload, reply })
            .await
    }

    pub async fn local_event(&self, id: &ProcessId, payload: T) -> CausalResult<Event<C::Timestamp, T>> {
        self.request(id, |reply| Command::Local { payload, reply }).await
    }

    /// Current clock snapshot of a process
    pub async fn timestamp(&self, id: &ProcessId) -> CausalResult<C::Timestamp> {
        self.request(id, |reply| Command::Timestamp { reply }).await
    }

    /// Snapshot of a process history while the cluster keeps running
    pub async fn history(&self, id: &ProcessId) -> CausalResult<Vec<Event<C::Timestamp, T>>> {
        self.request(id, |reply| Command::History { reply }).await
    }

    /// Register a listener invoked from process tasks for every appended event
    pub fn on_deliver<F>(&self, listener: F)
    where
        F: Fn(&ProcessId, &Event<C::Timestamp, T>) + Send + Sync + 'static,
    {
        self.observers.register(listener);
    }

    /// Wait until every routed packet has been handled
    pub async fn settle(&self) {
        self.tracker.settled().await
    }

    /// Packets routed but not yet handled
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight()
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Stop every task and hand back the processes with their histories
    pub async fn shutdown(self) -> CausalResult<HashMap<ProcessId, Process<C, T>>> {
        for inbox in self.router.read().values() {
            let _ = inbox.send(Command::Shutdown);
        }

        let mut processes = HashMap::with_capacity(self.handles.len());
        for (id, handle) in self.handles {
            let process = handle.await.map_err(|err| {
                tracing::error!(process = %id, error = %err, "process task failed");
                CausalError::ClusterClosed
            })?;
            processes.insert(id, process);
        }

        tracing::info!(processes = processes.len(), "cluster stopped");
        Ok(processes)
    }

    async fn request<V>(
        &self,
        id: &ProcessId,
        command: impl FnOnce(Reply<V>) -> Command<C, T>,
    ) -> CausalResult<V> {
        let inbox = self
            .router
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| CausalError::UnknownProcess(id.clone()))?;

        let (reply, response) = oneshot::channel();
        inbox
            .send(command(reply))
            .map_err(|_| CausalError::ClusterClosed)?;
        response.await.map_err(|_| CausalError::ClusterClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causa_clock::{CausalOrder, ScalarClock, VectorClock};
    use causa_core::{Causality, EventKind};

    fn pid(id: &str) -> ProcessId {
        ProcessId::new(id)
    }

    #[tokio::test]
    async fn test_broadcasts_arrive_in_fifo_order() {
        let cluster: Cluster<VectorClock, u32> =
            Cluster::start(["P1", "P2", "P3"], SystemConfig::default()).unwrap();

        for n in 1..=20 {
            cluster.broadcast(&pid("P1"), n).await.unwrap();
        }
        cluster.settle().await;
        assert_eq!(cluster.in_flight(), 0);

        let processes = cluster.shutdown().await.unwrap();
        for id in ["P2", "P3"] {
            let delivered: Vec<u32> = processes[&pid(id)]
                .history()
                .of_kind(EventKind::Deliver)
                .map(|e| e.payload)
                .collect();
            assert_eq!(delivered, (1..=20).collect::<Vec<u32>>());
        }
        assert_eq!(
            processes[&pid("P1")].history().of_kind(EventKind::Broadcast).count(),
            20
        );
    }

    #[tokio::test]
    async fn test_send_merges_receiver_clock() {
        let cluster: Cluster<VectorClock, &'static str> =
            Cluster::start(["P1", "P2"], SystemConfig::default()).unwrap();

        let sent = cluster.send(&pid("P1"), &pid("P2"), "hello").await.unwrap();
        cluster.settle().await;

        let p2_now = cluster.timestamp(&pid("P2")).await.unwrap();
        assert_eq!(sent.timestamp.causal_cmp(&p2_now).unwrap(), Causality::Before);
        cluster.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_and_duplicate_processes() {
        let cluster: Cluster<ScalarClock, ()> =
            Cluster::start(["P1"], SystemConfig::default()).unwrap();

        assert_eq!(
            cluster.send(&pid("P1"), &pid("P9"), ()).await.unwrap_err(),
            CausalError::UnknownProcess(pid("P9"))
        );
        assert_eq!(
            cluster.local_event(&pid("P9"), ()).await.unwrap_err(),
            CausalError::UnknownProcess(pid("P9"))
        );
        cluster.shutdown().await.unwrap();

        let duplicate = Cluster::<ScalarClock, ()>::start(["P1", "P1"], SystemConfig::default());
        assert!(matches!(duplicate, Err(CausalError::DuplicateProcess(_))));
    }

    #[tokio::test]
    async fn test_observers_run_on_process_tasks() {
        let cluster: Cluster<ScalarClock, u8> =
            Cluster::start(["P1", "P2", "P3"], SystemConfig::default()).unwrap();
        let deliveries = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&deliveries);
        cluster.on_deliver(move |_, event| {
            if event.kind == EventKind::Deliver {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        cluster.broadcast(&pid("P2"), 7).await.unwrap();
        cluster.broadcast(&pid("P3"), 8).await.unwrap();
        cluster.settle().await;

        assert_eq!(deliveries.load(Ordering::SeqCst), 4);
        cluster.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_late_joiner_extends_vectors() {
        let mut cluster: Cluster<VectorClock, &'static str> =
            Cluster::start(["P1", "P2"], SystemConfig::default()).unwrap();
        cluster.broadcast(&pid("P1"), "before").await.unwrap();
        cluster.settle().await;

        cluster.create_process("P3").unwrap();
        assert!(matches!(
            cluster.create_process("P3"),
            Err(CausalError::DuplicateProcess(_))
        ));

        cluster.send(&pid("P3"), &pid("P1"), "hello").await.unwrap();
        cluster.broadcast(&pid("P3"), "joined").await.unwrap();
        cluster.settle().await;

        let p1_now = cluster.timestamp(&pid("P1")).await.unwrap();
        assert!(p1_now.contains(&pid("P3")));
        assert_eq!(p1_now.get(&pid("P3")), 2);

        let p2_history = cluster.history(&pid("P2")).await.unwrap();
        let delivered: Vec<&str> = p2_history
            .iter()
            .filter(|e| e.kind == EventKind::Deliver)
            .map(|e| e.payload)
            .collect();
        assert_eq!(delivered, ["before", "joined"]);

        // The newcomer is a broadcast target from now on
        cluster.broadcast(&pid("P2"), "welcome").await.unwrap();
        cluster.settle().await;
        let p3_history = cluster.history(&pid("P3")).await.unwrap();
        assert_eq!(p3_history.last().map(|e| e.payload), Some("welcome"));

        cluster.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_history_snapshot_while_running() {
        let cluster: Cluster<ScalarClock, u8> =
            Cluster::start(["P1"], SystemConfig::default()).unwrap();
        cluster.local_event(&pid("P1"), 1).await.unwrap();
        cluster.local_event(&pid("P1"), 2).await.unwrap();

        let history = cluster.history(&pid("P1")).await.unwrap();
        let payloads: Vec<u8> = history.iter().map(|e| e.payload).collect();
        assert_eq!(payloads, [1, 2]);
        assert!(matches!(
            cluster.history(&pid("P9")).await,
            Err(CausalError::UnknownProcess(_))
        ));

        cluster.shutdown().await.unwrap();
    }
}
