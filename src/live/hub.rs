//! Live update hub.
//!
//! Fans newly created notifications out to the live sessions of their owner.
//! A single worker task owns the subscriber map; register, unregister and
//! publish are commands queued on an unbounded channel, so callers never wait
//! on the worker or on slow subscribers.
//!
//! Registrations made before `start` are queued and applied once the worker
//! runs. Publishes are only accepted while running: nobody can be listening
//! before the worker exists, so an idle hub drops them instead of buffering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::messages::ServerMessage;
use crate::notifications::{Notification, Owner};

pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

/// Lifecycle of the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubState {
    /// Constructed, worker not spawned yet. Registrations are queued,
    /// publishes are dropped.
    Idle,
    Running,
    /// Subscriptions are closed, further operations are ignored.
    Stopped,
}

/// Identifies a registered live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    owner: Owner,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }
}

/// A live session's end of the hub: its handle plus the stream of messages
/// published for its owner. `recv` yields `None` once the hub is stopped.
pub struct Subscription {
    handle: SubscriptionHandle,
    receiver: mpsc::Receiver<ServerMessage>,
}

impl Subscription {
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }

    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<ServerMessage, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn into_receiver(self) -> mpsc::Receiver<ServerMessage> {
        self.receiver
    }
}

enum HubCommand {
    Register {
        handle: SubscriptionHandle,
        sender: mpsc::Sender<ServerMessage>,
    },
    Unregister(SubscriptionHandle),
    Publish {
        owner: Owner,
        message: ServerMessage,
    },
    SubscriberCount(oneshot::Sender<usize>),
}

enum Lifecycle {
    Idle(HubWorker),
    Running,
    Stopped,
}

/// Broadcasts notification events to live subscribers.
///
/// Constructed explicitly and shared by reference (usually an `Arc`) with
/// whatever needs to publish or subscribe.
pub struct LiveUpdateHub {
    command_tx: mpsc::UnboundedSender<HubCommand>,
    lifecycle: Mutex<Lifecycle>,
    /// Set once the worker is spawned, publishes are dropped until then.
    accepting_publishes: AtomicBool,
    shutdown_token: CancellationToken,
    next_subscription_id: AtomicU64,
    subscriber_buffer: usize,
}

impl Default for LiveUpdateHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl LiveUpdateHub {
    /// Create an idle hub. `subscriber_buffer` is the number of messages a
    /// subscriber may have pending before further messages to it are dropped.
    pub fn new(subscriber_buffer: usize) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shutdown_token = CancellationToken::new();
        let worker = HubWorker {
            command_rx,
            shutdown_token: shutdown_token.clone(),
            subscribers: HashMap::new(),
        };
        Self {
            command_tx,
            lifecycle: Mutex::new(Lifecycle::Idle(worker)),
            accepting_publishes: AtomicBool::new(false),
            shutdown_token,
            next_subscription_id: AtomicU64::new(1),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    pub fn state(&self) -> HubState {
        match &*self.lock_lifecycle() {
            Lifecycle::Idle(_) => HubState::Idle,
            Lifecycle::Running => HubState::Running,
            Lifecycle::Stopped => HubState::Stopped,
        }
    }

    /// Spawn the worker on the current tokio runtime.
    /// Starting a hub that is already running or stopped does nothing.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lock_lifecycle();
        if !matches!(*lifecycle, Lifecycle::Idle(_)) {
            debug!("Live update hub already started");
            return Ok(());
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            bail!("Live update hub must be started from within a tokio runtime");
        };
        if let Lifecycle::Idle(worker) = std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            // Detached: the worker exits on its own once stopped or dropped
            runtime.spawn(worker.run());
            *lifecycle = Lifecycle::Running;
            self.accepting_publishes.store(true, Ordering::Release);
            info!("Live update hub started");
        }
        Ok(())
    }

    /// Stop the hub without waiting for the worker.
    ///
    /// Commands already queued are still processed, then every subscription
    /// is closed. Later publish/register calls are ignored.
    pub fn stop(&self) {
        let mut lifecycle = self.lock_lifecycle();
        self.shutdown_token.cancel();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle(worker) => {
                // Never ran, dropping the worker closes whatever was registered
                drop(worker);
                info!("Live update hub stopped before start");
            }
            Lifecycle::Running => info!("Live update hub stopping"),
            Lifecycle::Stopped => {}
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Register a live session for `owner`.
    ///
    /// On a stopped hub the returned subscription is already closed.
    pub fn register(&self, owner: Owner) -> Subscription {
        let handle = SubscriptionHandle {
            id: self.next_subscription_id.fetch_add(1, Ordering::Relaxed),
            owner,
        };
        let (sender, receiver) = mpsc::channel(self.subscriber_buffer);

        if self.is_stopped() {
            debug!("Ignoring registration for {} on stopped hub", owner);
        } else {
            self.send_command(HubCommand::Register { handle, sender });
        }

        Subscription { handle, receiver }
    }

    pub fn unregister(&self, handle: SubscriptionHandle) {
        if !self.is_stopped() {
            self.send_command(HubCommand::Unregister(handle));
        }
    }

    /// Queue `notification` for delivery to every live session of `owner`.
    /// Ignored unless the hub is running.
    pub fn publish(&self, owner: Owner, notification: &Notification) {
        self.publish_message(owner, ServerMessage::notification_created(notification));
    }

    pub fn publish_message(&self, owner: Owner, message: ServerMessage) {
        if self.is_stopped() {
            debug!("Dropping {} for {} on stopped hub", message.msg_type, owner);
            return;
        }
        if !self.accepting_publishes.load(Ordering::Acquire) {
            debug!("Dropping {} for {} on idle hub", message.msg_type, owner);
            return;
        }
        self.send_command(HubCommand::Publish { owner, message });
    }

    /// Number of live subscribers known to the worker. 0 unless the hub is running.
    pub async fn subscriber_count(&self) -> usize {
        if self.state() != HubState::Running {
            return 0;
        }
        let (tx, rx) = oneshot::channel();
        self.send_command(HubCommand::SubscriberCount(tx));
        rx.await.unwrap_or(0)
    }

    fn send_command(&self, command: HubCommand) {
        if self.command_tx.send(command).is_err() {
            debug!("Live update hub worker is gone, command dropped");
        }
    }

    fn lock_lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        // The lifecycle is only swapped in place, a poisoned guard still holds a valid value
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct HubWorker {
    command_rx: mpsc::UnboundedReceiver<HubCommand>,
    shutdown_token: CancellationToken,
    /// owner -> (subscription id -> sender)
    subscribers: HashMap<Owner, HashMap<u64, mpsc::Sender<ServerMessage>>>,
}

impl HubWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                _ = self.shutdown_token.cancelled() => {
                    debug!("Live update hub received shutdown signal");
                    break;
                }
            }
        }

        // Drain what was queued before the stop
        while let Ok(command) = self.command_rx.try_recv() {
            self.handle_command(command);
        }

        let closed: usize = self.subscribers.values().map(HashMap::len).sum();
        self.subscribers.clear();
        info!("Live update hub stopped, closed {} subscriptions", closed);
    }

    fn handle_command(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { handle, sender } => {
                debug!("Registered live subscription {} for {}", handle.id, handle.owner);
                self.subscribers
                    .entry(handle.owner)
                    .or_default()
                    .insert(handle.id, sender);
            }
            HubCommand::Unregister(handle) => self.remove(handle.owner, handle.id),
            HubCommand::Publish { owner, message } => self.fan_out(owner, message),
            HubCommand::SubscriberCount(response) => {
                let count = self.subscribers.values().map(HashMap::len).sum();
                let _ = response.send(count);
            }
        }
    }

    fn remove(&mut self, owner: Owner, id: u64) {
        if let Some(owner_subscribers) = self.subscribers.get_mut(&owner) {
            owner_subscribers.remove(&id);
            if owner_subscribers.is_empty() {
                self.subscribers.remove(&owner);
            }
        }
    }

    fn fan_out(&mut self, owner: Owner, message: ServerMessage) {
        let Some(owner_subscribers) = self.subscribers.get_mut(&owner) else {
            return;
        };

        owner_subscribers.retain(|id, sender| match sender.try_send(message.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Live subscription {} of {} is full, dropping {}",
                    id, owner, message.msg_type
                );
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Live subscription {} of {} is closed, removing it", id, owner);
                false
            }
        });

        if owner_subscribers.is_empty() {
            self.subscribers.remove(&owner);
        }
    }
}
