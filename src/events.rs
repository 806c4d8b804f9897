//! Monitor event system.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring-buffer of recent events so that late subscribers can catch up.
//! Subscribers that only care about some kinds use [`EventBus::subscribe_to`].

use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, Utc};
use episonext_common::{EventId, SeriesId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// The kinds of event the monitor emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An episode of a watched series airs within the lookahead window.
    UpcomingEpisode,
    /// A watched series has a new episode ready to watch.
    NextEpisodeAvailable,
    /// A monitoring pass could not do its job.
    MonitoringError,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpcomingEpisode => write!(f, "upcoming_episode"),
            Self::NextEpisodeAvailable => write!(f, "next_episode_available"),
            Self::MonitoringError => write!(f, "monitoring_error"),
        }
    }
}

// ---------------------------------------------------------------------------
// EventPayload
// ---------------------------------------------------------------------------

/// A specific episode of a watched series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeNotice {
    pub series_id: SeriesId,
    pub series_name: String,
    pub season_number: u32,
    pub episode_number: u32,
    pub episode_title: Option<String>,
    pub air_date: Option<NaiveDate>,
}

/// Payload describing what happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    UpcomingEpisode(EpisodeNotice),
    NextEpisodeAvailable(EpisodeNotice),
    MonitoringError { message: String },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::UpcomingEpisode(_) => EventKind::UpcomingEpisode,
            Self::NextEpisodeAvailable(_) => EventKind::NextEpisodeAvailable,
            Self::MonitoringError { .. } => EventKind::MonitoringError,
        }
    }

    /// The episode the event refers to, if any.
    pub fn notice(&self) -> Option<&EpisodeNotice> {
        match self {
            Self::UpcomingEpisode(notice) | Self::NextEpisodeAvailable(notice) => Some(notice),
            Self::MonitoringError { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A timestamped event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Which kind of event this is; always matches the payload.
    pub kind: EventKind,
    /// What happened.
    pub payload: EventPayload,
}

impl Event {
    /// Create a new event with a fresh id and the current timestamp.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            kind: payload.kind(),
            payload,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Broadcast channel with a bounded ring buffer of recent events.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    recent: RwLock<VecDeque<Event>>,
}

impl EventBus {
    /// Create a new event bus.
    ///
    /// `capacity` controls the broadcast channel buffer size (not the ring
    /// buffer, which is always [`MAX_RECENT_EVENTS`]).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    /// Subscribe to every event.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Subscribe to the given kinds only.
    pub fn subscribe_to(&self, kinds: &[EventKind]) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            kinds: kinds.to_vec(),
        }
    }

    /// Broadcast an event to all current subscribers and store it in the
    /// ring buffer. Returns the event as sent.
    pub fn emit(&self, payload: EventPayload) -> Event {
        let event = Event::new(payload);

        // Store in ring buffer regardless of subscriber count.
        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // Ignore send errors (no subscribers).
        let _ = self.tx.send(event.clone());
        event
    }

    /// Return the `n` most recent events (newest first).
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        let recent = self.recent.read();
        recent.iter().take(n).cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// A receiver that skips events outside its kinds.
pub struct Subscription {
    rx: broadcast::Receiver<Event>,
    kinds: Vec<EventKind>,
}

impl Subscription {
    /// Wait for the next matching event.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if self.kinds.contains(&event.kind) {
                return Ok(event);
            }
        }
    }

    /// Take the next matching event without waiting.
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        loop {
            let event = self.rx.try_recv()?;
            if self.kinds.contains(&event.kind) {
                return Ok(event);
            }
        }
    }
}
