//! Typed planet notifications.
//!
//! Generation code calls [`EventBus::emit`], which only ever does a
//! non-blocking `try_send` into a bounded channel; a full channel drops the
//! event and counts it. The owner of the bus calls [`EventBus::dispatch`]
//! once per frame to move queued events into the history ring and hand them
//! to every subscribed [`EventListener`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use orbis_cache::{ChunkKey, unix_millis};
use orbis_terrain::{Biome, ErosionReport};
use serde::{Deserialize, Serialize};

/// Queued events before `emit` starts dropping.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
/// Dispatched events kept for inspection.
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlanetEvent {
    /// A full LOD pass over every face finished for the first time.
    PlanetGenerated { leaves: usize, elapsed_ms: f64 },
    ChunkGenerated {
        key: ChunkKey,
        lod: u8,
        vertices: usize,
        elapsed_us: u64,
    },
    BiomeCalculated { key: ChunkKey, dominant: Option<Biome> },
    ErosionApplied { key: ChunkKey, report: ErosionReport },
    VegetationSpawned { key: ChunkKey, instances: usize },
    WaterSimulated {
        key: ChunkKey,
        ocean_points: usize,
        rivers: usize,
    },
    LodUpdated {
        leaves: usize,
        generated: usize,
        cached: usize,
        elapsed_ms: f64,
    },
    CacheHit { key: ChunkKey },
    CacheMiss { key: ChunkKey },
    CacheEvicted { count: usize },
    /// A brush reshaped `samples` heights of the chunk at `key`.
    TerrainEdited { key: ChunkKey, samples: usize },
    PerformanceWarning { message: String, value: f64 },
    ErrorOccurred { message: String },
}

/// Discriminant of a [`PlanetEvent`], for filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PlanetGenerated,
    ChunkGenerated,
    BiomeCalculated,
    ErosionApplied,
    VegetationSpawned,
    WaterSimulated,
    LodUpdated,
    CacheHit,
    CacheMiss,
    CacheEvicted,
    TerrainEdited,
    PerformanceWarning,
    ErrorOccurred,
}

impl PlanetEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            PlanetEvent::PlanetGenerated { .. } => EventKind::PlanetGenerated,
            PlanetEvent::ChunkGenerated { .. } => EventKind::ChunkGenerated,
            PlanetEvent::BiomeCalculated { .. } => EventKind::BiomeCalculated,
            PlanetEvent::ErosionApplied { .. } => EventKind::ErosionApplied,
            PlanetEvent::VegetationSpawned { .. } => EventKind::VegetationSpawned,
            PlanetEvent::WaterSimulated { .. } => EventKind::WaterSimulated,
            PlanetEvent::LodUpdated { .. } => EventKind::LodUpdated,
            PlanetEvent::CacheHit { .. } => EventKind::CacheHit,
            PlanetEvent::CacheMiss { .. } => EventKind::CacheMiss,
            PlanetEvent::CacheEvicted { .. } => EventKind::CacheEvicted,
            PlanetEvent::TerrainEdited { .. } => EventKind::TerrainEdited,
            PlanetEvent::PerformanceWarning { .. } => EventKind::PerformanceWarning,
            PlanetEvent::ErrorOccurred { .. } => EventKind::ErrorOccurred,
        }
    }
}

/// An event stamped when it was emitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Emission order across the whole bus, starting at 0.
    pub sequence: u64,
    /// Unix time in milliseconds.
    pub timestamp_ms: u64,
    pub event: PlanetEvent,
}

/// Receives dispatched events on the thread that calls [`EventBus::dispatch`].
pub trait EventListener: Send + Sync {
    fn on_event(&self, record: &EventRecord);

    /// Only accepted kinds reach [`on_event`](Self::on_event).
    fn accepts(&self, _kind: EventKind) -> bool {
        true
    }
}

impl<F> EventListener for F
where
    F: Fn(&EventRecord) + Send + Sync,
{
    fn on_event(&self, record: &EventRecord) {
        self(record);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStats {
    pub emitted: u64,
    /// Events refused because the channel was full.
    pub dropped: u64,
    pub dispatched: u64,
}

pub struct EventBus {
    sender: Sender<EventRecord>,
    receiver: Receiver<EventRecord>,
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    history: Mutex<VecDeque<EventRecord>>,
    history_capacity: usize,
    sequence: AtomicU64,
    dropped: AtomicU64,
    dispatched: AtomicU64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("queued", &self.receiver.len())
            .field("history_capacity", &self.history_capacity)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY, DEFAULT_HISTORY_CAPACITY)
    }
}

impl EventBus {
    #[must_use]
    pub fn new(channel_capacity: usize, history_capacity: usize) -> Self {
        let (sender, receiver) = bounded(channel_capacity.max(1));
        Self {
            sender,
            receiver,
            listeners: RwLock::new(Vec::new()),
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            sequence: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Queue `event` without blocking. Returns false if it was dropped.
    pub fn emit(&self, event: PlanetEvent) -> bool {
        let record = EventRecord {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            timestamp_ms: unix_millis(),
            event,
        };
        match self.sender.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(record) | TrySendError::Disconnected(record)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(kind = ?record.event.kind(), "event channel full, dropping event");
                false
            }
        }
    }

    /// Move queued events into history and notify listeners. Returns how
    /// many events were dispatched.
    pub fn dispatch(&self) -> usize {
        let records: Vec<EventRecord> = self.receiver.try_iter().collect();
        if records.is_empty() {
            return 0;
        }

        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner).clone();
        for record in &records {
            let kind = record.event.kind();
            for listener in listeners.iter().filter(|l| l.accepts(kind)) {
                listener.on_event(record);
            }
        }

        let count = records.len();
        if self.history_capacity > 0 {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            for record in records {
                if history.len() >= self.history_capacity {
                    history.pop_front();
                }
                history.push_back(record);
            }
        }
        self.dispatched.fetch_add(count as u64, Ordering::Relaxed);
        count
    }

    /// Dispatched events, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<EventRecord> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn history_of(&self, kind: EventKind) -> Vec<EventRecord> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.event.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn clear_history(&self) {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Events emitted but not yet dispatched.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    #[must_use]
    pub fn stats(&self) -> EventStats {
        EventStats {
            emitted: self.sequence.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn error(message: &str) -> PlanetEvent {
        PlanetEvent::ErrorOccurred {
            message: message.to_string(),
        }
    }

    #[test]
    fn test_emit_queues_until_dispatch() {
        let bus = EventBus::default();
        assert!(bus.emit(error("a")));
        assert!(bus.emit(PlanetEvent::CacheEvicted { count: 3 }));
        assert_eq!(bus.pending(), 2);
        assert!(bus.history().is_empty(), "nothing dispatched yet");

        assert_eq!(bus.dispatch(), 2);
        let history = bus.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sequence, 0);
        assert_eq!(history[1].event.kind(), EventKind::CacheEvicted);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let bus = EventBus::new(2, 16);
        assert!(bus.emit(error("1")));
        assert!(bus.emit(error("2")));
        assert!(!bus.emit(error("3")), "third event should be dropped");
        let stats = bus.stats();
        assert_eq!(stats.emitted, 3);
        assert_eq!(stats.dropped, 1);
        assert_eq!(bus.dispatch(), 2);
        assert_eq!(bus.stats().dispatched, 2);
    }

    #[test]
    fn test_history_is_bounded_ring() {
        let bus = EventBus::new(64, 3);
        for i in 0..5 {
            bus.emit(PlanetEvent::CacheEvicted { count: i });
        }
        bus.dispatch();
        let counts: Vec<usize> = bus
            .history()
            .iter()
            .map(|r| match r.event {
                PlanetEvent::CacheEvicted { count } => count,
                _ => usize::MAX,
            })
            .collect();
        assert_eq!(counts, vec![2, 3, 4], "oldest events fall off the front");
    }

    #[test]
    fn test_listeners_receive_events() {
        let bus = EventBus::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        bus.subscribe(Arc::new(move |_: &EventRecord| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
        assert_eq!(bus.listener_count(), 1);

        bus.emit(error("x"));
        bus.emit(PlanetEvent::CacheEvicted { count: 1 });
        bus.dispatch();
        assert_eq!(seen.load(Ordering::Relaxed), 2);
    }

    struct ErrorsOnly(AtomicUsize);

    impl EventListener for ErrorsOnly {
        fn on_event(&self, _record: &EventRecord) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }

        fn accepts(&self, kind: EventKind) -> bool {
            kind == EventKind::ErrorOccurred
        }
    }

    #[test]
    fn test_listener_filter() {
        let bus = EventBus::default();
        let listener = Arc::new(ErrorsOnly(AtomicUsize::new(0)));
        bus.subscribe(listener.clone());
        bus.emit(PlanetEvent::CacheEvicted { count: 1 });
        bus.emit(error("boom"));
        bus.dispatch();
        assert_eq!(listener.0.load(Ordering::Relaxed), 1);
        assert_eq!(bus.history_of(EventKind::ErrorOccurred).len(), 1);
    }

    #[test]
    fn test_emit_from_threads() {
        let bus = Arc::new(EventBus::new(1024, 1024));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let bus = Arc::clone(&bus);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        bus.emit(PlanetEvent::CacheEvicted { count: i });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(bus.dispatch(), 200);
        let mut seqs: Vec<u64> = bus.history().iter().map(|r| r.sequence).collect();
        seqs.sort_unstable();
        seqs.dedup();
        assert_eq!(seqs.len(), 200, "sequence numbers are unique");
    }
}
