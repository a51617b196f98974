use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

/// A gallery event with a type name and arbitrary payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryEvent {
    pub event_type: String,
    pub data: HashMap<String, serde_json::Value>,
    pub timestamp: f64,
}

/// Central event bus with ring buffer logging.
pub struct EventBus {
    /// Listeners keyed by event type. Each listener gets an ID.
    listeners: HashMap<String, Vec<(u64, Box<dyn Fn(&GalleryEvent) + Send + Sync>)>>,
    next_listener_id: u64,
    /// Ring buffer log of recent events.
    log: VecDeque<GalleryEvent>,
    log_capacity: usize,
    /// Total time for timestamps.
    total_time: f64,
    /// Pending events to be flushed.
    pending: Vec<GalleryEvent>,
}

impl EventBus {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            listeners: HashMap::new(),
            next_listener_id: 0,
            log: VecDeque::with_capacity(log_capacity),
            log_capacity,
            total_time: 0.0,
            pending: Vec::new(),
        }
    }

    /// Emit an event. Queues it for processing during flush.
    pub fn emit(&mut self, event_type: &str, data: HashMap<String, serde_json::Value>) {
        self.pending.push(GalleryEvent {
            event_type: event_type.to_string(),
            data,
            timestamp: self.total_time,
        });
    }

    /// Emit a simple event with no data.
    pub fn emit_simple(&mut self, event_type: &str) {
        self.emit(event_type, HashMap::new());
    }

    /// Register a listener for an event type. Returns a listener ID for removal.
    pub fn listen<F>(&mut self, event_type: &str, callback: F) -> u64
    where
        F: Fn(&GalleryEvent) + Send + Sync + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners
            .entry(event_type.to_string())
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Remove a listener by ID.
    pub fn remove_listener(&mut self, listener_id: u64) {
        for listeners in self.listeners.values_mut() {
            listeners.retain(|(id, _)| *id != listener_id);
        }
    }

    /// Flush pending events: notify listeners and append to the ring log.
    /// Returns the flushed events.
    pub fn flush(&mut self) -> Vec<GalleryEvent> {
        let events: Vec<GalleryEvent> = self.pending.drain(..).collect();

        for event in &events {
            if let Some(listeners) = self.listeners.get(&event.event_type) {
                for (_id, callback) in listeners {
                    callback(event);
                }
            }

            if self.log.len() >= self.log_capacity {
                self.log.pop_front();
            }
            self.log.push_back(event.clone());
        }

        events
    }

    /// Advance time.
    pub fn tick(&mut self, dt: f64) {
        self.total_time += dt;
    }

    /// Get the event log (ring buffer).
    pub fn get_log(&self) -> &VecDeque<GalleryEvent> {
        &self.log
    }

    /// Get total elapsed time.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }
}
