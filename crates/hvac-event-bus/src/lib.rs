//! Event bus with typed pub/sub
//!
//! The EventBus connects the mode engine to its collaborators: inbound signals
//! (calendar, holiday flag, evaluation requests) arrive as events, and resolved
//! state leaves as events. Resolved state is published on *retained* topics:
//! the bus remembers the last event of such a topic and hands it to
//! subscribers that arrive later, the way a broker keeps retained messages.

use dashmap::DashMap;
use hvac_core::{Context, Event, EventData, EventType};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default channel capacity for event subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// The event bus for publishing and subscribing to events
pub struct EventBus {
    /// Map of event types to their broadcast senders
    listeners: DashMap<EventType, broadcast::Sender<Event<serde_json::Value>>>,
    /// Special sender for MATCH_ALL subscribers
    match_all_sender: broadcast::Sender<Event<serde_json::Value>>,
    /// Last event of every retained topic
    retained: DashMap<EventType, Event<serde_json::Value>>,
    /// Channel capacity
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (match_all_sender, _) = broadcast::channel(capacity);
        Self {
            listeners: DashMap::new(),
            match_all_sender,
            retained: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe(
        &self,
        event_type: impl Into<EventType>,
    ) -> broadcast::Receiver<Event<serde_json::Value>> {
        let event_type = event_type.into();
        trace!(event_type = %event_type, "Subscribing to event type");

        if event_type.is_match_all() {
            return self.match_all_sender.subscribe();
        }

        self.listeners
            .entry(event_type)
            .or_insert_with(|| {
                let (tx, _) = broadcast::channel(self.capacity);
                tx
            })
            .subscribe()
    }

    /// Subscribe to a typed event
    pub fn subscribe_typed<T: EventData + serde::de::DeserializeOwned>(
        &self,
    ) -> TypedEventReceiver<T> {
        TypedEventReceiver::new(self.subscribe(T::event_type()))
    }

    /// Subscribe to a retained topic
    ///
    /// Returns the last retained event (if any) together with a receiver for
    /// everything fired afterwards.
    pub fn subscribe_retained(
        &self,
        event_type: impl Into<EventType>,
    ) -> (
        Option<Event<serde_json::Value>>,
        broadcast::Receiver<Event<serde_json::Value>>,
    ) {
        let event_type = event_type.into();
        // Subscribe before reading so an event fired in between is not lost;
        // it may then be seen twice, once retained and once received.
        let rx = self.subscribe(event_type.clone());
        (self.retained(&event_type), rx)
    }

    /// Subscribe to all events
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event<serde_json::Value>> {
        self.match_all_sender.subscribe()
    }

    /// Fire an event to all subscribers
    ///
    /// The event will be delivered to:
    /// 1. All subscribers of the specific event type
    /// 2. All MATCH_ALL subscribers
    pub fn fire(&self, event: Event<serde_json::Value>) {
        debug!(event_type = %event.event_type, "Firing event");

        if let Some(sender) = self.listeners.get(&event.event_type) {
            // Send errors only mean there is no active receiver
            let _ = sender.send(event.clone());
        }

        let _ = self.match_all_sender.send(event);
    }

    /// Fire an event and keep it as the retained value of its topic
    pub fn fire_retained(&self, event: Event<serde_json::Value>) {
        self.retained
            .insert(event.event_type.clone(), event.clone());
        self.fire(event);
    }

    /// Fire a typed event
    pub fn fire_typed<T: EventData + serde::Serialize>(&self, data: T, context: Context) {
        self.fire(Self::encode(data, context));
    }

    /// Fire a typed event on its retained topic
    pub fn fire_typed_retained<T: EventData + serde::Serialize>(&self, data: T, context: Context) {
        self.fire_retained(Self::encode(data, context));
    }

    /// Last retained event of a topic
    pub fn retained(&self, event_type: &EventType) -> Option<Event<serde_json::Value>> {
        self.retained.get(event_type).map(|e| e.clone())
    }

    /// Last retained event of a topic, decoded
    pub fn retained_typed<T: EventData + serde::de::DeserializeOwned>(&self) -> Option<Event<T>> {
        self.retained(&EventType::new(T::event_type()))?.decode()
    }

    fn encode<T: EventData + serde::Serialize>(data: T, context: Context) -> Event<serde_json::Value> {
        let event = Event::typed(data, context);
        Event {
            event_type: event.event_type,
            data: serde_json::to_value(&event.data).unwrap_or_default(),
            time_fired: event.time_fired,
            context: event.context,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A receiver for typed events
pub struct TypedEventReceiver<T> {
    rx: broadcast::Receiver<Event<serde_json::Value>>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: EventData + serde::de::DeserializeOwned> TypedEventReceiver<T> {
    fn new(rx: broadcast::Receiver<Event<serde_json::Value>>) -> Self {
        Self {
            rx,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Receive the next typed event
    ///
    /// Events whose data does not decode as `T` are skipped.
    pub async fn recv(&mut self) -> Result<Event<T>, broadcast::error::RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if let Some(typed) = event.decode::<T>() {
                return Ok(typed);
            }
        }
    }
}
