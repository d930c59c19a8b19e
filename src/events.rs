//! Typed events pushed by the engine while it digests modem lines.
//!
//! Delivery is a publish/subscribe channel: the engine publishes without
//! ever blocking, subscribers that fall behind lose the oldest events
//! first. Publication happens on the engine task before the triggering
//! command completes, so an event is always observable no later than the
//! command that caused it.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubBehavior, PubSubChannel, Subscriber};

use crate::config::{EVENT_QUEUE_LEN, MAX_EVENT_SUBSCRIBERS};
use crate::error::Error;
use crate::types::{CallInfo, MemoryKind, RegistrationStatus, SimState};

/// Something the modem reported on its own, or as a side effect of a
/// command, that an application typically wants to react to.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// `+CPIN` reported a SIM state.
    SimState(SimState),
    /// `+CREG` reported a registration change.
    Registration(RegistrationStatus),
    /// `+CLCC` reported a call appearing, progressing or ending.
    CallChanged(CallInfo),
    /// The service centre accepted an outgoing message.
    SmsSent { reference: u16 },
    /// `+CMTI`: a new message was stored.
    SmsReceived { mem: MemoryKind, pos: u16 },
}

pub type EventSubscription<'a> = Subscriber<
    'a,
    CriticalSectionRawMutex,
    Event,
    EVENT_QUEUE_LEN,
    MAX_EVENT_SUBSCRIBERS,
    1,
>;

pub struct EventChannel {
    channel: PubSubChannel<CriticalSectionRawMutex, Event, EVENT_QUEUE_LEN, MAX_EVENT_SUBSCRIBERS, 1>,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventChannel {
    pub const fn new() -> Self {
        Self {
            channel: PubSubChannel::new(),
        }
    }

    /// Attach a subscriber; fails once all subscriber slots are taken.
    pub fn subscribe(&self) -> Result<EventSubscription<'_>, Error> {
        self.channel.subscriber().map_err(|_| Error::Busy)
    }

    pub(crate) fn publish(&self, event: Event) {
        self.channel.publish_immediate(event);
    }
}
