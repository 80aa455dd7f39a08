//! Live delivery of notification events to connected sessions

mod hub;
mod messages;

pub use hub::{
    HubState, LiveUpdateHub, Subscription, SubscriptionHandle, DEFAULT_SUBSCRIBER_BUFFER,
};
pub use messages::{msg_types, ServerMessage};
