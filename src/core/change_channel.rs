//! # Change Channel
//!
//! A typed publish/subscribe channel. Publishers push events into every live subscriber
//! queue; subscribers drain their queue whenever they are ready (the chunk renderer does it
//! once per frame). Nothing ever holds a pointer back into a subscriber, so a subscriber
//! going away simply stops receiving events.

use std::collections::VecDeque;

use super::StResource;

/// The publishing side of a change channel.
#[derive(Debug)]
pub struct ChangeChannel<T> {
    subscribers: Vec<StResource<VecDeque<T>>>,
}

/// The receiving side of a change channel.
///
/// Dropping the subscription unregisters it; the channel prunes its queue on the next
/// notification.
#[derive(Debug)]
pub struct Subscription<T> {
    queue: StResource<VecDeque<T>>,
}

impl<T: Clone> ChangeChannel<T> {
    /// Creates a channel without subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Registers a new subscriber. Only events published after this call are delivered.
    pub fn subscribe(&mut self) -> Subscription<T> {
        let queue = StResource::new(VecDeque::new());
        self.subscribers.push(queue.clone());
        Subscription { queue }
    }

    /// Delivers `event` to every live subscriber.
    pub fn notify(&mut self, event: T) {
        self.subscribers.retain(|queue| queue.owners() > 1);
        for queue in &self.subscribers {
            queue.get_mut().push_back(event.clone());
        }
    }

    /// Number of subscribers that were alive at the last notification.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|queue| queue.owners() > 1)
            .count()
    }
}

impl<T: Clone> Default for ChangeChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Subscription<T> {
    /// Removes and returns every queued event in publication order.
    pub fn drain(&self) -> Vec<T> {
        self.queue.get_mut().drain(..).collect()
    }

    /// Returns `true` if no event is waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.get().is_empty()
    }

    /// Number of events waiting.
    pub fn len(&self) -> usize {
        self.queue.get().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_every_subscriber_in_order() {
        let mut channel = ChangeChannel::new();
        let first = channel.subscribe();
        let second = channel.subscribe();

        channel.notify(1);
        channel.notify(2);

        assert_eq!(first.drain(), vec![1, 2]);
        assert_eq!(second.drain(), vec![1, 2]);
        assert!(first.is_empty());
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let mut channel = ChangeChannel::new();
        let kept = channel.subscribe();
        let dropped = channel.subscribe();
        assert_eq!(channel.subscriber_count(), 2);

        drop(dropped);
        channel.notify("edit");

        assert_eq!(channel.subscriber_count(), 1);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let mut channel = ChangeChannel::new();
        channel.notify(5);
        let late = channel.subscribe();
        assert!(late.is_empty(), "events published before subscribing must not be replayed");
    }
}
