use super::event::ReconstructedEvent;

/// Sort events by time, earliest first. The sort is stable, so events with equal times keep
/// their ingestion order.
pub fn order_events(events: &mut [ReconstructedEvent]) {
    events.sort_by_key(|event| event.time);
}
