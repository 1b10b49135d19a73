use crate::models::event::Event;
use crate::models::filter::FilterCriteria;

/// Keep the events that pass `criteria`, in input order.
///
/// A missing magnitude or depth never excludes an event.
pub fn filter_events(events: &[Event], criteria: &FilterCriteria) -> Vec<Event> {
    events
        .iter()
        .filter(|ev| passes(ev, criteria))
        .cloned()
        .collect()
}

pub fn passes(ev: &Event, criteria: &FilterCriteria) -> bool {
    let mag_ok = ev.mag.map_or(true, |mag| mag >= criteria.min_mag);
    let depth_ok = match (ev.depth_km, criteria.max_depth_km) {
        (Some(depth), Some(max)) => depth <= max,
        _ => true,
    };
    mag_ok && depth_ok
}
