//! Does a component overlap a time range, RFC 4791 §9.9.
//!
//! Recurrence rules are not expanded: only the master instance is placed
//! in time.

use chrono::{DateTime, TimeDelta, Utc};

use crate::filter::{ComponentKind, TimeRange};
use crate::parser;
use crate::tree::Component;

fn prop_date(component: &Component, name: &str) -> Option<DateTime<Utc>> {
    component
        .property(name)
        .and_then(|p| p.value_str())
        .and_then(parser::date_time)
}

fn prop_duration(component: &Component, name: &str) -> Option<TimeDelta> {
    component
        .property(name)
        .and_then(|p| p.value_str())
        .and_then(parser::duration)
}

/// `instant + delta`, clamped to the representable instants.
fn shift(instant: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    instant.checked_add_signed(delta).unwrap_or(match delta < TimeDelta::zero() {
        true => DateTime::<Utc>::MIN_UTC,
        false => DateTime::<Utc>::MAX_UTC,
    })
}

/// Absolute trigger time of a VALARM, `parent` being the VEVENT or VTODO
/// holding it.
pub fn resolve_trigger(parent: Option<&Component>, alarm: &Component) -> Option<DateTime<Utc>> {
    let trigger = alarm.property("TRIGGER")?;

    let is_absolute = trigger
        .param("VALUE")
        .and_then(|p| p.value())
        .map(|v| v.eq_ignore_ascii_case("DATE-TIME"))
        .unwrap_or(false);
    if is_absolute {
        let final_date = prop_date(alarm, "TRIGGER");
        tracing::trace!(trigger=?final_date, "resolved absolute trigger");
        return final_date;
    }

    let time_delta = trigger.value_str().and_then(parser::duration)?;
    let parent = parent?;

    // If the trigger is set relative to START, then the "DTSTART" property MUST be present in the associated
    // "VEVENT" or "VTODO" calendar component.
    //
    // If an alarm is specified for an event with the trigger set relative to the END,
    // then the "DTEND" property or the "DTSTART" and "DURATION " properties MUST be present
    // in the associated "VEVENT" calendar component.
    //
    // If the alarm is specified for a to-do with a trigger set relative to the END,
    // then either the "DUE" property or the "DTSTART" and "DURATION " properties
    // MUST be present in the associated "VTODO" calendar component.
    let related_to_end = trigger
        .param("RELATED")
        .and_then(|p| p.value())
        .map(|v| v.eq_ignore_ascii_case("END"))
        .unwrap_or(false);
    let parent_date = match related_to_end {
        false => prop_date(parent, "DTSTART"),
        true => {
            let explicit_end = match ComponentKind::from_name(parent.name()) {
                ComponentKind::VTodo => prop_date(parent, "DUE"),
                _ => prop_date(parent, "DTEND"),
            };
            explicit_end.or_else(|| {
                prop_date(parent, "DTSTART")?.checked_add_signed(prop_duration(parent, "DURATION")?)
            })
        }
    }?;

    let final_date = parent_date.checked_add_signed(time_delta)?;
    tracing::trace!(trigger=?final_date, "resolved relative trigger");
    Some(final_date)
}

/// `parent` is only needed to place VALARM components.
pub fn is_component_in_range(
    parent: Option<&Component>,
    component: &Component,
    time_range: &TimeRange,
) -> bool {
    let (start, end) = time_range.bounds();

    match ComponentKind::from_name(component.name()) {
        ComponentKind::VEvent => {
            let dtstart = match prop_date(component, "DTSTART") {
                Some(v) => v,
                _ => return false,
            };
            let maybe_dtend = prop_date(component, "DTEND");
            let maybe_duration =
                prop_duration(component, "DURATION").map(|d| std::cmp::max(d, TimeDelta::zero()));

            match (maybe_dtend, maybe_duration) {
                //       | Y | N | N | * | (start <  DTEND AND end > DTSTART)            |
                (Some(dtend), _) => start < dtend && end > dtstart,
                //       | N | Y | Y | * | (start <  DTSTART+DURATION AND end > DTSTART) |
                //       | N | Y | N | * | (start <= DTSTART AND end > DTSTART)          |
                (None, Some(duration)) if duration > TimeDelta::zero() => {
                    start < shift(dtstart, duration) && end > dtstart
                }
                //       | N | N | N | Y | (start <= DTSTART AND end > DTSTART)          |
                _ => start <= dtstart && end > dtstart,
            }
        }
        ComponentKind::VTodo => {
            let maybe_dtstart = prop_date(component, "DTSTART");
            let maybe_due = prop_date(component, "DUE");
            let maybe_completed = prop_date(component, "COMPLETED");
            let maybe_created = prop_date(component, "CREATED");
            let maybe_duration = prop_duration(component, "DURATION");

            match (
                maybe_dtstart,
                maybe_duration,
                maybe_due,
                maybe_completed,
                maybe_created,
            ) {
                //    | Y | Y | N | * | * | (start  <= DTSTART+DURATION)  AND             |
                //    |   |   |   |   |   | ((end   >  DTSTART)  OR                       |
                //    |   |   |   |   |   |  (end   >= DTSTART+DURATION))                 |
                (Some(dtstart), Some(duration), None, _, _) => {
                    let due = shift(dtstart, duration);
                    start <= due && (end > dtstart || end >= due)
                }
                //    | Y | N | Y | * | * | ((start <  DUE)      OR  (start <= DTSTART))  |
                //    |   |   |   |   |   | AND                                           |
                //    |   |   |   |   |   | ((end   >  DTSTART)  OR  (end   >= DUE))      |
                (Some(dtstart), None, Some(due), _, _) => {
                    (start < due || start <= dtstart) && (end > dtstart || end >= due)
                }
                //    | Y | N | N | * | * | (start  <= DTSTART)  AND (end >  DTSTART)     |
                (Some(dtstart), None, None, _, _) => start <= dtstart && end > dtstart,
                //    | N | N | Y | * | * | (start  <  DUE)      AND (end >= DUE)         |
                (None, None, Some(due), _, _) => start < due && end >= due,
                //    | N | N | N | Y | Y | ((start <= CREATED)  OR  (start <= COMPLETED))|
                //    |   |   |   |   |   | AND                                           |
                //    |   |   |   |   |   | ((end   >= CREATED)  OR  (end   >= COMPLETED))|
                (None, None, None, Some(completed), Some(created)) => {
                    (start <= created || start <= completed) && (end >= created || end >= completed)
                }
                //    | N | N | N | Y | N | (start  <= COMPLETED) AND (end  >= COMPLETED) |
                (None, None, None, Some(completed), None) => start <= completed && end >= completed,
                //    | N | N | N | N | Y | (end    >  CREATED)                           |
                (None, None, None, None, Some(created)) => end > created,
                //    | N | N | N | N | N | TRUE                                          |
                _ => true,
            }
        }
        ComponentKind::VJournal => match prop_date(component, "DTSTART") {
            //    | Y | Y | (start <= DTSTART)     AND (end > DTSTART) |
            Some(dtstart) => start <= dtstart && end > dtstart,
            //    | N | * | FALSE                                      |
            None => false,
        },
        ComponentKind::VAlarm => match resolve_trigger(parent, component) {
            //  (start <= trigger-time) AND (end > trigger-time)
            Some(trigger_time) => start <= trigger_time && end > trigger_time,
            _ => false,
        },
        kind => {
            tracing::debug!(?kind, "time-range not supported on this component");
            false
        }
    }
}
