//! Structural checks of a calendar tree.
//!
//! [`validate_calendar`] only reports: it returns a lazy iterator of
//! human-readable issues and never fails. Rejecting an object is done by
//! [`crate::object::CalendarObject::validate`].

use std::collections::VecDeque;

use crate::tree::{Component, Property};

/// Properties a component MUST carry, RFC 5545 §3.6.
pub fn required_properties(component: &str) -> &'static [&'static str] {
    match component.to_ascii_uppercase().as_str() {
        "VCALENDAR" => &["PRODID", "VERSION"],
        "VEVENT" | "VTODO" | "VJOURNAL" | "VFREEBUSY" => &["UID"],
        "VTIMEZONE" => &["TZID"],
        "VALARM" => &["ACTION", "TRIGGER"],
        "STANDARD" | "DAYLIGHT" => &["DTSTART", "TZOFFSETFROM", "TZOFFSETTO"],
        _ => &[],
    }
}

/// RFC 5545 §3.1: CONTROL = %x00-08 / %x0A-1F / %x7F, HTAB is allowed.
fn is_control(byte: u8) -> bool {
    matches!(byte, 0x00..=0x08 | 0x0A..=0x1F | 0x7F)
}

/// The escape sequence of a byte, rendered as a bytes literal, eg. `b'\\x0c'`.
fn escape(byte: u8) -> String {
    format!("b'\\\\x{:02x}'", byte)
}

/// Issues of a calendar tree, in pre-order: a component's own issues come
/// before those of its children, children in declaration order.
///
/// `strict` also reports missing required properties. Each call walks the
/// tree again, nothing is cached.
pub fn validate_calendar(calendar: &Component, strict: bool) -> Issues<'_> {
    Issues {
        strict,
        stack: vec![calendar],
        pending: VecDeque::new(),
    }
}

#[derive(Debug, Clone)]
pub struct Issues<'a> {
    strict: bool,
    stack: Vec<&'a Component>,
    pending: VecDeque<String>,
}

impl<'a> Iterator for Issues<'a> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(issue) = self.pending.pop_front() {
                return Some(issue);
            }

            let component = self.stack.pop()?;
            self.stack.extend(component.components().iter().rev());
            component_issues(component, self.strict, &mut self.pending);
        }
    }
}

fn component_issues(component: &Component, strict: bool, acc: &mut VecDeque<String>) {
    for prop in component.properties() {
        property_issues(prop, acc);
    }

    if strict {
        for required in required_properties(component.name()) {
            if !component.has_property(required) {
                acc.push_back(format!("Missing required field {}", required));
            }
        }
    }
}

fn property_issues(prop: &Property, acc: &mut VecDeque<String>) {
    let mut seen: Vec<u8> = vec![];
    for byte in prop.value().iter().copied().filter(|b| is_control(*b)) {
        if seen.contains(&byte) {
            continue;
        }
        seen.push(byte);
        acc.push_back(format!(
            "Invalid character {} in field {}",
            escape(byte),
            prop.name()
        ));
    }
}
