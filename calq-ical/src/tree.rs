//! Owned, read-only view of an iCalendar document.
//!
//! The `icalendar` parser borrows from the unfolded text and does not
//! consider VCALENDAR as a component, so its output is copied into this
//! tree with a real VCALENDAR root. Property and parameter names are
//! upper-cased on the way in, lookups fold the requested name the same way.
//!
//! A component keeps every instance of a repeated property in declaration
//! order: `properties_named` returns all of them, `property` the first one.

use std::fmt;

use crate::error::ObjectError;

pub const VCALENDAR: &str = "VCALENDAR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    value: Option<String>,
}

impl Parameter {
    pub fn new(name: &str, value: Option<&str>) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            value: value.map(str::to_string),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    params: Vec<Parameter>,
    value: Vec<u8>,
}

impl Property {
    pub fn new(name: &str, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            params: vec![],
            value: value.into(),
        }
    }

    pub fn with_param(mut self, name: &str, value: Option<&str>) -> Self {
        self.params.push(Parameter::new(name, value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw value, as stored.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    /// A copy of this property without its value (`novalue="yes"`).
    pub fn without_value(&self) -> Self {
        Self {
            name: self.name.clone(),
            params: self.params.clone(),
            value: vec![],
        }
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn params_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Parameter> + 'a {
        self.params
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    name: String,
    properties: Vec<Property>,
    components: Vec<Component>,
}

impl Component {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            properties: vec![],
            components: vec![],
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub(crate) fn from_parts(
        name: &str,
        properties: Vec<Property>,
        components: Vec<Component>,
    ) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            properties,
            components,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn components_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Component> + 'a {
        self.components.iter().filter(move |c| c.is(name))
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn properties_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Property> + 'a {
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }
}

/// Unfold and parse an iCalendar text into a tree rooted at VCALENDAR.
pub fn read_calendar(text: &str) -> Result<Component, ObjectError> {
    let unfolded = icalendar::parser::unfold(text);
    let parsed = icalendar::parser::read_calendar(&unfolded)
        .map_err(|e| ObjectError::Parse(e.to_string()))?;

    let root = match (parsed.properties.is_empty(), parsed.components.as_slice()) {
        (true, [single]) if single.name.as_str().eq_ignore_ascii_case(VCALENDAR) => {
            Component::from(single)
        }
        _ => Component::from_parts(
            VCALENDAR,
            parsed.properties.iter().map(Property::from).collect(),
            parsed.components.iter().map(Component::from).collect(),
        ),
    };
    tracing::trace!(
        components = root.components.len(),
        properties = root.properties.len(),
        "parsed calendar"
    );
    Ok(root)
}

impl<'a> From<&icalendar::parser::Property<'a>> for Property {
    fn from(src: &icalendar::parser::Property<'a>) -> Self {
        Self {
            name: src.name.as_str().to_ascii_uppercase(),
            params: src
                .params
                .iter()
                .map(|p| Parameter::new(p.key.as_str(), p.val.as_ref().map(|v| v.as_str())))
                .collect(),
            value: src.val.as_str().as_bytes().to_vec(),
        }
    }
}

impl<'a> From<&icalendar::parser::Component<'a>> for Component {
    fn from(src: &icalendar::parser::Component<'a>) -> Self {
        Self::from_parts(
            src.name.as_str(),
            src.properties.iter().map(Property::from).collect(),
            src.components.iter().map(Component::from).collect(),
        )
    }
}

// RFC 5545 §3.1: lines SHOULD NOT be longer than 75 octets, excluding the
// line break. Continuation lines start with a single space.
const MAX_LINE: usize = 75;

fn write_folded(f: &mut fmt::Formatter<'_>, line: &str) -> fmt::Result {
    let mut rest = line;
    let mut limit = MAX_LINE;
    while rest.len() > limit {
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        write!(f, "{}\r\n ", &rest[..cut])?;
        rest = &rest[cut..];
        limit = MAX_LINE - 1;
    }
    write!(f, "{}\r\n", rest)
}

/// RFC 6868 caret encoding: `^` as `^^`, newline as `^n`, `"` as `^'`.
fn caret_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '^' => out.push_str("^^"),
            '\n' => out.push_str("^n"),
            '"' => out.push_str("^'"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match &self.value {
            None => return write!(f, "{}", self.name),
            Some(v) => caret_encode(v),
        };
        match value.contains([':', ';', ',']) {
            true => write!(f, "{}=\"{}\"", self.name, value),
            false => write!(f, "{}={}", self.name, value),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = self.name.clone();
        for param in self.params.iter() {
            line.push_str(&format!(";{}", param));
        }
        line.push(':');
        line.push_str(&String::from_utf8_lossy(&self.value));
        write_folded(f, &line)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BEGIN:{}\r\n", self.name)?;
        for property in self.properties.iter() {
            write!(f, "{}", property)?;
        }
        for component in self.components.iter() {
            write!(f, "{}", component)?;
        }
        write!(f, "END:{}\r\n", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICS: &str = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "PRODID:-//Example Corp.//CalDAV Client//EN\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:20010712T182145Z-123401@example.com\r\n",
        "SUMMARY:Weekly\r\n",
        "  meeting\r\n",
        "ATTENDEE;PARTSTAT=ACCEPTED:mailto:cyrus@example.com\r\n",
        "ATTENDEE;PARTSTAT=DECLINED:mailto:lisa@example.com\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n",
    );

    #[test]
    fn root_is_vcalendar() {
        let root = read_calendar(ICS).unwrap();
        assert_eq!(root.name(), VCALENDAR);
        assert_eq!(root.property("version").unwrap().value(), b"2.0");
        assert_eq!(root.components().len(), 1);
        assert!(root.components()[0].is("vevent"));
    }

    #[test]
    fn repeated_properties_are_kept() {
        let root = read_calendar(ICS).unwrap();
        let vevent = &root.components()[0];
        let attendees: Vec<_> = vevent
            .properties_named("Attendee")
            .map(|p| p.value_str().unwrap())
            .collect();
        assert_eq!(
            attendees,
            vec!["mailto:cyrus@example.com", "mailto:lisa@example.com"]
        );
        assert_eq!(
            vevent.property("ATTENDEE").unwrap().param("partstat").unwrap().value(),
            Some("ACCEPTED")
        );
    }

    #[test]
    fn folded_lines_are_unfolded() {
        let root = read_calendar(ICS).unwrap();
        let summary = root.components()[0].property("SUMMARY").unwrap();
        assert_eq!(summary.value_str(), Some("Weekly meeting"));
    }

    #[test]
    fn missing_property() {
        let root = read_calendar(ICS).unwrap();
        assert!(root.property("UID").is_none());
        assert!(!root.has_property("UID"));
        assert!(root.components()[0].has_property("uid"));
    }

    #[test]
    fn display_folds_long_lines() {
        let long = "x".repeat(100);
        let comp = Component::new("vtodo").with_property(Property::new("summary", long.clone()));
        let txt = comp.to_string();
        assert!(txt.starts_with("BEGIN:VTODO\r\n"));
        assert!(txt.ends_with("END:VTODO\r\n"));
        assert!(txt.lines().all(|l| l.trim_end_matches('\r').len() <= MAX_LINE));

        let back = read_calendar(&format!("BEGIN:VCALENDAR\r\n{}END:VCALENDAR\r\n", txt)).unwrap();
        assert_eq!(
            back.components()[0].property("SUMMARY").unwrap().value(),
            long.as_bytes()
        );
    }

    #[test]
    fn display_quotes_parameters() {
        let prop = Property::new("ATTENDEE", "mailto:a@ex.com")
            .with_param("DELEGATED-FROM", Some("mailto:b@ex.com"))
            .with_param("RSVP", Some("TRUE"));
        assert_eq!(
            prop.to_string(),
            "ATTENDEE;DELEGATED-FROM=\"mailto:b@ex.com\";RSVP=TRUE:mailto:a@ex.com\r\n"
        );
    }

    #[test]
    fn display_caret_encodes_parameters() {
        let prop = Property::new("ATTENDEE", "mailto:a@ex.com")
            .with_param("CN", Some("George \"The Boss\" ^2\nHR"));
        assert_eq!(
            prop.to_string(),
            "ATTENDEE;CN=George ^'The Boss^' ^^2^nHR:mailto:a@ex.com\r\n"
        );
    }

    #[test]
    fn display_folding_boundary() {
        // "SUMMARY:" is 8 octets
        let exact = Property::new("SUMMARY", "x".repeat(MAX_LINE - 8));
        assert_eq!(exact.to_string(), format!("SUMMARY:{}\r\n", "x".repeat(MAX_LINE - 8)));

        let over = Property::new("SUMMARY", "x".repeat(MAX_LINE - 7));
        assert_eq!(
            over.to_string(),
            format!("SUMMARY:{}\r\n x\r\n", "x".repeat(MAX_LINE - 8))
        );
    }
}
