//! CALDAV:filter predicate tree (RFC 4791 §9.7).
//!
//! The tree is built by the query layer and only read by the engine in
//! [`crate::query`]. A node either checks presence, absence
//! (`IsNotDefined`) or runs nested predicates; the enums below make those
//! three cases exclusive.

use chrono::{DateTime, Utc};

use crate::text::TextMatcher;
use crate::tree::VCALENDAR;

/// Name:  filter
///
/// Purpose:  Specifies a filter to limit the set of calendar components
/// returned by the server.
///
/// ```xml
/// <!ELEMENT filter (comp-filter)>
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarFilter {
    /// CALDAV:timezone used to resolve floating times. Kept for the
    /// query layer, the engine reads floating times as UTC.
    pub timezone: Option<String>,
    pub filter: CompFilter,
}

impl CalendarFilter {
    pub fn new(filter: CompFilter) -> Self {
        Self {
            timezone: None,
            filter,
        }
    }

    /// The trivial filter: any calendar object.
    pub fn any() -> Self {
        Self::new(CompFilter::new(VCALENDAR))
    }
}

/// Name:  comp-filter
///
/// Purpose:  Specifies search criteria on calendar components.
///
/// ```xml
/// <!ELEMENT comp-filter (is-not-defined | (time-range?,
///                        prop-filter*, comp-filter*))>
///
/// <!ATTLIST comp-filter name CDATA #REQUIRED>
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CompFilter {
    pub name: String,
    /// `None` checks the component exists.
    pub additional_rules: Option<CompFilterRules>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompFilterRules {
    IsNotDefined,
    Matches(CompFilterMatch),
}

/// Nested predicates: the time range and every prop-filter must match,
/// and when comp-filters are present at least one of them must match a
/// direct child of the component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompFilterMatch {
    pub time_range: Option<TimeRange>,
    pub prop_filter: Vec<PropFilter>,
    pub comp_filter: Vec<CompFilter>,
}

impl CompFilter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            additional_rules: None,
        }
    }

    pub fn is_not_defined(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            additional_rules: Some(CompFilterRules::IsNotDefined),
        }
    }

    pub fn matching(name: &str, matcher: CompFilterMatch) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            additional_rules: Some(CompFilterRules::Matches(matcher)),
        }
    }

    /// A comp-filter only made of child comp-filters.
    pub fn with_children(name: &str, children: Vec<CompFilter>) -> Self {
        Self::matching(
            name,
            CompFilterMatch {
                comp_filter: children,
                ..Default::default()
            },
        )
    }

    /// Every text-match of this subtree, in depth-first order.
    pub fn text_matches(&self) -> Vec<&TextMatcher> {
        let mut acc = vec![];
        if let Some(CompFilterRules::Matches(m)) = &self.additional_rules {
            for prop in m.prop_filter.iter() {
                prop.collect_text_matches(&mut acc);
            }
            for comp in m.comp_filter.iter() {
                acc.extend(comp.text_matches());
            }
        }
        acc
    }
}

impl CompFilterMatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn prop(mut self, filter: PropFilter) -> Self {
        self.prop_filter.push(filter);
        self
    }

    pub fn comp(mut self, filter: CompFilter) -> Self {
        self.comp_filter.push(filter);
        self
    }
}

/// Name:  prop-filter
///
/// Purpose:  Specifies search criteria on calendar properties.
///
/// ```xml
/// <!ELEMENT prop-filter (is-not-defined |
///                        ((time-range | text-match)?,
///                         param-filter*))>
///
/// <!ATTLIST prop-filter name CDATA #REQUIRED>
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PropFilter {
    pub name: String,
    pub additional_rules: Option<PropFilterRules>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropFilterRules {
    IsNotDefined,
    Match(PropFilterMatch),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropFilterMatch {
    pub time_or_text: Option<TimeOrText>,
    pub param_filter: Vec<ParamFilter>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimeOrText {
    Time(TimeRange),
    Text(TextMatcher),
}

impl PropFilter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            additional_rules: None,
        }
    }

    pub fn is_not_defined(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            additional_rules: Some(PropFilterRules::IsNotDefined),
        }
    }

    pub fn matching(name: &str, matcher: PropFilterMatch) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            additional_rules: Some(PropFilterRules::Match(matcher)),
        }
    }

    pub fn text(name: &str, text: TextMatcher) -> Self {
        Self::matching(
            name,
            PropFilterMatch {
                time_or_text: Some(TimeOrText::Text(text)),
                param_filter: vec![],
            },
        )
    }

    fn collect_text_matches<'a>(&'a self, acc: &mut Vec<&'a TextMatcher>) {
        if let Some(PropFilterRules::Match(m)) = &self.additional_rules {
            if let Some(TimeOrText::Text(txt)) = &m.time_or_text {
                acc.push(txt);
            }
            for param in m.param_filter.iter() {
                if let Some(ParamFilterMatch::Match(txt)) = &param.additional_rules {
                    acc.push(txt);
                }
            }
        }
    }
}

/// Name:  param-filter
///
/// Purpose:  Limits the search to specific parameter values.
///
/// ```xml
/// <!ELEMENT param-filter (is-not-defined | text-match?)>
///
/// <!ATTLIST param-filter name CDATA #REQUIRED>
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParamFilter {
    pub name: String,
    pub additional_rules: Option<ParamFilterMatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamFilterMatch {
    IsNotDefined,
    Match(TextMatcher),
}

impl ParamFilter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            additional_rules: None,
        }
    }

    pub fn is_not_defined(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            additional_rules: Some(ParamFilterMatch::IsNotDefined),
        }
    }

    pub fn text(name: &str, text: TextMatcher) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            additional_rules: Some(ParamFilterMatch::Match(text)),
        }
    }
}

/// Name:  time-range
///
/// ```xml
/// <!ELEMENT time-range EMPTY>
///
/// <!ATTLIST time-range start CDATA #IMPLIED
///                      end   CDATA #IMPLIED>
/// start value: an iCalendar "date with UTC time"
/// end value: an iCalendar "date with UTC time"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    OnlyStart(DateTime<Utc>),
    OnlyEnd(DateTime<Utc>),
    FullRange(DateTime<Utc>, DateTime<Utc>),
}

impl TimeRange {
    /// Open bounds are replaced by the extreme instants.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        match *self {
            Self::OnlyStart(start) => (start, DateTime::<Utc>::MAX_UTC),
            Self::OnlyEnd(end) => (DateTime::<Utc>::MIN_UTC, end),
            Self::FullRange(start, end) => (start, end),
        }
    }

    /// `start <= instant < end`
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds();
        start <= instant && instant < end
    }
}

/// Component types the engine knows how to place in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    VCalendar,
    VEvent,
    VTodo,
    VJournal,
    VFreeBusy,
    VTimeZone,
    VAlarm,
    Standard,
    Daylight,
    Other,
}

impl ComponentKind {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "VCALENDAR" => Self::VCalendar,
            "VEVENT" => Self::VEvent,
            "VTODO" => Self::VTodo,
            "VJOURNAL" => Self::VJournal,
            "VFREEBUSY" => Self::VFreeBusy,
            "VTIMEZONE" => Self::VTimeZone,
            "VALARM" => Self::VAlarm,
            "STANDARD" => Self::Standard,
            "DAYLIGHT" => Self::Daylight,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn names_are_canonical() {
        assert_eq!(CompFilter::new("vtodo").name, "VTODO");
        assert_eq!(PropFilter::new("summary").name, "SUMMARY");
        assert_eq!(ParamFilter::new("partstat").name, "PARTSTAT");
    }

    #[test]
    fn collects_text_matches() {
        let filter = CompFilter::with_children(
            "VCALENDAR",
            vec![CompFilter::matching(
                "VEVENT",
                CompFilterMatch::new()
                    .prop(PropFilter::text("SUMMARY", TextMatcher::new("a", None)))
                    .prop(PropFilter::matching(
                        "ATTENDEE",
                        PropFilterMatch {
                            time_or_text: None,
                            param_filter: vec![ParamFilter::text(
                                "PARTSTAT",
                                TextMatcher::new("b", Some("i;octet")),
                            )],
                        },
                    )),
            )],
        );
        let texts: Vec<_> = filter.text_matches().into_iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec![b"a".as_slice(), b"b".as_slice()]);
    }

    #[test]
    fn time_range_is_half_open() {
        let start = Utc.with_ymd_and_hms(2006, 1, 4, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2006, 1, 5, 0, 0, 0).unwrap();
        let range = TimeRange::FullRange(start, end);
        assert!(range.contains(start));
        assert!(!range.contains(end));
        assert!(TimeRange::OnlyStart(start).contains(end));
        assert!(!TimeRange::OnlyEnd(start).contains(end));
    }

    #[test]
    fn component_kinds() {
        assert_eq!(ComponentKind::from_name("vevent"), ComponentKind::VEvent);
        assert_eq!(ComponentKind::from_name("X-THING"), ComponentKind::Other);
    }
}
