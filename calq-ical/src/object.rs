use std::sync::OnceLock;

use crate::error::{InvalidFileContents, MissingUid, ObjectError};
use crate::prune::{self, CompSelection};
use crate::tree::{self, Component, VCALENDAR};
use crate::validate::{validate_calendar, Issues};

pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar";

/// A stored calendar object resource: the parsed VCALENDAR tree and its
/// content type.
///
/// The tree is never modified once parsed. The UID and the strict
/// validation outcome are computed on first use and kept.
#[derive(Debug, Clone)]
pub struct CalendarObject {
    content_type: String,
    calendar: Component,
    uid: OnceLock<Option<String>>,
    strict_issues: OnceLock<Vec<String>>,
}

fn is_calendar_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case(CALENDAR_CONTENT_TYPE)
}

impl CalendarObject {
    /// Parse an object delivered in one or more chunks.
    pub fn from_chunks<B: AsRef<[u8]>>(chunks: &[B], content_type: &str) -> Result<Self, ObjectError> {
        if !is_calendar_content_type(content_type) {
            return Err(ObjectError::UnsupportedContentType(content_type.to_string()));
        }

        let raw = chunks.iter().fold(Vec::new(), |mut acc, chunk| {
            acc.extend_from_slice(chunk.as_ref());
            acc
        });
        let text = std::str::from_utf8(&raw)?;
        let calendar = tree::read_calendar(text).map_err(|e| {
            tracing::warn!(err=%e, "unable to parse calendar object");
            e
        })?;

        Self::from_calendar(calendar, content_type)
    }

    pub fn from_calendar(calendar: Component, content_type: &str) -> Result<Self, ObjectError> {
        if !calendar.is(VCALENDAR) {
            return Err(ObjectError::UnexpectedRoot(calendar.name().to_string()));
        }
        Ok(Self {
            content_type: content_type.to_string(),
            calendar,
            uid: OnceLock::new(),
            strict_issues: OnceLock::new(),
        })
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The VCALENDAR root.
    pub fn calendar(&self) -> &Component {
        &self.calendar
    }

    /// First sub-component that is not a time zone definition.
    pub fn primary(&self) -> Option<&Component> {
        self.calendar
            .components()
            .iter()
            .find(|c| !c.is("VTIMEZONE"))
    }

    /// UID of the primary sub-component.
    pub fn get_uid(&self) -> Result<&str, MissingUid> {
        self.uid
            .get_or_init(|| {
                self.primary()
                    .and_then(|c| c.property("UID"))
                    .map(|p| String::from_utf8_lossy(p.value()).into_owned())
            })
            .as_deref()
            .ok_or(MissingUid)
    }

    /// The raw issue sequence, used on read paths: it never fails.
    pub fn issues(&self, strict: bool) -> Issues<'_> {
        validate_calendar(&self.calendar, strict)
    }

    /// Strict validation, used before accepting a write.
    ///
    /// Missing required fields are errors here, so an object without UID is
    /// rejected. Ingestion paths that must accept such objects should read
    /// `issues(false)` instead.
    pub fn validate(&self) -> Result<(), InvalidFileContents> {
        let issues = self
            .strict_issues
            .get_or_init(|| self.issues(true).collect());

        if issues.is_empty() {
            return Ok(());
        }

        tracing::debug!(issues=?issues, "calendar object rejected");
        Err(InvalidFileContents {
            content_type: self.content_type.clone(),
            issues: issues.clone(),
        })
    }

    /// Short human description, for logs.
    pub fn describe(&self) -> Option<String> {
        self.primary()
            .and_then(|c| c.property("SUMMARY"))
            .map(|p| String::from_utf8_lossy(p.value()).into_owned())
    }

    /// A copy restricted to the selected components and properties.
    pub fn partial(&self, selection: &CompSelection) -> Option<CalendarObject> {
        let calendar = prune::component(&self.calendar, selection)?;
        Self::from_calendar(calendar, &self.content_type).ok()
    }

    /// Serialize back to iCalendar text.
    pub fn to_ics(&self) -> String {
        self.calendar.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prune::{CompKind, PropKind, PropSelection};

    const EXAMPLE_VCALENDAR1: &[u8] = b"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//bitfire web engineering//DAVdroid 0.8.0 (ical4j 1.0.x)//EN
BEGIN:VTODO
CREATED:20150314T223512Z
DTSTAMP:20150527T221952Z
LAST-MODIFIED:20150314T223512Z
STATUS:NEEDS-ACTION
SUMMARY:do something
UID:bdc22720-b9e1-42c9-89c2-a85405d8fbff
END:VTODO
END:VCALENDAR
";

    const EXAMPLE_VCALENDAR_NO_UID: &[u8] = b"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//bitfire web engineering//DAVdroid 0.8.0 (ical4j 1.0.x)//EN
BEGIN:VTODO
CREATED:20120314T223512Z
DTSTAMP:20130527T221952Z
LAST-MODIFIED:20150314T223512Z
STATUS:NEEDS-ACTION
SUMMARY:do something without uid
END:VTODO
END:VCALENDAR
";

    const EXAMPLE_VCALENDAR_INVALID_CHAR: &[u8] = b"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//bitfire web engineering//DAVdroid 0.8.0 (ical4j 1.0.x)//EN
BEGIN:VTODO
CREATED:20150314T223512Z
DTSTAMP:20150527T221952Z
LAST-MODIFIED:20150314T223512Z
STATUS:NEEDS-ACTION
SUMMARY:do some\x0cthing
ID:bdc22720-b9e1-42c9-89c2-a85405d8fbff
END:VTODO
END:VCALENDAR
";

    fn parse(raw: &[u8]) -> CalendarObject {
        CalendarObject::from_chunks(&[raw], "text/calendar").unwrap()
    }

    #[test]
    fn extract_str() {
        let fi = parse(EXAMPLE_VCALENDAR1);
        assert_eq!(fi.get_uid(), Ok("bdc22720-b9e1-42c9-89c2-a85405d8fbff"));
        assert_eq!(fi.validate(), Ok(()));
    }

    #[test]
    fn extract_no_uid() {
        let fi = parse(EXAMPLE_VCALENDAR_NO_UID);
        assert_eq!(
            fi.issues(true).collect::<Vec<_>>(),
            vec!["Missing required field UID"]
        );
        assert_eq!(fi.issues(false).count(), 0);
        assert_eq!(fi.get_uid(), Err(MissingUid));
        assert_eq!(
            fi.validate(),
            Err(InvalidFileContents {
                content_type: "text/calendar".into(),
                issues: vec!["Missing required field UID".into()],
            })
        );
    }

    #[test]
    fn invalid_character() {
        let fi = parse(EXAMPLE_VCALENDAR_INVALID_CHAR);
        assert!(fi.validate().is_err());
        assert_eq!(
            fi.issues(false).collect::<Vec<_>>(),
            vec!["Invalid character b'\\\\x0c' in field SUMMARY"]
        );
        assert_eq!(
            fi.issues(true).collect::<Vec<_>>(),
            vec![
                "Invalid character b'\\\\x0c' in field SUMMARY",
                "Missing required field UID",
            ]
        );
    }

    #[test]
    fn validate_is_idempotent() {
        let fi = parse(EXAMPLE_VCALENDAR_NO_UID);
        assert_eq!(fi.validate(), fi.validate());
        assert_eq!(
            fi.issues(true).collect::<Vec<_>>(),
            fi.issues(true).collect::<Vec<_>>()
        );
    }

    #[test]
    fn chunks_are_merged() {
        let (head, tail) = EXAMPLE_VCALENDAR1.split_at(100);
        let fi = CalendarObject::from_chunks(&[head, tail], "text/calendar; charset=utf-8").unwrap();
        assert_eq!(fi.get_uid(), Ok("bdc22720-b9e1-42c9-89c2-a85405d8fbff"));
        assert_eq!(fi.content_type(), "text/calendar; charset=utf-8");
    }

    #[test]
    fn rejects_other_content_types() {
        assert!(matches!(
            CalendarObject::from_chunks(&[EXAMPLE_VCALENDAR1], "text/vcard"),
            Err(ObjectError::UnsupportedContentType(_))
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(matches!(
            CalendarObject::from_chunks(&[b"BEGIN:VCALENDAR\n\xff\n".as_slice()], "text/calendar"),
            Err(ObjectError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn rejects_non_calendar_root() {
        assert!(matches!(
            CalendarObject::from_calendar(Component::new("VEVENT"), "text/calendar"),
            Err(ObjectError::UnexpectedRoot(name)) if name == "VEVENT"
        ));
    }

    #[test]
    fn describe_and_serialize() {
        let fi = parse(EXAMPLE_VCALENDAR1);
        assert_eq!(fi.describe().as_deref(), Some("do something"));

        let again = CalendarObject::from_chunks(&[fi.to_ics().as_bytes()], "text/calendar").unwrap();
        assert_eq!(again.calendar(), fi.calendar());
    }

    #[test]
    fn partial_retrieval() {
        let fi = parse(EXAMPLE_VCALENDAR1);
        let selection = CompSelection {
            name: "VCALENDAR".into(),
            prop_kind: Some(PropKind::Prop(vec![])),
            comp_kind: Some(CompKind::Comp(vec![CompSelection {
                name: "VTODO".into(),
                prop_kind: Some(PropKind::Prop(vec![PropSelection {
                    name: "UID".into(),
                    novalue: false,
                }])),
                comp_kind: None,
            }])),
        };
        let partial = fi.partial(&selection).unwrap();
        assert!(partial.calendar().properties().is_empty());
        assert_eq!(partial.primary().unwrap().properties().len(), 1);
        assert_eq!(partial.get_uid(), fi.get_uid());
    }
}
