use crate::collation::{self, MatchType};
use crate::error::UnknownCollation;

/// A CALDAV:text-match, as found in prop-filter and param-filter.
///
/// ```xml
/// <!ELEMENT text-match (#PCDATA)>
/// <!ATTLIST text-match collation        CDATA "i;ascii-casemap"
///                      negate-condition (yes | no) "no">
/// ```
///
/// The collation is resolved when the matcher is applied, so an
/// unsupported identifier is reported whatever the candidate is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatcher {
    text: Vec<u8>,
    collation: Option<String>,
    negate_condition: bool,
    match_type: MatchType,
}

impl TextMatcher {
    pub fn new(text: impl Into<Vec<u8>>, collation: Option<&str>) -> Self {
        Self {
            text: text.into(),
            collation: collation.map(str::to_string),
            negate_condition: false,
            match_type: MatchType::default(),
        }
    }

    pub fn negate(mut self, negate_condition: bool) -> Self {
        self.negate_condition = negate_condition;
        self
    }

    pub fn match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// The requested collation, or the default one.
    pub fn collation(&self) -> &str {
        self.collation.as_deref().unwrap_or(collation::ASCII_CASEMAP)
    }

    pub fn is_negated(&self) -> bool {
        self.negate_condition
    }

    pub fn matches(&self, candidate: &[u8]) -> Result<bool, UnknownCollation> {
        let compare = collation::resolve(self.collation())?;
        let is_match = compare(&self.text, candidate, self.match_type);
        Ok(is_match != self.negate_condition)
    }
}
