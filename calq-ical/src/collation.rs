//! Collation registry, see RFC 4790.
//!
//! CalDAV servers are REQUIRED to support the "i;ascii-casemap" and
//! "i;octet" collations. In the absence of a collation explicitly
//! specified by the client, or if the client specifies the "default"
//! collation identifier, the server MUST default to "i;ascii-casemap".

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::error::UnknownCollation;

pub const ASCII_CASEMAP: &str = "i;ascii-casemap";
pub const OCTET: &str = "i;octet";
pub const DEFAULT: &str = "default";

/// How the target is compared against the candidate value.
/// CalDAV text-match always uses `Equals`, the other kinds are the
/// CardDAV match-type values (RFC 6352 §10.5.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    #[default]
    Equals,
    Contains,
    StartsWith,
    EndsWith,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::StartsWith => "starts-with",
            Self::EndsWith => "ends-with",
        }
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(Self::Equals),
            "contains" => Ok(Self::Contains),
            "starts-with" => Ok(Self::StartsWith),
            "ends-with" => Ok(Self::EndsWith),
            other => Err(format!("unknown match type {}", other)),
        }
    }
}

/// `(target, candidate, match type) -> matches`
pub type Collation = fn(&[u8], &[u8], MatchType) -> bool;

lazy_static! {
    static ref COLLATIONS: HashMap<&'static str, Collation> = {
        let mut registry: HashMap<&'static str, Collation> = HashMap::new();
        registry.insert(ASCII_CASEMAP, ascii_casemap);
        registry.insert(OCTET, octet);
        registry
    };
}

/// Find a collation by its identifier.
pub fn resolve(name: &str) -> Result<Collation, UnknownCollation> {
    let key = match name {
        DEFAULT => ASCII_CASEMAP,
        other => other,
    };
    COLLATIONS
        .get(key)
        .copied()
        .ok_or_else(|| UnknownCollation(name.to_string()))
}

/// Supported identifiers, for the supported-collation-set property.
pub fn names() -> Vec<&'static str> {
    let mut all: Vec<_> = COLLATIONS.keys().copied().collect();
    all.sort_unstable();
    all
}

fn ascii_casemap(target: &[u8], candidate: &[u8], kind: MatchType) -> bool {
    compare(target, candidate, kind, |a, b| a.eq_ignore_ascii_case(&b))
}

fn octet(target: &[u8], candidate: &[u8], kind: MatchType) -> bool {
    compare(target, candidate, kind, |a, b| a == b)
}

fn compare(target: &[u8], candidate: &[u8], kind: MatchType, eq: impl Fn(u8, u8) -> bool) -> bool {
    let same = |a: &[u8], b: &[u8]| a.len() == b.len() && a.iter().zip(b).all(|(x, y)| eq(*x, *y));
    match kind {
        MatchType::Equals => same(target, candidate),
        MatchType::StartsWith => {
            candidate.len() >= target.len() && same(target, &candidate[..target.len()])
        }
        MatchType::EndsWith => {
            candidate.len() >= target.len()
                && same(target, &candidate[candidate.len() - target.len()..])
        }
        MatchType::Contains => {
            target.is_empty() || candidate.windows(target.len()).any(|w| same(target, w))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_collations() {
        let casemap = resolve(ASCII_CASEMAP).unwrap();
        assert!(casemap(b"foobar", b"FOOBAR", MatchType::Equals));
        assert!(!casemap(b"foobar", b"fobar", MatchType::Equals));

        let octet = resolve(OCTET).unwrap();
        assert!(!octet(b"foobar", b"FOOBAR", MatchType::Equals));
        assert!(octet(b"foobar", b"foobar", MatchType::Equals));
    }

    #[test]
    fn default_is_ascii_casemap() {
        let collation = resolve(DEFAULT).unwrap();
        assert!(collation(b"MiXeD", b"mixed", MatchType::Equals));
    }

    #[test]
    fn casemap_only_folds_ascii() {
        let casemap = resolve(ASCII_CASEMAP).unwrap();
        assert!(!casemap("é".as_bytes(), "É".as_bytes(), MatchType::Equals));
        assert!(casemap("café".as_bytes(), "CAFé".as_bytes(), MatchType::Equals));
    }

    #[test]
    fn match_types() {
        let casemap = resolve(ASCII_CASEMAP).unwrap();
        assert!(casemap(b"some", b"do SOMEthing", MatchType::Contains));
        assert!(casemap(b"do", b"DO something", MatchType::StartsWith));
        assert!(casemap(b"thing", b"do someTHING", MatchType::EndsWith));
        assert!(!casemap(b"something long", b"thing", MatchType::EndsWith));
        assert!(casemap(b"", b"anything", MatchType::Contains));
    }

    #[test]
    fn unknown_collation() {
        assert_eq!(
            resolve("i;blah").unwrap_err(),
            UnknownCollation("i;blah".into())
        );
    }

    #[test]
    fn advertised_names() {
        assert_eq!(names(), vec![ASCII_CASEMAP, OCTET]);
    }
}
