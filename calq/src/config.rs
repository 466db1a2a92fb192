use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use calq_ical::collation::MatchType;
use calq_ical::filter::{
    CalendarFilter, CompFilter, CompFilterMatch, ParamFilter, PropFilter, PropFilterMatch,
    TimeOrText, TimeRange,
};
use calq_ical::{parser, TextMatcher};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub filters: HashMap<String, FilterConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ValidationConfig {
    #[serde(default = "default_strict")]
    pub strict: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict: default_strict(),
        }
    }
}

fn default_strict() -> bool {
    true
}

/// A comp-filter, as written in the configuration file.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FilterConfig {
    pub name: String,
    #[serde(default)]
    pub is_not_defined: bool,
    pub timezone: Option<String>,
    pub time_range: Option<TimeRangeConfig>,
    #[serde(default)]
    pub prop: Vec<PropConfig>,
    #[serde(default)]
    pub comp: Vec<FilterConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PropConfig {
    pub name: String,
    #[serde(default)]
    pub is_not_defined: bool,
    pub text: Option<TextConfig>,
    pub time_range: Option<TimeRangeConfig>,
    #[serde(default)]
    pub param: Vec<ParamConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ParamConfig {
    pub name: String,
    #[serde(default)]
    pub is_not_defined: bool,
    pub text: Option<TextConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TextConfig {
    pub value: String,
    pub collation: Option<String>,
    #[serde(default)]
    pub negate: bool,
    pub match_type: Option<String>,
}

/// Bounds are iCalendar "date with UTC time" values, eg. `20060104T000000Z`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TimeRangeConfig {
    pub start: Option<String>,
    pub end: Option<String>,
}

pub fn read_config(config_file: PathBuf) -> Result<Config> {
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .open(config_file.as_path())?;

    let mut config = String::new();
    file.read_to_string(&mut config)?;

    Ok(toml::from_str(&config)?)
}

impl Config {
    pub fn filter(&self, name: &str) -> Result<CalendarFilter> {
        let raw = self
            .filters
            .get(name)
            .ok_or_else(|| anyhow!("No filter named {} in the configuration", name))?;
        CalendarFilter::try_from(raw).with_context(|| format!("filter {}", name))
    }
}

impl TryFrom<&FilterConfig> for CalendarFilter {
    type Error = anyhow::Error;

    fn try_from(value: &FilterConfig) -> Result<Self> {
        Ok(CalendarFilter {
            timezone: value.timezone.clone(),
            filter: CompFilter::try_from(value)?,
        })
    }
}

impl TryFrom<&FilterConfig> for CompFilter {
    type Error = anyhow::Error;

    fn try_from(value: &FilterConfig) -> Result<Self> {
        let has_children =
            value.time_range.is_some() || !value.prop.is_empty() || !value.comp.is_empty();

        match (value.is_not_defined, has_children) {
            (true, true) => bail!(
                "comp-filter {} can't be both is_not_defined and have nested filters",
                value.name
            ),
            (true, false) => Ok(CompFilter::is_not_defined(&value.name)),
            (false, false) => Ok(CompFilter::new(&value.name)),
            (false, true) => {
                let mut matcher = CompFilterMatch::new();
                if let Some(range) = &value.time_range {
                    matcher = matcher.time_range(TimeRange::try_from(range)?);
                }
                for prop in value.prop.iter() {
                    matcher = matcher.prop(PropFilter::try_from(prop)?);
                }
                for comp in value.comp.iter() {
                    matcher = matcher.comp(CompFilter::try_from(comp)?);
                }
                Ok(CompFilter::matching(&value.name, matcher))
            }
        }
    }
}

impl TryFrom<&PropConfig> for PropFilter {
    type Error = anyhow::Error;

    fn try_from(value: &PropConfig) -> Result<Self> {
        let time_or_text = match (&value.text, &value.time_range) {
            (Some(_), Some(_)) => bail!(
                "prop-filter {} can't have both a text and a time_range",
                value.name
            ),
            (Some(text), None) => Some(TimeOrText::Text(TextMatcher::try_from(text)?)),
            (None, Some(range)) => Some(TimeOrText::Time(TimeRange::try_from(range)?)),
            (None, None) => None,
        };
        let has_children = time_or_text.is_some() || !value.param.is_empty();

        match (value.is_not_defined, has_children) {
            (true, true) => bail!(
                "prop-filter {} can't be both is_not_defined and have nested filters",
                value.name
            ),
            (true, false) => Ok(PropFilter::is_not_defined(&value.name)),
            (false, false) => Ok(PropFilter::new(&value.name)),
            (false, true) => Ok(PropFilter::matching(
                &value.name,
                PropFilterMatch {
                    time_or_text,
                    param_filter: value
                        .param
                        .iter()
                        .map(ParamFilter::try_from)
                        .collect::<Result<Vec<_>>>()?,
                },
            )),
        }
    }
}

impl TryFrom<&ParamConfig> for ParamFilter {
    type Error = anyhow::Error;

    fn try_from(value: &ParamConfig) -> Result<Self> {
        match (value.is_not_defined, &value.text) {
            (true, Some(_)) => bail!(
                "param-filter {} can't be both is_not_defined and have a text",
                value.name
            ),
            (true, None) => Ok(ParamFilter::is_not_defined(&value.name)),
            (false, None) => Ok(ParamFilter::new(&value.name)),
            (false, Some(text)) => Ok(ParamFilter::text(&value.name, TextMatcher::try_from(text)?)),
        }
    }
}

impl TryFrom<&TextConfig> for TextMatcher {
    type Error = anyhow::Error;

    fn try_from(value: &TextConfig) -> Result<Self> {
        let match_type = match &value.match_type {
            Some(raw) => raw.parse::<MatchType>().map_err(|e| anyhow!(e))?,
            None => MatchType::default(),
        };
        Ok(TextMatcher::new(value.value.as_str(), value.collation.as_deref())
            .negate(value.negate)
            .match_type(match_type))
    }
}

impl TryFrom<&TimeRangeConfig> for TimeRange {
    type Error = anyhow::Error;

    fn try_from(value: &TimeRangeConfig) -> Result<Self> {
        let parse = |raw: &String| {
            parser::date_time(raw).ok_or_else(|| anyhow!("Invalid time-range bound {}", raw))
        };
        match (&value.start, &value.end) {
            (Some(start), Some(end)) => Ok(TimeRange::FullRange(parse(start)?, parse(end)?)),
            (Some(start), None) => Ok(TimeRange::OnlyStart(parse(start)?)),
            (None, Some(end)) => Ok(TimeRange::OnlyEnd(parse(end)?)),
            (None, None) => bail!("time-range needs at least a start or an end"),
        }
    }
}
