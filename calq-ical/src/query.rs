//! Evaluate a CALDAV:filter against a calendar object.
//!
//! A comp-filter only looks at the components it is given: the root for
//! the top-level filter, the direct children of the matched parent for a
//! nested one. When several components share the filtered name, the
//! filter matches if any of them does. Repeated properties and parameters
//! follow the same rule.

use crate::collation;
use crate::error::QueryError;
use crate::filter::{
    CalendarFilter, CompFilter, CompFilterMatch, CompFilterRules, ParamFilter, ParamFilterMatch,
    PropFilter, PropFilterMatch, PropFilterRules, TimeOrText,
};
use crate::object::CalendarObject;
use crate::parser;
use crate::timerange;
use crate::tree::{Component, Property};

impl CalendarFilter {
    /// `name` identifies the object in logs only.
    pub fn check(&self, name: &str, obj: &CalendarObject) -> Result<bool, QueryError> {
        self.filter.check(name, obj)
    }
}

impl CompFilter {
    /// Match this filter against the root of `obj`.
    ///
    /// Every collation of the filter is resolved first, so an unsupported
    /// one is reported whatever the object contains.
    pub fn check(&self, name: &str, obj: &CalendarObject) -> Result<bool, QueryError> {
        for text in self.text_matches() {
            collation::resolve(text.collation())?;
        }

        let is_match = is_component_match(None, std::slice::from_ref(obj.calendar()), self)?;
        tracing::debug!(file = name, filter = %self.name, is_match, "calendar-query filter");
        Ok(is_match)
    }
}

pub fn is_component_match(
    parent: Option<&Component>,
    components: &[Component],
    filter: &CompFilter,
) -> Result<bool, QueryError> {
    let mut candidates = components.iter().filter(|c| c.is(&filter.name));

    match &filter.additional_rules {
        None => Ok(candidates.next().is_some()),
        Some(CompFilterRules::IsNotDefined) => Ok(candidates.next().is_none()),
        Some(CompFilterRules::Matches(matcher)) => {
            for candidate in candidates {
                if is_instance_match(parent, candidate, matcher)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn is_instance_match(
    parent: Option<&Component>,
    component: &Component,
    matcher: &CompFilterMatch,
) -> Result<bool, QueryError> {
    if let Some(time_range) = &matcher.time_range {
        if !timerange::is_component_in_range(parent, component, time_range) {
            return Ok(false);
        }
    }

    if !is_properties_match(component, &matcher.prop_filter)? {
        return Ok(false);
    }

    if matcher.comp_filter.is_empty() {
        return Ok(true);
    }

    // any sibling comp-filter is enough
    for inner_filter in matcher.comp_filter.iter() {
        if is_component_match(Some(component), component.components(), inner_filter)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn is_properties_match(component: &Component, filters: &[PropFilter]) -> Result<bool, QueryError> {
    for single_filter in filters.iter() {
        if !is_property_match(component, single_filter)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_property_match(component: &Component, filter: &PropFilter) -> Result<bool, QueryError> {
    let mut instances = component.properties_named(&filter.name);

    match &filter.additional_rules {
        None => Ok(instances.next().is_some()),
        Some(PropFilterRules::IsNotDefined) => Ok(instances.next().is_none()),
        Some(PropFilterRules::Match(pattern)) => {
            for prop in instances {
                if is_property_instance_match(prop, pattern)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn is_property_instance_match(prop: &Property, pattern: &PropFilterMatch) -> Result<bool, QueryError> {
    let is_value_match = match &pattern.time_or_text {
        None => true,
        Some(TimeOrText::Text(txt_match)) => txt_match.matches(prop.value())?,
        Some(TimeOrText::Time(time_range)) => prop
            .value_str()
            .and_then(parser::date_time)
            .map(|instant| time_range.contains(instant))
            .unwrap_or(false),
    };
    if !is_value_match {
        return Ok(false);
    }

    for single_param_filter in pattern.param_filter.iter() {
        if !is_param_match(prop, single_param_filter)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_param_match(prop: &Property, filter: &ParamFilter) -> Result<bool, QueryError> {
    let mut instances = prop.params_named(&filter.name);

    match &filter.additional_rules {
        None => Ok(instances.next().is_some()),
        Some(ParamFilterMatch::IsNotDefined) => Ok(instances.next().is_none()),
        Some(ParamFilterMatch::Match(txt_match)) => {
            for param in instances {
                let param_val = match param.value() {
                    Some(v) => v,
                    None => continue,
                };
                if txt_match.matches(param_val.as_bytes())? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}
