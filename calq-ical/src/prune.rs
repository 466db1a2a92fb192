//! Partial retrieval of calendar data, RFC 4791 §9.6.1.
//!
//! ```xml
//! <!ELEMENT comp ((allprop | prop*), (allcomp | comp*))>
//! <!ATTLIST comp name CDATA #REQUIRED>
//! <!ELEMENT prop EMPTY>
//! <!ATTLIST prop name CDATA #REQUIRED
//!                novalue (yes | no) "no">
//! ```

use crate::tree::Component;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompSelection {
    pub name: String,
    /// `None` keeps every property.
    pub prop_kind: Option<PropKind>,
    /// `None` keeps every sub-component.
    pub comp_kind: Option<CompKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropKind {
    AllProp,
    Prop(Vec<PropSelection>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropSelection {
    pub name: String,
    pub novalue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompKind {
    AllComp,
    Comp(Vec<CompSelection>),
}

impl CompSelection {
    pub fn all(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            prop_kind: None,
            comp_kind: None,
        }
    }
}

/// Copy of `src` restricted to the selection, `None` if `src` is not the
/// selected component.
pub fn component(src: &Component, prune: &CompSelection) -> Option<Component> {
    if !src.is(&prune.name) {
        return None;
    }

    let properties = match &prune.prop_kind {
        Some(PropKind::AllProp) | None => src.properties().to_vec(),
        Some(PropKind::Prop(l)) => src
            .properties()
            .iter()
            .filter_map(|prop| {
                let sel_filt = l.iter().find(|filt| filt.name.eq_ignore_ascii_case(prop.name()))?;
                match sel_filt.novalue {
                    false => Some(prop.clone()),
                    true => Some(prop.without_value()),
                }
            })
            .collect::<Vec<_>>(),
    };

    let components = match &prune.comp_kind {
        Some(CompKind::AllComp) | None => src.components().to_vec(),
        Some(CompKind::Comp(many_inner_prune)) => src
            .components()
            .iter()
            .filter_map(|src_component| {
                many_inner_prune
                    .iter()
                    .find_map(|inner_prune| component(src_component, inner_prune))
            })
            .collect::<Vec<_>>(),
    };

    Some(Component::from_parts(src.name(), properties, components))
}
