//! Alias groups.
//!
//! Variables that share a base type and value reference denote the same
//! underlying value. Each such group has exactly one base variable; the
//! other members are aliases, possibly sign-negated. Groups are computed
//! once when the model is built.

use crate::error::{DescResult, DescriptionError};
use crate::variable::Variable;
use lib_types::{AliasKind, BaseType, ValueReference};
use std::collections::BTreeMap;

/// Members of one group, ordered base first, then aliases, then negated
/// aliases, each part in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AliasGroup {
    pub(crate) members: Vec<usize>,
}

impl AliasGroup {
    pub(crate) fn base(&self) -> usize {
        self.members[0]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct AliasIndex {
    groups: Vec<AliasGroup>,
}

impl AliasIndex {
    /// Group `variables`, pick each group's base and record every
    /// variable's role and group id.
    ///
    /// `declared[i]` is the `alias` attribute of variable `i`, if any. An
    /// explicit `noAlias` makes that variable the base; otherwise the first
    /// undeclared member in declaration order is the base.
    pub(crate) fn build(variables: &mut [Variable], declared: &[Option<AliasKind>]) -> DescResult<Self> {
        let mut by_reference: BTreeMap<(BaseType, ValueReference), Vec<usize>> = BTreeMap::new();
        for v in variables.iter() {
            by_reference
                .entry((v.base_type, v.value_reference))
                .or_default()
                .push(v.index);
        }

        let mut groups = Vec::with_capacity(by_reference.len());
        for ((base_type, value_reference), members) in by_reference {
            let explicit: Vec<usize> = members
                .iter()
                .copied()
                .filter(|&i| declared[i] == Some(AliasKind::NoAlias))
                .collect();

            let base = match explicit.as_slice() {
                [only] => *only,
                [] => members
                    .iter()
                    .copied()
                    .find(|&i| declared[i].is_none())
                    .ok_or_else(|| {
                        DescriptionError::alias_conflict(
                            base_type,
                            value_reference,
                            "every member is declared as an alias, no base variable",
                        )
                    })?,
                _ => {
                    return Err(DescriptionError::alias_conflict(
                        base_type,
                        value_reference,
                        format!("{} members are declared noAlias", explicit.len()),
                    ))
                }
            };

            let kind_of = |i: usize| {
                if i == base {
                    AliasKind::NoAlias
                } else {
                    match declared[i] {
                        Some(AliasKind::NegatedAlias) => AliasKind::NegatedAlias,
                        _ => AliasKind::Alias,
                    }
                }
            };

            let mut ordered = Vec::with_capacity(members.len());
            ordered.push(base);
            for wanted in [AliasKind::Alias, AliasKind::NegatedAlias] {
                ordered.extend(members.iter().copied().filter(|&i| kind_of(i) == wanted));
            }

            let group_id = groups.len();
            for &i in &ordered {
                variables[i].alias_kind = kind_of(i);
                variables[i].alias_group = group_id;
            }

            if ordered.len() > 1 {
                tracing::trace!(
                    base = %variables[base].name,
                    members = ordered.len(),
                    "Alias group"
                );
            }
            groups.push(AliasGroup { members: ordered });
        }

        Ok(Self { groups })
    }

    pub(crate) fn group(&self, id: usize) -> &AliasGroup {
        &self.groups[id]
    }

    pub(crate) fn len(&self) -> usize {
        self.groups.len()
    }
}
