//! Variable lists.
//!
//! A [`VariableList`] is an ordered view over variables owned by a
//! [`ModelDescription`](crate::ModelDescription). Lists are cheap, independent
//! values: dropping one never touches the variables it points to.

use crate::variable::Variable;
use lib_types::{BaseType, Causality, ValueReference};
use std::ops::Range;

/// Order in which a full variable list is produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Order of appearance in the description.
    #[default]
    Declaration,
    /// Ordinal (byte-wise) comparison of names.
    Name,
    /// Base type first, then value reference ascending; ties keep
    /// declaration order.
    TypeAndValueReference,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableList<'a> {
    variables: Vec<&'a Variable>,
}

impl<'a> VariableList<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// List holding a single variable.
    pub fn single(variable: &'a Variable) -> Self {
        Self {
            variables: vec![variable],
        }
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a Variable> {
        self.variables.get(index).copied()
    }

    pub fn first(&self) -> Option<&'a Variable> {
        self.variables.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Variable> + '_ {
        self.variables.iter().copied()
    }

    pub fn as_slice(&self) -> &[&'a Variable] {
        &self.variables
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.variables.iter().any(|v| std::ptr::eq(*v, variable))
    }

    /// Value references in list order.
    pub fn value_references(&self) -> Vec<ValueReference> {
        self.variables.iter().map(|v| v.value_reference).collect()
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// Contiguous part of the list, `None` if the range is out of bounds.
    pub fn sublist(&self, range: Range<usize>) -> Option<Self> {
        self.variables.get(range).map(|slice| Self {
            variables: slice.to_vec(),
        })
    }

    pub fn filter<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&Variable) -> bool,
    {
        self.variables
            .iter()
            .copied()
            .filter(|v| predicate(v))
            .collect()
    }

    pub fn filter_by_base_type(&self, base_type: BaseType) -> Self {
        self.filter(|v| v.base_type == base_type)
    }

    pub fn filter_by_causality(&self, causality: Causality) -> Self {
        self.filter(|v| v.causality == causality)
    }

    pub fn push(&mut self, variable: &'a Variable) {
        self.variables.push(variable);
    }

    /// Append all variables of `other` to this list.
    pub fn append(&mut self, other: &VariableList<'a>) {
        self.variables.extend_from_slice(&other.variables);
    }

    /// New list with the variables of `self` followed by those of `other`.
    pub fn join(&self, other: &VariableList<'a>) -> Self {
        let mut joined = self.clone();
        joined.append(other);
        joined
    }

    /// Reordered copy of this list.
    pub fn sorted(&self, order: SortOrder) -> Self {
        let mut variables = self.variables.clone();
        match order {
            SortOrder::Declaration => variables.sort_by_key(|v| v.index()),
            SortOrder::Name => variables.sort_by(|a, b| {
                a.name
                    .as_bytes()
                    .cmp(b.name.as_bytes())
                    .then(a.index().cmp(&b.index()))
            }),
            SortOrder::TypeAndValueReference => {
                variables.sort_by_key(|v| (v.base_type, v.value_reference, v.index()))
            }
        }
        Self { variables }
    }
}

impl<'a> FromIterator<&'a Variable> for VariableList<'a> {
    fn from_iter<I: IntoIterator<Item = &'a Variable>>(iter: I) -> Self {
        Self {
            variables: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for VariableList<'a> {
    type Item = &'a Variable;
    type IntoIter = std::vec::IntoIter<&'a Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.into_iter()
    }
}

impl<'a, 'l> IntoIterator for &'l VariableList<'a> {
    type Item = &'a Variable;
    type IntoIter = std::iter::Copied<std::slice::Iter<'l, &'a Variable>>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.iter().copied()
    }
}
