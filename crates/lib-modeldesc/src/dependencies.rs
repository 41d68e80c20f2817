//! Dependency decoder.
//!
//! Dependency information for one category of unknowns (outputs,
//! derivatives, discrete states, initial unknowns) is stored row-compressed:
//! a start-index array of length `N + 1` partitions a flat dependency array
//! and a parallel factor-kind array. Row `i` owns the slice
//! `start[i]..start[i + 1]`.
//!
//! The raw encoding uses `0` as a "depends on everything" marker inside an
//! otherwise 1-based index array. Here that marker is the
//! [`Dependency::All`] variant, so it can never be fed to a variable lookup
//! by accident.

use lib_types::DependencyFactorKind;
use std::num::NonZeroUsize;
use thiserror::Error;

/// Unknown categories listed in the model structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DependencyCategory {
    Outputs,
    Derivatives,
    DiscreteStates,
    InitialUnknowns,
}

impl DependencyCategory {
    pub const ALL: [DependencyCategory; 4] = [
        Self::Outputs,
        Self::Derivatives,
        Self::DiscreteStates,
        Self::InitialUnknowns,
    ];

    /// Element name inside `<ModelStructure>`.
    pub fn element_name(self) -> &'static str {
        match self {
            Self::Outputs => "Outputs",
            Self::Derivatives => "Derivatives",
            Self::DiscreteStates => "DiscreteStates",
            Self::InitialUnknowns => "InitialUnknowns",
        }
    }
}

/// One entry of a dependency row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// Nothing more specific was declared: the row depends on all knowns.
    All,
    /// 1-based index into the model's variable table.
    Variable(NonZeroUsize),
}

impl Dependency {
    /// Decode one entry of the raw index array.
    pub fn from_raw(raw: usize) -> Self {
        NonZeroUsize::new(raw).map_or(Self::All, Self::Variable)
    }

    /// Encode back into the raw convention (`0` for [`Dependency::All`]).
    pub fn as_raw(self) -> usize {
        match self {
            Self::All => 0,
            Self::Variable(index) => index.get(),
        }
    }

    /// The 1-based variable index, `None` for the "all" marker.
    pub fn variable_index(self) -> Option<usize> {
        match self {
            Self::All => None,
            Self::Variable(index) => Some(index.get()),
        }
    }
}

/// Inconsistent row-compressed arrays.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("start index array is empty")]
    EmptyStartIndex,

    #[error("start index must begin at 0, found {0}")]
    NonZeroFirstStart(usize),

    #[error("start index decreases at row {row}")]
    NonMonotonic { row: usize },

    #[error("last start index {last} does not match {dependencies} dependencies and {factors} factor kinds")]
    LengthMismatch {
        last: usize,
        dependencies: usize,
        factors: usize,
    },

    #[error("unknown factor kind code {code} at position {position}")]
    UnknownFactorKind { code: u8, position: usize },

    #[error("row {row} lists {dependencies} dependencies but {kinds} factor kinds")]
    KindCountMismatch {
        row: usize,
        dependencies: usize,
        kinds: usize,
    },
}

/// Input for one row when building a record from decoded description data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnknownRow {
    pub dependencies: Vec<Dependency>,
    /// `None` when the description did not declare kinds for this row.
    pub factor_kinds: Option<Vec<DependencyFactorKind>>,
}

/// Row-compressed dependency information for one category.
#[derive(Clone, Debug, PartialEq)]
pub struct DependencyRecord {
    start: Vec<usize>,
    dependencies: Vec<Dependency>,
    factor_kinds: Vec<DependencyFactorKind>,
    kinds_declared: Vec<bool>,
}

impl DependencyRecord {
    /// Validate and decode externally supplied arrays.
    ///
    /// Every factor kind counts as declared, since the raw layout has no
    /// way to say otherwise.
    pub fn from_raw(
        start: &[usize],
        dependencies: &[usize],
        factor_kinds: &[u8],
    ) -> Result<Self, DependencyError> {
        let first = *start.first().ok_or(DependencyError::EmptyStartIndex)?;
        if first != 0 {
            return Err(DependencyError::NonZeroFirstStart(first));
        }
        if let Some(row) = start.windows(2).position(|w| w[1] < w[0]) {
            return Err(DependencyError::NonMonotonic { row });
        }
        let last = start[start.len() - 1];
        if last != dependencies.len() || last != factor_kinds.len() {
            return Err(DependencyError::LengthMismatch {
                last,
                dependencies: dependencies.len(),
                factors: factor_kinds.len(),
            });
        }

        let factor_kinds = factor_kinds
            .iter()
            .enumerate()
            .map(|(position, &code)| {
                DependencyFactorKind::from_raw(code)
                    .ok_or(DependencyError::UnknownFactorKind { code, position })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            start: start.to_vec(),
            dependencies: dependencies.iter().map(|&d| Dependency::from_raw(d)).collect(),
            factor_kinds,
            kinds_declared: vec![true; start.len() - 1],
        })
    }

    /// Compress per-row data. Rows without declared kinds get
    /// [`DependencyFactorKind::Dependent`] for every entry.
    pub fn from_rows<I>(rows: I) -> Result<Self, DependencyError>
    where
        I: IntoIterator<Item = UnknownRow>,
    {
        let mut record = Self {
            start: vec![0],
            dependencies: Vec::new(),
            factor_kinds: Vec::new(),
            kinds_declared: Vec::new(),
        };

        for (row, input) in rows.into_iter().enumerate() {
            let count = input.dependencies.len();
            match input.factor_kinds {
                Some(kinds) => {
                    if kinds.len() != count {
                        return Err(DependencyError::KindCountMismatch {
                            row,
                            dependencies: count,
                            kinds: kinds.len(),
                        });
                    }
                    record.factor_kinds.extend(kinds);
                    record.kinds_declared.push(true);
                }
                None => {
                    record
                        .factor_kinds
                        .extend(std::iter::repeat(DependencyFactorKind::Dependent).take(count));
                    record.kinds_declared.push(false);
                }
            }
            record.dependencies.extend(input.dependencies);
            record.start.push(record.dependencies.len());
        }

        Ok(record)
    }

    /// Number of rows (unknowns) in this category.
    pub fn row_count(&self) -> usize {
        self.start.len() - 1
    }

    pub fn row(&self, index: usize) -> Option<DependencyRow<'_>> {
        if index >= self.row_count() {
            return None;
        }
        let range = self.start[index]..self.start[index + 1];
        Some(DependencyRow {
            index,
            dependencies: &self.dependencies[range.clone()],
            factor_kinds: &self.factor_kinds[range],
            kinds_declared: self.kinds_declared[index],
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = DependencyRow<'_>> + '_ {
        (0..self.row_count()).filter_map(move |i| self.row(i))
    }

    /// Start-index array, length `row_count() + 1`.
    pub fn start_indices(&self) -> &[usize] {
        &self.start
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn factor_kinds(&self) -> &[DependencyFactorKind] {
        &self.factor_kinds
    }

    /// Dependency array in the raw `0 = all` convention.
    pub fn raw_dependencies(&self) -> Vec<usize> {
        self.dependencies.iter().map(|d| d.as_raw()).collect()
    }

    /// Factor kinds as raw codes.
    pub fn raw_factor_kinds(&self) -> Vec<u8> {
        self.factor_kinds.iter().map(|k| *k as u8).collect()
    }

    /// `true` when every row was declared with zero dependencies.
    pub fn is_fully_independent(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Borrowed view of one row.
#[derive(Clone, Copy, Debug)]
pub struct DependencyRow<'a> {
    index: usize,
    dependencies: &'a [Dependency],
    factor_kinds: &'a [DependencyFactorKind],
    kinds_declared: bool,
}

impl<'a> DependencyRow<'a> {
    /// Position of this row within its category.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Declared with no dependencies at all.
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn depends_on_all(&self) -> bool {
        self.dependencies.contains(&Dependency::All)
    }

    /// Whether the factor kinds came from the description or were filled
    /// in with the `Dependent` default.
    pub fn kinds_declared(&self) -> bool {
        self.kinds_declared
    }

    pub fn dependencies(&self) -> &'a [Dependency] {
        self.dependencies
    }

    pub fn factor_kinds(&self) -> &'a [DependencyFactorKind] {
        self.factor_kinds
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dependency, DependencyFactorKind)> + 'a {
        self.dependencies
            .iter()
            .copied()
            .zip(self.factor_kinds.iter().copied())
    }

    /// 1-based variable indices of this row; the "all" marker is skipped.
    pub fn variable_indices(&self) -> impl Iterator<Item = usize> + 'a {
        self.dependencies.iter().filter_map(|d| d.variable_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DependencyFactorKind::*;

    fn var(i: usize) -> Dependency {
        Dependency::Variable(NonZeroUsize::new(i).unwrap())
    }

    #[test]
    fn test_from_raw_layout() {
        let record = DependencyRecord::from_raw(&[0, 2, 2, 3], &[1, 4, 0], &[1, 0, 0]).unwrap();

        assert_eq!(record.row_count(), 3);
        let starts = record.start_indices();
        assert_eq!(starts[0], 0);
        assert_eq!(starts[record.row_count()], record.dependencies().len());
        assert_eq!(record.dependencies().len(), record.factor_kinds().len());

        let row0 = record.row(0).unwrap();
        assert_eq!(row0.dependencies(), &[var(1), var(4)]);
        assert_eq!(row0.factor_kinds(), &[Constant, Dependent]);

        assert!(record.row(1).unwrap().is_empty());
        assert!(!record.row(1).unwrap().depends_on_all());

        let row2 = record.row(2).unwrap();
        assert!(row2.depends_on_all());
        assert_eq!(row2.variable_indices().count(), 0);
        assert!(record.row(3).is_none());
    }

    #[test]
    fn test_from_raw_rejects_bad_layouts() {
        assert_eq!(
            DependencyRecord::from_raw(&[], &[], &[]),
            Err(DependencyError::EmptyStartIndex)
        );
        assert_eq!(
            DependencyRecord::from_raw(&[1, 1], &[2], &[0]),
            Err(DependencyError::NonZeroFirstStart(1))
        );
        assert_eq!(
            DependencyRecord::from_raw(&[0, 2, 1], &[1], &[0]),
            Err(DependencyError::NonMonotonic { row: 1 })
        );
        assert!(matches!(
            DependencyRecord::from_raw(&[0, 2], &[1, 2], &[0]),
            Err(DependencyError::LengthMismatch { last: 2, .. })
        ));
        assert_eq!(
            DependencyRecord::from_raw(&[0, 1], &[1], &[7]),
            Err(DependencyError::UnknownFactorKind { code: 7, position: 0 })
        );
    }

    #[test]
    fn test_sentinel_round_trip() {
        assert_eq!(Dependency::from_raw(0), Dependency::All);
        assert_eq!(Dependency::All.as_raw(), 0);
        assert_eq!(Dependency::All.variable_index(), None);
        assert_eq!(Dependency::from_raw(5).variable_index(), Some(5));
    }

    #[test]
    fn test_from_rows_tracks_declared_kinds() {
        let record = DependencyRecord::from_rows(vec![
            UnknownRow {
                dependencies: vec![var(2), var(3)],
                factor_kinds: Some(vec![Fixed, Tunable]),
            },
            UnknownRow {
                dependencies: vec![Dependency::All],
                factor_kinds: None,
            },
            UnknownRow::default(),
        ])
        .unwrap();

        assert_eq!(record.start_indices(), &[0, 2, 3, 3]);
        assert_eq!(record.raw_dependencies(), vec![2, 3, 0]);
        assert_eq!(record.raw_factor_kinds(), vec![2, 3, 0]);
        assert!(record.row(0).unwrap().kinds_declared());
        assert!(!record.row(1).unwrap().kinds_declared());
        assert!(!record.is_fully_independent());
    }

    #[test]
    fn test_from_rows_kind_count_mismatch() {
        let err = DependencyRecord::from_rows(vec![UnknownRow {
            dependencies: vec![var(1)],
            factor_kinds: Some(vec![]),
        }])
        .unwrap_err();
        assert_eq!(
            err,
            DependencyError::KindCountMismatch {
                row: 0,
                dependencies: 1,
                kinds: 0
            }
        );
    }

    #[test]
    fn test_zero_rows_record() {
        let record = DependencyRecord::from_rows(Vec::new()).unwrap();
        assert_eq!(record.row_count(), 0);
        assert_eq!(record.start_indices(), &[0]);
        assert!(record.is_fully_independent());
    }
}
