//! Groups a row's selected operations by the master operation they read,
//! so each master is evaluated once per row.

use std::collections::BTreeMap;

use crate::catalog::ResolvedCatalog;

/// One master operation and the selected columns that depend on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterGroup {
    /// Index into [`ResolvedCatalog::masters`].
    pub master: usize,
    /// Matrix columns, in the order they were selected.
    pub columns: Vec<usize>,
}

/// Group `columns` by master, ordered by master index.
pub fn group_by_master(columns: &[usize], catalog: &ResolvedCatalog) -> Vec<MasterGroup> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &col in columns {
        groups
            .entry(catalog.operation(col).master)
            .or_default()
            .push(col);
    }
    groups
        .into_iter()
        .map(|(master, columns)| MasterGroup { master, columns })
        .collect()
}
