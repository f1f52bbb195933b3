//! Catalog resolution: binds operations to their master operations and
//! master operations to registered computations.
//!
//! Everything that can be checked without data is checked here, once, so
//! that row processing only ever deals with typed indices.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;
use tsgrid_core::{MasterId, MasterOperation, Operation, OperationId};

use crate::registry::Registry;
use crate::scheduler::task::{ComputeError, SharedComputation};

/// Fatal catalog integrity failure. Aborts a run before any matrix write.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("operation {operation_id} references master operation {master_id}, which does not exist")]
    MissingMaster {
        operation_id: OperationId,
        master_id: MasterId,
    },
    #[error("master operation {master_id} has malformed code '{code}': {reason}")]
    MalformedCode {
        master_id: MasterId,
        code: String,
        reason: String,
    },
    #[error("master operation {master_id} uses unknown computation '{name}'")]
    UnknownComputation { master_id: MasterId, name: String },
    #[error("master operation {master_id} ('{code}') rejected its arguments: {source}")]
    InvalidArguments {
        master_id: MasterId,
        code: String,
        #[source]
        source: ComputeError,
    },
    #[error("operation {operation_id} code '{code}' does not start with label '{label}' of master operation {master_id}")]
    LabelMismatch {
        operation_id: OperationId,
        master_id: MasterId,
        code: String,
        label: String,
    },
    #[error("operation {operation_id} requests output '{field}', which master operation {master_id} ('{label}') does not declare")]
    UnknownField {
        operation_id: OperationId,
        master_id: MasterId,
        label: String,
        field: String,
    },
    #[error("operation {operation_id} code '{code}' names no output, but master operation {master_id} declares {outputs}")]
    AmbiguousField {
        operation_id: OperationId,
        master_id: MasterId,
        code: String,
        outputs: usize,
    },
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u64 },
    #[error("duplicate master operation label '{0}'")]
    DuplicateLabel(String),
}

/// Which view of the series a master operation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// The series as stored (`x`).
    Raw,
    /// The z-scored series (`y`).
    Normalized,
}

/// Parsed master operation code: `name`, `name(x|y)` or `name(x|y, a, b, ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterCode {
    pub name: String,
    pub input: InputKind,
    pub args: Vec<f64>,
}

impl MasterCode {
    pub fn parse(code: &str) -> Result<Self, String> {
        let code = code.trim();
        let (name, rest) = match code.find('(') {
            Some(open) => {
                let inner = code[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| "missing closing parenthesis".to_string())?;
                (code[..open].trim(), Some(inner))
            }
            None => (code, None),
        };

        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("invalid computation name '{}'", name));
        }

        let mut input = InputKind::Normalized;
        let mut args = Vec::new();
        if let Some(inner) = rest.filter(|s| !s.trim().is_empty()) {
            let mut parts = inner.split(',').map(str::trim);
            input = match parts.next() {
                Some("x") => InputKind::Raw,
                Some("y") => InputKind::Normalized,
                Some(other) => return Err(format!("first argument must be x or y, got '{}'", other)),
                None => InputKind::Normalized,
            };
            for p in parts {
                let v: f64 = p
                    .parse()
                    .map_err(|_| format!("argument '{}' is not a number", p))?;
                args.push(v);
            }
        }

        Ok(Self {
            name: name.to_string(),
            input,
            args,
        })
    }
}

/// A master operation bound to its computation.
pub struct ResolvedMaster {
    pub id: MasterId,
    pub label: String,
    pub input: InputKind,
    pub computation: Arc<dyn SharedComputation>,
}

impl fmt::Debug for ResolvedMaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedMaster")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("input", &self.input)
            .field("computation", &self.computation.name())
            .finish()
    }
}

/// An operation resolved to (master index, output field index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOperation {
    pub id: OperationId,
    pub master: usize,
    pub field: usize,
}

/// Read-only lookup tables shared by all workers during a run.
///
/// `operations` is indexed by matrix column.
#[derive(Debug)]
pub struct ResolvedCatalog {
    masters: Vec<ResolvedMaster>,
    operations: Vec<ResolvedOperation>,
}

impl ResolvedCatalog {
    /// Resolve every master operation and operation against `registry`.
    pub fn resolve(
        operations: &[Operation],
        masters: &[MasterOperation],
        registry: &Registry,
    ) -> Result<Self, CatalogError> {
        let mut master_index: HashMap<MasterId, usize> = HashMap::with_capacity(masters.len());
        let mut labels: HashSet<&str> = HashSet::with_capacity(masters.len());
        let mut resolved_masters = Vec::with_capacity(masters.len());

        for (idx, m) in masters.iter().enumerate() {
            if master_index.insert(m.id, idx).is_some() {
                return Err(CatalogError::DuplicateId {
                    kind: "master operation",
                    id: m.id,
                });
            }
            if !labels.insert(m.label.as_str()) {
                return Err(CatalogError::DuplicateLabel(m.label.clone()));
            }

            let parsed = MasterCode::parse(&m.code).map_err(|reason| CatalogError::MalformedCode {
                master_id: m.id,
                code: m.code.clone(),
                reason,
            })?;
            let entry = registry
                .get(&parsed.name)
                .ok_or_else(|| CatalogError::UnknownComputation {
                    master_id: m.id,
                    name: parsed.name.clone(),
                })?;
            let computation = entry
                .build(&parsed.args)
                .map_err(|source| CatalogError::InvalidArguments {
                    master_id: m.id,
                    code: m.code.clone(),
                    source,
                })?;

            resolved_masters.push(ResolvedMaster {
                id: m.id,
                label: m.label.clone(),
                input: parsed.input,
                computation,
            });
        }

        let mut seen_ops: HashSet<OperationId> = HashSet::with_capacity(operations.len());
        let mut resolved_ops = Vec::with_capacity(operations.len());
        for op in operations {
            if !seen_ops.insert(op.id) {
                return Err(CatalogError::DuplicateId {
                    kind: "operation",
                    id: op.id,
                });
            }
            let &master = master_index
                .get(&op.master_id)
                .ok_or(CatalogError::MissingMaster {
                    operation_id: op.id,
                    master_id: op.master_id,
                })?;
            let m = &resolved_masters[master];
            let outputs = m.computation.outputs();

            let (label, field_name) = op.code_parts();
            if label != m.label {
                return Err(CatalogError::LabelMismatch {
                    operation_id: op.id,
                    master_id: m.id,
                    code: op.code.clone(),
                    label: m.label.clone(),
                });
            }
            let field = match field_name {
                Some(name) => outputs.iter().position(|o| o == name).ok_or_else(|| {
                    CatalogError::UnknownField {
                        operation_id: op.id,
                        master_id: m.id,
                        label: m.label.clone(),
                        field: name.to_string(),
                    }
                })?,
                None if outputs.len() == 1 => 0,
                None => {
                    return Err(CatalogError::AmbiguousField {
                        operation_id: op.id,
                        master_id: m.id,
                        code: op.code.clone(),
                        outputs: outputs.len(),
                    })
                }
            };

            resolved_ops.push(ResolvedOperation {
                id: op.id,
                master,
                field,
            });
        }

        debug!(
            masters = resolved_masters.len(),
            operations = resolved_ops.len(),
            "catalog resolved"
        );

        Ok(Self {
            masters: resolved_masters,
            operations: resolved_ops,
        })
    }

    pub fn masters(&self) -> &[ResolvedMaster] {
        &self.masters
    }

    pub fn master(&self, idx: usize) -> &ResolvedMaster {
        &self.masters[idx]
    }

    /// Operations in column order.
    pub fn operations(&self) -> &[ResolvedOperation] {
        &self.operations
    }

    pub fn operation(&self, col: usize) -> &ResolvedOperation {
        &self.operations[col]
    }

    pub fn num_operations(&self) -> usize {
        self.operations.len()
    }
}
