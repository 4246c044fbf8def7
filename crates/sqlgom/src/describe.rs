//! Field index cache: column name -> field path, computed once per record type.

use crate::coerce::{SemanticType, TypeHint};
use crate::record::{FieldDecl, FieldKind, Record};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// How one column maps onto a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Lowercased column name.
    pub column: String,
    /// Indices into `declared_fields`, outermost first.
    pub path: Vec<usize>,
    pub semantic: SemanticType,
    pub nullable: bool,
    pub hint: Option<TypeHint>,
    pub key: bool,
    /// The column name came from an explicit column tag. Only tagged fields
    /// and the key are written by INSERT and UPDATE.
    pub tagged: bool,
}

/// Flattened field table for one record type.
///
/// Descriptors keep declaration order (embedded fields appear where the
/// embedding field is declared), which is the column order used for writes.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl FieldMap {
    /// Scan a declaration list.
    ///
    /// Explicit tags win over field names, embedded records are merged into the
    /// same flat map, ignored fields are dropped, and when two fields resolve to
    /// the same column the first one scanned keeps it.
    pub fn from_decls(decls: Vec<FieldDecl>) -> Self {
        let mut map = FieldMap::default();
        map.scan(decls, &mut Vec::new());
        map
    }

    fn scan(&mut self, decls: Vec<FieldDecl>, prefix: &mut Vec<usize>) {
        for (i, decl) in decls.into_iter().enumerate() {
            match decl.kind {
                FieldKind::Ignored => {}
                FieldKind::Embedded(inner) => {
                    prefix.push(i);
                    self.scan(inner(), prefix);
                    prefix.pop();
                }
                FieldKind::Scalar {
                    semantic,
                    nullable,
                    hint,
                    key,
                } => {
                    let column = decl.column.unwrap_or(decl.name).to_lowercase();
                    if self.index.contains_key(&column) {
                        continue;
                    }
                    let mut path = prefix.clone();
                    path.push(i);
                    self.index.insert(column.clone(), self.fields.len());
                    self.fields.push(FieldDescriptor {
                        column,
                        path,
                        semantic,
                        nullable,
                        hint,
                        key,
                        tagged: decl.column.is_some(),
                    });
                }
            }
        }
    }

    /// Case-insensitive lookup by column name.
    pub fn get(&self, column: &str) -> Option<&FieldDescriptor> {
        let idx = match self.index.get(column) {
            Some(idx) => *idx,
            None => *self.index.get(&column.to_lowercase())?,
        };
        self.fields.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The key column: the field marked `key`, else a column named `id`.
    pub fn key(&self) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.key)
            .or_else(|| self.get("id"))
    }
}

type Cache = RwLock<HashMap<TypeId, Arc<FieldMap>>>;

static CACHE: OnceLock<Cache> = OnceLock::new();

fn cache() -> &'static Cache {
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Field map for `T`, computed on first use and shared for the process.
///
/// Two threads racing on the same type may both compute the map; the first
/// one published is kept and returned to both.
pub fn describe<T: Record>() -> Arc<FieldMap> {
    let id = TypeId::of::<T>();
    if let Some(map) = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
    {
        return Arc::clone(map);
    }

    let computed = Arc::new(FieldMap::from_decls(T::declared_fields()));
    tracing::trace!(
        target: "sqlgom.mapper",
        record = std::any::type_name::<T>(),
        columns = computed.len(),
        "described record type"
    );

    let mut guard = cache().write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(guard.entry(id).or_insert(computed))
}

/// Describe every record type registered by the derive. Returns how many
/// registrations were visited.
pub fn prewarm() -> usize {
    let mut n = 0;
    for reg in crate::record::registered_records() {
        (reg.warm)();
        n += 1;
    }
    n
}
