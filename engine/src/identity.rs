//! FILENAME: engine/src/identity.rs
//! PURPOSE: Row Identity Index - stable ids for rows and nested child rows.
//! CONTEXT: Ids are assigned in traversal order (pre-order, roots first) and are
//! never reassigned or reused while the index lives. The lookup stores the
//! position path of each row, so it is rebuilt after every structural mutation.
//! The counter is scoped to the index instance and reset only on full data
//! replacement.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::row::{Row, RowId};

/// Position of a row: index among the roots, then index within each
/// successive children collection.
pub type RowPath = SmallVec<[usize; 4]>;

#[derive(Debug, Clone, Default)]
pub struct RowIdentityIndex {
    /// Next id to hand out.
    next_id: RowId,

    /// id -> position path, covering roots and all descendants.
    paths: FxHashMap<RowId, RowPath>,
}

impl RowIdentityIndex {
    pub fn new() -> Self {
        RowIdentityIndex::default()
    }

    /// Forgets every id and restarts the counter from zero.
    pub fn reset(&mut self) {
        self.next_id = 0;
        self.paths.clear();
    }

    pub fn next_id(&self) -> RowId {
        self.next_id
    }

    /// Assigns the next unused id to every row (recursively) that lacks one.
    /// Returns how many ids were handed out.
    pub fn assign_ids(&mut self, rows: &mut [Row], children_field: &str) -> usize {
        // Ids supplied by the host must never collide with generated ones.
        if let Some(max) = max_existing_id(rows, children_field) {
            self.next_id = self.next_id.max(max + 1);
        }
        self.assign_level(rows, children_field)
    }

    fn assign_level(&mut self, rows: &mut [Row], children_field: &str) -> usize {
        let mut assigned = 0;
        for row in rows.iter_mut() {
            if row.id.is_none() {
                row.id = Some(self.next_id);
                self.next_id += 1;
                assigned += 1;
            }
            if let Some(children) = row.children_mut(children_field) {
                assigned += self.assign_level(children, children_field);
            }
        }
        assigned
    }

    /// Rebuilds the id -> row lookup from scratch over the same traversal.
    pub fn build_index(&mut self, rows: &[Row], children_field: &str) {
        self.paths.clear();
        let mut path = RowPath::new();
        self.index_level(rows, children_field, &mut path);
    }

    fn index_level(&mut self, rows: &[Row], children_field: &str, path: &mut RowPath) {
        for (position, row) in rows.iter().enumerate() {
            path.push(position);
            if let Some(id) = row.id {
                self.paths.insert(id, path.clone());
            }
            if let Some(children) = row.children(children_field) {
                self.index_level(children, children_field, path);
            }
            path.pop();
        }
    }

    /// `assign_ids` followed by `build_index`.
    pub fn reindex(&mut self, rows: &mut [Row], children_field: &str) {
        self.assign_ids(rows, children_field);
        self.build_index(rows, children_field);
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.paths.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn path(&self, id: RowId) -> Option<&[usize]> {
        self.paths.get(&id).map(|p| p.as_slice())
    }

    pub fn get<'a>(&self, rows: &'a [Row], id: RowId, children_field: &str) -> Option<&'a Row> {
        let path = self.paths.get(&id)?;
        resolve_path(rows, path, children_field)
    }

    pub fn get_mut<'a>(
        &self,
        rows: &'a mut [Row],
        id: RowId,
        children_field: &str,
    ) -> Option<&'a mut Row> {
        let path = self.paths.get(&id)?;
        resolve_path_mut(rows, path, children_field)
    }
}

fn max_existing_id(rows: &[Row], children_field: &str) -> Option<RowId> {
    rows.iter()
        .flat_map(|row| {
            let own = row.id;
            let nested = row
                .children(children_field)
                .and_then(|children| max_existing_id(children, children_field));
            own.into_iter().chain(nested)
        })
        .max()
}

/// Follows a position path from the roots.
pub fn resolve_path<'a>(rows: &'a [Row], path: &[usize], children_field: &str) -> Option<&'a Row> {
    let (first, rest) = path.split_first()?;
    let mut current = rows.get(*first)?;
    for position in rest {
        current = current.children(children_field)?.get(*position)?;
    }
    Some(current)
}

pub fn resolve_path_mut<'a>(
    rows: &'a mut [Row],
    path: &[usize],
    children_field: &str,
) -> Option<&'a mut Row> {
    let (first, rest) = path.split_first()?;
    let mut current = rows.get_mut(*first)?;
    for position in rest {
        current = current.children_mut(children_field)?.get_mut(*position)?;
    }
    Some(current)
}
