use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::dataset::DatasetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellTypeId(pub u32);

impl CellTypeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellTypeSet {
    names: Vec<String>,
    index: HashMap<String, CellTypeId>,
}

impl CellTypeSet {
    pub fn new(names: Vec<String>) -> Result<Self, DatasetError> {
        if names.is_empty() {
            return Err(DatasetError::Malformed(
                "reference has no cell types".to_string(),
            ));
        }
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(DatasetError::Malformed(format!(
                    "cell type {} has an empty name",
                    i + 1
                )));
            }
            if index.insert(name.clone(), CellTypeId(i as u32)).is_some() {
                return Err(DatasetError::Malformed(format!(
                    "duplicate cell type name: {name}"
                )));
            }
        }
        Ok(Self { names, index })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, id: CellTypeId) -> &str {
        &self.names[id.index()]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, name: &str) -> Option<CellTypeId> {
        self.index.get(name).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = CellTypeId> + '_ {
        (0..self.names.len()).map(|i| CellTypeId(i as u32))
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/cell_types.rs"]
mod tests;
