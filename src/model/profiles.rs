use std::collections::HashMap;

use crate::model::cell_types::{CellTypeId, CellTypeSet};
use crate::model::dataset::DatasetError;
use crate::model::genes::GeneList;

// Gene-major rates: `rates[g * n_types + t]`.
#[derive(Debug, Clone)]
pub struct ReferenceProfiles {
    genes: Vec<String>,
    gene_index: HashMap<String, usize>,
    cell_types: CellTypeSet,
    rates: Vec<f64>,
    platform_effect: Vec<f64>,
}

impl ReferenceProfiles {
    pub fn new(
        genes: Vec<String>,
        cell_types: CellTypeSet,
        rates: Vec<f64>,
    ) -> Result<Self, DatasetError> {
        let n_types = cell_types.len();
        if genes.is_empty() {
            return Err(DatasetError::Malformed("reference has no genes".to_string()));
        }
        if rates.len() != genes.len() * n_types {
            return Err(DatasetError::Malformed(format!(
                "reference has {} rates for {} genes x {} cell types",
                rates.len(),
                genes.len(),
                n_types
            )));
        }
        let mut gene_index = HashMap::with_capacity(genes.len());
        for (i, gene) in genes.iter().enumerate() {
            if gene_index.insert(gene.clone(), i).is_some() {
                return Err(DatasetError::Malformed(format!(
                    "duplicate gene in reference: {gene}"
                )));
            }
        }
        for (idx, &rate) in rates.iter().enumerate() {
            if !rate.is_finite() || rate < 0.0 {
                return Err(DatasetError::Malformed(format!(
                    "reference rate {rate} for gene {} / {} is negative or non-finite",
                    genes[idx / n_types],
                    cell_types.names()[idx % n_types]
                )));
            }
        }
        let profiles = Self {
            platform_effect: vec![1.0; genes.len()],
            genes,
            gene_index,
            cell_types,
            rates,
        };
        for t in profiles.cell_types.ids() {
            if profiles.column_total(t) <= 0.0 {
                return Err(DatasetError::Malformed(format!(
                    "cell type {} has no expression in the reference",
                    profiles.cell_types.name(t)
                )));
            }
        }
        Ok(profiles)
    }

    pub fn with_platform_effects(
        mut self,
        effects: &[(String, f64)],
    ) -> Result<Self, DatasetError> {
        for (gene, effect) in effects {
            if !effect.is_finite() || *effect <= 0.0 {
                return Err(DatasetError::Malformed(format!(
                    "platform effect {effect} for gene {gene} must be finite and positive"
                )));
            }
            if let Some(&g) = self.gene_index.get(gene) {
                self.platform_effect[g] = *effect;
            } else {
                tracing::debug!(gene = %gene, "platform effect for gene absent from reference ignored");
            }
        }
        Ok(self)
    }

    pub fn renormalized(&self) -> ReferenceProfiles {
        let n_types = self.cell_types.len();
        let mut rates = self.rates.clone();
        for (g, &effect) in self.platform_effect.iter().enumerate() {
            for value in &mut rates[g * n_types..(g + 1) * n_types] {
                *value *= effect;
            }
        }
        let mut totals = vec![0f64; n_types];
        for row in rates.chunks_exact(n_types) {
            for (total, &value) in totals.iter_mut().zip(row) {
                *total += value;
            }
        }
        for row in rates.chunks_exact_mut(n_types) {
            for (value, &total) in row.iter_mut().zip(&totals) {
                if total > 0.0 {
                    *value /= total;
                }
            }
        }
        ReferenceProfiles {
            genes: self.genes.clone(),
            gene_index: self.gene_index.clone(),
            cell_types: self.cell_types.clone(),
            rates,
            platform_effect: vec![1.0; self.genes.len()],
        }
    }

    pub fn restrict(&self, gene_list: &GeneList) -> Result<ProfileMatrix, DatasetError> {
        let n_types = self.cell_types.len();
        let mut rows = Vec::with_capacity(gene_list.len() * n_types);
        for gene in gene_list.genes() {
            let g = self
                .gene_index
                .get(gene)
                .copied()
                .ok_or_else(|| DatasetError::MissingGene {
                    gene: gene.clone(),
                    table: "reference",
                })?;
            rows.extend_from_slice(self.row(g));
        }
        Ok(ProfileMatrix {
            n_genes: gene_list.len(),
            n_types,
            rows,
        })
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn gene_position(&self, gene: &str) -> Option<usize> {
        self.gene_index.get(gene).copied()
    }

    pub fn cell_types(&self) -> &CellTypeSet {
        &self.cell_types
    }

    pub fn platform_effect(&self) -> &[f64] {
        &self.platform_effect
    }

    pub fn row(&self, gene: usize) -> &[f64] {
        let n_types = self.cell_types.len();
        &self.rates[gene * n_types..(gene + 1) * n_types]
    }

    pub fn rate(&self, gene: usize, cell_type: CellTypeId) -> f64 {
        self.row(gene)[cell_type.index()]
    }

    fn column_total(&self, cell_type: CellTypeId) -> f64 {
        (0..self.genes.len())
            .map(|g| self.rate(g, cell_type))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileMatrix {
    n_genes: usize,
    n_types: usize,
    rows: Vec<f64>,
}

impl ProfileMatrix {
    pub fn from_rows(n_genes: usize, n_types: usize, rows: Vec<f64>) -> Self {
        assert_eq!(rows.len(), n_genes * n_types, "profile matrix shape");
        Self {
            n_genes,
            n_types,
            rows,
        }
    }

    pub fn n_genes(&self) -> usize {
        self.n_genes
    }

    pub fn n_types(&self) -> usize {
        self.n_types
    }

    #[inline]
    pub fn row(&self, gene: usize) -> &[f64] {
        &self.rows[gene * self.n_types..(gene + 1) * self.n_types]
    }

    #[inline]
    pub fn rate(&self, gene: usize, cell_type: usize) -> f64 {
        self.rows[gene * self.n_types + cell_type]
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/profiles.rs"]
mod tests;
