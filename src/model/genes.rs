use std::collections::HashSet;

use crate::model::dataset::{DatasetError, SpatialDataset};
use crate::model::profiles::ReferenceProfiles;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneList {
    genes: Vec<String>,
}

impl GeneList {
    pub fn new(genes: Vec<String>) -> Result<Self, DatasetError> {
        if genes.is_empty() {
            return Err(DatasetError::Malformed("gene list is empty".to_string()));
        }
        let mut seen = HashSet::with_capacity(genes.len());
        for gene in &genes {
            if !seen.insert(gene.as_str()) {
                return Err(DatasetError::Malformed(format!(
                    "duplicate gene in gene list: {gene}"
                )));
            }
        }
        Ok(Self { genes })
    }

    pub fn shared(
        profiles: &ReferenceProfiles,
        dataset: &SpatialDataset,
    ) -> Result<Self, DatasetError> {
        let genes = profiles
            .genes()
            .iter()
            .filter(|g| dataset.gene_position(g).is_some())
            .cloned()
            .collect::<Vec<_>>();
        if genes.is_empty() {
            return Err(DatasetError::Malformed(
                "reference and spatial dataset share no genes".to_string(),
            ));
        }
        Self::new(genes)
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn dataset_positions(&self, dataset: &SpatialDataset) -> Result<Vec<usize>, DatasetError> {
        self.genes
            .iter()
            .map(|gene| {
                dataset
                    .gene_position(gene)
                    .ok_or_else(|| DatasetError::MissingGene {
                        gene: gene.clone(),
                        table: "spatial dataset",
                    })
            })
            .collect()
    }
}
