use tracing::{debug, info, warn};

use crate::model::dataset::{DatasetError, SpatialDataset};
use crate::model::genes::GeneList;
use crate::model::profiles::ReferenceProfiles;

#[derive(Debug, Clone)]
pub struct Prepared {
    pub profiles: ReferenceProfiles,
    pub gene_list: GeneList,
}

pub fn prepare(
    dataset: &SpatialDataset,
    reference: &ReferenceProfiles,
    requested_genes: Option<GeneList>,
) -> Result<Prepared, DatasetError> {
    dataset.check_umi_invariant()?;
    if dataset.n_pixels() == 0 {
        return Err(DatasetError::Malformed(
            "spatial dataset has no pixels".to_string(),
        ));
    }

    let gene_list = match requested_genes {
        Some(list) => {
            // Missing genes are fatal in either table.
            list.dataset_positions(dataset)?;
            for gene in list.genes() {
                if reference.gene_position(gene).is_none() {
                    return Err(DatasetError::MissingGene {
                        gene: gene.clone(),
                        table: "reference",
                    });
                }
            }
            list
        }
        None => GeneList::shared(reference, dataset)?,
    };

    let unshared = reference.n_genes() - count_shared(reference, dataset);
    if unshared > 0 {
        debug!(unshared, "reference genes absent from the spatial dataset");
    }
    if gene_list.len() < reference.cell_types().len() {
        warn!(
            genes = gene_list.len(),
            cell_types = reference.cell_types().len(),
            "fewer fitting genes than cell types; weights are poorly determined"
        );
    }
    info!(
        pixels = dataset.n_pixels(),
        genes = gene_list.len(),
        cell_types = reference.cell_types().len(),
        "inputs prepared"
    );

    Ok(Prepared {
        profiles: reference.renormalized(),
        gene_list,
    })
}

fn count_shared(reference: &ReferenceProfiles, dataset: &SpatialDataset) -> usize {
    reference
        .genes()
        .iter()
        .filter(|g| dataset.gene_position(g).is_some())
        .count()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_prepare.rs"]
mod tests;
