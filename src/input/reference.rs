use std::path::Path;

use tracing::{info, warn};

use crate::input::InputError;
use crate::input::features::normalize_symbol;
use crate::input::gz::for_each_line;
use crate::model::cell_types::CellTypeSet;
use crate::model::genes::GeneList;
use crate::model::profiles::ReferenceProfiles;

pub fn load_reference(path: &Path) -> Result<ReferenceProfiles, InputError> {
    let mut type_names: Vec<String> = Vec::new();
    let mut genes = Vec::new();
    let mut rates = Vec::new();

    for_each_line(path, |line_no, line| {
        let fields: Vec<&str> = line.split('\t').map(|s| s.trim()).collect();
        if type_names.is_empty() {
            if fields.len() < 2 {
                return Err(InputError::Parse(
                    "reference header needs a gene column and at least one cell type".to_string(),
                ));
            }
            type_names = fields[1..].iter().map(|s| s.to_string()).collect();
            return Ok(());
        }
        let n_types = type_names.len();
        if fields.len() != n_types + 1 {
            return Err(InputError::Parse(format!(
                "reference line {} has {} columns, expected {}",
                line_no,
                fields.len(),
                n_types + 1
            )));
        }
        for raw in &fields[1..] {
            let rate = raw.parse::<f64>().map_err(|_| {
                InputError::Parse(format!("invalid rate {raw:?} at reference line {line_no}"))
            })?;
            rates.push(rate);
        }
        genes.push(normalize_symbol(fields[0]));
        Ok(())
    })?;

    if type_names.is_empty() {
        return Err(InputError::Parse("reference file is empty".to_string()));
    }
    let cell_types = CellTypeSet::new(type_names)?;
    info!(
        genes = genes.len(),
        cell_types = cell_types.len(),
        "reference profiles loaded"
    );
    Ok(ReferenceProfiles::new(genes, cell_types, rates)?)
}

// A non-numeric first line is a header.
pub fn load_platform_effects(path: &Path) -> Result<Vec<(String, f64)>, InputError> {
    let mut effects = Vec::new();
    let mut first = true;
    for_each_line(path, |line_no, line| {
        let is_header = first;
        first = false;
        let fields: Vec<&str> = line.split('\t').map(|s| s.trim()).collect();
        if fields.len() < 2 {
            return Err(InputError::Parse(format!(
                "platform effect line {} has <2 columns",
                line_no
            )));
        }
        match fields[1].parse::<f64>() {
            Ok(effect) => effects.push((normalize_symbol(fields[0]), effect)),
            Err(_) if is_header => {}
            Err(_) => {
                return Err(InputError::Parse(format!(
                    "invalid platform effect at line {}",
                    line_no
                )));
            }
        }
        Ok(())
    })?;
    Ok(effects)
}

pub fn load_gene_list(path: &Path) -> Result<GeneList, InputError> {
    let mut genes: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for_each_line(path, |line_no, line| {
        let gene = normalize_symbol(line);
        if gene.is_empty() {
            return Ok(());
        }
        if !seen.insert(gene.clone()) {
            warn!(line = line_no, gene = %gene, "duplicate gene in gene list ignored");
            return Ok(());
        }
        genes.push(gene);
        Ok(())
    })?;
    Ok(GeneList::new(genes)?)
}
