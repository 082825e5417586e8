use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::input::InputError;
use crate::input::gz::for_each_line;
use crate::model::dataset::Coord;

pub fn find_coords_path(input_dir: &Path) -> Result<PathBuf, InputError> {
    for name in ["coords.tsv", "coords.tsv.gz", "coords.csv", "coords.csv.gz"] {
        let path = input_dir.join(name);
        if path.exists() {
            return Ok(path);
        }
    }
    Err(InputError::MissingInput(
        "missing coords.tsv(.gz) or coords.csv".to_string(),
    ))
}

pub fn load_coords(path: &Path, barcodes: &[String]) -> Result<Vec<Coord>, InputError> {
    let mut map: HashMap<String, Coord> = HashMap::with_capacity(barcodes.len());
    let mut first = true;

    for_each_line(path, |line_no, line| {
        let is_header = first;
        first = false;
        let sep = if line.contains('\t') { '\t' } else { ',' };
        let fields: Vec<&str> = line.split(sep).map(|s| s.trim()).collect();
        if fields.len() < 3 {
            return Err(InputError::Parse(format!(
                "coords line {} has <3 columns",
                line_no
            )));
        }
        let (x, y) = match (fields[1].parse::<f64>(), fields[2].parse::<f64>()) {
            (Ok(x), Ok(y)) => (x, y),
            _ if is_header => return Ok(()),
            _ => {
                return Err(InputError::Parse(format!(
                    "invalid coordinate at line {}",
                    line_no
                )));
            }
        };
        let barcode = fields[0].to_string();
        if map.contains_key(&barcode) {
            warn!(line = line_no, barcode = %barcode, "duplicate barcode in coords; keeping first");
            return Ok(());
        }
        map.insert(barcode, Coord { x, y });
        Ok(())
    })?;

    barcodes
        .iter()
        .map(|bc| {
            map.get(bc).copied().ok_or_else(|| {
                InputError::InvalidInput(format!("no coordinates for barcode {bc}"))
            })
        })
        .collect()
}
