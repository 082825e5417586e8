use std::path::Path;

use crate::input::InputError;
use crate::input::gz::for_each_line;

pub fn parse_barcodes(path: &Path) -> Result<Vec<String>, InputError> {
    let mut barcodes = Vec::new();
    for_each_line(path, |_, line| {
        barcodes.push(line.trim().to_string());
        Ok(())
    })?;

    if barcodes.is_empty() {
        return Err(InputError::Parse("barcodes file is empty".to_string()));
    }

    Ok(barcodes)
}
