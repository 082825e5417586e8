use std::path::Path;

use tracing::warn;

use crate::input::InputError;
use crate::input::gz::for_each_line;

pub fn parse_features(path: &Path) -> Result<Vec<String>, InputError> {
    let mut symbols = Vec::new();
    let mut format_cols: Option<usize> = None;

    for_each_line(path, |line_no, line| {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 2 {
            return Err(InputError::Parse(format!(
                "features line {} has <2 columns",
                line_no
            )));
        }
        match format_cols {
            None => format_cols = Some(cols.len()),
            Some(2) if cols.len() >= 3 => warn!(
                line = line_no,
                "features file switches from two to three columns"
            ),
            Some(_) => {}
        }
        let symbol = normalize_symbol(cols[1]);
        if symbol.is_empty() {
            symbols.push(normalize_symbol(cols[0]));
        } else {
            symbols.push(symbol);
        }
        Ok(())
    })?;

    if symbols.is_empty() {
        return Err(InputError::Parse("features file is empty".to_string()));
    }

    Ok(symbols)
}

pub fn normalize_symbol(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let upper = trimmed.to_ascii_uppercase();
    if let Some((left, right)) = upper.rsplit_once('.') {
        if left.starts_with("ENS") && right.chars().all(|c| c.is_ascii_digit()) {
            return left.to_string();
        }
    }
    upper
}
