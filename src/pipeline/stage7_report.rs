use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::model::config::DecompConfig;
use crate::model::dataset::SpatialDataset;
use crate::model::results::ResultsTable;
use crate::model::spot_class::{SpotClass, spot_class_order};
use crate::report::json::render_summary_json;
use crate::report::text::render_report_text;
use crate::report::{
    CellTypeStat, ClassStat, ConvergenceStats, DerivedStats, InputStats, SummaryData, ToolMeta,
    bool_fraction, distribution, format_f64_6,
};
use crate::simd;

#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub table: &'a ResultsTable,
    pub config: &'a DecompConfig,
    pub n_genes_dataset: usize,
    pub n_genes_fitted: usize,
    pub derived: Option<&'a SpatialDataset>,
    pub tool_version: String,
}

pub fn write_reports(input: &ReportInput<'_>, out_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(out_dir)?;

    write_weights_tsv(input.table, &out_dir.join("weights.tsv"))?;
    write_doublet_weights_tsv(input.table, &out_dir.join("weights_doublet.tsv"))?;
    write_results_tsv(input.table, &out_dir.join("results.tsv"))?;

    let summary = build_summary(input);
    let json = render_summary_json(&summary)?;
    write_text(&out_dir.join("summary.json"), &json)?;
    write_text(&out_dir.join("report.txt"), &render_report_text(&summary))?;

    if let Some(derived) = input.derived {
        write_dataset(derived, &out_dir.join("derived"))?;
    }
    Ok(())
}

pub fn write_weights_tsv(table: &ResultsTable, path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write!(w, "barcode")?;
    for name in table.cell_types().names() {
        write!(w, "\t{name}")?;
    }
    writeln!(w)?;
    for (row, barcode) in table.barcodes().iter().enumerate() {
        write!(w, "{barcode}")?;
        for &v in table.weights(row) {
            write!(w, "\t{}", format_f64_6(v))?;
        }
        writeln!(w)?;
    }
    w.flush()
}

pub fn write_doublet_weights_tsv(table: &ResultsTable, path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "barcode\tfirst_type\tsecond_type\tw1\tw2")?;
    let types = table.cell_types();
    for (idx, row) in table.rows().iter().enumerate() {
        let Some([w1, w2]) = table.doublet_weights().row(idx) else {
            continue;
        };
        let second = row.second_type.map(|t| types.name(t)).unwrap_or("NA");
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            table.barcodes()[idx],
            types.name(row.first_type),
            second,
            format_f64_6(w1),
            format_f64_6(w2)
        )?;
    }
    w.flush()
}

pub fn write_results_tsv(table: &ResultsTable, path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let header = [
        "barcode",
        "spot_class",
        "first_type",
        "second_type",
        "first_class",
        "second_class",
        "min_score",
        "singlet_score",
        "conv_all",
        "conv_doublet",
        "nUMI",
    ];
    writeln!(w, "{}", header.join("\t"))?;
    let types = table.cell_types();
    for (idx, row) in table.rows().iter().enumerate() {
        let first = if row.spot_class == SpotClass::Reject {
            "NA"
        } else {
            types.name(row.first_type)
        };
        let second = row.second_type.map(|t| types.name(t)).unwrap_or("NA");
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            table.barcodes()[idx],
            row.spot_class,
            first,
            second,
            row.first_class,
            row.second_class,
            format_f64_6(row.min_score),
            format_f64_6(row.singlet_score),
            row.conv_all,
            row.conv_doublet,
            row.n_umi
        )?;
    }
    w.flush()
}

pub fn write_dataset(dataset: &SpatialDataset, dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;

    let counts = dataset.counts();
    let mut w = BufWriter::new(File::create(dir.join("matrix.mtx"))?);
    writeln!(w, "%%MatrixMarket matrix coordinate real general")?;
    writeln!(
        w,
        "{} {} {}",
        dataset.n_genes(),
        dataset.n_pixels(),
        counts.nnz()
    )?;
    for pixel in 0..dataset.n_pixels() {
        let (rows, values) = counts.column(pixel);
        for (&gene, &value) in rows.iter().zip(values) {
            writeln!(w, "{} {} {}", gene + 1, pixel + 1, value)?;
        }
    }
    w.flush()?;

    let mut w = BufWriter::new(File::create(dir.join("features.tsv"))?);
    for gene in dataset.genes() {
        writeln!(w, "{gene}\t{gene}\tGene Expression")?;
    }
    w.flush()?;

    let mut w = BufWriter::new(File::create(dir.join("barcodes.tsv"))?);
    for barcode in dataset.barcodes() {
        writeln!(w, "{barcode}")?;
    }
    w.flush()?;

    let mut w = BufWriter::new(File::create(dir.join("coords.tsv"))?);
    writeln!(w, "barcode\tx\ty\tnUMI")?;
    for ((barcode, c), umi) in dataset
        .barcodes()
        .iter()
        .zip(dataset.coords())
        .zip(dataset.n_umi())
    {
        writeln!(w, "{barcode}\t{}\t{}\t{}", c.x, c.y, umi)?;
    }
    w.flush()?;

    if let Some(labels) = dataset.cell_labels() {
        let mut w = BufWriter::new(File::create(dir.join("cell_labels.tsv"))?);
        writeln!(w, "barcode\tcell_type")?;
        for (barcode, label) in dataset.barcodes().iter().zip(labels) {
            writeln!(w, "{barcode}\t{label}")?;
        }
        w.flush()?;
    }
    Ok(())
}

pub fn build_summary(input: &ReportInput<'_>) -> SummaryData {
    let table = input.table;
    let n_pixels = table.n_pixels();
    let counts = table.class_counts();
    let classes = spot_class_order()
        .iter()
        .zip(counts)
        .map(|(class, count)| ClassStat {
            name: class.as_str(),
            count,
            fraction: if n_pixels == 0 {
                0.0
            } else {
                count as f64 / n_pixels as f64
            },
        })
        .collect();

    let types = table.cell_types();
    let mut first_counts = vec![0usize; types.len()];
    let mut weight_sums = vec![0f64; types.len()];
    for (idx, row) in table.rows().iter().enumerate() {
        if row.spot_class != SpotClass::Reject {
            first_counts[row.first_type.index()] += 1;
        }
        for (sum, &w) in weight_sums.iter_mut().zip(table.weights(idx)) {
            *sum += w;
        }
    }
    let cell_types = types
        .ids()
        .map(|t| CellTypeStat {
            name: types.name(t).to_string(),
            first_type_count: first_counts[t.index()],
            mean_weight: if n_pixels == 0 {
                0.0
            } else {
                weight_sums[t.index()] / n_pixels as f64
            },
        })
        .collect();

    let umi: Vec<f64> = table.rows().iter().map(|r| r.n_umi).collect();
    let derived = input.derived.map(|d| DerivedStats {
        n_records: d.n_pixels(),
        n_split_pixels: counts[2],
    });

    SummaryData {
        tool: ToolMeta {
            name: "kira-spotdecon".to_string(),
            version: input.tool_version.clone(),
            simd_backend: simd::backend_name().to_string(),
        },
        input: InputStats {
            n_pixels,
            n_genes_dataset: input.n_genes_dataset,
            n_genes_fitted: input.n_genes_fitted,
            n_cell_types: types.len(),
        },
        config: input.config.clone(),
        classes,
        cell_types,
        convergence: ConvergenceStats {
            conv_all_fraction: bool_fraction(table.rows().iter().map(|r| r.conv_all)),
            conv_doublet_fraction: bool_fraction(table.rows().iter().map(|r| r.conv_doublet)),
        },
        n_umi: distribution(&umi),
        derived,
    }
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage7_report.rs"]
mod tests;
