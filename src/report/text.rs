use crate::report::{ClassStat, SummaryData, format_f64_6};

pub fn render_report_text(data: &SummaryData) -> String {
    let mut out = String::new();

    out.push_str("Spatial Cell-Type Decomposition Report\n");
    out.push_str("======================================\n\n");

    out.push_str("1. Input\n");
    out.push_str(&format!(
        "Pixels: {}\nGenes fitted: {} of {}\nCell types: {}\nMode: {}\n\n",
        data.input.n_pixels,
        data.input.n_genes_fitted,
        data.input.n_genes_dataset,
        data.input.n_cell_types,
        data.config.mode.as_str()
    ));

    out.push_str("2. Pixel classes\n");
    for c in &data.classes {
        out.push_str(&format!(
            "{}: {} ({})\n",
            c.name,
            c.count,
            format_f64_6(c.fraction)
        ));
    }
    out.push_str(&format!("{}\n\n", class_statement(&data.classes)));

    out.push_str("3. Cell types\n");
    let mut types = data.cell_types.iter().collect::<Vec<_>>();
    types.sort_by(|a, b| {
        b.first_type_count
            .cmp(&a.first_type_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    for t in types {
        out.push_str(&format!(
            "{}: first type of {} pixels, mean weight {}\n",
            t.name,
            t.first_type_count,
            format_f64_6(t.mean_weight)
        ));
    }
    out.push('\n');

    out.push_str("4. Quality and caveats\n");
    out.push_str(&format!(
        "nUMI median: {} (p10 {}, p90 {})\n",
        format_f64_6(data.n_umi.median),
        format_f64_6(data.n_umi.p10),
        format_f64_6(data.n_umi.p90)
    ));
    out.push_str(&format!(
        "Full fit converged: {}\n",
        format_f64_6(data.convergence.conv_all_fraction)
    ));
    out.push_str(&format!(
        "Doublet fit converged: {}\n",
        format_f64_6(data.convergence.conv_doublet_fraction)
    ));
    if let Some(derived) = &data.derived {
        out.push_str(&format!(
            "Derived dataset: {} records, {} pixels split\n",
            derived.n_records, derived.n_split_pixels
        ));
    }

    out
}

fn class_statement(classes: &[ClassStat]) -> &'static str {
    let fraction = |name: &str| {
        classes
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.fraction)
            .unwrap_or(0.0)
    };
    if fraction("reject") >= 0.5 {
        "Most pixels were rejected; check the nUMI bounds and the gene overlap."
    } else if fraction("doublet_certain") + fraction("doublet_uncertain") >= 0.5 {
        "Most pixels are mixtures of two cell types."
    } else {
        "Most pixels are dominated by a single cell type."
    }
}
