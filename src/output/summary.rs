use crate::pipeline::{Dag, ResolvedPipeline};

use super::styling::{cyan, dim};
use super::tables::{color_coded_count_cell, create_table, cyan_header};

/// Prints a table of the shown jobs with their stage, direct needs and
/// total number of dependencies.
pub fn print_summary(resolved: &ResolvedPipeline, shown: &Dag) {
    println!(
        "{} {}",
        cyan("Jobs"),
        cyan(format!("({} of {})", shown.len(), resolved.dag.len()))
    );

    if !resolved.stages.is_empty() {
        let order: Vec<&str> = resolved.stages.iter().map(|s| s.name.as_str()).collect();
        println!("{} {}", dim("Stages:"), order.join(" → "));
    }

    let total = resolved.dag.len();
    let mut table = create_table();
    table.set_header(cyan_header(&[
        "Job",
        "Stage",
        "Direct needs",
        "Total dependencies",
    ]));

    for (job, needs) in shown {
        let stage = resolved
            .jobs
            .get(job)
            .map_or("-", |metadata| metadata.stage.as_str());
        let direct = resolved
            .direct_needs
            .get(job)
            .map_or(0, std::collections::BTreeSet::len);

        table.add_row(vec![
            comfy_table::Cell::new(job),
            comfy_table::Cell::new(stage),
            comfy_table::Cell::new(direct),
            color_coded_count_cell(needs.len(), total),
        ]);
    }

    println!("{table}");
}
