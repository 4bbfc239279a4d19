use std::fmt::Write;

use crate::pipeline::Dag;

/// Prints each job followed by a tab-indented line of its needs.
pub fn print_dag(dag: &Dag) {
    print!("{}", render_dag(dag));
}

pub fn render_dag(dag: &Dag) -> String {
    let mut output = String::new();
    for (job, needs) in dag {
        let needs: Vec<&str> = needs.iter().map(String::as_str).collect();
        let _ = writeln!(output, "{job}:");
        let _ = writeln!(output, "\t{}", needs.join(" "));
        let _ = writeln!(output);
    }
    output
}
