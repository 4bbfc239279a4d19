mod dag;
mod manifest;
mod progress;
mod styling;
mod summary;
mod tables;

pub use dag::print_dag;
pub use manifest::print_manifest;
pub use progress::FetchProgress;
pub use styling::{dim, magenta_bold};
pub use summary::print_summary;

/// Prints the `cidag` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("cidag"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("GitLab CI job DAG and manifest resolver")
    );
}
