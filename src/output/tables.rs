use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Highlights jobs that wait on a large share of the pipeline.
pub fn color_coded_count_cell(count: usize, total: usize) -> Cell {
    #[allow(clippy::cast_precision_loss)]
    let share = count as f64 / total.max(1) as f64;
    let cell = Cell::new(count);
    if share >= 0.5 {
        cell.fg(TableColor::Red)
    } else if share >= 0.25 {
        cell.fg(TableColor::Yellow)
    } else {
        cell.fg(TableColor::Green)
    }
}
