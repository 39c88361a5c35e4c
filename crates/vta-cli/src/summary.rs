use anyhow::Result;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};
use serde::Serialize;
use vta_codec::{ArrayKind, NO_RULE};

use crate::commands::{EditReport, InspectReport, RecordSummary, VerifyReport, WriteMode};

/// Print any report as pretty JSON on stdout.
pub fn print_json<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

pub fn print_inspect(report: &InspectReport) {
    println!("File: {}", report.file);
    println!("Size: {} bytes", report.len);
    println!("SHA-256: {}", report.sha256);
    println!(
        "Visual array: +{}  Template array: +{}  Gap: {}  Trailing: {}",
        report.visual_offset, report.template_offset, report.gap_len, report.trailing_len
    );

    if !report.template_refs.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![header_cell("Template"), header_cell("GUID")]);
        apply_table_style(&mut table);
        for template in &report.template_refs {
            table.add_row(vec![Cell::new(&template.name), dim_cell(&template.guid)]);
        }
        println!("{table}");
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Array"),
        header_cell("Offset"),
        header_cell("Size"),
        header_cell("Id"),
        header_cell("Order"),
        header_cell("Parent"),
        header_cell("Rule"),
        header_cell("Type"),
        header_cell("Name"),
        header_cell("Classes"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for record in &report.records {
        table.add_row(record_row(record));
    }
    println!("{table}");

    if let Some(mismatches) = &report.cross_check {
        if mismatches.is_empty() {
            println!("Cross-check: clean");
        } else {
            eprintln!("Cross-check mismatches:");
            for mismatch in mismatches {
                eprintln!("- {mismatch}");
            }
        }
    }
}

fn record_row(record: &RecordSummary) -> Vec<Cell> {
    let array = match record.array {
        ArrayKind::Visual => Cell::new("visual"),
        ArrayKind::Template => Cell::new("template").fg(Color::Magenta),
    };
    let rule = if record.rule_index == NO_RULE {
        dim_cell("-")
    } else {
        Cell::new(record.rule_index)
    };
    let name = if record.name.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(&record.name).add_attribute(Attribute::Bold)
    };
    let classes = if record.classes.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(record.classes.join(" "))
    };
    vec![
        array,
        dim_cell(record.offset),
        Cell::new(record.len),
        Cell::new(record.id),
        Cell::new(record.order_in_document),
        Cell::new(record.parent_id),
        rule,
        Cell::new(&record.type_name),
        name,
        classes,
    ]
}

pub fn print_verify(report: &VerifyReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell(""),
        header_cell("Bytes"),
        header_cell("SHA-256"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![
        Cell::new("input"),
        Cell::new(report.len),
        dim_cell(&report.sha256),
    ]);
    table.add_row(vec![
        Cell::new("rebuilt"),
        Cell::new(report.rebuilt_len),
        dim_cell(&report.rebuilt_sha256),
    ]);
    println!("{table}");
    if report.is_identical() {
        println!("Rebuilt bytes are identical");
    } else {
        eprintln!("rebuilt bytes differ from input");
    }
}

pub fn print_edit(report: &EditReport) {
    let mode = match report.mode {
        WriteMode::InPlace => status_cell("in place", Color::Green),
        WriteMode::Spliced => status_cell("spliced", Color::Yellow),
        WriteMode::Rebuilt => status_cell("rebuilt", Color::Yellow),
    };
    let delta = report.len_after as i64 - report.len_before as i64;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Mode"),
        header_cell("Records"),
        header_cell("Before"),
        header_cell("After"),
        header_cell("Delta"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table.add_row(vec![
        mode,
        Cell::new(report.records),
        Cell::new(report.len_before),
        Cell::new(report.len_after),
        if delta == 0 {
            dim_cell(0)
        } else {
            Cell::new(format!("{delta:+}")).fg(Color::Yellow)
        },
    ]);
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
    if table.column_count() >= 10 {
        table.set_constraints(vec![
            ColumnConstraint::LowerBoundary(Width::Fixed(8)),
            ColumnConstraint::LowerBoundary(Width::Fixed(6)),
            ColumnConstraint::LowerBoundary(Width::Fixed(4)),
            ColumnConstraint::LowerBoundary(Width::Fixed(11)),
            ColumnConstraint::LowerBoundary(Width::Fixed(5)),
            ColumnConstraint::LowerBoundary(Width::Fixed(11)),
            ColumnConstraint::LowerBoundary(Width::Fixed(4)),
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
            ColumnConstraint::UpperBoundary(Width::Percentage(20)),
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn status_cell(label: &str, color: Color) -> Cell {
    Cell::new(label).fg(color).add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
