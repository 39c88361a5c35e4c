//! Command implementations.
//!
//! Each command reads one file, runs the codec and returns a report for
//! `summary` to print. Files are only written after the codec succeeds.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, info_span, warn};
use vta_codec::{
    ArrayKind, CrossCheckReport, FieldView, PatchBatch, PatchError, ParseOptions, RecordIndex,
    VisualTreeAsset, apply_order_in_place, apply_patches, cross_check, flatten_hierarchy,
    set_classes, swap_classes,
};

/// SHA-256 of `bytes` as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("read {}", path.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), len = bytes.len(), "wrote output");
    Ok(())
}

fn parse_asset(bytes: &[u8], path: &Path, options: &ParseOptions) -> Result<VisualTreeAsset> {
    VisualTreeAsset::parse(bytes, options).with_context(|| format!("parse {}", path.display()))
}

/// One template reference in an inspect report.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub name: String,
    pub guid: String,
}

/// One record in an inspect report.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub array: ArrayKind,
    pub offset: usize,
    pub len: usize,
    pub id: i32,
    pub order_in_document: i32,
    pub parent_id: i32,
    pub rule_index: i32,
    pub type_name: String,
    pub name: String,
    pub classes: Vec<String>,
    pub stylesheet_paths: Vec<String>,
}

/// Result of `vta inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub file: String,
    pub len: usize,
    pub sha256: String,
    pub header: String,
    pub template_refs: Vec<TemplateSummary>,
    pub visual_offset: usize,
    pub template_offset: usize,
    pub gap_len: usize,
    pub trailing_len: usize,
    pub records: Vec<RecordSummary>,
    /// Cross-check mismatches, present when a view was supplied.
    pub cross_check: Option<Vec<String>>,
}

impl InspectReport {
    /// Whether a supplied field view disagreed with the decode.
    #[must_use]
    pub fn has_mismatches(&self) -> bool {
        self.cross_check.as_ref().is_some_and(|m| !m.is_empty())
    }
}

pub fn run_inspect(path: &Path, view: Option<&Path>, options: &ParseOptions) -> Result<InspectReport> {
    let span = info_span!("inspect", file = %path.display());
    let _guard = span.enter();

    let bytes = read_input(path)?;
    let asset = parse_asset(&bytes, path, options)?;

    let mut records = Vec::new();
    for kind in ArrayKind::ALL {
        let spans = &asset.layout.array(kind).records;
        for (record, span) in asset.array(kind).records.iter().zip(spans) {
            records.push(RecordSummary {
                array: kind,
                offset: span.offset,
                len: span.len,
                id: record.id,
                order_in_document: record.order_in_document,
                parent_id: record.parent_id,
                rule_index: record.rule_index,
                type_name: record.type_name.clone(),
                name: record.name.clone(),
                classes: record.classes.clone(),
                stylesheet_paths: record.stylesheet_paths.clone(),
            });
        }
    }

    let cross_check = match view {
        Some(view_path) => {
            let report = check_against_view(&asset, view_path)?;
            Some(report.mismatches.iter().map(ToString::to_string).collect())
        }
        None => None,
    };

    Ok(InspectReport {
        file: path.display().to_string(),
        len: bytes.len(),
        sha256: sha256_hex(&bytes),
        header: hex::encode(asset.header),
        template_refs: asset
            .template_refs
            .iter()
            .map(|r| TemplateSummary {
                name: r.name.clone(),
                guid: r.guid.clone(),
            })
            .collect(),
        visual_offset: asset.layout.visual.offset,
        template_offset: asset.layout.template.offset,
        gap_len: asset.gap.len(),
        trailing_len: asset.trailing.len(),
        records,
        cross_check,
    })
}

fn check_against_view(asset: &VisualTreeAsset, view_path: &Path) -> Result<CrossCheckReport> {
    let text = fs::read_to_string(view_path)
        .with_context(|| format!("read field view {}", view_path.display()))?;
    let view: FieldView = serde_json::from_str(&text)
        .with_context(|| format!("parse field view {}", view_path.display()))?;
    Ok(cross_check(asset, &view))
}

/// Result of `vta verify`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub len: usize,
    pub rebuilt_len: usize,
    pub sha256: String,
    pub rebuilt_sha256: String,
}

impl VerifyReport {
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.sha256 == self.rebuilt_sha256 && self.len == self.rebuilt_len
    }
}

pub fn run_verify(path: &Path, options: &ParseOptions) -> Result<VerifyReport> {
    let span = info_span!("verify", file = %path.display());
    let _guard = span.enter();

    let bytes = read_input(path)?;
    let asset = parse_asset(&bytes, path, options)?;
    let rebuilt = asset.to_bytes().context("rebuild asset")?;

    let report = VerifyReport {
        len: bytes.len(),
        rebuilt_len: rebuilt.len(),
        sha256: sha256_hex(&bytes),
        rebuilt_sha256: sha256_hex(&rebuilt),
    };
    if !report.is_identical() {
        warn!(
            len = report.len,
            rebuilt_len = report.rebuilt_len,
            "rebuilt bytes differ from input"
        );
    }
    Ok(report)
}

/// How an edit was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Same-size bytes overwritten at their original offsets.
    InPlace,
    /// Bytes spliced at one or two array positions.
    Spliced,
    /// Whole asset re-encoded.
    Rebuilt,
}

/// Result of an editing command.
#[derive(Debug, Clone, Serialize)]
pub struct EditReport {
    pub mode: WriteMode,
    pub len_before: usize,
    pub len_after: usize,
    /// Records touched by the edit.
    pub records: usize,
}

pub fn run_rename(
    path: &Path,
    id: i32,
    name: &str,
    output: &Path,
    rebuild: bool,
    options: &ParseOptions,
) -> Result<EditReport> {
    let span = info_span!("rename", file = %path.display(), id);
    let _guard = span.enter();

    let bytes = read_input(path)?;
    let mut asset = parse_asset(&bytes, path, options)?;
    let Some(record) = asset.find_mut(id) else {
        bail!("record {id} not found in {}", path.display());
    };
    record.name = name.to_string();
    let batch = PatchBatch::new().with(record.clone());

    let (mode, out) = match apply_patches(&bytes, &batch, options) {
        Ok(out) => (WriteMode::InPlace, out),
        Err(PatchError::SizeChanged { original, new, .. }) if rebuild => {
            info!(original, new, "record size changed, rebuilding asset");
            (WriteMode::Rebuilt, asset.to_bytes().context("rebuild asset")?)
        }
        Err(err) => return Err(err).context("patch record in place"),
    };

    write_output(output, &out)?;
    Ok(EditReport {
        mode,
        len_before: bytes.len(),
        len_after: out.len(),
        records: 1,
    })
}

/// Parse an ordering file: ids separated by whitespace or commas, `#` starts a
/// comment.
pub fn parse_ordering(text: &str) -> Result<Vec<i32>> {
    let mut ids = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default();
        for token in line.split(|c: char| c.is_whitespace() || c == ',') {
            if token.is_empty() {
                continue;
            }
            let id = token
                .parse::<i32>()
                .with_context(|| format!("line {}: invalid record id {token:?}", line_no + 1))?;
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Where `vta reorder` takes its ordering from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource<'a> {
    /// Record ids listed in a file, see [`parse_ordering`].
    File(&'a Path),
    /// Depth-first walk of the parent links in the file itself.
    Flatten,
}

pub fn run_reorder(
    path: &Path,
    source: OrderSource<'_>,
    include_templates: bool,
    output: &Path,
    options: &ParseOptions,
) -> Result<EditReport> {
    let span = info_span!("reorder", file = %path.display());
    let _guard = span.enter();

    let bytes = read_input(path)?;
    let ordering = match source {
        OrderSource::File(order_path) => {
            let text = fs::read_to_string(order_path)
                .with_context(|| format!("read ordering {}", order_path.display()))?;
            parse_ordering(&text)?
        }
        OrderSource::Flatten => {
            let asset = parse_asset(&bytes, path, options)?;
            let mut records = asset.visual.records.clone();
            if include_templates {
                records.extend(asset.template.records.iter().cloned());
            }
            flatten_hierarchy(&records)
        }
    };
    info!(ids = ordering.len(), "loaded ordering");

    let arrays: &[ArrayKind] = if include_templates {
        &ArrayKind::ALL
    } else {
        &[ArrayKind::Visual]
    };
    let index = RecordIndex::resolve(&bytes, ordering.iter().copied(), options);
    let mut out = bytes.clone();
    let written = apply_order_in_place(&mut out, &ordering, arrays, &index)
        .context("rewrite order fields")?;
    if written < ordering.len() {
        warn!(
            written,
            ids = ordering.len(),
            "some ids in the ordering were not rewritten"
        );
    }

    write_output(output, &out)?;
    Ok(EditReport {
        mode: WriteMode::InPlace,
        len_before: bytes.len(),
        len_after: out.len(),
        records: written,
    })
}

pub fn run_set_classes(
    path: &Path,
    id: i32,
    classes: &[String],
    output: &Path,
    options: &ParseOptions,
) -> Result<EditReport> {
    let span = info_span!("set_classes", file = %path.display(), id);
    let _guard = span.enter();

    let bytes = read_input(path)?;
    let out = set_classes(&bytes, id, classes, options).context("replace class list")?;

    write_output(output, &out)?;
    Ok(EditReport {
        mode: WriteMode::Spliced,
        len_before: bytes.len(),
        len_after: out.len(),
        records: 1,
    })
}

pub fn run_swap_classes(
    path: &Path,
    first: i32,
    second: i32,
    output: &Path,
    options: &ParseOptions,
) -> Result<EditReport> {
    let span = info_span!("swap_classes", file = %path.display(), first, second);
    let _guard = span.enter();

    let bytes = read_input(path)?;
    let out = swap_classes(&bytes, first, second, options).context("swap class lists")?;

    write_output(output, &out)?;
    Ok(EditReport {
        mode: WriteMode::Spliced,
        len_before: bytes.len(),
        len_after: out.len(),
        records: 2,
    })
}
