//! Whole-asset parsing and rebuilding.

use tracing::{debug, info_span};

use crate::array::{ArrayKind, ArrayLayout, ElementArray, decode_array};
use crate::error::HeaderError;
use crate::header::template_ref::encode_template_references;
use crate::header::{
    HEADER_LEN, TEMPLATE_REFS_OFFSET, TemplateReference, find_template_array,
    parse_template_references, read_fixed_header,
};
use crate::options::{ParseOptions, SanityLimits};
use crate::record::ElementRecord;

/// Where each block was found in the parsed buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    /// Offset of the template reference block.
    pub template_refs_offset: usize,
    pub visual: ArrayLayout,
    pub template: ArrayLayout,
    /// Length of the source buffer.
    pub total_len: usize,
}

impl AssetLayout {
    /// Layout of one array.
    #[must_use]
    pub fn array(&self, kind: ArrayKind) -> &ArrayLayout {
        match kind {
            ArrayKind::Visual => &self.visual,
            ArrayKind::Template => &self.template,
        }
    }
}

/// A decoded VTA buffer.
///
/// Bytes the codec does not model are kept so that an unmodified asset
/// re-encodes to exactly the bytes it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualTreeAsset {
    /// Opaque fixed header.
    pub header: [u8; HEADER_LEN],
    pub template_refs: Vec<TemplateReference>,
    pub visual: ElementArray,
    pub template: ElementArray,
    /// Bytes skipped between the visual array and the located template array.
    pub gap: Vec<u8>,
    /// Bytes after the last template record.
    pub trailing: Vec<u8>,
    /// Offsets observed while parsing.
    pub layout: AssetLayout,
}

impl VisualTreeAsset {
    /// Parse a complete VTA buffer.
    pub fn parse(data: &[u8], options: &ParseOptions) -> Result<Self, HeaderError> {
        let span = info_span!("parse_vta", len = data.len(), strict = options.strict);
        let _guard = span.enter();

        let header = read_fixed_header(data)?;
        let (template_refs, refs_end) =
            parse_template_references(data, TEMPLATE_REFS_OFFSET, options)?;
        debug!(
            count = template_refs.len(),
            end = refs_end,
            "parsed template reference block"
        );

        let (visual, visual_layout) = decode_array(data, refs_end, ArrayKind::Visual, options)?;

        let template_offset =
            find_template_array(data, visual_layout.end, options.scan_window).into_result()?;
        let (template, template_layout) =
            decode_array(data, template_offset, ArrayKind::Template, options)?;

        let gap = data[visual_layout.end..template_offset].to_vec();
        let trailing = data[template_layout.end..].to_vec();
        debug!(
            visual = visual.records.len(),
            template = template.records.len(),
            gap = gap.len(),
            trailing = trailing.len(),
            "parsed asset"
        );

        Ok(Self {
            header,
            template_refs,
            visual,
            template,
            gap,
            trailing,
            layout: AssetLayout {
                template_refs_offset: TEMPLATE_REFS_OFFSET,
                visual: visual_layout,
                template: template_layout,
                total_len: data.len(),
            },
        })
    }

    /// Re-encode the asset, including the preserved gap and trailing bytes.
    ///
    /// Fails if a string or list would exceed the default [`SanityLimits`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, HeaderError> {
        self.to_bytes_with_limits(&SanityLimits::default())
    }

    /// Re-encode the asset, checking strings and lists against `limits`.
    pub fn to_bytes_with_limits(&self, limits: &SanityLimits) -> Result<Vec<u8>, HeaderError> {
        let mut out = build_with_limits(
            &self.header,
            &self.template_refs,
            &self.visual,
            &self.template,
            limits,
        )?;
        let template_len = self.template.encoded_len();
        let visual_end = out.len() - template_len;
        out.splice(visual_end..visual_end, self.gap.iter().copied());
        out.extend_from_slice(&self.trailing);
        Ok(out)
    }

    /// Borrow one of the arrays.
    #[must_use]
    pub fn array(&self, kind: ArrayKind) -> &ElementArray {
        match kind {
            ArrayKind::Visual => &self.visual,
            ArrayKind::Template => &self.template,
        }
    }

    /// Mutably borrow one of the arrays.
    pub fn array_mut(&mut self, kind: ArrayKind) -> &mut ElementArray {
        match kind {
            ArrayKind::Visual => &mut self.visual,
            ArrayKind::Template => &mut self.template,
        }
    }

    /// Iterate over every record with the array it belongs to.
    pub fn records(&self) -> impl Iterator<Item = (ArrayKind, &ElementRecord)> {
        ArrayKind::ALL.into_iter().flat_map(move |kind| {
            self.array(kind)
                .records
                .iter()
                .map(move |record| (kind, record))
        })
    }

    /// Find a record by id. The visual array is searched first.
    #[must_use]
    pub fn find(&self, id: i32) -> Option<(ArrayKind, &ElementRecord)> {
        self.records().find(|(_, record)| record.id == id)
    }

    /// Find a record by id for modification.
    pub fn find_mut(&mut self, id: i32) -> Option<&mut ElementRecord> {
        if let Some(record) = self.visual.records.iter_mut().find(|r| r.id == id) {
            return Some(record);
        }
        self.template.records.iter_mut().find(|r| r.id == id)
    }

    /// Whether the current records can no longer be written over the
    /// parsed layout in place.
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        ArrayKind::ALL.into_iter().any(|kind| {
            let records = &self.array(kind).records;
            let spans = &self.layout.array(kind).records;
            records.len() != spans.len()
                || records
                    .iter()
                    .zip(spans)
                    .any(|(record, span)| record.encoded_len() != span.len)
        })
    }
}

/// Compose a complete buffer: header, template references, visual array,
/// template array.
///
/// Everything is checked against the default [`SanityLimits`], so the result
/// always parses with default options.
pub fn build(
    header: &[u8; HEADER_LEN],
    template_refs: &[TemplateReference],
    visual: &ElementArray,
    template: &ElementArray,
) -> Result<Vec<u8>, HeaderError> {
    build_with_limits(header, template_refs, visual, template, &SanityLimits::default())
}

/// [`build`] with explicit limits.
pub fn build_with_limits(
    header: &[u8; HEADER_LEN],
    template_refs: &[TemplateReference],
    visual: &ElementArray,
    template: &ElementArray,
    limits: &SanityLimits,
) -> Result<Vec<u8>, HeaderError> {
    let refs = encode_template_references(template_refs, TEMPLATE_REFS_OFFSET, limits)?;
    let mut out =
        Vec::with_capacity(HEADER_LEN + refs.len() + visual.encoded_len() + template.encoded_len());
    out.extend_from_slice(header);
    out.extend(refs);
    visual.encode_into_with_limits(&mut out, limits)?;
    template.encode_into_with_limits(&mut out, limits)?;
    debug!(len = out.len(), "built asset");
    Ok(out)
}
