//! Tool identifiers and their typed parameter sets.
//!
//! The service accepts a `tool` string and a free-form `params` JSON object.
//! On this side each tool gets its own parameter struct, and [`ToolParams`]
//! is the tagged union over them, so a `watermark` request can never carry a
//! `compress` level by accident. Values are still validated by the service;
//! the types here only fix the shape.

use crate::error::ClientError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A transformation kind offered by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Merge,
    Split,
    Compress,
    Convert,
    Ocr,
    PdfToPptx,
    PdfToXlsx,
    PdfToHtml,
    ImagesToPdf,
    Watermark,
    PageNumbers,
    Rotate,
    Metadata,
    Protect,
    Unlock,
}

impl Tool {
    /// All tools in catalog order.
    pub const ALL: [Tool; 15] = [
        Tool::Merge,
        Tool::Split,
        Tool::Compress,
        Tool::Convert,
        Tool::Ocr,
        Tool::PdfToPptx,
        Tool::PdfToXlsx,
        Tool::PdfToHtml,
        Tool::ImagesToPdf,
        Tool::Watermark,
        Tool::PageNumbers,
        Tool::Rotate,
        Tool::Metadata,
        Tool::Protect,
        Tool::Unlock,
    ];

    /// Wire identifier sent in the `tool` form field.
    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Merge => "merge",
            Tool::Split => "split",
            Tool::Compress => "compress",
            Tool::Convert => "convert",
            Tool::Ocr => "ocr",
            Tool::PdfToPptx => "pdf_to_pptx",
            Tool::PdfToXlsx => "pdf_to_xlsx",
            Tool::PdfToHtml => "pdf_to_html",
            Tool::ImagesToPdf => "images_to_pdf",
            Tool::Watermark => "watermark",
            Tool::PageNumbers => "page_numbers",
            Tool::Rotate => "rotate",
            Tool::Metadata => "metadata",
            Tool::Protect => "protect",
            Tool::Unlock => "unlock",
        }
    }

    /// `true` for the one tool that combines several files into one job.
    pub fn combines_files(self) -> bool {
        matches!(self, Tool::Merge)
    }

    /// Static metadata for this tool.
    pub fn descriptor(self) -> &'static ToolDescriptor {
        CATALOG
            .iter()
            .find(|d| d.tool == self)
            .unwrap_or(&CATALOG[0])
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('-', "_");
        Tool::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| ClientError::UnknownTool(s.to_string()))
    }
}

// ── Per-tool parameter structs ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitParams {
    /// Page spec such as `"1-3,5"` or `"all"`.
    pub pages: String,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self { pages: "all".into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Compression either by quality preset or by target size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompressParams {
    Level { level: CompressionLevel },
    Target { target_kb: u64 },
}

impl Default for CompressParams {
    fn default() -> Self {
        CompressParams::Level {
            level: CompressionLevel::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    Pdf,
    Docx,
    Jpg,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConvertParams {
    pub target_format: TargetFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrOutput {
    #[default]
    Pdf,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrParams {
    pub output_format: OcrOutput,
    /// Tesseract language code(s), e.g. `"eng"` or `"eng+deu"`.
    pub lang: String,
}

impl Default for OcrParams {
    fn default() -> Self {
        Self {
            output_format: OcrOutput::Pdf,
            lang: "eng".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PptxParams {
    pub dpi: u32,
    pub title: String,
}

impl Default for PptxParams {
    fn default() -> Self {
        Self {
            dpi: 150,
            title: "PDF Presentation".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct XlsxParams {
    pub extract_text: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlMode {
    #[default]
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlParams {
    pub mode: HtmlMode,
    pub dpi: u32,
}

impl Default for HtmlParams {
    fn default() -> Self {
        Self {
            mode: HtmlMode::Text,
            dpi: 150,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Auto,
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImagesToPdfParams {
    pub orientation: Orientation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    #[default]
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkParams {
    pub watermark_type: WatermarkKind,
    pub position: String,
    pub opacity: f64,
    pub rotation: i32,
    pub font_size: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

impl Default for WatermarkParams {
    fn default() -> Self {
        Self {
            watermark_type: WatermarkKind::Text,
            position: "center".into(),
            opacity: 0.3,
            rotation: 45,
            font_size: 60,
            text: "WATERMARK".into(),
            image_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageNumberParams {
    pub position: String,
    pub font_size: u32,
    /// Template where `{number}` is replaced by the page number.
    pub format: String,
    pub start_from: u32,
}

impl Default for PageNumberParams {
    fn default() -> Self {
        Self {
            position: "bottomright".into(),
            font_size: 20,
            format: "{number}".into(),
            start_from: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotateParams {
    pub angle: i32,
    pub pages: String,
}

impl Default for RotateParams {
    fn default() -> Self {
        Self {
            angle: 90,
            pages: "all".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataAction {
    Get,
    #[default]
    Set,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataParams {
    pub action: MetadataAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProtectParams {
    pub password: String,
    pub owner_password: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnlockParams {
    pub password: String,
}

// ── Tagged union ─────────────────────────────────────────────────────────

/// Parameters for one tool. The variant decides which tool it may be sent with.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolParams {
    Merge,
    Split(SplitParams),
    Compress(CompressParams),
    Convert(ConvertParams),
    Ocr(OcrParams),
    PdfToPptx(PptxParams),
    PdfToXlsx(XlsxParams),
    PdfToHtml(HtmlParams),
    ImagesToPdf(ImagesToPdfParams),
    Watermark(WatermarkParams),
    PageNumbers(PageNumberParams),
    Rotate(RotateParams),
    Metadata(MetadataParams),
    Protect(ProtectParams),
    Unlock(UnlockParams),
}

impl ToolParams {
    /// Default parameter set for `tool`.
    pub fn default_for(tool: Tool) -> Self {
        match tool {
            Tool::Merge => ToolParams::Merge,
            Tool::Split => ToolParams::Split(Default::default()),
            Tool::Compress => ToolParams::Compress(Default::default()),
            Tool::Convert => ToolParams::Convert(Default::default()),
            Tool::Ocr => ToolParams::Ocr(Default::default()),
            Tool::PdfToPptx => ToolParams::PdfToPptx(Default::default()),
            Tool::PdfToXlsx => ToolParams::PdfToXlsx(Default::default()),
            Tool::PdfToHtml => ToolParams::PdfToHtml(Default::default()),
            Tool::ImagesToPdf => ToolParams::ImagesToPdf(Default::default()),
            Tool::Watermark => ToolParams::Watermark(Default::default()),
            Tool::PageNumbers => ToolParams::PageNumbers(Default::default()),
            Tool::Rotate => ToolParams::Rotate(Default::default()),
            Tool::Metadata => ToolParams::Metadata(Default::default()),
            Tool::Protect => ToolParams::Protect(Default::default()),
            Tool::Unlock => ToolParams::Unlock(Default::default()),
        }
    }

    /// The tool this parameter set belongs to.
    pub fn tool(&self) -> Tool {
        match self {
            ToolParams::Merge => Tool::Merge,
            ToolParams::Split(_) => Tool::Split,
            ToolParams::Compress(_) => Tool::Compress,
            ToolParams::Convert(_) => Tool::Convert,
            ToolParams::Ocr(_) => Tool::Ocr,
            ToolParams::PdfToPptx(_) => Tool::PdfToPptx,
            ToolParams::PdfToXlsx(_) => Tool::PdfToXlsx,
            ToolParams::PdfToHtml(_) => Tool::PdfToHtml,
            ToolParams::ImagesToPdf(_) => Tool::ImagesToPdf,
            ToolParams::Watermark(_) => Tool::Watermark,
            ToolParams::PageNumbers(_) => Tool::PageNumbers,
            ToolParams::Rotate(_) => Tool::Rotate,
            ToolParams::Metadata(_) => Tool::Metadata,
            ToolParams::Protect(_) => Tool::Protect,
            ToolParams::Unlock(_) => Tool::Unlock,
        }
    }

    /// The JSON object sent in the `params` form field.
    pub fn to_json(&self) -> serde_json::Value {
        let value = match self {
            ToolParams::Merge => Ok(serde_json::Value::Object(Default::default())),
            ToolParams::Split(p) => serde_json::to_value(p),
            ToolParams::Compress(p) => serde_json::to_value(p),
            ToolParams::Convert(p) => serde_json::to_value(p),
            ToolParams::Ocr(p) => serde_json::to_value(p),
            ToolParams::PdfToPptx(p) => serde_json::to_value(p),
            ToolParams::PdfToXlsx(p) => serde_json::to_value(p),
            ToolParams::PdfToHtml(p) => serde_json::to_value(p),
            ToolParams::ImagesToPdf(p) => serde_json::to_value(p),
            ToolParams::Watermark(p) => serde_json::to_value(p),
            ToolParams::PageNumbers(p) => serde_json::to_value(p),
            ToolParams::Rotate(p) => serde_json::to_value(p),
            ToolParams::Metadata(p) => serde_json::to_value(p),
            ToolParams::Protect(p) => serde_json::to_value(p),
            ToolParams::Unlock(p) => serde_json::to_value(p),
        };
        // Plain structs of strings and numbers always serialise.
        value.unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }

    /// Parse a parameter object for `tool`. Missing keys take their defaults.
    pub fn from_json(tool: Tool, value: serde_json::Value) -> Result<Self, ClientError> {
        Self::default_for(tool).with_overrides(value)
    }

    /// Merge the keys of `overrides` onto this set and re-validate the shape.
    ///
    /// Switching compress `mode` drops the keys of the old mode, so
    /// `{"mode": "target", "target_kb": 500}` replaces a `level` preset cleanly.
    pub fn with_overrides(&self, overrides: serde_json::Value) -> Result<Self, ClientError> {
        let tool = self.tool();
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(ClientError::InvalidParams {
                tool: tool.to_string(),
                detail: "parameters must be a JSON object".into(),
            });
        };

        let mut base = match self.to_json() {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        if overrides.contains_key("mode") && base.get("mode") != overrides.get("mode") {
            base.retain(|k, _| k == "mode");
        }
        base.extend(overrides);
        let merged = serde_json::Value::Object(base);

        let invalid = |e: serde_json::Error| ClientError::InvalidParams {
            tool: tool.to_string(),
            detail: e.to_string(),
        };
        Ok(match tool {
            Tool::Merge => ToolParams::Merge,
            Tool::Split => ToolParams::Split(serde_json::from_value(merged).map_err(invalid)?),
            Tool::Compress => ToolParams::Compress(serde_json::from_value(merged).map_err(invalid)?),
            Tool::Convert => ToolParams::Convert(serde_json::from_value(merged).map_err(invalid)?),
            Tool::Ocr => ToolParams::Ocr(serde_json::from_value(merged).map_err(invalid)?),
            Tool::PdfToPptx => ToolParams::PdfToPptx(serde_json::from_value(merged).map_err(invalid)?),
            Tool::PdfToXlsx => ToolParams::PdfToXlsx(serde_json::from_value(merged).map_err(invalid)?),
            Tool::PdfToHtml => ToolParams::PdfToHtml(serde_json::from_value(merged).map_err(invalid)?),
            Tool::ImagesToPdf => {
                ToolParams::ImagesToPdf(serde_json::from_value(merged).map_err(invalid)?)
            }
            Tool::Watermark => ToolParams::Watermark(serde_json::from_value(merged).map_err(invalid)?),
            Tool::PageNumbers => {
                ToolParams::PageNumbers(serde_json::from_value(merged).map_err(invalid)?)
            }
            Tool::Rotate => ToolParams::Rotate(serde_json::from_value(merged).map_err(invalid)?),
            Tool::Metadata => ToolParams::Metadata(serde_json::from_value(merged).map_err(invalid)?),
            Tool::Protect => ToolParams::Protect(serde_json::from_value(merged).map_err(invalid)?),
            Tool::Unlock => ToolParams::Unlock(serde_json::from_value(merged).map_err(invalid)?),
        })
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────

/// Static metadata for one tool.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub tool: Tool,
    pub display_name: &'static str,
    pub description: &'static str,
    pub default_params: ToolParams,
}

fn descriptor(tool: Tool, display_name: &'static str, description: &'static str) -> ToolDescriptor {
    ToolDescriptor {
        tool,
        display_name,
        description,
        default_params: ToolParams::default_for(tool),
    }
}

static CATALOG: Lazy<Vec<ToolDescriptor>> = Lazy::new(|| {
    vec![
        descriptor(Tool::Merge, "Merge", "Combine several PDFs into one"),
        descriptor(Tool::Split, "Split", "Split a PDF into one file per page"),
        descriptor(Tool::Compress, "Compress", "Reduce PDF file size"),
        descriptor(Tool::Convert, "Convert", "Convert between PDF, Office and image formats"),
        descriptor(Tool::Ocr, "OCR", "Make scanned PDFs searchable"),
        descriptor(Tool::PdfToPptx, "PDF to PowerPoint", "One slide per page"),
        descriptor(Tool::PdfToXlsx, "PDF to Excel", "Extract tables to a spreadsheet"),
        descriptor(Tool::PdfToHtml, "PDF to HTML", "Render pages as a web page"),
        descriptor(Tool::ImagesToPdf, "Images to PDF", "Bundle images into a PDF"),
        descriptor(Tool::Watermark, "Watermark", "Stamp text or an image on every page"),
        descriptor(Tool::PageNumbers, "Page numbers", "Number every page"),
        descriptor(Tool::Rotate, "Rotate", "Rotate selected pages"),
        descriptor(Tool::Metadata, "Metadata", "Read or edit document properties"),
        descriptor(Tool::Protect, "Protect", "Encrypt with a password"),
        descriptor(Tool::Unlock, "Unlock", "Remove password protection"),
    ]
});

/// Every tool the service offers, in display order.
pub fn catalog() -> &'static [ToolDescriptor] {
    &CATALOG
}
