use crate::assembly::NamedDocument;
use crate::error::PdfSuiteError;
use crate::forms::FormField;
use crate::marks::RedactionRegion;
use crate::tools::{self, PageFit, SignaturePlacement, WatermarkContent, WatermarkOptions};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PdfCommand {
    Merge {
        files: Vec<Vec<u8>>,
    },
    /// Keep the pages named by a range string like "1-3, 5".
    Split {
        file: Vec<u8>,
        ranges: String,
    },
    SplitAll {
        file: Vec<u8>,
    },
    Rotate {
        file: Vec<u8>,
        /// 0-based page index to degrees added; JSON keys are strings
        #[serde(deserialize_with = "page_index_keys")]
        rotations: BTreeMap<usize, i64>,
    },
    Watermark {
        file: Vec<u8>,
        content: WatermarkContent,
        #[serde(default)]
        options: WatermarkOptions,
    },
    RemoveWatermark {
        file: Vec<u8>,
        regions: Vec<RedactionRegion>,
    },
    Sign {
        file: Vec<u8>,
        signatures: Vec<SignaturePlacement>,
    },
    ImagesToPdf {
        images: Vec<Vec<u8>>,
        #[serde(default)]
        fit: PageFit,
    },
    Unprotect {
        file: Vec<u8>,
        password: String,
    },
    ExtractForms {
        file: Vec<u8>,
    },
}

/// Object keys arrive as strings, including when serde buffers a tagged enum.
fn page_index_keys<'de, D>(deserializer: D) -> Result<BTreeMap<usize, i64>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, i64>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, degrees)| {
            key.trim()
                .parse::<usize>()
                .map(|index| (index, degrees))
                .map_err(|_| de::Error::custom(format!("invalid page index '{}'", key)))
        })
        .collect()
}

impl PdfCommand {
    fn input_size(&self) -> usize {
        match self {
            PdfCommand::Merge { files } => files.iter().map(Vec::len).sum(),
            PdfCommand::ImagesToPdf { images, .. } => images.iter().map(Vec::len).sum(),
            PdfCommand::Split { file, .. }
            | PdfCommand::SplitAll { file }
            | PdfCommand::Rotate { file, .. }
            | PdfCommand::Watermark { file, .. }
            | PdfCommand::RemoveWatermark { file, .. }
            | PdfCommand::Sign { file, .. }
            | PdfCommand::Unprotect { file, .. }
            | PdfCommand::ExtractForms { file } => file.len(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PdfCommand::Merge { .. } => "merge",
            PdfCommand::Split { .. } => "split",
            PdfCommand::SplitAll { .. } => "split_all",
            PdfCommand::Rotate { .. } => "rotate",
            PdfCommand::Watermark { .. } => "watermark",
            PdfCommand::RemoveWatermark { .. } => "remove_watermark",
            PdfCommand::Sign { .. } => "sign",
            PdfCommand::ImagesToPdf { .. } => "images_to_pdf",
            PdfCommand::Unprotect { .. } => "unprotect",
            PdfCommand::ExtractForms { .. } => "extract_forms",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    /// Base64-encoded PDF data
    pub data: Option<String>,
    /// Base64-encoded outputs of commands that produce several files
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ProcessedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FormField>>,
    pub error: Option<String>,
    pub metrics: Option<ProcessMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedFile {
    pub name: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: u32,
    pub processing_time_ms: u64,
}

enum Output {
    Document(Vec<u8>),
    Documents(Vec<NamedDocument>),
    Fields(Vec<FormField>, usize),
}

/// Run a command, timing it with the system clock.
#[cfg(not(target_arch = "wasm32"))]
pub fn execute(command: PdfCommand) -> ProcessResult {
    let start = std::time::Instant::now();
    execute_with_clock(command, move || start.elapsed().as_secs_f64() * 1000.0)
}

/// Run a command. `now_ms` is any monotonic millisecond clock.
///
/// Errors never escape: they become `success: false` with a single message.
pub fn execute_with_clock(command: PdfCommand, now_ms: impl Fn() -> f64) -> ProcessResult {
    let started = now_ms();
    let input_size = command.input_size();
    let name = command.name();

    let output = match run(command) {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(command = name, error = %e, "Command failed");
            return ProcessResult {
                success: false,
                data: None,
                files: Vec::new(),
                fields: None,
                error: Some(e.to_string()),
                metrics: None,
            };
        }
    };

    let (data, files, fields, output_size, page_count) = match output {
        Output::Document(bytes) => {
            let pages = lopdf::Document::load_mem(&bytes)
                .map(|d| d.get_pages().len())
                .unwrap_or(0);
            (Some(BASE64.encode(&bytes)), Vec::new(), None, bytes.len(), pages)
        }
        Output::Documents(parts) => {
            let size = parts.iter().map(|p| p.bytes.len()).sum();
            let count = parts.len();
            let files = parts
                .into_iter()
                .map(|p| ProcessedFile {
                    name: p.name,
                    data: BASE64.encode(&p.bytes),
                })
                .collect();
            (None, files, None, size, count)
        }
        Output::Fields(fields, pages) => (None, Vec::new(), Some(fields), 0, pages),
    };

    let elapsed = (now_ms() - started).max(0.0);
    tracing::info!(command = name, output_size, elapsed_ms = elapsed, "Command finished");
    ProcessResult {
        success: true,
        data,
        files,
        fields,
        error: None,
        metrics: Some(ProcessMetrics {
            input_size_bytes: input_size,
            output_size_bytes: output_size,
            page_count: page_count as u32,
            processing_time_ms: elapsed as u64,
        }),
    }
}

fn run(command: PdfCommand) -> Result<Output, PdfSuiteError> {
    Ok(match command {
        PdfCommand::Merge { files } => Output::Document(tools::merge(&files)?),
        PdfCommand::Split { file, ranges } => Output::Document(tools::extract(&file, &ranges)?),
        PdfCommand::SplitAll { file } => Output::Documents(tools::split_all(&file)?),
        PdfCommand::Rotate { file, rotations } => Output::Document(tools::rotate(&file, &rotations)?),
        PdfCommand::Watermark {
            file,
            content,
            options,
        } => Output::Document(tools::watermark(&file, &content, &options)?),
        PdfCommand::RemoveWatermark { file, regions } => {
            Output::Document(tools::remove_watermark(&file, &regions)?)
        }
        PdfCommand::Sign { file, signatures } => Output::Document(tools::sign(&file, &signatures)?),
        PdfCommand::ImagesToPdf { images, fit } => {
            Output::Document(tools::images_to_pdf(&images, fit)?)
        }
        PdfCommand::Unprotect { file, password } => {
            Output::Document(tools::unprotect(&file, &password)?)
        }
        PdfCommand::ExtractForms { file } => {
            let pages = lopdf::Document::load_mem(&file)
                .map(|d| d.get_pages().len())
                .unwrap_or(0);
            Output::Fields(tools::extract_form_fields(&file)?, pages)
        }
    })
}
