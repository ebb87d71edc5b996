//! Subcommand implementations

use crate::cli::{Command, RedactArgs, WatermarkArgs};
use crate::export::FileExporter;
use anyhow::{bail, Context, Result};
use pdfsuite_core::marks::{Anchor, ApplyScope};
use pdfsuite_core::raster::RasterImage;
use pdfsuite_core::reader::{document_words, Orp};
use pdfsuite_core::ranges::{parse_page_ranges, require_pages};
use pdfsuite_core::services::{Decryptor, Exporter, PageMetrics};
use pdfsuite_core::tools::{self, PageFit, SignaturePlacement, WatermarkContent};
use pdfsuite_core::{
    CoordinateMapper, PageGeometry, PdfDocument, RedactionRegion, Rotation, ScreenRect,
    SuiteConfig, TargetPages, ViewportState,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Serialize)]
struct DocumentReport {
    version: String,
    page_count: usize,
    encrypted: bool,
    pages: Vec<PageGeometry>,
}

/// Run one subcommand. Anything meant for the user goes to stdout.
pub fn run(command: Command, config: &SuiteConfig) -> Result<()> {
    match command {
        Command::Info { file } => {
            let bytes = read(&file)?;
            let doc = PdfDocument::open(&bytes)?;
            let pages = (0..doc.page_count())
                .map(|i| doc.page_geometry(i))
                .collect::<Result<Vec<_>, _>>()?;
            let report = DocumentReport {
                version: doc.version().to_string(),
                page_count: pages.len(),
                encrypted: doc.is_encrypted(),
                pages,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Merge { files, output } => {
            let inputs = files.iter().map(|f| read(f)).collect::<Result<Vec<_>>>()?;
            write(&output, &tools::merge(&inputs)?)?;
        }
        Command::Split {
            file,
            pages,
            output,
        } => {
            let bytes = read(&file)?;
            write(&output, &tools::extract(&bytes, &pages)?)?;
        }
        Command::SplitAll { file, out_dir } => {
            let bytes = read(&file)?;
            let mut exporter = FileExporter::new(out_dir);
            for part in tools::split_all(&bytes)? {
                exporter.export(&part.name, &part.bytes, PDF_MIME)?;
            }
            println!("Wrote {} files", exporter.written().len());
        }
        Command::Rotate {
            file,
            pages,
            all,
            output,
        } => {
            let bytes = read(&file)?;
            let deltas: BTreeMap<usize, i64> = match all {
                Some(degrees) => (0..pdfsuite_core::get_page_count(&bytes)?)
                    .map(|i| (i, degrees))
                    .collect(),
                None => pages.into_iter().collect(),
            };
            if deltas.is_empty() {
                bail!("Nothing to rotate: pass --page PAGE=DEGREES or --all DEGREES");
            }
            write(&output, &tools::rotate(&bytes, &deltas)?)?;
        }
        Command::Watermark(args) => watermark(args, config)?,
        Command::RemoveWatermark(args) => remove_watermark(args, config)?,
        Command::Sign {
            file,
            image,
            page,
            x,
            y,
            width,
            height,
            output,
        } => {
            let bytes = read(&file)?;
            let placement = SignaturePlacement {
                page_index: page_index(page)?,
                x,
                y,
                width,
                height,
                data_url: png_data_url(&read(&image)?),
            };
            write(&output, &tools::sign(&bytes, &[placement])?)?;
        }
        Command::ImagesToPdf { images, a4, output } => {
            let inputs = images.iter().map(|f| read(f)).collect::<Result<Vec<_>>>()?;
            let fit = if a4 { PageFit::A4 } else { PageFit::Fit };
            write(&output, &tools::images_to_pdf(&inputs, fit)?)?;
        }
        Command::Unprotect {
            file,
            password,
            output,
        } => {
            let bytes = read(&file)?;
            write(&output, &tools::unprotect(&bytes, &password)?)?;
        }
        Command::Forms { file } => {
            let fields = tools::extract_form_fields(&read(&file)?)?;
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }
        Command::ToDocx { file, output } => {
            let docx = tools::pdf_to_docx(&read(&file)?)?;
            write_as(&output, &docx, DOCX_MIME)?;
        }
        Command::Words { file, limit } => {
            let doc = PdfDocument::load(&read(&file)?)?;
            let words = document_words(&doc)?;
            for word in words.iter().take(limit.unwrap_or(usize::MAX)) {
                println!("{}", mark_pivot(word));
            }
            let minutes = words.len() as f64 / f64::from(config.reader.wpm);
            println!(
                "{} words, about {:.1} min at {} wpm",
                words.len(),
                minutes,
                config.reader.wpm
            );
        }
        Command::Config => {
            print!("{}", toml::to_string_pretty(config)?);
        }
    }
    Ok(())
}

fn watermark(args: WatermarkArgs, config: &SuiteConfig) -> Result<()> {
    let bytes = read(&args.file)?;
    let mut options = config.watermark.clone();
    if let Some(color) = args.color {
        options.color = color;
    }
    if let Some(size) = args.size {
        options.size = size;
    }
    if let Some(opacity) = args.opacity {
        options.opacity = opacity;
    }
    if let Some(rotation) = args.rotation {
        options.rotation = rotation;
    }
    if let Some(position) = args.position {
        options.position = position.parse::<Anchor>()?;
    }
    if let Some(range) = args.pages {
        let count = pdfsuite_core::get_page_count(&bytes)?;
        options.pages = TargetPages::Indices(require_pages(parse_page_ranges(&range, count))?);
    }

    let content = match (args.text, args.image) {
        (Some(text), _) => WatermarkContent::Text { text },
        (None, Some(path)) => WatermarkContent::Image {
            image: RasterImage::decode(&read(&path)?)?,
        },
        (None, None) => bail!("Pass --text or --image"),
    };
    write(&args.output, &tools::watermark(&bytes, &content, &options)?)
}

fn remove_watermark(args: RedactArgs, config: &SuiteConfig) -> Result<()> {
    let bytes = read(&args.file)?;
    let page = page_index(args.page)?;
    let doc = PdfDocument::load(&bytes)?;
    let geometry = doc.page_geometry(page)?;

    let default_box = config.redaction.initial_box();
    let screen_box = ScreenRect::new(
        args.x.unwrap_or(default_box.x),
        args.y.unwrap_or(default_box.y),
        args.width.unwrap_or(default_box.width),
        args.height.unwrap_or(default_box.height),
    );
    let region = redaction_at_full_size(page, geometry, screen_box, args.all_pages)?;
    tracing::debug!(?region, "Mapped redaction box");
    write(&args.output, &tools::remove_watermark(&bytes, &[region])?)
}

/// Map a box drawn on the page at 100% zoom into document space.
fn redaction_at_full_size(
    page: usize,
    geometry: PageGeometry,
    screen_box: ScreenRect,
    all_pages: bool,
) -> Result<RedactionRegion> {
    let viewport = ViewportState::from_geometry(&geometry, 1.0, Rotation::Deg0);
    let mapper = CoordinateMapper::new(geometry, viewport.displayed_size(), Rotation::Deg0)?;
    let scope = if all_pages {
        ApplyScope::All
    } else {
        ApplyScope::Page
    };
    Ok(RedactionRegion::from_screen_box(
        page, screen_box, &mapper, scope,
    )?)
}

fn page_index(page: usize) -> Result<usize> {
    match page.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("Page numbers start at 1"),
    }
}

fn mark_pivot(word: &str) -> String {
    let orp = Orp::split(word);
    format!("{}[{}]{}", orp.left, orp.pivot, orp.right)
}

fn png_data_url(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    write_as(path, bytes, PDF_MIME)
}

fn write_as(path: &Path, bytes: &[u8], mime_type: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid output path {}", path.display()))?;
    FileExporter::new(dir)
        .export(name, bytes, mime_type)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfsuite_core::Size;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn blank_pdf(dir: &Path, name: &str, pages: usize) -> PathBuf {
        let mut doc = PdfDocument::new();
        for _ in 0..pages {
            doc.add_page(Size::new(612.0, 792.0)).unwrap();
        }
        let path = dir.join(name);
        fs::write(&path, doc.save().unwrap()).unwrap();
        path
    }

    fn page_count(path: &Path) -> usize {
        pdfsuite_core::get_page_count(&fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn test_merge_and_split() {
        let tmp = tempfile::tempdir().unwrap();
        let a = blank_pdf(tmp.path(), "a.pdf", 2);
        let b = blank_pdf(tmp.path(), "b.pdf", 3);
        let merged = tmp.path().join("merged.pdf");
        run(
            Command::Merge {
                files: vec![a, b],
                output: merged.clone(),
            },
            &SuiteConfig::default(),
        )
        .unwrap();
        assert_eq!(page_count(&merged), 5);

        let split = tmp.path().join("split.pdf");
        run(
            Command::Split {
                file: merged,
                pages: "2-4".into(),
                output: split.clone(),
            },
            &SuiteConfig::default(),
        )
        .unwrap();
        assert_eq!(page_count(&split), 3);
    }

    #[test]
    fn test_split_all_writes_each_page() {
        let tmp = tempfile::tempdir().unwrap();
        let file = blank_pdf(tmp.path(), "doc.pdf", 3);
        let out_dir = tmp.path().join("pages");
        run(
            Command::SplitAll {
                file,
                out_dir: out_dir.clone(),
            },
            &SuiteConfig::default(),
        )
        .unwrap();
        for n in 1..=3 {
            assert_eq!(page_count(&out_dir.join(format!("page-{}.pdf", n))), 1);
        }
    }

    #[test]
    fn test_rotate_requires_pages() {
        let tmp = tempfile::tempdir().unwrap();
        let file = blank_pdf(tmp.path(), "doc.pdf", 1);
        let err = run(
            Command::Rotate {
                file,
                pages: Vec::new(),
                all: None,
                output: tmp.path().join("out.pdf"),
            },
            &SuiteConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Nothing to rotate"));
    }

    #[test]
    fn test_rotate_all_pages() {
        let tmp = tempfile::tempdir().unwrap();
        let file = blank_pdf(tmp.path(), "doc.pdf", 2);
        let output = tmp.path().join("out.pdf");
        run(
            Command::Rotate {
                file,
                pages: Vec::new(),
                all: Some(90),
                output: output.clone(),
            },
            &SuiteConfig::default(),
        )
        .unwrap();
        let doc = PdfDocument::load(&fs::read(&output).unwrap()).unwrap();
        for page in 0..2 {
            assert_eq!(doc.page_geometry(page).unwrap().rotation, Rotation::Deg90);
        }
    }

    #[test]
    fn test_to_docx_writes_word_package() {
        let tmp = tempfile::tempdir().unwrap();
        let file = blank_pdf(tmp.path(), "doc.pdf", 2);
        let stamped = tmp.path().join("stamped.pdf");
        watermark(
            WatermarkArgs {
                file,
                text: Some("DRAFT".into()),
                image: None,
                color: None,
                size: None,
                opacity: None,
                rotation: None,
                position: None,
                pages: None,
                output: stamped.clone(),
            },
            &SuiteConfig::default(),
        )
        .unwrap();

        let output = tmp.path().join("doc.docx");
        run(
            Command::ToDocx {
                file: stamped,
                output: output.clone(),
            },
            &SuiteConfig::default(),
        )
        .unwrap();
        let bytes = fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_missing_input_names_the_file() {
        let err = run(
            Command::Forms {
                file: PathBuf::from("/nonexistent/input.pdf"),
            },
            &SuiteConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/input.pdf"));
    }

    #[test]
    fn test_default_redaction_box_maps_to_points() {
        let region =
            redaction_at_full_size(0, PageGeometry::letter(), ScreenRect::new(100.0, 100.0, 200.0, 100.0), false)
                .unwrap();
        assert_eq!(region.rect.x, 100.0);
        assert_eq!(region.rect.y, 592.0);
        assert_eq!(region.rect.width, 200.0);
        assert_eq!(region.rect.height, 100.0);
        assert_eq!(region.apply_to, ApplyScope::Page);
    }

    #[test]
    fn test_watermark_respects_page_range() {
        let tmp = tempfile::tempdir().unwrap();
        let file = blank_pdf(tmp.path(), "doc.pdf", 2);
        let err = watermark(
            WatermarkArgs {
                file,
                text: Some("DRAFT".into()),
                image: None,
                color: None,
                size: None,
                opacity: None,
                rotation: None,
                position: Some("top-left".into()),
                pages: Some("5-9".into()),
                output: tmp.path().join("out.pdf"),
            },
            &SuiteConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Selection does not contain any valid pages"));
    }

    #[test]
    fn test_mark_pivot() {
        assert_eq!(mark_pivot("hello"), "he[l]lo");
        assert_eq!(mark_pivot("a"), "[a]");
    }

    #[test]
    fn test_page_index_is_one_based() {
        assert_eq!(page_index(1).unwrap(), 0);
        assert!(page_index(0).is_err());
    }
}
