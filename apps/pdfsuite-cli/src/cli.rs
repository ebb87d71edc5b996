//! Command-line arguments

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pdfsuite")]
#[command(version, about = "Merge, split, stamp and sign PDF files locally")]
pub struct Cli {
    /// TOML file with tool defaults (falls back to $PDFSUITE_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print version, page sizes and metadata as JSON
    Info { file: PathBuf },

    /// Concatenate documents in the order given
    Merge {
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Keep the pages named by a range like "1-3, 5"
    Split {
        file: PathBuf,
        #[arg(short, long)]
        pages: String,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write every page to its own file
    SplitAll {
        file: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Rotate pages by multiples of 90 degrees
    Rotate {
        file: PathBuf,
        /// PAGE=DEGREES with a 1-based page, e.g. 2=90; repeatable
        #[arg(long = "page", value_parser = parse_page_rotation)]
        pages: Vec<(usize, i64)>,
        /// Rotate every page by this many degrees
        #[arg(long, conflicts_with = "pages")]
        all: Option<i64>,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Stamp text or an image on pages
    Watermark(WatermarkArgs),

    /// Cover a box with white on one page or every page
    RemoveWatermark(RedactArgs),

    /// Place a PNG signature, positioned in points from the page's top-left
    Sign {
        file: PathBuf,
        #[arg(long)]
        image: PathBuf,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build a PDF with one page per image
    ImagesToPdf {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Center images on A4 pages instead of sizing pages to the image
        #[arg(long)]
        a4: bool,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Remove password protection
    Unprotect {
        file: PathBuf,
        #[arg(long)]
        password: String,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List AcroForm fields as JSON
    Forms { file: PathBuf },

    /// Export the text layer to a Word document, one paragraph per line
    ToDocx {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the document's words split around their recognition point
    Words {
        file: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("content").required(true).args(["text", "image"])))]
pub struct WatermarkArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub text: Option<String>,
    /// PNG or JPEG stamp
    #[arg(long)]
    pub image: Option<PathBuf>,
    /// Hex color, e.g. "#ff0000"
    #[arg(long)]
    pub color: Option<String>,
    /// Font size for text, width in points for images
    #[arg(long)]
    pub size: Option<f64>,
    #[arg(long)]
    pub opacity: Option<f64>,
    #[arg(long)]
    pub rotation: Option<f64>,
    /// Anchor such as "center" or "bottom-right"
    #[arg(long)]
    pub position: Option<String>,
    /// Page range; every page when omitted
    #[arg(long)]
    pub pages: Option<String>,
    #[arg(short, long)]
    pub output: PathBuf,
}

/// The box is in pixels at 100% zoom from the page's top-left, as drawn in
/// the editor. Unset values come from the configured default box.
#[derive(Args, Debug)]
pub struct RedactArgs {
    pub file: PathBuf,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    #[arg(long)]
    pub x: Option<f64>,
    #[arg(long)]
    pub y: Option<f64>,
    #[arg(long)]
    pub width: Option<f64>,
    #[arg(long)]
    pub height: Option<f64>,
    /// Cover the same box on every page
    #[arg(long)]
    pub all_pages: bool,
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Parse "PAGE=DEGREES" into a 0-based page index and a rotation delta.
pub fn parse_page_rotation(value: &str) -> Result<(usize, i64), String> {
    let (page, degrees) = value
        .split_once('=')
        .ok_or_else(|| format!("expected PAGE=DEGREES, got '{}'", value))?;
    let page: usize = page
        .trim()
        .parse()
        .map_err(|_| format!("invalid page number '{}'", page.trim()))?;
    if page == 0 {
        return Err("page numbers start at 1".to_string());
    }
    let degrees: i64 = degrees
        .trim()
        .parse()
        .map_err(|_| format!("invalid rotation '{}'", degrees.trim()))?;
    Ok((page - 1, degrees))
}
