//! Convert Blu-ray PGS subtitles to images or to text.

#[macro_use]
extern crate log;

use std::fs::{self, File};
use std::io::{stdout, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{format_err, Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use pgssub::{Caption, SupFile};
use serde::Serialize;
use subtitle_ocr::{BatchEvent, BatchWorker, FontSet, OcrContext, OcrOptions, ScanMode,
                   ScanSummary};

mod progress;
mod srt;

use crate::progress::default_progress_style;
use crate::srt::write_srt;

#[derive(Debug, Parser)]
/// Tools for Blu-ray subtitles in PGS format (*.sup files).
#[command(name = "sup2srt", version)]
enum Args {
    /// Write every caption as a PNG image, with an index.json describing
    /// their timing and placement.
    #[command(name = "images")]
    Images {
        /// Path to the *.sup file.
        sup: PathBuf,

        /// Output directory.  Defaults to something based on the name of
        /// the *.sup file.
        #[arg(short = 'o', long = "out-dir")]
        out_dir: Option<PathBuf>,
    },

    /// Recognize the text of every caption and write an *.srt file.
    #[command(name = "ocr")]
    Ocr {
        /// Path to the *.sup file.
        sup: PathBuf,

        /// Directory holding our font databases.  It will be created if
        /// needed.
        #[arg(long)]
        fonts: PathBuf,

        /// JSON file with recognition settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Contrast boost from 0 to 10.
        #[arg(long, value_parser = clap::value_parser!(i32).range(0..=10))]
        contrast: Option<i32>,

        /// How different a glyph may be from a learned one.
        #[arg(long)]
        tolerance: Option<i32>,

        /// Keep identical consecutive captions separate.
        #[arg(long)]
        no_combine: bool,

        /// Milliseconds to subtract from every caption time.
        #[arg(long, value_name = "MS", allow_negative_numbers = true)]
        pts_offset: Option<i64>,

        /// Leave out italic tags.
        #[arg(long)]
        strip_formatting: bool,

        /// Mark captions near the top of the screen with {\an8}.
        #[arg(long)]
        preserve_positions: bool,

        /// Don't turn '' into ".
        #[arg(long)]
        keep_double_apostrophes: bool,

        /// Only recognize captions which are always shown.
        #[arg(long)]
        forced_only: bool,

        /// Write intermediate images for every caption to this directory.
        #[arg(long)]
        debug_dir: Option<PathBuf>,

        /// Output file.  Defaults to standard output.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// List the font databases in a directory.
    #[command(name = "fonts")]
    Fonts {
        /// Directory holding our font databases.
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Args = Args::parse();
    debug!("args: {:?}", &args);
    match args {
        Args::Images { sup, out_dir } => cmd_images(&sup, out_dir),
        Args::Ocr {
            sup,
            fonts,
            config,
            contrast,
            tolerance,
            no_combine,
            pts_offset,
            strip_formatting,
            preserve_positions,
            keep_double_apostrophes,
            forced_only,
            debug_dir,
            output,
        } => {
            let mut options = match &config {
                Some(path) => OcrOptions::from_path(path)
                    .with_context(|| format!("could not load {}", path.display()))?,
                None => OcrOptions::default(),
            };
            if let Some(contrast) = contrast {
                options.contrast = contrast;
            }
            if let Some(tolerance) = tolerance {
                options.similarity_tolerance = tolerance;
            }
            if no_combine {
                options.combine_duplicates = false;
            }
            if let Some(offset) = pts_offset {
                options.pts_offset_ms = offset;
            }
            options.strip_formatting |= strip_formatting;
            options.preserve_positions |= preserve_positions;
            if keep_double_apostrophes {
                options.convert_double_apostrophes = false;
            }
            let ocr = OcrArgs { sup, fonts, forced_only, debug_dir, output };
            cmd_ocr(&ocr, options)
        }
        Args::Fonts { dir } => cmd_fonts(&dir),
    }
}

#[derive(Serialize)]
struct IndexInfo {
    captions: Vec<CaptionInfo>,
}

#[derive(Serialize)]
struct CaptionInfo {
    start: u32,
    end: Option<u32>,
    forced: bool,
    position: (u16, u16),
    size: (u16, u16),
    path: String,
}

fn cmd_images(path: &Path, out_dir: Option<PathBuf>) -> Result<()> {
    let out_dir = match out_dir {
        Some(dir) => dir,
        None => {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| format_err!("no filename in {}", path.display()))?;
            PathBuf::from(format!("{}_subtitles", stem))
        }
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("could not create {}", out_dir.display()))?;

    let sup = SupFile::open(path)?;
    let mut info = IndexInfo { captions: vec![] };
    for caption in sup.captions() {
        let image = caption.to_image()?;
        let image_name = format!("{:04}.png", caption.index());
        let image_path = out_dir.join(&image_name);
        image.save(&image_path)
            .with_context(|| format!("could not write {}", image_path.display()))?;

        let coords = caption.frames()[0].coordinates();
        info.captions.push(CaptionInfo {
            start: caption.start_ms(),
            end: caption.end_ms(),
            forced: caption.forced(),
            position: (coords.left(), coords.top()),
            size: (coords.width(), coords.height()),
            path: image_name,
        });
    }

    let json_path = out_dir.join("index.json");
    let json_file = File::create(&json_path)
        .with_context(|| format!("could not create {}", json_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(json_file), &info)
        .with_context(|| format!("error writing {}", json_path.display()))?;
    Ok(())
}

struct OcrArgs {
    sup: PathBuf,
    fonts: PathBuf,
    forced_only: bool,
    debug_dir: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn cmd_ocr(args: &OcrArgs, options: OcrOptions) -> Result<()> {
    let sup = SupFile::open_with(&args.sup, &options.assemble_options())?;
    let captions: Vec<Caption> = sup
        .into_captions()
        .into_iter()
        .filter(|c| !args.forced_only || c.forced())
        .collect();
    let total = captions.len();

    fs::create_dir_all(&args.fonts)
        .with_context(|| format!("could not create {}", args.fonts.display()))?;
    let fonts = FontSet::open(&args.fonts, options.default_font_hits)?;
    let mut ctx = OcrContext::new(options.clone(), fonts);
    if let Some(dir) = &args.debug_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("could not create {}", dir.display()))?;
        ctx.set_debug_dir(dir);
    }
    let ctx = Arc::new(Mutex::new(ctx));

    let pb = ProgressBar::new(total as u64);
    pb.set_style(default_progress_style());
    pb.set_prefix("OCR");
    let worker = BatchWorker::spawn(ctx.clone(), captions.clone(), 0, ScanMode::SkipUnknown);
    for event in worker.events() {
        match event {
            BatchEvent::Progress { .. } => {}
            BatchEvent::Scanned { caption, text } => {
                pb.inc(1);
                trace!("{}: {:?}", caption, text);
            }
            BatchEvent::Failed { caption, message } => {
                pb.inc(1);
                pb.suspend(|| warn!("caption {} failed: {}", caption, message));
            }
            BatchEvent::NeedsLabel { caption } => {
                debug!("caption {} has unknown glyphs", caption);
            }
            BatchEvent::Finished { cancelled } => {
                debug!("batch finished (cancelled: {})", cancelled);
            }
        }
    }
    let scanned = worker.join();
    pb.finish_and_clear();

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("could not create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            write_srt(&mut out, &captions, &scanned, &options)?;
            out.flush().with_context(|| format!("could not write {}", path.display()))?;
        }
        None => {
            let out = stdout();
            let mut out = out.lock();
            write_srt(&mut out, &captions, &scanned, &options)?;
        }
    }

    let mut ctx = ctx.lock().map_err(|_| format_err!("OCR worker panicked"))?;
    ctx.fonts_mut().save()?;
    eprintln!("{}", ScanSummary::new(total, &scanned));
    Ok(())
}

fn cmd_fonts(dir: &Path) -> Result<()> {
    let fonts = FontSet::open(dir, OcrOptions::default().default_font_hits)
        .with_context(|| format!("could not load fonts from {}", dir.display()))?;
    for font in fonts.references() {
        println!("{}: {} glyphs", font.name(), font.len());
    }
    let user = fonts.user();
    println!("{}: {} glyphs", user.name(), user.len());
    for (a, b) in fonts.list_duplicates() {
        let entries = user.entries();
        println!("duplicate: {:?} and {:?}", entries[a].symbol, entries[b].symbol);
    }
    Ok(())
}
