//! Integration tests for our command-line interface.  We actually run the
//! binary and make sure it produces the expected output.

use std::fs;
use std::str::from_utf8;

use cli_test_dir::TestDir;
use pgssub::builder::SupBuilder;
use pgssub::segment::PaletteEntry;
use pgssub::SupFile;
use subtitle_ocr::{FontSet, OcrContext, OcrOptions};

const WIDTH: usize = 60;
const HEIGHT: usize = 30;

/// Two solid blocks with a gap between them.
fn sample_sup() -> Vec<u8> {
    sample_sup_at(800)
}

/// Like `sample_sup`, with the captions' top edge at `top`.
fn sample_sup_at(top: u16) -> Vec<u8> {
    let mut pixels = vec![0; WIDTH * HEIGHT];
    for y in 3..27 {
        for x in (5..13).chain(33..41) {
            pixels[y * WIDTH + x] = 1;
        }
    }
    let palette = [
        PaletteEntry { index: 0, y: 16, cr: 128, cb: 128, alpha: 0 },
        PaletteEntry { index: 1, y: 235, cr: 128, cb: 128, alpha: 255 },
    ];
    let size = (WIDTH as u16, HEIGHT as u16);
    SupBuilder::new()
        .caption_at(1000, 2000, (100, top), size, &pixels, &palette)
        .caption_at(3000, 4000, (100, top), size, &pixels, &palette)
        .build()
}

/// Put a user font in `fonts/` which reads both blocks of `sample_sup` as
/// `label`.
fn teach_user_font(testdir: &TestDir, label: &str) {
    let dir = tempfile::tempdir().unwrap();
    let fonts = FontSet::open(dir.path(), 10).unwrap();
    let mut ctx = OcrContext::new(OcrOptions::default(), fonts);
    let captions = SupFile::from_bytes(&sample_sup()).unwrap().into_captions();
    let caption = &captions[0];
    let scanned = ctx.scan(caption.index(), &caption.to_image().unwrap()).unwrap();
    let mut glyph = scanned.glyphs()[0].clone();
    assert!(ctx.insert(&mut glyph, label));
    ctx.fonts_mut().save().unwrap();
    for name in ["user.font.txt", "user.font.dat"] {
        let data = fs::read(dir.path().join(name)).unwrap();
        testdir.create_file(format!("fonts/{}", name), data);
    }
}

/// Run `sup2srt ocr` on `movie.sup` with `extra` arguments, and return the
/// *.srt file.
fn run_ocr(testdir: &TestDir, extra: &[&str]) -> String {
    let output = testdir
        .cmd()
        .args(["ocr", "--fonts", "fonts"])
        .args(extra)
        .arg("movie.sup")
        .output()
        .expect("could not run sup2srt");
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn show_help() {
    let testdir = TestDir::new("sup2srt", "show_help");
    let output = testdir
        .cmd()
        .arg("--help")
        .output()
        .expect("could not run sup2srt");
    assert!(output.status.success());
    assert!(from_utf8(&output.stdout).unwrap().contains("Usage"));
}

#[test]
fn cmd_images() {
    let testdir = TestDir::new("sup2srt", "cmd_images");
    testdir.create_file("movie.sup", sample_sup());
    let output = testdir
        .cmd()
        .arg("images")
        .arg("movie.sup")
        .output()
        .expect("could not run sup2srt");
    assert!(output.status.success());
    testdir.expect_path("movie_subtitles/0001.png");
    testdir.expect_path("movie_subtitles/0002.png");
    testdir.expect_contains("movie_subtitles/index.json", "\"start\": 3000");
    testdir.expect_contains("movie_subtitles/index.json", "\"size\": [");
}

#[test]
fn cmd_images_with_out_dir() {
    let testdir = TestDir::new("sup2srt", "cmd_images_with_out_dir");
    testdir.create_file("movie.sup", sample_sup());
    let output = testdir
        .cmd()
        .args(["images", "-o", "pngs", "movie.sup"])
        .output()
        .expect("could not run sup2srt");
    assert!(output.status.success());
    testdir.expect_path("pngs/0001.png");
    testdir.expect_path("pngs/index.json");
}

#[test]
fn cmd_ocr_without_fonts_marks_unknown_glyphs() {
    let testdir = TestDir::new("sup2srt", "cmd_ocr_without_fonts");
    testdir.create_file("movie.sup", sample_sup());
    let output = testdir
        .cmd()
        .args(["ocr", "--fonts", "fonts", "-o", "movie.srt", "movie.sup"])
        .output()
        .expect("could not run sup2srt");
    assert!(output.status.success());
    testdir.expect_path("fonts");
    testdir.expect_contains("movie.srt", "1\n00:00:01,000 --> 00:00:03,999\n¤ ¤\n");
    testdir.expect_does_not_contain("movie.srt", "2\n");
    assert!(from_utf8(&output.stderr)
        .unwrap()
        .contains("0 finished, 2 with errors, 0 unscanned"));
}

#[test]
fn cmd_ocr_no_combine() {
    let testdir = TestDir::new("sup2srt", "cmd_ocr_no_combine");
    testdir.create_file("movie.sup", sample_sup());
    let srt = run_ocr(&testdir, &["--no-combine"]);
    assert!(srt.contains("1\n00:00:01,000 --> 00:00:01,999\n¤ ¤\n"));
    assert!(srt.contains("2\n00:00:03,000 --> 00:00:03,999\n¤ ¤\n"));
}

#[test]
fn cmd_ocr_pts_offset() {
    let testdir = TestDir::new("sup2srt", "cmd_ocr_pts_offset");
    testdir.create_file("movie.sup", sample_sup());
    let srt = run_ocr(&testdir, &["--no-combine", "--pts-offset", "500"]);
    assert!(srt.contains("1\n00:00:00,500 --> 00:00:01,499\n"));
    assert!(srt.contains("2\n00:00:02,500 --> 00:00:03,499\n"));

    let srt = run_ocr(&testdir, &["--pts-offset", "-500"]);
    assert!(srt.contains("1\n00:00:01,500 --> 00:00:04,499\n"));
}

#[test]
fn cmd_ocr_preserve_positions() {
    let testdir = TestDir::new("sup2srt", "cmd_ocr_preserve_positions");
    testdir.create_file("movie.sup", sample_sup_at(100));
    assert!(run_ocr(&testdir, &[]).contains("\n¤ ¤\n"));
    assert!(run_ocr(&testdir, &["--preserve-positions"]).contains("\n{\\an8}¤ ¤\n"));
}

#[test]
fn cmd_ocr_double_apostrophes() {
    let testdir = TestDir::new("sup2srt", "cmd_ocr_double_apostrophes");
    testdir.create_file("movie.sup", sample_sup());
    teach_user_font(&testdir, "''");
    assert!(run_ocr(&testdir, &[]).contains("\n\" \"\n"));
    assert!(run_ocr(&testdir, &["--keep-double-apostrophes"]).contains("\n'' ''\n"));
}

#[test]
fn cmd_ocr_strip_formatting() {
    let testdir = TestDir::new("sup2srt", "cmd_ocr_strip_formatting");
    testdir.create_file("movie.sup", sample_sup());
    teach_user_font(&testdir, "<i>A</i>");
    assert!(run_ocr(&testdir, &[]).contains("\n<i>A</i> <i>A</i>\n"));
    assert!(run_ocr(&testdir, &["--strip-formatting"]).contains("\nA A\n"));
}

#[test]
fn cmd_ocr_forced_only() {
    let testdir = TestDir::new("sup2srt", "cmd_ocr_forced_only");
    testdir.create_file("movie.sup", sample_sup());
    let output = testdir
        .cmd()
        .args(["ocr", "--fonts", "fonts", "--forced-only", "movie.sup"])
        .output()
        .expect("could not run sup2srt");
    assert!(output.status.success());
    assert!(from_utf8(&output.stdout).unwrap().is_empty());
}

#[test]
fn cmd_ocr_rejects_bad_config() {
    let testdir = TestDir::new("sup2srt", "cmd_ocr_rejects_bad_config");
    testdir.create_file("movie.sup", sample_sup());
    testdir.create_file("config.json", "{ not json");
    let output = testdir
        .cmd()
        .args(["ocr", "--fonts", "fonts", "--config", "config.json", "movie.sup"])
        .output()
        .expect("could not run sup2srt");
    assert!(!output.status.success());
    assert!(from_utf8(&output.stderr).unwrap().contains("config.json"));
}

#[test]
fn cmd_fonts_lists_user_font() {
    let testdir = TestDir::new("sup2srt", "cmd_fonts");
    testdir.create_file("fonts/README", "");
    let output = testdir
        .cmd()
        .args(["fonts", "fonts"])
        .output()
        .expect("could not run sup2srt");
    assert!(output.status.success());
    assert!(from_utf8(&output.stdout).unwrap().contains("user: 0 glyphs"));
}
