extern crate env_logger;
extern crate glob;
#[macro_use]
extern crate log;
extern crate pgssub;
extern crate subtitle_ocr;

use std::path::Path;
use subtitle_ocr::{FontSet, OcrContext, OcrOptions};

// To run this test, use `cargo test -- --ignored`.  This tests against a
// larger selection of *.sup files in our private corpus, which is
// unfortunately not open source.  Fonts are loaded from `../private/fonts`.
#[test]
#[ignore]
fn private_corpus() {
    let _ = env_logger::builder().is_test(true).try_init();

    let options = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    for entry in glob::glob_with("../private/**/*.sup", options).unwrap() {
        let entry = entry.unwrap();
        process_file(&entry);
    }
}

fn process_file(path: &Path) {
    debug!("Processing {}", path.display());
    let options = OcrOptions::default();
    let fonts = FontSet::open("../private/fonts", options.default_font_hits).unwrap();
    let mut ctx = OcrContext::new(options, fonts);
    let sup = pgssub::SupFile::open(path).unwrap();
    for caption in sup.captions() {
        let image = caption.to_image().unwrap();
        match ctx.ocr(caption.index(), &image, false) {
            Ok(scanned) => debug!("{}: {}", caption.index(), scanned.tagged_text()),
            Err(err) => debug!("{}: {}", caption.index(), err),
        }
    }
}
