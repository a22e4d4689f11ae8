//! Recognizing synthetic captions end to end.

extern crate env_logger;
extern crate pgssub;
extern crate subtitle_ocr;

use pgssub::builder::SupBuilder;
use pgssub::segment::PaletteEntry;
use std::sync::{Arc, Mutex};
use subtitle_ocr::{BatchEvent, BatchWorker, Error, FontSet, OcrContext, OcrOptions,
                   ScanMode, ScanSummary, SPACE};

const WIDTH: usize = 60;
const HEIGHT: usize = 30;

/// A solid block.
fn draw_block(pixels: &mut [u8], left: usize) {
    for y in 3..27 {
        for x in left..left + 8 {
            pixels[y * WIDTH + x] = 1;
        }
    }
}

/// A thick "L".
fn draw_ell(pixels: &mut [u8], left: usize) {
    for y in 3..27 {
        for x in left..left + 3 {
            pixels[y * WIDTH + x] = 1;
        }
    }
    for y in 24..27 {
        for x in left..left + 8 {
            pixels[y * WIDTH + x] = 1;
        }
    }
}

/// Two glyphs with a space between them.
fn pixels(block_first: bool) -> Vec<u8> {
    let mut pixels = vec![0; WIDTH * HEIGHT];
    if block_first {
        draw_block(&mut pixels, 5);
        draw_ell(&mut pixels, 33);
    } else {
        draw_ell(&mut pixels, 5);
        draw_block(&mut pixels, 33);
    }
    pixels
}

fn captions() -> Vec<pgssub::Caption> {
    let palette = [
        PaletteEntry { index: 0, y: 16, cr: 128, cb: 128, alpha: 0 },
        PaletteEntry { index: 1, y: 235, cr: 128, cb: 128, alpha: 255 },
    ];
    let size = (WIDTH as u16, HEIGHT as u16);
    let data = SupBuilder::new()
        .caption(1000, 2000, size, &pixels(true), &palette)
        .caption(3000, 4000, size, &pixels(false), &palette)
        .caption(5000, 6000, size, &pixels(true), &palette)
        .build();
    pgssub::SupFile::from_bytes(&data).unwrap().into_captions()
}

fn context() -> OcrContext {
    OcrContext::new(OcrOptions::default(), FontSet::new(10))
}

/// Teach `ctx` the glyphs in the first caption.
fn teach(ctx: &mut OcrContext, caption: &pgssub::Caption) {
    let mut scanned = ctx.scan(caption.index(), &caption.to_image().unwrap()).unwrap();
    let labels = ["#", SPACE, "L"];
    assert_eq!(scanned.glyphs().len(), labels.len());
    for (i, label) in labels.iter().enumerate() {
        let mut glyph = scanned.glyphs()[i].clone();
        if !glyph.is_resolved() {
            assert!(ctx.insert(&mut glyph, label));
        }
    }
    ctx.recognize(&mut scanned, true).unwrap();
}

#[test]
fn captions_are_segmented_into_glyphs_and_spaces() {
    let _ = env_logger::builder().is_test(true).try_init();
    let captions = captions();
    assert_eq!(captions.len(), 3);
    let mut ctx = context();
    let scanned = ctx.scan(1, &captions[0].to_image().unwrap()).unwrap();
    assert_eq!(scanned.lines().len(), 1);
    assert_eq!(scanned.glyphs().len(), 3);
    assert!(scanned.glyphs()[1].is_space());
    assert_eq!(scanned.unresolved().count(), 2);
    assert_eq!(scanned.tagged_text(), "¤ ¤");
}

#[test]
fn unknown_glyphs_can_be_reported() {
    let captions = captions();
    let mut ctx = context();
    let image = captions[0].to_image().unwrap();
    assert!(matches!(ctx.ocr(1, &image, true), Err(Error::UnknownSymbol { caption: 1 })));
    assert!(ctx.ocr(1, &image, false).is_ok());
}

#[test]
fn learned_glyphs_are_recognized() {
    let captions = captions();
    let mut ctx = context();
    teach(&mut ctx, &captions[0]);
    let second = ctx.ocr(2, &captions[1].to_image().unwrap(), true).unwrap();
    assert_eq!(second.tagged_text(), "L #");
    assert!(second.is_complete());
}

#[test]
fn batch_stops_at_unknown_glyphs_and_resumes() {
    let captions = captions();
    let ctx = Arc::new(Mutex::new(context()));

    let worker = BatchWorker::spawn(ctx.clone(), captions.clone(), 0, ScanMode::ReportUnknown);
    let events: Vec<_> = worker.events().iter().collect();
    assert_eq!(events, vec![
        BatchEvent::Progress { caption: 1 },
        BatchEvent::NeedsLabel { caption: 1 },
        BatchEvent::Finished { cancelled: false },
    ]);
    assert!(worker.join().is_empty());

    teach(&mut ctx.lock().unwrap(), &captions[0]);
    let worker = BatchWorker::spawn(ctx.clone(), captions.clone(), 0, ScanMode::ReportUnknown);
    let texts: Vec<_> = worker.events().iter()
        .filter_map(|e| match e {
            BatchEvent::Scanned { caption, text } => Some((caption, text)),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec![
        (1, "# L".to_owned()),
        (2, "L #".to_owned()),
        (3, "# L".to_owned()),
    ]);
    let scanned = worker.join();
    assert_eq!(ScanSummary::new(captions.len(), &scanned),
               ScanSummary { unscanned: 0, finished: 3, with_errors: 0 });
}

#[test]
fn batch_can_start_part_way_through() {
    let captions = captions();
    let ctx = Arc::new(Mutex::new(context()));
    let worker = BatchWorker::spawn(ctx, captions.clone(), 2, ScanMode::SkipUnknown);
    let scanned = worker.join();
    assert_eq!(scanned.len(), 1);
    assert_eq!(scanned[0].index(), 3);
    assert_eq!(ScanSummary::new(captions.len(), &scanned),
               ScanSummary { unscanned: 2, finished: 0, with_errors: 1 });
}

#[test]
fn batch_can_be_cancelled() {
    let captions = captions();
    let ctx = Arc::new(Mutex::new(context()));
    let guard = ctx.lock().unwrap();
    let worker = BatchWorker::spawn(ctx.clone(), captions, 0, ScanMode::SkipUnknown);
    worker.cancel();
    drop(guard);
    let events: Vec<_> = worker.events().iter().collect();
    assert_eq!(events.last(), Some(&BatchEvent::Finished { cancelled: true }));
    assert!(worker.join().len() <= 1);
}
