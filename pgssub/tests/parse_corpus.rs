extern crate env_logger;
extern crate glob;
extern crate pgssub;

use std::path::Path;

// To run this test, use `cargo test -- --ignored`.  This tests against a
// larger selection of *.sup files in our private corpus, which is
// unfortunately not open source.
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
        println!("{}", entry.display());
        process_file(&entry);
    }
}

fn process_file(path: &Path) {
    assert!(pgssub::is_sup_file(path).unwrap());
    let sup = pgssub::SupFile::open(path).unwrap();
    for (i, caption) in sup.captions().iter().enumerate() {
        assert_eq!(caption.index(), i + 1);
        if let Some(end) = caption.end_ms() {
            assert!(end + 1 >= caption.start_ms());
        }
        for img in caption.frame_images().unwrap() {
            assert!(img.width() > 0 && img.height() > 0);
        }
    }
}
