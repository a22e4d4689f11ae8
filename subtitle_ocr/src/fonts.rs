//! Databases of learned glyph shapes.
//!
//! Each database lives in a directory as two files: `<name>.font.txt`
//! holds one label per line, with `\` and newlines escaped, and
//! `<name>.font.dat` holds the matching shapes:
//!
//! ```text
//! "GLYF" count:u32
//! (width:u16 height:u16 intensities:[u8; width * height]) * count
//! ```
//!
//! All integers are big-endian.  The database named `user` holds glyphs
//! labelled by hand; all others are reference fonts.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::glyph::GlyphShape;
use crate::pixmap::Pixmap;

/// The reserved name of the hand-labelled database.
pub const USER_FONT: &str = "user";

const SHAPE_MAGIC: &[u8; 4] = b"GLYF";

/// The kind of a font database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontKind {
    /// Glyphs labelled by hand during this or earlier sessions.
    User,
    /// A named set of previously learned glyphs.
    Reference(String),
}

impl FontKind {
    /// The name used for this database's files.
    pub fn name(&self) -> &str {
        match self {
            FontKind::User => USER_FONT,
            FontKind::Reference(name) => name,
        }
    }
}

/// A learned glyph.
#[derive(Clone, Debug)]
pub struct FontEntry {
    /// What this glyph says.
    pub symbol: String,
    /// What it looks like.
    pub shape: GlyphShape,
}

/// A successful lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontMatch {
    /// The symbol of the matching glyph.
    pub symbol: String,
    /// How different the glyphs were.  0 is identical.
    pub score: i32,
    /// The database the match came from.
    pub font: String,
}

fn label_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.font.txt", name))
}

fn shape_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.font.dat", name))
}

fn corrupt<S: Into<String>>(path: &Path, message: S) -> Error {
    Error::CorruptFontFile { path: path.to_owned(), message: message.into() }
}

fn escape_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_label(line: &str) -> Option<String> {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                '\\' => out.push('\\'),
                'n' => out.push('\n'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

fn read_shapes(data: &[u8]) -> io::Result<Vec<GlyphShape>> {
    let mut rdr = Cursor::new(data);
    let mut magic = [0; 4];
    rdr.read_exact(&mut magic)?;
    if &magic != SHAPE_MAGIC {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "missing GLYF header"));
    }
    let count = rdr.read_u32::<BigEndian>()?;
    let mut shapes = vec![];
    for _ in 0..count {
        let width = usize::from(rdr.read_u16::<BigEndian>()?);
        let height = usize::from(rdr.read_u16::<BigEndian>()?);
        let mut pixels = vec![0; width * height];
        rdr.read_exact(&mut pixels)?;
        let pixels = Pixmap::from_raw(width, height, pixels)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad glyph size"))?;
        shapes.push(GlyphShape::new(pixels));
    }
    if rdr.position() != data.len() as u64 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "trailing data"));
    }
    Ok(shapes)
}

fn write_shapes(entries: &[FontEntry]) -> io::Result<Vec<u8>> {
    let mut out = SHAPE_MAGIC.to_vec();
    let too_big = || io::Error::new(io::ErrorKind::InvalidInput, "glyph too large");
    out.write_u32::<BigEndian>(u32::try_from(entries.len()).map_err(|_| too_big())?)?;
    for entry in entries {
        let pixels = entry.shape.pixels();
        out.write_u16::<BigEndian>(u16::try_from(pixels.width()).map_err(|_| too_big())?)?;
        out.write_u16::<BigEndian>(u16::try_from(pixels.height()).map_err(|_| too_big())?)?;
        out.extend_from_slice(pixels.data());
    }
    Ok(out)
}

/// A named collection of learned glyphs.
#[derive(Clone, Debug)]
pub struct FontDatabase {
    kind: FontKind,
    entries: Vec<FontEntry>,
    changed: bool,
}

impl FontDatabase {
    /// Create an empty database.
    pub fn new(kind: FontKind) -> FontDatabase {
        FontDatabase { kind, entries: vec![], changed: false }
    }

    /// Load the database of the given kind from `dir`.
    pub fn load(dir: &Path, kind: FontKind) -> Result<FontDatabase> {
        let labels_path = label_path(dir, kind.name());
        let text = fs::read_to_string(&labels_path)
            .map_err(|e| Error::io(&labels_path, e))?;
        let labels = text
            .lines()
            .map(|line| {
                unescape_label(line)
                    .ok_or_else(|| corrupt(&labels_path, format!("bad escape in {:?}", line)))
            })
            .collect::<Result<Vec<_>>>()?;

        let shapes_path = shape_path(dir, kind.name());
        let data = fs::read(&shapes_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => corrupt(&shapes_path, "missing shape file"),
            _ => Error::io(&shapes_path, e),
        })?;
        let shapes = read_shapes(&data).map_err(|e| corrupt(&shapes_path, e.to_string()))?;
        if shapes.len() != labels.len() {
            return Err(corrupt(&shapes_path, format!(
                "{} shapes for {} labels", shapes.len(), labels.len())));
        }

        debug!("loaded {} glyphs from font {}", labels.len(), kind.name());
        let entries = labels
            .into_iter()
            .zip(shapes)
            .map(|(symbol, shape)| FontEntry { symbol, shape })
            .collect();
        Ok(FontDatabase { kind, entries, changed: false })
    }

    /// Write this database to `dir`, unless nothing changed since it was
    /// loaded or last saved.
    pub fn save(&mut self, dir: &Path) -> Result<()> {
        if !self.changed {
            return Ok(());
        }
        let labels_path = label_path(dir, self.name());
        let mut text = String::new();
        for entry in &self.entries {
            text.push_str(&escape_label(&entry.symbol));
            text.push('\n');
        }
        fs::write(&labels_path, text).map_err(|e| Error::io(&labels_path, e))?;

        let shapes_path = shape_path(dir, self.name());
        let data = write_shapes(&self.entries).map_err(|e| Error::io(&shapes_path, e))?;
        fs::write(&shapes_path, data).map_err(|e| Error::io(&shapes_path, e))?;
        debug!("saved {} glyphs to font {}", self.entries.len(), self.name());
        self.changed = false;
        Ok(())
    }

    /// The name of this database.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Is this the user database or a reference font?
    pub fn kind(&self) -> &FontKind {
        &self.kind
    }

    /// The glyphs in this database.
    pub fn entries(&self) -> &[FontEntry] {
        &self.entries
    }

    /// The number of glyphs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Does this database have any glyphs?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Has this database changed since it was loaded or saved?
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Learn a new glyph.
    pub fn insert(&mut self, symbol: &str, shape: GlyphShape) {
        self.entries.push(FontEntry { symbol: symbol.to_owned(), shape });
        self.changed = true;
    }

    /// Forget the glyph at `index`.
    pub fn remove(&mut self, index: usize) -> FontEntry {
        self.changed = true;
        self.entries.remove(index)
    }

    /// Every glyph whose score is within `tolerance`, keyed by score.  When
    /// two glyphs have the same score, the first one wins.
    pub fn matches(&self, shape: &GlyphShape, tolerance: i32) -> BTreeMap<i32, usize> {
        let mut found = BTreeMap::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if !shape.borders_match(&entry.shape) {
                continue;
            }
            let score = shape.score(&entry.shape);
            if score <= tolerance {
                found.entry(score).or_insert(i);
            }
        }
        found
    }

    /// The closest glyph within `tolerance`.
    pub fn best_match(&self, shape: &GlyphShape, tolerance: i32) -> Option<(i32, usize)> {
        self.matches(shape, tolerance).into_iter().next()
    }

    fn found(&self, score: i32, index: usize) -> FontMatch {
        FontMatch {
            symbol: self.entries[index].symbol.clone(),
            score,
            font: self.name().to_owned(),
        }
    }

    /// Pairs of glyphs which can't be told apart.
    pub fn list_duplicates(&self) -> Vec<(usize, usize)> {
        let mut duplicates = vec![];
        for (i, a) in self.entries.iter().enumerate() {
            for (j, b) in self.entries.iter().enumerate().skip(i + 1) {
                if a.shape.borders_match(&b.shape) && a.shape.score(&b.shape) == 0 {
                    duplicates.push((i, j));
                }
            }
        }
        duplicates
    }
}

/// The user database plus every reference font, with the matching policy
/// that decides which to ask first.
#[derive(Clone, Debug)]
pub struct FontSet {
    dir: Option<PathBuf>,
    user: FontDatabase,
    references: Vec<FontDatabase>,
    /// Lookups answered by each reference font.
    hits: Vec<usize>,
    default: Option<usize>,
    default_font_hits: usize,
}

impl FontSet {
    /// An empty set of fonts, kept in memory.  Once a reference font has
    /// answered more than `default_font_hits` lookups, it is asked first.
    pub fn new(default_font_hits: usize) -> FontSet {
        FontSet {
            dir: None,
            user: FontDatabase::new(FontKind::User),
            references: vec![],
            hits: vec![],
            default: None,
            default_font_hits,
        }
    }

    /// Load every font in `dir`.  A user database which can't be read is
    /// deleted and replaced with an empty one.
    pub fn open<P: AsRef<Path>>(dir: P, default_font_hits: usize) -> Result<FontSet> {
        let dir = dir.as_ref();
        let mut set = FontSet::new(default_font_hits);
        set.dir = Some(dir.to_owned());

        let mut names = vec![];
        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(".font.txt")) {
                names.push(name.to_owned());
            }
        }
        names.sort();

        for name in names {
            if name == USER_FONT {
                continue;
            }
            if !shape_path(dir, &name).exists() {
                warn!("font {} has no shape file, skipping it", name);
                continue;
            }
            set.add_reference(FontDatabase::load(dir, FontKind::Reference(name))?);
        }

        if label_path(dir, USER_FONT).exists() {
            match FontDatabase::load(dir, FontKind::User) {
                Ok(user) => set.user = user,
                Err(err @ Error::CorruptFontFile { .. }) => {
                    warn!("{}, starting a new user font", err);
                    for path in [label_path(dir, USER_FONT), shape_path(dir, USER_FONT)] {
                        match fs::remove_file(&path) {
                            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                                return Err(Error::io(path, e));
                            }
                            _ => {}
                        }
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Ok(set)
    }

    /// Add a reference font.
    pub fn add_reference(&mut self, font: FontDatabase) {
        self.references.push(font);
        self.hits.push(0);
    }

    /// The hand-labelled glyphs.
    pub fn user(&self) -> &FontDatabase {
        &self.user
    }

    /// The reference fonts.
    pub fn references(&self) -> &[FontDatabase] {
        &self.references
    }

    /// The reference font we ask first, once we've picked one.
    pub fn default_font(&self) -> Option<&str> {
        self.default.map(|i| self.references[i].name())
    }

    fn choose_default(&mut self) {
        if self.default.is_some() {
            return;
        }
        let best = self.hits.iter().enumerate()
            .filter(|&(_, &hits)| hits > self.default_font_hits)
            .fold(None, |best: Option<(usize, usize)>, (i, &hits)| match best {
                Some((_, most)) if most >= hits => best,
                _ => Some((i, hits)),
            });
        if let Some((i, hits)) = best {
            debug!("using {} as the default font after {} hits", self.references[i].name(), hits);
            self.default = Some(i);
        }
    }

    /// Find the glyph that looks most like `shape`.  We trust very close
    /// matches from the user database first, then the default font, then
    /// the best match from any other font, and finally any match from the
    /// user database.
    pub fn find_match(&mut self, shape: &GlyphShape, tolerance: i32) -> Option<FontMatch> {
        self.choose_default();

        if let Some((score, i)) = self.user.best_match(shape, tolerance / 10) {
            return Some(self.user.found(score, i));
        }

        if let Some(d) = self.default {
            if let Some((score, i)) = self.references[d].best_match(shape, tolerance) {
                return Some(self.references[d].found(score, i));
            }
        }

        let mut combined: BTreeMap<i32, FontMatch> = BTreeMap::new();
        for (i, font) in self.references.iter().enumerate() {
            if Some(i) == self.default {
                continue;
            }
            let found = font.matches(shape, tolerance);
            if !found.is_empty() {
                self.hits[i] += 1;
            }
            for (score, index) in found {
                combined.entry(score).or_insert_with(|| font.found(score, index));
            }
        }
        if let Some((_, found)) = combined.into_iter().next() {
            return Some(found);
        }

        self.user.best_match(shape, tolerance).map(|(score, i)| self.user.found(score, i))
    }

    /// Teach the user database a new glyph.
    pub fn insert(&mut self, symbol: &str, shape: GlyphShape) {
        debug!("learning {:?} ({}x{})", symbol, shape.width(), shape.height());
        self.user.insert(symbol, shape);
    }

    /// Forget the user glyph closest to `shape`, returning its symbol.
    pub fn delete(&mut self, shape: &GlyphShape, tolerance: i32) -> Option<String> {
        let (_, i) = self.user.best_match(shape, tolerance)?;
        Some(self.user.remove(i).symbol)
    }

    /// Move every user glyph into the reference font named `target`,
    /// skipping exact duplicates.  Returns the number of glyphs moved.
    pub fn merge(&mut self, target: &str) -> Result<usize> {
        let index = self.references.iter()
            .position(|font| font.name() == target)
            .ok_or_else(|| Error::UnknownTarget { name: target.to_owned() })?;
        let entries = std::mem::take(&mut self.user.entries);
        self.user.changed = true;
        let font = &mut self.references[index];
        let mut moved = 0;
        for entry in entries {
            let duplicate = font.entries.iter().any(|e| {
                e.symbol == entry.symbol && e.shape.pixels() == entry.shape.pixels()
            });
            if !duplicate {
                font.entries.push(entry);
                moved += 1;
            }
        }
        font.changed = true;
        debug!("merged {} glyphs into font {}", moved, target);
        Ok(moved)
    }

    /// Pairs of user glyphs which can't be told apart.
    pub fn list_duplicates(&self) -> Vec<(usize, usize)> {
        self.user.list_duplicates()
    }

    /// Save every changed database to the directory we were opened from.
    /// Fonts created with `new` have nowhere to go, so this does nothing.
    pub fn save(&mut self) -> Result<()> {
        let Some(dir) = self.dir.clone() else {
            return Ok(());
        };
        self.user.save(&dir)?;
        for font in &mut self.references {
            font.save(&dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::pixmap_from_rows;
    use quickcheck::{quickcheck, Arbitrary, Gen};

    fn shape(rows: &[&str]) -> GlyphShape {
        GlyphShape::new(pixmap_from_rows(rows))
    }

    fn letter_l() -> GlyphShape {
        shape(&["##....", "##....", "##....", "##....", "##....", "######"])
    }

    fn letter_o() -> GlyphShape {
        shape(&["######", "##..##", "##..##", "##..##", "##..##", "######"])
    }

    #[derive(Clone, Debug)]
    struct RandomShape(GlyphShape);

    impl Arbitrary for RandomShape {
        fn arbitrary(g: &mut Gen) -> Self {
            let w = 3 + usize::arbitrary(g) % 3;
            let h = 3 + usize::arbitrary(g) % 3;
            let rows: Vec<String> = (0..h)
                .map(|y| (0..w)
                     .map(|x| if (x, y) == (0, 0) || bool::arbitrary(g) { '#' } else { '.' })
                     .collect())
                .collect();
            let rows: Vec<&str> = rows.iter().map(|r| r.as_str()).collect();
            RandomShape(shape(&rows))
        }
    }

    quickcheck! {
        fn raising_the_tolerance_never_loses_a_match(known: Vec<RandomShape>,
                                                     query: RandomShape,
                                                     tolerance: u16,
                                                     extra: u16) -> bool {
            let mut font = FontDatabase::new(FontKind::User);
            for (i, RandomShape(shape)) in known.into_iter().enumerate() {
                font.insert(&i.to_string(), shape);
            }
            let tolerance = i32::from(tolerance);
            match font.best_match(&query.0, tolerance) {
                None => true,
                Some((score, _)) => font
                    .best_match(&query.0, tolerance + i32::from(extra))
                    .map_or(false, |(wider, _)| wider <= score),
            }
        }
    }

    fn reference(name: &str, glyphs: &[(&str, GlyphShape)]) -> FontDatabase {
        let mut font = FontDatabase::new(FontKind::Reference(name.to_owned()));
        for (symbol, shape) in glyphs {
            font.insert(symbol, shape.clone());
        }
        font.changed = false;
        font
    }

    #[test]
    fn inserted_glyphs_match_themselves() {
        let mut fonts = FontSet::new(10);
        fonts.insert("L", letter_l());
        let found = fonts.find_match(&letter_l(), 500).unwrap();
        assert_eq!(found.symbol, "L");
        assert_eq!(found.score, 0);
        assert_eq!(found.font, USER_FONT);
        assert!(fonts.find_match(&letter_o(), 500).is_none());
    }

    #[test]
    fn default_font_is_chosen_after_enough_hits() {
        let mut fonts = FontSet::new(2);
        fonts.add_reference(reference("a", &[("L", letter_l())]));
        fonts.add_reference(reference("b", &[("O", letter_o()), ("l", letter_l())]));
        for _ in 0..3 {
            assert!(fonts.find_match(&letter_o(), 500).is_some());
        }
        assert_eq!(fonts.default_font(), None);
        fonts.find_match(&letter_o(), 500);
        assert_eq!(fonts.default_font(), Some("b"));
        assert_eq!(fonts.find_match(&letter_l(), 500).unwrap().symbol, "l");
    }

    #[test]
    fn delete_removes_the_closest_user_glyph() {
        let mut fonts = FontSet::new(10);
        fonts.insert("O", letter_o());
        fonts.insert("L", letter_l());
        assert_eq!(fonts.delete(&letter_l(), 500).as_deref(), Some("L"));
        assert_eq!(fonts.user().len(), 1);
        assert_eq!(fonts.delete(&letter_l(), 500), None);
    }

    #[test]
    fn merge_moves_user_glyphs_without_duplicates() {
        let mut fonts = FontSet::new(10);
        fonts.add_reference(reference("main", &[("L", letter_l())]));
        fonts.insert("L", letter_l());
        fonts.insert("O", letter_o());
        assert_eq!(fonts.merge("main").unwrap(), 1);
        assert!(fonts.user().is_empty());
        assert_eq!(fonts.references()[0].len(), 2);
        assert!(matches!(fonts.merge("missing"), Err(Error::UnknownTarget { .. })));
    }

    #[test]
    fn duplicates_are_listed() {
        let mut fonts = FontSet::new(10);
        fonts.insert("l", letter_l());
        fonts.insert("O", letter_o());
        fonts.insert("L", letter_l());
        assert_eq!(fonts.list_duplicates(), vec![(0, 2)]);
    }

    #[test]
    fn labels_are_escaped() {
        for label in ["a", "\\", "\n", "a\\nb", "\u{a4}"] {
            assert_eq!(unescape_label(&escape_label(label)).as_deref(), Some(label));
        }
        assert_eq!(unescape_label("bad\\x"), None);
        assert_eq!(unescape_label("bad\\"), None);
    }

    #[test]
    fn fonts_survive_a_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut fonts = FontSet::open(dir.path(), 10).unwrap();
        fonts.insert("L", letter_l());
        fonts.insert("\n", letter_o());
        fonts.save().unwrap();
        assert!(!fonts.user().is_changed());

        let mut fonts = FontSet::open(dir.path(), 10).unwrap();
        assert_eq!(fonts.user().len(), 2);
        assert_eq!(fonts.user().entries()[1].symbol, "\n");
        assert_eq!(fonts.find_match(&letter_l(), 500).unwrap().symbol, "L");
    }

    #[test]
    fn reference_fonts_are_discovered() {
        let dir = tempfile::tempdir().unwrap();
        let mut font = reference("serif", &[("L", letter_l())]);
        font.changed = true;
        font.save(dir.path()).unwrap();
        fs::write(dir.path().join("orphan.font.txt"), "x\n").unwrap();

        let fonts = FontSet::open(dir.path(), 10).unwrap();
        assert_eq!(fonts.references().len(), 1);
        assert_eq!(fonts.references()[0].name(), "serif");
        assert_eq!(fonts.references()[0].entries()[0].shape, letter_l());
    }

    #[test]
    fn corrupt_user_fonts_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("user.font.txt"), "a\nb\n").unwrap();
        fs::write(dir.path().join("user.font.dat"), b"GLYF\0\0\0\x01").unwrap();
        assert!(matches!(FontDatabase::load(dir.path(), FontKind::User),
                         Err(Error::CorruptFontFile { .. })));

        let fonts = FontSet::open(dir.path(), 10).unwrap();
        assert!(fonts.user().is_empty());
        assert!(!dir.path().join("user.font.txt").exists());
    }
}
