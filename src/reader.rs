use crate::codec::{read_entry, write_entry};
use crate::error::{Error, ErrorAccumulator, Result};
use crate::filter::GameFilter;
use crate::log;
use crate::stream::PgnStream;
use crate::types::Entry;
use crate::visitor::ReadOutcome;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder as ZstdDecoder;

pub type PgnInput = Box<dyn Read + Send>;

const INDEX_MAGIC: &[u8; 4] = b"PGNI";
const INDEX_VERSION: u32 = 1;
// Upper bound on the up-front reservation when loading; a corrupt count
// must not turn into a huge allocation.
const MAX_PREALLOCATED_ENTRIES: usize = 4096;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompressionMode {
    #[default]
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else if normalized.eq_ignore_ascii_case("plain") {
            Ok(Self::Plain)
        } else {
            Err(Error::InvalidCompression(normalized.to_string()))
        }
    }

    /// `.zst` files are zstd streams, everything else is read as is.
    pub fn from_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("zst") => Self::Zstd,
            _ => Self::Plain,
        }
    }
}

/// Settings for indexing PGN files.
#[derive(Clone, Debug, Default)]
pub struct IndexOptions {
    /// `None` infers the mode from each file's extension.
    pub compression: Option<CompressionMode>,
    /// Only entries passing the filter are kept.
    pub filter: Option<GameFilter>,
}

impl IndexOptions {
    fn compression_for(&self, path: &Path) -> CompressionMode {
        self.compression
            .unwrap_or_else(|| CompressionMode::from_path(path))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Headers read successfully, before filtering.
    pub games: usize,
    pub indexed: usize,
    /// Games dropped because of a malformed header.
    pub skipped: usize,
    /// Per-file failures, `; `-separated.
    pub errors: Option<String>,
}

impl IndexSummary {
    fn absorb(&mut self, other: IndexSummary) {
        self.games += other.games;
        self.indexed += other.indexed;
        self.skipped += other.skipped;
    }
}

/// Iterator over the game headers of one PGN stream.
///
/// Games with a malformed header are logged and skipped. An I/O error is
/// yielded once, after which the iterator is finished.
pub struct Entries<'a, R> {
    stream: &'a mut PgnStream<R>,
    next_game_index: usize,
    skipped: usize,
    finished: bool,
}

impl<'a, R: BufRead> Entries<'a, R> {
    pub fn new(stream: &'a mut PgnStream<R>) -> Self {
        Self {
            stream,
            next_game_index: 1,
            skipped: 0,
            finished: false,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for Entries<'_, R> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut entry = Entry::new();
        loop {
            let game_index = self.next_game_index;
            match entry.read_pgn(&mut *self.stream) {
                Ok(ReadOutcome::GameReady) => {
                    self.next_game_index += 1;
                    return Some(Ok(entry));
                }
                Ok(ReadOutcome::Exhausted) => {
                    self.finished = true;
                    return None;
                }
                Err(Error::MalformedTag { line, reason }) => {
                    self.next_game_index += 1;
                    self.skipped += 1;
                    log::warn(format!(
                        "Skipping game {game_index}: malformed tag at line {line}: {reason}"
                    ));
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// In-memory index over one PGN collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PgnIndex {
    entries: Vec<Entry>,
}

impl PgnIndex {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Reads every game header from `stream`, keeping the ones that pass
    /// `filter`.
    pub fn build<R: BufRead>(
        stream: &mut PgnStream<R>,
        filter: Option<&GameFilter>,
    ) -> Result<(Self, IndexSummary)> {
        let mut entries = Vec::new();
        let mut summary = IndexSummary::default();
        let mut games = Entries::new(stream);

        for entry in games.by_ref() {
            let entry = entry?;
            summary.games += 1;
            if filter.is_none_or(|f| f.matches(&entry)) {
                entries.push(entry);
            }
        }

        summary.indexed = entries.len();
        summary.skipped = games.skipped();
        Ok((Self { entries }, summary))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn filter<'a>(&'a self, filter: &'a GameFilter) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries.iter().filter(move |entry| filter.matches(entry))
    }

    /// Writes the index: magic, format version, entry count, then one record
    /// per entry.
    pub fn save<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(INDEX_MAGIC)?;
        out.write_u32::<BigEndian>(INDEX_VERSION)?;
        out.write_u64::<BigEndian>(self.entries.len() as u64)?;
        for entry in &self.entries {
            write_entry(out, entry)?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn load<R: Read>(input: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        input
            .read_exact(&mut magic)
            .map_err(Error::from_record_io)?;
        if &magic != INDEX_MAGIC {
            return Err(Error::corrupt(format!("bad index magic {magic:02X?}")));
        }

        let version = input
            .read_u32::<BigEndian>()
            .map_err(Error::from_record_io)?;
        if version != INDEX_VERSION {
            return Err(Error::corrupt(format!(
                "unsupported index version {version}"
            )));
        }

        let count = input
            .read_u64::<BigEndian>()
            .map_err(Error::from_record_io)?;
        let capacity = usize::try_from(count)
            .unwrap_or(usize::MAX)
            .min(MAX_PREALLOCATED_ENTRIES);
        let mut entries = Vec::with_capacity(capacity);
        for _ in 0..count {
            entries.push(read_entry(input)?);
        }
        Ok(Self { entries })
    }

    pub fn save_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.save(&mut BufWriter::new(file))
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(&mut BufReader::new(file))
    }
}

impl FromIterator<Entry> for PgnIndex {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PgnIndex {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Seeks `source` to the entry's move text and reads it up to the next
/// game. `source` must be the uncompressed PGN the entry was built from.
pub fn read_movetext<R: Read + Seek>(mut source: R, entry: &Entry) -> Result<String> {
    source.seek(SeekFrom::Start(entry.pos()))?;
    let mut stream =
        PgnStream::with_position(BufReader::new(source), entry.pos(), entry.line_number());
    stream.read_movetext()
}

pub fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<PgnInput> {
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(file)),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as PgnInput)
            .map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            }),
    }
}

/// An index built from one PGN file.
#[derive(Clone, Debug)]
pub struct IndexedFile {
    pub path: PathBuf,
    pub index: PgnIndex,
}

pub fn index_file(path: &Path, options: &IndexOptions) -> Result<(PgnIndex, IndexSummary)> {
    let input = open_input_stream(path, options.compression_for(path))?;
    let mut stream = PgnStream::new(BufReader::new(input));
    PgnIndex::build(&mut stream, options.filter.as_ref())
}

/// Indexes a single file or every file matching a glob pattern, one after
/// another.
///
/// With a single path any failure is returned. With several, a file that
/// cannot be read is logged, recorded in the summary and skipped.
pub fn index_paths(
    pattern: &str,
    options: &IndexOptions,
) -> Result<(Vec<IndexedFile>, IndexSummary)> {
    let paths: Vec<PathBuf> = if pattern.contains('*') || pattern.contains('?') {
        glob::glob(pattern)?.filter_map(|entry| entry.ok()).collect()
    } else {
        vec![PathBuf::from(pattern)]
    };

    let mut files = Vec::with_capacity(paths.len());
    let mut summary = IndexSummary::default();
    let mut errors = ErrorAccumulator::default();

    for path in &paths {
        match index_file(path, options) {
            Ok((index, file_summary)) => {
                summary.absorb(file_summary);
                files.push(IndexedFile {
                    path: path.clone(),
                    index,
                });
            }
            Err(err) if paths.len() == 1 => return Err(err),
            Err(err) => {
                let msg = format!("Failed to index '{}': {}", path.display(), err);
                log::error(&msg);
                errors.push(&msg);
            }
        }
    }

    summary.errors = errors.take();
    Ok((files, summary))
}
