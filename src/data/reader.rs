//! Tab-separated benchmark readers
//!
//! The benchmark archives are gzip-compressed TSV files with a header row.
//! Fields are split on tabs only: there is no quoting, so a `"` inside a
//! sentence is kept verbatim.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::info;

use super::{InputExample, Label, Split};
use crate::{Error, Result};

/// NLI label names and their class ids
pub const NLI_LABELS: [(&str, u32); 3] = [("contradiction", 0), ("entailment", 1), ("neutral", 2)];

/// Upper bound on NLI training pairs read by default
pub const DEFAULT_MAX_NLI_EXAMPLES: usize = 10_000;

/// STS raw scores are on a 0–5 scale
const STS_SCORE_MAX: f32 = 5.0;

/// One data row of a TSV file
#[derive(Debug, Clone)]
pub struct Row {
    fields: Vec<String>,
    line: usize,
}

impl Row {
    /// Field at column index; missing trailing fields read as empty
    #[must_use]
    pub fn get(&self, idx: usize) -> &str {
        self.fields.get(idx).map_or("", String::as_str)
    }

    /// 1-based line number in the source file
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }
}

/// Streaming reader over a (optionally gzip-compressed) TSV file
pub struct TsvReader {
    path: PathBuf,
    header: HashMap<String, usize>,
    lines: std::io::Lines<Box<dyn BufRead>>,
    line_no: usize,
}

impl TsvReader {
    /// Open `path`, decompressing when it ends in `.gz`, and read the header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file =
            File::open(&path).map_err(|e| Error::io(format!("opening {}", path.display()), e))?;

        let reader: Box<dyn BufRead> = if path.extension().and_then(|ext| ext.to_str()) == Some("gz") {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let mut lines = reader.lines();
        let header_line = match lines.next() {
            Some(line) => line.map_err(|e| Error::io(format!("reading {}", path.display()), e))?,
            None => {
                return Err(Error::EmptyDataset { context: format!("{} has no header", path.display()) })
            }
        };

        let header = split_fields(&header_line)
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (name, idx))
            .collect();

        Ok(Self { path, header, lines, line_no: 1 })
    }

    /// Index of a named column
    pub fn column(&self, name: &str) -> Result<usize> {
        self.header
            .get(name)
            .copied()
            .ok_or_else(|| Error::MissingColumn { column: name.to_string(), path: self.path.clone() })
    }

    /// Path of the underlying file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for TsvReader {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(Error::io(format!("reading {}", self.path.display()), e)))
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(Ok(Row { fields: split_fields(&line), line: self.line_no }));
        }
    }
}

fn split_fields(line: &str) -> Vec<String> {
    line.trim_end_matches(['\r', '\n']).split('\t').map(str::to_string).collect()
}

/// Map an NLI label name to its class id
pub fn nli_label_id(label: &str) -> Option<u32> {
    NLI_LABELS.iter().find(|(name, _)| *name == label).map(|(_, id)| *id)
}

/// Read up to `max_examples` NLI training pairs.
///
/// Only rows whose split is `train` are used. A label outside
/// [`NLI_LABELS`] aborts reading with [`Error::UnknownLabel`].
pub fn read_nli(path: impl AsRef<Path>, max_examples: usize) -> Result<Vec<InputExample>> {
    let reader = TsvReader::open(path)?;
    let split_col = reader.column("split")?;
    let s1_col = reader.column("sentence1")?;
    let s2_col = reader.column("sentence2")?;
    let label_col = reader.column("label")?;
    let path = reader.path().to_path_buf();

    let mut examples = Vec::new();
    if max_examples == 0 {
        return Ok(examples);
    }

    for row in reader {
        let row = row?;
        if Split::parse(row.get(split_col)) != Some(Split::Train) {
            continue;
        }
        let label = row.get(label_col);
        let id = nli_label_id(label).ok_or_else(|| Error::UnknownLabel {
            label: label.to_string(),
            path: path.clone(),
            known: NLI_LABELS.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", "),
        })?;
        examples.push(InputExample::pair(row.get(s1_col), row.get(s2_col), Label::Class(id)));
        if examples.len() >= max_examples {
            break;
        }
    }

    info!(path = %path.display(), examples = examples.len(), "read NLI train pairs");
    Ok(examples)
}

/// STS benchmark partitioned by split
#[derive(Debug, Clone, Default)]
pub struct StsSplits {
    /// Training pairs (every row that is neither dev nor test)
    pub train: Vec<InputExample>,
    /// Development pairs
    pub dev: Vec<InputExample>,
    /// Test pairs
    pub test: Vec<InputExample>,
}

/// Read the STS benchmark, normalizing scores from 0–5 to `[0, 1]`.
pub fn read_sts(path: impl AsRef<Path>) -> Result<StsSplits> {
    let reader = TsvReader::open(path)?;
    let split_col = reader.column("split")?;
    let s1_col = reader.column("sentence1")?;
    let s2_col = reader.column("sentence2")?;
    let score_col = reader.column("score")?;
    let path = reader.path().to_path_buf();

    let mut splits = StsSplits::default();
    for row in reader {
        let row = row?;
        let raw = row.get(score_col);
        let score: f32 = raw.trim().parse().map_err(|e| Error::Parse {
            path: path.clone(),
            line: row.line(),
            message: format!("score '{raw}': {e}"),
        })?;
        let example =
            InputExample::pair(row.get(s1_col), row.get(s2_col), Label::Score(score / STS_SCORE_MAX));

        match Split::parse(row.get(split_col)) {
            Some(Split::Dev) => splits.dev.push(example),
            Some(Split::Test) => splits.test.push(example),
            _ => splits.train.push(example),
        }
    }

    info!(
        path = %path.display(),
        train = splits.train.len(),
        dev = splits.dev.len(),
        test = splits.test.len(),
        "read STS benchmark"
    );
    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn write_gz(path: &Path, content: &str) {
        let file = File::create(path).unwrap();
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(content.as_bytes()).unwrap();
        enc.finish().unwrap();
    }

    #[test]
    fn test_read_nli_filters_train_and_maps_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nli.tsv.gz");
        write_gz(
            &path,
            "split\tdataset\tfilename\tsentence1\tsentence2\tlabel\n\
             train\tSNLI\tx\tA man.\tA person.\tentailment\n\
             dev\tSNLI\tx\tA dog.\tA cat.\tcontradiction\n\
             train\tSNLI\tx\tA kid.\tA child plays.\tneutral\n",
        );

        let examples = read_nli(&path, 100).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].label(), Label::Class(1));
        assert_eq!(examples[1].label(), Label::Class(2));
        assert_eq!(examples[1].texts()[1], "A child plays.");
    }

    #[test]
    fn test_read_nli_respects_max() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nli.tsv.gz");
        let mut content = String::from("split\tsentence1\tsentence2\tlabel\n");
        for i in 0..20 {
            content.push_str(&format!("train\ts{i}\tt{i}\tneutral\n"));
        }
        write_gz(&path, &content);
        assert_eq!(read_nli(&path, 7).unwrap().len(), 7);
    }

    #[test]
    fn test_read_nli_unknown_label_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nli.tsv.gz");
        write_gz(&path, "split\tsentence1\tsentence2\tlabel\ntrain\ta\tb\tmaybe\n");
        let err = read_nli(&path, 10).unwrap_err();
        assert!(matches!(err, Error::UnknownLabel { ref label, .. } if label == "maybe"));
    }

    #[test]
    fn test_read_sts_partitions_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sts.tsv.gz");
        write_gz(
            &path,
            "split\tgenre\tdataset\tyear\tsid\tscore\tsentence1\tsentence2\n\
             train\tmain\tx\t2012\t1\t5.000\tA plane.\tAn airplane.\n\
             dev\tmain\tx\t2012\t2\t2.5\tA man.\tA woman.\n\
             test\tmain\tx\t2012\t3\t0\tRain.\tSun.\n\
             extra\tmain\tx\t2012\t4\t1.0\tX.\tY.\n",
        );

        let splits = read_sts(&path).unwrap();
        assert_eq!(splits.train.len(), 2);
        assert_eq!(splits.dev.len(), 1);
        assert_eq!(splits.test.len(), 1);
        assert_eq!(splits.train[0].label(), Label::Score(1.0));
        assert_eq!(splits.dev[0].label(), Label::Score(0.5));
        assert_eq!(splits.test[0].label(), Label::Score(0.0));
    }

    #[test]
    fn test_read_sts_bad_score_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sts.tsv");
        std::fs::write(&path, "split\tscore\tsentence1\tsentence2\ntest\tn/a\ta\tb\n").unwrap();
        let err = read_sts(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.tsv");
        std::fs::write(&path, "split\tsentence1\n").unwrap();
        let err = read_nli(&path, 10).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "sentence2"));
    }

    #[test]
    fn test_quotes_are_not_special() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.tsv");
        std::fs::write(
            &path,
            "split\tsentence1\tsentence2\tlabel\ntrain\t\"Hi,\" she said\tok\tentailment\n",
        )
        .unwrap();
        let examples = read_nli(&path, 10).unwrap();
        assert_eq!(examples[0].texts()[0], "\"Hi,\" she said");
    }
}
