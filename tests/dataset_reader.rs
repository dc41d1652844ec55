//! Benchmark archive parsing through the public API

use std::fs::File;
use std::io::Write;
use std::path::Path;

use approx::assert_abs_diff_eq;
use flate2::write::GzEncoder;
use flate2::Compression;
use sentence_tune::data::{read_nli, read_sts, DataLoader, DatasetPaths, Label};
use sentence_tune::Error;

fn write_gz(path: &Path, content: &str) {
    let file = File::create(path).unwrap();
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(content.as_bytes()).unwrap();
    enc.finish().unwrap();
}

#[test]
fn test_sts_scores_are_normalized_per_split() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stsbenchmark.tsv.gz");
    write_gz(
        &path,
        "split\tgenre\tdataset\tyear\tsid\tscore\tsentence1\tsentence2\n\
         train\tmain\tx\t2012\t1\t5.000\tA plane takes off.\tAn air plane is taking off.\n\
         dev\tmain\tx\t2012\t2\t2.5\tA man plays a flute.\tA man plays a \"bamboo\" flute.\n\
         test\tmain\tx\t2012\t3\t0.0\tA cat.\tA truck.\n",
    );
    let splits = read_sts(&path).unwrap();
    assert_eq!((splits.train.len(), splits.dev.len(), splits.test.len()), (1, 1, 1));
    assert_abs_diff_eq!(splits.train[0].label().as_score().unwrap(), 1.0);
    assert_abs_diff_eq!(splits.dev[0].label().as_score().unwrap(), 0.5);
    assert_eq!(splits.dev[0].texts()[1], "A man plays a \"bamboo\" flute.");
}

#[test]
fn test_nli_unknown_label_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("AllNLI.tsv.gz");
    write_gz(
        &path,
        "split\tsentence1\tsentence2\tlabel\n\
         train\tA.\tB.\tentailment\n\
         train\tC.\tD.\tmaybe\n",
    );
    match read_nli(&path, 100).unwrap_err() {
        Error::UnknownLabel { label, .. } => assert_eq!(label, "maybe"),
        other => panic!("expected unknown label, got {other}"),
    }
}

#[test]
fn test_nli_cap_and_batching() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("AllNLI.tsv.gz");
    let mut content = String::from("split\tsentence1\tsentence2\tlabel\n");
    for i in 0..40 {
        content.push_str(&format!("train\ts{i}\tt{i}\tneutral\n"));
    }
    write_gz(&path, &content);

    let examples = read_nli(&path, 10).unwrap();
    assert_eq!(examples.len(), 10);
    assert!(examples.iter().all(|e| e.label() == Label::Class(2)));

    let mut loader = DataLoader::new(examples, 16, true);
    assert_eq!(loader.len(), 1);
    assert_eq!(loader.next_batch().len(), 10);
}

#[test]
fn test_cached_archives_are_not_downloaded_again() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DatasetPaths::in_dir(dir.path());
    write_gz(&paths.sts, "split\tsentence1\tsentence2\tscore\n");
    write_gz(&paths.nli, "split\tsentence1\tsentence2\tlabel\n");
    assert_eq!(paths.ensure().unwrap(), 0);
}
