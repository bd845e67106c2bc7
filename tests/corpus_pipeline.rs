//! Integration tests for stackpair
//!
//! These tests drive complete Posts dumps through the pairing pipeline and
//! read the results back out of every sink format.

use stackpair::{
    config::OutputFormat,
    pair::{PairCoordinatorBuilder, PairReport, PostStream},
    sink::open_sink,
};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A small but structurally realistic Posts dump:
/// - question 1 with two answers, one of them accepted
/// - question 2 with one answer
/// - an answer whose question is not in the dump (row 6)
/// - question 7 declaring three answers but receiving only one
const SAMPLE_DUMP: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<posts>
  <row Id="1" PostTypeId="1" AcceptedAnswerId="3" CreationDate="2015-03-01T10:00:00.000" Score="25" ViewCount="1200" Body="&lt;p&gt;How do I check which Ubuntu version I am running from the terminal?&lt;/p&gt;" Title="How do I check my Ubuntu version?" Tags="&lt;command-line&gt;&lt;upgrade&gt;" AnswerCount="2" CommentCount="1" />
  <row Id="2" PostTypeId="1" CreationDate="2015-03-01T11:00:00.000" Score="9" Body="&lt;p&gt;Why does apt fail to fetch behind a proxy?&lt;/p&gt;" Title="Why does apt fail behind a proxy?" Tags="&lt;apt&gt;" AnswerCount="1" />
  <row Id="3" PostTypeId="2" ParentId="1" CreationDate="2015-03-01T10:05:00.000" Score="40" Body="&lt;p&gt;Run &lt;code&gt;lsb_release -a&lt;/code&gt; in a terminal.&lt;/p&gt;" />
  <row Id="4" PostTypeId="2" ParentId="1" CreationDate="2015-03-01T10:06:00.000" Score="12" Body="&lt;p&gt;Open &lt;code&gt;/etc/os-release&lt;/code&gt; in any editor.&lt;/p&gt;" />
  <row Id="5" PostTypeId="2" ParentId="2" CreationDate="2015-03-01T11:10:00.000" Score="7" Body="&lt;p&gt;Export the &lt;code&gt;http_proxy&lt;/code&gt; variable first.&lt;/p&gt;" />
  <row Id="6" PostTypeId="2" ParentId="999" CreationDate="2015-03-01T12:00:00.000" Score="1" Body="&lt;p&gt;An answer to a question outside this dump.&lt;/p&gt;" />
  <row Id="7" PostTypeId="1" CreationDate="2015-03-02T08:00:00.000" Score="3" Body="&lt;p&gt;How do I bridge two network interfaces?&lt;/p&gt;" Title="How do I bridge two interfaces?" Tags="&lt;networking&gt;" AnswerCount="3" />
  <row Id="8" PostTypeId="2" ParentId="7" CreationDate="2015-03-02T08:30:00.000" Score="6" Body="&lt;p&gt;Use a bridge stanza in netplan.&lt;/p&gt;" />
</posts>
"#;

const Q1_NAME: &str = "askubuntu.com_0000000001_command_line_upgrade.txt";
const Q2_NAME: &str = "askubuntu.com_0000000002_apt.txt";

const Q1_TEXT: &str = "Q:\n\nHow do I check my Ubuntu version?\n\nHow do I check which Ubuntu version I am running from the terminal?\n\nA:\n\nRun lsb_release -a in a terminal.\n\nA:\n\nOpen /etc/os-release in any editor.\n\n";

/// Helper to write the sample dump as a plain Posts.xml
fn write_plain_dump(dir: &Path) -> PathBuf {
    let path = dir.join("Posts.xml");
    fs::write(&path, SAMPLE_DUMP).unwrap();
    path
}

/// Helper to write the sample dump bzip2-compressed
fn write_bz2_dump(dir: &Path) -> PathBuf {
    let path = dir.join("Posts.xml.bz2");
    let file = File::create(&path).unwrap();
    let mut encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
    encoder.write_all(SAMPLE_DUMP.as_bytes()).unwrap();
    encoder.finish().unwrap();
    path
}

/// Helper to run the whole pipeline quietly with the given knobs
fn build_corpus(
    input: &Path,
    source: &str,
    format: OutputFormat,
    out_dir: &Path,
    min_score: i64,
    max_responses: usize,
) -> PairReport {
    let stream = PostStream::open(input).expect("dump should open");
    let mut sink = open_sink(format, out_dir, source).expect("sink should open");
    let coordinator = PairCoordinatorBuilder::new(source)
        .with_min_score(min_score)
        .with_max_responses(max_responses)
        .with_quiet(true)
        .build();
    coordinator
        .run(stream, sink.as_mut())
        .expect("pipeline should run")
}

/// Helper to list a directory's file names, sorted
fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ============ DIRECTORY SINK ============

/// Test the complete dump-to-directory pipeline, including exact file names
/// and the exact rendered text for one pair
#[test]
fn test_dir_corpus_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let input = write_plain_dump(tmp.path());
    let out_dir = tmp.path().join("corpus");

    let report = build_corpus(&input, "askubuntu.com", OutputFormat::Dir, &out_dir, 3, 3);

    let site_dir = out_dir.join("askubuntu.com");
    assert_eq!(dir_names(&site_dir), vec![Q1_NAME, Q2_NAME]);

    let q1_text = fs::read_to_string(site_dir.join(Q1_NAME)).unwrap();
    assert_eq!(q1_text, Q1_TEXT);

    let q2_text = fs::read_to_string(site_dir.join(Q2_NAME)).unwrap();
    assert!(q2_text.starts_with("Q:\n\n"), "got: {q2_text:?}");
    assert!(q2_text.contains("http_proxy"));

    assert_eq!(report.counts.pairs_written, 2);
    assert_eq!(report.stats.posts, 8);
    assert_eq!(report.stats.questions, 3);
    assert_eq!(report.stats.answers, 5);
    assert_eq!(report.stats.questions_completed, 2);
    assert_eq!(report.stats.answers_discarded, 1, "orphan row should be dropped");
    assert_eq!(report.open_at_eof, 1, "question 7 should still be waiting");
}

/// Test that answers below the score threshold never make a pair, and that a
/// question whose answers all fall below it is skipped entirely
#[test]
fn test_min_score_filters_and_skips_empty_pairs() {
    let tmp = TempDir::new().unwrap();
    let input = write_plain_dump(tmp.path());
    let out_dir = tmp.path().join("corpus");

    let report = build_corpus(&input, "askubuntu.com", OutputFormat::Dir, &out_dir, 10, 3);

    // Question 2's only answer scores 7; the accepted answer on question 1
    // is exempt from the threshold.
    assert_eq!(dir_names(&out_dir.join("askubuntu.com")), vec![Q1_NAME]);
    assert_eq!(report.counts.pairs_written, 1);
    assert_eq!(report.counts.empty_skipped, 1);
    assert_eq!(report.stats.answers_retained, 2);
    assert_eq!(report.stats.answers_discarded, 3, "orphan plus two below threshold");
}

/// Test that max_responses keeps only the highest-scored answers in the text
#[test]
fn test_max_responses_truncates_to_top_answer() {
    let tmp = TempDir::new().unwrap();
    let input = write_plain_dump(tmp.path());
    let out_dir = tmp.path().join("corpus");

    let report = build_corpus(&input, "askubuntu.com", OutputFormat::Dir, &out_dir, 3, 1);

    let q1_text = fs::read_to_string(out_dir.join("askubuntu.com").join(Q1_NAME)).unwrap();
    assert_eq!(q1_text.matches("A:\n\n").count(), 1);
    assert!(q1_text.contains("lsb_release"), "top answer should stay");
    assert!(
        !q1_text.contains("/etc/os-release"),
        "runner-up should be moved out of the text"
    );
    assert_eq!(report.counts.answers_truncated, 1);
}

/// Test that incomplete questions are flushed at end of stream when asked to
#[test]
fn test_flush_incomplete_at_eof() {
    let tmp = TempDir::new().unwrap();
    let input = write_plain_dump(tmp.path());
    let out_dir = tmp.path().join("corpus");

    let stream = PostStream::open(&input).unwrap();
    let mut sink = open_sink(OutputFormat::Dir, &out_dir, "askubuntu.com").unwrap();
    let coordinator = PairCoordinatorBuilder::new("askubuntu.com")
        .with_flush_incomplete_at_eof(true)
        .with_quiet(true)
        .build();
    let report = coordinator.run(stream, sink.as_mut()).unwrap();

    let names = dir_names(&out_dir.join("askubuntu.com"));
    assert_eq!(
        names,
        vec![
            Q1_NAME.to_string(),
            Q2_NAME.to_string(),
            "askubuntu.com_0000000007_networking.txt".to_string(),
        ]
    );

    let q7_text =
        fs::read_to_string(out_dir.join("askubuntu.com").join(&names[2])).unwrap();
    assert!(q7_text.contains("bridge stanza"));

    assert_eq!(report.counts.pairs_written, 3);
    assert_eq!(report.open_at_eof, 0, "flush should empty the table");
}

// ============ COMPRESSED INPUT ============

/// Test that a bzip2-compressed dump produces byte-identical output
#[test]
fn test_bz2_dump_builds_identically() {
    let tmp = TempDir::new().unwrap();
    let plain = write_plain_dump(tmp.path());
    let packed = write_bz2_dump(tmp.path());

    let out_plain = tmp.path().join("out_plain");
    let out_packed = tmp.path().join("out_packed");
    build_corpus(&plain, "askubuntu.com", OutputFormat::Dir, &out_plain, 3, 3);
    build_corpus(&packed, "askubuntu.com", OutputFormat::Dir, &out_packed, 3, 3);

    let plain_dir = out_plain.join("askubuntu.com");
    let packed_dir = out_packed.join("askubuntu.com");
    assert_eq!(dir_names(&plain_dir), dir_names(&packed_dir));
    for name in dir_names(&plain_dir) {
        let a = fs::read_to_string(plain_dir.join(&name)).unwrap();
        let b = fs::read_to_string(packed_dir.join(&name)).unwrap();
        assert_eq!(a, b, "{name} should not depend on the container");
    }
}

// ============ ARCHIVE SINKS ============

/// Test the zip sink end to end: entries appear under their record names and
/// no partial file is left behind
#[test]
fn test_zip_corpus_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let input = write_plain_dump(tmp.path());
    let out_dir = tmp.path().join("corpus");

    let report = build_corpus(&input, "askubuntu.com", OutputFormat::Zip, &out_dir, 3, 3);
    assert_eq!(report.counts.pairs_written, 2);

    let zip_path = out_dir.join("askubuntu.com.zip");
    assert!(zip_path.exists(), "archive should be renamed into place");
    assert!(
        !out_dir.join("askubuntu.com.zip.partial").exists(),
        "partial file should be gone after finalize"
    );

    let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 2);

    let mut q1_text = String::new();
    archive
        .by_name(Q1_NAME)
        .unwrap()
        .read_to_string(&mut q1_text)
        .unwrap();
    assert_eq!(q1_text, Q1_TEXT);

    assert!(archive.by_name(Q2_NAME).is_ok());
}

/// Test the zstd JSON lines sink end to end: one JSON object per pair with
/// the flattened record fields plus the flat text
#[test]
fn test_jsonl_zst_corpus_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let input = write_plain_dump(tmp.path());
    let out_dir = tmp.path().join("corpus");

    let report = build_corpus(
        &input,
        "askubuntu.com",
        OutputFormat::JsonlZst,
        &out_dir,
        3,
        3,
    );
    assert_eq!(report.counts.pairs_written, 2);

    let path = out_dir.join("askubuntu.com.jsonl.zst");
    assert!(path.exists(), "stream should be renamed into place");

    let decoder = zstd::stream::read::Decoder::new(File::open(&path).unwrap()).unwrap();
    let lines: Vec<serde_json::Value> = BufReader::new(decoder)
        .lines()
        .map(|l| serde_json::from_str(&l.unwrap()).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["name"], Q1_NAME);
    assert_eq!(lines[0]["answer_scores"][0].as_i64(), Some(40));
    assert_eq!(lines[0]["answer_scores"][1].as_i64(), Some(12));
    assert_eq!(lines[0]["text"], Q1_TEXT);
    assert_eq!(lines[0]["tags"][0], "command-line");
    assert_eq!(lines[1]["name"], Q2_NAME);
    assert_eq!(lines[1]["title_text"], "Why does apt fail behind a proxy?");
}
