//! Progress tracking for corpus builds.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use super::engine::PairStats;

/// Progress tracker for one dump pass.
///
/// The pairing engine owns the join counters; this tracks what happens after
/// a question completes (writes, retries, truncation) and drives the
/// spinner. Quiet mode drops the spinner but keeps the counters.
pub struct BuildProgress {
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
    posts_seen: AtomicUsize,
    pairs_written: AtomicUsize,
    empty_skipped: AtomicUsize,
    write_failures: AtomicUsize,
    parse_errors: AtomicUsize,
    answers_truncated: AtomicUsize,
}

impl BuildProgress {
    pub fn new(quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} posts {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            Some(pb)
        } else {
            None
        };

        Self {
            progress_bar,
            start_time: Instant::now(),
            posts_seen: AtomicUsize::new(0),
            pairs_written: AtomicUsize::new(0),
            empty_skipped: AtomicUsize::new(0),
            write_failures: AtomicUsize::new(0),
            parse_errors: AtomicUsize::new(0),
            answers_truncated: AtomicUsize::new(0),
        }
    }

    pub fn post_seen(&self) {
        let seen = self.posts_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref pb) = self.progress_bar {
            pb.set_position(seen as u64);
            // Updating the message every post would thrash the terminal.
            if seen % 10_000 == 0 {
                let elapsed = self.start_time.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 {
                    seen as f64 / elapsed
                } else {
                    0.0
                };
                pb.set_message(format!(
                    "{:.0} posts/s | {} pairs",
                    rate,
                    self.pairs_written.load(Ordering::Relaxed)
                ));
            }
        }
    }

    pub fn pair_written(&self) {
        self.pairs_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn empty_skipped(&self) {
        self.empty_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn write_failed(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn answers_truncated(&self, count: usize) {
        self.answers_truncated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn counts(&self) -> BuildCounts {
        BuildCounts {
            pairs_written: self.pairs_written.load(Ordering::Relaxed),
            empty_skipped: self.empty_skipped.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            answers_truncated: self.answers_truncated.load(Ordering::Relaxed),
        }
    }

    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message(format!(
                "Done! {} pairs written, {} write failures",
                self.pairs_written.load(Ordering::Relaxed),
                self.write_failures.load(Ordering::Relaxed)
            ));
        }
    }

    /// Print summary to console
    pub fn print_summary(&self, stats: &PairStats, open_at_eof: usize) {
        let counts = self.counts();
        let elapsed = self.start_time.elapsed().as_secs_f64();

        println!("\nBuild Summary");
        println!("=============");
        println!("Posts processed:      {}", stats.posts);
        println!("Questions seen:       {}", stats.questions);
        println!("Answers seen:         {}", stats.answers);
        println!("Pairs written:        {}", counts.pairs_written);
        println!("Questions discarded:  {}", stats.questions_discarded);
        println!("Answers discarded:    {}", stats.answers_discarded);
        println!("Answers malformed:    {}", stats.answers_malformed);
        println!("Answers kept (low):   {}", stats.answers_retained);
        println!("Answers truncated:    {}", counts.answers_truncated);
        println!("Empty pairs skipped:  {}", counts.empty_skipped);
        println!("Write failures:       {}", counts.write_failures);
        println!("Parse errors:         {}", counts.parse_errors);
        println!("Open at end:          {}", open_at_eof);
        println!("Elapsed time:         {:.1}s", elapsed);
    }
}

/// Snapshot of the write-side counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildCounts {
    pub pairs_written: usize,
    pub empty_skipped: usize,
    pub write_failures: usize,
    pub parse_errors: usize,
    pub answers_truncated: usize,
}
