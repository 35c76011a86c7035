//! Content rotation over newline-delimited template files.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use similar::TextDiff;

/// Lines this close to something recently sent are passed over while
/// alternatives remain.
const NEAR_DUPLICATE_RATIO: f32 = 0.9;

pub struct ContentBook {
    lines: Vec<String>,
}

impl ContentBook {
    /// A missing file is an empty book, not an error; passes that need it
    /// simply report nothing to send.
    pub fn load(path: &Path) -> io::Result<Self> {
        if !path.exists() {
            return Ok(ContentBook::from_lines(Vec::new()));
        }
        let raw = fs::read_to_string(path)?;
        let lines = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        Ok(ContentBook::from_lines(lines))
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        ContentBook { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Pick a random line that has not been used yet; once every line has
    /// gone out the rotation starts over from the full set. Near-copies of
    /// recently sent content lose to fresher alternatives.
    pub fn pick(
        &self,
        used: &HashSet<&str>,
        recent: &[&str],
        rng: &mut impl Rng,
    ) -> Option<&str> {
        if self.lines.is_empty() {
            return None;
        }

        let fresh: Vec<&String> = self
            .lines
            .iter()
            .filter(|line| !used.contains(line.as_str()))
            .collect();
        let pool = if fresh.is_empty() {
            self.lines.iter().collect()
        } else {
            fresh
        };

        let distinct: Vec<&String> = pool
            .iter()
            .copied()
            .filter(|line| !recent.iter().any(|sent| near_duplicate(line, sent)))
            .collect();
        let pool = if distinct.is_empty() { pool } else { distinct };

        pool.choose(rng).map(|line| line.as_str())
    }
}

fn near_duplicate(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    TextDiff::from_chars(a, b).ratio() >= NEAR_DUPLICATE_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> ContentBook {
        ContentBook::from_lines(vec![
            "Check out our spring lineup".to_string(),
            "New arrivals just dropped".to_string(),
            "Weekend sale starts Friday".to_string(),
        ])
    }

    #[test]
    fn empty_book_yields_nothing() {
        let book = ContentBook::from_lines(Vec::new());
        let pick = book.pick(&HashSet::new(), &[], &mut rand::thread_rng());
        assert!(pick.is_none());
    }

    #[test]
    fn used_lines_are_skipped() {
        let book = book();
        let used: HashSet<&str> = ["Check out our spring lineup", "New arrivals just dropped"]
            .into_iter()
            .collect();
        for _ in 0..20 {
            let pick = book.pick(&used, &[], &mut rand::thread_rng());
            assert_eq!(pick, Some("Weekend sale starts Friday"));
        }
    }

    #[test]
    fn rotation_resets_once_everything_was_used() {
        let book = book();
        let used: HashSet<&str> = [
            "Check out our spring lineup",
            "New arrivals just dropped",
            "Weekend sale starts Friday",
        ]
        .into_iter()
        .collect();
        let pick = book.pick(&used, &[], &mut rand::thread_rng());
        assert!(pick.is_some());
    }

    #[test]
    fn near_copies_of_recent_content_lose_to_alternatives() {
        let book = ContentBook::from_lines(vec![
            "Weekend sale starts Friday".to_string(),
            "Weekend sale starts Friday!".to_string(),
            "Completely different announcement".to_string(),
        ]);
        for _ in 0..20 {
            let pick = book.pick(
                &HashSet::new(),
                &["Weekend sale starts Friday"],
                &mut rand::thread_rng(),
            );
            assert_eq!(pick, Some("Completely different announcement"));
        }
    }

    #[test]
    fn recency_filter_yields_when_nothing_else_remains() {
        let book = ContentBook::from_lines(vec!["Weekend sale starts Friday".to_string()]);
        let pick = book.pick(
            &HashSet::new(),
            &["Weekend sale starts Friday"],
            &mut rand::thread_rng(),
        );
        assert_eq!(pick, Some("Weekend sale starts Friday"));
    }
}
