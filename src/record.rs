//! Line-oriented key/value records.
//!
//! A key sits alone on its line; its value follows on the next line(s).
//! Lines starting with `#` and blank lines are skipped wherever they
//! appear, and keys are matched case-insensitively.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::{LyapError, LyapResult};

pub struct RecordReader<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    line: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(text: &'a str) -> Self {
        RecordReader { lines: text.lines().enumerate(), line: 0 }
    }

    /// Line number (1-based) of the last line consumed.
    pub fn line(&self) -> usize {
        self.line
    }

    fn next_content(&mut self) -> Option<&'a str> {
        for (idx, raw) in self.lines.by_ref() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            self.line = idx + 1;
            return Some(trimmed);
        }
        None
    }

    /// Next key, upper-cased, or `None` at the end of the text.
    pub fn try_key(&mut self) -> Option<String> {
        self.next_content().map(|s| s.to_ascii_uppercase())
    }

    pub fn key(&mut self) -> LyapResult<String> {
        self.try_key()
            .ok_or_else(|| LyapError::malformed(self.line, "unexpected end of record"))
    }

    /// Reads `key` and insists on it.
    pub fn expect_key(&mut self, key: &str) -> LyapResult<()> {
        let found = self.key()?;
        if found != key {
            return Err(LyapError::malformed(self.line, format!("expected {key}, found {found}")));
        }
        Ok(())
    }

    pub fn text(&mut self, what: &str) -> LyapResult<&'a str> {
        self.next_content()
            .ok_or_else(|| LyapError::malformed(self.line, format!("missing value for {what}")))
    }

    pub fn value<T: FromStr>(&mut self, what: &str) -> LyapResult<T> {
        let raw = self.text(what)?;
        raw.parse()
            .map_err(|_| LyapError::malformed(self.line, format!("bad value {raw:?} for {what}")))
    }

    /// Reads exactly `names.len()` keyed fields in any order, handing each
    /// one to `read`. Unknown or repeated keys are rejected.
    pub fn fields<F>(&mut self, names: &[&str], mut read: F) -> LyapResult<()>
    where
        F: FnMut(&mut Self, &str) -> LyapResult<()>,
    {
        let mut seen = vec![false; names.len()];
        for _ in 0..names.len() {
            let key = self.key()?;
            let Some(idx) = names.iter().position(|n| *n == key) else {
                return Err(LyapError::malformed(self.line, format!("unknown key {key}")));
            };
            if seen[idx] {
                return Err(LyapError::malformed(self.line, format!("duplicate key {key}")));
            }
            seen[idx] = true;
            read(self, names[idx])?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordWriter {
    out: String,
}

impl RecordWriter {
    pub fn new() -> Self {
        RecordWriter::default()
    }

    pub fn key(&mut self, key: &str) -> &mut Self {
        self.line(key)
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.out.push('#');
        self.line(text)
    }

    pub fn float(&mut self, value: f64) -> &mut Self {
        self.line(format!("{value:e}"))
    }

    pub fn line(&mut self, value: impl Display) -> &mut Self {
        self.out.push_str(&value.to_string());
        self.out.push('\n');
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn skips_comments_and_blank_lines() {
        let text = "# header\n\nid\n  # note\n 7 \nb\n2.5e0\n";
        let mut reader = RecordReader::new(text);
        reader.expect_key("ID").unwrap();
        assert_eq!(reader.value::<i32>("id").unwrap(), 7);
        assert_eq!(reader.key().unwrap(), "B");
        assert_eq!(reader.value::<f64>("b").unwrap(), 2.5);
        assert_eq!(reader.line(), 7);
        assert!(reader.try_key().is_none());
    }

    #[test]
    fn fields_accept_any_order() {
        let mut reader = RecordReader::new("Y\n2\nX\n1\n");
        let (mut x, mut y) = (0, 0);
        reader
            .fields(&["X", "Y"], |r, key| {
                match key {
                    "X" => x = r.value("x")?,
                    _ => y = r.value("y")?,
                }
                Ok(())
            })
            .unwrap();
        assert_eq!((x, y), (1, 2));
    }

    #[test]
    fn fields_reject_duplicates_and_strangers() {
        let mut reader = RecordReader::new("X\n1\nX\n2\n");
        let err = reader.fields(&["X", "Y"], |r, _| r.value::<i32>("v").map(|_| ()));
        assert!(matches!(err, Err(LyapError::Malformed { line: 3, .. })));

        let mut reader = RecordReader::new("Z\n1\n");
        assert!(reader.fields(&["X"], |_, _| Ok(())).is_err());
    }

    #[test]
    fn writer_floats_round_trip() {
        let mut w = RecordWriter::new();
        w.key("B").float(0.1 + 0.2).comment(" done");
        let text = w.finish();
        let mut reader = RecordReader::new(&text);
        reader.expect_key("B").unwrap();
        assert_eq!(reader.value::<f64>("b").unwrap(), 0.1 + 0.2);
    }
}
