//! Per-execution state handed to built-ins.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::library::files::FileAccess;

/// Appended to captured output once the byte limit is hit.
pub const TRUNCATION_MARKER: &str = "\n... (output truncated)";

/// Captured program output, bounded in size.
#[derive(Debug)]
pub struct Output {
    text: String,
    limit: usize,
    truncated: bool,
}

impl Output {
    pub fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
            truncated: false,
        }
    }

    /// Append text. Anything past the limit is dropped.
    pub fn write(&mut self, s: &str) {
        if self.truncated {
            return;
        }
        let room = self.limit.saturating_sub(self.text.len());
        if s.len() <= room {
            self.text.push_str(s);
            return;
        }
        let mut cut = room;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&s[..cut]);
        self.truncated = true;
        tracing::warn!(limit = self.limit, "program output truncated");
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Final text, with the marker when truncated.
    pub fn finish(self) -> (String, bool) {
        let mut text = self.text;
        if self.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        (text, self.truncated)
    }
}

/// Everything a built-in may touch besides its arguments.
pub struct CallContext {
    pub output: Output,
    pub files: FileAccess,
    pub rng: StdRng,
}

impl CallContext {
    pub fn new(output: Output, files: FileAccess, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { output, files, rng }
    }

    /// Context with unlimited output and unconfined files, for tests.
    pub fn detached() -> Self {
        Self::new(Output::new(usize::MAX), FileAccess::default(), Some(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_truncation() {
        let mut out = Output::new(5);
        out.write("abc");
        out.write("defg");
        out.write("more");
        assert!(out.is_truncated());
        let (text, truncated) = out.finish();
        assert!(truncated);
        assert_eq!(text, format!("abcde{TRUNCATION_MARKER}"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let mut out = Output::new(2);
        out.write("é!");
        assert_eq!(out.as_str(), "é");
    }
}
