// ============================================================
// Layer 3 — Label Vocabulary
// ============================================================
// An ordered list of distinct topic labels. A label's position
// in the list is its class index, so the order written to
// label.vocab is the order the model's output columns follow.
//
// The vocabulary always carries the catch-all label "nan"
// ("no label applies"). It is appended exactly once, at the end,
// when the caller's list does not already contain it.
//
// Example:
//   ["economy", "health", "water"]
//     → ["economy", "health", "water", "nan"]
//   one_hot({"economy", "water"}) → [1, 0, 1, 0]

use serde::{Deserialize, Serialize};

/// The catch-all label every vocabulary must contain.
pub const CATCH_ALL_LABEL: &str = "nan";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    labels: Vec<String>,
}

impl Vocabulary {
    /// Build a vocabulary from labels in index order, appending the
    /// catch-all label if it is missing. Duplicate labels keep their
    /// first position.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if !out.contains(&label) {
                out.push(label);
            }
        }
        if !out.iter().any(|l| l == CATCH_ALL_LABEL) {
            out.push(CATCH_ALL_LABEL.to_string());
        }
        Self { labels: out }
    }

    /// Parse the contents of a label.vocab file (one label per line).
    /// Only the line terminator is stripped; blank lines are skipped.
    pub fn from_lines(text: &str) -> Self {
        Self::new(text.lines().filter(|l| !l.is_empty()))
    }

    /// Render as label.vocab contents: one label per line, each line
    /// terminated by a newline.
    pub fn to_lines(&self) -> String {
        self.labels.iter().map(|l| format!("{l}\n")).collect()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// num_classes
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Multi-hot encode a set of labels against this vocabulary.
    /// Repeated labels collapse to a single 1. A label that is not in
    /// the vocabulary is a data error, not something to drop silently.
    pub fn one_hot<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<u8>, String> {
        let mut out = vec![0u8; self.len()];
        for label in labels {
            let label = label.as_ref();
            let idx = self
                .index_of(label)
                .ok_or_else(|| format!("label '{label}' is not in the vocabulary"))?;
            out[idx] = 1;
        }
        Ok(out)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catch_all_appended_once_at_end() {
        let v = Vocabulary::new(["a", "b", "c"]);
        assert_eq!(v.labels(), &["a", "b", "c", "nan"]);
        assert_eq!(v.len(), 4);

        // Rebuilding from an already augmented list adds nothing
        let again = Vocabulary::new(v.labels().to_vec());
        assert_eq!(again, v);
        assert_eq!(again.labels().iter().filter(|l| *l == "nan").count(), 1);
    }

    #[test]
    fn test_existing_catch_all_keeps_position() {
        let v = Vocabulary::new(["nan", "a"]);
        assert_eq!(v.labels(), &["nan", "a"]);
    }

    #[test]
    fn test_one_hot_multi_label() {
        let v = Vocabulary::new(["A", "B", "C"]);
        assert_eq!(v.one_hot(&["A", "C"]).unwrap(), vec![1, 0, 1, 0]);
        // Duplicates collapse
        assert_eq!(v.one_hot(&["C", "C"]).unwrap(), vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_one_hot_empty_set_is_all_zero() {
        let v = Vocabulary::new(["A", "B", "C"]);
        let none: [&str; 0] = [];
        assert_eq!(v.one_hot(&none).unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_one_hot_unknown_label_fails() {
        let v = Vocabulary::new(["A"]);
        assert!(v.one_hot(&["Z"]).is_err());
    }

    #[test]
    fn test_lines_round_trip() {
        let v = Vocabulary::new(["water", "health"]);
        let text = v.to_lines();
        assert_eq!(text, "water\nhealth\nnan\n");
        assert_eq!(Vocabulary::from_lines(&text), v);
    }

    #[test]
    fn test_lines_keep_surrounding_spaces() {
        let v = Vocabulary::new([" spaced label ", "water"]);
        assert_eq!(Vocabulary::from_lines(&v.to_lines()), v);

        let crlf = Vocabulary::from_lines("water\r\n\r\n health\r\n");
        assert_eq!(crlf.labels(), &["water", " health", "nan"]);
    }
}
