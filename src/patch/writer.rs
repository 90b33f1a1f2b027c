//! Verbatim-preserving text splicing.
//!
//! A `PatchSet` is built once from a list of edits, validated against the
//! original text, then applied end-to-start into a fresh buffer assembled
//! from slices of the original. Bytes outside the edited ranges are copied
//! unchanged.

use std::ops::Range;

use crate::types::{DocsmithError, Result};

/// Replace `range` of the original text with `replacement`.
/// An empty range is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl Edit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            range: at..at,
            replacement: text.into(),
        }
    }

    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            replacement: text.into(),
        }
    }

    pub fn is_insertion(&self) -> bool {
        self.range.is_empty()
    }
}

/// Validated, ordered edits against one file's original text
#[derive(Debug, Clone)]
pub struct PatchSet {
    path: String,
    original_len: usize,
    edits: Vec<Edit>,
}

impl PatchSet {
    /// Sort and validate `edits` against `original`.
    ///
    /// Fails when an edit is out of bounds, splits a UTF-8 character,
    /// overlaps another edit, or shares its start position with another edit.
    pub fn new(path: impl Into<String>, original: &str, mut edits: Vec<Edit>) -> Result<Self> {
        let path = path.into();
        edits.sort_by_key(|e| (e.range.start, e.range.end));

        for edit in &edits {
            let Range { start, end } = edit.range;
            if start > end || end > original.len() {
                return Err(DocsmithError::patch(
                    &path,
                    format!(
                        "edit {}..{} outside text of {} bytes",
                        start,
                        end,
                        original.len()
                    ),
                ));
            }
            if !original.is_char_boundary(start) || !original.is_char_boundary(end) {
                return Err(DocsmithError::patch(
                    &path,
                    format!("edit {}..{} splits a character", start, end),
                ));
            }
        }

        for pair in edits.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.range.start == b.range.start {
                return Err(DocsmithError::patch(
                    &path,
                    format!("two edits at offset {}", a.range.start),
                ));
            }
            if a.range.end > b.range.start {
                return Err(DocsmithError::patch(
                    &path,
                    format!(
                        "edits {}..{} and {}..{} overlap",
                        a.range.start, a.range.end, b.range.start, b.range.end
                    ),
                ));
            }
        }

        Ok(Self {
            path,
            original_len: original.len(),
            edits,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Splice every edit into a new string.
    pub fn apply(&self, original: &str) -> Result<String> {
        if original.len() != self.original_len {
            return Err(DocsmithError::patch(
                &self.path,
                "text changed since the patch set was built",
            ));
        }

        let added: usize = self.edits.iter().map(|e| e.replacement.len()).sum();
        let removed: usize = self.edits.iter().map(|e| e.range.len()).sum();

        // Collected back to front, then reversed once
        let mut pieces: Vec<&str> = Vec::with_capacity(self.edits.len() * 2 + 1);
        let mut cursor = original.len();
        for edit in self.edits.iter().rev() {
            pieces.push(&original[edit.range.end..cursor]);
            pieces.push(&edit.replacement);
            cursor = edit.range.start;
        }
        pieces.push(&original[..cursor]);

        let mut out = String::with_capacity(original.len() + added - removed);
        for piece in pieces.iter().rev() {
            out.push_str(piece);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_apply_insert_and_replace() {
        let original = "aaa\nbbb\nccc\n";
        let set = PatchSet::new(
            "t.ts",
            original,
            vec![Edit::replace(8..11, "CCC"), Edit::insert(0, "// top\n")],
        )
        .unwrap();
        assert_eq!(set.apply(original).unwrap(), "// top\naaa\nbbb\nCCC\n");
    }

    #[test]
    fn test_empty_set_is_identity() {
        let original = "x\r\ny";
        let set = PatchSet::new("t.ts", original, vec![]).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.apply(original).unwrap(), original);
    }

    #[test]
    fn test_rejects_invalid_edits() {
        let original = "héllo";
        assert!(PatchSet::new("t.ts", original, vec![Edit::insert(2, "x")]).is_err());
        assert!(PatchSet::new("t.ts", original, vec![Edit::insert(99, "x")]).is_err());
        assert!(
            PatchSet::new(
                "t.ts",
                original,
                vec![Edit::replace(3..3, "x"), Edit::insert(3, "y")]
            )
            .is_err()
        );
        assert!(
            PatchSet::new(
                "t.ts",
                original,
                vec![Edit::replace(0..4, "x"), Edit::replace(3..5, "y")]
            )
            .is_err()
        );
    }

    #[test]
    fn test_stale_text_rejected() {
        let set = PatchSet::new("t.ts", "abc", vec![Edit::insert(1, "x")]).unwrap();
        assert!(set.apply("abcd").is_err());
    }

    /// Non-overlapping edits with distinct starts over an ASCII text
    fn text_and_edits() -> impl Strategy<Value = (String, Vec<Edit>)> {
        "[a-z\\n ]{0,200}".prop_flat_map(|text| {
            let len = text.len();
            let cuts = proptest::collection::vec(0..=len, 0..12);
            let replacements = proptest::collection::vec("[A-Z]{0,6}", 12);
            (Just(text), cuts, replacements).prop_map(|(text, cuts, replacements)| {
                let cuts: Vec<usize> = cuts
                    .into_iter()
                    .collect::<std::collections::BTreeSet<_>>()
                    .into_iter()
                    .collect();
                let mut edits = Vec::new();
                let mut i = 0;
                while i < cuts.len() {
                    let start = cuts[i];
                    // pair cuts into replacements, leave an odd one as an insertion
                    let end = if i + 1 < cuts.len() && i % 3 == 0 {
                        i += 1;
                        cuts[i]
                    } else {
                        start
                    };
                    edits.push(Edit::replace(start..end, replacements[edits.len()].clone()));
                    i += 1;
                }
                (text, edits)
            })
        })
    }

    proptest! {
        #[test]
        fn prop_bytes_outside_edits_preserved((text, edits) in text_and_edits()) {
            let set = PatchSet::new("p.ts", &text, edits.clone());
            prop_assume!(set.is_ok());
            let set = set.unwrap();
            let out = set.apply(&text).unwrap();

            // Walk the output alongside the original, skipping each edit
            let mut orig_pos = 0;
            let mut out_pos = 0;
            for edit in set.edits() {
                let keep = &text[orig_pos..edit.range.start];
                prop_assert_eq!(&out[out_pos..out_pos + keep.len()], keep);
                out_pos += keep.len();
                prop_assert_eq!(
                    &out[out_pos..out_pos + edit.replacement.len()],
                    edit.replacement.as_str()
                );
                out_pos += edit.replacement.len();
                orig_pos = edit.range.end;
            }
            prop_assert_eq!(&out[out_pos..], &text[orig_pos..]);
        }
    }
}
