//! Markdown summary of documented declarations.
//!
//! Output depends only on its input so an unchanged tree renders an
//! identical file.

use crate::types::DeclarationKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub kind: DeclarationKind,
    pub qualified_name: String,
    pub signature: String,
    /// Full comment text; only its first sentence is rendered
    pub doc: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryFile {
    pub path: String,
    /// Document order
    pub entries: Vec<SummaryEntry>,
}

pub fn render(files: &[SummaryFile]) -> String {
    let mut files: Vec<&SummaryFile> = files.iter().filter(|f| !f.entries.is_empty()).collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    let total: usize = files.iter().map(|f| f.entries.len()).sum();

    let mut out = String::from("# Documentation Summary\n\n");
    out.push_str(&format!(
        "{} documented declaration(s) in {} file(s).\n",
        total,
        files.len()
    ));

    for file in files {
        out.push_str(&format!("\n## `{}`\n\n", file.path));
        for entry in &file.entries {
            out.push_str(&format!(
                "- **{}** ({}): `{}`",
                entry.qualified_name, entry.kind, entry.signature
            ));
            let sentence = first_sentence(&entry.doc);
            if !sentence.is_empty() {
                out.push_str(&format!("\n  {}", sentence));
            }
            out.push('\n');
        }
    }
    out
}

/// First sentence of the leading paragraph, tags excluded
pub fn first_sentence(doc: &str) -> String {
    let paragraph: Vec<&str> = doc
        .lines()
        .map(str::trim)
        .skip_while(|l| l.is_empty())
        .take_while(|l| !l.is_empty() && !l.starts_with('@'))
        .collect();
    let text = paragraph.join(" ");

    match text.find(". ") {
        Some(pos) => text[..=pos].to_string(),
        None => text,
    }
}
