//! Prompt Builder System
//!
//! Standardized prompt construction for documentation requests.
//!
//! ## Layout
//!
//! 1. **Role**: documentation writer for the file's language
//! 2. **Objectives**: what the comment must cover for this declaration kind
//! 3. **Context**: file, declaration path, signature
//! 4. **Code**: bounded window around the declaration
//! 5. **Rules**: plain text only, no delimiters or fences

use crate::analyzer::parser::Language;
use crate::constants::generation;
use crate::types::{Declaration, DeclarationKind, LineIndex, Signature};

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Ordered key-value pairs
    Context(Vec<(String, String)>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Code block with language
    Code { language: String, content: String },
    /// Anti-patterns with good/bad examples
    AntiPatterns { bad: Vec<String>, good: Vec<String> },
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    /// Add objectives section
    pub fn objectives(mut self, objectives: Vec<String>) -> Self {
        self.sections.push(PromptSection::Objectives(objectives));
        self
    }

    /// Add a context item, appending to the existing context section
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        let entry = (key.to_string(), value.to_string());
        for section in &mut self.sections {
            if let PromptSection::Context(ctx) = section {
                ctx.push(entry);
                return self;
            }
        }
        self.sections.push(PromptSection::Context(vec![entry]));
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Add code block
    pub fn code(mut self, language: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Code {
            language: language.to_string(),
            content: content.to_string(),
        });
        self
    }

    /// Add anti-patterns section
    pub fn anti_patterns(mut self, bad: Vec<&str>, good: Vec<&str>) -> Self {
        self.sections.push(PromptSection::AntiPatterns {
            bad: bad.into_iter().map(String::from).collect(),
            good: good.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Context(ctx) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in ctx {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Code { language, content } => {
                    prompt.push_str(&format!("```{}\n", language));
                    prompt.push_str(&content);
                    prompt.push_str("\n```\n\n");
                }
                PromptSection::AntiPatterns { bad, good } => {
                    prompt.push_str("## ANTI-PATTERNS\n\n");
                    prompt.push_str("<what_not_to_do>\n");
                    for example in bad {
                        prompt.push_str(&format!("WRONG: {}\n", example));
                    }
                    prompt.push_str("</what_not_to_do>\n\n");
                    prompt.push_str("<what_to_do>\n");
                    for example in good {
                        prompt.push_str(&format!("CORRECT: {}\n", example));
                    }
                    prompt.push_str("</what_to_do>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// System and user messages for one backend request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const SYSTEM_PROMPT: &str = "You write concise API documentation comments for source code. \
Respond with the documentation text only: no comment delimiters, no leading asterisks, \
no code fences around the answer.";

/// Everything the backend needs to document one declaration
#[derive(Debug, Clone)]
pub struct DocRequest {
    /// Root-relative path of the declaring file
    pub file_path: String,
    /// Position of the declaration in its file's list
    pub index: usize,
    pub kind: DeclarationKind,
    pub qualified_name: String,
    pub signature: Signature,
    pub language: Language,
    /// Bounded code window around the declaration
    pub context: String,
    /// Existing comment body, when regenerating
    pub existing_doc: Option<String>,
}

impl DocRequest {
    /// Build a request for `declarations[index]` of a file.
    pub fn new(
        file_path: &str,
        language: Language,
        text: &str,
        line_index: &LineIndex,
        declaration: &Declaration,
        index: usize,
        window: ContextWindow,
    ) -> Self {
        Self {
            file_path: file_path.to_string(),
            index,
            kind: declaration.kind,
            qualified_name: declaration.qualified_name.clone(),
            signature: declaration.signature.clone(),
            language,
            context: window.extract(text, line_index, declaration),
            existing_doc: declaration.doc.as_ref().map(|d| d.content()),
        }
    }

    /// Key used in logs and reports, e.g. `src/store.ts::Store.get`
    pub fn label(&self) -> String {
        format!("{}::{}", self.file_path, self.qualified_name)
    }

    pub fn to_prompt(&self) -> Prompt {
        let mut builder = PromptBuilder::new()
            .role(
                "technical writer",
                &format!("{} API documentation", self.language.display_name()),
            )
            .objectives(kind_objectives(self.kind, &self.signature))
            .context_item("File", &self.file_path)
            .context_item("Declaration", &format!("{} `{}`", self.kind, self.qualified_name))
            .context_item("Signature", &self.signature.text);

        if let Some(existing) = &self.existing_doc {
            builder = builder.section(
                "Current documentation (the code changed; rewrite it to match)",
                existing,
            );
        }

        let user = builder
            .code(self.language.highlight_str(), &self.context)
            .anti_patterns(
                vec![
                    "/** Adds two numbers. */",
                    "```\nAdds two numbers.\n```",
                    "This function is a function that adds.",
                ],
                vec!["Adds two numbers and returns the sum.\n\n@param a - First addend\n@param b - Second addend\n@returns The sum of `a` and `b`"],
            )
            .build();

        Prompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

/// What the comment must cover, by declaration kind
fn kind_objectives(kind: DeclarationKind, signature: &Signature) -> Vec<String> {
    let mut objectives = vec!["Start with one sentence summarizing the purpose".to_string()];
    match kind {
        DeclarationKind::Function | DeclarationKind::Method => {
            if !signature.parameters.is_empty() {
                let names: Vec<&str> = signature
                    .parameters
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect();
                objectives.push(format!(
                    "Add one `@param name - description` line for each of: {}",
                    names.join(", ")
                ));
            }
            match signature.return_type.as_deref() {
                Some("void") | Some("Promise<void>") | Some("never") => {}
                _ => objectives.push("Add an `@returns` line describing the result".to_string()),
            }
            if signature.is_async {
                objectives.push("Mention what the returned promise resolves to".to_string());
            }
        }
        DeclarationKind::Class => {
            objectives.push("Describe the responsibility of the class and how it is used".to_string());
        }
        DeclarationKind::Interface => {
            objectives.push("Describe what the shape represents and who provides it".to_string());
        }
        DeclarationKind::TypeAlias => {
            objectives.push("Describe what values of this type represent".to_string());
        }
        DeclarationKind::Const => {
            objectives.push("Describe what the value is used for".to_string());
        }
    }
    objectives.push("Only state facts visible in the code".to_string());
    objectives
}

/// Bounds on the code sent with each request
#[derive(Debug, Clone, Copy)]
pub struct ContextWindow {
    /// Lines shown above the declaration
    pub lines_before: u32,
    /// Lines of the declaration itself
    pub max_lines: u32,
    /// Character cap over the whole window
    pub max_chars: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self {
            lines_before: generation::CONTEXT_LINES_BEFORE,
            max_lines: generation::CONTEXT_MAX_LINES,
            max_chars: generation::CONTEXT_MAX_CHARS,
        }
    }
}

impl ContextWindow {
    pub fn extract(&self, text: &str, index: &LineIndex, declaration: &Declaration) -> String {
        let first = declaration.span_lines.start;
        let start_line = first.saturating_sub(self.lines_before).max(1);
        let end_line = declaration
            .span_lines
            .end
            .min(first + self.max_lines.saturating_sub(1));

        let start = index.line_span(start_line).start;
        let end = index.line_span(end_line).end;
        let mut window = text[start..end].trim_end().to_string();

        let mut truncated = end_line < declaration.span_lines.end;
        if window.len() > self.max_chars {
            let mut cut = self.max_chars;
            while !window.is_char_boundary(cut) {
                cut -= 1;
            }
            window.truncate(cut);
            truncated = true;
        }
        if truncated {
            window.push_str("\n// ... (truncated)");
        }
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parser::{Parser, TypeScriptParser};

    #[test]
    fn test_basic_prompt() {
        let prompt = PromptBuilder::new()
            .role("technical writer", "TypeScript documentation")
            .objectives(vec!["Summarize".to_string(), "List params".to_string()])
            .build();

        assert!(prompt.contains("<ROLE>"));
        assert!(prompt.contains("technical writer"));
        assert!(prompt.contains("1. Summarize"));
        assert!(prompt.contains("2. List params"));
    }

    #[test]
    fn test_context_items_keep_order() {
        let prompt = PromptBuilder::new()
            .context_item("File", "src/a.ts")
            .context_item("Declaration", "function `add`")
            .build();

        let file = prompt.find("**File**").unwrap();
        let decl = prompt.find("**Declaration**").unwrap();
        assert!(file < decl);
    }

    fn declarations(content: &str) -> Vec<Declaration> {
        TypeScriptParser::new(Language::TypeScript)
            .unwrap()
            .parse("a.ts", content)
            .unwrap()
            .declarations
    }

    #[test]
    fn test_context_window_bounds() {
        let mut content = "const x = 1;\n".repeat(10);
        content.push_str("function big(a: number): number {\n");
        for i in 0..100 {
            content.push_str(&format!("  const v{} = a;\n", i));
        }
        content.push_str("  return a;\n}\n");

        let decls = declarations(&content);
        let big = decls.iter().find(|d| d.name == "big").unwrap();
        let index = LineIndex::new(&content);
        let window = ContextWindow {
            lines_before: 2,
            max_lines: 5,
            max_chars: 10_000,
        };
        let extracted = window.extract(&content, &index, big);

        assert!(extracted.starts_with("const x = 1;\nconst x = 1;\nfunction big"));
        assert!(extracted.contains("const v3 = a;"));
        assert!(!extracted.contains("const v4 = a;"));
        assert!(extracted.ends_with("(truncated)"));
    }

    #[test]
    fn test_request_prompt_mentions_params_and_existing_doc() {
        let content = "/** Old text. */\nexport function add(a: number, b: number): number {\n  return a + b;\n}\n";
        let decls = declarations(content);
        let index = LineIndex::new(content);
        let request = DocRequest::new(
            "src/math.ts",
            Language::TypeScript,
            content,
            &index,
            &decls[0],
            0,
            ContextWindow::default(),
        );

        assert_eq!(request.label(), "src/math.ts::add");
        let prompt = request.to_prompt();
        assert!(prompt.user.contains("each of: a, b"));
        assert!(prompt.user.contains("@returns"));
        assert!(prompt.user.contains("Old text."));
        assert!(prompt.user.contains("```typescript"));
        assert!(prompt.system.contains("no comment delimiters"));
    }
}
