//! TypeScript / JavaScript declaration extractor.
//!
//! Walks the top level of a module and the bodies of classes, collecting
//! documentable declarations together with any JSDoc block attached to them.
//! Function bodies and namespaces are not entered.

use tree_sitter::Node;

use super::traits::{
    collapse_whitespace, create_ts_parser, first_syntax_error, get_node_text, node_lines,
};
use super::{Language, ParseResult, Parser};
use crate::types::{
    Declaration, DeclarationKind, DocComment, DocsmithError, LineIndex, LineRange, Parameter,
    Result, Signature,
};

/// Signatures longer than this are cut (type aliases of large object types)
const MAX_SIGNATURE_CHARS: usize = 240;

/// Tags marking a file-level comment rather than a declaration's documentation
pub const FILE_LEVEL_TAGS: &[&str] = &["@license", "@file", "@fileoverview", "@module", "@packageDocumentation"];

pub struct TypeScriptParser {
    language: Language,
    grammar: tree_sitter::Language,
}

impl TypeScriptParser {
    pub fn new(language: Language) -> Result<Self> {
        let grammar = language.grammar();
        // Fail early if the grammar and the tree-sitter runtime disagree
        create_ts_parser(&grammar, language.display_name())?;
        Ok(Self { language, grammar })
    }
}

impl Parser for TypeScriptParser {
    fn parse(&self, path: &str, content: &str) -> Result<ParseResult> {
        let mut parser = create_ts_parser(&self.grammar, self.language.display_name())?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| DocsmithError::parse(path, "parser produced no syntax tree"))?;
        let root = tree.root_node();

        if let Some(bad) = first_syntax_error(root) {
            let pos = bad.start_position();
            let what = if bad.is_missing() {
                format!("missing `{}`", bad.kind())
            } else {
                "syntax error".to_string()
            };
            return Err(DocsmithError::parse(
                path,
                format!("{} at line {}, column {}", what, pos.row + 1, pos.column + 1),
            ));
        }

        let mut extractor = Extractor {
            content,
            bytes: content.as_bytes(),
            index: LineIndex::new(content),
            declarations: Vec::new(),
        };

        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            extractor.visit_statement(statement);
        }

        Ok(ParseResult {
            declarations: extractor.declarations,
        })
    }

    fn language(&self) -> Language {
        self.language
    }
}

/// Everything needed to record one declaration
struct DeclSpec<'t> {
    kind: DeclarationKind,
    name: String,
    /// Node carrying `parameters` / `return_type` fields, if callable
    callable: Option<Node<'t>>,
    /// Outermost node (export statement, ambient wrapper, or the declaration)
    outer: Node<'t>,
    body: Option<Node<'t>>,
    exported: bool,
    parent: Option<usize>,
}

struct Extractor<'a> {
    content: &'a str,
    bytes: &'a [u8],
    index: LineIndex,
    declarations: Vec<Declaration>,
}

impl<'a> Extractor<'a> {
    fn visit_statement(&mut self, statement: Node) {
        match statement.kind() {
            "export_statement" => {
                if let Some(decl) = statement.child_by_field_name("declaration") {
                    self.visit_declaration(decl, statement, true);
                } else if let Some(value) = statement.child_by_field_name("value") {
                    self.visit_default_export(value, statement);
                }
            }
            _ => self.visit_declaration(statement, statement, false),
        }
    }

    fn visit_declaration(&mut self, node: Node, outer: Node, exported: bool) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                self.visit_function(node, outer, exported);
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = self.field_text(node, "name") {
                    self.visit_class(node, outer, name, exported);
                }
            }
            "interface_declaration" => {
                if let Some(name) = self.field_text(node, "name") {
                    self.push(DeclSpec {
                        kind: DeclarationKind::Interface,
                        name,
                        callable: None,
                        outer,
                        body: node.child_by_field_name("body"),
                        exported,
                        parent: None,
                    });
                }
            }
            "type_alias_declaration" => {
                if let Some(name) = self.field_text(node, "name") {
                    self.push(DeclSpec {
                        kind: DeclarationKind::TypeAlias,
                        name,
                        callable: None,
                        outer,
                        body: None,
                        exported,
                        parent: None,
                    });
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                self.visit_variables(node, outer, exported);
            }
            "ambient_declaration" => {
                let mut cursor = node.walk();
                let inner: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in inner {
                    // Bodiless signatures count only under `declare`; elsewhere they are overloads
                    if child.kind() == "function_signature" {
                        self.visit_function(child, outer, exported);
                    } else {
                        self.visit_declaration(child, outer, exported);
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_function(&mut self, node: Node, outer: Node, exported: bool) {
        if let Some(name) = self.field_text(node, "name") {
            self.push(DeclSpec {
                kind: DeclarationKind::Function,
                name,
                callable: Some(node),
                outer,
                body: node.child_by_field_name("body"),
                exported,
                parent: None,
            });
        }
    }

    /// `export default function () {}` and `export default class {}`
    fn visit_default_export(&mut self, value: Node, outer: Node) {
        match value.kind() {
            "function_expression" | "function" | "generator_function" | "arrow_function" => {
                self.push(DeclSpec {
                    kind: DeclarationKind::Function,
                    name: "default".to_string(),
                    callable: Some(value),
                    outer,
                    body: value.child_by_field_name("body"),
                    exported: true,
                    parent: None,
                });
            }
            "class" => {
                let name = self
                    .field_text(value, "name")
                    .unwrap_or_else(|| "default".to_string());
                self.visit_class(value, outer, name, true);
            }
            _ => {}
        }
    }

    fn visit_class(&mut self, node: Node, outer: Node, name: String, exported: bool) {
        let body = node.child_by_field_name("body");
        let class_index = self.push(DeclSpec {
            kind: DeclarationKind::Class,
            name: name.clone(),
            callable: None,
            outer,
            body,
            exported,
            parent: None,
        });

        let Some(body) = body else {
            return;
        };

        let mut cursor = body.walk();
        let members: Vec<Node> = body.named_children(&mut cursor).collect();
        for member in members {
            let (callable, member_body) = match member.kind() {
                "method_definition" => (member, member.child_by_field_name("body")),
                "abstract_method_signature" => (member, None),
                "public_field_definition" => match member.child_by_field_name("value") {
                    Some(value) if is_function_value(value) => {
                        (value, value.child_by_field_name("body"))
                    }
                    _ => continue,
                },
                _ => continue,
            };
            let Some(member_name) = self.field_text(member, "name") else {
                continue;
            };
            let private = member_name.starts_with('#') || self.has_private_modifier(member);

            self.push(DeclSpec {
                kind: DeclarationKind::Method,
                name: member_name,
                callable: Some(callable),
                outer: member,
                body: member_body,
                exported: exported && !private,
                parent: Some(class_index),
            });
        }
    }

    fn visit_variables(&mut self, node: Node, outer: Node, exported: bool) {
        let is_const = node
            .child_by_field_name("kind")
            .map(|k| get_node_text(k, self.bytes) == "const")
            .unwrap_or(false);

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "variable_declarator")
            .collect();

        // One comment cannot document several bindings
        let [declarator] = declarators.as_slice() else {
            if declarators.len() > 1 {
                tracing::debug!(
                    "Skipping multi-binding declaration at line {}",
                    node.start_position().row + 1
                );
            }
            return;
        };

        let Some(name_node) = declarator.child_by_field_name("name") else {
            return;
        };
        if name_node.kind() != "identifier" {
            // destructuring patterns have no single name
            return;
        }
        let name = get_node_text(name_node, self.bytes).to_string();

        match declarator.child_by_field_name("value") {
            Some(value) if is_function_value(value) => {
                self.push(DeclSpec {
                    kind: DeclarationKind::Function,
                    name,
                    callable: Some(value),
                    outer,
                    body: value.child_by_field_name("body"),
                    exported,
                    parent: None,
                });
            }
            _ if is_const && exported => {
                self.push(DeclSpec {
                    kind: DeclarationKind::Const,
                    name,
                    callable: None,
                    outer,
                    body: None,
                    exported,
                    parent: None,
                });
            }
            _ => {}
        }
    }

    fn push(&mut self, spec: DeclSpec) -> usize {
        let (anchor, doc) = self.leading_doc(spec.outer);

        let start = spec.outer.start_byte();
        let raw_end = spec
            .body
            .map(|b| b.start_byte())
            .unwrap_or_else(|| spec.outer.end_byte());
        let header_end = start + self.content[start..raw_end].trim_end().len();
        let header_end = header_end.max(start + 1).min(spec.outer.end_byte());

        let header_lines = LineRange::new(
            self.index.line_of(start),
            self.index.line_of(header_end - 1),
        );

        let sig_start = signature_start(spec.outer).min(header_end);
        let mut text = collapse_whitespace(&self.content[sig_start..header_end]);
        if text.chars().count() > MAX_SIGNATURE_CHARS {
            text = text.chars().take(MAX_SIGNATURE_CHARS).collect::<String>() + "…";
        }

        let signature = match spec.callable {
            Some(callable) => Signature {
                text,
                parameters: self.parameters(callable),
                return_type: callable
                    .child_by_field_name("return_type")
                    .map(|t| strip_annotation(get_node_text(t, self.bytes))),
                is_async: has_token(callable, "async"),
            },
            None => Signature {
                text,
                ..Default::default()
            },
        };

        let qualified_name = match spec.parent {
            Some(parent) => format!(
                "{}.{}",
                self.declarations[parent].qualified_name, spec.name
            ),
            None => spec.name.clone(),
        };

        let body_lines = spec.body.map(node_lines);

        self.declarations.push(Declaration {
            kind: spec.kind,
            name: spec.name,
            qualified_name,
            signature,
            exported: spec.exported,
            header: start..header_end,
            header_lines,
            body_lines,
            span_lines: LineRange::new(self.index.line_of(anchor), node_lines(spec.outer).end),
            anchor,
            doc,
            parent: spec.parent,
        });
        self.declarations.len() - 1
    }

    /// Insertion anchor (first leading decorator or the node itself) and the
    /// JSDoc block directly above it, if any.
    fn leading_doc(&self, outer: Node) -> (usize, Option<DocComment>) {
        let mut anchor = outer.start_byte();
        let mut prev = outer.prev_named_sibling();
        while let Some(p) = prev {
            if p.kind() != "decorator" {
                break;
            }
            anchor = p.start_byte();
            prev = p.prev_named_sibling();
        }

        let Some(comment) = prev.filter(|p| p.kind() == "comment") else {
            return (anchor, None);
        };
        let text = get_node_text(comment, self.bytes);
        if !text.starts_with("/**") || text.starts_with("/**/") {
            return (anchor, None);
        }
        if FILE_LEVEL_TAGS.iter().any(|tag| text.contains(tag)) {
            return (anchor, None);
        }
        let gap = &self.content[comment.end_byte()..anchor];
        if !gap.chars().all(char::is_whitespace) {
            return (anchor, None);
        }

        let doc = DocComment {
            bytes: comment.start_byte()..comment.end_byte(),
            lines: node_lines(comment),
            text: text.to_string(),
        };
        (anchor, Some(doc))
    }

    fn parameters(&self, callable: Node) -> Vec<Parameter> {
        let Some(params) = callable.child_by_field_name("parameters") else {
            // `x => x` arrow functions carry a single bare parameter
            return callable
                .child_by_field_name("parameter")
                .map(|p| {
                    vec![Parameter {
                        name: get_node_text(p, self.bytes).to_string(),
                        type_annotation: None,
                        optional: false,
                    }]
                })
                .unwrap_or_default();
        };

        let mut cursor = params.walk();
        params
            .named_children(&mut cursor)
            .filter_map(|p| {
                let optional = p.kind() == "optional_parameter";
                let (name, type_annotation, has_default) = match p.kind() {
                    "required_parameter" | "optional_parameter" => {
                        let name = p
                            .child_by_field_name("pattern")
                            .map(|n| collapse_whitespace(get_node_text(n, self.bytes)))?;
                        let ty = p
                            .child_by_field_name("type")
                            .map(|t| strip_annotation(get_node_text(t, self.bytes)));
                        (name, ty, p.child_by_field_name("value").is_some())
                    }
                    "identifier" | "rest_pattern" | "object_pattern" | "array_pattern"
                    | "assignment_pattern" => (
                        collapse_whitespace(get_node_text(p, self.bytes)),
                        None,
                        p.kind() == "assignment_pattern",
                    ),
                    _ => return None,
                };
                if name == "this" {
                    return None;
                }
                Some(Parameter {
                    name,
                    type_annotation,
                    optional: optional || has_default,
                })
            })
            .collect()
    }

    fn field_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|n| get_node_text(n, self.bytes).to_string())
            .filter(|s| !s.is_empty())
    }

    fn has_private_modifier(&self, member: Node) -> bool {
        let mut cursor = member.walk();
        let found = member.children(&mut cursor).any(|c| {
            c.kind() == "accessibility_modifier" && get_node_text(c, self.bytes) == "private"
        });
        found
    }
}

fn is_function_value(node: Node) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == token);
    found
}

/// Start of the first child that is not a decorator or comment
fn signature_start(node: Node) -> usize {
    let mut cursor = node.walk();
    let start = node
        .children(&mut cursor)
        .find(|c| c.kind() != "decorator" && c.kind() != "comment")
        .map(|c| c.start_byte())
        .unwrap_or_else(|| node.start_byte());
    start
}

/// `: string` → `string`
fn strip_annotation(text: &str) -> String {
    collapse_whitespace(text.trim_start().trim_start_matches(':').trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ts(content: &str) -> ParseResult {
        TypeScriptParser::new(Language::TypeScript)
            .unwrap()
            .parse("test.ts", content)
            .unwrap()
    }

    fn names(result: &ParseResult) -> Vec<(DeclarationKind, String)> {
        result
            .declarations
            .iter()
            .map(|d| (d.kind, d.qualified_name.clone()))
            .collect()
    }

    #[test]
    fn test_extracts_all_kinds_in_document_order() {
        let content = r#"import { x } from "./x";

export function add(a: number, b: number): number {
  return a + b;
}

export class Store {
  private items: string[] = [];

  constructor(private readonly name: string) {}

  get(key: string): string | undefined {
    return undefined;
  }
}

export interface Options {
  verbose: boolean;
}

export type Id = string;

export const LIMIT = 10;

const internal = 5;

const double = (n: number) => n * 2;
"#;
        let result = parse_ts(content);
        assert_eq!(
            names(&result),
            vec![
                (DeclarationKind::Function, "add".to_string()),
                (DeclarationKind::Class, "Store".to_string()),
                (DeclarationKind::Method, "Store.constructor".to_string()),
                (DeclarationKind::Method, "Store.get".to_string()),
                (DeclarationKind::Interface, "Options".to_string()),
                (DeclarationKind::TypeAlias, "Id".to_string()),
                (DeclarationKind::Const, "LIMIT".to_string()),
                (DeclarationKind::Function, "double".to_string()),
            ]
        );
        assert!(result.headers_disjoint());
    }

    #[test]
    fn test_signature_and_ranges() {
        let content = "export async function load(path: string, retries?: number): Promise<void> {\n  await x;\n}\n";
        let result = parse_ts(content);
        let decl = &result.declarations[0];

        assert!(decl.exported);
        assert!(decl.signature.is_async);
        assert_eq!(
            decl.signature.text,
            "export async function load(path: string, retries?: number): Promise<void>"
        );
        assert_eq!(decl.signature.parameters.len(), 2);
        assert_eq!(decl.signature.parameters[0].name, "path");
        assert_eq!(
            decl.signature.parameters[0].type_annotation.as_deref(),
            Some("string")
        );
        assert!(decl.signature.parameters[1].optional);
        assert_eq!(decl.signature.return_type.as_deref(), Some("Promise<void>"));
        assert_eq!(decl.header_lines, LineRange::single(1));
        assert_eq!(decl.body_lines, Some(LineRange::new(1, 3)));
        assert_eq!(decl.anchor, 0);
    }

    #[test]
    fn test_attached_doc_comment() {
        let content = "/** Adds. */\nfunction add(a, b) {}\n\n/** Detached. */\n\nfunction sub(a, b) {}\n\n// line comment\nfunction mul(a, b) {}\n";
        let result = parse_ts(content);

        let add = &result.declarations[0];
        assert_eq!(add.doc.as_ref().unwrap().text, "/** Adds. */");
        assert_eq!(add.doc.as_ref().unwrap().lines, LineRange::single(1));

        // blank lines are allowed between comment and declaration
        assert!(result.declarations[1].is_documented());
        // line comments are not documentation
        assert!(!result.declarations[2].is_documented());
    }

    #[test]
    fn test_overload_signatures_are_not_declarations() {
        let content = "export function f(a: string): string;\nexport function f(a: number): number;\nexport function f(a: any): any {\n  return a;\n}\n";
        let result = parse_ts(content);
        assert_eq!(
            names(&result),
            vec![(DeclarationKind::Function, "f".to_string())]
        );
        assert_eq!(result.declarations[0].header_lines.start, 3);
    }

    #[test]
    fn test_declared_function_signature_is_extracted() {
        let content = "declare function load(path: string): Promise<string>;\n";
        let result = parse_ts(content);
        assert_eq!(
            names(&result),
            vec![(DeclarationKind::Function, "load".to_string())]
        );
    }

    #[test]
    fn test_license_header_is_not_documentation() {
        let content = "/**\n * @license MIT\n */\n\nexport function f() {}\n";
        let result = parse_ts(content);
        assert!(!result.declarations[0].is_documented());
    }

    #[test]
    fn test_decorated_method_anchor() {
        let content = "class A {\n  /** Runs. */\n  @log()\n  run() {}\n\n  @log()\n  stop() {}\n}\n";
        let result = parse_ts(content);
        let run = &result.declarations[1];
        let stop = &result.declarations[2];

        assert!(run.is_documented());
        assert_eq!(&content[run.anchor..run.anchor + 6], "@log()");
        assert!(!stop.is_documented());
        assert_eq!(stop.span_lines.start, 6);
    }

    #[test]
    fn test_private_members_not_exported() {
        let content = "export class A {\n  private hidden() {}\n  #secret() {}\n  shown() {}\n}\n";
        let result = parse_ts(content);
        let exported: Vec<bool> = result.declarations.iter().map(|d| d.exported).collect();
        assert_eq!(exported, vec![true, false, false, true]);
        assert_eq!(result.declarations[1].parent, Some(0));
    }

    #[test]
    fn test_multi_binding_and_unexported_consts_skipped() {
        let content = "export const a = 1, b = 2;\nconst c = 3;\nlet f = function () {};\n";
        let result = parse_ts(content);
        assert_eq!(
            names(&result),
            vec![(DeclarationKind::Function, "f".to_string())]
        );
    }

    #[test]
    fn test_syntax_error_fails_file() {
        let parser = TypeScriptParser::new(Language::TypeScript).unwrap();
        let err = parser
            .parse("broken.ts", "export function ( {\n")
            .unwrap_err();
        assert!(matches!(err, DocsmithError::Parse { .. }));
    }

    #[test]
    fn test_javascript_through_tsx_grammar() {
        let parser = TypeScriptParser::new(Language::JavaScript).unwrap();
        let result = parser
            .parse("app.js", "export default function () {\n  return <div />;\n}\n")
            .unwrap();
        assert_eq!(result.declarations.len(), 1);
        assert_eq!(result.declarations[0].name, "default");
    }
}
