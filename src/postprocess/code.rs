//! Best-effort JSX sanitizer for build-mode answers.
//!
//! Steps, in order: take the first fenced block (or the whole text), drop
//! `type`/`interface` declarations, drop inline TypeScript annotations, split
//! imports from the body (discarding `react` and `import type`), and make
//! sure an `export default` exists. Running it twice changes nothing.

use std::collections::BTreeSet;

use regex::Regex;

#[derive(Debug, Clone)]
pub struct CodeSanitizer {
    root_component: String,
    fenced_block: Regex,
    declaration_start: Regex,
    variable_annotation: Regex,
    bare_declaration_annotation: Regex,
    destructured_param_close: Regex,
    function_prefix: Regex,
    hook_generic: Regex,
    as_const: Regex,
    import_start: Regex,
    import_complete: Regex,
    import_source: Regex,
    import_type: Regex,
    export_default: Regex,
    function_decl: Regex,
    binding_decl: Regex,
    excess_blank_lines: Regex,
    jsx_tag: Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Function,
    Binding,
}

#[derive(Debug)]
struct EntryCandidate {
    line_start: usize,
    name: String,
    kind: EntryKind,
}

impl CodeSanitizer {
    pub fn new(root_component: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            root_component: root_component.into(),
            fenced_block: Regex::new(r"(?s)```[^\n`]*\n(.*?)```")?,
            declaration_start: Regex::new(
                r"^\s*(?:export\s+)?(?:declare\s+)?(?:type|interface)\s+[A-Za-z_$][\w$]*\s*(?:<[^>]*>)?\s*(?:=|\{|extends\b)",
            )?,
            variable_annotation: Regex::new(
                r"\b(const|let|var)\s+([A-Za-z_$][\w$]*)\s*:\s*(?:=>|[^=;\n])+?\s*=([^>=]|$)",
            )?,
            bare_declaration_annotation: Regex::new(
                r"\b(let|var)\s+([A-Za-z_$][\w$]*)\s*:\s*[^=;,\n]+?\s*([;,])",
            )?,
            destructured_param_close: Regex::new(
                r"^(\s*\})\s*:\s*[\w.<>\[\]|&, ]+?(\)\s*(?:=>|\{))",
            )?,
            function_prefix: Regex::new(r"\bfunction\b\s*\*?\s*[\w$]*\s*(?:<[^<>]*>)?\s*$")?,
            hook_generic: Regex::new(r"\b(use[A-Z][\w$]*)\s*<[^()]*?>\s*\(")?,
            as_const: Regex::new(r"\s+as\s+const\b")?,
            import_start: Regex::new(r#"^\s*import(?:\s+|\s*[{*'"])"#)?,
            import_complete: Regex::new(
                r#"(?s)(?:\bfrom\s*['"][^'"\n]+['"]|^import\s*['"][^'"\n]+['"])\s*;?\s*$"#,
            )?,
            import_source: Regex::new(r#"['"]([^'"\n]+)['"]\s*;?\s*$"#)?,
            import_type: Regex::new(r"^import\s+type\b")?,
            export_default: Regex::new(r"\bexport\s+default\b")?,
            function_decl: Regex::new(r"(?m)^(?:export\s+)?(?:async\s+)?function\s+([A-Z][\w$]*)")?,
            binding_decl: Regex::new(r"(?m)^(?:export\s+)?(?:const|let|var|class)\s+([A-Z][\w$]*)")?,
            excess_blank_lines: Regex::new(r"\n{3,}")?,
            jsx_tag: Regex::new(r"<([A-Z][A-Za-z0-9]*)\b")?,
        })
    }

    /// Never fails; output that collapses to nothing falls back to the input.
    pub fn sanitize(&self, text: &str) -> String {
        let code = self.extract_code(text);
        let code = self.strip_type_declarations(&code);
        let code = self.strip_annotations(&code);
        let (imports, body) = self.split_imports(&code);
        let body = self.ensure_default_export(body.trim());

        let assembled = if imports.is_empty() {
            body
        } else {
            format!("{}\n\n{}", imports.join("\n"), body)
        };
        let cleaned = self.tidy(&assembled);

        if cleaned.is_empty() && !text.trim().is_empty() {
            tracing::warn!("Code sanitizer produced empty output; returning raw answer");
            return text.to_string();
        }
        cleaned
    }

    /// Capitalized JSX tags that are neither allowed, declared in the code,
    /// nor the root component.
    pub fn unknown_components(&self, code: &str, allowed: &BTreeSet<String>) -> Vec<String> {
        let declared: BTreeSet<String> = self
            .entry_candidates(code)
            .into_iter()
            .map(|candidate| candidate.name)
            .collect();

        let mut unknown = BTreeSet::new();
        for caps in self.jsx_tag.captures_iter(code) {
            let Some(name) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if name == self.root_component
                || name == "React"
                || name == "Fragment"
                || allowed.contains(name)
                || declared.contains(name)
            {
                continue;
            }
            unknown.insert(name.to_string());
        }
        unknown.into_iter().collect()
    }

    fn extract_code(&self, text: &str) -> String {
        if let Some(block) = self.fenced_block.captures(text).and_then(|caps| caps.get(1)) {
            return block.as_str().to_string();
        }
        let trimmed = text.trim_start();
        if trimmed.starts_with("```") {
            // Unterminated fence: drop the opening line.
            return trimmed
                .split_once('\n')
                .map(|(_, rest)| rest.to_string())
                .unwrap_or_default();
        }
        text.to_string()
    }

    fn strip_type_declarations(&self, code: &str) -> String {
        let mut kept: Vec<&str> = Vec::new();
        let mut lines = code.lines().peekable();

        while let Some(line) = lines.next() {
            if !self.declaration_start.is_match(line) {
                kept.push(line);
                continue;
            }

            let mut depth = brace_delta(line);
            let mut last = line;
            loop {
                let open = depth > 0 || ends_with_continuation(last);
                let next_continues = lines
                    .peek()
                    .map(|next| starts_with_continuation(next))
                    .unwrap_or(false);
                if !open && !next_continues {
                    break;
                }
                match lines.next() {
                    Some(next) => {
                        depth += brace_delta(next);
                        last = next;
                    }
                    None => break,
                }
            }
        }

        kept.join("\n")
    }

    fn strip_annotations(&self, code: &str) -> String {
        code.lines()
            .map(|line| {
                let line = self
                    .variable_annotation
                    .replace_all(line, "${1} ${2} =${3}");
                let line = self
                    .bare_declaration_annotation
                    .replace_all(&line, "${1} ${2}${3}");
                let line = self
                    .destructured_param_close
                    .replace_all(&line, "${1}${2}");
                let line = if line.contains("=>") || line.contains("function") {
                    self.strip_signature_types(&line)
                } else {
                    line.into_owned()
                };
                let line = self.hook_generic.replace_all(&line, "${1}(");
                self.as_const.replace_all(&line, "").into_owned()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Removes parameter and return annotations from function and arrow
    /// signatures found on one line.
    fn strip_signature_types(&self, line: &str) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut out = String::with_capacity(line.len());
        let mut i = 0;

        while i < chars.len() {
            if chars[i] != '(' {
                out.push(chars[i]);
                i += 1;
                continue;
            }
            let Some(close) = matching_paren(&chars, i) else {
                out.push(chars[i]);
                i += 1;
                continue;
            };

            let before: String = chars[..i].iter().collect();
            let is_function = self.function_prefix.is_match(&before);
            let return_end = return_annotation_end(&chars, close + 1);
            let is_arrow = arrow_follows(&chars, close + 1)
                || matches!(return_end, Some((_, SignatureEnd::Arrow)));

            if !is_function && !is_arrow {
                out.push('(');
                i += 1;
                continue;
            }

            out.push('(');
            out.push_str(&strip_param_list(&chars[i + 1..close]));
            out.push(')');
            match return_end {
                Some((end, _)) => {
                    out.push(' ');
                    i = end;
                }
                None => i = close + 1,
            }
        }

        out
    }

    fn split_imports(&self, code: &str) -> (Vec<String>, String) {
        let mut imports: Vec<String> = Vec::new();
        let mut body: Vec<&str> = Vec::new();
        let mut lines = code.lines();

        while let Some(line) = lines.next() {
            if !self.import_start.is_match(line) {
                body.push(line);
                continue;
            }

            let mut statement = line.trim().to_string();
            while !self.import_complete.is_match(&statement) {
                match lines.next() {
                    Some(next) => {
                        statement.push('\n');
                        statement.push_str(next.trim_end());
                    }
                    None => break,
                }
            }

            if self.is_dropped_import(&statement) || imports.contains(&statement) {
                continue;
            }
            imports.push(statement);
        }

        (imports, body.join("\n"))
    }

    fn is_dropped_import(&self, statement: &str) -> bool {
        if self.import_type.is_match(statement) {
            return true;
        }
        self.import_source
            .captures(statement)
            .and_then(|caps| caps.get(1))
            .map(|source| {
                let source = source.as_str();
                source == "react" || source.starts_with("react/")
            })
            .unwrap_or(false)
    }

    fn entry_candidates(&self, code: &str) -> Vec<EntryCandidate> {
        let mut candidates = Vec::new();
        for (regex, kind) in [
            (&self.function_decl, EntryKind::Function),
            (&self.binding_decl, EntryKind::Binding),
        ] {
            for caps in regex.captures_iter(code) {
                if let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) {
                    candidates.push(EntryCandidate {
                        line_start: whole.start(),
                        name: name.as_str().to_string(),
                        kind,
                    });
                }
            }
        }
        candidates.sort_by_key(|candidate| candidate.line_start);
        candidates
    }

    fn ensure_default_export(&self, body: &str) -> String {
        if self.export_default.is_match(body) {
            return body.to_string();
        }

        let candidates = self.entry_candidates(body);
        let entry = candidates
            .iter()
            .find(|candidate| candidate.name == self.root_component)
            .or_else(|| candidates.last());
        let Some(entry) = entry else {
            return body.to_string();
        };

        match entry.kind {
            EntryKind::Function => {
                let (head, tail) = body.split_at(entry.line_start);
                match tail.strip_prefix("export ") {
                    Some(rest) => format!("{}export default {}", head, rest),
                    None => format!("{}export default {}", head, tail),
                }
            }
            EntryKind::Binding => {
                format!("{}\n\nexport default {};", body.trim_end(), entry.name)
            }
        }
    }

    fn tidy(&self, code: &str) -> String {
        let joined = code.lines().map(str::trim_end).collect::<Vec<_>>().join("\n");
        self.excess_blank_lines
            .replace_all(&joined, "\n\n")
            .trim()
            .to_string()
    }
}

fn brace_delta(line: &str) -> i32 {
    line.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

fn ends_with_continuation(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed.ends_with('=') || trimmed.ends_with('|') || trimmed.ends_with('&')
}

fn starts_with_continuation(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('|') || trimmed.starts_with('&')
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in chars[open..].iter().enumerate() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn skip_whitespace(chars: &[char], mut at: usize) -> usize {
    while at < chars.len() && chars[at].is_whitespace() {
        at += 1;
    }
    at
}

fn arrow_follows(chars: &[char], from: usize) -> bool {
    let at = skip_whitespace(chars, from);
    chars.get(at) == Some(&'=') && chars.get(at + 1) == Some(&'>')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignatureEnd {
    Arrow,
    Brace,
}

/// For `): Type =>` or `): Type {`, the index of `=>` or `{`.
fn return_annotation_end(chars: &[char], from: usize) -> Option<(usize, SignatureEnd)> {
    let colon = skip_whitespace(chars, from);
    if chars.get(colon) != Some(&':') {
        return None;
    }

    let mut depth = 0usize;
    let mut at = colon + 1;
    let mut saw_type = false;
    while at < chars.len() {
        let c = chars[at];
        if depth == 0 && c == '=' && chars.get(at + 1) == Some(&'>') {
            return saw_type.then_some((at, SignatureEnd::Arrow));
        }
        if depth == 0 && c == '{' {
            return saw_type.then_some((at, SignatureEnd::Brace));
        }
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if c.is_alphanumeric() || c.is_whitespace() => {}
            '_' | '$' | '.' | '[' | ']' | '|' | '&' | ',' | '\'' | '"' => {}
            _ => return None,
        }
        if !c.is_whitespace() {
            saw_type = true;
        }
        at += 1;
    }
    None
}

fn is_open(c: char) -> bool {
    matches!(c, '(' | '[' | '{' | '<')
}

fn is_close(c: char) -> bool {
    matches!(c, ')' | ']' | '}' | '>')
}

/// Splits at top-level commas, keeping the text between them untouched.
fn split_top_level(chars: &[char]) -> Vec<&[char]> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '=' && chars.get(i + 1) == Some(&'>') {
            i += 2;
            continue;
        }
        if is_open(c) {
            depth += 1;
        } else if is_close(c) {
            depth = depth.saturating_sub(1);
        } else if c == ',' && depth == 0 {
            segments.push(&chars[start..i]);
            start = i + 1;
        }
        i += 1;
    }
    segments.push(&chars[start..]);
    segments
}

fn strip_param_list(chars: &[char]) -> String {
    split_top_level(chars)
        .into_iter()
        .map(strip_param)
        .collect::<Vec<_>>()
        .join(",")
}

/// `name?: Type = default` becomes `name = default`.
fn strip_param(segment: &[char]) -> String {
    let mut depth = 0usize;
    let mut colon = None;
    let mut i = 0;
    while i < segment.len() {
        let c = segment[i];
        if c == '=' && segment.get(i + 1) == Some(&'>') {
            i += 2;
            continue;
        }
        if depth == 0 && c == '=' {
            break;
        }
        if depth == 0 && c == ':' {
            colon = Some(i);
            break;
        }
        if is_open(c) {
            depth += 1;
        } else if is_close(c) {
            depth = depth.saturating_sub(1);
        }
        i += 1;
    }

    let Some(colon) = colon else {
        return segment.iter().collect();
    };
    let start = if colon > 0 && segment[colon - 1] == '?' {
        colon - 1
    } else {
        colon
    };

    let mut end = segment.len();
    let mut depth = 0usize;
    let mut i = colon + 1;
    while i < segment.len() {
        let c = segment[i];
        if c == '=' && segment.get(i + 1) == Some(&'>') {
            i += 2;
            continue;
        }
        if depth == 0 && c == '=' {
            end = i;
            break;
        }
        if is_open(c) {
            depth += 1;
        } else if is_close(c) {
            depth = depth.saturating_sub(1);
        }
        i += 1;
    }

    let name: String = segment[..start].iter().collect();
    let name = name.trim_end();
    if end < segment.len() {
        let rest: String = segment[end..].iter().collect();
        format!("{} {}", name, rest)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> CodeSanitizer {
        CodeSanitizer::new("App").unwrap()
    }

    const FULL_ANSWER: &str = r#"Aquí tienes:

```tsx
import React, { useState } from 'react';
import { Button, Card } from '@mindset/ui';

interface CardProps {
  title: string;
  onClose?: () => void;
}

export type Size = 'sm'
  | 'md';

const Panel = ({ title }: CardProps): JSX.Element => {
  const [open, setOpen] = useState<boolean>(false);
  const sizes = ['sm', 'md'] as const;
  return <Card title={title}><Button onClick={(e: MouseEvent) => setOpen(!open)}>Ok</Button></Card>;
};

function App() {
  return <Panel title="Hola" />;
}
```

Espero que te sirva."#;

    #[test]
    fn react_fc_annotation_is_stripped_and_export_added() {
        let input = "```tsx\nimport React from 'react';\nconst App: React.FC = () => <div/>;\n```";
        assert_eq!(
            sanitizer().sanitize(input),
            "const App = () => <div/>;\n\nexport default App;"
        );
    }

    #[test]
    fn full_answer_is_cleaned() {
        let expected = r#"import { Button, Card } from '@mindset/ui';

const Panel = ({ title }) => {
  const [open, setOpen] = useState(false);
  const sizes = ['sm', 'md'];
  return <Card title={title}><Button onClick={(e) => setOpen(!open)}>Ok</Button></Card>;
};

export default function App() {
  return <Panel title="Hola" />;
}"#;
        assert_eq!(sanitizer().sanitize(FULL_ANSWER), expected);
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let sanitizer = sanitizer();
        let inputs = [
            FULL_ANSWER,
            "```jsx\nconst App = () => <div/>;\n```",
            "const Header = () => <h1/>;\nconst Page = () => <Header/>;",
            "export function App(): JSX.Element {\n  return null;\n}",
            "no code at all",
            "```tsx\nimport type { X } from './x';\nlet Count: number = 1;",
        ];
        for input in inputs {
            let once = sanitizer.sanitize(input);
            assert_eq!(sanitizer.sanitize(&once), once, "input: {}", input);
        }
    }

    #[test]
    fn output_never_imports_react() {
        let input = r#"```jsx
import React, {
  useState,
  useEffect
} from "react";
import { createRoot } from 'react/client';
import type { FC } from 'react-types';
import { Badge } from '@mindset/ui';
export default function App() { return <Badge/>; }
```"#;
        let output = sanitizer().sanitize(input);
        assert!(!output.contains("from \"react\""));
        assert!(!output.contains("'react/client'"));
        assert!(!output.contains("import type"));
        assert!(output.starts_with("import { Badge } from '@mindset/ui';\n\n"));
    }

    #[test]
    fn uninitialized_declarations_lose_their_annotation() {
        let sanitizer = sanitizer();
        assert_eq!(sanitizer.strip_annotations("let count: number;"), "let count;");
        assert_eq!(
            sanitizer.strip_annotations("  var timer: ReturnType<typeof setTimeout> | null;"),
            "  var timer;"
        );
        assert_eq!(
            sanitizer.strip_annotations("for (let i: number = 0; i < 3; i++) {"),
            "for (let i = 0; i < 3; i++) {"
        );

        let output = sanitizer.sanitize("```tsx
let count: number;
const App = () => <div/>;
```");
        assert!(output.starts_with("let count;
"));
        assert_eq!(sanitizer.sanitize(&output), output);
    }

    #[test]
    fn parameter_and_return_annotations_are_removed() {
        let sanitizer = sanitizer();
        assert_eq!(
            sanitizer.strip_annotations("function Row(label: string, size?: Size = 'md'): JSX.Element {"),
            "function Row(label, size = 'md') {"
        );
        assert_eq!(
            sanitizer.strip_annotations("items.map((item: Item, i: number) => <li key={i}/>)"),
            "items.map((item, i) => <li key={i}/>)"
        );
        assert_eq!(
            sanitizer.strip_annotations("const ref = useRef<HTMLDivElement | null>(null);"),
            "const ref = useRef(null);"
        );
        assert_eq!(
            sanitizer.strip_annotations("}: PanelProps) => {"),
            "}) => {"
        );
    }

    #[test]
    fn plain_javascript_is_untouched() {
        let line = "const total = items.reduce((sum, { price: p }) => sum + p, 0);";
        assert_eq!(sanitizer().strip_annotations(line), line);
        let ternary = "const label = active ? 'on' : 'off';";
        assert_eq!(sanitizer().strip_annotations(ternary), ternary);
    }

    #[test]
    fn last_capitalized_declaration_becomes_entry() {
        let output = sanitizer().sanitize("const Header = () => <h1/>;\nconst Page = () => <Header/>;");
        assert!(output.ends_with("export default Page;"));
    }

    #[test]
    fn no_candidate_leaves_body_alone() {
        assert_eq!(sanitizer().sanitize("<div>hola</div>"), "<div>hola</div>");
    }

    #[test]
    fn unterminated_fence_drops_opening_line() {
        let output = sanitizer().sanitize("```jsx\nfunction App() { return null; }");
        assert_eq!(output, "export default function App() { return null; }");
    }

    #[test]
    fn unknown_components_exclude_declared_and_allowed() {
        let sanitizer = sanitizer();
        let code = sanitizer.sanitize(FULL_ANSWER);
        let allowed: BTreeSet<String> = ["Button".to_string()].into_iter().collect();
        assert_eq!(sanitizer.unknown_components(&code, &allowed), vec!["Card"]);
    }

    #[test]
    fn malformed_input_never_panics() {
        let sanitizer = sanitizer();
        for input in [
            "",
            "```",
            "(((",
            ")))=>",
            "function (",
            "é: ñ => {",
            "const A: = ;",
            "type X = {",
            "import {",
            "(a: ) => : =>",
            "función Ñandú(ä: Ü): Ö => {}",
        ] {
            let _ = sanitizer.sanitize(input);
        }
    }
}
