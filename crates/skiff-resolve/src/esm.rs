//! ES module syntax detection.
//!
//! Decides whether a file is syntactically an ES module by scanning for
//! top-level `import`/`export` declarations, skipping comments and string
//! literals. Intentionally lighter than a parser: dynamic `import(...)` and
//! `import.meta` do not count, since both also appear in scripts that are
//! otherwise CommonJS.

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Check whether source code contains an ES module declaration.
#[must_use]
pub fn is_es_module(source: &str) -> bool {
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();
    let mut i = 0;
    // last significant character seen, used for statement-position checks
    let mut prev: Option<char> = None;
    // line break since the last significant character; automatic semicolon
    // insertion makes a line start a statement position
    let mut line_break = false;

    while i < len {
        let c = chars[i];

        if c.is_whitespace() {
            if c == '\n' {
                line_break = true;
            }
            i += 1;
            continue;
        }

        // line comment (stops before the newline so the whitespace pass
        // records the line break)
        if c == '/' && i + 1 < len && chars[i + 1] == '/' {
            while i < len && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        // block comment
        if c == '/' && i + 1 < len && chars[i + 1] == '*' {
            i += 2;
            while i + 1 < len && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i += 2;
            continue;
        }

        // string literals (including template literals, without interpolation
        // awareness; good enough to avoid false keyword hits)
        if c == '"' || c == '\'' || c == '`' {
            let quote = c;
            i += 1;
            while i < len && chars[i] != quote {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i += 1;
            prev = Some(quote);
            line_break = false;
            continue;
        }

        // statement position: start of file, after a statement terminator,
        // or at the start of a new line
        let at_statement = line_break || matches!(prev, None | Some(';') | Some('}'));
        if at_keyword(&chars, i, "import", at_statement)
            || at_keyword(&chars, i, "export", at_statement)
        {
            // `import(...)` is dynamic import, `import.meta` is a member
            // expression; neither marks the file on its own
            let next = first_significant(&chars, i + 6);
            if !(chars[i] == 'i' && matches!(next, Some('(') | Some('.'))) {
                return true;
            }
        }

        prev = Some(c);
        line_break = false;
        // skip the rest of an identifier so keywords inside names don't match
        if is_ident_char(c) {
            while i < len && is_ident_char(chars[i]) {
                i += 1;
            }
            prev = Some('a');
            continue;
        }
        i += 1;
    }

    false
}

/// Is `word` at position `i`, at statement position, with proper boundaries?
fn at_keyword(chars: &[char], i: usize, word: &str, at_statement: bool) -> bool {
    if !at_statement {
        return false;
    }
    let word_chars: Vec<char> = word.chars().collect();
    if i + word_chars.len() > chars.len() {
        return false;
    }
    if chars[i..i + word_chars.len()] != word_chars[..] {
        return false;
    }
    // boundary after the keyword
    match chars.get(i + word_chars.len()) {
        Some(&c) => !is_ident_char(c),
        None => true,
    }
}

fn first_significant(chars: &[char], mut i: usize) -> Option<char> {
    while i < chars.len() {
        if !chars[i].is_whitespace() {
            return Some(chars[i]);
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_import_declaration() {
        assert!(is_es_module("import x from './x.js';\n"));
        assert!(is_es_module("import './side-effect';"));
        assert!(is_es_module("import * as ns from 'pkg';"));
    }

    #[test]
    fn detects_export_declaration() {
        assert!(is_es_module("export default 42;"));
        assert!(is_es_module("const a = 1;\nexport { a };"));
    }

    #[test]
    fn detects_declarations_without_semicolons() {
        assert!(is_es_module("const a = 1\nexport default a\n"));
        assert!(is_es_module("import x from './x.js'\nconst y = x\n"));
    }

    #[test]
    fn detects_export_on_line_after_expression_statement() {
        assert!(is_es_module("setup()\nexport const x = 1\n"));
    }

    #[test]
    fn rejects_commonjs() {
        assert!(!is_es_module("const x = require('./x');\nmodule.exports = x;"));
    }

    #[test]
    fn ignores_comments_and_strings() {
        assert!(!is_es_module("// import fake from 'x'\nconst s = \"export default\";"));
        assert!(!is_es_module("/* export { a } */ const a = 1;"));
    }

    #[test]
    fn dynamic_import_is_not_esm() {
        assert!(!is_es_module("import('./lazy.js').then(m => m.run());"));
        assert!(!is_es_module("run()\nimport('./lazy.js')\n"));
    }

    #[test]
    fn keyword_inside_identifier_does_not_match() {
        assert!(!is_es_module("const importantThing = 1; exporter(importantThing);"));
    }

    #[test]
    fn import_after_statement() {
        assert!(is_es_module("const a = 1;\nimport b from 'b';"));
    }
}
