//! Script minification
//!
//! The pipeline only needs the [`Minifier`] seam. The built-in
//! [`StripMinifier`] is conservative: it removes comments,
//! indentation, trailing whitespace and blank lines, and never joins lines,
//! so automatic semicolon insertion is unaffected.

use std::fmt;

/// Minification failure with a 1-based position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifyError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for MinifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.line, self.column)
    }
}

impl std::error::Error for MinifyError {}

pub trait Minifier {
    fn minify(&self, source: &str) -> Result<String, MinifyError>;
}

/// Comment and whitespace stripper
#[derive(Debug, Default, Clone, Copy)]
pub struct StripMinifier;

impl Minifier for StripMinifier {
    fn minify(&self, source: &str) -> Result<String, MinifyError> {
        Stripper::new(source).run()
    }
}

// Words after which `/` starts a regular expression rather than a division
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

struct Stripper<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
    out: String,
    line: String,
    last_significant: Option<char>,
    last_word: String,
    in_word: bool,
    // The last operator was `++` or `--`
    increment: bool,
}

impl<'a> Stripper<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.char_indices().peekable(),
            src,
            out: String::with_capacity(src.len()),
            line: String::new(),
            last_significant: None,
            last_word: String::new(),
            in_word: false,
            increment: false,
        }
    }

    fn run(mut self) -> Result<String, MinifyError> {
        while let Some((at, c)) = self.chars.next() {
            if !(c.is_alphanumeric() || c == '_' || c == '$') {
                self.in_word = false;
            }
            match c {
                '\n' => self.end_line(),
                '\'' | '"' => self.string(at, c)?,
                '`' => self.template(at)?,
                '/' => match self.chars.peek().map(|&(_, n)| n) {
                    Some('/') => self.line_comment(),
                    Some('*') => self.block_comment(at)?,
                    _ if self.regex_allowed() => self.regex(at)?,
                    _ => self.code('/'),
                },
                c if c.is_whitespace() => {
                    // Leading indentation is dropped; inner runs collapse lazily
                    if !self.line.is_empty() {
                        self.line.push(c);
                    }
                }
                c => self.code(c),
            }
        }
        self.end_line();
        Ok(self.out)
    }

    fn code(&mut self, c: char) {
        self.increment = matches!(c, '+' | '-')
            && !self.increment
            && self.last_significant == Some(c)
            && self.line.ends_with(c);
        self.line.push(c);
        if c.is_alphanumeric() || c == '_' || c == '$' {
            if !self.in_word {
                self.last_word.clear();
            }
            self.last_word.push(c);
            self.in_word = true;
        } else {
            self.last_word.clear();
        }
        self.last_significant = Some(c);
    }

    fn end_line(&mut self) {
        let trimmed = self.line.trim_end();
        if !trimmed.is_empty() {
            self.out.push_str(trimmed);
            self.out.push('\n');
        }
        self.line.clear();
    }

    fn regex_allowed(&self) -> bool {
        match self.last_significant {
            None => true,
            Some('+' | '-') if self.increment => false,
            Some(c) if "(,=:[!&|?{};+-*%<>~^".contains(c) => true,
            Some(c) if c.is_alphanumeric() || c == '_' || c == '$' => {
                REGEX_KEYWORDS.contains(&self.last_word.as_str())
            }
            _ => false,
        }
    }

    fn error(&self, at: usize, message: &str) -> MinifyError {
        let before = &self.src[..at];
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        MinifyError {
            line,
            column,
            message: message.to_string(),
        }
    }

    fn string(&mut self, at: usize, quote: char) -> Result<(), MinifyError> {
        self.line.push(quote);
        loop {
            match self.chars.next() {
                Some((_, '\\')) => {
                    self.line.push('\\');
                    if let Some((_, escaped)) = self.chars.next() {
                        self.line.push(escaped);
                    }
                }
                Some((_, '\n')) | None => return Err(self.error(at, "unterminated string literal")),
                Some((_, c)) => {
                    self.line.push(c);
                    if c == quote {
                        break;
                    }
                }
            }
        }
        self.last_word.clear();
        self.last_significant = Some(quote);
        Ok(())
    }

    // Template contents (including `${}` bodies) are copied verbatim, newlines too
    fn template(&mut self, at: usize) -> Result<(), MinifyError> {
        self.line.push('`');
        let mut depth = 0usize;
        loop {
            match self.chars.next() {
                Some((_, '\\')) => {
                    self.line.push('\\');
                    if let Some((_, escaped)) = self.chars.next() {
                        self.line.push(escaped);
                    }
                }
                Some((_, '$')) if self.chars.peek().map(|&(_, n)| n) == Some('{') => {
                    self.line.push('$');
                    depth += 1;
                }
                Some((_, '}')) if depth > 0 => {
                    self.line.push('}');
                    depth -= 1;
                }
                Some((_, '`')) if depth == 0 => {
                    self.line.push('`');
                    break;
                }
                Some((_, c)) => self.line.push(c),
                None => return Err(self.error(at, "unterminated template literal")),
            }
        }
        self.last_word.clear();
        self.last_significant = Some('`');
        Ok(())
    }

    fn regex(&mut self, at: usize) -> Result<(), MinifyError> {
        self.line.push('/');
        let mut in_class = false;
        loop {
            match self.chars.next() {
                Some((_, '\\')) => {
                    self.line.push('\\');
                    if let Some((_, escaped)) = self.chars.next() {
                        self.line.push(escaped);
                    }
                }
                Some((_, '\n')) | None => {
                    return Err(self.error(at, "unterminated regular expression"))
                }
                Some((_, c)) => {
                    self.line.push(c);
                    match c {
                        '[' => in_class = true,
                        ']' => in_class = false,
                        '/' if !in_class => break,
                        _ => {}
                    }
                }
            }
        }
        self.last_word.clear();
        self.last_significant = Some('/');
        Ok(())
    }

    fn line_comment(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    fn block_comment(&mut self, at: usize) -> Result<(), MinifyError> {
        self.chars.next();
        let mut saw_newline = false;
        let mut prev = '\0';
        loop {
            match self.chars.next() {
                Some((_, '/')) if prev == '*' => break,
                Some((_, c)) => {
                    saw_newline |= c == '\n';
                    prev = c;
                }
                None => return Err(self.error(at, "unterminated comment")),
            }
        }
        if saw_newline {
            // A comment spanning lines still terminates the statement line
            self.end_line();
        } else if !self.line.is_empty() {
            self.line.push(' ');
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strip(src: &str) -> Result<String, MinifyError> {
        StripMinifier.minify(src)
    }

    #[test]
    fn test_removes_comments_and_indentation() {
        let src = "// header\nfunction f(a) {\n    /* inline */ return a; // trailing\n\n}\n";
        assert_eq!(strip(src).unwrap(), "function f(a) {\nreturn a;\n}\n");
    }

    #[test]
    fn test_keeps_strings_and_templates() {
        let src = "const s = '// not a comment';\nconst t = `line1\n    line2 ${ a /* x */ }`;\n";
        assert_eq!(
            strip(src).unwrap(),
            "const s = '// not a comment';\nconst t = `line1\n    line2 ${ a /* x */ }`;\n"
        );
    }

    #[test]
    fn test_regex_vs_division() {
        let src = "const r = /a\\/b[/]/g;\nconst d = x / y / z;\nreturn /re/.test(s);\n";
        assert_eq!(strip(src).unwrap(), src);
    }

    #[test]
    fn test_division_after_postfix_operator() {
        let src = "let count = 4;\nconst half = count-- / 2;\nconst next = x++ / 2;\n";
        assert_eq!(strip(src).unwrap(), src);
    }

    #[test]
    fn test_regex_after_binary_plus() {
        let src = "const s = a + /re/.source;\nconst t = b - -/x/.lastIndex;\n";
        assert_eq!(strip(src).unwrap(), src);
    }

    #[test]
    fn test_multiline_block_comment_ends_line() {
        assert_eq!(strip("a /* x\n y */ b\n").unwrap(), "a\nb\n");
    }

    #[test]
    fn test_unterminated_string_position() {
        let err = strip("let a = 1;\n  let s = 'abc\n").unwrap_err();
        assert_eq!((err.line, err.column), (2, 11));
    }

    #[test]
    fn test_unterminated_comment() {
        let err = strip("a();\n/* never closed").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 1);
    }
}
