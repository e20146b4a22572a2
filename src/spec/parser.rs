// src/spec/parser.rs

//! Constraint expression parsing
//!
//! Grammar, with optional whitespace between items:
//!
//! ```text
//! expr     := node ('^' node)*
//! node     := [name] item*
//! item     := '@' versions | '+' ident | '~' ident | ident '=' values
//!           | '%' ident ['@' versions]
//! ```

use super::version::VersionList;
use super::{CompilerSpec, Spec, VariantSetting};
use crate::error::{Error, Result};

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::SpecParse {
            expr: self.input.to_string(),
            reason: reason.into(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':' | ',')
}

fn is_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ',' | '/')
}

fn ident<'a>(cur: &mut Cursor<'a>, what: &str) -> Result<&'a str> {
    cur.skip_ws();
    let name = cur.take_while(is_ident_char);
    if name.is_empty() {
        return Err(cur.error(format!("expected {} name", what)));
    }
    Ok(name)
}

fn versions(cur: &mut Cursor<'_>) -> Result<VersionList> {
    cur.skip_ws();
    let text = cur.take_while(is_version_char);
    if text.is_empty() {
        return Err(cur.error("expected versions after '@'"));
    }
    VersionList::parse(text).map_err(|_| cur.error(format!("invalid version list '{}'", text)))
}

fn set_variant(cur: &Cursor<'_>, spec: &mut Spec, name: &str, setting: VariantSetting) -> Result<()> {
    if spec.variants.insert(name.to_string(), setting).is_some() {
        return Err(cur.error(format!("variant '{}' given more than once", name)));
    }
    Ok(())
}

fn node(cur: &mut Cursor<'_>) -> Result<Spec> {
    let mut spec = Spec::default();
    let mut has_versions = false;
    let mut first = true;

    loop {
        cur.skip_ws();
        let Some(c) = cur.peek() else { break };
        match c {
            '^' => break,
            '@' => {
                cur.bump();
                if has_versions {
                    return Err(cur.error("version constraint given more than once"));
                }
                spec.versions = versions(cur)?;
                has_versions = true;
            }
            '+' | '~' => {
                cur.bump();
                let name = ident(cur, "variant")?;
                set_variant(cur, &mut spec, name, VariantSetting::Enabled(c == '+'))?;
            }
            '%' => {
                cur.bump();
                if spec.compiler.is_some() {
                    return Err(cur.error("compiler given more than once"));
                }
                let name = ident(cur, "compiler")?.to_string();
                let mut compiler = CompilerSpec {
                    name,
                    versions: VersionList::any(),
                };
                if cur.peek() == Some('@') {
                    cur.bump();
                    compiler.versions = versions(cur)?;
                }
                spec.compiler = Some(compiler);
            }
            c if is_ident_char(c) => {
                let word = cur.take_while(is_ident_char);
                if cur.peek() == Some('=') {
                    cur.bump();
                    let value = cur.take_while(is_value_char);
                    if value.is_empty() {
                        return Err(cur.error(format!("missing value for variant '{}'", word)));
                    }
                    set_variant(cur, &mut spec, word, VariantSetting::from_value(value))?;
                } else if first && spec.name.is_none() {
                    spec.name = Some(word.to_string());
                } else {
                    return Err(cur.error(format!("unexpected name '{}'", word)));
                }
            }
            other => return Err(cur.error(format!("unexpected character '{}'", other))),
        }
        first = false;
    }

    Ok(spec)
}

/// Parse a full expression including `^dependency` constraints
pub(super) fn parse(input: &str) -> Result<Spec> {
    let mut cur = Cursor::new(input);
    let mut root = node(&mut cur)?;

    loop {
        cur.skip_ws();
        match cur.bump() {
            None => break,
            Some('^') => {
                let dep = node(&mut cur)?;
                let Some(name) = dep.name.clone() else {
                    return Err(cur.error("dependency constraint after '^' must be named"));
                };
                match root.dependencies.get_mut(&name) {
                    Some(existing) => existing.constrain(&dep)?,
                    None => {
                        root.dependencies.insert(name, dep);
                    }
                }
            }
            Some(other) => return Err(cur.error(format!("unexpected character '{}'", other))),
        }
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_node() {
        let spec = parse("libelf@0.8.12:0.8.13 +debug~shared %gcc@4.9").unwrap();
        assert_eq!(spec.name(), Some("libelf"));
        assert_eq!(spec.versions().to_string(), "0.8.12:0.8.13");
        assert_eq!(spec.variant("debug"), Some(&VariantSetting::Enabled(true)));
        assert_eq!(spec.variant("shared"), Some(&VariantSetting::Enabled(false)));
        let compiler = spec.compiler().unwrap();
        assert_eq!(compiler.name, "gcc");
        assert_eq!(compiler.versions.to_string(), "4.9");
    }

    #[test]
    fn test_parse_anonymous_and_values() {
        let spec = parse("@1.0: fabrics=psm,verbs").unwrap();
        assert_eq!(spec.name(), None);
        assert_eq!(
            spec.variant("fabrics"),
            Some(&VariantSetting::Values(vec!["psm".to_string(), "verbs".to_string()]))
        );
    }

    #[test]
    fn test_parse_dependencies() {
        let spec = parse("hdf5 +mpi ^mpich@3: ^zlib").unwrap();
        assert_eq!(spec.name(), Some("hdf5"));
        assert!(spec.dependency("mpich").is_some());
        assert!(spec.dependency("zlib").is_some());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("foo bar").is_err());
        assert!(parse("foo@1.0@2.0").is_err());
        assert!(parse("foo+debug~debug").is_err());
        assert!(parse("foo ^@1.0").is_err());
        assert!(parse("foo$").is_err());
        assert!(parse("%").is_err());
    }
}
