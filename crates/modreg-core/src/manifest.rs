//! Reader for the part of `MODULE.bazel` a registry needs: the leading
//! `module(...)` call and the `bazel_dep(...)` calls after it.
//!
//! This is not a Starlark parser. A document is treated as a flat sequence
//! of calls `ident(attr = value, ...)`; values that are not string or
//! integer literals are carried as raw text and ignored.

use std::str::FromStr;

use serde::Serialize;

use crate::error::ManifestError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BazelDep {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleManifest {
    pub name: String,
    /// Absent (or empty) when the version is supplied by the registry.
    pub version: Option<String>,
    pub compatibility_level: u32,
    /// In declaration order; duplicates are kept.
    pub deps: Vec<BazelDep>,
}

impl ModuleManifest {
    /// Parses a manifest document.
    ///
    /// # Errors
    ///
    /// The first call must be `module` with a string `name`. Malformed
    /// `version` or `compatibility_level` values and unclosed calls are
    /// errors too. `bazel_dep` calls lacking a string `name` or `version`
    /// are skipped, as are all other calls.
    ///
    /// # Example
    ///
    /// ```
    /// use modreg_core::manifest::ModuleManifest;
    ///
    /// let manifest = ModuleManifest::parse(
    ///     r#"module(name = "x", version = "1.0", compatibility_level = 2)
    ///        bazel_dep(name = "y", version = "2.0")"#,
    /// )
    /// .unwrap();
    /// assert_eq!(manifest.name, "x");
    /// assert_eq!(manifest.deps[0].name, "y");
    /// ```
    pub fn parse(contents: &str) -> Result<Self, ManifestError> {
        let source = strip_comments(contents);
        let mut calls = Calls::new(&source);

        let module = match calls.next() {
            Some(call) => call?,
            None => return Err(ManifestError::MissingModule { found: None }),
        };
        if module.name != "module" {
            return Err(ManifestError::MissingModule {
                found: Some(module.name.to_string()),
            });
        }

        let name = match module.attr("name") {
            Some(raw) => string_attr("name", raw)?,
            None => return Err(ManifestError::MissingName),
        };
        if name.is_empty() {
            return Err(ManifestError::MissingName);
        }

        let version = module
            .attr("version")
            .map(|raw| string_attr("version", raw))
            .transpose()?
            .filter(|version| !version.is_empty());

        let compatibility_level = match module.attr("compatibility_level") {
            Some(raw) => {
                raw.parse::<u32>().map_err(|_| {
                    ManifestError::InvalidInteger {
                        attr: "compatibility_level",
                        value: raw.to_string(),
                    }
                })?
            }
            None => 1,
        };

        let mut deps = Vec::new();
        for call in calls {
            let call = call?;
            if call.name != "bazel_dep" {
                continue;
            }
            let (Some(name), Some(version)) = (
                call.attr("name").and_then(string_literal),
                call.attr("version").and_then(string_literal),
            ) else {
                continue;
            };
            deps.push(BazelDep { name, version });
        }

        Ok(Self {
            name,
            version,
            compatibility_level,
            deps,
        })
    }
}

impl FromStr for ModuleManifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn string_attr(attr: &'static str, raw: &str) -> Result<String, ManifestError> {
    string_literal(raw).ok_or_else(|| {
        ManifestError::InvalidString {
            attr,
            value: raw.to_string(),
        }
    })
}

/// Decodes a single- or double-quoted literal with the common escapes.
fn string_literal(raw: &str) -> Option<String> {
    let quote = raw.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let inner = raw.strip_prefix(quote)?.strip_suffix(quote)?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Some(out)
}

/// Removes `#` comments outside string literals. Newlines are kept so that
/// line numbers stay meaningful.
fn strip_comments(contents: &str) -> String {
    let mut out = String::with_capacity(contents.len());
    let mut quote = None;
    let mut escaped = false;
    let mut in_comment = false;

    for c in contents.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
                out.push(c);
            }
            continue;
        }

        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                match c {
                    '#' => {
                        in_comment = true;
                        continue;
                    }
                    '"' | '\'' => quote = Some(c),
                    _ => {}
                }
            }
        }
        out.push(c);
    }

    out
}

struct Call<'a> {
    name: &'a str,
    attrs: Vec<(&'a str, &'a str)>,
}

impl<'a> Call<'a> {
    /// Last assignment wins.
    fn attr(&self, key: &str) -> Option<&'a str> {
        self.attrs
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }
}

struct Calls<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Calls<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn line_at(&self, offset: usize) -> usize {
        self.source[..offset].matches('\n').count() + 1
    }
}

impl<'a> Iterator for Calls<'a> {
    type Item = Result<Call<'a>, ManifestError>;

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.source;
        let rest = &source[self.pos..];
        let open = rest.find('(')?;
        let name = trailing_identifier(&rest[..open]);

        let body_start = self.pos + open + 1;
        let Some((args, close)) = split_args(&source[body_start..]) else {
            let line = self.line_at(self.pos + open);
            self.pos = source.len();
            return Some(Err(ManifestError::UnclosedCall {
                name: name.to_string(),
                line,
            }));
        };
        self.pos = body_start + close + 1;

        let attrs = args
            .into_iter()
            .filter_map(|arg| {
                let (key, value) = arg.split_once('=')?;
                let key = key.trim();
                let is_ident = !key.is_empty() && key.chars().all(is_identifier_char);
                is_ident.then(|| (key, value.trim()))
            })
            .collect();

        Some(Ok(Call { name, attrs }))
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `x = use_extension` yields `use_extension`.
fn trailing_identifier(head: &str) -> &str {
    let head = head.trim_end();
    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_identifier_char(*c))
        .last()
        .map_or(head.len(), |(i, _)| i);
    &head[start..]
}

/// Splits call arguments on top-level commas, up to the `)` closing the
/// call. Returns the trimmed arguments and the offset of that `)`.
fn split_args(body: &str) -> Option<(Vec<&str>, usize)> {
    let bytes = body.as_bytes();
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut escaped = false;
    let mut arg_start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }

        match b {
            b'"' | b'\'' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' if depth == 0 => {
                push_arg(&mut args, &body[arg_start..i]);
                return Some((args, i));
            }
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                push_arg(&mut args, &body[arg_start..i]);
                arg_start = i + 1;
            }
            _ => {}
        }
    }

    None
}

fn push_arg<'a>(args: &mut Vec<&'a str>, arg: &'a str) {
    let arg = arg.trim();
    if !arg.is_empty() {
        args.push(arg);
    }
}
