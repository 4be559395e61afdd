use std::fmt;
use std::path::PathBuf;

use crate::error::{Result, SageError};

pub const DEFAULT_TEMPLATES: &[&str] = &[
    "assets/{locale}/{category}/{path}",
    "assets/{category}/{path}",
    "assets/{locale}/{path}",
    "assets/{path}",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    Locale,
    Category,
    Path,
}

impl Variable {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "locale" => Some(Variable::Locale),
            "category" => Some(Variable::Category),
            "path" => Some(Variable::Path),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Variable::Locale => "locale",
            Variable::Category => "category",
            Variable::Path => "path",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(Variable),
}

/// A layer-relative path pattern such as `assets/{locale}/{category}/{path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(text: &str) -> Result<Self> {
        let fail = |reason: &str| {
            SageError::configuration(format!("malformed path template '{text}': {reason}"))
        };

        let normalized = text.replace('\\', "/");
        if normalized.is_empty() {
            return Err(fail("template is empty"));
        }
        if normalized.starts_with('/') {
            return Err(fail("template must be relative to the layer root"));
        }
        if normalized.split('/').any(|part| part == "..") {
            return Err(fail("template must not contain '..'"));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = normalized.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(fail("unbalanced '{'")),
                            Some(c) => name.push(c),
                        }
                    }
                    let var = Variable::from_name(name.trim())
                        .ok_or_else(|| fail(&format!("unknown variable '{{{name}}}'")))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Var(var));
                }
                '}' => return Err(fail("unbalanced '}'")),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let path_vars = segments
            .iter()
            .filter(|segment| **segment == Segment::Var(Variable::Path))
            .count();
        if path_vars != 1 {
            return Err(fail("template must contain '{path}' exactly once"));
        }

        Ok(Self {
            source: normalized,
            segments,
        })
    }

    /// The built-in templates, in lookup order.
    pub fn defaults() -> Result<Vec<PathTemplate>> {
        DEFAULT_TEMPLATES.iter().map(|text| PathTemplate::parse(text)).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn uses(&self, var: Variable) -> bool {
        self.segments.contains(&Segment::Var(var))
    }

    pub fn is_localized(&self) -> bool {
        self.uses(Variable::Locale)
    }

    /// Substitute the variables. Returns `None` when the template needs a
    /// variable the caller left empty, so uncategorized or unlocalized
    /// requests skip the templates that would need them.
    pub fn expand(&self, category: &str, locale: &str, path: &str) -> Option<PathBuf> {
        let mut out = String::with_capacity(self.source.len() + path.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Var(var) => {
                    let value = match var {
                        Variable::Locale => locale,
                        Variable::Category => category,
                        Variable::Path => path,
                    };
                    if value.is_empty() {
                        return None;
                    }
                    out.push_str(value);
                }
            }
        }
        Some(out.split('/').filter(|part| !part.is_empty()).collect())
    }

    /// The directory every expansion of this template lives under, for
    /// templates that end in `/{path}`. Used to enumerate a category.
    pub fn directory(&self, category: &str, locale: &str) -> Option<PathBuf> {
        let (last, prefix) = self.segments.split_last()?;
        if *last != Segment::Var(Variable::Path) {
            return None;
        }
        let mut out = String::new();
        for segment in prefix {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Var(var) => {
                    let value = match var {
                        Variable::Locale => locale,
                        Variable::Category => category,
                        Variable::Path => return None,
                    };
                    if value.is_empty() {
                        return None;
                    }
                    out.push_str(value);
                }
            }
        }
        if !(out.is_empty() || out.ends_with('/')) {
            return None;
        }
        Some(out.split('/').filter(|part| !part.is_empty()).collect())
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Var(var) => write!(f, "{{{}}}", var.name())?,
            }
        }
        Ok(())
    }
}
