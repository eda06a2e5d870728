//! Log line templates.
//!
//! A template is parsed once, when the logger is built, into literal text and
//! field placeholders. Three placeholder syntaxes are understood:
//!
//! - percent: `%(levelname)-8.8s`, `%(process)05d`, `%%`
//! - brace: `{levelname:<8.8}`, `{process:>6}`, `{{`, `}}`
//! - dollar: `$message`, `${levelname}`, `$$`
//!
//! Percent placeholders are right-aligned unless flagged with `-`. Brace
//! placeholders follow the usual format-spec rules: text left-aligned,
//! numbers right-aligned.

use super::LogLevel;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Write as _;

/// Placeholder syntax of a template.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Style {
    #[default]
    #[serde(rename = "%", alias = "percent")]
    Percent,
    #[serde(rename = "{", alias = "brace")]
    Brace,
    #[serde(rename = "$", alias = "dollar")]
    Dollar,
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Style::Percent => "%",
            Style::Brace => "{",
            Style::Dollar => "$",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Style {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "%" | "percent" => Ok(Style::Percent),
            "{" | "brace" => Ok(Style::Brace),
            "$" | "dollar" => Ok(Style::Dollar),
            _ => Err(anyhow::anyhow!("Invalid template style: {}", s)),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown field '{0}' in log format")]
    UnknownField(String),

    #[error("malformed log format at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    #[error("field '{0}' is not numeric")]
    NotNumeric(String),

    #[error("invalid date format '{0}'")]
    DateFormat(String),
}

/// Fields a template can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AscTime,
    LevelName,
    LevelNo,
    Name,
    Module,
    FileName,
    LineNo,
    Message,
    Process,
}

impl Field {
    pub fn from_name(name: &str) -> Option<Self> {
        let field = match name {
            "asctime" => Field::AscTime,
            "levelname" => Field::LevelName,
            "levelno" => Field::LevelNo,
            "name" => Field::Name,
            "module" => Field::Module,
            "filename" => Field::FileName,
            "lineno" => Field::LineNo,
            "message" => Field::Message,
            "process" => Field::Process,
            _ => return None,
        };
        Some(field)
    }

    fn is_numeric(self) -> bool {
        matches!(self, Field::LevelNo | Field::LineNo | Field::Process)
    }
}

/// Everything a template needs to render one log line.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub level: LogLevel,
    pub target: &'a str,
    pub module: &'a str,
    pub file: Option<&'a str>,
    pub line: Option<u32>,
    pub message: &'a str,
    pub time: DateTime<Local>,
    pub datefmt: &'a str,
}

impl Record<'_> {
    fn value(&self, field: Field) -> Cow<'_, str> {
        match field {
            Field::AscTime => {
                let mut out = String::new();
                // datefmt is validated when the logger is built
                let _ = write!(out, "{}", self.time.format(self.datefmt));
                Cow::Owned(out)
            }
            Field::LevelName => Cow::Borrowed(self.level.name()),
            Field::LevelNo => Cow::Owned(self.level.code().to_string()),
            Field::Name => Cow::Borrowed(self.target),
            Field::Module => Cow::Borrowed(self.module),
            Field::FileName => {
                let file = self.file.unwrap_or("");
                Cow::Borrowed(file.rsplit(['/', '\\']).next().unwrap_or(file))
            }
            Field::LineNo => Cow::Owned(self.line.unwrap_or(0).to_string()),
            Field::Message => Cow::Borrowed(self.message),
            Field::Process => Cow::Owned(std::process::id().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Placeholder {
    field: Field,
    align: Align,
    fill: char,
    width: usize,
    precision: Option<usize>,
}

impl Placeholder {
    fn bare(field: Field) -> Self {
        Self {
            field,
            align: Align::Left,
            fill: ' ',
            width: 0,
            precision: None,
        }
    }

    fn render_into(&self, out: &mut String, value: &str) {
        let value: Cow<'_, str> = match self.precision {
            Some(precision) if !self.field.is_numeric() => {
                Cow::Owned(value.chars().take(precision).collect())
            }
            _ => Cow::Borrowed(value),
        };

        let len = value.chars().count();
        let pad = self.width.saturating_sub(len);
        let (before, after) = match self.align {
            Align::Left => (0, pad),
            Align::Right => (pad, 0),
            Align::Center => (pad / 2, pad - pad / 2),
        };

        out.extend(std::iter::repeat(self.fill).take(before));
        out.push_str(&value);
        out.extend(std::iter::repeat(self.fill).take(after));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// A parsed log line template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str, style: Style) -> Result<Self, TemplateError> {
        let mut parser = Parser::new(source);
        match style {
            Style::Percent => parser.percent()?,
            Style::Brace => parser.brace()?,
            Style::Dollar => parser.dollar()?,
        }
        Ok(parser.finish())
    }

    /// Template rendering the bare message.
    pub fn plain() -> Self {
        Self {
            segments: vec![Segment::Field(Placeholder::bare(Field::Message))],
        }
    }

    /// Whether the template references `field`.
    pub fn uses(&self, field: Field) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Field(p) if p.field == field))
    }

    pub fn render(&self, record: &Record<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(placeholder) => {
                    placeholder.render_into(&mut out, &record.value(placeholder.field))
                }
            }
        }
        out
    }
}

/// Rejects strftime strings chrono cannot format.
pub fn validate_datefmt(datefmt: &str) -> Result<(), TemplateError> {
    if StrftimeItems::new(datefmt).any(|item| matches!(item, Item::Error)) {
        return Err(TemplateError::DateFormat(datefmt.to_string()));
    }
    Ok(())
}

struct Parser<'s> {
    source: &'s str,
    chars: Vec<(usize, char)>,
    pos: usize,
    segments: Vec<Segment>,
    literal: String,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
            segments: Vec::new(),
            literal: String::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.source.len(), |&(offset, _)| offset)
    }

    fn malformed(&self, reason: &'static str) -> TemplateError {
        TemplateError::Malformed {
            offset: self.offset(),
            reason,
        }
    }

    fn push_field(&mut self, placeholder: Placeholder) {
        if !self.literal.is_empty() {
            self.segments.push(Segment::Literal(std::mem::take(&mut self.literal)));
        }
        self.segments.push(Segment::Field(placeholder));
    }

    fn finish(mut self) -> Template {
        if !self.literal.is_empty() {
            self.segments.push(Segment::Literal(self.literal));
        }
        Template {
            segments: self.segments,
        }
    }

    fn take_until(&mut self, end: char, reason: &'static str) -> Result<String, TemplateError> {
        let mut name = String::new();
        loop {
            match self.bump() {
                Some(c) if c == end => return Ok(name),
                Some(c) => name.push(c),
                None => return Err(self.malformed(reason)),
            }
        }
    }

    fn number(&mut self) -> Option<usize> {
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            digits.push(c);
            self.pos += 1;
        }
        digits.parse().ok()
    }

    fn field(name: &str) -> Result<Field, TemplateError> {
        Field::from_name(name).ok_or_else(|| TemplateError::UnknownField(name.to_string()))
    }

    fn percent(&mut self) -> Result<(), TemplateError> {
        while let Some(c) = self.bump() {
            if c != '%' {
                self.literal.push(c);
                continue;
            }
            match self.bump() {
                Some('%') => self.literal.push('%'),
                Some('(') => {
                    let name = self.take_until(')', "unterminated '%('")?;
                    let field = Self::field(&name)?;
                    let mut placeholder = Placeholder::bare(field);
                    placeholder.align = Align::Right;

                    while let Some(flag) = self.peek().filter(|&c| matches!(c, '-' | '0' | ' ')) {
                        match flag {
                            '-' => placeholder.align = Align::Left,
                            '0' => placeholder.fill = '0',
                            _ => {}
                        }
                        self.pos += 1;
                    }
                    if placeholder.align == Align::Left {
                        placeholder.fill = ' ';
                    }
                    placeholder.width = self.number().unwrap_or(0);
                    if self.peek() == Some('.') {
                        self.pos += 1;
                        placeholder.precision = Some(self.number().unwrap_or(0));
                    }

                    match self.bump() {
                        Some('s') => {}
                        Some('d') if field.is_numeric() => {}
                        Some('d') => return Err(TemplateError::NotNumeric(name)),
                        _ => return Err(self.malformed("expected conversion 's' or 'd'")),
                    }
                    self.push_field(placeholder);
                }
                _ => return Err(self.malformed("expected '%(' or '%%'")),
            }
        }
        Ok(())
    }

    fn brace(&mut self) -> Result<(), TemplateError> {
        while let Some(c) = self.bump() {
            match c {
                '{' if self.peek() == Some('{') => {
                    self.pos += 1;
                    self.literal.push('{');
                }
                '}' if self.peek() == Some('}') => {
                    self.pos += 1;
                    self.literal.push('}');
                }
                '}' => return Err(self.malformed("single '}' in template")),
                '{' => {
                    let body = self.take_until('}', "unterminated '{'")?;
                    let placeholder = Self::brace_placeholder(&body)?;
                    self.push_field(placeholder);
                }
                other => self.literal.push(other),
            }
        }
        Ok(())
    }

    fn brace_placeholder(body: &str) -> Result<Placeholder, TemplateError> {
        let (name, spec) = match body.split_once(':') {
            Some((name, spec)) => (name, spec),
            None => (body, ""),
        };
        let field = Self::field(name)?;
        let mut placeholder = Placeholder::bare(field);
        if field.is_numeric() {
            placeholder.align = Align::Right;
        }

        let mut spec = Parser::new(spec);
        let align_of = |c: char| match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            _ => None,
        };
        let first = spec.chars.first().map(|&(_, c)| c);
        let second = spec.chars.get(1).map(|&(_, c)| c);
        if let (Some(fill), Some(align)) = (first, second.and_then(align_of)) {
            placeholder.fill = fill;
            placeholder.align = align;
            spec.pos = 2;
        } else if let Some(align) = first.and_then(align_of) {
            placeholder.align = align;
            spec.pos = 1;
        }

        if spec.peek() == Some('0') && placeholder.fill == ' ' && field.is_numeric() {
            placeholder.fill = '0';
            spec.pos += 1;
        }
        placeholder.width = spec.number().unwrap_or(0);
        if spec.peek() == Some('.') {
            spec.pos += 1;
            placeholder.precision = Some(spec.number().unwrap_or(0));
        }
        match spec.bump() {
            None | Some('s') => {}
            Some('d') if field.is_numeric() => {}
            Some('d') => return Err(TemplateError::NotNumeric(name.to_string())),
            Some(_) => {
                return Err(TemplateError::Malformed {
                    offset: spec.offset(),
                    reason: "invalid format spec",
                })
            }
        }
        if spec.peek().is_some() {
            return Err(TemplateError::Malformed {
                offset: spec.offset(),
                reason: "invalid format spec",
            });
        }
        Ok(placeholder)
    }

    fn dollar(&mut self) -> Result<(), TemplateError> {
        while let Some(c) = self.bump() {
            if c != '$' {
                self.literal.push(c);
                continue;
            }
            match self.peek() {
                Some('$') => {
                    self.pos += 1;
                    self.literal.push('$');
                }
                Some('{') => {
                    self.pos += 1;
                    let name = self.take_until('}', "unterminated '${'")?;
                    let field = Self::field(&name)?;
                    self.push_field(Placeholder::bare(field));
                }
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some(c) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                    {
                        name.push(c);
                        self.pos += 1;
                    }
                    let field = Self::field(&name)?;
                    self.push_field(Placeholder::bare(field));
                }
                _ => return Err(self.malformed("invalid placeholder after '$'")),
            }
        }
        Ok(())
    }
}
