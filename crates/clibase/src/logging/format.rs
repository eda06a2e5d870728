use super::template::{Record, Template};
use super::LogLevel;
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Name of the boolean field that promotes an ERROR event to CRITICAL.
pub const CRITICAL_FIELD: &str = "critical";

/// Event formatter rendering records through a [`Template`].
///
/// Above DEBUG, INFO records use the bare message template so they read like
/// ordinary program output; every other level keeps the detailed template.
///
/// At CRITICAL, ERROR events without the `critical` flag are dropped here,
/// since the level filter can only stop at ERROR.
#[derive(Debug, Clone)]
pub struct TemplateFormat {
    detailed: Template,
    plain: Option<Template>,
    datefmt: String,
    min_level: LogLevel,
}

impl TemplateFormat {
    pub fn new(detailed: Template, datefmt: impl Into<String>, min_level: LogLevel) -> Self {
        Self {
            detailed,
            plain: (min_level > LogLevel::Debug).then(Template::plain),
            datefmt: datefmt.into(),
            min_level,
        }
    }

    fn template_for(&self, level: LogLevel) -> &Template {
        match &self.plain {
            Some(plain) if level == LogLevel::Info => plain,
            _ => &self.detailed,
        }
    }
}

impl<S, N> FormatEvent<S, N> for TemplateFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let level = LogLevel::from_tracing(metadata.level(), visitor.critical);
        if self.min_level == LogLevel::Critical && level == LogLevel::Error {
            return Ok(());
        }
        let module_path = metadata.module_path().unwrap_or_else(|| metadata.target());
        let message = visitor.finish();

        let record = Record {
            level,
            target: metadata.target(),
            module: module_path.rsplit("::").next().unwrap_or(module_path),
            file: metadata.file(),
            line: metadata.line(),
            message: &message,
            time: chrono::Local::now(),
            datefmt: &self.datefmt,
        };

        writeln!(writer, "{}", self.template_for(level).render(&record))
    }
}

/// Collects the `message` field and appends any other fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    extra: String,
    critical: bool,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.extra.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.extra.trim_start().to_string()
        } else {
            self.message + &self.extra
        }
    }
}

impl Visit for MessageVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == CRITICAL_FIELD {
            self.critical = value;
        } else {
            let _ = write!(self.extra, " {}={}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.extra, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.extra, " {}={:?}", field.name(), value);
        }
    }
}
