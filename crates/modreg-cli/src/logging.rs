use std::io::{self, Stderr, Stdout};

use nu_ansi_term::Color::{Blue, Magenta, Red, Yellow};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        writer::EitherWriter,
        FmtContext, FormatEvent, FormatFields, MakeWriter,
    },
    registry::LookupSpan,
};

use crate::{cli::Args, utils::Colored};

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

/// Bare messages for `INFO`, a coloured level tag for everything else.
pub struct CustomFormatter;

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        write!(writer, "{}", level_tag(*event.metadata().level()))?;

        if let Some(message) = visitor.message {
            writeln!(writer, "{message}")
        } else {
            writeln!(writer)
        }
    }
}

fn level_tag(level: Level) -> String {
    match level {
        Level::TRACE => format!("{} ", Colored(Magenta, "[TRACE]")),
        Level::DEBUG => format!("{} ", Colored(Blue, "[DEBUG]")),
        Level::INFO => String::new(),
        Level::WARN => format!("{} ", Colored(Yellow, "[WARN]")),
        Level::ERROR => format!("{} ", Colored(Red, "[ERROR]")),
    }
}

/// `INFO` goes to stdout, every other level to stderr.
struct WriterBuilder;

impl<'a> MakeWriter<'a> for WriterBuilder {
    type Writer = EitherWriter<Stdout, Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        EitherWriter::A(io::stdout())
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        if meta.level() == &Level::INFO {
            EitherWriter::A(io::stdout())
        } else {
            EitherWriter::B(io::stderr())
        }
    }
}

fn filter_level(args: &Args) -> Level {
    if args.quiet {
        Level::ERROR
    } else if args.verbose >= 2 {
        Level::TRACE
    } else if args.verbose == 1 {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Installs the global subscriber. Returns `false` if one was already set.
pub fn setup_logging(args: &Args) -> bool {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(format!("modreg={}", filter_level(args)))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(WriterBuilder)
        .compact()
        .without_time();

    let subscriber: Box<dyn Subscriber + Send + Sync> = if args.json {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(builder.event_format(CustomFormatter).finish())
    };

    tracing::subscriber::set_global_default(subscriber).is_ok()
}
