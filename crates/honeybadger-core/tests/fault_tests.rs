use honeybadger_core::fault::parse_backtrace;
use honeybadger_core::{trim_capture_frames, Fault, StackFrame};
use std::fmt;

#[derive(Debug)]
struct QueryFailed {
    source: std::io::Error,
}

impl fmt::Display for QueryFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query failed")
    }
}

impl std::error::Error for QueryFailed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[test]
fn test_render_with_frames_and_cause() {
    let fault = Fault::new("com.acme.Oops")
        .with_message("boom")
        .with_frame(
            StackFrame::new("com.acme.Service", "run")
                .with_file("Service.java")
                .with_line(42),
        )
        .with_frame(StackFrame::new("com.acme.Main", "main"))
        .with_cause(Fault::new("java.io.IOException").with_message("disk"));

    assert_eq!(
        fault.rendered_lines(),
        vec![
            "com.acme.Oops: boom",
            "\tat com.acme.Service.run(Service.java:42)",
            "\tat com.acme.Main.main(Unknown Source)",
            "Caused by: java.io.IOException: disk",
        ]
    );
    assert_eq!(fault.chain().count(), 2);
    assert_eq!(
        fault.innermost_frame().map(|f| f.declaring_type.as_str()),
        Some("com.acme.Service")
    );
}

#[test]
fn test_header_without_message() {
    let fault = Fault::new("app::Crash");
    assert_eq!(fault.to_string(), "app::Crash");
    assert_eq!(fault.rendered_lines(), vec!["app::Crash"]);
}

#[test]
fn test_from_error_walks_source_chain() {
    let err = QueryFailed {
        source: std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out"),
    };

    let fault = Fault::from_error(&err);
    assert!(fault.type_name.ends_with("QueryFailed"));
    assert_eq!(fault.message.as_deref(), Some("query failed"));

    let cause = fault.cause.as_deref().unwrap();
    assert_eq!(cause.type_name, "Custom");
    assert_eq!(cause.message.as_deref(), Some("socket timed out"));
}

#[test]
fn test_parse_backtrace_text() {
    let text = "\
   0: std::backtrace::Backtrace::force_capture
             at /rustc/abc/library/std/src/backtrace.rs:312:13
   1: billing::invoice::Invoice::total::h0123456789abcdef
             at ./src/invoice.rs:88:17
   2: <billing::Worker as core::ops::FnOnce<()>>::call_once
   3: main
             at ./src/main.rs:5:5";

    let frames = parse_backtrace(text);
    assert_eq!(frames.len(), 4);

    assert_eq!(frames[1].declaring_type, "billing::invoice::Invoice");
    assert_eq!(frames[1].method, "total");
    assert_eq!(frames[1].file.as_deref(), Some("./src/invoice.rs"));
    assert_eq!(frames[1].line, Some(88));

    assert_eq!(
        frames[2].declaring_type,
        "<billing::Worker as core::ops::FnOnce<()>>"
    );
    assert_eq!(frames[2].method, "call_once");
    assert_eq!(frames[2].file, None);

    assert_eq!(frames[3].declaring_type, "");
    assert_eq!(frames[3].method, "main");
}

#[test]
fn test_parse_disabled_backtrace() {
    assert!(parse_backtrace("disabled backtrace").is_empty());
    assert!(parse_backtrace("unsupported backtrace").is_empty());
}

#[test]
fn test_trim_capture_frames_starts_at_caller() {
    let frames = vec![
        StackFrame::new("std::backtrace::Backtrace", "capture"),
        StackFrame::new("honeybadger_core::fault", "capture_frames"),
        StackFrame::new("honeybadger_core::record::ErrorRecord", "from_error"),
        StackFrame::new("", "__rust_begin_short_backtrace"),
        StackFrame::new("storage::disk::Volume", "flush"),
        StackFrame::new("std::rt", "lang_start"),
    ];

    let trimmed = trim_capture_frames(frames, &[]);
    assert_eq!(trimmed.len(), 2);
    assert_eq!(trimmed[0].declaring_type, "storage::disk::Volume");
    assert_eq!(trimmed[1].declaring_type, "std::rt");
}

#[test]
fn test_trim_capture_frames_with_extra_prefixes() {
    let frames = vec![
        StackFrame::new("my_logger::bridge", "on_error"),
        StackFrame::new("storage::disk::Volume", "flush"),
    ];

    let trimmed = trim_capture_frames(frames, &["my_logger"]);
    assert_eq!(trimmed.len(), 1);
    assert_eq!(trimmed[0].method, "flush");
}
