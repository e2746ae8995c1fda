// tests/build_parser.rs

use proptest::prelude::*;
use simrun::build::{BuildEvent, Diagnostic, OutputParser};

fn parse_all(lines: &[&str]) -> (Vec<BuildEvent>, OutputParser) {
    let mut parser = OutputParser::new();
    let events = lines.iter().filter_map(|l| parser.parse_line(l)).collect();
    (events, parser)
}

#[test]
fn test_failed_build_scenario() {
    let (events, parser) = parse_all(&[
        "CompileSwift normal arm64 /src/App/Foo.swift (in target 'App' from project 'App')",
        "Foo.swift:10:3: error: missing return",
        "** BUILD FAILED **",
    ]);

    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        BuildEvent::CompileFile {
            path: "/src/App/Foo.swift".to_string()
        }
    );
    assert!(matches!(events[1], BuildEvent::Error(_)));
    assert_eq!(events[2], BuildEvent::Failure);

    let result = parser.into_result();
    assert!(!result.succeeded);
    assert_eq!(
        result.errors,
        vec![Diagnostic {
            file: "Foo.swift".to_string(),
            line: 10,
            column: 3,
            message: "missing return".to_string(),
        }]
    );
    assert!(result.warnings.is_empty());
}

#[test]
fn test_successful_build_with_warning() {
    let (events, parser) = parse_all(&[
        "CompileSwift normal arm64 /src/A.swift",
        "/src/A.swift:4:9: warning: variable 'x' was never used",
        "Linking /build/App.app/App",
        "CodeSign /build/App.app",
        "** BUILD SUCCEEDED **",
    ]);

    assert_eq!(
        events,
        vec![
            BuildEvent::CompileFile {
                path: "/src/A.swift".to_string()
            },
            BuildEvent::Warning(Diagnostic {
                file: "/src/A.swift".to_string(),
                line: 4,
                column: 9,
                message: "variable 'x' was never used".to_string(),
            }),
            BuildEvent::Link {
                target: "/build/App.app/App".to_string()
            },
            BuildEvent::Sign {
                target: "/build/App.app".to_string()
            },
            BuildEvent::Success,
        ]
    );

    let result = parser.result();
    assert!(result.succeeded);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.errors.is_empty());
}

#[test]
fn test_blank_and_unknown_lines_are_dropped() {
    let mut parser = OutputParser::new();
    assert_eq!(parser.parse_line(""), None);
    assert_eq!(parser.parse_line("   "), None);
    assert_eq!(parser.parse_line("note: Using new build system"), None);
    assert_eq!(parser.parse_line("Build settings from command line:"), None);
    assert_eq!(parser.result(), &Default::default());
}

#[test]
fn test_failure_after_success_wins() {
    let (_, parser) = parse_all(&["** BUILD SUCCEEDED **", "** BUILD FAILED **"]);
    assert!(!parser.result().succeeded);

    let (_, parser) = parse_all(&["** BUILD FAILED **", "** BUILD SUCCEEDED **"]);
    assert!(parser.result().succeeded);
}

#[test]
fn test_surrounding_whitespace_is_ignored() {
    let (events, _) = parse_all(&["   /x/B.swift:1:2: error: boom   "]);
    assert_eq!(
        events,
        vec![BuildEvent::Error(Diagnostic {
            file: "/x/B.swift".to_string(),
            line: 1,
            column: 2,
            message: "boom".to_string(),
        })]
    );
}

#[derive(Debug, Clone)]
enum Line {
    Compile(u8),
    Warning(u8, u32),
    Error(u8, u32),
    Link,
    Success,
    Failure,
    Noise(String),
}

impl Line {
    fn render(&self) -> String {
        match self {
            Line::Compile(n) => format!("CompileSwift normal arm64 /src/F{n}.swift"),
            Line::Warning(n, l) => format!("/src/F{n}.swift:{l}:1: warning: w{n}"),
            Line::Error(n, l) => format!("/src/F{n}.swift:{l}:2: error: e{n}"),
            Line::Link => "Linking /build/App".to_string(),
            Line::Success => "** BUILD SUCCEEDED **".to_string(),
            Line::Failure => "** BUILD FAILED **".to_string(),
            Line::Noise(s) => format!("note: {s}"),
        }
    }
}

fn line_strategy() -> impl Strategy<Value = Line> {
    prop_oneof![
        any::<u8>().prop_map(Line::Compile),
        (any::<u8>(), 1..5000u32).prop_map(|(n, l)| Line::Warning(n, l)),
        (any::<u8>(), 1..5000u32).prop_map(|(n, l)| Line::Error(n, l)),
        Just(Line::Link),
        Just(Line::Success),
        Just(Line::Failure),
        "[a-z ]{0,20}".prop_map(Line::Noise),
    ]
}

proptest! {
    #[test]
    fn test_events_follow_input_order_and_match_result(lines in proptest::collection::vec(line_strategy(), 0..40)) {
        let mut parser = OutputParser::new();
        let mut events = Vec::new();
        for line in &lines {
            if let Some(ev) = parser.parse_line(&line.render()) {
                events.push(ev);
            }
        }

        // Noise produces nothing; everything else produces exactly one event.
        let expected = lines.iter().filter(|l| !matches!(l, Line::Noise(_))).count();
        prop_assert_eq!(events.len(), expected);

        let error_events: Vec<Diagnostic> = events
            .iter()
            .filter_map(|e| match e {
                BuildEvent::Error(d) => Some(d.clone()),
                _ => None,
            })
            .collect();
        let warning_events: Vec<Diagnostic> = events
            .iter()
            .filter_map(|e| match e {
                BuildEvent::Warning(d) => Some(d.clone()),
                _ => None,
            })
            .collect();

        let result = parser.into_result();
        prop_assert_eq!(&result.errors, &error_events);
        prop_assert_eq!(&result.warnings, &warning_events);

        let last_sentinel = lines
            .iter()
            .rev()
            .find(|l| matches!(l, Line::Success | Line::Failure));
        prop_assert_eq!(result.succeeded, matches!(last_sentinel, Some(Line::Success)));
    }
}
