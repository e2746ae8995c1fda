// src/build/parser.rs

//! Line classifier for the build driver's textual output.
//!
//! Recognizers are tried in a fixed order and the first match wins. Lines
//! matching nothing are dropped: the parser extracts signal, it does not
//! keep a transcript.

use std::sync::LazyLock;

use regex::Regex;

use crate::build::{BuildEvent, BuildResult, Diagnostic};

struct Recognizers {
    compile: Regex,
    diagnostic: Regex,
    link: Regex,
    sign: Regex,
    success: Regex,
    failure: Regex,
}

static RECOGNIZERS: LazyLock<Recognizers> = LazyLock::new(|| Recognizers {
    compile: Regex::new(r"^CompileSwift\s+\w+\s+\w+\s+(.+?)(?:\s+\(in target .*\))?$")
        .expect("compile pattern is valid"),
    diagnostic: Regex::new(r"^(.+):(\d+):(\d+):\s+(warning|error):\s+(.+)$")
        .expect("diagnostic pattern is valid"),
    link: Regex::new(r"^Linking\s+(.+)$").expect("link pattern is valid"),
    sign: Regex::new(r"^CodeSign\s+(.+)$").expect("sign pattern is valid"),
    success: Regex::new(r"\*\* BUILD SUCCEEDED \*\*").expect("success pattern is valid"),
    failure: Regex::new(r"\*\* BUILD FAILED \*\*").expect("failure pattern is valid"),
});

/// Stateful parser for one build invocation.
///
/// Diagnostics are both returned as events and appended to the
/// accumulated [`BuildResult`]; the two always agree.
#[derive(Debug, Default)]
pub struct OutputParser {
    result: BuildResult,
}

impl OutputParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one line, updating the accumulated result.
    pub fn parse_line(&mut self, line: &str) -> Option<BuildEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let re = &*RECOGNIZERS;

        if let Some(caps) = re.compile.captures(line) {
            return Some(BuildEvent::CompileFile {
                path: caps[1].to_string(),
            });
        }

        if let Some(caps) = re.diagnostic.captures(line) {
            let diagnostic = Diagnostic {
                file: caps[1].to_string(),
                line: caps[2].parse().unwrap_or(0),
                column: caps[3].parse().unwrap_or(0),
                message: caps[5].to_string(),
            };
            return Some(if &caps[4] == "error" {
                self.result.errors.push(diagnostic.clone());
                BuildEvent::Error(diagnostic)
            } else {
                self.result.warnings.push(diagnostic.clone());
                BuildEvent::Warning(diagnostic)
            });
        }

        if let Some(caps) = re.link.captures(line) {
            return Some(BuildEvent::Link {
                target: caps[1].to_string(),
            });
        }

        if let Some(caps) = re.sign.captures(line) {
            return Some(BuildEvent::Sign {
                target: caps[1].to_string(),
            });
        }

        if re.success.is_match(line) {
            self.result.succeeded = true;
            return Some(BuildEvent::Success);
        }

        if re.failure.is_match(line) {
            self.result.succeeded = false;
            return Some(BuildEvent::Failure);
        }

        None
    }

    pub fn result(&self) -> &BuildResult {
        &self.result
    }

    pub fn into_result(self) -> BuildResult {
        self.result
    }
}
