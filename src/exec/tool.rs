// src/exec/tool.rs

use std::fmt;

/// An external tool invocation prefix: a program plus the arguments that
/// always precede the per-call ones (`xcrun simctl ...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Fixed arguments followed by `extra`.
    pub fn argv_with(&self, extra: &[String]) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + extra.len());
        argv.extend(self.args.iter().cloned());
        argv.extend(extra.iter().cloned());
        argv
    }

    /// Human-readable command line, used in errors and logs.
    pub fn display_with(&self, extra: &[String]) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.argv_with(extra));
        parts.join(" ")
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with(&[]))
    }
}
