// src/ui/renderer.rs

use std::fmt::Arguments;
use std::io::Write;
use std::sync::{Arc, Mutex};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// User-facing status output on stderr.
///
/// All writes go through one lock so that lines printed from concurrent
/// tasks (build event relay, verbose command echo, log relay banners) never
/// interleave mid-line. Cloning shares the lock.
#[derive(Debug, Clone)]
pub struct Renderer {
    lock: Arc<Mutex<()>>,
    quiet: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            quiet: false,
        }
    }

    /// A renderer that discards everything (tests, JSON output modes).
    pub fn quiet() -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            quiet: true,
        }
    }

    pub fn success(&self, args: Arguments<'_>) {
        self.line(&format!("{GREEN}✓{RESET} {args}"));
    }

    pub fn error(&self, args: Arguments<'_>) {
        self.line(&format!("{RED}✗{RESET} {args}"));
    }

    pub fn warning(&self, args: Arguments<'_>) {
        self.line(&format!("{YELLOW}!{RESET} {args}"));
    }

    pub fn info(&self, args: Arguments<'_>) {
        self.line(&format!("  {args}"));
    }

    pub fn dim(&self, args: Arguments<'_>) {
        self.line(&format!("  {DIM}{args}{RESET}"));
    }

    pub fn heading(&self, args: Arguments<'_>) {
        self.line(&format!("\n{BOLD}{args}{RESET}"));
    }

    /// Echo of an external command, printed in verbose mode.
    pub fn command(&self, program: &str, args: &[String]) {
        self.line(&format!("  $ {program} {}", args.join(" ")));
    }

    fn line(&self, text: &str) {
        if self.quiet {
            return;
        }
        // A poisoned lock only means another writer panicked mid-line.
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{text}");
    }
}
