//! Terminal output formatting.
//!
//! Everything the user is meant to read goes through [`OutputHandler`];
//! tracing is reserved for diagnostics.

pub mod colors;
pub mod errors;

use std::sync::Mutex;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: colors::ColorSupport,
    captured: Option<Mutex<Vec<String>>>,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new() -> Self {
        Self {
            colors: colors::ColorSupport::detect(),
            captured: None,
        }
    }

    /// Handler that records plain lines instead of printing them
    #[cfg(test)]
    pub fn capturing() -> Self {
        Self {
            colors: colors::ColorSupport::disabled(),
            captured: Some(Mutex::new(Vec::new())),
        }
    }

    /// Lines recorded by a capturing handler
    #[cfg(test)]
    pub fn lines(&self) -> Vec<String> {
        self.captured
            .as_ref()
            .and_then(|lines| lines.lock().ok().map(|lines| lines.clone()))
            .unwrap_or_default()
    }

    fn emit(&self, line: String, to_stderr: bool) {
        match &self.captured {
            Some(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line);
                }
            },
            None if to_stderr => eprintln!("{}", line),
            None => println!("{}", line),
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        self.emit(self.colors.dim(message), false);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        self.emit(format!("{} {}", self.colors.green("✓"), message), false);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        self.emit(format!("{} {}", self.colors.yellow("⚠"), message), false);
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        self.emit(format!("{} {}", self.colors.red("✗"), message), true);
    }

    /// Print a step message
    pub fn step(&self, message: &str) {
        self.emit(format!("{} {}", self.colors.green("›"), message), false);
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
