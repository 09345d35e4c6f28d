//! Error message formatting with actionable suggestions.

use std::error::Error;

use kin_core::error::KinError;

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self {
            colors: ColorSupport::disabled(),
        }
    }

    /// Format an error with its suggestion and source chain
    pub fn format_error(&self, error: &KinError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            source = err.source();
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_includes_suggestion() {
        let error = KinError::RootPackageNotFound {
            name: "effect".to_string(),
        };
        let text = ErrorFormatter::plain().format_error(&error);
        assert!(text.starts_with("error: effect is not installed\n"));
        assert!(text.contains("help: Install the root package first"));
    }

    #[test]
    fn test_includes_source_chain() {
        let error = KinError::PackageManager {
            command: "pnpm add".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let text = ErrorFormatter::plain().format_error(&error);
        assert!(text.contains("caused by: no such file"));
    }
}
