pub mod check;
pub mod frames;
pub mod parse;
pub mod play;

use std::path::Path;

use tale_markup::{Diagnostic, Severity, render_diagnostics};

/// Read a file, naming it in the error.
fn read_file(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))
}

/// Print diagnostics to stderr using ariadne, followed by a count line.
fn print_diagnostics(source: &str, path: &Path, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    let filename = path.display().to_string();
    let rendered = render_diagnostics(source, &filename, diagnostics);
    eprint!("{rendered}");

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics.len() - errors;

    if errors > 0 {
        eprintln!(
            "  {} error{}, {} warning{}",
            errors,
            plural(errors),
            warnings,
            plural(warnings),
        );
    } else {
        eprintln!("  {} warning{}", warnings, plural(warnings));
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
