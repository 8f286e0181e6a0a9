use std::path::Path;

pub fn run(file: &Path) -> Result<(), String> {
    let markup = super::read_file(file)?;
    let round = tale_markup::extract_segments(&markup);
    super::print_diagnostics(&markup, file, &round.diagnostics);

    if round.has_errors() {
        return Err("markup has errors".into());
    }

    println!("  All checks passed for '{}'.", file.display());
    println!(
        "  {} segments, {} warnings",
        round.segments.len(),
        round.diagnostics.len()
    );

    Ok(())
}
