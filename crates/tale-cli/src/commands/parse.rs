use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use tale_core::Segment;

pub fn run(file: &Path, wire: bool, json: bool) -> Result<(), String> {
    let source = super::read_file(file)?;
    let markup = if wire {
        let round = tale_stream::read_wire(&source).map_err(|e| e.to_string())?;
        tracing::debug!(frames = round.frames, choices = round.choices.len(), "wire transcript read");
        round.markup
    } else {
        source
    };

    let round = tale_markup::extract_segments(&markup);
    super::print_diagnostics(&markup, file, &round.diagnostics);

    if json {
        let out = serde_json::to_string_pretty(&round.segments)
            .map_err(|e| format!("JSON serialization failed: {e}"))?;
        println!("{out}");
        return Ok(());
    }

    if round.segments.is_empty() {
        println!("  No segments found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Speaker", "Expression", "Action", "Text"]);

    for (i, segment) in round.segments.iter().enumerate() {
        let row = match segment {
            Segment::Narration { text } => {
                vec![(i + 1).to_string(), "narrator".into(), "—".into(), "—".into(), text.clone()]
            }
            Segment::Character(line) => vec![
                (i + 1).to_string(),
                line.name.clone(),
                line.expression.clone(),
                line.action.clone().unwrap_or_else(|| "—".into()),
                line.text.clone(),
            ],
        };
        table.add_row(row);
    }

    println!("{table}");
    println!();
    println!("  {} segments", round.segments.len());

    Ok(())
}
