use std::path::Path;

use tale_core::{Choice, ContentFrame, encode_frame};
use tale_stream::{Delivery, Transport, TransportConfig};

pub fn run(file: &Path, fast: bool, seed: u64, choices: &[String]) -> Result<(), String> {
    let markup = super::read_file(file)?;
    let choices = choices
        .iter()
        .map(String::as_str)
        .map(parse_choice)
        .collect::<Result<Vec<_>, _>>()?;

    let delivery = if fast { Delivery::Fast } else { Delivery::Chunked };
    let config = TransportConfig::default()
        .with_seed(seed)
        .with_delivery(delivery);
    let mut transport = Transport::new(config).map_err(|e| e.to_string())?;

    let frames = transport
        .split_markup(&markup)
        .into_iter()
        .map(ContentFrame::content)
        .chain(std::iter::once(ContentFrame::complete(choices)));
    for frame in frames {
        println!("{}", encode_frame(&frame).map_err(|e| e.to_string())?);
    }

    Ok(())
}

fn parse_choice(raw: &str) -> Result<Choice, String> {
    match raw.split_once('=') {
        Some((id, text)) if !id.trim().is_empty() => Ok(Choice::new(id.trim(), text.trim())),
        _ => Err(format!("invalid choice \"{raw}\": expected ID=TEXT")),
    }
}
