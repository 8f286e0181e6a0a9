use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use tale_core::{Choice, MemoryHistory, Segment};
use tale_playback::{EngineConfig, PlaybackState, RenderSink, StoryEngine};
use tale_stream::{Delivery, ScriptedGenerator};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Prints the story to stdout as it is revealed.
#[derive(Default)]
struct Terminal {
    shown: usize,
}

impl RenderSink for Terminal {
    fn on_segment_active(&mut self, segment: &Segment) {
        self.shown = 0;
        match segment {
            Segment::Narration { .. } => print!("  "),
            Segment::Character(line) => {
                print!("  {} ({}) ", line.name.bold(), line.expression.dimmed());
                if let Some(action) = &line.action {
                    print!("{} ", format!("*{action}*").italic());
                }
            }
        }
        let _ = io::stdout().flush();
    }

    fn on_reveal(&mut self, segment: &Segment, visible: &str) {
        let fresh: String = visible.chars().skip(self.shown).collect();
        self.shown = visible.chars().count();
        print!("{fresh}");
        if self.shown == segment.char_len() {
            println!();
        }
        let _ = io::stdout().flush();
    }

    fn on_choices(&mut self, choices: &[Choice]) {
        println!();
        for (i, choice) in choices.iter().enumerate() {
            println!("  {} {}", format!("[{}]", i + 1).cyan(), choice.text);
        }
    }

    fn on_round_complete(&mut self) {}
}

type Engine = StoryEngine<MemoryHistory, Terminal>;
type Input = Lines<BufReader<Stdin>>;

pub fn run(
    script: &Path,
    config: Option<&Path>,
    fast: bool,
    opening: &str,
    transcript: Option<&Path>,
) -> Result<(), String> {
    let source = super::read_file(script)?;
    let generator = ScriptedGenerator::from_toml(&source).map_err(|e| e.to_string())?;

    let mut config = match config {
        Some(path) => EngineConfig::from_toml(&super::read_file(path)?)
            .map_err(|e| format!("{}: {e}", path.display()))?,
        None => EngineConfig::default(),
    };
    if fast {
        config.transport = config.transport.with_delivery(Delivery::Fast);
    }

    let history = MemoryHistory::new();
    let mut engine = StoryEngine::new(config, Arc::new(generator), history, Terminal::default())
        .map_err(|e| format!("failed to start session: {e}"))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| e.to_string())?;
    runtime.block_on(session(&mut engine, fast, opening))?;

    if let Some(path) = transcript {
        let json = serde_json::to_string_pretty(engine.history())
            .map_err(|e| format!("JSON serialization failed: {e}"))?;
        std::fs::write(path, json)
            .map_err(|e| format!("cannot write to {}: {e}", path.display()))?;
        println!("  History written to {}", path.display());
    }

    Ok(())
}

async fn session(engine: &mut Engine, fast: bool, opening: &str) -> Result<(), String> {
    println!(
        "  {} Enter continues or skips, a number chooses, 'quit' exits.\n",
        "tale".bold()
    );
    engine.say(opening).map_err(|e| e.to_string())?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if engine.has_request()
            && let Err(e) = engine.fetch().await
        {
            println!("  {}\n", e.to_string().yellow());
        }

        if let PlaybackState::Revealing { .. } = engine.state()
            && reveal(engine, fast, &mut input).await?
        {
            break;
        }

        match engine.state() {
            PlaybackState::Complete => println!("\n  {}", "The End.".bold()),
            PlaybackState::Idle => print!("  what now? "),
            _ => {}
        }
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        let Some(line) = input.next_line().await.map_err(|e| e.to_string())? else {
            break;
        };
        let line = line.trim();
        if is_quit(line) {
            break;
        }
        if let Err(e) = respond(engine, line) {
            println!("  {}\n", e.yellow());
        }
    }

    Ok(())
}

fn is_quit(line: &str) -> bool {
    line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("q")
}

/// Reveal the active segment character by character. A line typed meanwhile
/// skips to the full text. Returns `true` when the player asked to quit.
async fn reveal(engine: &mut Engine, fast: bool, input: &mut Input) -> Result<bool, String> {
    if fast {
        let _ = engine.skip();
        return Ok(false);
    }
    let interval = engine.sequencer().config().reveal_interval();
    while let PlaybackState::Revealing { .. } = engine.state() {
        tokio::select! {
            () = tokio::time::sleep(interval) => engine.tick(),
            line = input.next_line() => {
                let _ = engine.skip();
                return match line.map_err(|e| e.to_string())? {
                    Some(line) => Ok(is_quit(line.trim())),
                    None => Ok(true),
                };
            }
        }
    }
    Ok(false)
}

fn respond(engine: &mut Engine, input: &str) -> Result<(), String> {
    match engine.state() {
        PlaybackState::Revealed { .. } if input.is_empty() => {
            engine.advance().map_err(|e| e.to_string())
        }
        PlaybackState::Revealed { .. } => Err("press Enter to continue".into()),
        PlaybackState::AwaitingChoice => match input.parse::<usize>() {
            Ok(n) => {
                let id = engine
                    .sequencer()
                    .choices()
                    .get(n.saturating_sub(1))
                    .filter(|_| n > 0)
                    .map(|c| c.id.clone())
                    .ok_or_else(|| format!("no choice {n}"))?;
                engine.choose(&id).map_err(|e| e.to_string())?;
                if !engine.has_request() {
                    println!("\n  {}", "Session ended.".bold());
                }
                Ok(())
            }
            Err(_) if input.is_empty() => Err("pick a choice or type something".into()),
            Err(_) => engine.say(input).map_err(|e| e.to_string()),
        },
        _ if input.is_empty() => Ok(()),
        _ => engine.say(input).map_err(|e| e.to_string()),
    }
}
