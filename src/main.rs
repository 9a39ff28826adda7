use anyhow::{Context, Result};
use crossterm::{
    cursor,
    style::Print,
    terminal::{Clear, ClearType},
    QueueableCommand,
};
use log::{debug, info};
use std::{
    env,
    io::{stdin, stdout, Write},
    sync::{
        atomic::{self, AtomicBool},
        Arc,
    },
    thread,
};

use vitals_core::*;

mod message_to_string;
use message_to_string::message_to_string;

mod tcp_server;

mod text_bar;

const PROMPT: &str = "\n> ";
const LOCAL_FLAG: &str = "--local";

fn main() -> Result<()> {
    env_logger::init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let local = args.iter().any(|arg| arg == LOCAL_FLAG);
    let config = match args.iter().find(|arg| !arg.starts_with("--")) {
        Some(path) => VitalsConfig::load(path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => {
            info!("No configuration file provided, using defaults");
            VitalsConfig::default()
        }
    };

    let address = config.server.address.clone();
    let game = Game::new(config);

    if local {
        return run_local(&game);
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(tcp_server::start_server(game, &address))
}

/// Plays as a single player in this terminal.
fn run_local(game: &Game) -> Result<()> {
    let (commands_sender, messages_receiver) = game.add_player("Player".to_string());

    let quitting = Arc::new(AtomicBool::new(false));
    let quitting_for_thread = Arc::clone(&quitting);

    thread::Builder::new()
        .name("message receiver".to_string())
        .spawn(move || loop {
            let message = match messages_receiver.recv() {
                Ok(m) => m,
                Err(_) => {
                    debug!("Message sender has been dropped");
                    if !quitting_for_thread.load(atomic::Ordering::Relaxed) {
                        eprintln!("Disconnected from game");
                    }
                    break;
                }
            };
            debug!("Got message: {message:?}");
            if let Err(e) = render_message(message) {
                eprintln!("Failed to render message: {e}");
                break;
            }
        })?;

    let mut input_buf = String::new();
    loop {
        print!("{PROMPT}");
        stdout().flush()?;
        if stdin().read_line(&mut input_buf)? == 0 {
            // end of input
            return Ok(());
        }
        let input = input_buf.trim();
        debug!("Trimmed input: {input:?}");

        if input == "quit" {
            quitting.store(true, atomic::Ordering::Relaxed);
            println!("ok bye");
            return Ok(());
        }

        commands_sender
            .send(input.to_string())
            .context("command receiver should exist")?;

        input_buf.clear();
    }
}

/// Renders the provided `GameMessage` to the screen.
fn render_message(message: GameMessage) -> Result<()> {
    let output = message_to_string(message);

    stdout()
        .queue(Clear(ClearType::CurrentLine))?
        .queue(cursor::MoveToColumn(0))?
        .queue(Print(output))?
        .queue(Print("\n"))?
        .queue(Print(PROMPT))?
        .flush()?;

    Ok(())
}
