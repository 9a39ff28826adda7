use anyhow::Result;
use futures::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use tokio::net::TcpListener;
use tokio_util::codec::{Decoder, LinesCodec};
use vitals_core::Game;

use crate::message_to_string::message_to_string;

/// Accepts players over TCP, one line of input per command, until the listener fails.
pub async fn start_server(game: Game, address: &str) -> Result<()> {
    let listener = TcpListener::bind(address).await?;
    info!("Listening on: {address}");

    let mut next_connection_id = 0;
    loop {
        let (socket, peer) = listener.accept().await?;

        let connection_id = next_connection_id;
        next_connection_id += 1;

        info!("Connection {connection_id} opened from {peer}");

        let (command_sender, message_receiver) =
            game.add_player(format!("Player {connection_id}"));

        let (mut sink, mut stream) = LinesCodec::new().framed(socket).split::<String>();

        // spawn task for sending messages to player
        tokio::spawn(async move {
            while let Ok(message) = message_receiver.recv_async().await {
                trace!("Got message: {message:?}");
                let rendered_message = message_to_string(message);
                if let Err(e) = sink.send(format!("{rendered_message}\n")).await {
                    warn!("Failed to send message to connection {connection_id}: {e}");
                    break;
                }
            }

            debug!("Message sender for connection {connection_id} has been dropped");
        });

        // spawn task for receiving commands from player
        tokio::spawn(async move {
            // the stream ends once the client disconnects
            while let Some(line) = stream.next().await {
                match line {
                    Ok(input) => {
                        debug!("Raw input: {input:?}");
                        if input.trim() == "quit" {
                            break;
                        }
                        if command_sender.send(input).is_err() {
                            warn!("Command receiver for connection {connection_id} is gone");
                            break;
                        }
                    }
                    Err(err) => warn!("Socket closed with error: {err:?}"),
                }
            }

            // dropping the sender removes the player from the game
            info!("Connection {connection_id} closed");
        });
    }
}
