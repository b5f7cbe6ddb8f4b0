//! Interactive terminal game loop.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, instrument, warn};

use crate::api::JoinResponse;
use crate::client::GameClient;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Plays games against the server at `server_url` until the user declines.
#[instrument]
pub async fn play_games(server_url: String) -> Result<()> {
    let client = GameClient::new(server_url);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    println!("Welcome to Codemaster!");

    loop {
        println!("Start a new game? (yes/no)");
        let Some(answer) = input.next_line().await? else {
            break;
        };
        if !matches!(answer.trim().to_lowercase().as_str(), "yes" | "y") {
            break;
        }

        let joined = match client.join().await {
            Ok(joined) => joined,
            Err(e) => {
                println!("Could not join a game: {e:#}");
                continue;
            }
        };

        println!("Player {}. Game {}.", joined.player_id, joined.game_id);
        println!(
            "{}. You have {} attempts and {}s to crack a {}-symbol code.",
            joined.message, joined.attempts, joined.time_limit_secs, joined.code_length
        );

        wait_for_start(&client, &joined).await?;
        play_round(&client, &joined, &mut input).await?;
    }

    info!("Player left");
    Ok(())
}

async fn wait_for_start(client: &GameClient, joined: &JoinResponse) -> Result<()> {
    let mut stdout = std::io::stdout();
    loop {
        let status = client.status(joined.game_id).await?;
        print!("\r{:<60}", status.message);
        stdout.flush()?;
        if status.is_begin {
            println!();
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn play_round(
    client: &GameClient,
    joined: &JoinResponse,
    input: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    loop {
        println!("Enter a guess ({} symbols, A-Z and 0-9)", joined.code_length);
        let Some(line) = input.next_line().await? else {
            return Ok(());
        };
        let guess = line.trim().to_uppercase();

        let response = match client.guess(joined.game_id, joined.player_id, &guess).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Guess request failed");
                println!("Error: {e:#}");
                continue;
            }
        };

        println!("{}", response.message);
        if response.is_end == Some(true) {
            return Ok(());
        }

        if let (Some(attempt), Some(max), Some(black), Some(white)) = (
            response.attempt,
            response.max_attempts,
            response.black,
            response.white,
        ) {
            println!("Attempt {}/{}", attempt, max);
            if let Some(secs) = response.time_left_secs {
                println!("Time left: {}s", secs);
            }
            println!("Black: {}, White: {}", black, white);
        }
    }
}
