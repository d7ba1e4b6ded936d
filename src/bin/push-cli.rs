use clap::{Parser, Subcommand};
use serde_json::Value;
use std::time::Duration;

use push_router::PushClient;

#[derive(Parser)]
#[command(name = "push-cli")]
#[command(about = "Client for the push-router event hub", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open an event stream, join channels and print every event received
    Listen {
        /// Client id to connect as; a random UUID when omitted
        #[arg(long)]
        client_id: Option<String>,
        /// Channel to join once connected (repeatable)
        #[arg(short, long = "channel")]
        channels: Vec<String>,
        /// Reconnect with the same client id when the stream ends or fails
        #[arg(long)]
        reconnect: bool,
        /// Delay before each reconnect attempt, in milliseconds
        #[arg(long, default_value_t = 1000)]
        retry_delay_ms: u64,
    },
    /// Join a channel on behalf of a connected client
    Subscribe { client_id: String, channel: String },
    /// Leave a channel on behalf of a connected client
    Unsubscribe { client_id: String, channel: String },
    /// Emit a JSON payload on a channel
    Emit { channel: String, payload: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Listen {
            client_id,
            channels,
            reconnect,
            retry_delay_ms,
        } => {
            let client_id = client_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let push = PushClient::new(base, client_id).with_channels(channels);
            let retry_delay = reconnect.then(|| Duration::from_millis(retry_delay_ms));
            listen(&push, retry_delay).await?;
        }
        Commands::Subscribe { client_id, channel } => {
            let res = client
                .post(format!("{base}/__sse/{client_id}/channel/{channel}"))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Unsubscribe { client_id, channel } => {
            let res = client
                .delete(format!("{base}/__sse/{client_id}/channel/{channel}"))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Emit { channel, payload } => {
            let payload: Value = serde_json::from_str(&payload)?;
            let res = client
                .post(format!("{base}/channels/{channel}/events"))
                .json(&payload)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn listen(
    push: &PushClient,
    retry_delay: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        match stream_events(push).await {
            Ok(()) => eprintln!("Stream closed by server"),
            Err(err) if retry_delay.is_some() => eprintln!("Stream failed: {err}"),
            Err(err) => return Err(err.into()),
        }

        let Some(delay) = retry_delay else {
            return Ok(());
        };
        tokio::time::sleep(delay).await;
        eprintln!("Reconnecting as {}", push.client_id());
    }
}

async fn stream_events(push: &PushClient) -> Result<(), push_router::client::ClientError> {
    let mut events = push.connect().await?;
    eprintln!("Connected as {}", push.client_id());
    for channel in push.channels() {
        eprintln!("Subscribed to {channel}");
    }

    while let Some(event) = events.next_event().await? {
        let channel = event.event.as_deref().unwrap_or("message");
        println!("[{channel}] {}", event.json());
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {status}");
        if !text.is_empty() {
            eprintln!("Response: {text}");
        }
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if text.is_empty() => println!("{status}"),
        Err(_) => println!("{text}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_reconnect_flags_parse() {
        let cli = Cli::parse_from([
            "push-cli",
            "listen",
            "--client-id",
            "dash",
            "-c",
            "scores",
            "--channel",
            "news",
            "--reconnect",
            "--retry-delay-ms",
            "250",
        ]);

        match cli.command {
            Commands::Listen {
                client_id,
                channels,
                reconnect,
                retry_delay_ms,
            } => {
                assert_eq!(client_id.as_deref(), Some("dash"));
                assert_eq!(channels, vec!["scores", "news"]);
                assert!(reconnect);
                assert_eq!(retry_delay_ms, 250);
            }
            _ => panic!("expected listen"),
        }
    }

    #[test]
    fn listen_does_not_reconnect_by_default() {
        let cli = Cli::parse_from(["push-cli", "listen"]);
        assert!(matches!(
            cli.command,
            Commands::Listen { reconnect: false, retry_delay_ms: 1000, .. }
        ));
    }
}
