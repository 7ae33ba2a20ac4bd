//! Interactive WebSocket line client
//!
//! Connects to a WebSocket endpoint, sends each line typed at the prompt as
//! a text frame, and prints frames received from the remote endpoint.
//!
//! Usage:
//!   wstalk ws://localhost:8080/chat

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use wstalk::bin_common::{cli, prompt::Prompt};
use wsduplex::Client;

#[tokio::main]
async fn main() -> Result<()> {
    // Quiet by default so log lines don't fight the prompt
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = cli::parse_args();
    let endpoint = match cli::parse_endpoint(&args) {
        Ok(endpoint) => endpoint,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let mut client = Client::new(endpoint.as_str());
    let mut inbound = client.take_inbound().context("inbound receiver taken")?;
    let mut errors = client.take_errors().context("error receiver taken")?;

    if let Err(error) = client.start().await {
        bail!("cannot connect to {endpoint}: {error}");
    }

    let prompt = Prompt;
    let outbound = client.outbound();

    // Input: one line read per iteration, forwarded to the send path
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            prompt.show();

            match lines.next_line().await {
                Ok(Some(line)) => {
                    if outbound.send(line).await.is_err() {
                        // Core shut down underneath us
                        return;
                    }
                }
                Ok(None) => {
                    // stdin closed; nothing more to send
                    std::process::exit(0);
                }
                Err(error) => {
                    eprintln!("cannot read standard input: {error}");
                    std::process::exit(1);
                }
            }
        }
    });

    // Main: render incoming frames until the core reports a failure
    let mut failed = false;
    loop {
        tokio::select! {
            message = inbound.recv() => match message {
                Some(message) => {
                    prompt.clear();
                    println!("{}", String::from_utf8_lossy(&message.payload));
                    prompt.show();
                }
                None => break,
            },
            error = errors.recv() => {
                if let Some(error) = error {
                    prompt.clear();
                    eprintln!("error: {error}");
                    failed = true;
                }
                break;
            }
        }
    }

    client.stop().await;
    if failed {
        std::process::exit(1);
    }
    Ok(())
}
