use anyhow::Result;
use colloquy_llm::{AnthropicClient, ChatClient, ChatRequest, Message, DEFAULT_MODEL};
use futures::StreamExt;
use std::io::Write;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("ANTHROPIC_API_KEY")?;
    let client = AnthropicClient::new(api_key)?;

    let request = ChatRequest::new(
        DEFAULT_MODEL,
        vec![Message::user("Write a haiku about borrow checking.")],
    );

    // Ctrl-C stops the stream instead of killing the process
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut stream = client.generate_stream(request, cancel).await?;
    let mut printed = 0;

    while let Some(snapshot) = stream.next().await {
        match snapshot {
            Ok(message) => {
                // Snapshots are cumulative, print only the new tail
                print!("{}", message.content.get(printed..).unwrap_or(""));
                std::io::stdout().flush()?;
                printed = message.content.len();
            }
            Err(e) if e.is_abort() => {
                println!("\n[stopped]");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!();
    Ok(())
}
