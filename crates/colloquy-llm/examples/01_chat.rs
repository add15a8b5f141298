use anyhow::Result;
use colloquy_llm::{AnthropicClient, ChatClient, ChatRequest, Message, DEFAULT_MODEL};

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("ANTHROPIC_API_KEY")?;
    let client = AnthropicClient::new(api_key)?;

    let request = ChatRequest::new(
        DEFAULT_MODEL,
        vec![Message::user("What is the capital of France?")],
    );

    let response = client.generate(request).await?;

    println!("Response ({}): {}", response.id, response.content);

    Ok(())
}
