use anyhow::Result;
use monologue::{Actor, Capabilities, DEFAULT_CALL_TIMEOUT};

#[tokio::main]
async fn main() -> Result<()> {
    monologue::logging::setup_global_logging(&tracing::Level::DEBUG)?;

    // Answers every message with its uppercase form; an empty message makes
    // the behavior shut the actor down.
    let actor = Actor::spawn(|caps: Capabilities<String>, message: String| async move {
        if message.is_empty() {
            caps.close();
        } else {
            caps.emit(message.to_uppercase());
        }
    });

    // Watch every reply the actor emits, independent of any call.
    let mut audience = actor.subscribe().await;

    let reply = actor
        .call(&"hi there".to_string(), DEFAULT_CALL_TIMEOUT)
        .await?;
    println!("call replied: {reply}");
    println!("audience saw: {:?}", audience.recv().await);

    actor.send(&String::new()).await?;
    if audience.recv().await.is_none() {
        println!("actor closed, subscription ended");
    }

    match actor.send(&"anyone home?".to_string()).await {
        Ok(()) => println!("delivered"),
        Err(error) => println!("rejected: {error}"),
    }

    Ok(())
}
