use anyhow::Result;
use colored::Colorize;

use peak_application::PeakClient;

pub async fn list(client: &PeakClient, page: u32, page_size: u32) -> Result<()> {
    let listing = client.conversations().list(page, page_size).await?;

    if listing.conversations.is_empty() {
        println!("{}", "No conversations yet.".bright_black());
        return Ok(());
    }

    for conversation in &listing.conversations {
        let title = conversation.title.as_deref().unwrap_or("(untitled)");
        println!(
            "{}  {}  {}",
            conversation.conversation_id.bright_cyan(),
            title.bold(),
            format!("{} messages, updated {}", conversation.message_count, conversation.updated_at)
                .bright_black()
        );
        if let Some(last) = &conversation.last_message {
            println!("    {}", last.bright_black());
        }
    }

    let shown_until =
        listing.page.saturating_sub(1) * listing.page_size + listing.conversations.len() as u32;
    println!(
        "{}",
        format!("Page {} ({} of {})", listing.page, shown_until, listing.total).bright_black()
    );
    Ok(())
}

pub async fn delete(client: &PeakClient, conversation_id: &str) -> Result<()> {
    client.conversations().delete(conversation_id).await?;
    println!("{}", format!("Deleted {}", conversation_id).bright_green());
    Ok(())
}
