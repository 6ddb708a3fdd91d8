//! Chat commands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use rust_i18n::t;

use crate::config::connect_chat;
use crate::handlers::chat as handlers;
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Subcommand)]
pub enum ChatAction {
    /// List conversations, most recent first
    #[command(alias = "ls")]
    List,

    /// View messages in a conversation
    Read {
        /// Conversation (group) ID
        group: String,
    },

    /// Send a message
    Send {
        /// Item the message is about (defaults to the conversation's item)
        #[arg(short, long)]
        item: Option<String>,
        /// Recipient user ID (defaults to the other side of the conversation)
        #[arg(short, long)]
        to: Option<String>,
        /// Conversation (group) ID
        #[arg(short, long)]
        group: Option<String>,
        /// Message content
        content: String,
    },

    /// Show the number of unread messages
    Unread,

    /// Mark a conversation as read
    MarkRead {
        /// Conversation (group) ID
        group: String,
    },
}

pub async fn handle(
    action: ChatAction,
    format: OutputFormat,
    base_url: Option<&str>,
) -> Result<()> {
    match action {
        ChatAction::List => list_conversations(format, base_url).await,
        ChatAction::Read { group } => read_conversation(&group, format, base_url).await,
        ChatAction::Send {
            item,
            to,
            group,
            content,
        } => {
            let params = handlers::SendParams {
                item,
                to,
                group,
                content,
            };
            send_message(params, format, base_url).await
        }
        ChatAction::Unread => unread_count(format, base_url).await,
        ChatAction::MarkRead { group } => mark_read(&group, base_url).await,
    }
}

async fn list_conversations(format: OutputFormat, base_url: Option<&str>) -> Result<()> {
    let session = connect_chat(base_url).await?;
    let conversations = handlers::list_conversations(&session)?;

    if matches!(format, OutputFormat::Plain) {
        println!("{}\n", t!("conversations", count = conversations.len()));
    }

    print_table(conversations, format);
    Ok(())
}

async fn read_conversation(
    group: &str,
    format: OutputFormat,
    base_url: Option<&str>,
) -> Result<()> {
    let session = connect_chat(base_url).await?;
    let result = handlers::read_conversation(&session, group)?;

    if matches!(format, OutputFormat::Plain) {
        println!(
            "{}\n",
            t!(
                "conversation_with",
                user = result.with.green(),
                item = result.item_name.bold()
            )
        );
    }

    print_table(result.messages, format);
    Ok(())
}

async fn send_message(
    params: handlers::SendParams,
    format: OutputFormat,
    base_url: Option<&str>,
) -> Result<()> {
    let session = connect_chat(base_url).await?;
    let result = handlers::send_message(&session, params).await?;

    match format {
        OutputFormat::Json => print_json(&result),
        _ => println!("{}", t!("message_sent_to", user = result.to.cyan())),
    }
    Ok(())
}

async fn unread_count(format: OutputFormat, base_url: Option<&str>) -> Result<()> {
    let session = connect_chat(base_url).await?;
    let result = handlers::unread_count(&session);

    match format {
        OutputFormat::Json => print_json(&result),
        _ => println!("{}", t!("unread_messages", count = result.unread)),
    }
    Ok(())
}

async fn mark_read(group: &str, base_url: Option<&str>) -> Result<()> {
    let session = connect_chat(base_url).await?;
    handlers::mark_read(&session, group).await?;

    println!("{}", t!("marked_read", id = group));
    Ok(())
}
