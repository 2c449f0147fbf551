//! Long-running subscriptions: `listen` and interactive `chat`

use std::time::{Duration, Instant};

use anyhow::bail;
use clippy_core::{
    ClearScope, Conversation, Message, Reconciler, StreamMessage, TypingAction, TypingPolicy,
};
use colored::Colorize;
use eventsource_client::SSE;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::{parse_event, RelayClient};
use crate::render;

/// What one item of the SSE stream amounts to
enum Incoming {
    Event(StreamMessage),
    Lost,
    Skip,
}

fn decode(event: Result<SSE, eventsource_client::Error>, client: &RelayClient) -> Incoming {
    match event {
        Ok(SSE::Event(event)) => match parse_event(&event.data) {
            Some(message) => Incoming::Event(message),
            None => {
                if client.debug() {
                    eprintln!(
                        "{}",
                        format!("[DEBUG] Failed to parse event: {}", event.data).dimmed()
                    );
                }
                Incoming::Skip
            }
        },
        Ok(SSE::Comment(comment)) => {
            if client.debug() {
                eprintln!("{}", format!("[DEBUG] SSE Comment: {}", comment).dimmed());
            }
            Incoming::Skip
        }
        #[allow(unreachable_patterns)]
        Ok(_) => Incoming::Skip,
        Err(e) => {
            if client.debug() {
                eprintln!("{}", format!("[DEBUG] SSE Error: {:?}", e).dimmed());
            }
            Incoming::Lost
        }
    }
}

fn report_lost(reconciler: &mut Reconciler, client: &RelayClient) {
    reconciler.mark_disconnected();
    println!();
    println!("{}", reconciler.status().to_string().red());
    println!(
        "{}",
        format!("Is clippy-server running at {}?", client.server_url()).dimmed()
    );
}

/// Print everything the browser side sends until Ctrl-C
pub async fn listen(client: &RelayClient) -> anyhow::Result<()> {
    println!("{}", format!("👂 Listening on {}", client.stream_url()).cyan());
    println!("{}", "Press Ctrl-C to stop".dimmed());

    let mut reconciler = Reconciler::new();
    reconciler.mark_connecting();
    println!("{}", reconciler.status().to_string().dimmed());

    let mut connected_once = false;
    let events = client.events()?;
    tokio::pin!(events);

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                match decode(event, client) {
                    Incoming::Event(message) => {
                        connected_once = true;
                        let transition = reconciler.apply(message);
                        render::show_transition(&reconciler, transition)?;
                    }
                    Incoming::Lost => report_lost(&mut reconciler, client),
                    Incoming::Skip => {}
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if !connected_once {
        bail!("Cannot reach relay at {}", client.server_url());
    }

    println!();
    println!("{}", "👋 Stopped listening".cyan());
    Ok(())
}

/// A line typed into `chat`
#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    Empty,
    Quit,
    Help,
    /// Reprint the merged conversation
    History,
    /// Forget the local conversation
    Reset,
    /// Announce typing without sending content
    Typing(String),
    Clear(ClearScope),
    Send(String),
    Invalid(String),
}

pub fn parse_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return ChatInput::Quit;
    }

    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Send(line.to_string());
    };
    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "exit" => ChatInput::Quit,
        "help" => ChatInput::Help,
        "history" => ChatInput::History,
        "reset" => ChatInput::Reset,
        "typing" => ChatInput::Typing(rest.to_string()),
        "clear" if rest.is_empty() => ChatInput::Clear(ClearScope::All),
        "clear" => match rest.parse() {
            Ok(scope) => ChatInput::Clear(scope),
            Err(e) => ChatInput::Invalid(e),
        },
        _ => ChatInput::Invalid(format!("Unknown command: /{}", name)),
    }
}

fn print_help() {
    println!("{}", "Commands:".cyan());
    println!("  {}  publish a message", "<text>".bold());
    println!("  {}  show that you are typing", "/typing <text>".bold());
    println!("  {}  clear the browser history (all|typing|session)", "/clear [scope]".bold());
    println!("  {}  show the conversation so far", "/history".bold());
    println!("  {}  forget the local conversation", "/reset".bold());
    println!("  {}  leave", "/quit".bold());
}

/// Retraction still owed once a send finished
///
/// A delivered message replaces the typing row on the receiver. When the send
/// failed the row is still there and has to be cleared explicitly.
fn retraction_after_send(
    submitted: Option<TypingAction>,
    delivered: bool,
) -> Option<TypingAction> {
    submitted.filter(|_| !delivered)
}

async fn idle_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

async fn publish_quietly(client: &RelayClient, message: Message) {
    if let Err(e) = client.publish(&message).await {
        println!("{}", format!("❌ Error: {}", e).red());
    }
}

/// Interactive session: stdin lines go to the browser, browser messages are printed
pub async fn chat(
    client: &RelayClient,
    session_id: Option<String>,
    idle_timeout: Duration,
) -> anyhow::Result<()> {
    let with_session = |message: Message| match &session_id {
        Some(id) => message.with_session(id.clone()),
        None => message,
    };

    println!("{}", "📎 Clippy Interactive Chat".cyan().bold());
    println!("{}", format!("Relay: {}", client.server_url()).dimmed());
    if let Some(id) = &session_id {
        println!("{}", format!("Session ID: {}", id).dimmed());
    }
    println!("{}", "Type '/help' for commands, 'exit' or 'quit' to leave".dimmed());
    println!();

    let mut conversation = Conversation::new();
    conversation.reconciler_mut().mark_connecting();
    let mut policy = TypingPolicy::new(idle_timeout);

    let events = client.events()?;
    tokio::pin!(events);
    let mut stream_open = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let deadline = policy.deadline();

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    ChatInput::Empty => {}
                    ChatInput::Quit => break,
                    ChatInput::Help => print_help(),
                    ChatInput::History => {
                        if conversation.is_empty() {
                            println!("{}", "(no messages yet)".dimmed());
                        }
                        for entry in conversation.entries() {
                            render::print_entry(&entry);
                        }
                    }
                    ChatInput::Reset => {
                        conversation.clear_all();
                        println!("{}", "🧹 Local conversation cleared".dimmed());
                    }
                    ChatInput::Typing(text) => {
                        if let Some(action) = policy.on_input(&text, Instant::now()) {
                            publish_quietly(client, action.into_message(session_id.as_deref())).await;
                        }
                    }
                    ChatInput::Clear(scope) => {
                        publish_quietly(client, with_session(Message::clear(scope))).await;
                    }
                    ChatInput::Send(text) => {
                        let submitted = policy.on_submit();
                        let message = with_session(Message::message(text));
                        let delivered = match client.publish(&message).await {
                            Ok(ack) => {
                                conversation.record_sent(message);
                                if let Some(sent) = conversation.sent().last() {
                                    render::print_sent(sent, ack.connections);
                                }
                                true
                            }
                            Err(e) => {
                                println!("{}", format!("❌ Error: {}", e).red());
                                false
                            }
                        };
                        if let Some(action) = retraction_after_send(submitted, delivered) {
                            publish_quietly(client, action.into_message(session_id.as_deref())).await;
                        }
                    }
                    ChatInput::Invalid(reason) => println!("{}", format!("⚠️  {}", reason).yellow()),
                }
            }
            event = events.next(), if stream_open => {
                match event {
                    Some(event) => match decode(event, client) {
                        Incoming::Event(message) => {
                            let transition = conversation.receive(message);
                            render::show_transition(conversation.reconciler(), transition)?;
                        }
                        Incoming::Lost => report_lost(conversation.reconciler_mut(), client),
                        Incoming::Skip => {}
                    },
                    None => {
                        stream_open = false;
                        conversation.reconciler_mut().mark_disconnected();
                        println!("{}", "Stream closed; still sending".yellow());
                    }
                }
            }
            _ = idle_deadline(deadline) => {
                if let Some(action) = policy.poll(Instant::now()) {
                    publish_quietly(client, action.into_message(session_id.as_deref())).await;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Some(action) = policy.on_submit() {
        publish_quietly(client, action.into_message(session_id.as_deref())).await;
    }

    println!("{}", "👋 Goodbye!".cyan());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines_are_sent() {
        assert_eq!(parse_input("  hello there "), ChatInput::Send("hello there".to_string()));
        assert_eq!(parse_input("   "), ChatInput::Empty);
    }

    #[test]
    fn test_quit_words() {
        for line in ["exit", "QUIT", "/quit", "/exit"] {
            assert_eq!(parse_input(line), ChatInput::Quit, "{line}");
        }
    }

    #[test]
    fn test_slash_commands() {
        assert_eq!(parse_input("/help"), ChatInput::Help);
        assert_eq!(parse_input("/history"), ChatInput::History);
        assert_eq!(parse_input("/reset"), ChatInput::Reset);
        assert_eq!(parse_input("/typing draft"), ChatInput::Typing("draft".to_string()));
        assert_eq!(parse_input("/typing"), ChatInput::Typing(String::new()));
    }

    #[test]
    fn test_clear_scopes() {
        assert_eq!(parse_input("/clear"), ChatInput::Clear(ClearScope::All));
        assert_eq!(parse_input("/clear typing"), ChatInput::Clear(ClearScope::Typing));
        assert_eq!(parse_input("/clear session"), ChatInput::Clear(ClearScope::Session));
        assert!(matches!(parse_input("/clear galaxy"), ChatInput::Invalid(_)));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse_input("/dance now"),
            ChatInput::Invalid("Unknown command: /dance".to_string())
        );
    }

    #[test]
    fn test_failed_send_still_retracts_typing() {
        let mut policy = TypingPolicy::default();
        policy.on_input("draft", Instant::now());

        let submitted = policy.on_submit();
        assert!(!policy.indicator_sent());

        let owed = retraction_after_send(submitted, false);
        assert_eq!(owed, Some(TypingAction::Clear));
        assert!(owed.unwrap().into_message(Some("s1")).is_clear());
    }

    #[test]
    fn test_delivered_send_needs_no_retraction() {
        assert_eq!(retraction_after_send(Some(TypingAction::Clear), true), None);
        assert_eq!(retraction_after_send(None, false), None);
    }

    #[tokio::test]
    async fn test_idle_deadline_fires() {
        let deadline = Instant::now() + Duration::from_millis(10);
        tokio::time::timeout(Duration::from_secs(1), idle_deadline(Some(deadline)))
            .await
            .unwrap();

        let never = tokio::time::timeout(Duration::from_millis(20), idle_deadline(None)).await;
        assert!(never.is_err());
    }
}
