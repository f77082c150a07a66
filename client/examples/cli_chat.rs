//! Interactive terminal chat over a reconnecting channel.
//!
//! ```sh
//! GURU_USER_ID="alice smith" cargo run --example cli_chat
//! ```

use anyhow::{Context, Result};
use guru_client::{
    ChatApi, ChatMessage, ClientConfig, ConnectionManager, ConnectionState, Handler, PresenceChange,
    RoomJoined,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

struct CliChat;

#[async_trait::async_trait]
impl Handler for CliChat {
    async fn on_message(&mut self, message: ChatMessage) {
        println!("[{}] {}: {}", message.room_id, message.sender_name, message.content);
    }

    async fn on_room_joined(&mut self, joined: &RoomJoined) {
        println!("Joined room: {}", joined.room_id);
    }

    async fn on_user_joined(&mut self, change: &PresenceChange) {
        println!("* {} joined {}", display_name(change), change.room_id);
    }

    async fn on_user_left(&mut self, change: &PresenceChange) {
        println!("* {} left {}", display_name(change), change.room_id);
    }
}

fn display_name(change: &PresenceChange) -> &str {
    if change.username.is_empty() {
        &change.user_id
    } else {
        &change.username
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /join <room>   - Join a room");
    println!("  /leave         - Leave the current room");
    println!("  /rooms         - List rooms from the server");
    println!("  /state         - Show connection state");
    println!("  /quit          - Exit");
    println!("  <message>      - Send message to current room");
}

async fn list_rooms(api: &ChatApi) {
    match api.rooms().await {
        Ok(rooms) if rooms.is_empty() => println!("No rooms"),
        Ok(rooms) => {
            for room in rooms {
                println!("  {} ({}) - {} members", room.room_id, room.name, room.member_count);
            }
        }
        Err(e) => println!("Error: {:#}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let user_id = std::env::var("GURU_USER_ID").context("GURU_USER_ID is not set")?;
    let config = ClientConfig::from_env()?;
    let api = ChatApi::from_config(&config)?;

    let manager = ConnectionManager::new(&user_id, config)?;
    manager.set_handler(CliChat);
    manager.connect();

    let mut state = manager.subscribe();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let current = *state.borrow_and_update();
            if current != ConnectionState::Connecting {
                println!("-- {}", current);
            }
        }
    });

    print_help();

    let mut current_room: Option<String> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(command) = line.strip_prefix('/') else {
            match &current_room {
                Some(room) => manager.send_message(room, line, &user_id),
                None => println!("No room selected. Use /join <room> first."),
            }
            continue;
        };

        let (cmd, arg) = match command.split_once(' ') {
            Some((cmd, arg)) => (cmd, Some(arg.trim())),
            None => (command, None),
        };

        match cmd {
            "help" => print_help(),
            "join" => match arg {
                Some(room) => {
                    if let Some(previous) = current_room.take() {
                        manager.leave_room(&previous);
                    }
                    manager.join_room(room);
                    current_room = Some(room.to_string());
                }
                None => println!("Usage: /join <room>"),
            },
            "leave" => match current_room.take() {
                Some(room) => {
                    manager.leave_room(&room);
                    println!("Left room: {}", room);
                }
                None => println!("Not in a room"),
            },
            "rooms" => list_rooms(&api).await,
            "state" => println!("{}", manager.state()),
            "quit" | "exit" => break,
            _ => println!("Unknown command: /{}. Type /help for commands.", cmd),
        }
    }

    manager.dispose().await;
    Ok(())
}
