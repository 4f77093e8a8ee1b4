use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use failure::Error;
use tornedge::{ChatMessage, Config, Speaker, Tornedge};

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    let mut client = match Tornedge::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("failed to start the client: {}", e);
            std::process::exit(1);
        }
    };
    println!("Tornedge client (server: {})", client.config.server_uri);
    if let Err(e) = run(&mut client).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

async fn run(client: &mut Tornedge) -> Result<(), Error> {
    while client.image_id().is_err() {
        println!("No paper registered yet. Upload a photo of your piece of paper.");
        let line = match read_line("photo (path, or quit)> ") {
            Some(line) => line,
            None => return Ok(()),
        };
        match line.as_str() {
            "quit" => return Ok(()),
            "" => {}
            path => upload_photo(client, path).await,
        }
    }

    loop {
        let line = match read_line("tornedge> ") {
            Some(line) => line,
            None => return Ok(()),
        };
        let (command, arg) = split_command(&line);
        match command {
            "chat" => chat_screen(client).await,
            "file" => file_screen(client).await,
            "photo" => {
                if arg.is_empty() {
                    println!("usage: photo <path>");
                } else {
                    upload_photo(client, arg).await;
                }
            }
            "stub" => {
                let mut paths = arg.split_whitespace();
                match (paths.next(), paths.next()) {
                    (Some(image), Some(file)) => {
                        match client.create_stub_data(Path::new(image), Path::new(file)).await {
                            Ok((image_id, chat_room_id)) => println!(
                                "Stub data created. (image_id: {}, chat_room_id: {})",
                                image_id, chat_room_id
                            ),
                            Err(e) => println!("Failed to create the stub data. ({})", e),
                        }
                    }
                    _ => println!("usage: stub <image path> <file path>"),
                }
            }
            "quit" | "exit" => return Ok(()),
            "" => {}
            _ => println!("commands: chat, file, photo <path>, stub <image> <file>, quit"),
        }
    }
}

fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(' ') {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    }
}

async fn upload_photo(client: &mut Tornedge, path: &str) {
    match client.upload_image(Path::new(path)).await {
        Ok(image_id) => println!("Image Upload Succeeded. (image_id: {})", image_id),
        Err(e) => println!("Image Upload Failed. ({})", e),
    }
}

async fn chat_screen(client: &mut Tornedge) {
    if client.chat_room_id().is_err() {
        println!("create: open a room on your paper / enter: join your partner's room");
        loop {
            let line = match read_line("chat> ") {
                Some(line) => line,
                None => return,
            };
            match line.as_str() {
                "create" => match client.create_chat_room().await {
                    Ok(chat_room_id) => {
                        println!("Chat room created. (chat_room_id: {})", chat_room_id);
                        break;
                    }
                    Err(e) => println!("Failed to create the chat room. ({})", e),
                },
                "enter" => match client.enter_chat_room().await {
                    Ok(chat_room_id) => {
                        println!("Entered the chat room. (chat_room_id: {})", chat_room_id);
                        break;
                    }
                    Err(e) => println!("Failed to enter the chat room. ({})", e),
                },
                "back" => return,
                "" => {}
                _ => println!("commands: create, enter, back"),
            }
        }
    }
    chat_room(client).await;
}

async fn chat_room(client: &mut Tornedge) {
    refresh_chat(client).await;
    println!("type a message to send it; /refresh, /watch and /exit also work");
    loop {
        let line = match read_line("message> ") {
            Some(line) => line,
            None => return,
        };
        match line.as_str() {
            "" => {}
            "/exit" => {
                match client.exit_chat_room().await {
                    Ok(()) => println!("Left the chat room."),
                    Err(e) => println!("Failed to exit the chat room. ({})", e),
                }
                return;
            }
            "/refresh" => refresh_chat(client).await,
            "/watch" => {
                let seen = match client.update_chat().await {
                    Ok(log) => log.len(),
                    Err(_) => 0,
                };
                println!("waiting for new messages (up to 60s)...");
                let wait = client.wait_for_chat(seen, Duration::from_secs(2));
                match tokio::time::timeout(Duration::from_secs(60), wait).await {
                    Ok(Ok(fresh)) => print_messages(client, &fresh),
                    Ok(Err(e)) => println!("Failed to update the chat log. ({})", e),
                    Err(_) => println!("no new messages"),
                }
            }
            text => match client.send_chat(text).await {
                Ok(log) => print_messages(client, &log),
                Err(e) => println!("Failed to send the chat message. ({})", e),
            },
        }
    }
}

async fn refresh_chat(client: &Tornedge) {
    match client.update_chat().await {
        Ok(log) => print_messages(client, &log),
        Err(e) => println!("Failed to update the chat log. ({})", e),
    }
}

fn print_messages(client: &Tornedge, messages: &[ChatMessage]) {
    for message in messages {
        match client.speaker(message) {
            Speaker::Me => println!("{:>12} | {}", "you", message.text),
            Speaker::Partner => println!("{:>12} | {}", "partner", message.text),
        }
    }
}

async fn file_screen(client: &mut Tornedge) {
    println!("send <path>: share a file on your paper / receive: fetch your partner's file");
    loop {
        let line = match read_line("file> ") {
            Some(line) => line,
            None => return,
        };
        let (command, arg) = split_command(&line);
        match command {
            "send" => {
                if arg.is_empty() {
                    println!("usage: send <path>");
                    continue;
                }
                match client.send_file(Path::new(arg)).await {
                    Ok(()) => println!("File Upload Succeeded."),
                    Err(e) => println!("File Upload Failed. ({})", e),
                }
            }
            "receive" => match client.receive_file().await {
                Ok(record) => {
                    println!("File Download Succeeded. ({})", record.file_name());
                    match client.save_received_file(&record, Path::new("downloads")).await {
                        Ok(dest) => println!("saved to {}", dest.display()),
                        Err(e) => println!("could not fetch the file body ({})", e),
                    }
                }
                Err(e) => println!("File Download Failed. ({})", e),
            },
            "back" => return,
            "" => {}
            _ => println!("commands: send <path>, receive, back"),
        }
    }
}
