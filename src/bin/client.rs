//! Striped cache client.
//!
//! This binary provides a CLI for interacting with a running cache server.

use bytes::BytesMut;
use clap::Parser;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

use striped_cache::cli::{Cli, ClientCommand};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let addr = format!("{}:{}", args.host, args.port);
    let mut stream = match TcpStream::connect(&addr).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect to server at {}: {}", addr, e);
            eprintln!("Make sure the server is running with: cargo run --bin server");
            std::process::exit(1);
        }
    };

    stream.write_all(&args.command.to_request()).await?;
    let reply = read_reply(&mut stream, args.command.expects_block()).await?;

    let text = match std::str::from_utf8(&reply) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to parse response: {}", e);
            std::process::exit(1);
        }
    };

    if text.starts_with("ERROR") || text.contains("_ERROR") {
        eprintln!("Error: {}", text.trim_end());
        std::process::exit(1);
    }

    match &args.command {
        ClientCommand::Get { key } => match value_of(text) {
            Some(value) => println!("{}", value),
            None => println!("Key '{}' not found", key),
        },

        ClientCommand::Set { key, .. } => match text.trim_end() {
            "STORED" => println!("Set key '{}'", key),
            resp => println!("Response: {}", resp),
        },

        ClientCommand::Add { key, .. } => match text.trim_end() {
            "STORED" => println!("Added key '{}'", key),
            "NOT_STORED" => println!("Key '{}' already exists", key),
            resp => println!("Response: {}", resp),
        },

        ClientCommand::Replace { key, .. } => match text.trim_end() {
            "STORED" => println!("Replaced key '{}'", key),
            "NOT_STORED" => println!("Key '{}' not found", key),
            resp => println!("Response: {}", resp),
        },

        ClientCommand::Delete { key } => match text.trim_end() {
            "DELETED" => println!("Deleted key '{}'", key),
            "NOT_FOUND" => println!("Key '{}' not found", key),
            resp => println!("Response: {}", resp),
        },

        ClientCommand::Stats => {
            println!("Cache Statistics:");
            for line in text.lines() {
                if let Some(stat) = line.strip_prefix("STAT ") {
                    if let Some((name, value)) = stat.split_once(' ') {
                        println!("  {}: {}", name, value);
                    }
                }
            }
        }

        ClientCommand::Version => println!("{}", text.trim_end()),
    }

    Ok(())
}

/// Read until a full reply has arrived: one line, or a block ending in `END`.
async fn read_reply(stream: &mut TcpStream, block: bool) -> std::io::Result<BytesMut> {
    let mut buf = BytesMut::with_capacity(1024);

    loop {
        if stream.read_buf(&mut buf).await? == 0 {
            return Ok(buf);
        }

        let line_done = buf.ends_with(b"\r\n");
        let is_error = buf.starts_with(b"ERROR")
            || buf.starts_with(b"CLIENT_ERROR")
            || buf.starts_with(b"SERVER_ERROR");

        if line_done && (!block || is_error || buf.ends_with(b"END\r\n")) {
            return Ok(buf);
        }
    }
}

/// Extract the data block of a single-key `get` reply.
fn value_of(reply: &str) -> Option<&str> {
    let rest = reply.strip_prefix("VALUE ")?;
    let (header, data) = rest.split_once("\r\n")?;
    let len: usize = header.rsplit(' ').next()?.parse().ok()?;
    data.get(..len)
}
