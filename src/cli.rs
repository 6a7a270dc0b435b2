use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the webhook server.
    Serve(ServeArgs),
    /// Answer one query from the terminal and exit.
    Ask(AskArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address for the webhook endpoint.
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub addr: SocketAddr,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Query text: the monthly-digest trigger phrase or a search keyword.
    pub text: String,
}
