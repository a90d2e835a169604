use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "backoffice-api")]
#[command(about = "Backoffice management API server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Listen port, overrides PORT / BACKOFFICE_API_PORT")]
        port: Option<u16>,

        #[arg(long, help = "Apply pending migrations before serving")]
        migrate: bool,
    },

    #[command(about = "Sign an access token with the configured secret")]
    Token {
        #[arg(long, help = "Subject user id")]
        user: String,

        #[arg(long, help = "Role claim (admin, promoter, finance)")]
        role: String,
    },
}

impl Cli {
    pub fn command_or_default(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve {
            port: None,
            migrate: false,
        })
    }
}
