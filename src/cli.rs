//! CLI argument parsing using clap v4

use clap::{Args, Parser, Subcommand};

/// Persona Engine - adaptive persona routing for conversational replies
///
/// Detects the best response persona for a message, generates a reply
/// through a rate-limited backend, renders it in the persona's voice and
/// can speak it with a primary voice service or a local synthesizer.
#[derive(Parser, Debug)]
#[command(name = "persona-engine")]
#[command(author, version, long_about = None)]
#[command(about = "Persona Engine - adaptive persona routing for conversational replies")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PERSONA_ENGINE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Profile fields shared by `detect` and `chat`
#[derive(Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    /// Pin a persona (slug, e.g. "caring"); skips detection
    #[arg(long)]
    pub persona: Option<String>,

    /// Where the user is from (e.g. "Texas")
    #[arg(long)]
    pub region: Option<String>,

    /// Age bracket: child, teen, young-adult, adult, senior
    #[arg(long)]
    pub age: Option<String>,

    /// Travelling with: solo, couple, with-children, group
    #[arg(long)]
    pub family: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect the persona for a message without generating a reply
    Detect {
        /// Message text
        text: String,

        #[command(flatten)]
        profile: ProfileArgs,

        /// Print the full detection result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive conversation on stdin, one message per line
    Chat {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Use the built-in mock backend instead of the configured one
        #[arg(long, conflicts_with = "offline")]
        mock: bool,

        /// Never call a backend; answer from local phrase banks
        #[arg(long)]
        offline: bool,

        /// Speak each reply
        #[arg(long)]
        speak: bool,

        /// Print each reply as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Speak text in a persona's voice
    Speak {
        /// Text to speak
        text: String,

        /// Persona slug
        #[arg(long, default_value = "auto-detect")]
        persona: String,

        /// Language code for the local synthesizer (defaults to config)
        #[arg(long)]
        language: Option<String>,

        /// Skip the primary voice service
        #[arg(long)]
        local_only: bool,
    },

    /// Persona catalog
    Personas {
        #[command(subcommand)]
        subcommand: PersonaSubcommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Display version and build information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PersonaSubcommand {
    /// List every persona and whether it has an override installed
    List,

    /// Show one persona's effective profile
    Show {
        /// Persona slug
        persona: String,
    },

    /// Validate an installed override file
    Validate {
        /// Persona slug
        persona: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show,

    /// Write a commented default configuration file
    Init {
        /// Where to create the file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Load and validate the configuration
    Validate,
}
