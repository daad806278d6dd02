//! Persona Engine command-line entry point.

mod cli;

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use persona_engine::backend::MockBackend;
use persona_engine::config::{self, EngineConfig};
use persona_engine::detection::{PersonaDetector, UserProfile};
use persona_engine::engine::{EngineBuilder, EngineReply, PersonaEngine};
use persona_engine::error::{Error, Result};
use persona_engine::logging;
use persona_engine::orchestrator::QuotaPolicy;
use persona_engine::persona::{PersonaCatalog, PersonaId, PersonaRegistry};
use persona_engine::session::TransitionTemplates;
use persona_engine::speech::SpeechOutcome;
use persona_engine::version;

use crate::cli::{Cli, Commands, ConfigSubcommand, PersonaSubcommand, ProfileArgs};

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Version => {
            print!("{}", version::build_info());
            return Ok(());
        }
        Commands::Config { ref subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand.clone(), cli.config.as_deref());
        }
        _ => {}
    }

    let config = EngineConfig::load(cli.config.as_deref())?;
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    debug!(version = %build.full_version(), "Starting persona-engine");

    match cli.command {
        Commands::Detect { text, profile, json } => run_detect(&config, &text, &profile, json),
        Commands::Chat {
            profile,
            mock,
            offline,
            speak,
            json,
        } => {
            let mut builder = EngineBuilder::from_config(&config)?;
            if mock {
                // Local stand-in, no provider limits to respect
                builder = builder.backend(Arc::new(MockBackend::new())).quota(QuotaPolicy {
                    min_gap_ms: 0,
                    ..config.quota.clone()
                });
            } else if offline {
                builder = builder.without_backend();
            }
            let engine = builder.build();
            let profile = build_profile(&profile)?;
            block_on(run_chat(engine, profile, speak, json, config.speech.language.clone()))
        }
        Commands::Speak {
            text,
            persona,
            language,
            local_only,
        } => {
            let persona = parse_persona(&persona)?;
            let mut builder = EngineBuilder::from_config(&config)?.without_backend();
            if local_only {
                builder = builder.without_voice();
            }
            let language = language.unwrap_or_else(|| config.speech.language.clone());
            block_on(run_speak(builder.build(), text, persona, language))
        }
        Commands::Personas { subcommand } => handle_persona_command(subcommand, &config),
        Commands::Version | Commands::Config { .. } => Ok(()),
    }
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;
    runtime.block_on(future)
}

// ─────────────────────────────────────────────────────────────────
// Profile Parsing
// ─────────────────────────────────────────────────────────────────

fn parse_persona(slug: &str) -> Result<PersonaId> {
    slug.parse::<PersonaId>()
        .map_err(|_| Error::PersonaNotFound { name: slug.to_string() })
}

/// Parse a kebab-case enum value through its serde representation.
fn parse_kebab<T: DeserializeOwned>(field: &str, value: &str) -> Result<T> {
    let normalized = value.trim().to_lowercase().replace(['_', ' '], "-");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| Error::config_field_invalid(field, format!("unrecognised value '{}'", value)))
}

fn build_profile(args: &ProfileArgs) -> Result<UserProfile> {
    Ok(UserProfile {
        origin_region: args.region.clone(),
        age_bracket: args.age.as_deref().map(|v| parse_kebab("--age", v)).transpose()?,
        family: args.family.as_deref().map(|v| parse_kebab("--family", v)).transpose()?,
        manual_persona: args.persona.as_deref().map(parse_persona).transpose()?,
        ..Default::default()
    })
}

// ─────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────

fn run_detect(config: &EngineConfig, text: &str, args: &ProfileArgs, json: bool) -> Result<()> {
    let detector = PersonaDetector::from_parts(
        config.detection.thresholds,
        config.detection.weights.clone(),
        Arc::new(TransitionTemplates::builtin()),
    );
    let profile = build_profile(args)?;
    let session = persona_engine::session::ConversationState::default();
    let (result, _) = detector.detect(text, &profile, &session);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("persona:    {}", result.persona.slug());
    println!("confidence: {}", result.confidence);
    if !result.signals.is_empty() {
        let signals: Vec<String> = result.signals.iter().map(|s| format!("{:?}", s)).collect();
        println!("signals:    {}", signals.join(", "));
    }
    println!("reasoning:");
    for reason in &result.reasoning {
        println!("  - {}", reason);
    }
    Ok(())
}

fn print_reply(reply: &EngineReply, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(reply)?);
        return Ok(());
    }
    if let Some(ref transition) = reply.transition {
        println!("[{}]", transition);
    }
    println!("{}> {}", reply.selected_persona.slug(), reply.styled_text);
    Ok(())
}

async fn run_chat(
    engine: PersonaEngine,
    profile: UserProfile,
    speak: bool,
    json: bool,
    language: String,
) -> Result<()> {
    let mut session = engine.new_session();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!(backend = engine.has_backend(), "Chat session started");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                engine.stop_speech();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let reply = engine.detect_and_respond(&line, &profile, &mut session).await;
        print_reply(&reply, json)?;
        std::io::stdout().flush()?;

        if speak {
            if let Err(e) = engine.synthesize_speech(&reply.styled_text, reply.selected_persona, &language) {
                debug!(error = %e, "Reply not spoken");
            }
        }
    }

    if let Some(job) = engine.speech().current() {
        job.wait().await;
    }
    if let Some(stats) = engine.orchestrator_stats() {
        debug!(
            requests = stats.requests,
            attempts = stats.attempts,
            failures = stats.failures,
            "Chat session ended"
        );
    }
    Ok(())
}

async fn run_speak(engine: PersonaEngine, text: String, persona: PersonaId, language: String) -> Result<()> {
    let job = engine.synthesize_speech(&text, persona, &language)?;

    let outcome = tokio::select! {
        outcome = job.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            job.stop();
            SpeechOutcome::Stopped
        }
    };

    match outcome {
        SpeechOutcome::Completed { tier } => {
            println!("Spoken via {:?} voice.", tier);
            Ok(())
        }
        SpeechOutcome::Stopped => {
            println!("Stopped.");
            Ok(())
        }
        SpeechOutcome::Failed(e) => Err(e.into()),
    }
}

fn handle_persona_command(subcommand: PersonaSubcommand, config: &EngineConfig) -> Result<()> {
    let catalog = PersonaCatalog::new(config.persona_dir());

    match subcommand {
        PersonaSubcommand::List => {
            let registry = PersonaRegistry::with_overrides(&catalog)?;
            let installed: Vec<PersonaId> = catalog.list().into_iter().map(|o| o.persona).collect();
            println!("{:<16} {:<22} {}", "SLUG", "NAME", "SOURCE");
            for profile in registry.list() {
                let source = if installed.contains(&profile.id) {
                    "override"
                } else {
                    "bundled"
                };
                println!("{:<16} {:<22} {}", profile.id.slug(), profile.display_name, source);
            }
        }
        PersonaSubcommand::Show { persona } => {
            let id = parse_persona(&persona)?;
            let registry = PersonaRegistry::with_overrides(&catalog)?;
            println!("{}", toml::to_string_pretty(registry.profile(id))?);
        }
        PersonaSubcommand::Validate { persona } => {
            let id = parse_persona(&persona)?;
            catalog.validate(id)?;
            println!("Override for '{}' is valid.", id.slug());
        }
    }
    Ok(())
}

fn handle_config_command(subcommand: ConfigSubcommand, path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = EngineConfig::load(path)?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path: target, force } => {
            let written = config::init_config(target.as_deref(), force)?;
            println!("Configuration file created: {}", written.display());
        }
        ConfigSubcommand::Validate => {
            EngineConfig::load(path)?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
