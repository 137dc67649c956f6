//! Canopy CLI
//!
//! - `check-config`: validate a shell configuration at boot time
//! - `replay`: run intents through a fresh shell and write a signed segment
//! - `verify`: check a segment against its manifest
//! - `continuity`: check that a list of manifests covers one unbroken chain

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use canopy_attest::{
    parse_public_key, verify_segment, verify_segment_continuity, AttestationManifest, SegmentInput,
};
use canopy_runtime::{init_tracing, Shell, ShellConfig};
use canopy_types::{Intent, Role};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Canopy governance kernel tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CANOPY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration, capability catalog and space policies
    CheckConfig,

    /// Run intents from a JSON array through a fresh shell
    Replay {
        /// JSON file holding an array of intents
        #[arg(long)]
        intents: PathBuf,

        #[arg(long, default_value = "operator")]
        user: String,

        #[arg(long, default_value = "user", value_parser = parse_role)]
        role: Role,

        /// Granted policy (repeatable)
        #[arg(long = "policy")]
        policies: Vec<String>,

        /// Directory for segment.jsonl and manifest.json
        #[arg(long)]
        out: PathBuf,
    },

    /// Verify a JSONL segment against its signed manifest
    Verify {
        #[arg(long)]
        segment: PathBuf,

        #[arg(long)]
        manifest: PathBuf,

        /// Hex-encoded Ed25519 public key
        #[arg(long)]
        public_key: String,

        /// The segment is a redacted export
        #[arg(long)]
        redacted: bool,
    },

    /// Check seq continuity across manifests, in the order given
    Continuity { manifests: Vec<PathBuf> },
}

fn parse_role(value: &str) -> std::result::Result<Role, String> {
    serde_json::from_value(serde_json::Value::from(value))
        .map_err(|_| format!("unknown role '{}' (guest, user, admin, owner)", value))
}

fn load_config(path: Option<&PathBuf>) -> Result<ShellConfig> {
    match path {
        Some(path) => ShellConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(ShellConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_tracing(&config.logging)?;

    match cli.command {
        Commands::CheckConfig => {
            let shell = Shell::new(
                config,
                Arc::new(canopy_types::SystemClock),
                None,
                Arc::new(canopy_attest::Ed25519KeyProvider::generate()),
            )?;
            let policy = shell.kernel().policy();
            println!("capabilities:   {}", policy.capabilities().len());
            println!("space policies: {}", policy.space_policies().len());
            println!("chain id:       {}", shell.config().audit.chain_id);
            Ok(())
        }
        Commands::Replay {
            intents,
            user,
            role,
            policies,
            out,
        } => {
            let text = std::fs::read_to_string(&intents)
                .with_context(|| format!("reading {}", intents.display()))?;
            let intents: Vec<Intent> = serde_json::from_str(&text).context("parsing intents")?;

            let mut shell = Shell::open(config).await?;
            shell.bootstrap(user, role, policies)?;
            for intent in intents {
                shell.submit(intent)?;
            }
            shell.flush().await?;

            let Some(segment) = shell.attest_pending()? else {
                println!("no decisions recorded");
                return Ok(());
            };
            std::fs::create_dir_all(&out)?;
            std::fs::write(out.join("segment.jsonl"), &segment.text)?;
            std::fs::write(out.join("manifest.json"), segment.manifest.to_json_pretty()?)?;

            let meta = &segment.manifest.metadata;
            println!("windows open:  {}", shell.snapshot().windows.len());
            println!("records:       {} (seq {}..={})", meta.record_count, meta.seq_start, meta.seq_end);
            println!("head hash:     {}", meta.head_hash);
            println!("public key:    {}", hex::encode(shell.public_key()?.as_bytes()));
            Ok(())
        }
        Commands::Verify {
            segment,
            manifest,
            public_key,
            redacted,
        } => {
            let text = std::fs::read_to_string(&segment)
                .with_context(|| format!("reading {}", segment.display()))?;
            let manifest = AttestationManifest::from_json(&std::fs::read_to_string(&manifest)?)?;
            let key = parse_public_key(&public_key)?;

            let mut input = SegmentInput::new(&text, &manifest, &key);
            if redacted {
                input = input.redacted();
            }
            let result = verify_segment(&input);
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.ok {
                bail!("segment verification failed");
            }
            Ok(())
        }
        Commands::Continuity { manifests } => {
            let mut loaded = Vec::with_capacity(manifests.len());
            for path in &manifests {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                loaded.push(AttestationManifest::from_json(&text)?);
            }
            let report = verify_segment_continuity(&loaded);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.ok {
                bail!("segments are not continuous");
            }
            Ok(())
        }
    }
}
