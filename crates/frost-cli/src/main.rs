//! FROST CLI
//!
//! Drives the protocol engine through file-based message exchange: every
//! invocation runs one round for one party, reading inbound message files
//! from the working directory and writing the outbound messages plus the
//! persisted session state back to it. Parties on different machines only
//! need their message files carried across.
//!
//! File layout inside the working directory:
//!
//! ```text
//! keygen-<id>.state   per-party keygen session
//! sign-<id>.state     per-party signing session
//! kg1-<id>.json       keygen round 1 broadcast of party <id>
//! kg2-<from>-<to>.json keygen round 2 unicast share
//! s1-<id>.json        signing round 1 broadcast
//! s2-<id>.json        signing round 2 partial signature
//! public.json         group public key set (identical for all parties)
//! share-<id>.json     party's secret share plus metadata
//! signature.json      final signature (distinct from any state path)
//! ```
//!
//! State files are only rewritten after a round succeeds, so a failed
//! invocation leaves the previous on-disk state intact for a retry.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ed25519_dalek::Verifier;
use frost_core::{
    KeygenSession, Message, PartyId, PartySet, PublicKeySet, SecretShare, Signature, SignSession,
};
use rand::rngs::OsRng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "frost", about = "FROST threshold Ed25519 signing", version)]
struct Cli {
    /// Working directory for states and exchanged messages
    #[arg(short, long, default_value = ".", global = true)]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Distributed key generation, one round per invocation
    Keygen {
        #[command(subcommand)]
        round: KeygenRound,
    },

    /// Threshold signing, one round per invocation
    Sign {
        #[command(subcommand)]
        round: SignRound,
    },

    /// Check signature.json against public.json with the stock Ed25519
    /// verifier
    Verify {
        /// Message as a UTF-8 string
        #[arg(long, conflicts_with = "message_file")]
        message: Option<String>,

        /// Read the message bytes from a file
        #[arg(long)]
        message_file: Option<PathBuf>,
    },

    /// Run key generation and signing in-process and print the results
    Demo {
        /// Number of parties
        #[arg(long, default_value_t = 5)]
        parties: u16,

        /// Threshold (any t+1 parties can sign)
        #[arg(long, default_value_t = 2)]
        threshold: u16,

        /// Message to sign
        #[arg(long, default_value = "Hello, MPC!")]
        message: String,
    },
}

#[derive(Subcommand)]
enum KeygenRound {
    /// Sample the polynomial and emit the commitment broadcast
    Init {
        /// This party's id (1..=parties)
        #[arg(long)]
        id: u16,

        /// Number of parties
        #[arg(long)]
        parties: u16,

        /// Threshold (any t+1 parties can later sign)
        #[arg(long)]
        threshold: u16,
    },

    /// Consume the kg1-*.json broadcasts, emit one share file per peer
    Round1 {
        #[arg(long)]
        id: u16,
    },

    /// Consume the kg2-*.json shares addressed to us, write public.json and
    /// share-<id>.json
    Round2 {
        #[arg(long)]
        id: u16,
    },
}

#[derive(Subcommand)]
enum SignRound {
    /// Commit to fresh nonces for one signing session
    Init {
        #[arg(long)]
        id: u16,

        /// Comma-separated signer ids, at least threshold+1 of them
        #[arg(long, value_delimiter = ',')]
        signers: Vec<u16>,

        /// Message as a UTF-8 string
        #[arg(long, conflicts_with = "message_file")]
        message: Option<String>,

        /// Read the message bytes from a file
        #[arg(long)]
        message_file: Option<PathBuf>,
    },

    /// Consume the s1-*.json broadcasts, emit our partial signature
    Round1 {
        #[arg(long)]
        id: u16,
    },

    /// Consume the s2-*.json partials, write signature.json
    Round2 {
        #[arg(long)]
        id: u16,
    },
}

/// On-disk wrapper around a secret share.
#[derive(Serialize, Deserialize)]
struct ShareFile {
    share_id: String,
    created_at: i64,
    share: SecretShare,
}

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .compact()
        .init();

    let cli = Cli::parse();
    let dir = cli.dir;

    match cli.command {
        Commands::Keygen { round } => match round {
            KeygenRound::Init {
                id,
                parties,
                threshold,
            } => keygen_init(&dir, id, parties, threshold),
            KeygenRound::Round1 { id } => keygen_round1(&dir, id),
            KeygenRound::Round2 { id } => keygen_round2(&dir, id),
        },
        Commands::Sign { round } => match round {
            SignRound::Init {
                id,
                signers,
                message,
                message_file,
            } => sign_init(&dir, id, &signers, message, message_file),
            SignRound::Round1 { id } => sign_round1(&dir, id),
            SignRound::Round2 { id } => sign_round2(&dir, id),
        },
        Commands::Verify {
            message,
            message_file,
        } => verify(&dir, message, message_file),
        Commands::Demo {
            parties,
            threshold,
            message,
        } => demo(parties, threshold, &message),
    }
}

// ============ Keygen Commands ============

fn keygen_init(dir: &Path, id: u16, parties: u16, threshold: u16) -> Result<()> {
    let self_id = PartyId::new(id)?;
    let (broadcast, session) = KeygenSession::new(self_id, parties, threshold, &mut OsRng)?;

    fs::create_dir_all(dir)?;
    store(&dir.join(format!("kg1-{id}.json")), &broadcast)?;
    store(&keygen_state_path(dir, id), &session)?;

    info!(id, parties, threshold, "keygen initialized");
    println!("wrote kg1-{id}.json; distribute it to every other party");
    Ok(())
}

fn keygen_round1(dir: &Path, id: u16) -> Result<()> {
    let mut session: KeygenSession = load(&keygen_state_path(dir, id))?;
    let inbound = read_messages(dir, "kg1-")?;

    let outbound = session.round1(&inbound)?;
    for message in &outbound {
        let to = message
            .to
            .map(PartyId::as_u16)
            .context("round 1 output must be addressed")?;
        store(&dir.join(format!("kg2-{id}-{to}.json")), message)?;
    }
    store(&keygen_state_path(dir, id), &session)?;

    info!(id, shares = outbound.len(), "keygen round 1 complete");
    println!("wrote {} share files; deliver kg2-{id}-<peer>.json to each peer", outbound.len());
    Ok(())
}

fn keygen_round2(dir: &Path, id: u16) -> Result<()> {
    let mut session: KeygenSession = load(&keygen_state_path(dir, id))?;
    let self_id = PartyId::new(id)?;
    let inbound: Vec<Message> = read_messages(dir, "kg2-")?
        .into_iter()
        .filter(|message| message.to == Some(self_id))
        .collect();

    let (public, share) = session.round2(&inbound)?;

    store(&dir.join("public.json"), &public)?;
    store(
        &dir.join(format!("share-{id}.json")),
        &ShareFile {
            share_id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().timestamp(),
            share,
        },
    )?;
    store(&keygen_state_path(dir, id), &session)?;

    info!(id, "keygen complete");
    println!(
        "group public key: {}",
        hex::encode(public.group_key().to_bytes())
    );
    println!("wrote public.json and share-{id}.json");
    Ok(())
}

// ============ Signing Commands ============

fn sign_init(
    dir: &Path,
    id: u16,
    signers: &[u16],
    message: Option<String>,
    message_file: Option<PathBuf>,
) -> Result<()> {
    let message = message_bytes(message, message_file)?;
    let share_file: ShareFile = load(&dir.join(format!("share-{id}.json")))?;
    let public: PublicKeySet = load(&dir.join("public.json"))?;

    let signer_ids = PartySet::new(
        signers
            .iter()
            .map(|n| PartyId::new(*n))
            .collect::<frost_core::Result<Vec<_>>>()?,
    )?;

    let (broadcast, session) = SignSession::new(
        signer_ids,
        &share_file.share,
        &public,
        message,
        &mut OsRng,
    )?;

    store(&dir.join(format!("s1-{id}.json")), &broadcast)?;
    store(&sign_state_path(dir, id), &session)?;

    info!(id, signers = signers.len(), "signing initialized");
    println!("wrote s1-{id}.json; distribute it to the other signers");
    Ok(())
}

fn sign_round1(dir: &Path, id: u16) -> Result<()> {
    let mut session: SignSession = load(&sign_state_path(dir, id))?;
    let inbound = read_messages(dir, "s1-")?;

    let partial = session.round1(&inbound)?;
    store(&dir.join(format!("s2-{id}.json")), &partial)?;
    store(&sign_state_path(dir, id), &session)?;

    info!(id, "signing round 1 complete");
    println!("wrote s2-{id}.json; distribute it to the other signers");
    Ok(())
}

fn sign_round2(dir: &Path, id: u16) -> Result<()> {
    let mut session: SignSession = load(&sign_state_path(dir, id))?;
    let inbound = read_messages(dir, "s2-")?;

    let signature = session.round2(&inbound)?;

    // signature and state go to distinct paths; neither clobbers the other
    store(&dir.join("signature.json"), &signature)?;
    store(&sign_state_path(dir, id), &session)?;

    info!(id, "signing complete");
    println!("signature: {}", hex::encode(signature.to_bytes()));
    println!("wrote signature.json");
    Ok(())
}

fn verify(dir: &Path, message: Option<String>, message_file: Option<PathBuf>) -> Result<()> {
    let message = message_bytes(message, message_file)?;
    let public: PublicKeySet = load(&dir.join("public.json"))?;
    let signature: Signature = load(&dir.join("signature.json"))?;

    if !public.group_key().verify(&message, &signature) {
        bail!("signature does not verify against the group key");
    }
    let verifying_key = public.group_key().to_ed25519()?;
    verifying_key
        .verify(&message, &signature.to_ed25519())
        .context("stock Ed25519 verification failed")?;

    println!("signature OK (group equation and stock Ed25519)");
    Ok(())
}

// ============ Demo ============

/// Full in-process run: DKG among all parties, signing by the first
/// threshold+1 of them, then both verification routes.
fn demo(parties: u16, threshold: u16, message: &str) -> Result<()> {
    let mut rng = OsRng;
    println!("running key generation with n={parties} t={threshold}");

    let mut broadcasts = Vec::new();
    let mut sessions = Vec::new();
    for i in 1..=parties {
        let (broadcast, session) = KeygenSession::new(PartyId::new(i)?, parties, threshold, &mut rng)?;
        broadcasts.push(broadcast);
        sessions.push(session);
    }

    let mut share_batches: Vec<Vec<Message>> = vec![Vec::new(); usize::from(parties)];
    for session in sessions.iter_mut() {
        for message in session.round1(&broadcasts)? {
            let to = message.to.context("keygen shares must be addressed")?;
            share_batches[usize::from(to.as_u16()) - 1].push(message);
        }
    }

    let mut outputs = Vec::new();
    for (session, batch) in sessions.iter_mut().zip(share_batches) {
        outputs.push(session.round2(&batch)?);
    }

    let reference = outputs[0].0.clone();
    for (public, _) in &outputs {
        if public != &reference {
            bail!("parties disagree on the public output");
        }
    }
    println!(
        "group public key: {}",
        hex::encode(reference.group_key().to_bytes())
    );

    let quorum: Vec<u16> = (1..=threshold + 1).collect();
    println!("signing {:?} with parties {quorum:?}", message);
    let signer_ids = PartySet::new(
        quorum
            .iter()
            .map(|n| PartyId::new(*n))
            .collect::<frost_core::Result<Vec<_>>>()?,
    )?;

    let mut sign_sessions = Vec::new();
    let mut nonce_broadcasts = Vec::new();
    for n in &quorum {
        let (public, share) = &outputs[usize::from(*n) - 1];
        let (broadcast, session) = SignSession::new(
            signer_ids.clone(),
            share,
            public,
            message.as_bytes().to_vec(),
            &mut rng,
        )?;
        nonce_broadcasts.push(broadcast);
        sign_sessions.push(session);
    }

    let mut partials = Vec::new();
    for session in sign_sessions.iter_mut() {
        partials.push(session.round1(&nonce_broadcasts)?);
    }

    let mut signature = None;
    for session in sign_sessions.iter_mut() {
        let produced = session.round2(&partials)?;
        if let Some(previous) = &signature {
            if previous != &produced {
                bail!("signers disagree on the signature");
            }
        }
        signature = Some(produced);
    }
    let signature = signature.context("no signers participated")?;

    if !reference.group_key().verify(message.as_bytes(), &signature) {
        bail!("signature does not verify against the group key");
    }
    reference
        .group_key()
        .to_ed25519()?
        .verify(message.as_bytes(), &signature.to_ed25519())
        .context("stock Ed25519 verification failed")?;

    println!("signature: {}", hex::encode(signature.to_bytes()));
    println!("verified with the group equation and the stock Ed25519 verifier");
    Ok(())
}

// ============ File Helpers ============

fn keygen_state_path(dir: &Path, id: u16) -> PathBuf {
    dir.join(format!("keygen-{id}.state"))
}

fn sign_state_path(dir: &Path, id: u16) -> PathBuf {
    dir.join(format!("sign-{id}.state"))
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

fn store<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut data = serde_json::to_string_pretty(value)?;
    data.push('\n');
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

/// Collect every message file in `dir` whose name starts with `prefix`,
/// sorted by sender for deterministic batches.
fn read_messages(dir: &Path, prefix: &str) -> Result<Vec<Message>> {
    let mut messages: Vec<Message> = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) && name.ends_with(".json") {
            messages.push(load(&entry.path())?);
        }
    }
    if messages.is_empty() {
        bail!("no {prefix}*.json message files found in {}", dir.display());
    }
    messages.sort_by_key(|message| message.from.as_u16());
    Ok(messages)
}

fn message_bytes(message: Option<String>, message_file: Option<PathBuf>) -> Result<Vec<u8>> {
    match (message, message_file) {
        (Some(text), None) => Ok(text.into_bytes()),
        (None, Some(path)) => {
            fs::read(&path).with_context(|| format!("reading {}", path.display()))
        }
        (None, None) => bail!("either --message or --message-file is required"),
        (Some(_), Some(_)) => bail!("--message and --message-file are mutually exclusive"),
    }
}
