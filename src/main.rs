use anyhow::{Context, Result};
use boxpipe::{DEFAULT_BUFFER_SIZE, KdfAlgorithm, KdfProfile, decrypt_stream, encrypt_stream};
use clap::{ArgAction, Parser};
use std::io;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod auth;

#[derive(Debug, Parser)]
#[command(name = "boxpipe")]
#[command(
    version,
    about = "Password-authenticated encryption pipe: plaintext on stdin, ciphertext on stdout."
)]
struct Cli {
    /// Decrypt stdin instead of encrypting it
    #[arg(short, long)]
    decrypt: bool,

    /// Key derivation: old | scrypt | argon
    #[arg(short, long, value_name = "ALG", env = "BOXPIPE_ALG", default_value = "argon")]
    alg: KdfAlgorithm,

    /// Plaintext buffer size in bytes; both ends must agree
    #[arg(
        short,
        long,
        value_name = "BYTES",
        env = "BOXPIPE_SIZE",
        default_value_t = DEFAULT_BUFFER_SIZE
    )]
    size: usize,

    /// Password (prompted on the terminal when absent)
    #[arg(
        short,
        long,
        value_name = "PASSWORD",
        env = "BOXPIPE_KEY",
        hide_env_values = true
    )]
    key: Option<String>,

    /// Increase log verbosity on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the stream
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_logging(args.verbose);

    let profile = KdfProfile::from(args.alg);
    let password = auth::resolve_password(args.key, !args.decrypt)?;
    debug!(algorithm = %args.alg, buffer_size = args.size, decrypt = args.decrypt, "starting");

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();

    if args.decrypt {
        decrypt_stream(stdin, stdout, &password, &profile, args.size)
            .context("decryption failed")?;
    } else {
        encrypt_stream(stdin, stdout, &password, &profile, args.size)
            .context("encryption failed")?;
    }

    Ok(())
}
