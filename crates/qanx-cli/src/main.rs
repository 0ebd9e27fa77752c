//! qanx - offline cheque signer and local ledger operator

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qanx_cli::{
    allocations::{load_allocations, report_csv},
    keys::{load_signing_key, signer_address, write_key_file},
    time::{current_timestamp, format_timestamp, parse_optional_time},
    StateStore,
};
use qanx_core::{
    crypto::generate_signing_key,
    distribution::distribute,
    types::{format_units, hops_from_signed, parse_units},
    Address, Cheque, ChequeDomain, Event, LockTerms, SignedCheque, Timestamp, Token, TokenConfig,
    DECIMALS,
};

/// QANX token tooling
#[derive(Parser)]
#[command(name = "qanx")]
#[command(about = "Cheque signer and local ledger operator for the QANX token")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the ledger state snapshot
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Override the current time (UNIX seconds)
    #[arg(long, global = true)]
    now: Option<Timestamp>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new ledger from a TOML config
    Init {
        #[arg(long)]
        config: PathBuf,

        /// Overwrite existing state
        #[arg(long)]
        force: bool,
    },

    /// Show token metadata and pool status
    Status,

    /// Show balance and lock of an address
    Balance { address: Address },

    /// Transfer unlocked tokens
    Transfer {
        #[arg(long)]
        from: Address,
        to: Address,
        /// Amount in tokens, e.g. 1234.56
        amount: String,
    },

    /// Transfer tokens under a vesting lock
    TransferLocked {
        #[arg(long)]
        from: Address,
        to: Address,
        amount: String,
        /// Hard lock, YYYY-MM-DD or UNIX seconds
        #[arg(long)]
        hardlock: String,
        /// Soft lock, YYYY-MM-DD or UNIX seconds
        #[arg(long)]
        softlock: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        hops: i64,
    },

    /// Set an allowance
    Approve {
        #[arg(long)]
        owner: Address,
        spender: Address,
        amount: String,
    },

    /// Release vested tokens
    Unlock { address: Address },

    /// Encash a signed cheque from a JSON file
    Encash {
        #[arg(long)]
        cheque: PathBuf,
    },

    /// Hand cheque signing authority to a new address
    SetSigner {
        #[arg(long)]
        caller: Address,
        new_signer: Address,
    },

    /// Pay a CSV list of allocations
    Distribute {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        csv: PathBuf,
    },

    /// Sign a cheque offline
    SignCheque {
        chain_id: u64,
        contract: Address,
        beneficiary: Address,
        /// Amount in tokens, e.g. 1234.56
        amount: String,
        /// Hard lock, YYYY-MM-DD or UNIX seconds
        #[arg(long)]
        hardlock: Option<String>,
        /// Soft lock, YYYY-MM-DD or UNIX seconds
        #[arg(long)]
        softlock: Option<String>,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        hops: i64,
        /// File holding the hex signing key
        #[arg(long)]
        key_file: Option<PathBuf>,
        /// Write the cheque here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate a new signing key
    Keygen {
        /// Write the key to this file instead of printing it
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the address of a signing key
    Address {
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so cheque JSON on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qanx=info,qanx_core=info,qanx_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let store = StateStore::new(cli.state.clone().unwrap_or_else(StateStore::default_path));
    let now = cli.now.unwrap_or_else(current_timestamp);

    match cli.command {
        Commands::Init { config, force } => {
            let config = TokenConfig::load(&config)
                .with_context(|| format!("loading config {:?}", config))?;
            let token = Token::genesis(&config)?;
            store.init(&token, force)?;

            println!("\n=== Ledger Initialized ===\n");
            print_metadata(&token);
            info!("State written to {:?}", store.path());
        }

        Commands::Status => {
            let token = store.load()?;
            println!("\n=== Ledger Status ===\n");
            print_metadata(&token);
            println!(
                "Pool balance:    {}",
                format_units(token.balance_of(&token.contract()), token.decimals())
            );
            println!("Cheques encashed: {}", token.encashed_count());
        }

        Commands::Balance { address } => {
            let token = store.load()?;
            let d = token.decimals();

            println!("\n=== {} ===\n", address);
            println!("Balance:    {}", format_units(token.balance_of(&address), d));
            println!(
                "Unlocked:   {}",
                format_units(token.unlocked_balance_of(&address, now), d)
            );
            println!(
                "Locked:     {}",
                format_units(token.locked_balance_of(&address, now), d)
            );
            println!(
                "Unlockable: {}",
                format_units(token.unlockable_balance_of(&address, now), d)
            );
            if let Some(lock) = token.lock_of(&address) {
                println!("\nLock:");
                println!("  Amount:     {}", format_units(lock.token_amount, d));
                println!("  Released:   {}", format_units(lock.released, d));
                println!("  Hard lock:  {}", format_timestamp(lock.hard_lock_until));
                println!("  Soft lock:  {}", format_timestamp(lock.soft_lock_until));
                println!("  Hops left:  {}", lock.allowed_hops);
                if !lock.is_active(now) {
                    println!("  (fully vested)");
                }
            }
        }

        Commands::Transfer { from, to, amount } => {
            let mut token = store.load()?;
            let amount = parse_units(&amount, token.decimals())?;
            let events = token.transfer(from, to, amount, now)?;
            store.save(&token)?;
            print_events(&events)?;
        }

        Commands::TransferLocked {
            from,
            to,
            amount,
            hardlock,
            softlock,
            hops,
        } => {
            let mut token = store.load()?;
            let amount = parse_units(&amount, token.decimals())?;
            let terms = LockTerms::new(
                parse_optional_time(Some(&hardlock))?,
                parse_optional_time(Some(&softlock))?,
                hops_from_signed(hops)?,
            );
            let events = token.transfer_locked(from, to, amount, terms, now)?;
            store.save(&token)?;
            print_events(&events)?;
        }

        Commands::Approve {
            owner,
            spender,
            amount,
        } => {
            let mut token = store.load()?;
            let amount = if amount.eq_ignore_ascii_case("unlimited") {
                qanx_core::UNLIMITED_ALLOWANCE
            } else {
                parse_units(&amount, token.decimals())?
            };
            let events = token.approve(owner, spender, amount)?;
            store.save(&token)?;
            print_events(&events)?;
        }

        Commands::Unlock { address } => {
            let mut token = store.load()?;
            let released = token.unlockable_balance_of(&address, now);
            let events = token.unlock(address, now)?;
            store.save(&token)?;
            println!("Released {}", format_units(released, token.decimals()));
            print_events(&events)?;
        }

        Commands::Encash { cheque } => {
            let content = std::fs::read_to_string(&cheque)
                .with_context(|| format!("reading cheque {:?}", cheque))?;
            let signed: SignedCheque =
                serde_json::from_str(&content).context("parsing cheque JSON")?;

            let mut token = store.load()?;
            let events = token.encash_cheque(&signed, now)?;
            store.save(&token)?;
            print_events(&events)?;
        }

        Commands::SetSigner { caller, new_signer } => {
            let mut token = store.load()?;
            let events = token.set_cheque_signer(caller, new_signer)?;
            store.save(&token)?;
            print_events(&events)?;
        }

        Commands::Distribute { from, csv } => {
            let mut token = store.load()?;
            let allocations = load_allocations(&csv, token.decimals())?;
            if allocations.is_empty() {
                bail!("no allocations in {:?}", csv);
            }

            let report = distribute(&mut token, from, &allocations, now);
            store.save(&token)?;

            print!("{}", report_csv(&report, token.decimals())?);
            eprintln!(
                "{} paid, {} rejected, {} tokens sent",
                report.succeeded(),
                report.failed(),
                format_units(report.total_paid(), token.decimals())
            );
        }

        Commands::SignCheque {
            chain_id,
            contract,
            beneficiary,
            amount,
            hardlock,
            softlock,
            hops,
            key_file,
            output,
        } => {
            if contract.is_zero() {
                bail!("\"{}\" is not a valid contract address", contract);
            }
            if beneficiary.is_zero() {
                bail!("\"{}\" is not a valid beneficiary", beneficiary);
            }

            let amount = parse_units(&amount, DECIMALS)?;
            let terms = LockTerms::new(
                parse_optional_time(hardlock.as_deref())?,
                parse_optional_time(softlock.as_deref())?,
                hops_from_signed(hops)?,
            );

            let key = load_signing_key(key_file.as_deref())?;
            let domain = ChequeDomain::new(chain_id, contract);
            let signed = Cheque::new(beneficiary, amount)
                .with_lock(terms)
                .sign(&key, &domain)?;
            info!(
                "Cheque {} signed by {}",
                signed.id(&domain).short(),
                signer_address(&key)
            );

            let json = serde_json::to_string_pretty(&signed)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    info!("Cheque written to {:?}", path);
                }
                None => println!("{}", json),
            }
        }

        Commands::Keygen { output } => {
            let key = generate_signing_key();
            println!("Address: {}", signer_address(&key));
            match output {
                Some(path) => {
                    write_key_file(&path, &key)?;
                    info!("Key written to {:?}", path);
                }
                None => {
                    println!("Signing key: 0x{}", hex::encode(key.to_bytes()));
                    println!("\n⚠️  Store the signing key securely, then clear your terminal.");
                }
            }
        }

        Commands::Address { key_file } => {
            let key = load_signing_key(key_file.as_deref())?;
            println!("{}", signer_address(&key));
        }
    }

    Ok(())
}

fn print_metadata(token: &Token) {
    println!("Name:            {}", token.name());
    println!("Symbol:          {}", token.symbol());
    println!("Decimals:        {}", token.decimals());
    println!(
        "Total supply:    {}",
        format_units(token.total_supply(), token.decimals())
    );
    println!("Chain ID:        {}", token.chain_id());
    println!("Contract:        {}", token.contract());
    println!("Cheque signer:   {}", token.cheque_signer());
}

fn print_events(events: &[Event]) -> anyhow::Result<()> {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}
