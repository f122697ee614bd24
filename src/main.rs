//! sonicwire - command-line front end
//!
//! Opens a session in the requested channel, runs a single command and
//! prints its reply.

use anyhow::{anyhow, bail, Context};
use sonicwire::{Action, Channel, Client, ClientConfig, Modifiers};
use std::time::Duration;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

/// Command-line configuration
struct Config {
    /// Connection settings, starting from the SONIC_* environment
    client: ClientConfig,
    /// LIMIT/OFFSET/LANG for commands that take them
    modifiers: Modifiers,
    /// Log protocol traffic (TRACE) instead of warnings only
    verbose: bool,
    /// Channel to start
    channel: Channel,
    /// Command name and its arguments
    command: Vec<String>,
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut client = ClientConfig::from_env();
        let mut modifiers = Modifiers::default();
        let mut verbose = false;
        let mut positional = Vec::new();

        let args: Vec<String> = std::env::args().collect();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    client.host = option_value(&args, i, "--host");
                    i += 2;
                }
                "--port" | "-p" => {
                    client.port = parse_or_exit(&option_value(&args, i, "--port"), "port number");
                    i += 2;
                }
                "--password" | "-a" => {
                    client.password = option_value(&args, i, "--password");
                    i += 2;
                }
                "--max-connections" => {
                    client.max_connections =
                        parse_or_exit(&option_value(&args, i, "--max-connections"), "count");
                    i += 2;
                }
                "--timeout" => {
                    let secs: u64 = parse_or_exit(&option_value(&args, i, "--timeout"), "seconds");
                    client = client.timeout(Duration::from_secs(secs));
                    i += 2;
                }
                "--limit" => {
                    modifiers = modifiers.limit(parse_or_exit(&option_value(&args, i, "--limit"), "limit"));
                    i += 2;
                }
                "--offset" => {
                    modifiers =
                        modifiers.offset(parse_or_exit(&option_value(&args, i, "--offset"), "offset"));
                    i += 2;
                }
                "--lang" => {
                    modifiers = modifiers.locale(option_value(&args, i, "--lang"));
                    i += 2;
                }
                "--verbose" | "-v" => {
                    verbose = true;
                    i += 1;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-V" => {
                    println!("sonicwire version {}", sonicwire::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    positional.push(args[i].clone());
                    i += 1;
                }
            }
        }

        if positional.len() < 2 {
            eprintln!("Error: expected <CHANNEL> <COMMAND>");
            print_help();
            std::process::exit(1);
        }

        let channel = Channel::parse(&positional[0]).unwrap_or_else(|| {
            eprintln!("Error: unknown channel '{}'", positional[0]);
            std::process::exit(1);
        });

        Config {
            client,
            modifiers,
            verbose,
            channel,
            command: positional.split_off(1),
        }
    }
}

fn option_value(args: &[String], i: usize, name: &str) -> String {
    match args.get(i + 1) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Error: {} requires a value", name);
            std::process::exit(1);
        }
    }
}

fn parse_or_exit<T: std::str::FromStr>(value: &str, what: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid {}: {}", what, value);
        std::process::exit(1);
    })
}

fn print_help() {
    println!(
        r#"
sonicwire - Sonic search engine channel client

USAGE:
    sonicwire [OPTIONS] <CHANNEL> <COMMAND> [ARGS...]

CHANNELS:
    search     QUERY, SUGGEST, LIST, PING, HELP, QUIT
    ingest     PUSH, POP, COUNT, FLUSHB, FLUSHC, FLUSHO, PING, HELP, QUIT
    control    TRIGGER, INFO, PING, HELP, QUIT

OPTIONS:
    -h, --host <HOST>            Engine host (default: $SONIC_HOST or localhost)
    -p, --port <PORT>            Engine port (default: $SONIC_PORT or 1491)
    -a, --password <PASSWORD>    Channel password (default: $SONIC_PASSWORD)
        --max-connections <N>    Pool size
        --timeout <SECS>         Connect/read/write timeout
        --limit <N>              LIMIT(n) for query, suggest, list
        --offset <N>             OFFSET(n) for query, list
        --lang <CODE>            LANG(code) for query, push
    -v, --verbose                Log protocol traffic
    -V, --version                Print version information
        --help                   Print this help message

EXAMPLES:
    sonicwire ingest push messages user:1 conv:71 "The quick brown fox"
    sonicwire control trigger consolidate
    sonicwire --limit 10 search query messages user:1 quick
    sonicwire ingest count messages user:1
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(if config.verbose { Level::TRACE } else { Level::WARN })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!(addr = %config.client.address(), channel = %config.channel, "Starting session");
    let client = Client::create(config.client.clone(), config.channel)
        .await
        .with_context(|| format!("cannot start {} channel", config.channel))?;

    let output = run_command(&client, &config.command, config.modifiers.clone()).await?;
    println!("{}", output);

    client.close().await;
    Ok(())
}

/// Runs one command and renders its reply for the terminal.
async fn run_command(client: &Client, command: &[String], modifiers: Modifiers) -> anyhow::Result<String> {
    let name = command[0].to_ascii_lowercase();
    let args: Vec<&str> = command[1..].iter().map(String::as_str).collect();
    let arg = |n: usize| {
        args.get(n)
            .copied()
            .ok_or_else(|| anyhow!("{} expects at least {} argument(s)", name, n + 1))
    };
    let rest = |n: usize| args.get(n..).map(|r| r.join(" ")).unwrap_or_default();

    let output = match name.as_str() {
        "query" => client
            .query(arg(0)?, arg(1)?, &rest(2), modifiers)
            .await?
            .join("\n"),
        "suggest" => client
            .suggest(arg(0)?, arg(1)?, arg(2)?, modifiers)
            .await?
            .join("\n"),
        "list" => client
            .list(arg(0)?, args.get(1).copied(), modifiers)
            .await?
            .join("\n"),
        "ping" => client.ping().await?,
        "help" => client.help(args.first().copied().unwrap_or("commands")).await?,
        "quit" => client.quit().await?,
        "push" => {
            let text = rest(3);
            client
                .push(arg(0)?, arg(1)?, arg(2)?, &text, modifiers.locale.as_deref())
                .await?
        }
        "pop" => client
            .pop(arg(0)?, arg(1)?, arg(2)?, &rest(3))
            .await?
            .to_string(),
        "flushc" => client.flushc(arg(0)?).await?.to_string(),
        "flushb" => client.flushb(arg(0)?, arg(1)?).await?.to_string(),
        "flusho" => client.flusho(arg(0)?, arg(1)?, arg(2)?).await?.to_string(),
        "count" => client
            .count(arg(0)?, args.get(1).copied(), args.get(2).copied())
            .await?
            .to_string(),
        "trigger" => {
            let action = match args.first().map(|a| a.to_ascii_lowercase()).as_deref() {
                None => None,
                Some("consolidate") => Some(Action::Consolidate),
                Some("backup") => Some(Action::Backup(arg(1)?.to_string())),
                Some("restore") => Some(Action::Restore(arg(1)?.to_string())),
                Some(other) => bail!("unknown trigger action '{}'", other),
            };
            client.trigger(action.as_ref()).await?
        }
        "info" => client
            .info()
            .await?
            .into_iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join("\n"),
        other => bail!("unknown command '{}'", other),
    };

    Ok(output)
}
