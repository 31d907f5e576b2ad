//! Interactive shell over an in-process verna cluster.
//!
//! Builds one [`ReplicaStore`] per configured node, wires them to a
//! [`Coordinator`] through a consistent hash ring, and prompts for
//! operations:
//!
//! - `PUT <key> <value>` — writes the value, using the versions currently
//!   readable for the key as the causal context.
//! - `GET <key>` — prints every retained version of the key; more than one
//!   line means the key has unresolved concurrent writes.
//! - `RESOLVE <key>` — like `GET`, but reduces concurrent versions with a
//!   deterministic demo resolver (largest value bytes win).

use argh::FromArgs;
use eyre::{bail, Context};
use std::{
    fs,
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};
use verna::{
    config::Config, ClientKey, Coordinator, HashRing, ReplicaStore, VernaError, VersionVector,
    VersionedValue,
};

#[derive(FromArgs)]
/// Interactive verna cluster shell
struct Args {
    #[argh(positional)]
    config_file: PathBuf,
}

fn main() -> eyre::Result<()> {
    if let Err(err) = set_up_logger() {
        eprintln!(
            "{:?}",
            eyre::Error::new(err).wrap_err("failed to set up logger")
        );
    }

    let args: Args = argh::from_env();

    let config: Config = serde_yaml::from_str(
        &fs::read_to_string(&args.config_file).context("failed to read config file")?,
    )
    .context("failed to parse config file")?;

    let mut ring = HashRing::with_virtual_entries(
        config.partitioning.replication_factor,
        config.partitioning.virtual_entry_num,
    );
    for node_id in &config.nodes {
        ring.insert_node(node_id);
    }

    let mut coordinator = Coordinator::new(ring);
    for node_id in &config.nodes {
        coordinator.add_replica(Arc::new(ReplicaStore::new(node_id.as_str())));
    }

    run_interactive(&coordinator, &mut io::stdin().lock(), &mut io::stdout())
}

fn run_interactive(
    coordinator: &Coordinator<HashRing>,
    stdin: &mut dyn BufRead,
    stdout: &mut dyn Write,
) -> eyre::Result<()> {
    loop {
        write!(stdout, "kvs> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            return Ok(());
        }

        let mut parts = line.split_whitespace();
        let command = match parts.next() {
            Some(command) => command,
            None => continue,
        };

        let result = match command.to_uppercase().as_str() {
            "PUT" => handle_put(coordinator, &mut parts, stdout),
            "GET" => handle_get(coordinator, &mut parts, stdout),
            "RESOLVE" => handle_resolve(coordinator, &mut parts, stdout),
            "EXIT" | "QUIT" => return Ok(()),
            other => {
                writeln!(stdout, "unknown command `{}`", other)?;
                continue;
            }
        };
        if let Err(err) = result {
            log::error!("{} failed: {:?}", command, err);
            writeln!(stdout, "error: {}", err)?;
        }
    }
}

fn handle_put(
    coordinator: &Coordinator<HashRing>,
    parts: &mut dyn Iterator<Item = &str>,
    stdout: &mut dyn Write,
) -> eyre::Result<()> {
    let key: ClientKey = match parts.next() {
        Some(key) => key.into(),
        None => bail!("usage: PUT <key> <value>"),
    };
    let value = match parts.next() {
        Some(value) => value.to_owned(),
        None => bail!("usage: PUT <key> <value>"),
    };

    // A real client carries the vector of the version it last read. The
    // shell approximates that context with one of the currently readable
    // versions, falling back to the empty history for a fresh key.
    let known_version = coordinator
        .get(&key)
        .into_iter()
        .next()
        .map(|current| current.vector().clone())
        .unwrap_or_else(VersionVector::new);

    let written = coordinator.put(&key, value.as_bytes(), &known_version)?;
    writeln!(stdout, "PUT succeeded, version {:?}", written.vector())?;
    Ok(())
}

fn handle_get(
    coordinator: &Coordinator<HashRing>,
    parts: &mut dyn Iterator<Item = &str>,
    stdout: &mut dyn Write,
) -> eyre::Result<()> {
    let key: ClientKey = match parts.next() {
        Some(key) => key.into(),
        None => bail!("usage: GET <key>"),
    };

    let versions = coordinator.get(&key);
    if versions.is_empty() {
        writeln!(stdout, "{}", VernaError::KeyDoesNotExist)?;
        return Ok(());
    }
    if versions.len() > 1 {
        writeln!(stdout, "{} concurrent versions:", versions.len())?;
    }
    for version in versions {
        writeln!(
            stdout,
            "{} {:?}",
            String::from_utf8_lossy(version.value()),
            version.vector()
        )?;
    }
    Ok(())
}

fn handle_resolve(
    coordinator: &Coordinator<HashRing>,
    parts: &mut dyn Iterator<Item = &str>,
    stdout: &mut dyn Write,
) -> eyre::Result<()> {
    let key: ClientKey = match parts.next() {
        Some(key) => key.into(),
        None => bail!("usage: RESOLVE <key>"),
    };

    let resolver = |mut values: Vec<VersionedValue>| {
        values.sort_by(|a, b| a.value().cmp(b.value()));
        values
            .pop()
            .ok_or_else(|| eyre::eyre!("resolver invoked without versions"))
    };

    match coordinator.get_resolved(&key, &resolver)? {
        Some(resolved) => writeln!(
            stdout,
            "{} {:?}",
            String::from_utf8_lossy(resolved.value()),
            resolved.vector()
        )?,
        None => writeln!(stdout, "{}", VernaError::KeyDoesNotExist)?,
    }
    Ok(())
}

fn set_up_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
