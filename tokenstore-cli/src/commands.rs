//! Command handlers.

use std::collections::BTreeMap;
use std::io::Write;

use eyre::WrapErr;
use serde::Serialize;
use tokenstore_core::{Handle, MasterKey, ObjectBlob, ObjectStore, StoreConfig};
use zeroize::Zeroizing;

use crate::{Cli, Command};

#[derive(Debug, Serialize)]
struct InitReport {
    recovery: String,
    new_database: bool,
    version: u32,
}

/// Opens the store described by `cli` and runs its command, writing the
/// result to `out`.
pub fn run(cli: &Cli, out: &mut dyn Write) -> eyre::Result<()> {
    let store = open_store(cli)?;

    match &cli.command {
        Command::Init => {
            let report = InitReport {
                recovery: store.recovery().to_string(),
                new_database: store.is_new_database(),
                version: store.database_version()?,
            };
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
        Command::GetInternal { id } => {
            let blob = store.get_internal(*id)?.map(hex::encode);
            serde_json::to_writer(&mut *out, &blob)?;
            writeln!(out)?;
        }
        Command::SetInternal { id, hex } => {
            let blob = decode_hex(hex)?;
            store.set_internal(*id, &blob)?;
        }
        Command::Insert { private, hex } => {
            let blob = ObjectBlob::new(*private, decode_hex(hex)?.to_vec());
            let handle = store.insert(&blob)?;
            tracing::info!(%handle, private, "inserted object");
            writeln!(out, "{handle}")?;
        }
        Command::List { private } => {
            let objects = if *private {
                store.load_private()?
            } else {
                store.load_public()?
            };
            let listing: BTreeMap<u32, String> = objects
                .iter()
                .map(|(handle, blob)| (handle.get(), hex::encode(&blob.payload)))
                .collect();
            serde_json::to_writer_pretty(&mut *out, &listing)?;
            writeln!(out)?;
        }
        Command::Delete { handle } => {
            let handle = Handle::new(*handle);
            // Handles are only known to the store once loaded. Anything else
            // would resolve to an internal blob.
            let mut found = store.load_public()?.contains_key(&handle);
            if !found && store.has_encryption_key()? {
                found = store.load_private()?.contains_key(&handle);
            }
            if !found {
                eyre::bail!("no readable object with handle {handle}");
            }
            store.delete(handle)?;
            tracing::info!(%handle, "deleted object");
        }
        Command::Wipe => {
            store.delete_all_objects()?;
        }
    }
    Ok(())
}

fn open_store(cli: &Cli) -> eyre::Result<ObjectStore> {
    let mut config = StoreConfig::from_path_str(&cli.store);
    if let Some(key_hex) = &cli.key_hex {
        let key = decode_hex(key_hex).wrap_err("invalid --key-hex")?;
        config = config.with_encryption_key(MasterKey::from_slice(&key)?);
    }
    let store = ObjectStore::open(config)
        .wrap_err_with(|| format!("failed to open store at {}", cli.store))?;
    tracing::debug!(recovery = %store.recovery(), "store opened");
    Ok(store)
}

fn decode_hex(input: &str) -> eyre::Result<Zeroizing<Vec<u8>>> {
    let bytes = hex::decode(input.trim()).wrap_err("expected hex input")?;
    Ok(Zeroizing::new(bytes))
}
