use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

use etcrab::config::cli::{Cli, Command};
use etcrab::config::registry::{ConnectionRecord, Registry};
use etcrab::{
    BackupCodec, ClientPool, EtcdDialer, KvGateway, Snapshot, TransferEngine, TransferRequest,
};

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

type CommandResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::load();
    init_tracing(&cli);

    let registry = match Registry::load(&cli.registry_file).await {
        Ok(registry) => registry,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };

    let pool = Arc::new(ClientPool::new(Arc::new(EtcdDialer)));
    let gateway = Arc::new(KvGateway::new(pool.clone()));

    let result = run(&cli.command, &registry, &gateway).await;

    // Stale clients must not outlive the process.
    pool.evict_all().await;

    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_new(cli.log_level.as_str()).unwrap();
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// -----------------------------------------------------------------------------
// ----- Dispatch --------------------------------------------------------------

async fn run(command: &Command, registry: &Registry, gateway: &Arc<KvGateway>) -> CommandResult {
    match command {
        Command::List { conn, prefix } => {
            let conn = registry.get(*conn)?;
            let keys = gateway.list_keys(conn, prefix).await?;
            print_json(&json!({ "keys": keys }))
        }

        Command::Get { conn, key } => {
            let conn = registry.get(*conn)?;
            let key = normalize_key(key)?;
            let raw = gateway.get_value(conn, &key).await?;
            let value = serde_json::from_str::<serde_json::Value>(&raw)
                .unwrap_or(serde_json::Value::String(raw));
            print_json(&json!({ "key": key, "value": value }))
        }

        Command::Set { conn, key, value } => {
            let conn = registry.get(*conn)?;
            require_writable(conn)?;
            let key = normalize_key(key)?;
            gateway.set_value(conn, &key, value).await?;
            print_json(&json!({ "status": "success", "key": key }))
        }

        Command::Del { conn, key } => {
            let conn = registry.get(*conn)?;
            require_writable(conn)?;
            let key = normalize_key(key)?;
            gateway.delete_key(conn, &key).await?;
            print_json(&json!({ "status": "success", "key": key }))
        }

        Command::Test { conn } => {
            let conn = registry.get(*conn)?;
            gateway.test_connection(conn).await?;
            print_json(&json!({
                "status": "success",
                "connection": conn.name,
                "description": conn.description,
            }))
        }

        Command::Transfer {
            source,
            target,
            keys,
            prefix,
            overwrite,
            key_mapping,
            source_prefix,
            target_prefix,
        } => {
            let source = registry.get(*source)?;
            let target = registry.get(*target)?;
            require_writable(target)?;

            let request = TransferRequest {
                keys: keys.clone(),
                prefix: prefix.clone(),
                overwrite: *overwrite,
                key_mapping: *key_mapping,
                source_prefix: source_prefix.clone(),
                target_prefix: target_prefix.clone(),
            };

            let engine = TransferEngine::new(gateway.clone());
            let outcome = engine.transfer(source, target, &request).await?;
            print_json(&json!({ "status": classify(outcome.is_clean()), "outcome": outcome }))
        }

        Command::Copy {
            source,
            target,
            key,
            target_key,
            overwrite,
        } => {
            let source = registry.get(*source)?;
            let target = registry.get(*target)?;
            require_writable(target)?;

            let target_key = target_key.clone().unwrap_or_else(|| key.clone());
            let engine = TransferEngine::new(gateway.clone());
            let value = engine
                .copy_key(source, target, key, &target_key, *overwrite)
                .await?;
            print_json(&json!({
                "status": "success",
                "source_key": key,
                "target_key": target_key,
                "value": value,
            }))
        }

        Command::Export { conn, prefix, out } => {
            let conn = registry.get(*conn)?;
            let codec = BackupCodec::new(gateway.clone());
            let snapshot = codec.export(conn, prefix).await?;

            let path = out
                .clone()
                .unwrap_or_else(|| default_backup_path(&snapshot));
            tokio::fs::write(&path, serde_json::to_vec_pretty(&snapshot)?).await?;
            print_json(&json!({
                "status": "success",
                "file": path.display().to_string(),
                "keys": snapshot.data.len(),
            }))
        }

        Command::Import {
            conn,
            file,
            overwrite,
        } => {
            let conn = registry.get(*conn)?;
            require_writable(conn)?;

            let raw = tokio::fs::read_to_string(file).await?;
            let snapshot: Snapshot = serde_json::from_str(&raw)?;

            let codec = BackupCodec::new(gateway.clone());
            let outcome = codec.import(conn, &snapshot.data, *overwrite).await;
            print_json(&json!({ "status": classify(outcome.is_clean()), "outcome": outcome }))
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Private Utils ---------------------------------------------------------

/// etcd keys conventionally start with a single slash; accept both forms.
fn normalize_key(raw: &str) -> Result<String, Box<dyn std::error::Error>> {
    let bare = raw.strip_prefix('/').unwrap_or(raw);
    if bare.is_empty() {
        return Err("key is required".into());
    }
    Ok(format!("/{bare}"))
}

/// Read-only enforcement lives here, upstream of the gateway.
fn require_writable(conn: &ConnectionRecord) -> Result<(), Box<dyn std::error::Error>> {
    if conn.read_only {
        return Err(format!("connection '{}' is read-only", conn.name).into());
    }
    Ok(())
}

fn classify(clean: bool) -> &'static str {
    if clean { "success" } else { "partial_success" }
}

fn default_backup_path(snapshot: &Snapshot) -> PathBuf {
    PathBuf::from(format!(
        "etcd-backup-{}-{}.json",
        snapshot.connection_name,
        snapshot.export_time.format("%Y%m%d-%H%M%S")
    ))
}

fn print_json(value: &serde_json::Value) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
