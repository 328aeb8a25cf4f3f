//! omo-secrets - Manage the OhMyOps secrets database from a shell
//!
//! Commands:
//! - init: Create the key file and database if missing
//! - set <PATH> [PASSWORD]: Store an entry (prompts if no password)
//! - get <PATH>: Print an entry's password or a single field
//! - list [PREFIX]: List stored paths
//! - delete <PATH>: Delete an entry
//! - verify: Check the key file's integrity hash
//! - paths: Show where the key file and database live

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use omo_core::{Config, Paths};
use omo_secrets::{keyfile, KeePassProvider, SecretEntry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "omo-secrets")]
#[command(about = "KeePass-backed secrets store for OhMyOps plugins")]
#[command(version)]
#[command(after_help = r#"SECRET PATHS:
    Every secret lives at plugin/environment/entry:
    - git/github/token        GitHub personal access token
    - s3/prod/default         AWS access key (--attr secret_access_key=...)
    - ssh/prod/bastion        SSH private key
    - k8s/staging/admin       Kubernetes bearer token

SECURITY:
    - Database is KDBX4, unlocked by ~/.omo/keys/omo.key (no master password)
    - Password and custom attributes are stored as protected fields
    - Key file and database are created with mode 0600"#)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the key file and an empty database if they do not exist
    Init,

    /// Store an entry (prompts securely if password not provided)
    Set {
        /// Secret path (plugin/environment/entry)
        path: String,
        /// Password (omit for secure hidden prompt)
        password: Option<String>,
        #[arg(long, default_value = "")]
        username: String,
        #[arg(long, default_value = "")]
        url: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Custom attribute as KEY=VALUE (repeatable)
        #[arg(long = "attr", value_parser = parse_attr)]
        attrs: Vec<(String, String)>,
    },

    /// Print an entry's password
    Get {
        /// Don't print trailing newline (useful for piping)
        #[arg(short = 'n')]
        no_newline: bool,
        /// Print this field instead of the password (e.g. UserName, region)
        #[arg(long)]
        field: Option<String>,
        /// Print the whole entry as JSON
        #[arg(long, conflicts_with = "field")]
        json: bool,
        /// Secret path
        path: String,
    },

    /// List stored secret paths (values hidden)
    List {
        /// Filter by prefix (e.g. "git" or "s3/prod")
        prefix: Option<String>,
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Delete an entry permanently
    Delete {
        /// Secret path
        path: String,
    },

    /// Check that the key file is well-formed and its hash matches
    Verify,

    /// Show the key file and database locations
    Paths,
}

fn parse_attr(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {:?}", s)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = Paths::new()?;
    let config = Config::load(&paths.config_file())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Verify) => return cmd_verify(&config, &paths),
        Some(Commands::Paths) => return cmd_paths(&config, &paths),
        _ => {}
    }

    let provider = KeePassProvider::from_config(&config, &paths)
        .context("Failed to open secrets database")?;

    let result = match cli.command {
        Some(Commands::Init) => cmd_init(&provider),
        Some(Commands::Set {
            path,
            password,
            username,
            url,
            notes,
            attrs,
        }) => {
            let entry = SecretEntry {
                title: String::new(),
                username,
                password: String::new(),
                url,
                notes,
                custom_attributes: attrs.into_iter().collect(),
            };
            cmd_set(&provider, &path, password, entry)
        }
        Some(Commands::Get {
            no_newline,
            field,
            json,
            path,
        }) => cmd_get(&provider, &path, field.as_deref(), json, no_newline),
        Some(Commands::List { prefix, json }) => cmd_list(&provider, prefix.as_deref(), json),
        Some(Commands::Delete { path }) => cmd_delete(&provider, &path),
        Some(Commands::Verify) | Some(Commands::Paths) => Ok(()),
        None => {
            // Default to listing secrets
            cmd_list(&provider, None, false)
        }
    };

    let closed = provider.close().context("Failed to flush secrets database");
    finish(result, closed)
}

/// The command's own error wins over a failure to close
fn finish(result: Result<()>, closed: Result<()>) -> Result<()> {
    result.and(closed)
}

/// Bootstrap happens when the provider opens; report where things are
fn cmd_init(provider: &KeePassProvider) -> Result<()> {
    println!("success: Secrets store ready");
    println!("  key file: {}", provider.key_file_path().display());
    println!("  database: {}", provider.database_path().display());
    println!();
    println!("Store secrets with: omo-secrets set <plugin/environment/entry>");
    Ok(())
}

fn cmd_set(
    provider: &KeePassProvider,
    path: &str,
    password: Option<String>,
    mut entry: SecretEntry,
) -> Result<()> {
    entry.password = match password {
        Some(p) => p,
        None => {
            // Prompt for hidden input
            let password = rpassword::prompt_password("Enter password: ")
                .context("Failed to read password")?;

            if password.is_empty() && entry.custom_attributes.is_empty() {
                bail!("Empty password not allowed without --attr");
            }

            password
        }
    };

    provider.put(path, &entry)?;

    println!("success: Secret stored: {}", path);

    Ok(())
}

fn cmd_get(
    provider: &KeePassProvider,
    path: &str,
    field: Option<&str>,
    json: bool,
    no_newline: bool,
) -> Result<()> {
    let entry = provider.get(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    let value = match field {
        Some(name) => match entry.field(name) {
            Some(v) => v.to_string(),
            None => bail!("Field {:?} not set on {}", name, path),
        },
        None => entry.password,
    };

    if no_newline {
        print!("{}", value);
    } else {
        println!("{}", value);
    }

    Ok(())
}

fn cmd_list(provider: &KeePassProvider, prefix: Option<&str>, json: bool) -> Result<()> {
    let paths = provider.list(prefix.unwrap_or(""))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    if paths.is_empty() {
        match prefix {
            Some(prefix) => println!("No secrets found with prefix: {}", prefix),
            None => println!("No secrets stored. Add one with: omo-secrets set <path>"),
        }
        return Ok(());
    }

    println!("Stored Secrets");
    println!();

    for path in &paths {
        println!("  {}", path);
    }

    Ok(())
}

fn cmd_delete(provider: &KeePassProvider, path: &str) -> Result<()> {
    provider.delete(path)?;
    println!("success: Secret deleted: {}", path);
    Ok(())
}

fn cmd_verify(config: &Config, paths: &Paths) -> Result<()> {
    let key_path = config.key_file_path(paths);
    keyfile::verify(&key_path)?;
    println!("success: Key file OK: {}", key_path.display());
    Ok(())
}

fn cmd_paths(config: &Config, paths: &Paths) -> Result<()> {
    println!("key file: {}", config.key_file_path(paths).display());
    println!("database: {}", config.database_path(paths).display());
    println!("config:   {}", paths.config_file().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["omo-secrets", "init"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Init)));

        let cli = Cli::try_parse_from(["omo-secrets", "get", "-n", "git/github/token"]).unwrap();
        if let Some(Commands::Get {
            path,
            no_newline,
            field,
            json,
        }) = cli.command
        {
            assert_eq!(path, "git/github/token");
            assert!(no_newline);
            assert!(field.is_none());
            assert!(!json);
        } else {
            panic!("Expected Get command");
        }

        assert!(Cli::try_parse_from([
            "omo-secrets",
            "get",
            "--json",
            "--field",
            "URL",
            "a/b/c"
        ])
        .is_err());
    }

    #[test]
    fn test_cli_set_attrs() {
        let cli = Cli::try_parse_from([
            "omo-secrets",
            "set",
            "s3/prod/default",
            "--username",
            "AKIAEXAMPLE",
            "--attr",
            "region=eu-west-1",
            "--attr",
            "endpoint=https://s3.example.com/?a=b",
            "wJalrXUtnFEMI",
        ])
        .unwrap();
        if let Some(Commands::Set {
            path,
            password,
            username,
            attrs,
            ..
        }) = cli.command
        {
            assert_eq!(path, "s3/prod/default");
            assert_eq!(password.as_deref(), Some("wJalrXUtnFEMI"));
            assert_eq!(username, "AKIAEXAMPLE");
            assert_eq!(
                attrs,
                vec![
                    ("region".to_string(), "eu-west-1".to_string()),
                    (
                        "endpoint".to_string(),
                        "https://s3.example.com/?a=b".to_string()
                    ),
                ]
            );
        } else {
            panic!("Expected Set command");
        }
    }

    #[test]
    fn test_finish_reports_command_error_first() {
        let err = finish(
            Err(anyhow::anyhow!("entry not found")),
            Err(anyhow::anyhow!("flush failed")),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "entry not found");

        let err = finish(Ok(()), Err(anyhow::anyhow!("flush failed"))).unwrap_err();
        assert_eq!(err.to_string(), "flush failed");

        assert!(finish(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn test_parse_attr() {
        assert_eq!(
            parse_attr("k=v=w"),
            Ok(("k".to_string(), "v=w".to_string()))
        );
        assert!(parse_attr("novalue").is_err());
        assert!(parse_attr("=v").is_err());
    }
}
