use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::Parser;
use cli::{Args, Commands};
use error::{CliError, CliResult};
use logging::setup_logging;
use modreg_config::{find_workspace_dir, resolve_registries};
use modreg_core::{add_module, inspect_archive};
use modreg_dl::{http_client::configure_http_client, Fetcher};
use modreg_registry::{refresh_module_integrity, resolve_version};
use modreg_utils::file_integrity;
use nu_ansi_term::Color::{Cyan, Green};
use serde_json::json;
use tracing::{debug, info};
use ureq::{
    http::{HeaderMap, HeaderName, HeaderValue},
    Proxy,
};
use utils::{print_json, set_color, Colored};

mod cli;
mod error;
mod logging;
mod utils;

/// Relative `--dir` values are taken from `cwd` so that the workspace root,
/// and with it `%workspace%`, is always absolute.
fn workspace_start(dir: Option<String>, cwd: &Path) -> PathBuf {
    match dir {
        Some(dir) => cwd.join(dir),
        None => cwd.to_path_buf(),
    }
}

fn workspace_root(dir: Option<String>) -> CliResult<PathBuf> {
    let cwd = env::current_dir().map_err(CliError::CurrentDir)?;
    let root = find_workspace_dir(&workspace_start(dir, &cwd))?;
    debug!("workspace root: {}", root.display());
    Ok(root)
}

fn read_archive(archive: &str) -> CliResult<Vec<u8>> {
    if archive.contains("://") {
        return Fetcher::new()
            .fetch_bytes(archive)?
            .ok_or_else(|| {
                CliError::NotFound {
                    url: archive.to_string(),
                }
            });
    }

    fs::read(archive).map_err(|source| {
        CliError::Read {
            path: PathBuf::from(archive),
            source,
        }
    })
}

fn parse_headers(headers: &[String]) -> CliResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for header in headers {
        let invalid = || {
            CliError::InvalidHeader {
                header: header.clone(),
            }
        };
        let (name, value) = header.split_once(':').ok_or_else(invalid)?;
        let name = HeaderName::try_from(name.trim()).map_err(|_| invalid())?;
        let value = HeaderValue::try_from(value.trim()).map_err(|_| invalid())?;
        map.append(name, value);
    }
    Ok(map)
}

fn configure_client(args: &Args) -> CliResult<()> {
    let proxy = args
        .proxy
        .as_deref()
        .map(|proxy| {
            Proxy::new(proxy).map_err(|source| {
                CliError::Proxy {
                    proxy: proxy.to_string(),
                    source,
                }
            })
        })
        .transpose()?;
    let user_agent = args.user_agent.clone();
    let timeout = args.timeout.map(Duration::from_secs);
    let headers = args.header.as_deref().map(parse_headers).transpose()?;

    configure_http_client(|config| {
        if proxy.is_some() {
            config.proxy = proxy;
        }
        if let Some(user_agent) = user_agent {
            config.user_agent = Some(user_agent);
        }
        if timeout.is_some() {
            config.timeout = timeout;
        }
        if headers.is_some() {
            config.headers = headers;
        }
    });
    Ok(())
}

async fn handle_cli() -> CliResult<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        set_color(false);
    }

    configure_client(&args)?;

    match args.command {
        Commands::Registries {
            dir,
        } => {
            let root = workspace_root(dir)?;
            let registries = resolve_registries(&root)?;
            if args.json {
                print_json(&registries)?;
            } else {
                for registry in registries {
                    info!("{registry}");
                }
            }
        }
        Commands::Resolve {
            module,
            dir,
            registry,
        } => {
            let registries = if registry.is_empty() {
                resolve_registries(&workspace_root(dir)?)?
            } else {
                registry
            };
            let resolved = resolve_version(&module, &registries, Arc::new(Fetcher::new())).await?;
            if args.json {
                print_json(&resolved)?;
            } else {
                info!(
                    "{}@{} ({})",
                    module,
                    Colored(Green, &resolved.version),
                    Colored(Cyan, &resolved.registry)
                );
            }
        }
        Commands::Inspect {
            archive,
            strip_prefix,
        } => {
            let bytes = read_archive(&archive)?;
            let inspected = inspect_archive(&bytes, strip_prefix.as_deref())?;
            if args.json {
                print_json(&json!({
                    "integrity": inspected.integrity,
                    "manifest_path": inspected.manifest_path,
                    "module": inspected.manifest,
                }))?;
            } else {
                let manifest = &inspected.manifest;
                info!("integrity: {}", Colored(Cyan, &inspected.integrity));
                info!("manifest: {}", inspected.manifest_path);
                info!(
                    "module: {}@{} (compatibility level {})",
                    Colored(Green, &manifest.name),
                    manifest.version.as_deref().unwrap_or("<unset>"),
                    manifest.compatibility_level
                );
                for dep in &manifest.deps {
                    info!("  bazel_dep {}@{}", dep.name, dep.version);
                }
            }
        }
        Commands::Integrity {
            files,
        } => {
            let mut integrities = Vec::with_capacity(files.len());
            for file in files {
                let integrity = file_integrity(&file)?;
                integrities.push((file, integrity));
            }
            if args.json {
                let map: serde_json::Map<_, _> = integrities
                    .into_iter()
                    .map(|(file, integrity)| (file, json!(integrity)))
                    .collect();
                print_json(&map)?;
            } else {
                for (file, integrity) in integrities {
                    info!("{}  {file}", Colored(Cyan, integrity));
                }
            }
        }
        Commands::RefreshIntegrity {
            registry,
            module,
        } => {
            let updated = refresh_module_integrity(Path::new(&registry), &module)?;
            if args.json {
                print_json(&updated)?;
            } else {
                for path in updated {
                    info!("updated {}", path.display());
                }
            }
        }
        Commands::AddModule {
            registry,
            url,
            strip_prefix,
        } => {
            let added = add_module(
                Path::new(&registry),
                &url,
                strip_prefix.as_deref(),
                &Fetcher::new(),
            )?;
            if args.json {
                print_json(&json!({
                    "name": added.name,
                    "version": added.version,
                    "integrity": added.integrity,
                    "path": added.version_dir,
                }))?;
            } else {
                info!(
                    "{}@{} {}",
                    Colored(Green, &added.name),
                    added.version,
                    Colored(Cyan, &added.integrity)
                );
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
