// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Standalone dashboard server for one pack

use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

use packlens::config::AppConfig;
use packlens::Result;

#[derive(Parser, Debug)]
#[command(name = "packlens-web", version, about = "Serve the packlens dashboard for one pack")]
struct Args {
    /// Pack root folder
    #[arg(default_value = ".")]
    pack: PathBuf,

    #[arg(short, long, default_value = "packlens.json")]
    config: PathBuf,

    #[arg(short = 'H', long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Re-walk the pack when files change
    #[arg(short, long)]
    watch: bool,

    #[arg(short, long)]
    verbose: bool,

    /// Open the dashboard in the default browser
    #[arg(long)]
    open: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.web.host = host.clone();
        }
        if let Some(port) = self.port {
            config.web.port = port;
        }
        config.web.watch |= self.watch;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if args.verbose { "debug,tower_http=debug" } else { "info" })
        .with_target(false)
        .init();

    let mut config = AppConfig::load(&args.config)?;
    args.apply(&mut config);

    if args.open {
        let url = format!("http://{}:{}", config.web.host, config.web.port);
        if let Err(e) = open_browser(&url) {
            warn!("Failed to open browser: {}", e);
        }
    }

    packlens::web::start_server(config, args.pack).await
}

fn open_browser(url: &str) -> std::io::Result<()> {
    let (program, prefix): (&str, &[&str]) = if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(target_os = "windows") {
        ("cmd", &["/c", "start"])
    } else {
        ("xdg-open", &[])
    };
    std::process::Command::new(program).args(prefix).arg(url).spawn()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_applied() {
        let args = Args::try_parse_from(["packlens-web", "/packs/castle", "-p", "9000", "--watch"]).unwrap();
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(args.pack, PathBuf::from("/packs/castle"));
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.host, "127.0.0.1");
        assert!(config.web.watch);
    }
}
