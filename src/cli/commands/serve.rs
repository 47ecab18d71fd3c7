//! Web server command.

use console::style;

use crate::cli::helpers::open_database;
use crate::config::Settings;

const DEFAULT_PORT: u16 = 3030;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let addr = parse_bind_address(bind);

    println!("{} Preparing database...", style("→").cyan());
    if let Err(e) = open_database(settings).await {
        eprintln!("  {} Database setup failed: {}", style("✗").red(), e);
        return Err(e);
    }
    println!("  {} Database ready", style("✓").green());

    println!("{} Starting sciharvest server at http://{}", style("→").cyan(), addr);
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &addr).await
}

/// Normalize a bind address that can be:
/// - Just a port: "3030" -> 127.0.0.1:3030
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3030
/// - Host and port: "0.0.0.0:3030" -> 0.0.0.0:3030
fn parse_bind_address(bind: &str) -> String {
    if let Ok(port) = bind.parse::<u16>() {
        return format!("127.0.0.1:{}", port);
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if port_str.parse::<u16>().is_ok() {
            return format!("{}:{}", host, port_str);
        }
    }

    format!("{}:{}", bind, DEFAULT_PORT)
}
