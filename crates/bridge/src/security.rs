use anyhow::{Context as AnyhowContext, Result};
use std::net::SocketAddr;

/// Resolves `bind:port` and refuses anything that is not loopback.
///
/// The bridge can start and stop processes and write project files, so it never listens on a
/// routable interface.
pub async fn resolve_loopback_bind_addr(bind: &str, port: u16) -> Result<SocketAddr> {
    let target = format!("{bind}:{port}");
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&target)
        .await
        .with_context(|| format!("Failed to resolve bind address: {target}"))?
        .collect();

    if addrs.is_empty() {
        anyhow::bail!("Bind address resolved to zero socket addrs: {target}")
    }
    enforce_loopback(&target, &addrs)?;
    choose_preferred_bind_addr(&addrs)
        .with_context(|| format!("No usable bind address for {target}"))
}

fn enforce_loopback(target: &str, addrs: &[SocketAddr]) -> Result<()> {
    if addrs.iter().any(|addr| !addr.ip().is_loopback()) {
        anyhow::bail!("Refusing to bind the bridge to non-loopback address: {target}")
    }
    Ok(())
}

fn choose_preferred_bind_addr(addrs: &[SocketAddr]) -> Option<SocketAddr> {
    addrs
        .iter()
        .copied()
        .find(SocketAddr::is_ipv4)
        .or_else(|| addrs.first().copied())
}
