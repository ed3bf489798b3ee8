use std::time::Instant;

use anyhow::{Context, Result};
use url::Url;

use voodoo_player::stream::availability::AVAILABLE_STATUS;
use voodoo_player::{AvailabilityCheck, HttpAvailabilityCheck};

/// Run one HEAD check. Returns `true` when the URL answered 200.
pub async fn cmd_probe(input: &str) -> Result<bool> {
    let url = Url::parse(input).with_context(|| format!("not a URL: {input}"))?;
    let checker = HttpAvailabilityCheck::new()?;

    println!("📡 Checking: {url}");
    let start = Instant::now();

    let available = match checker.check(&url).await {
        Ok(status) => {
            println!("   Status: {status}");
            status == AVAILABLE_STATUS
        }
        Err(e) => {
            println!("   Error: {e}");
            false
        }
    };
    println!("   Time: {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);

    if available {
        println!("🔴 LIVE");
    } else {
        println!("⏳ Not available");
    }

    Ok(available)
}
