use anyhow::{Context, Result};
use url::Url;

use voodoo_player::{Configuration, StreamDescriptor};

pub fn cmd_resolve(
    input: &str,
    preview: Option<&str>,
    json: bool,
    config: &Configuration,
) -> Result<()> {
    let url = Url::parse(input).with_context(|| format!("not a URL: {input}"))?;
    let placeholder = preview
        .map(Url::parse)
        .transpose()
        .context("invalid --preview URL")?;

    let descriptor = StreamDescriptor::with_placeholder(&url, placeholder, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    println!("Type: {}", descriptor.stream_type);
    println!("User: {}", descriptor.user_id);
    println!("Stream: {}", descriptor.id);
    println!("Canonical: {}", descriptor.canonical_url);
    if let Some(ref placeholder) = descriptor.placeholder_url {
        println!("Placeholder: {placeholder}");
    }

    Ok(())
}
