use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::TransformConfig;
use crate::eligibility::{EligibilityGate, resolve_content_type};
use crate::query::parse_query;
use crate::transform::TransformEngine;

/// Split a raw query string into decoded key/value pairs. Later duplicates
/// win, matching how the HTTP extractor builds its map.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(raw)
}

fn default_output_path(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    input.with_file_name(format!("{}-transformed.{}", stem, extension))
}

/// Run one transformation on a local file, the same way the server would.
pub async fn handle_transform_command(
    input: PathBuf,
    query: String,
    output: Option<PathBuf>,
    config: TransformConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        eprintln!("Error: Input file not found: {:?}", input);
        std::process::exit(1);
    }

    let params = parse_query_string(&query);
    let spec = parse_query(&params)?;
    println!("Parameters: {}", spec.to_query_string());

    let bytes = tokio::fs::read(&input).await?;
    let key = input.to_string_lossy();
    let content_type = resolve_content_type(None, &key);
    println!(
        "Input: {:?} ({} bytes, {})",
        input,
        bytes.len(),
        content_type.as_deref().unwrap_or("unknown type")
    );

    if !EligibilityGate::new().can_process(&bytes, content_type.as_deref()) {
        let output = output.unwrap_or_else(|| {
            let extension = input.extension().and_then(|s| s.to_str()).unwrap_or("bin");
            default_output_path(&input, extension)
        });
        tokio::fs::write(&output, &bytes).await?;
        println!("Not processable, original copied to {:?}", output);
        return Ok(());
    }

    let engine = TransformEngine::with_default_analyzer(config);
    let result = tokio::task::spawn_blocking(move || engine.transform(&bytes, &spec)).await??;

    let output =
        output.unwrap_or_else(|| default_output_path(&input, result.info.format.extension()));
    tokio::fs::write(&output, &result.bytes).await?;

    let original = &result.original;
    println!(
        "Original: {}x{} {} (orientation {}, ICC profile: {})",
        original.width,
        original.height,
        original.format.as_str(),
        original.orientation,
        if original.has_icc_profile { "yes" } else { "no" }
    );
    println!(
        "Output: {}x{} {} ({} bytes) written to {:?}",
        result.info.width,
        result.info.height,
        result.info.format.as_str(),
        result.info.size,
        output
    );

    Ok(())
}
