//! Artifact sealing: manifest embedding and the two-pass content hash
//!
//! The manifest is carried inside the artifact itself as an inline JSON
//! script block, so the document a viewer loads is the complete record. The
//! content hash covers the visible document including the embedded manifest,
//! which means it has to be computed in two passes: embed with a placeholder
//! hash, hash the result, then re-embed with the real value. The hash field
//! never hashes itself.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::CoreError;

/// Element id of the embedded manifest script block.
pub const MANIFEST_ELEMENT_ID: &str = "calc-manifest";

/// Value held by `contentHash` during the first embedding pass.
const CONTENT_HASH_PLACEHOLDER: &str = "pending";

static MANIFEST_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*\bid="calc-manifest"[^>]*>.*?</script>"#)
        .expect("manifest block regex")
});

/// Artifact HTML with its manifest embedded and hash sealed.
#[derive(Debug, Clone)]
pub struct SealedArtifact {
    pub artifact_html: String,
    pub manifest: Value,
    pub content_hash: String,
}

/// Hash of the document contents, in the workspace `blake3:<hex>` convention.
pub fn content_hash(html: &str) -> String {
    format!("blake3:{}", blake3::hash(html.as_bytes()))
}

/// Embed the manifest as `<script type="application/json" id="calc-manifest">`.
///
/// Replaces a prior manifest block if one exists, otherwise inserts before
/// `</body>`, otherwise appends.
pub fn embed_manifest(html: &str, manifest: &Value) -> String {
    let block = format!(
        "<script type=\"application/json\" id=\"{}\">{}</script>",
        MANIFEST_ELEMENT_ID, manifest
    );

    if MANIFEST_BLOCK.is_match(html) {
        // NoExpand: manifest JSON may contain `$` sequences
        return MANIFEST_BLOCK
            .replace(html, regex::NoExpand(block.as_str()))
            .into_owned();
    }

    match find_case_insensitive(html, "</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + block.len());
            out.push_str(&html[..idx]);
            out.push_str(&block);
            out.push_str(&html[idx..]);
            out
        }
        None => {
            let mut out = html.to_string();
            out.push_str(&block);
            out
        }
    }
}

/// Re-extract the embedded manifest JSON from an artifact.
pub fn extract_manifest(html: &str) -> Result<Value, CoreError> {
    let block = MANIFEST_BLOCK
        .find(html)
        .ok_or_else(|| CoreError::EmbedError("no manifest block in artifact".to_string()))?;

    let inner_start = html[block.start()..block.end()]
        .find('>')
        .map(|i| block.start() + i + 1)
        .ok_or_else(|| CoreError::EmbedError("malformed manifest block".to_string()))?;
    let inner_end = block.end() - "</script>".len();

    serde_json::from_str(html[inner_start..inner_end].trim())
        .map_err(|e| CoreError::ManifestError(format!("embedded manifest is not JSON: {}", e)))
}

/// Embed the manifest and seal the two-pass content hash.
///
/// Pass one embeds the manifest with `contentHash` set to a placeholder and
/// hashes the resulting document; pass two re-embeds with the real hash.
/// Sealing an already-sealed artifact replaces the prior manifest block, so
/// the operation is idempotent for a fixed manifest.
pub fn seal_manifest(html: &str, manifest: &Value) -> Result<SealedArtifact, CoreError> {
    let mut manifest = manifest.clone();
    let obj = manifest
        .as_object_mut()
        .ok_or_else(|| CoreError::ManifestError("manifest is not an object".to_string()))?;

    obj.insert(
        "contentHash".to_string(),
        Value::String(CONTENT_HASH_PLACEHOLDER.to_string()),
    );
    let staged = embed_manifest(html, &manifest);
    let hash = content_hash(&staged);

    manifest
        .as_object_mut()
        .expect("still an object")
        .insert("contentHash".to_string(), Value::String(hash.clone()));
    let sealed = embed_manifest(&staged, &manifest);

    Ok(SealedArtifact {
        artifact_html: sealed,
        manifest,
        content_hash: hash,
    })
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}
