//! Embeds inline resources directly into an HTML body.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::envelope::InlineResource;

/// Rewrites `html` so that every `cid:` reference to one of `inlines`
/// becomes a self-contained base64 data URI.
///
/// Replacement is global per content id. Resources with empty content are
/// skipped, leaving their references unresolved. With no resources the
/// input is returned unchanged. The function is pure and idempotent:
/// re-running it on already-substituted HTML is a no-op.
#[must_use]
pub fn inline_resources(html: &str, inlines: &[InlineResource]) -> String {
    if inlines.is_empty() {
        return html.to_string();
    }

    let mut rendered = html.to_string();
    for resource in inlines {
        if resource.content.is_empty() {
            continue;
        }
        let reference = format!("cid:{}", resource.content_id);
        let data_uri = format!(
            "data:application/octet-stream;base64,{}",
            STANDARD.encode(&resource.content)
        );
        rendered = rendered.replace(&reference, &data_uri);
    }
    rendered
}
