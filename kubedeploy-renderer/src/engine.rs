//! Tera rendering of manifest templates against the environment overlay.
//!
//! # Template surface
//!
//! | Reference               | Resolves to                                  |
//! |-------------------------|----------------------------------------------|
//! | `{{ env.IMAGE_TAG }}`   | overlay value, `""` if unset                 |
//! | `{{ env["my-key"] }}`   | same, for keys that are not identifiers      |
//! | `{{ .env.IMAGE_TAG }}`  | Go-template spelling, accepted as the above  |
//!
//! Only literal keys are pre-bound. A computed lookup such as `env[k]`, with
//! `k` a template variable, fails when the key is unset unless it carries a
//! default: `{{ env[k] | default(value="") }}`.
//!
//! `{#` outside a tag is plain text (shell `${#ARR[@]}` in embedded scripts),
//! so Tera comments are not available.
//!
//! Each call builds its own one-off Tera instance; nothing is shared between
//! renders.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tera::{Context, Tera};

use crate::error::RenderError;
use crate::overlay::EnvOverlay;

/// Literal some template engines print for a missing key. Stripped from
/// every rendered output.
pub const MISSING_VALUE_MARKER: &str = "<no value>";

/// The only top-level binding exposed to templates.
pub const ENV_BINDING: &str = "env";

// ---------------------------------------------------------------------------
// Template scanning helpers
// ---------------------------------------------------------------------------

/// `{{ … }}` and `{% … %}` tags; text outside them is never rewritten.
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}").expect("valid tag regex"));

/// A Go-style `.env` reference inside a tag.
static DOT_ENV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[\s(\[{,!|=+\-])\.env\b").expect("valid dot-env regex")
});

/// `env.KEY` or `env["KEY"]` inside a tag.
static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\benv\s*(?:\.\s*([A-Za-z_][A-Za-z0-9_]*)|\[\s*["']([^"']+)["']\s*\])"#)
        .expect("valid env-ref regex")
});

/// `{#` spelled so Tera emits it verbatim instead of opening a comment.
const LITERAL_COMMENT_OPEN: &str = "{% raw %}{#{% endraw %}";

/// Rewrite Go-style `.env` references inside tags to the Tera spelling and
/// escape `{#` in the text between tags.
fn normalize(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for tag in TAG.find_iter(template) {
        out.push_str(&template[last..tag.start()].replace("{#", LITERAL_COMMENT_OPEN));
        out.push_str(&DOT_ENV.replace_all(tag.as_str(), "${1}env"));
        last = tag.end();
    }
    out.push_str(&template[last..].replace("{#", LITERAL_COMMENT_OPEN));
    out
}

/// Every overlay key referenced from a tag.
fn referenced_keys(template: &str) -> Vec<String> {
    TAG.find_iter(template)
        .flat_map(|tag| {
            ENV_REF
                .captures_iter(tag.as_str())
                .filter_map(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// The `env` table handed to Tera: the overlay plus an empty string for
/// every referenced key it lacks, so missing values render as nothing
/// and test false in conditions.
fn env_binding(template: &str, overlay: &EnvOverlay) -> BTreeMap<String, String> {
    let mut env = overlay.as_map().clone();
    for key in referenced_keys(template) {
        env.entry(key).or_default();
    }
    env
}

// ---------------------------------------------------------------------------
// render
// ---------------------------------------------------------------------------

/// Render `template` (read from `file`) against `overlay`.
///
/// `file` only identifies the source in errors.
pub fn render(file: &Path, template: &str, overlay: &EnvOverlay) -> Result<String, RenderError> {
    let normalized = normalize(template);

    let mut ctx = Context::new();
    ctx.insert(ENV_BINDING, &env_binding(&normalized, overlay));

    let rendered = Tera::one_off(&normalized, &ctx, false).map_err(|source| {
        RenderError::Template {
            file: file.to_path_buf(),
            source,
        }
    })?;
    Ok(rendered.replace(MISSING_VALUE_MARKER, ""))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
