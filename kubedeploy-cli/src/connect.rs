//! Build a [`kube::Client`] from the `kubernetes` config section.

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde_json::{json, Value};

use kubedeploy_core::KubernetesConfig;

const CONTEXT: &str = "kubedeploy";

/// Connect to the configured API server. Without a server the ambient
/// kubeconfig or in-cluster configuration is used.
pub async fn client(cfg: &KubernetesConfig) -> Result<Client> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    if cfg.server.is_empty() {
        tracing::debug!("no server configured, using default kube config");
        return Client::try_default()
            .await
            .context("failed to create default kubernetes client");
    }

    let kubeconfig: Kubeconfig =
        serde_json::from_value(kubeconfig_value(cfg)?).context("invalid kubernetes settings")?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .context("invalid kubernetes settings")?;
    tracing::debug!(server = %cfg.server, skip_tls = cfg.skip_tls, "connecting");
    Client::try_from(config).context("failed to create kubernetes client")
}

/// The configured token is base64; whitespace (e.g. line wraps) is ignored.
fn decode_token(token: &str) -> Result<String> {
    let compact: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact)
        .context("kubernetes token is not valid base64")?;
    String::from_utf8(bytes).context("kubernetes token is not valid UTF-8")
}

fn kubeconfig_value(cfg: &KubernetesConfig) -> Result<Value> {
    let mut cluster = json!({
        "server": cfg.server,
        "insecure-skip-tls-verify": cfg.skip_tls,
    });
    if !cfg.ca_crt.is_empty() {
        cluster["certificate-authority-data"] =
            Value::String(general_purpose::STANDARD.encode(cfg.ca_crt.as_bytes()));
    }

    let mut user = json!({});
    if !cfg.token.is_empty() {
        user["token"] = Value::String(decode_token(&cfg.token)?);
    }

    Ok(json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{ "name": CONTEXT, "cluster": cluster }],
        "users": [{ "name": CONTEXT, "user": user }],
        "contexts": [{ "name": CONTEXT, "context": { "cluster": CONTEXT, "user": CONTEXT } }],
        "current-context": CONTEXT,
    }))
}
