//! `kubedeploy apply` — render templates and create or update the objects.

use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use kubedeploy_apply::{pipeline, Action, ApplyOptions, ApplyOutcome, ApplyPlan, KubeCluster, RunSummary};
use kubedeploy_renderer::EnvOverlay;

use super::inputs::InputArgs;

/// Arguments for `kubedeploy apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Cap on concurrent applies within one template file (0 = unbounded).
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Stop pending applies in a file as soon as one of them fails.
    #[arg(long)]
    pub cancel_on_error: bool,
}

impl ApplyArgs {
    pub fn run(self) -> Result<()> {
        let mut cfg = self.inputs.resolve()?;
        if let Some(n) = self.max_concurrency {
            cfg.max_concurrency = Some(n);
        }
        cfg.cancel_on_error |= self.cancel_on_error;
        crate::init_tracing(cfg.debug);

        let refs = cfg.validate().context("invalid configuration")?;
        let plan = ApplyPlan::load(
            &cfg.init_templates,
            refs,
            &cfg.templates,
            &cfg.namespace,
            &EnvOverlay::from_env(),
        )?;
        let options = ApplyOptions {
            max_concurrency: cfg.max_concurrency.and_then(NonZeroUsize::new),
            cancel_on_error: cfg.cancel_on_error,
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        let summary = runtime.block_on(async {
            let client = crate::connect::client(&cfg.kubernetes).await?;
            pipeline::run(Arc::new(KubeCluster::new(client)), &plan, options)
                .await
                .context("apply failed")
        })?;

        print_summary(&summary);
        Ok(())
    }
}

fn print_summary(summary: &RunSummary) {
    if summary.total() == 0 {
        println!("✓ nothing to apply");
        return;
    }
    for outcome in summary.iter() {
        println!("  {}  {}", marker(outcome), target(outcome));
    }
    let created = summary
        .iter()
        .filter(|o| o.action == Action::Created)
        .count();
    println!(
        "✓ applied {} objects ({} created, {} updated)",
        summary.total(),
        created,
        summary.total() - created
    );
}

fn marker(outcome: &ApplyOutcome) -> colored::ColoredString {
    match outcome.action {
        Action::Created => "+".green(),
        Action::Updated => "~".yellow(),
    }
}

fn target(outcome: &ApplyOutcome) -> String {
    match &outcome.namespace {
        Some(ns) => format!("{} {}/{}", outcome.kind, ns, outcome.name),
        None => format!("{} {}", outcome.kind, outcome.name),
    }
}
