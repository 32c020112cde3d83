//! `kubedeploy render` — print the objects a run would apply.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use kubedeploy_apply::ApplyPlan;
use kubedeploy_core::ResourceSet;
use kubedeploy_renderer::EnvOverlay;

use super::inputs::InputArgs;

/// Arguments for `kubedeploy render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
}

impl RenderArgs {
    pub fn run(self) -> Result<()> {
        let cfg = self.inputs.resolve()?;
        crate::init_tracing(cfg.debug);

        let refs = cfg.validate().context("invalid configuration")?;
        let plan = ApplyPlan::load(
            &cfg.init_templates,
            refs,
            &cfg.templates,
            &cfg.namespace,
            &EnvOverlay::from_env(),
        )?;

        let mut out = std::io::stdout().lock();
        write_stream(&mut out, &plan.init)?;
        write_stream(&mut out, &plan.main)?;
        Ok(())
    }
}

/// One `---`-prefixed YAML document per object, prefixed with its source file.
fn write_stream(out: &mut impl Write, set: &ResourceSet) -> Result<()> {
    for group in &set.groups {
        for obj in &group.objects {
            writeln!(out, "---")?;
            writeln!(out, "# Source: {}", group.source.display())?;
            let yaml = serde_yaml::to_string(obj.as_value())
                .with_context(|| format!("failed to encode {} {}", obj.kind(), obj.name()))?;
            out.write_all(yaml.as_bytes())?;
        }
    }
    Ok(())
}
