//! Entry point for the `smart-access-synth` binary.

use smart_access_core::assemble;
use smart_access_synth::{synthesize, write_template, SynthConfig, SynthError};
use tracing::info;

fn run() -> Result<(), SynthError> {
    let config = SynthConfig::from_env()?;
    info!(
        environment = %config.environment,
        region = %config.region,
        stack = %config.stack_name,
        "synthesizing stack"
    );

    let stack = assemble(&config.stack_config())?;
    let template = synthesize(&stack)?;
    let (path, hash) = write_template(&template, &config.out_dir, &config.stack_name)?;

    info!(
        path = %path.display(),
        hash = %hash,
        resources = template.resources.len(),
        "template written"
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run() {
        tracing::error!(error = %e, "synthesis failed");
        std::process::exit(1);
    }
}
