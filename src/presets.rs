//! Step adapters, one per tool.
//!
//! Each preset reads the entrypoint on the first step and the working
//! artifact otherwise, and leaves its result in the artifact.

use std::ffi::OsString;

use serde_json::Value;
use tracing::debug;

use crate::context::{StepContext, ARTIFACT};
use crate::error::{BuildError, Result};
use crate::extract::extract;
use crate::toolchain::Toolchain;

/// Module file name handed to qjsc. The compiler embeds it in its output,
/// so a constant keeps builds reproducible and local paths private.
pub const MODULE_NAME: &str = "f";

/// Bundle the input with esbuild.
pub fn esbuild(ctx: &StepContext<'_>, toolchain: &dyn Toolchain, options: &Value) -> Result<()> {
    let bundle = toolchain.bundle(&ctx.input(), options)?;

    std::fs::write(ctx.artifact(), bundle)
        .map_err(|e| BuildError::io("[esbuild] failed to save script", e))
}

/// Minify the input with terser, which writes the artifact itself.
pub fn terser(ctx: &StepContext<'_>, toolchain: &dyn Toolchain, options: &[String]) -> Result<()> {
    let input = if ctx.first {
        ctx.entrypoint.as_os_str().to_owned()
    } else {
        OsString::from(ARTIFACT)
    };

    let mut args = Vec::with_capacity(options.len() + 3);
    args.push(input);
    args.extend(options.iter().map(OsString::from));
    args.extend([OsString::from("-o"), OsString::from(ARTIFACT)]);

    toolchain.minify(ctx.dir, &args)
}

/// Compile the input to QuickJS bytecode.
pub fn qjsc(ctx: &StepContext<'_>, toolchain: &dyn Toolchain) -> Result<()> {
    std::fs::copy(ctx.input(), ctx.dir.join(MODULE_NAME))
        .map_err(|e| BuildError::io("[qjsc] failed to copy script", e))?;

    let args = ["-c", "-m", MODULE_NAME, "-o", ARTIFACT].map(OsString::from);
    toolchain.compile(ctx.dir, &args)?;

    let artifact = ctx.artifact();
    let generated = std::fs::read_to_string(&artifact)
        .map_err(|e| BuildError::io("[qjsc] failed to read compiled script", e))?;

    let bytecode = extract(&generated)?;
    debug!(bytes = bytecode.len(), "Extracted bytecode");

    std::fs::write(&artifact, bytecode)
        .map_err(|e| BuildError::io("[qjsc] failed to write compiled script", e))
}
