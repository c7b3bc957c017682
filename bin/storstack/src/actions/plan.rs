//! `storstack plan`: show the tuning values without applying them

use super::Context;
use anyhow::Result;
use storstack_tuning::{Planner, SystemProbe};

pub fn run(ctx: &Context) -> Result<()> {
    let probe = SystemProbe::from_config(&ctx.tool);
    let plan = Planner::new(&ctx.config, &probe, &ctx.tool).plan()?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
