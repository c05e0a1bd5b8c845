use color_eyre::eyre::Result;

use super::Env;
use crate::InfoArgs;

pub fn run(env: &Env, args: InfoArgs) -> Result<()> {
    let service = env.service()?;
    service.set_resource_info(&args.resource, args.title.as_deref(), args.mimetype.as_deref())?;
    println!("{}  updated", args.resource);
    Ok(())
}
