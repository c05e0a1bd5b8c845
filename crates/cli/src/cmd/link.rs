use actstats_core::service::StatsService;
use color_eyre::eyre::Result;

use super::Env;
use crate::LinkArgs;

pub fn run(env: &Env, args: LinkArgs, link: bool) -> Result<()> {
    let service = env.service()?;
    let LinkArgs { resource, owner } = args;

    if link {
        service.link_resource_to_activity(&owner.agent, &resource, &owner.in_activity)?;
    } else {
        service.unlink_resource_from_activity(&owner.agent, &resource, &owner.in_activity)?;
    }

    let changed = !service.take_events().is_empty();
    let verb = match (link, changed) {
        (true, true) => "linked",
        (true, false) => "already linked",
        (false, true) => "unlinked",
        (false, false) => "was not linked",
    };
    println!("{resource}  {verb}");
    Ok(())
}
