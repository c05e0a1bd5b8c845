use actstats_core::query::terms::{Activity, Agent};
use actstats_core::service::{forget_earlier_stats, forget_recent_stats, forget_resource};
use color_eyre::eyre::Result;

use super::Env;
use crate::ForgetArgs;

pub fn run(env: &Env, args: ForgetArgs) -> Result<()> {
    let service = env.service()?;
    let activities = Activity::from(args.owner.in_activity.as_str());

    if let Some(resource) = &args.resource {
        let agents = Agent::from(args.owner.agent.as_str());
        forget_resource(&service, &activities, &agents, resource)?;
    } else if let Some(count) = args.recent {
        forget_recent_stats(&service, &activities, count, args.unit)?;
    } else if let Some(months) = args.earlier {
        forget_earlier_stats(&service, &activities, months)?;
    }

    let events = service.take_events();
    tracing::debug!(count = events.len(), "Forget produced events");
    println!("forgot  {} events", events.len());
    Ok(())
}
