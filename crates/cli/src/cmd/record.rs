use chrono::{DateTime, Utc};
use color_eyre::eyre::{eyre, Result};

use super::Env;
use crate::RecordArgs;

pub fn run(env: &Env, args: RecordArgs) -> Result<()> {
    let when = match &args.at {
        Some(at) => DateTime::parse_from_rfc3339(at)
            .map_err(|e| eyre!("Invalid --at '{at}': {e}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let service = env.service()?;
    let mut score = 0.0;
    for _ in 0..args.count.max(1) {
        let row = service.record_usage_at(
            &args.owner.in_activity,
            &args.owner.agent,
            &args.resource,
            when,
        )?;
        score = row.score;
    }

    tracing::info!(resource = %args.resource, score, "Recorded usage");
    println!("{}  score {score}", args.resource);
    Ok(())
}
