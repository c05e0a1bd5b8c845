use actstats_core::resultset::{ResultRecord, ResultSet};
use color_eyre::eyre::{eyre, Result};

use super::output::{print_records_json, print_records_table};
use super::Env;
use crate::QueryArgs;

pub fn run(env: &Env, args: QueryArgs) -> Result<()> {
    let query = args.terms.to_query()?;
    tracing::debug!("Running {}", query);

    let ctx = env.context();
    let results = ResultSet::open(&query, &ctx)
        .map_err(|e| eyre!("{e}\nPass --activity to set the current activity."))?;
    if !results.is_active() {
        tracing::warn!("No results: {} is not available", env.config.database_path.display());
    }

    let records: Vec<ResultRecord> = results.iter().collect();
    if args.json {
        print_records_json(&records)?;
    } else {
        print_records_table(&records);
    }
    Ok(())
}
