use actstats_core::store::schema::get_schema_version;
use color_eyre::eyre::Result;

use super::Env;

pub fn run(env: &Env) -> Result<()> {
    let db = env.open_writable()?;
    let version = get_schema_version(db.connection())?;

    println!("OK   actstats init");
    println!("database: {}", env.config.database_path.display());
    println!("schema version: {version}");
    println!("application: {}", env.config.application);
    println!("ordering file: {}", env.config.ordering_file.display());
    Ok(())
}
