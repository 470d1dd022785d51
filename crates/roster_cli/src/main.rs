//! CLI probe for the registry core.
//!
//! # Responsibility
//! - Load configuration from the environment, start logging when configured,
//!   open the registry database and print entity totals.
//! - Keep output deterministic for quick local sanity checks.

use log::error;
use roster_core::db::{open_db, open_db_in_memory};
use roster_core::{
    init_logging, CohortService, IdentityService, MemberService, RosterConfig,
    SqliteCohortRepository, SqliteIdentityRepository, SqliteMemberRepository,
};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("roster: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = RosterConfig::from_env()?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(config.log_level, log_dir)?;
    }

    let conn = match config.db_path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };

    let identities = IdentityService::new(SqliteIdentityRepository::try_new(&conn)?);
    let cohorts = CohortService::new(SqliteCohortRepository::try_new(&conn)?);
    let members = MemberService::new(
        SqliteMemberRepository::try_new(&conn)?,
        SqliteCohortRepository::try_new(&conn)?,
    );

    println!("roster_core version={}", roster_core::core_version());
    println!("identities={}", identities.count()?);
    println!("cohorts={}", cohorts.count()?);
    println!("members={}", members.count()?);
    Ok(())
}
