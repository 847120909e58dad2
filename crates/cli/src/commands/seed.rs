use tably_core::config::{AppConfig, LoadOptions};
use tably_db::fixtures::seed_demo_menu;
use tably_db::repositories::SqlMenuRepository;
use tably_db::{connect_with_settings, migrations, PoolSettings};

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            PoolSettings {
                max_connections: config.database.max_connections,
                acquire_timeout_secs: config.database.timeout_secs,
            },
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let menu = SqlMenuRepository::new(pool.clone());
        let count = seed_demo_menu(&menu)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;

        pool.close().await;
        Ok::<usize, (&'static str, String, u8)>(count)
    });

    match result {
        Ok(count) => {
            CommandResult::success("seed", format!("upserted {count} demo menu items"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
