// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use serde_json::json;
use switchboard_server_config::SwitchboardConfig;
use switchboard_server_flags::{FlagService, PageLimits, Revision, SqliteFlagsRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

#[derive(Parser, Debug)]
#[command(name = "switchboard", about = "Manage boolean feature flags", version)]
struct Args {
	/// Config file to use instead of /etc/switchboard/switchboard.toml
	#[arg(long, global = true, env = "SWITCHBOARD_CONFIG")]
	config: Option<PathBuf>,

	/// Overrides database.url from configuration
	#[arg(long, global = true)]
	database_url: Option<String>,

	/// Name recorded on values written by this invocation
	#[arg(long, global = true)]
	actor: Option<String>,

	/// Print machine-readable JSON
	#[arg(long, global = true)]
	json: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Register a flag without setting any value
	Create { flag: String },

	/// List flag names, one page at a time
	List {
		#[arg(long)]
		cursor: Option<String>,
		#[arg(long)]
		limit: Option<u32>,
	},

	/// Resolve a flag for a user
	Get {
		flag: String,
		user: String,
		/// Value used when neither a user nor a global value exists [default: true]
		#[arg(long, value_parser = BoolishValueParser::new())]
		default: Option<bool>,
	},

	/// Set the global value, or one user's value with --user
	Set {
		flag: String,
		#[arg(value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
		value: bool,
		#[arg(long)]
		user: Option<String>,
	},

	/// Remove the global value, or one user's value with --user
	Clear {
		flag: String,
		#[arg(long)]
		user: Option<String>,
	},

	/// Remove every user value of a flag
	ClearUsers { flag: String },

	/// Show the revision history of the global value, or of one user's value
	History {
		flag: String,
		#[arg(long)]
		user: Option<String>,
	},
}

fn load_config(args: &Args) -> Result<SwitchboardConfig> {
	let mut config = match &args.config {
		Some(path) => switchboard_server_config::load_config_with_file(path)?,
		None => switchboard_server_config::load_config()?,
	};
	if let Some(url) = &args.database_url {
		config.database.url = url.clone();
		config.database.validate()?;
	}
	if let Some(actor) = &args.actor {
		config.flags.actor = Some(actor.clone());
	}
	Ok(config)
}

async fn build_service(config: &SwitchboardConfig) -> Result<FlagService> {
	let pool = switchboard_server_db::create_pool(&config.database.url)
		.await
		.with_context(|| format!("failed to open database {}", config.database.url))?;
	switchboard_server_db::run_migrations(&pool)
		.await
		.context("failed to run migrations")?;
	if config.database.is_ephemeral() {
		tracing::warn!(database = %config.database.url, "in-memory database, changes end with this process");
	} else {
		tracing::debug!(database = %config.database.url, "database ready");
	}

	let service = FlagService::new(Arc::new(SqliteFlagsRepository::new(pool))).with_page_limits(
		PageLimits {
			default_page_size: config.flags.default_page_size,
			max_page_size: config.flags.max_page_size,
		},
	);

	Ok(match &config.flags.actor {
		Some(actor) => service.with_actor(actor.clone()),
		None => service,
	})
}

fn print_revision(json: bool, revision: &Revision) -> Result<()> {
	if json {
		println!("{}", serde_json::to_string_pretty(revision)?);
	} else {
		println!("{}", output::revision_line(revision));
	}
	Ok(())
}

fn print_removed(json: bool, flag: &str, removed: u64) -> Result<()> {
	if json {
		println!("{}", json!({ "flag": flag, "removed": removed }));
	} else {
		println!("{flag}: removed {removed}");
	}
	Ok(())
}

async fn run(args: Args, service: FlagService) -> Result<()> {
	let json = args.json;
	match args.command {
		Command::Create { flag } => {
			service.create_flag(&flag).await?;
			if json {
				println!("{}", json!({ "flag": flag }));
			} else {
				println!("{flag}");
			}
		}
		Command::List { cursor, limit } => {
			let page = service.get_flags(cursor.as_deref(), limit).await?;
			if json {
				println!("{}", serde_json::to_string_pretty(&page)?);
			} else {
				print!("{}", output::page_text(&page));
			}
		}
		Command::Get {
			flag,
			user,
			default,
		} => {
			let value = match default {
				Some(default) => service.resolve(&flag, &user, default).await?,
				None => service.get_value(&flag, &user).await?,
			};
			if json {
				println!("{}", json!({ "flag": flag, "user": user, "value": value }));
			} else {
				println!("{value}");
			}
		}
		Command::Set { flag, value, user } => {
			let revision = match user {
				Some(user) => service.set_user(&flag, &user, value).await?,
				None => service.set_global(&flag, value).await?,
			};
			print_revision(json, &revision)?;
		}
		Command::Clear { flag, user } => {
			let removed = match user {
				Some(user) => service.clear_user(&flag, &user).await?,
				None => service.clear_global(&flag).await?,
			};
			print_removed(json, &flag, u64::from(removed))?;
		}
		Command::ClearUsers { flag } => {
			let removed = service.clear_all_users(&flag).await?;
			print_removed(json, &flag, removed)?;
		}
		Command::History { flag, user } => {
			let history = match user {
				Some(user) => service.user_history(&flag, &user).await?,
				None => service.global_history(&flag).await?,
			};
			if json {
				println!("{}", serde_json::to_string_pretty(&history)?);
			} else {
				for revision in &history {
					println!("{}", output::revision_line(revision));
				}
			}
		}
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	dotenvy::dotenv().ok();

	let config = load_config(&args)?;

	// Logs go to stderr so stdout stays parseable with --json
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let service = build_service(&config).await?;
	run(args, service).await
}
