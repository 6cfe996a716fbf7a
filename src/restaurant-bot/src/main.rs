//! RestaurantBot — spintext preview/render and dispatch planning for
//! WhatsApp restaurant campaigns.

use std::collections::HashMap;

use anyhow::Context;
use campaign_core::{AppConfig, MissingVariablePolicy, RampConfig};
use campaign_intelligent_delivery::{plan, send_timestamps, Repeat, StatusSchedule};
use campaign_spintext::{parse, render_report, ChoiceStrategy, RenderContext, Renderer};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Weekday};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "restaurant-bot")]
#[command(about = "Spintext templates and ramped dispatch plans for WhatsApp campaigns")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Live preview: first option of every variation group
    Preview {
        template: String,
        #[command(flatten)]
        vars: VarArgs,
    },

    /// Render send-time variations
    Render {
        template: String,
        #[command(flatten)]
        vars: VarArgs,

        /// Seed for reproducible output (default: process entropy)
        #[arg(long)]
        seed: Option<u64>,

        /// Number of messages to render
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },

    /// Show variables, variation count and parsed structure as JSON
    Inspect { template: String },

    /// Compute the day-by-day dispatch plan for an audience
    Plan {
        /// Number of distinct recipients
        #[arg(short, long)]
        audience: u64,

        /// First dispatch day (default: today)
        #[arg(long)]
        start: Option<NaiveDate>,

        #[command(flatten)]
        ramp: RampArgs,
    },

    /// List send instants for one day's quota
    Pace {
        #[arg(short, long)]
        quota: u64,

        /// Day opening instant, e.g. 2025-10-01T09:00:00 (default: today at the configured hour)
        #[arg(long)]
        day_start: Option<NaiveDateTime>,

        #[command(flatten)]
        ramp: RampArgs,
    },

    /// Upcoming occurrences of a status schedule
    Status {
        /// First publication, e.g. 2025-10-01T10:30:00
        #[arg(long)]
        start: NaiveDateTime,

        #[arg(long, value_enum, default_value_t = RepeatKind::None)]
        repeat: RepeatKind,

        /// Weekdays for weekly repeats, e.g. mon,fri
        #[arg(long, value_delimiter = ',')]
        days: Vec<Weekday>,

        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
}

#[derive(Args, Debug)]
struct VarArgs {
    /// Variable binding, e.g. --var nome=João (repeatable)
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Render unbound variables as `{{name}}` instead of nothing
    #[arg(long)]
    keep_missing: bool,
}

#[derive(Args, Debug)]
struct RampArgs {
    /// Messages on the first day (overrides config)
    #[arg(long, env = "RESTAURANT_BOT__RAMP__INITIAL_DAILY_QUOTA")]
    initial: Option<u64>,

    /// Extra messages per day (overrides config)
    #[arg(long, env = "RESTAURANT_BOT__RAMP__DAILY_INCREASE")]
    increase: Option<u64>,

    /// Daily ceiling (overrides config)
    #[arg(long, env = "RESTAURANT_BOT__RAMP__MAX_DAILY_QUOTA")]
    max: Option<u64>,

    /// Messages per batch before resting (overrides config)
    #[arg(long, env = "RESTAURANT_BOT__RAMP__REST_AFTER_COUNT")]
    rest_after: Option<u64>,

    /// Rest length in minutes, 0 disables (overrides config)
    #[arg(long, env = "RESTAURANT_BOT__RAMP__REST_DURATION_MINUTES")]
    rest_minutes: Option<u64>,
}

impl RampArgs {
    fn apply(&self, base: RampConfig) -> RampConfig {
        RampConfig {
            initial_daily_quota: self.initial.unwrap_or(base.initial_daily_quota),
            daily_increase: self.increase.unwrap_or(base.daily_increase),
            max_daily_quota: self.max.unwrap_or(base.max_daily_quota),
            rest_after_count: self.rest_after.unwrap_or(base.rest_after_count),
            rest_duration_minutes: self.rest_minutes.unwrap_or(base.rest_duration_minutes),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RepeatKind {
    None,
    Daily,
    Weekly,
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    if name.is_empty() {
        return Err(format!("empty variable name in '{s}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restaurant_bot=info,campaign_intelligent_delivery=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    match cli.command {
        Commands::Preview { template, vars } => cmd_preview(&config, &template, vars),
        Commands::Render {
            template,
            vars,
            seed,
            count,
        } => cmd_render(&config, &template, vars, seed, count),
        Commands::Inspect { template } => cmd_inspect(&template),
        Commands::Plan {
            audience,
            start,
            ramp,
        } => cmd_plan(&config, audience, start, ramp),
        Commands::Pace {
            quota,
            day_start,
            ramp,
        } => cmd_pace(&config, quota, day_start, ramp),
        Commands::Status {
            start,
            repeat,
            days,
            count,
        } => cmd_status(start, repeat, days, count),
    }
}

fn bindings(config: &AppConfig, vars: &VarArgs, preview: bool) -> (HashMap<String, String>, MissingVariablePolicy) {
    let mut map: HashMap<String, String> = vars.vars.iter().cloned().collect();
    if preview {
        map.entry("nome".to_string())
            .or_insert_with(|| config.spintext.preview_name.clone());
    }
    let missing = if vars.keep_missing {
        MissingVariablePolicy::Keep
    } else {
        config.spintext.missing_variable
    };
    (map, missing)
}

fn cmd_preview(config: &AppConfig, source: &str, vars: VarArgs) -> anyhow::Result<()> {
    let template = parse(source).context("invalid template")?;
    let (variables, missing) = bindings(config, &vars, true);
    let ctx = RenderContext::preview()
        .with_variables(variables)
        .with_missing_policy(missing);
    let rendered = render_report(&template, &ctx);
    for miss in &rendered.misses {
        warn!(variable = %miss.name, "no value bound");
    }
    println!("{}", rendered.text);
    Ok(())
}

fn cmd_render(
    config: &AppConfig,
    source: &str,
    vars: VarArgs,
    seed: Option<u64>,
    count: usize,
) -> anyhow::Result<()> {
    let template = parse(source).context("invalid template")?;
    let (variables, missing) = bindings(config, &vars, false);
    let renderer = Renderer::new(template, missing);
    let mut chooser = ChoiceStrategy::Random { seed }.chooser();
    for _ in 0..count {
        println!("{}", renderer.render_one(&variables, &mut chooser).text);
    }
    info!(count, seeded = seed.is_some(), "rendered messages");
    Ok(())
}

#[derive(Serialize)]
struct Inspection<'a> {
    variables: Vec<&'a str>,
    variation_count: u64,
    template: &'a campaign_spintext::Template,
}

fn cmd_inspect(source: &str) -> anyhow::Result<()> {
    let template = parse(source).context("invalid template")?;
    let report = Inspection {
        variables: template.variables(),
        variation_count: template.variation_count(),
        template: &template,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_plan(config: &AppConfig, audience: u64, start: Option<NaiveDate>, ramp: RampArgs) -> anyhow::Result<()> {
    let ramp = ramp.apply(config.ramp);
    let start = start.unwrap_or_else(|| Local::now().date_naive());
    let dispatch = plan(audience, &ramp, start).context("invalid ramp configuration")?;
    println!("{}", serde_json::to_string_pretty(&dispatch)?);
    Ok(())
}

fn cmd_pace(
    config: &AppConfig,
    quota: u64,
    day_start: Option<NaiveDateTime>,
    ramp: RampArgs,
) -> anyhow::Result<()> {
    let ramp = ramp.apply(config.ramp);
    ramp.validate().context("invalid ramp configuration")?;
    let day_start = match day_start {
        Some(t) => t,
        None => Local::now()
            .date_naive()
            .and_hms_opt(config.delivery.day_start_hour, 0, 0)
            .context("day_start_hour must be between 0 and 23")?,
    };
    let interval = i64::try_from(config.delivery.message_interval_seconds)
        .context("message interval too large")?;
    let times = send_timestamps(day_start, quota, &ramp).with_message_interval(Duration::seconds(interval));
    info!(quota, rests = times.rest_count(), "paced dispatch day");
    for t in times {
        println!("{t}");
    }
    Ok(())
}

fn cmd_status(start: NaiveDateTime, repeat: RepeatKind, days: Vec<Weekday>, count: usize) -> anyhow::Result<()> {
    let repeat = match repeat {
        RepeatKind::None => Repeat::None,
        RepeatKind::Daily => Repeat::Daily,
        RepeatKind::Weekly => Repeat::Weekly(days),
    };
    let schedule = StatusSchedule::new(start, repeat).context("invalid status schedule")?;
    for t in schedule.occurrences(start).take(count) {
        println!("{t}");
    }
    Ok(())
}
