//! World clock command-line driver.
//!
//! # Responsibility
//! - Compose store, service and ticker for terminal use.
//! - Keep output stable enough for quick local sanity checks.

mod args;

use args::{parse_args, usage, CliAction, CliOptions, Command};
use log::error;
use std::path::PathBuf;
use std::sync::Arc;
use worldclock_core::{
    build_widget_snapshot, core_version, default_log_level, init_logging, search_zones,
    zone_time, Clock, SqlitePreferenceStore, SystemClock, TickMode, Ticker, TimezoneService,
    ZoneId,
};

const DB_PATH_ENV: &str = "WORLDCLOCK_DB_PATH";
const DEFAULT_DB_FILE: &str = "worldclock.sqlite3";

type Service = TimezoneService<SqlitePreferenceStore>;

fn main() {
    let action = match parse_args(std::env::args().skip(1)) {
        Ok(action) => action,
        Err(err) => {
            eprintln!("error: {err}\n\n{}", usage());
            std::process::exit(2);
        }
    };

    match action {
        CliAction::ShowHelp => println!("{}", usage()),
        CliAction::ShowVersion => println!("worldclock_core version={}", core_version()),
        CliAction::Run { options, command } => {
            if let Err(err) = run(&options, command) {
                error!("event=cli_command module=cli status=error error={err}");
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
    }
}

fn run(options: &CliOptions, command: Command) -> Result<(), String> {
    if let Some(log_dir) = &options.log_dir {
        let level = options.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).map_err(|err| err.to_string())?;
    }

    let store = SqlitePreferenceStore::open(resolve_db_path(options))
        .map_err(|err| format!("cannot open preference store: {err}"))?;
    let service = TimezoneService::new(Arc::new(store));
    let clock = SystemClock;

    match command {
        Command::List => print_zones(&service, &clock),
        Command::Add(raw) => {
            service.add(&parse_zone(&raw)?).map_err(|err| err.to_string())?;
            print_zones(&service, &clock)
        }
        Command::Remove(raw) => {
            service.remove(&parse_zone(&raw)?).map_err(|err| err.to_string())?;
            print_zones(&service, &clock)
        }
        Command::Move { from, to } => {
            service.reorder(from, to).map_err(|err| err.to_string())?;
            print_zones(&service, &clock)
        }
        Command::Home(raw) => {
            let home = service
                .set_home(&parse_zone(&raw)?)
                .map_err(|err| err.to_string())?;
            println!("home={}", home.as_ref().map_or("none", ZoneId::as_str));
            Ok(())
        }
        Command::ClearHome => {
            service.clear_home().map_err(|err| err.to_string())?;
            println!("home=none");
            Ok(())
        }
        Command::Zones(query) => {
            for zone in search_zones(query.as_deref().unwrap_or_default()) {
                println!("{zone}");
            }
            Ok(())
        }
        Command::Widget(height_dp) => {
            let zones = service.list().map_err(|err| err.to_string())?;
            let home = service.home().map_err(|err| err.to_string())?;
            let snapshot = build_widget_snapshot(&zones, home.as_ref(), clock.now(), height_dp);
            for row in &snapshot.rows {
                println!("{:<24} {:<10} {}", row.label, row.offset_label, row.time);
            }
            if let Some(empty) = snapshot.empty_label {
                println!("{empty}");
            }
            if let Some(overflow) = snapshot.overflow_label {
                println!("{overflow}");
            }
            Ok(())
        }
        Command::Watch { aligned } => watch(&service, aligned),
    }
}

fn watch(service: &Service, aligned: bool) -> Result<(), String> {
    let mode = if aligned {
        TickMode::MinuteAligned
    } else {
        TickMode::default()
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ticker = Ticker::start(Arc::clone(&clock), mode).map_err(|err| err.to_string())?;
    let ticks = ticker.subscribe();
    let zones = service.subscribe_list();
    let home = service.subscribe_home();

    let mut current_zones = zones.recv().unwrap_or_default();
    let mut current_home = home.recv().flatten();

    while let Some(tick) = ticks.recv() {
        if let Some(latest) = zones.drain_latest() {
            current_zones = latest;
        }
        if let Some(latest) = home.drain_latest() {
            current_home = latest;
        }
        println!("-- tick {} at {}", tick.sequence, tick.at.format("%H:%M:%S"));
        print_table(&current_zones, current_home.as_ref(), clock.as_ref());
    }
    Ok(())
}

fn print_zones(service: &Service, clock: &dyn Clock) -> Result<(), String> {
    let zones = service.list().map_err(|err| err.to_string())?;
    let home = service.home().map_err(|err| err.to_string())?;
    print_table(&zones, home.as_ref(), clock);
    Ok(())
}

fn print_table(zones: &[ZoneId], home: Option<&ZoneId>, clock: &dyn Clock) {
    let now = clock.now();
    for (index, zone) in zones.iter().enumerate() {
        let marker = if home == Some(zone) { "*" } else { " " };
        match zone_time(zone, now) {
            Ok(time) => println!(
                "{index:>2} {marker} {:<32} {:<10} {}",
                time.display_name, time.offset_label, time.local_time
            ),
            Err(err) => println!("{index:>2} {marker} {zone:<32} ({err})"),
        }
    }
}

fn parse_zone(raw: &str) -> Result<ZoneId, String> {
    ZoneId::new(raw).map_err(|err| err.to_string())
}

fn resolve_db_path(options: &CliOptions) -> PathBuf {
    if let Some(path) = &options.db_path {
        return path.clone();
    }
    match std::env::var(DB_PATH_ENV) {
        Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
        _ => PathBuf::from(DEFAULT_DB_FILE),
    }
}
