// sudo apt-get install fonts-dejavu-core libssl-dev
extern crate anyhow;
extern crate chrono;
extern crate flexi_logger;
extern crate getopts;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

mod arrivals;
mod config;
mod dashboard;
mod display;
mod drawing;
mod kiosk;
mod result;
mod scheduler;
mod structs;
mod theme;

use anyhow::Context;
use scheduler::Clock;

fn setup_logging(log_dir: &str) -> result::BusDashResult<flexi_logger::LoggerHandle> {
    let handle = flexi_logger::Logger::try_with_env_or_str("info")
        .context("Parsing log spec")?
        .log_to_file(flexi_logger::FileSpec::default().directory(log_dir))
        .duplicate_to_stderr(flexi_logger::Duplicate::Info)
        .rotate(
            flexi_logger::Criterion::Size(1 << 20),
            flexi_logger::Naming::Numbers,
            flexi_logger::Cleanup::KeepLogFiles(5))
        .start()
        .with_context(|| format!("Starting logger in '{}'", log_dir))?;
    return Ok(handle);
}

fn load_config(matches: &getopts::Matches) -> result::BusDashResult<config::Config> {
    let mut config = match matches.opt_str("config") {
        Some(path) => config::config_from_file(path)?,
        None => config::Config::default(),
    };

    // Real environment variables win over the .env file.
    let env_file = if std::path::Path::new(".env").exists() {
        config::env_file_vars(".env")?
    } else {
        vec![]
    };
    config.apply_env(|name| std::env::var(name).ok().or_else(|| env_file.iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())));

    if let Some(preset) = matches.opt_str("theme") {
        config.theme_preset = Some(preset);
        config.theme = None;
    }

    return Ok(config);
}

fn run(matches: &getopts::Matches) -> result::BusDashResult<()> {
    let mut config = load_config(matches)?;
    let _logger = setup_logging(&config.log_dir)?;
    config.validate()?;

    let one_shot = matches.opt_present("one-shot");
    let port = match matches.opt_str("port") {
        Some(port) => Some(port.parse::<u16>().with_context(|| format!("Bad port '{}'", port))?),
        None => None,
    };
    let save_image = matches.opt_str("save-image");

    info!("Running. stops={:?} interval={}s one-shot={} port={:?} save-image={:?}",
          config.stops.iter().map(|s| format!("{}={}", s.name, s.code)).collect::<Vec<_>>(),
          config.refresh_interval_secs, one_shot, port, save_image);

    let styles = drawing::load_styles(&config.font_regular, &config.font_bold)?;
    let clock = std::rc::Rc::new(scheduler::SystemClock);
    let mut dash = dashboard::BusDash::new(config.clone(), styles, arrivals::real_fetch_fn, clock.clone())?;

    if let Some(path) = save_image {
        dash.add_display(Box::new(display::PngFileDisplay::new(path)));
    }

    if let Some(port) = port {
        let kiosk_display = kiosk::KioskDisplay::new();
        let _server = kiosk::start_kiosk_server(port, &config.log_dir, kiosk_display.latest())?;
        dash.add_display(Box::new(kiosk_display));
    }

    if !matches.opt_present("save-image") && !matches.opt_present("port") {
        warn!("No display configured; pass --save-image and/or --port");
    }

    if one_shot {
        return dash.refresh(&clock.now());
    }

    let mut scheduler = dashboard::schedule(&config);
    info!("Scheduled tasks: {:?}", scheduler.task_names());
    scheduler.run(&mut dash, clock.as_ref(), None);

    return Ok(());
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut opts = getopts::Options::new();
    opts.optopt("c", "config", "JSON config file.", "FILE");
    opts.optopt("t", "theme", "Theme preset: classic or plain.", "NAME");
    opts.optopt("i", "save-image", "Where to keep a png of the board.", "FILENAME");
    opts.optopt("p", "port", "Serve the board to a kiosk browser on this port.", "PORT");
    opts.optflag("o", "one-shot", "Refresh once and exit.");
    opts.optflag("h", "help", "Print this help.");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(err) => {
            eprintln!("{}\n{}", err, opts.usage("Usage: busdash [options]"));
            std::process::exit(1);
        }
    };

    if matches.opt_present("help") {
        print!("{}", opts.usage("Usage: busdash [options]"));
        return;
    }

    if let Err(err) = run(&matches) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
