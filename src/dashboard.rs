extern crate chrono;
extern crate chrono_tz;
extern crate image;

use crate::arrivals;
use crate::config;
use crate::display;
use crate::drawing;
use crate::result;
use crate::scheduler;
use crate::structs::{Board, FetchStatus, Section};
use crate::theme;

/// Everything the refresh cycle needs, owned for the life of the process.
pub struct BusDash {
    config: config::Config,
    theme: theme::Theme,
    timezone: chrono_tz::Tz,
    styles: drawing::Styles,
    board: Board,
    displays: Vec<Box<dyn display::Display>>,
    fetch_fn: arrivals::FetchFn,
    clock: std::rc::Rc<dyn scheduler::Clock>,
}

/// Fetches both stops, one after the other. Each stop reads the clock
/// once its own response is in.
pub fn fetch_board(config: &config::Config,
                   clock: &dyn scheduler::Clock,
                   fetch_fn: arrivals::FetchFn) -> Board {
    return Board{
        sections: config.stops.iter().map(|stop| Section{
            name: stop.name.clone(),
            stop_code: stop.code.clone(),
            arrivals: arrivals::fetch_stop(&config.api_url, &config.api_key, &stop.code, clock, fetch_fn),
        }).collect(),
    };
}

fn summarize(board: &Board) -> String {
    return board.sections.iter().map(|section| {
        match section.arrivals.status {
            FetchStatus::Ok => format!("{} ({}): {} services",
                                       section.name, section.stop_code, section.arrivals.services.len()),
            FetchStatus::HttpStatus(code) => format!("{} ({}): HTTP {}", section.name, section.stop_code, code),
            FetchStatus::Failed(ref err) => format!("{} ({}): failed ({})", section.name, section.stop_code, err),
        }
    }).collect::<Vec<String>>().join(", ");
}

impl BusDash {
    pub fn new(config: config::Config,
               styles: drawing::Styles,
               fetch_fn: arrivals::FetchFn,
               clock: std::rc::Rc<dyn scheduler::Clock>) -> result::BusDashResult<BusDash> {
        let theme = config.resolve_theme()?;
        let timezone = config.timezone()?;
        let board = Board::empty(&config.stops);

        return Ok(BusDash{
            config: config,
            theme: theme,
            timezone: timezone,
            styles: styles,
            board: board,
            displays: vec![],
            fetch_fn: fetch_fn,
            clock: clock,
        });
    }

    pub fn add_display(&mut self, display: Box<dyn display::Display>) {
        self.displays.push(display);
    }

    /// `now` only drives the header clock.
    pub fn refresh(&mut self, now: &chrono::DateTime<chrono::Utc>) -> result::BusDashResult<()> {
        self.board = fetch_board(&self.config, self.clock.as_ref(), self.fetch_fn);
        info!("Refreshed: {}", summarize(&self.board));

        return self.render(now);
    }

    /// Redraws the cached board so the header clock moves.
    pub fn tick_clock(&mut self, now: &chrono::DateTime<chrono::Utc>) -> result::BusDashResult<()> {
        return self.render(now);
    }

    pub fn render_image(&self, now: &chrono::DateTime<chrono::Utc>) -> image::RgbImage {
        let clock = if self.config.show_clock {
            Some(drawing::clock_text(now, &self.timezone))
        } else {
            None
        };

        return drawing::generate_image(
            &self.board,
            &self.theme,
            &self.styles,
            self.config.width,
            self.config.height,
            clock.as_ref().map(String::as_str));
    }

    fn render(&mut self, now: &chrono::DateTime<chrono::Utc>) -> result::BusDashResult<()> {
        let imgbuf = self.render_image(now);

        // One broken display shouldn't starve the others.
        let mut first_err = None;
        for display in self.displays.iter_mut() {
            if let Err(err) = display.show(&imgbuf) {
                warn!("Display failed: {}", err);
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }

        match first_err {
            Some(err) => return Err(err),
            None => return Ok(()),
        }
    }
}

pub fn schedule(config: &config::Config) -> scheduler::Scheduler<BusDash> {
    let mut scheduler: scheduler::Scheduler<BusDash> = scheduler::Scheduler::new();

    scheduler.every("refresh", config.refresh_interval(), |dash, now| dash.refresh(now));
    if config.show_clock {
        scheduler.every("clock", std::time::Duration::from_secs(1), |dash, now| dash.tick_clock(now));
    }

    return scheduler;
}

#[cfg(test)]
mod tests {
    use crate::arrivals::RawResponse;
    use crate::scheduler::tests::FakeClock;
    use crate::scheduler::Clock;
    use crate::structs::FetchStatus;

    fn test_config() -> crate::config::Config {
        let mut config = crate::config::Config::default();
        config.api_url = "https://example.test/BusArrival".to_string();
        config.api_key = "secret".to_string();
        config.stops[0].code = "83139".to_string();
        config.stops[1].code = "83131".to_string();
        return config;
    }

    fn fake_fetch_fn(url: &str, _api_key: &str) -> crate::result::BusDashResult<RawResponse> {
        if url.ends_with("BusStopCode=83139") {
            return Ok(RawResponse{
                status: 200,
                body: r#"{"Services":[
                    {"ServiceNo":"15","NextBus":{"EstimatedArrival":"2024-08-12T12:33:00+08:00","Type":"DD"}},
                    {"ServiceNo":"155","NextBus":{"EstimatedArrival":"2024-08-12T12:40:00+08:00","Type":"SD"}}
                ]}"#.to_string(),
            });
        }
        return Ok(RawResponse{status: 503, body: "".to_string()});
    }

    struct CountingDisplay {
        shown: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl crate::display::Display for CountingDisplay {
        fn show(&mut self, _image: &image::RgbImage) -> crate::result::BusDashResult<()> {
            self.shown.set(self.shown.get() + 1);
            return Ok(());
        }
    }

    struct BrokenDisplay;

    impl crate::display::Display for BrokenDisplay {
        fn show(&mut self, _image: &image::RgbImage) -> crate::result::BusDashResult<()> {
            return Err(crate::result::make_error("screen unplugged"));
        }
    }

    #[test]
    fn fetch_board_keeps_sections_apart() {
        let clock = FakeClock::new("2024-08-12T04:30:00Z");
        let board = super::fetch_board(&test_config(), &clock, fake_fetch_fn);

        assert_eq!(2, board.sections.len());

        let downstairs = &board.sections[0];
        assert_eq!("Downstairs", downstairs.name);
        assert_eq!(FetchStatus::Ok, downstairs.arrivals.status);
        assert_eq!(vec!["15", "155"],
                   downstairs.arrivals.services.iter().map(|s| s.service_number.as_str()).collect::<Vec<_>>());
        assert_eq!(vec![3], downstairs.arrivals.services[0].arrival_minutes);

        let opposite = &board.sections[1];
        assert_eq!("83131", opposite.stop_code);
        assert_eq!(FetchStatus::HttpStatus(503), opposite.arrivals.status);
        assert!(opposite.arrivals.services.is_empty());

        assert_eq!("Downstairs (83139): 2 services, Opposite (83131): HTTP 503", super::summarize(&board));
    }

    thread_local! {
        static NETWORK_TIME: FakeClock = FakeClock::new("2024-08-12T04:30:00Z");
    }

    // Reads the time the slow transport below has advanced to.
    struct NetworkClock;

    impl Clock for NetworkClock {
        fn now(&self) -> chrono::DateTime<chrono::Utc> {
            return NETWORK_TIME.with(|clock| clock.now());
        }

        fn sleep(&self, duration: std::time::Duration) {
            NETWORK_TIME.with(|clock| clock.advance(duration));
        }
    }

    // Every request takes 30 seconds; the bus is due at 12:33:30.
    fn slow_fetch_fn(_url: &str, _api_key: &str) -> crate::result::BusDashResult<RawResponse> {
        NETWORK_TIME.with(|clock| clock.advance(std::time::Duration::from_secs(30)));
        return Ok(RawResponse{
            status: 200,
            body: r#"{"Services":[{"ServiceNo":"15","NextBus":{"EstimatedArrival":"2024-08-12T12:33:30+08:00","Type":"DD"}}]}"#.to_string(),
        });
    }

    #[test]
    fn minutes_count_from_each_response() {
        let board = super::fetch_board(&test_config(), &NetworkClock, slow_fetch_fn);

        // 180s after the first response, 150s after the second.
        assert_eq!(vec![3], board.sections[0].arrivals.services[0].arrival_minutes);
        assert_eq!(vec![2], board.sections[1].arrivals.services[0].arrival_minutes);
        assert_eq!("2024-08-12T04:31:00+00:00", NetworkClock.now().to_rfc3339());
    }

    #[test]
    fn clock_task_is_optional() {
        let mut config = test_config();
        assert_eq!(vec!["refresh", "clock"], super::schedule(&config).task_names());

        config.show_clock = false;
        assert_eq!(vec!["refresh"], super::schedule(&config).task_names());
    }

    // Needs fonts-dejavu-core; skipped when the fonts aren't installed.
    #[test]
    fn refresh_and_clock_cycle() {
        let config = test_config();
        let styles = match crate::drawing::load_styles(&config.font_regular, &config.font_bold) {
            Ok(styles) => styles,
            Err(err) => {
                eprintln!("Skipping refresh_and_clock_cycle: {}", err);
                return;
            }
        };

        let shown = std::rc::Rc::new(std::cell::Cell::new(0));
        let clock = std::rc::Rc::new(FakeClock::new("2024-08-12T04:30:00Z"));
        let mut dash = super::BusDash::new(config.clone(), styles, fake_fetch_fn, clock.clone()).expect("BusDash::new");
        dash.add_display(Box::new(CountingDisplay{shown: shown.clone()}));

        let mut scheduler = super::schedule(&config);
        scheduler.run(&mut dash, clock.as_ref(), Some(3));

        // refresh@0s, clock@0s, clock@1s
        assert_eq!(3, shown.get());
        assert_eq!(FetchStatus::Ok, dash.board.sections[0].arrivals.status);
        assert_eq!(FetchStatus::HttpStatus(503), dash.board.sections[1].arrivals.status);

        let img = dash.render_image(&clock.now());
        assert_eq!((config.width, config.height), img.dimensions());
    }

    #[test]
    fn broken_display_doesnt_block_others() {
        let config = test_config();
        let styles = match crate::drawing::load_styles(&config.font_regular, &config.font_bold) {
            Ok(styles) => styles,
            Err(err) => {
                eprintln!("Skipping broken_display_doesnt_block_others: {}", err);
                return;
            }
        };

        let shown = std::rc::Rc::new(std::cell::Cell::new(0));
        let clock = std::rc::Rc::new(FakeClock::new("2024-08-12T04:30:00Z"));
        let mut dash = super::BusDash::new(config, styles, fake_fetch_fn, clock.clone()).expect("BusDash::new");
        dash.add_display(Box::new(BrokenDisplay));
        dash.add_display(Box::new(CountingDisplay{shown: shown.clone()}));

        assert!(dash.refresh(&clock.now()).is_err());
        assert_eq!(1, shown.get());
        assert_eq!(2, dash.board.sections[0].arrivals.services.len());
    }
}
