extern crate anyhow;
extern crate chrono_tz;
extern crate dotenvy;
extern crate serde;
extern crate serde_json;

use anyhow::Context;
use crate::result;
use crate::theme;

pub const DEFAULT_API_URL: &str = "https://datamall2.mytransport.sg/ltaodataservice/v3/BusArrival";

const MIN_REFRESH_INTERVAL_SECS: u64 = 5;
const MAX_REFRESH_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StopConfig {
    pub name: String,
    pub code: String,
}

// A misspelled key is an error rather than a silently ignored default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    pub stops: Vec<StopConfig>,
    pub refresh_interval_secs: u64,
    pub show_clock: bool,
    pub timezone: String,
    pub width: u32,
    pub height: u32,
    // sudo apt-get install fonts-dejavu-core
    pub font_regular: String,
    pub font_bold: String,
    pub log_dir: String,
    pub theme_preset: Option<String>,
    pub theme: Option<theme::Theme>,
}

impl Default for Config {
    fn default() -> Config {
        return Config{
            api_key: "".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            stops: vec![
                StopConfig{name: "Downstairs".to_string(), code: "".to_string()},
                StopConfig{name: "Opposite".to_string(), code: "".to_string()},
            ],
            refresh_interval_secs: 30,
            show_clock: true,
            timezone: "Asia/Singapore".to_string(),
            width: 800,
            height: 480,
            font_regular: "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string(),
            font_bold: "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf".to_string(),
            log_dir: ".".to_string(),
            theme_preset: None,
            theme: None,
        };
    }
}

/// KEY=value pairs from a `.env` file. Comments and quoting follow the
/// usual dotenv rules.
pub fn env_file_vars<P: AsRef<std::path::Path>>(path: P) -> result::BusDashResult<Vec<(String, String)>> {
    let path = path.as_ref();
    let mut vars = vec![];
    for item in dotenvy::from_path_iter(path).with_context(|| format!("Opening {:?}", path))? {
        vars.push(item.with_context(|| format!("Parsing {:?}", path))?);
    }
    return Ok(vars);
}

pub fn config_from_file<P: AsRef<std::path::Path>>(path: P) -> result::BusDashResult<Config> {
    let debug_path = path.as_ref().to_str().map(|x| x.to_string());
    let file = std::fs::File::open(path)
        .with_context(|| format!("Opening config from '{:?}'", debug_path))?;
    let reader = std::io::BufReader::new(file);
    let config: Config = serde_json::from_reader(reader)
        .with_context(|| format!("while parsing config"))?;
    return Ok(config);
}

impl Config {
    /// Overrides the key and the two stop codes from `API_KEY`,
    /// `BUS_STOP_CODE_A` and `BUS_STOP_CODE_B`.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(key) = lookup("API_KEY") {
            self.api_key = key;
        }

        for (i, var) in ["BUS_STOP_CODE_A", "BUS_STOP_CODE_B"].iter().enumerate() {
            if let Some(code) = lookup(*var) {
                if let Some(stop) = self.stops.get_mut(i) {
                    stop.code = code;
                }
            }
        }
    }

    pub fn validate(&mut self) -> result::BusDashResult<()> {
        if self.stops.len() != 2 {
            return Err(result::make_error(&format!(
                "Expected exactly 2 stops, got {}", self.stops.len())));
        }

        if self.width == 0 || self.height == 0 {
            return Err(result::make_error(&format!(
                "Invalid board size {}x{}", self.width, self.height)));
        }

        let clamped = self.refresh_interval_secs
            .max(MIN_REFRESH_INTERVAL_SECS)
            .min(MAX_REFRESH_INTERVAL_SECS);
        if clamped != self.refresh_interval_secs {
            warn!("refresh_interval_secs={} out of range, using {}",
                  self.refresh_interval_secs, clamped);
            self.refresh_interval_secs = clamped;
        }

        // Not fatal: the requests will just come back 401.
        if self.api_key.is_empty() {
            warn!("No API key configured (set API_KEY)");
        }
        for stop in &self.stops {
            if stop.code.is_empty() {
                warn!("No stop code configured for '{}'", stop.name);
            }
        }

        self.timezone()?;
        self.resolve_theme()?;

        return Ok(());
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        return std::time::Duration::from_secs(self.refresh_interval_secs);
    }

    pub fn timezone(&self) -> result::BusDashResult<chrono_tz::Tz> {
        return self.timezone.parse::<chrono_tz::Tz>().map_err(|e| result::make_error(
            &format!("Unknown timezone '{}': {}", self.timezone, e)));
    }

    /// An inline theme wins over a named preset; the default is `classic`.
    pub fn resolve_theme(&self) -> result::BusDashResult<theme::Theme> {
        if let Some(ref theme) = self.theme {
            return Ok(theme.clone());
        }
        match self.theme_preset {
            Some(ref name) => theme::Theme::preset(name),
            None => Ok(theme::Theme::classic()),
        }
    }
}

#[cfg(test)]
mod tests {
    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        return move |name: &str| vars.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone());
    }

    #[test]
    fn defaults() {
        let config = super::Config::default();

        assert_eq!(super::DEFAULT_API_URL, config.api_url);
        assert_eq!(30, config.refresh_interval_secs);
        assert_eq!(vec!["Downstairs", "Opposite"],
                   config.stops.iter().map(|s| s.name.as_str()).collect::<Vec<_>>());
        assert_eq!(chrono_tz::Asia::Singapore, config.timezone().expect("timezone"));
    }

    #[test]
    fn env_overrides() {
        let mut config = super::Config::default();
        config.apply_env(env(&[
            ("API_KEY", "secret"),
            ("BUS_STOP_CODE_A", "83139"),
            ("BUS_STOP_CODE_B", "83131"),
        ]));

        assert_eq!("secret", config.api_key);
        assert_eq!("83139", config.stops[0].code);
        assert_eq!("83131", config.stops[1].code);
    }

    #[test]
    fn missing_env_keeps_file_values() {
        let mut config: super::Config = serde_json::from_str(
            r#"{"api_key": "from-file", "stops": [{"name": "North", "code": "1"}, {"name": "South", "code": "2"}]}"#)
            .expect("parse config");
        config.apply_env(env(&[("BUS_STOP_CODE_B", "99")]));

        assert_eq!("from-file", config.api_key);
        assert_eq!("1", config.stops[0].code);
        assert_eq!("99", config.stops[1].code);
        assert_eq!("South", config.stops[1].name);
    }

    #[test]
    fn env_file() {
        let path = std::env::temp_dir().join(format!("busdash-{}.env", std::process::id()));
        std::fs::write(&path, "# stops near the flat\nAPI_KEY=from-dotenv\nBUS_STOP_CODE_A=\"83139\"\n").expect("write .env");

        let vars = super::env_file_vars(&path).expect("env_file_vars");
        let _ = std::fs::remove_file(&path);

        let mut config = super::Config::default();
        config.apply_env(move |name| vars.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone()));

        assert_eq!("from-dotenv", config.api_key);
        assert_eq!("83139", config.stops[0].code);
        assert_eq!("", config.stops[1].code);

        assert!(super::env_file_vars(std::env::temp_dir().join("busdash-missing.env")).is_err());
    }

    #[test]
    fn misspelled_key_is_rejected() {
        let path = std::env::temp_dir().join(format!("busdash-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"refresh_interval": 10}"#).expect("write config");

        let err = super::config_from_file(&path).expect_err("unknown key");
        assert!(format!("{}", err).contains("unknown field `refresh_interval`"), "{}", err);
        let _ = std::fs::remove_file(&path);

        let res: Result<super::Config, _> = serde_json::from_str(
            r#"{"stops": [{"name": "North", "code": "1", "cod": "2"}, {"name": "South", "code": "3"}]}"#);
        assert!(res.is_err());
    }

    #[test]
    fn interval_is_clamped() {
        let mut config = super::Config::default();
        config.refresh_interval_secs = 1;
        config.validate().expect("validate");
        assert_eq!(5, config.refresh_interval_secs);

        config.refresh_interval_secs = 3600;
        config.validate().expect("validate");
        assert_eq!(std::time::Duration::from_secs(300), config.refresh_interval());
    }

    #[test]
    fn exactly_two_stops() {
        let mut config = super::Config::default();
        config.stops.pop();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_timezone() {
        let mut config = super::Config::default();
        config.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn theme_selection() {
        let mut config = super::Config::default();
        assert_eq!(super::theme::Theme::classic(), config.resolve_theme().expect("classic"));

        config.theme_preset = Some("plain".to_string());
        assert_eq!(super::theme::Theme::plain(), config.resolve_theme().expect("plain"));

        config.theme_preset = Some("neon".to_string());
        assert!(config.resolve_theme().is_err());
    }
}
