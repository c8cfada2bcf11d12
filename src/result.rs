extern crate anyhow;
extern crate chrono;
extern crate image;
extern crate reqwest;
extern crate serde_json;
extern crate std;

pub type BusDashResult<T> = std::result::Result<T, BusDashError>;

#[derive(Debug)]
pub enum BusDashError {
    HttpError(reqwest::Error),
    ImageError(image::ImageError),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    TimeParseError(chrono::ParseError),
    OtherError(anyhow::Error),
}

pub fn make_error(msg: &str) -> BusDashError {
    return BusDashError::OtherError(anyhow::anyhow!("{}", msg));
}

impl std::fmt::Display for BusDashError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            BusDashError::HttpError(ref err) => {
                return write!(f, "HTTP Error: {}", err);
            },
            BusDashError::ImageError(ref err) => {
                return write!(f, "Image Error: {}", err);
            },
            BusDashError::IoError(ref err) => {
                return write!(f, "IO Error: {}", err);
            },
            BusDashError::JsonError(ref err) => {
                return write!(f, "JSON Error: {}", err);
            },
            BusDashError::TimeParseError(ref err) => {
                return write!(f, "Time Parse Error: {}", err);
            },
            BusDashError::OtherError(ref err) => {
                // {:#} keeps the anyhow context chain on one line.
                return write!(f, "Error: {:#}", err);
            },
        }
    }
}

impl std::error::Error for BusDashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            BusDashError::HttpError(ref err) => Some(err),
            BusDashError::ImageError(ref err) => Some(err),
            BusDashError::IoError(ref err) => Some(err),
            BusDashError::JsonError(ref err) => Some(err),
            BusDashError::TimeParseError(ref err) => Some(err),
            BusDashError::OtherError(ref err) => Some(&**err),
        }
    }
}

impl From<reqwest::Error> for BusDashError {
    fn from(err: reqwest::Error) -> BusDashError {
        return BusDashError::HttpError(err);
    }
}

impl From<image::ImageError> for BusDashError {
    fn from(err: image::ImageError) -> BusDashError {
        return BusDashError::ImageError(err);
    }
}

impl From<std::io::Error> for BusDashError {
    fn from(err: std::io::Error) -> BusDashError {
        return BusDashError::IoError(err);
    }
}

impl From<serde_json::Error> for BusDashError {
    fn from(err: serde_json::Error) -> BusDashError {
        return BusDashError::JsonError(err);
    }
}

impl From<chrono::ParseError> for BusDashError {
    fn from(err: chrono::ParseError) -> BusDashError {
        return BusDashError::TimeParseError(err);
    }
}

impl From<anyhow::Error> for BusDashError {
    fn from(err: anyhow::Error) -> BusDashError {
        return BusDashError::OtherError(err);
    }
}
