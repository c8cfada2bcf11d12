extern crate image;
extern crate std;

use crate::result;

/// Somewhere a rendered board can be shown.
pub trait Display {
    fn show(&mut self, image: &image::RgbImage) -> result::BusDashResult<()>;
}

/// Keeps a PNG on disk up to date, e.g. for `feh --reload 1` in kiosk mode.
pub struct PngFileDisplay {
    path: std::path::PathBuf,
    tmp_path: std::path::PathBuf,
}

impl PngFileDisplay {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PngFileDisplay {
        let path = path.as_ref().to_path_buf();
        let mut tmp_path = path.clone().into_os_string();
        tmp_path.push(".tmp");
        return PngFileDisplay{
            path: path,
            tmp_path: std::path::PathBuf::from(tmp_path),
        };
    }
}

impl Display for PngFileDisplay {
    fn show(&mut self, image: &image::RgbImage) -> result::BusDashResult<()> {
        // Write-then-rename so a viewer never picks up half a file.
        image.save_with_format(&self.tmp_path, image::ImageFormat::Png)?;
        std::fs::rename(&self.tmp_path, &self.path)?;
        return Ok(());
    }
}

pub fn encode_png(image: &image::RgbImage) -> result::BusDashResult<Vec<u8>> {
    let mut bytes: Vec<u8> = vec![];
    image::DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)?;
    return Ok(bytes);
}

#[cfg(test)]
mod tests {
    use super::Display;

    #[test]
    fn png_file_display() {
        let path = std::env::temp_dir().join(format!("busdash-test-{}.png", std::process::id()));
        let image = image::RgbImage::from_pixel(8, 4, image::Rgb([0x33, 0x33, 0x33]));

        let mut display = super::PngFileDisplay::new(&path);
        display.show(&image).expect("show");

        let read_back = image::open(&path).expect("open png").to_rgb8();
        assert_eq!(image, read_back);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn encoded_png_decodes() {
        let image = image::RgbImage::from_pixel(3, 2, image::Rgb([0xff, 0x4c, 0x4c]));
        let bytes = super::encode_png(&image).expect("encode");

        assert_eq!(&[0x89, b'P', b'N', b'G'], &bytes[0..4]);
        let decoded = image::load_from_memory(&bytes).expect("decode").to_rgb8();
        assert_eq!(image, decoded);
    }
}
