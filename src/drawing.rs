extern crate anyhow;
extern crate chrono;
extern crate chrono_tz;
extern crate image;
extern crate imageproc;
extern crate rusttype;
extern crate std;

use anyhow::Context;
use crate::result;
use crate::structs::{Board, FetchStatus, Section, StopArrivals};
use crate::theme::{Layout, Theme};

pub struct Styles {
    pub font: rusttype::Font<'static>,
    pub font_bold: rusttype::Font<'static>,
}

const HEADER_HEIGHT: u32 = 56;
const PADDING: i32 = 10;
const SECTION_TITLE_HEIGHT: u32 = 36;
const ROW_HEIGHT: u32 = 36;
const ROW_GAP: u32 = 4;
const CELL_GAP: u32 = 4;
pub const ARRIVAL_CELLS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Area {
    fn rect(&self) -> imageproc::rect::Rect {
        return imageproc::rect::Rect::at(self.x, self.y)
            .of_size(std::cmp::max(1, self.width), std::cmp::max(1, self.height));
    }
}

pub fn load_styles(font_path: &str, bold_font_path: &str) -> result::BusDashResult<Styles> {
    return Ok(Styles{
        font: load_font(font_path)?,
        font_bold: load_font(bold_font_path)?,
    });
}

fn load_font(path: &str) -> result::BusDashResult<rusttype::Font<'static>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Reading font '{}'", path))?;
    return rusttype::Font::try_from_vec(bytes)
        .ok_or(result::make_error(&format!("Not a usable font: {}", path)));
}

pub fn clock_text(now: &chrono::DateTime<chrono::Utc>, tz: &chrono_tz::Tz) -> String {
    return now.with_timezone(tz).format("%I:%M:%S %p").to_string();
}

pub fn generate_image(board: &Board,
                      theme: &Theme,
                      styles: &Styles,
                      width: u32,
                      height: u32,
                      clock: Option<&str>) -> image::RgbImage {
    let mut imgbuf = image::RgbImage::from_pixel(width, height, theme.colors.background.rgb());

    draw_header(&mut imgbuf, theme, styles, clock);

    let areas = section_areas(theme.layout, board.sections.len(), width, height);
    for (section, area) in board.sections.iter().zip(areas.iter()) {
        draw_section(&mut imgbuf, theme, styles, section, area);
    }

    return imgbuf;
}

fn draw_header(imgbuf: &mut image::RgbImage, theme: &Theme, styles: &Styles, clock: Option<&str>) {
    let header = Area{x: 0, y: 0, width: imgbuf.width(), height: HEADER_HEIGHT};
    imageproc::drawing::draw_filled_rect_mut(imgbuf, header.rect(), theme.colors.header_background.rgb());

    let title_scale = 36.0;
    imageproc::drawing::draw_text_mut(
        imgbuf, theme.colors.header_text.rgb(),
        PADDING, centered_y(&header, title_scale),
        scale(title_scale), &styles.font_bold, &theme.title);

    if let Some(clock) = clock {
        let clock_scale = 30.0;
        let w = text_width(&styles.font_bold, clock_scale, clock);
        imageproc::drawing::draw_text_mut(
            imgbuf, theme.colors.header_text.rgb(),
            header.width as i32 - PADDING - w, centered_y(&header, clock_scale),
            scale(clock_scale), &styles.font_bold, clock);
    }
}

fn draw_section(imgbuf: &mut image::RgbImage, theme: &Theme, styles: &Styles, section: &Section, area: &Area) {
    let title_area = Area{x: area.x, y: area.y, width: area.width, height: SECTION_TITLE_HEIGHT};
    draw_centered_text(imgbuf, theme.colors.section_title.rgb(), &title_area, 30.0, &styles.font_bold, &section.name);

    if let Some(status) = status_line(&section.arrivals, theme) {
        let status_area = row_area(area, 0);
        draw_centered_text(imgbuf, theme.colors.status_text.rgb(), &status_area, 26.0, &styles.font, &status);
        return;
    }

    let max_rows = rows_that_fit(area);
    if section.arrivals.services.len() > max_rows {
        debug!("Section '{}': showing {} of {} services",
               section.name, max_rows, section.arrivals.services.len());
    }

    for (i, service) in section.arrivals.services.iter().take(max_rows).enumerate() {
        let (service_area, time_areas) = cell_areas(&row_area(area, i));

        imageproc::drawing::draw_filled_rect_mut(imgbuf, service_area.rect(), theme.colors.service_background.rgb());
        draw_centered_text(imgbuf, theme.colors.service_text.rgb(), &service_area, 28.0, &styles.font, &service.service_number);

        let arrivals = service.arrival_minutes.iter().zip(service.vehicle_types.iter());
        for ((minutes, vehicle_type), cell) in arrivals.zip(time_areas.iter()) {
            let style = theme.cell_style(*minutes, vehicle_type);
            imageproc::drawing::draw_filled_rect_mut(imgbuf, cell.rect(), style.background.rgb());
            draw_centered_text(imgbuf, style.foreground.rgb(), cell, 28.0, &styles.font_bold, &style.text);
        }
    }
}

/// What to show instead of rows, if anything.
pub fn status_line(arrivals: &StopArrivals, theme: &Theme) -> Option<String> {
    match arrivals.status {
        FetchStatus::Ok => {
            if arrivals.services.is_empty() {
                return Some("No buses".to_string());
            }
            return None;
        },
        FetchStatus::HttpStatus(code) if theme.show_fetch_errors => {
            return Some(format!("Unavailable (HTTP {})", code));
        },
        FetchStatus::Failed(_) if theme.show_fetch_errors => {
            return Some("Unavailable".to_string());
        },
        _ => return None,
    }
}

pub fn section_areas(layout: Layout, count: usize, width: u32, height: u32) -> Vec<Area> {
    if count == 0 {
        return vec![];
    }

    let n = count as i32;
    let top = HEADER_HEIGHT as i32 + PADDING;
    let available_w = std::cmp::max(n, width as i32 - 2 * PADDING);
    let available_h = std::cmp::max(n, height as i32 - top - PADDING);

    return (0..n).map(|i| {
        match layout {
            Layout::Stacked => {
                let h = std::cmp::max(1, (available_h - PADDING * (n - 1)) / n);
                Area{x: PADDING, y: top + i * (h + PADDING), width: available_w as u32, height: h as u32}
            },
            Layout::SideBySide => {
                let w = std::cmp::max(1, (available_w - PADDING * (n - 1)) / n);
                Area{x: PADDING + i * (w + PADDING), y: top, width: w as u32, height: available_h as u32}
            },
        }
    }).collect();
}

pub fn rows_that_fit(area: &Area) -> usize {
    let rows_height = area.height.saturating_sub(SECTION_TITLE_HEIGHT);
    return ((rows_height + ROW_GAP) / (ROW_HEIGHT + ROW_GAP)) as usize;
}

fn row_area(area: &Area, row: usize) -> Area {
    return Area{
        x: area.x,
        y: area.y + (SECTION_TITLE_HEIGHT + row as u32 * (ROW_HEIGHT + ROW_GAP)) as i32,
        width: area.width,
        height: ROW_HEIGHT,
    };
}

/// Splits a row 1:3 between the service number and the arrival cells.
pub fn cell_areas(row: &Area) -> (Area, Vec<Area>) {
    let service_w = row.width / 4;
    let times_w = row.width.saturating_sub(service_w + CELL_GAP);
    let cell_w = times_w.saturating_sub(CELL_GAP * (ARRIVAL_CELLS as u32 - 1)) / ARRIVAL_CELLS as u32;

    let service = Area{x: row.x, y: row.y, width: service_w, height: row.height};
    let first_x = row.x + (service_w + CELL_GAP) as i32;
    let cells = (0..ARRIVAL_CELLS).map(|i| Area{
        x: first_x + i as i32 * (cell_w + CELL_GAP) as i32,
        y: row.y,
        width: cell_w,
        height: row.height,
    }).collect();

    return (service, cells);
}

fn draw_centered_text(imgbuf: &mut image::RgbImage, color: image::Rgb<u8>, area: &Area, size: f32, font: &rusttype::Font, text: &str) {
    let w = text_width(font, size, text);
    let x = area.x + (area.width as i32 - w) / 2;
    imageproc::drawing::draw_text_mut(imgbuf, color, x, centered_y(area, size), scale(size), font, text);
}

fn text_width(font: &rusttype::Font, size: f32, text: &str) -> i32 {
    return font.layout(text, scale(size), rusttype::point(0.0, 0.0))
        .filter_map(|glyph| glyph.pixel_bounding_box())
        .map(|bb| bb.max.x)
        .max()
        .unwrap_or(0);
}

fn centered_y(area: &Area, size: f32) -> i32 {
    return area.y + (area.height as i32 - size as i32) / 2;
}

fn scale(s: f32) -> rusttype::Scale {
    return rusttype::Scale{x: s, y: s};
}
