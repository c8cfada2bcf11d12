extern crate image;
extern crate pretty_bytes;
extern crate querystring;
extern crate std;
extern crate tiny_http;

use crate::display;
use crate::result;

pub type LatestImage = std::sync::Arc<std::sync::Mutex<Option<Vec<u8>>>>;

/// Hands the latest board to the kiosk HTTP server.
pub struct KioskDisplay {
    latest: LatestImage,
}

impl KioskDisplay {
    pub fn new() -> KioskDisplay {
        return KioskDisplay{
            latest: std::sync::Arc::new(std::sync::Mutex::new(None)),
        };
    }

    pub fn latest(&self) -> LatestImage {
        return self.latest.clone();
    }
}

impl display::Display for KioskDisplay {
    fn show(&mut self, image: &image::RgbImage) -> result::BusDashResult<()> {
        let png = display::encode_png(image)?;
        match self.latest.lock() {
            Ok(mut latest) => *latest = Some(png),
            Err(poisoned) => *poisoned.into_inner() = Some(png),
        }
        return Ok(());
    }
}

pub struct Page {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Page {
    fn html(status: u16, body: String) -> Page {
        return Page{status: status, content_type: "text/html; charset=utf-8", body: body.into_bytes()};
    }

    fn not_found() -> Page {
        return Page::html(404, "<h1>404</h1><p>Not found!<p>".to_string());
    }
}

pub fn start_kiosk_server(port: u16, log_dir: &str, latest: LatestImage) -> result::BusDashResult<std::thread::JoinHandle<()>> {
    let server = tiny_http::Server::http(("0.0.0.0", port)).map_err(|e| result::make_error(
        &format!("Couldn't listen on port {}: {}", port, e)))?;
    info!("Running kiosk HTTP server on port {}", port);

    let log_dir = log_dir.to_string();
    let handle = std::thread::Builder::new()
        .name("kiosk-http".to_string())
        .spawn(move || {
            for request in server.incoming_requests() {
                let page = route(request.url(), &log_dir, &latest);
                debug!("{} {} -> {}", request.method(), request.url(), page.status);

                let mut response = tiny_http::Response::from_data(page.body)
                    .with_status_code(tiny_http::StatusCode(page.status));
                if let Ok(header) = tiny_http::Header::from_bytes(&b"Content-Type"[..], page.content_type.as_bytes()) {
                    response = response.with_header(header);
                }
                if let Err(err) = request.respond(response) {
                    warn!("Error writing response: {}", err);
                }
            }
        })?;

    return Ok(handle);
}

pub fn route(url: &str, log_dir: &str, latest: &LatestImage) -> Page {
    let (path, query) = match url.find('?') {
        Some(i) => (&url[..i], &url[i + 1..]),
        None => (url, ""),
    };

    match path {
        "/" => main_page(),
        "/current.png" => current_image(latest),
        "/logs" => list_logs(log_dir),
        "/dumplog" => dump_log(log_dir, query),
        _ => Page::not_found(),
    }
}

fn main_page() -> Page {
    return Page::html(200, "<html><head><title>Bus Arrival Times</title>\
        <style>body{margin:0;background:#000;}img{display:block;width:100vw;height:100vh;object-fit:contain;}</style>\
        </head><body><img id='board' src='/current.png' />\
        <script>setInterval(function(){document.getElementById('board').src='/current.png?t='+Date.now();},1000);</script>\
        </body></html>".to_string());
}

fn current_image(latest: &LatestImage) -> Page {
    let png = match latest.lock() {
        Ok(latest) => latest.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };

    match png {
        Some(png) => Page{status: 200, content_type: "image/png", body: png},
        None => Page::html(503, "<p>No board rendered yet</p>".to_string()),
    }
}

fn which_log(query: &str) -> Option<String> {
    for (k, v) in querystring::querify(query) {
        // Bare file names only.
        if k == "log" && v.ends_with(".log") && !v.contains('/') && !v.contains('\\') && !v.starts_with('.') {
            return Some(v.to_string());
        }
    }

    return None;
}

fn dump_log(log_dir: &str, query: &str) -> Page {
    let filename = match which_log(query) {
        Some(filename) => filename,
        None => return Page::not_found(),
    };

    match std::fs::read(std::path::Path::new(log_dir).join(filename)) {
        Ok(contents) => Page{status: 200, content_type: "text/plain; charset=utf-8", body: contents},
        Err(_) => Page::not_found(),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    return escaped;
}

fn list_logs(log_dir: &str) -> Page {
    let mut body = "<html><body><h1>busdash logs</h1><ul>".to_string();

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => return Page::html(500, format!("<p>Couldn't read {}: {}</p>",
                                                   escape_html(log_dir), escape_html(&format!("{}", err)))),
    };

    let mut logs = vec![];
    for entry in entries.filter_map(|e| e.ok()) {
        let filename = entry.file_name().to_string_lossy().to_string();
        if filename.ends_with(".log") {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            logs.push((filename, size));
        }
    }
    logs.sort();

    for (filename, size) in logs {
        let filename = escape_html(&filename);
        body.push_str(&format!("<li><a href='/dumplog?log={}'>{}</a> [{}]</li>",
                               filename, filename, pretty_bytes::converter::convert(size as f64)));
    }
    body.push_str("</ul></body></html>");

    return Page::html(200, body);
}
