//! 🏗 HTTP request implementation

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use seat_booking_core::{CustomerId, Operation, RawRequest, Request};
use tiny_http::{Header, Method, Response};
use tracing::{debug, warn};

const BAD_REQUEST_PAGE: &str = "<html><head><title>400 Bad Request</title></head>\
<body><h1>BAD REQUEST</h1><p>Only GET requests are supported.</p></body></html>\n";

const NOT_FOUND_PAGE: &str = "<html><head><title>404 Not Found</title></head>\
<body><h1>FILE NOT FOUND</h1><p>The requested resource does not exist.</p></body></html>\n";

struct HTTPRequest(tiny_http::Request);

impl RawRequest for HTTPRequest {
    fn url(&self) -> &str {
        self.0.url()
    }

    fn respond_with_string(self: Box<Self>, s: String) {
        self.respond(200, s)
    }

    fn respond_with_err(self: Box<Self>, err: String) {
        self.respond(400, err)
    }

    fn respond_unavailable(self: Box<Self>, reason: String) {
        self.respond(503, reason)
    }

    fn respond_with_failure(self: Box<Self>, reason: String) {
        self.respond(500, reason)
    }
}

impl HTTPRequest {
    fn respond(self, status: u16, mut body: String) {
        body.push('\n');
        let mut res = Response::from_string(body).with_status_code(status);
        add_response_headers(&mut res, "text/html");
        send(self.0, res);
    }
}

/// Parse the given HTTP request
///
/// If [`None`] is returned, the request was already answered: either it was
/// not a GET request, or it asked for a static file below `root`.
pub fn parse(rq: tiny_http::Request, root: &Path) -> Option<Request> {
    if *rq.method() != Method::Get {
        debug!(method = %rq.method(), url = rq.url(), "refusing non-GET request");
        let mut res = Response::from_string(BAD_REQUEST_PAGE).with_status_code(400);
        add_response_headers(&mut res, "text/html");
        send(rq, res);
        return None;
    }

    let url = rq.url().to_owned();
    let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
    let operation = match path {
        "/list_seats" => Operation::List,
        "/view_seat" => Operation::Hold,
        "/confirm" => Operation::Confirm,
        "/cancel" => Operation::Cancel,
        _ => {
            serve_file(rq, root, path);
            return None;
        }
    };

    Some(Request::from_raw(
        operation,
        query_u32(query, "seat"),
        query_u32(query, "user").map(CustomerId),
        query_u32(query, "priority"),
        Box::new(HTTPRequest(rq)),
    ))
}

/// Value of `key` in a `k=v&k=v` query string, if present and a decimal u32
fn query_u32(query: &str, key: &str) -> Option<u32> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == key {
            v.parse().ok()
        } else {
            None
        }
    })
}

fn serve_file(rq: tiny_http::Request, root: &Path, url_path: &str) {
    match resolve(root, url_path).and_then(|path| File::open(path).ok()) {
        Some(file) => {
            let mut res = Response::from_file(file);
            add_response_headers(&mut res, content_type(url_path));
            send(rq, res);
        }
        None => {
            debug!(url = url_path, "file not found");
            let mut res = Response::from_string(NOT_FOUND_PAGE).with_status_code(404);
            add_response_headers(&mut res, "text/html");
            send(rq, res);
        }
    }
}

/// Map `url_path` to a regular file below `root`
///
/// Paths leaving `root` are refused. A directory resolves to its
/// `index.html`.
fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in url_path.split('/').filter(|s| !s.is_empty()) {
        if segment == ".." || segment == "." || segment.contains('\\') {
            return None;
        }
        path.push(segment);
    }
    if path.is_dir() {
        path.push("index.html");
    }
    path.is_file().then_some(path)
}

fn content_type(url_path: &str) -> &'static str {
    let extension = url_path.rsplit_once('.').map_or("", |(_, ext)| ext);
    match extension {
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "text/html",
    }
}

fn add_response_headers<R: Read>(res: &mut Response<R>, content_type: &str) {
    for (field, value) in [
        ("Content-Type", content_type),
        ("Access-Control-Allow-Origin", "*"),
    ] {
        if let Ok(header) = Header::from_bytes(field, value) {
            res.add_header(header);
        }
    }
}

fn send<R: Read>(rq: tiny_http::Request, res: Response<R>) {
    if let Err(err) = rq.respond(res) {
        warn!(error = %err, "HTTP response failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_arguments() {
        let query = "seat=4&user=17&priority=2";
        assert_eq!(query_u32(query, "seat"), Some(4));
        assert_eq!(query_u32(query, "user"), Some(17));
        assert_eq!(query_u32(query, "priority"), Some(2));

        assert_eq!(query_u32("user=17", "seat"), None);
        assert_eq!(query_u32("seat=four", "seat"), None);
        assert_eq!(query_u32("seat", "seat"), None);
        assert_eq!(query_u32("", "seat"), None);
    }

    #[test]
    fn paths_leaving_the_root_are_refused() {
        let root = std::env::current_dir().unwrap();
        assert_eq!(resolve(&root, "/../Cargo.toml"), None);
        assert_eq!(resolve(&root, "/src/../Cargo.toml"), None);
        assert_eq!(resolve(&root, "/./Cargo.toml"), None);
    }

    #[test]
    fn files_below_the_root_are_found() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        assert_eq!(
            resolve(root, "/src/http.rs"),
            Some(root.join("src").join("http.rs"))
        );
        assert_eq!(resolve(root, "/src/missing.rs"), None);
        // no index.html in the crate root
        assert_eq!(resolve(root, "/"), None);
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type("/index.html"), "text/html");
        assert_eq!(content_type("/style.css"), "text/css");
        assert_eq!(content_type("/app.js"), "application/javascript");
        assert_eq!(content_type("/logo.png"), "image/png");
        assert_eq!(content_type("/seats"), "text/html");
    }
}
