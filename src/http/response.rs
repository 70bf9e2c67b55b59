use std::collections::HashMap;
use std::time::SystemTime;

use serde::Serialize;

use crate::error::ServerError;

/// An outbound response, built up by handlers and encoded to the wire by
/// the server once the handler completes.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Response {
    pub fn new(status: u16) -> Response {
        Response {
            status,
            headers: HashMap::new(),
            body: String::new(),
        }
    }

    pub fn body<T: AsRef<str>>(&mut self, body: T) -> &mut Self {
        self.body = body.as_ref().to_string();
        self
    }

    pub fn header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        self.headers
            .insert(name.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// A `200` plain-text response.
    pub fn text<T: AsRef<str>>(content: T) -> Response {
        let mut response = Response::new(200);
        response.header("Content-Type", "text/plain").body(content);
        response
    }

    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<&mut Self, ServerError> {
        let json_string = serde_json::to_string(value)
            .map_err(|e| ServerError::Internal(format!("json serialization error: {e}")))?;
        self.header("Content-Type", "application/json");
        self.body(json_string);
        Ok(self)
    }

    /// The server's default rendering of an error: the matching status
    /// code and a small JSON envelope describing it.
    pub fn error(err: ServerError) -> Response {
        let status = err.status_code();
        let mut response = Response::new(status);
        response.header("Content-Type", "application/json");
        response.body(
            serde_json::json!({
                "error": {
                    "message": err.to_string(),
                    "status": status,
                }
            })
            .to_string(),
        );
        response
    }

    /// Renders the HTTP/1.1 wire form. The server speaks one request per
    /// connection, so every response carries `Connection: close`.
    pub fn encode(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status,
            reason_phrase(self.status)
        );
        for (name, value) in &self.headers {
            head += &format!("{name}: {value}\r\n");
        }
        head += &format!("Date: {}\r\n", httpdate::fmt_http_date(SystemTime::now()));
        head += &format!("Content-Length: {}\r\n", self.body.len());
        head += "Connection: close\r\n\r\n";

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_sets_status_and_content_type() {
        let response = Response::text("Hello from Botgauge");
        assert_eq!(response.status, 200);
        assert_eq!(
            response.headers.get("Content-Type").map(String::as_str),
            Some("text/plain")
        );
        assert_eq!(response.body, "Hello from Botgauge");
    }

    #[test]
    fn json_sets_content_type_and_serializes() {
        let mut response = Response::new(200);
        response.json(&serde_json::json!({ "ok": true })).unwrap();
        assert_eq!(
            response.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(response.body, r#"{"ok":true}"#);
    }

    #[test]
    fn error_maps_not_found_to_404() {
        let response = Response::error(ServerError::NotFound);
        assert_eq!(response.status, 404);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["error"]["status"], 404);
        assert_eq!(body["error"]["message"], "not found");
    }

    #[test]
    fn encode_frames_status_line_headers_and_body() {
        let wire = Response::text("Hello from Botgauge").encode();
        let wire = String::from_utf8(wire).unwrap();

        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains("Content-Type: text/plain\r\n"));
        assert!(wire.contains("Content-Length: 19\r\n"));
        assert!(wire.contains("Connection: close\r\n"));
        assert!(wire.contains("Date: "));
        assert!(wire.ends_with("\r\n\r\nHello from Botgauge"));
    }

    #[test]
    fn encode_uses_byte_length_for_content_length() {
        let mut response = Response::new(200);
        response.body("héllo");
        let wire = String::from_utf8(response.encode()).unwrap();
        assert!(wire.contains(&format!("Content-Length: {}\r\n", "héllo".len())));
    }
}
