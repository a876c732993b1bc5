//! Shared helpers for integration tests: image fixtures and a local HTTP responder

#![allow(dead_code)]

use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Square of `color` centred on a white canvas, encoded as `format`
pub fn square_on_white(size: u32, color: [u8; 3], format: ImageFormat) -> Vec<u8> {
    let mut image = RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 255]));
    let (start, end) = (size / 4, size - size / 4);
    for y in start..end {
        for x in start..end {
            image.put_pixel(x, y, Rgba([color[0], color[1], color[2], 255]));
        }
    }

    let mut cursor = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => image::DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .write_to(&mut cursor, format)
            .unwrap(),
        _ => image.write_to(&mut cursor, format).unwrap(),
    }
    cursor.into_inner()
}

/// Default PNG fixture
pub fn png_fixture() -> Vec<u8> {
    square_on_white(16, [200, 30, 30], ImageFormat::Png)
}

/// Decode output bytes and check they are a PNG with an alpha channel
pub fn assert_png_with_alpha(bytes: &[u8]) -> RgbaImage {
    assert_eq!(image::guess_format(bytes).unwrap(), ImageFormat::Png);
    let decoded = image::load_from_memory(bytes).unwrap();
    assert!(decoded.color().has_alpha());
    decoded.to_rgba8()
}

#[derive(Clone)]
struct Route {
    status: u16,
    body: Vec<u8>,
    delay: Option<Duration>,
}

/// Minimal HTTP/1.1 responder serving canned bodies by path
///
/// Unknown paths answer 404. Every connection is closed after one response.
pub struct TestServer {
    addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

#[derive(Default)]
pub struct TestServerBuilder {
    routes: HashMap<String, Route>,
}

impl TestServerBuilder {
    pub fn route(mut self, path: &str, status: u16, body: Vec<u8>) -> Self {
        self.routes.insert(
            path.to_string(),
            Route {
                status,
                body,
                delay: None,
            },
        );
        self
    }

    pub fn slow_route(mut self, path: &str, delay: Duration, body: Vec<u8>) -> Self {
        self.routes.insert(
            path.to_string(),
            Route {
                status: 200,
                body,
                delay: Some(delay),
            },
        );
        self
    }

    pub async fn start(self) -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(self.routes);

        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&routes);
                tokio::spawn(async move {
                    let path = read_request_path(&mut socket).await;
                    let route = routes.get(&path).cloned().unwrap_or(Route {
                        status: 404,
                        body: b"not found".to_vec(),
                        delay: None,
                    });
                    if let Some(delay) = route.delay {
                        tokio::time::sleep(delay).await;
                    }

                    let head = format!(
                        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                        route.status,
                        reason_phrase(route.status),
                        route.body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(&route.body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        TestServer { addr, handle }
    }
}

impl TestServer {
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder::default()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_request_path(socket: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buffer.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }

    let request = String::from_utf8_lossy(&buffer);
    request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string()
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
