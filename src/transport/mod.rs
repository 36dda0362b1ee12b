// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

pub mod command;
pub mod discovery;
pub mod serial;

use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream the command link can own.
///
/// Implemented for every async reader/writer, so a `tokio_serial::SerialStream`
/// works as well as an in-memory `tokio::io::DuplexStream`.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}
