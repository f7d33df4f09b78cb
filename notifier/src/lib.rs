//! # Notifier
//!
//! Delivers a diff to a chat endpoint as one or more messages.
//!
//! ## Features
//!
//! - **Line-safe Chunking**: Oversized diffs are split at line boundaries into
//!   messages that fit the transport
//! - **Ordered Delivery**: Chunks are sent one at a time, in order
//! - **Best-effort**: A failed chunk is logged and the rest are still sent
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Notifier                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  diff ──► NotificationBatch ──► Notifier ──► ChatTransport     │
//! │                                     │              │            │
//! │                                     ▼              ▼            │
//! │                              DeliveryReport    Telegram        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod chunk;
pub mod error;
pub mod notifier;
pub mod transport;

pub use chunk::{DEFAULT_MAX_CHUNK, NotificationBatch, message_len};
pub use error::{NotifyError, Result};
pub use notifier::{DeliveryReport, Notifier};
pub use transport::{ChatTransport, DEFAULT_SEND_TIMEOUT, TELEGRAM_MAX_MESSAGE, TelegramTransport};
