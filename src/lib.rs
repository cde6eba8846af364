//! hostchat - a streaming client for an agent host backend
//!
//! Bytes from the host's Server-Sent-Events endpoint are framed
//! ([`sse::FrameParser`]), interpreted into [`sse::DomainEvent`]s, folded
//! into a [`session::StreamingSession`], and projected into display
//! fragments by [`render::Projector`]. [`turn::TurnDriver`] runs one turn
//! end to end.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod render;
pub mod session;
pub mod sse;
pub mod traits;
pub mod turn;
