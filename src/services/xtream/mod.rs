//! Xtream Codes Integration
//!
//! Xtream Codes is a popular IPTV management system. An account exposes the
//! same catalog two ways:
//!
//! ```text
//! http://server:port/player_api.php?username=X&password=Y&action=get_vod_streams
//! http://server:port/get.php?username=X&password=Y&type=m3u_plus&output=ts
//! ```
//!
//! The Player API is the primary source; the `get.php` playlist is the
//! fallback when the API fails or comes back empty.

pub mod client;
pub mod provider;
pub mod types;

// Re-exports for convenience
pub use client::{XtreamClient, XtreamError};
pub use provider::ProviderConfig;
pub use types::{
    XtreamCategory, XtreamEpgEntry, XtreamEpgListings, XtreamLiveStream, XtreamSeries,
    XtreamVodStream,
};
