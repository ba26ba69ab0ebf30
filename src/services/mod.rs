pub mod attributes;
pub mod classifier;
pub mod epg_sync;
pub mod fetcher;
pub mod m3u_parser;
pub mod metrics;
pub mod store;
pub mod sync;
pub mod xtream;
