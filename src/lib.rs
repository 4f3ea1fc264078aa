//! Client for the AlsoEnergy SOAP WebAPI: sessions, site and hardware catalog, summary and
//! current readings, and the site usage figures derived from them.

pub mod api;
pub mod catalog;
pub mod model;
pub mod normalize;
pub mod poller;
pub mod readings;
pub mod settings;
pub mod usage;

pub use api::{api, get_timestamp, login, logout, Error};
pub use catalog::{fetch_catalog, list_site_hardware, list_sites, summary_hardware, Catalog};
pub use normalize::{normalize_device_list, normalize_field_list};
pub use readings::{get_current_data, get_summary_data};
