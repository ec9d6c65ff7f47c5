// Library root: the listing store, CSV import/export, the pricing analyzer,
// and the session that ties them to a front end.

pub mod analyzer;
pub mod config;
pub mod export;
pub mod form;
pub mod import;
pub mod listing;
pub mod money;
pub mod session;
pub mod store;
