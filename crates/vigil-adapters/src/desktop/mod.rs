mod catalog;

pub use catalog::DesktopEntryCatalog;
