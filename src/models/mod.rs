pub mod location_report;
