pub mod bulk_import;
