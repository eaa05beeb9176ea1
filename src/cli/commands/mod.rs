pub mod add;
pub mod completions;
pub mod delete;
pub mod export;
pub mod generate;
pub mod get;
pub mod import_cmd;
pub mod init;
pub mod list;
pub mod reset;
pub mod stats;
pub mod update;
