pub mod build;
pub mod export;
pub mod init;
pub mod install;
pub mod start;
pub mod watch;
