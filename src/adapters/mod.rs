pub mod audit_log;
pub mod mqtt;
pub mod replay_file;
pub mod transport;
