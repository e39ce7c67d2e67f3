pub mod bug;
pub mod init;
pub mod serve;
