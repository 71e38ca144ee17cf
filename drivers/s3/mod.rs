//! S3 disk driver / S3磁盘驱动
//!
//! 把扁平的对象存储模拟成带目录的文件系统：
//! - 目录是以 `/` 结尾的零字节占位对象
//! - 写入嵌套文件时按策略补建上级目录占位
//! - 每个实例绑定一个取消令牌

pub mod client;
pub mod config;
pub mod driver;
pub mod factory;


pub use client::S3Store;
pub use config::{DirectoryMarkers, S3Config};
pub use driver::S3Driver;
pub use factory::{MemoryDriverFactory, S3DriverFactory};
