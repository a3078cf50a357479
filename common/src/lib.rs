//! 请求/查询工作台公共模块
//!
//! 提供各服务共享的基础设施：
//! - 错误类型与统一响应格式
//! - 配置加载
//! - 草稿、校验、执行结果与表元数据模型
//! - 内容编解码、校验流水线、结果格式化与 CRUD 模板生成

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
