//! 协作空间系统核心领域模型
//!
//! 包含用户目录、工作区、成员、消息、文档等核心实体，
//! 以及提及解析和相关的业务规则。

pub mod entities;
pub mod errors;
pub mod mention;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use value_objects::*;
