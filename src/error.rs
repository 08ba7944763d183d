//! 全局错误类型定义

use std::io::Error as IoError;
use std::path::PathBuf;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdRulesError {
    // 规则源相关错误
    #[error("规则源清单不存在：{}", .0.display())]
    MissingManifest(PathBuf),
    #[error("规则源不可用：{0}")]
    SourceUnavailable(String),

    // README 统计区相关错误
    #[error("说明文档不存在：{}", .0.display())]
    MissingDocument(PathBuf),
    #[error("未找到统计区标记：{0}")]
    MarkerNotFound(String),
    #[error("统计区标记不唯一或嵌套错误：{0}")]
    AmbiguousMarker(String),

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),

    // 序列化错误
    #[error("JSON序列化失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
    #[error("异步任务执行失败：{0}")]
    AsyncTaskError(String),
}

// 全局Result类型
pub type AdrResult<T> = Result<T, AdRulesError>;
