//! # Vokabel-Scan
//!
//! 拍照识别词汇表、整理成书并打印成词汇测试的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据层（Store / Document）
//! - `store/` - 词汇库：页面、书以及"一页最多属于一本书"的归属关系
//! - `document/` - 评分表计算、分页排版、PDF 渲染
//! - `parser` - 把模型返回的文本解析成词汇对
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `ExtractionService` - 图片 → 原始文本
//! - `CredentialStore` - API 密钥读写
//! - `ImagePayload` - 图片校验与编码
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一张图片"的完整处理流程
//! - `ScanFlow` - 提取 → 解析 → 保存
//! - `RequestGuard` - 只接受最新一次请求的结果
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 组装组件并分发命令
//!
//! ## 模块结构

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod services;
pub mod store;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use document::{DocumentGenerator, GradingScale, SheetLayoutEngine};
pub use error::{AppError, AppResult};
pub use models::{Book, Page, VocabularyPair};
pub use orchestrator::App;
pub use parser::parse_pairs;
pub use store::{LibraryStore, MemoryStore, SqliteStore};
pub use workflow::{ExtractionOutcome, ScanFlow};
