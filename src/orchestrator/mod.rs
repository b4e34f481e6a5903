//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责组装各层组件并分发用户命令，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用主结构
//! - 初始化：加载 API 密钥、打开词汇库、创建扫描流程
//! - 命令分发：scan / pages / page / book / assign / unassign / print / key
//! - 持有文档查看器，打印后释放生成的 PDF
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (处理一条命令)
//!     ↓
//! workflow::ScanFlow (提取 → 解析 → 保存)
//!     ↓
//! services (能力层：extraction / image / settings)
//!     ↓
//! store / document (词汇库 / PDF 排版)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有存储和查看器
//! 2. **向下依赖**：编排层 → workflow → services → store / document
//! 3. **无业务逻辑**：只做调度和输出格式化

pub mod app;

pub use app::App;
