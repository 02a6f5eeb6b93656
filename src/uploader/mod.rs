// 上传模块
//
// - naming: 远程文件名冲突处理
// - engine: 单文件分块传输
// - manager: 单文件 / 批量上传入口
// - task: 上传记录

pub mod engine;
pub mod manager;
pub mod naming;
pub mod task;

pub use engine::{effective_chunk_size, ProgressReader, UploadEngine};
pub use manager::{BatchReport, BatchStatus, UploadManager};
pub use naming::{split_local_name, MatchRule, NameResolver, RemoteNamer};
pub use task::{UploadTask, UploadTaskStatus};
