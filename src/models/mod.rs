//! 核心数据模型模块
//!
//! 定义对话记录、反馈记录、玩家类型画像、检索片段以及模型输出的目标结构。

pub mod answer;
pub mod content;
pub mod conversation;
pub mod feedback;
pub mod player_type;

pub use answer::*;
pub use content::*;
pub use conversation::*;
pub use feedback::*;
pub use player_type::*;
