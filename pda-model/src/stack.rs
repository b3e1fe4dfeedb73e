//! スレッドのスタック

use crate::{indent, Frame};
use serde::{Deserialize, Serialize};
use std::fmt;

/// スレッドID
pub type ThreadId = u32;

/// 1つのスタックから取り出すフレーム数の上限
pub const MAX_STACK_DEPTH: usize = 100;

/// 1スレッドのコールスタック
///
/// `frames` はフレーム番号 0（最も内側）から順に並びます。
/// スレッドIDを解析できなかった場合 `thread_id` は `None` です。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub frames: Vec<Frame>,
    pub thread_id: Option<ThreadId>,
}

impl Stack {
    /// フレーム列とスレッドIDからスタックを作成する
    pub fn new(frames: Vec<Frame>, thread_id: Option<ThreadId>) -> Self {
        Self { frames, thread_id }
    }

    /// スタックの深さ
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// スタックが空かどうか
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl From<Stack> for Vec<Stack> {
    fn from(stack: Stack) -> Self {
        vec![stack]
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.thread_id {
            Some(tid) => writeln!(f, "Stack for thread 0x{:x}", tid)?,
            None => writeln!(f, "Stack for thread <unknown>")?,
        }
        for frame in &self.frames {
            write!(f, "{}", indent(&frame.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_properties() {
        let frames = vec![Frame::new("a", 0), Frame::new("b", 1)];
        let s = Stack::new(frames.clone(), Some(123));
        assert_eq!(s.frames, frames);
        assert_eq!(s.thread_id, Some(123));
        assert_eq!(s.depth(), 2);
    }

    #[test]
    fn test_stack_display_indents_frames() {
        let s = Stack::new(vec![Frame::new("a", 0), Frame::new("b", 1)], Some(0xe00));
        assert_eq!(
            s.to_string(),
            "Stack for thread 0xe00\n  Index: 0\n    Location: a\n  Index: 1\n    Location: b\n"
        );
    }

    #[test]
    fn test_empty_stack_display() {
        let s = Stack::default();
        assert!(s.is_empty());
        assert_eq!(s.to_string(), "Stack for thread <unknown>\n");
    }
}
