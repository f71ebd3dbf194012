//! # Editor Commands
//!
//! Keyboard and menu actions of the block editor, expressed as pure plans over
//! a [`BlockSequence`]. The workspace applies a plan through the regular block
//! operations, so edits made by keystrokes persist exactly like any other.
//!
//! | Command | Block state | Plan |
//! |---------|-------------|------|
//! | Paragraph break | any | insert empty text block after it, focus the new block |
//! | Delete backward | empty, not text | convert to text in place |
//! | Delete backward | otherwise | nothing |
//! | Convert to type | any | set type, clear content, uncheck when todo |

use crate::blocks::BlockSequence;
use crate::model::{BlockId, BlockPatch, BlockType, NewBlock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    /// Enter.
    ParagraphBreak,
    /// Backspace with the caret at the start of the block.
    DeleteBackward,
    /// A type picked from the slash menu.
    ConvertTo(BlockType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditPlan {
    Nothing,
    /// Insert `block` after `after` and focus it.
    Insert { after: BlockId, block: NewBlock },
    /// Patch `block` in place; focus stays on it.
    Convert { block: BlockId, patch: BlockPatch },
}

pub fn plan(blocks: &BlockSequence, target: BlockId, command: EditCommand) -> EditPlan {
    let Some(block) = blocks.get(target) else {
        return EditPlan::Nothing;
    };

    match command {
        EditCommand::ParagraphBreak => EditPlan::Insert {
            after: target,
            block: NewBlock::text(""),
        },
        EditCommand::DeleteBackward if block.is_empty() && block.block_type != BlockType::Text => {
            EditPlan::Convert {
                block: target,
                patch: BlockPatch::block_type(BlockType::Text),
            }
        }
        EditCommand::DeleteBackward => EditPlan::Nothing,
        EditCommand::ConvertTo(block_type) => EditPlan::Convert {
            block: target,
            patch: BlockPatch {
                block_type: Some(block_type),
                content: Some(String::new()),
                checked: (block_type == BlockType::Todo).then_some(false),
                color: None,
            },
        },
    }
}
