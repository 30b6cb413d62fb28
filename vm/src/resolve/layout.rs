//! Memory-layout resolver: assigns every instruction and global a
//! concrete address.

use crate::error::VmError;
use crate::program::{LayoutParams, MemoryLayout, ProgramFile};

fn align_up(value: u32, alignment: u32) -> u32 {
    let alignment = alignment.max(1);
    (value + alignment - 1) / alignment * alignment
}

/// Assign addresses to every instruction (code section) and global (data
/// section, word-aligned and laid out in declaration order) and attach
/// the resulting [`MemoryLayout`].
pub fn resolve(program: &ProgramFile, params: LayoutParams) -> Result<ProgramFile, VmError> {
    let mut resolved = program.clone();

    let code_len = resolved.instructions.len() as u32 * 4;
    let code_end = params.base_address + code_len;
    for (index, entry) in resolved.instructions.iter_mut().enumerate() {
        entry.address = Some(params.base_address + index as u32 * 4);
    }

    let mut cursor = align_up(code_end, params.alignment.max(4));
    let data_start = cursor;
    for global in &mut resolved.globals {
        let align = global.size.max(4);
        cursor = align_up(cursor, align);
        global.address = Some(cursor);
        cursor += global.size.max(4);
    }
    let data_end = cursor;

    resolved.memory_layout = Some(MemoryLayout {
        base_address: params.base_address,
        code_end,
        data_start,
        data_end,
    });

    Ok(resolved)
}
