//! The resolution pipeline: symbol resolution, memory-layout assignment,
//! then per-instruction text/raw/decoded conversion. Each stage is a pure
//! function `&ProgramFile -> Result<ProgramFile, VmError>`; [`pipeline`]
//! just chains them in the fixed order the symbol resolver's output
//! requires.

pub mod instruction;
pub mod layout;
pub mod symbol;

use crate::error::VmError;
use crate::program::{LayoutParams, ProgramFile};

/// Run the full symbol -> layout -> instruction pipeline.
pub fn pipeline(program: &ProgramFile, layout_params: LayoutParams) -> Result<ProgramFile, VmError> {
    let resolved = symbol::resolve(program)?;
    let resolved = layout::resolve(&resolved, layout_params)?;
    instruction::resolve(&resolved)
}
