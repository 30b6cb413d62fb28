//! Symbol resolver: matches every instruction's symbol reference against
//! the program's functions, globals and labels, in that order.

use crate::error::VmError;
use crate::program::{ProgramFile, SymbolKind};

/// Resolve every [`crate::program::SymbolReference`] in `program`.
///
/// Aggregates every unresolved reference into a single error rather than
/// failing on the first one, so a program with several typos reports all
/// of them in one pass.
pub fn resolve(program: &ProgramFile) -> Result<ProgramFile, VmError> {
    let mut resolved = program.clone();
    let mut errors = Vec::new();

    for (index, entry) in resolved.instructions.iter_mut().enumerate() {
        let Some(reference) = entry.symbol.as_mut() else {
            continue;
        };
        if !reference.kind.is_unknown() {
            continue;
        }

        let kind = if program.functions.contains_key(&reference.name) {
            Some(SymbolKind::Function(reference.name.clone()))
        } else if let Some(global) = program.globals.iter().find(|g| g.name == reference.name) {
            Some(SymbolKind::Global(global.name.clone()))
        } else if let Some(label) = program.labels.iter().find(|l| l.name == reference.name) {
            Some(SymbolKind::Label(label.name.clone()))
        } else {
            None
        };

        match kind {
            Some(kind) => reference.kind = kind,
            None => {
                let line = entry.line.unwrap_or(0);
                errors.push(format!("{} (instruction {index}, line {line})", reference.name));
            }
        }
    }

    if errors.is_empty() {
        tracing::debug!(count = resolved.instructions.len(), "symbol resolution pass complete");
        Ok(resolved)
    } else {
        tracing::warn!(unresolved = errors.len(), "symbol resolution failed");
        Err(VmError::UnresolvedSymbol(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Function, InstructionEntry, Label, SymbolReference, Usage};

    fn program_with(symbols: Vec<&str>) -> ProgramFile {
        let mut program = ProgramFile::new("t.asm");
        program.functions.insert(
            "main".to_string(),
            Function {
                name: "main".to_string(),
                source_file: "t.asm".to_string(),
                line_range: (1, symbols.len() as u32),
                instruction_ranges: vec![(0, symbols.len())],
            },
        );
        program.labels.push(Label {
            name: "loop_top".to_string(),
            instruction_index: Some(0),
        });
        for name in symbols {
            program.instructions.push(InstructionEntry {
                symbol: Some(SymbolReference {
                    name: name.to_string(),
                    usage: Usage::Full,
                    kind: SymbolKind::Unknown,
                }),
                line: Some(1),
                ..Default::default()
            });
        }
        program
    }

    #[test]
    fn resolves_against_functions_globals_and_labels_in_order() {
        let program = program_with(vec!["main", "loop_top"]);
        let resolved = resolve(&program).unwrap();
        assert_eq!(
            resolved.instructions[0].symbol.as_ref().unwrap().kind,
            SymbolKind::Function("main".to_string())
        );
        assert_eq!(
            resolved.instructions[1].symbol.as_ref().unwrap().kind,
            SymbolKind::Label("loop_top".to_string())
        );
    }

    #[test]
    fn aggregates_every_unresolved_symbol_before_failing() {
        let program = program_with(vec!["undefined_one", "undefined_two"]);
        let err = resolve(&program).unwrap_err();
        match err {
            VmError::UnresolvedSymbol(names) => {
                assert_eq!(names.len(), 2);
                assert!(names[0].contains("undefined_one"));
                assert!(names[1].contains("undefined_two"));
            }
            other => panic!("expected UnresolvedSymbol, got {other:?}"),
        }
    }
}
